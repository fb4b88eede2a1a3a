//! The opaque HTTP transport capability.
//!
//! # Concurrency model
//!
//! There are no threads. A request is begun asynchronously and then
//! driven by repeatedly invoking `poll` and checking a completion flag;
//! [`wait_ready`] is that loop, bounded by a tick budget from the
//! caller's [`Clock`]. When the budget expires the in-flight operation
//! is cancelled and `Timeout` returned. Every wait in the recovery flow
//! goes through this one primitive: the metadata round trip, the
//! response-header wait, and the gap before each body chunk.
//!
//! Redirect following and connection pooling are never assumed; a
//! binding may or may not provide them.

pub mod testing;

use alloc::vec::Vec;

use crate::error::{NetError, Result};
use crate::http::HttpRequest;
use crate::time::Clock;

/// One step of a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Bytes arrived.
    Data(Vec<u8>),
    /// Nothing yet; keep polling.
    Pending,
    /// The stream is complete.
    End,
}

/// Asynchronous HTTP capability consumed by the resolver and download
/// engine. One request is in flight at a time.
pub trait Transport {
    /// Begin a request. Completion is observed through `poll`/`is_ready`.
    fn begin(&mut self, request: &HttpRequest) -> Result<()>;

    /// Drive the capability's internal processing one step.
    fn poll(&mut self) -> Result<()>;

    /// Whether the response headers for the begun request have arrived.
    fn is_ready(&self) -> bool;

    /// Status code of the completed response.
    fn status_code(&self) -> Result<u16>;

    /// Declared content length of the completed response, when known.
    fn content_length(&self) -> Result<Option<u64>>;

    /// Next body chunk.
    fn next_chunk(&mut self) -> Result<Chunk>;

    /// Cancel the in-flight request after a timeout or abort.
    fn cancel(&mut self);
}

/// Block until the transport reports readiness, yielding to its internal
/// processing between polls. Cancels and returns `Timeout` once
/// `budget_ticks` elapse.
pub fn wait_ready<T, C>(transport: &mut T, clock: &C, budget_ticks: u64) -> Result<()>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let start = clock.ticks();
    loop {
        transport.poll()?;
        if transport.is_ready() {
            return Ok(());
        }
        if clock.ticks().wrapping_sub(start) > budget_ticks {
            transport.cancel();
            return Err(NetError::Timeout);
        }
        core::hint::spin_loop();
    }
}

/// Block until the next body chunk arrives, with the same poll/cancel
/// discipline as [`wait_ready`].
pub fn wait_chunk<T, C>(transport: &mut T, clock: &C, budget_ticks: u64) -> Result<Chunk>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let start = clock.ticks();
    loop {
        transport.poll()?;
        match transport.next_chunk()? {
            Chunk::Pending => {
                if clock.ticks().wrapping_sub(start) > budget_ticks {
                    transport.cancel();
                    return Err(NetError::Timeout);
                }
                core::hint::spin_loop();
            }
            chunk => return Ok(chunk),
        }
    }
}
