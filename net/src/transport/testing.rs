//! Test-double transport and clock.
//!
//! The scripted transport plays back canned responses in request order
//! and records every request it sees, so tests can assert on channel
//! selection, headers, and request counts without a network.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::error::{NetError, Result};
use crate::http::HttpRequest;
use crate::time::Clock;

use super::{Chunk, Transport};

/// One canned response.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_length: Option<u64>,
    pub chunk_size: usize,
    pub polls_until_ready: u32,
    pub never_ready: bool,
}

impl ScriptedResponse {
    /// 200 response with the given body.
    pub fn ok(body: &[u8]) -> Self {
        Self {
            status: 200,
            body: body.to_vec(),
            content_length: Some(body.len() as u64),
            chunk_size: 1024,
            polls_until_ready: 1,
            never_ready: false,
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn content_length(mut self, length: Option<u64>) -> Self {
        self.content_length = length;
        self
    }

    pub fn polls_until_ready(mut self, polls: u32) -> Self {
        self.polls_until_ready = polls;
        self
    }

    /// Headers never arrive; the caller's budget must fire.
    pub fn never_ready(mut self) -> Self {
        self.never_ready = true;
        self
    }
}

struct ActiveResponse {
    response: ScriptedResponse,
    polls: u32,
    position: usize,
}

/// Scripted [`Transport`] implementation.
#[derive(Default)]
pub struct ScriptedTransport {
    script: VecDeque<ScriptedResponse>,
    active: Option<ActiveResponse>,
    /// Every request begun, in order.
    pub requests: Vec<HttpRequest>,
    /// Number of cancel calls observed.
    pub cancelled: u32,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response for the next `begin`.
    pub fn push(&mut self, response: ScriptedResponse) {
        self.script.push_back(response);
    }
}

impl Transport for ScriptedTransport {
    fn begin(&mut self, request: &HttpRequest) -> Result<()> {
        self.requests.push(request.clone());
        let response = self.script.pop_front().ok_or(NetError::Transport)?;
        self.active = Some(ActiveResponse {
            response,
            polls: 0,
            position: 0,
        });
        Ok(())
    }

    fn poll(&mut self) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            active.polls = active.polls.saturating_add(1);
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        match self.active.as_ref() {
            Some(active) => !active.response.never_ready && active.polls >= active.response.polls_until_ready,
            None => false,
        }
    }

    fn status_code(&self) -> Result<u16> {
        let active = self.active.as_ref().ok_or(NetError::Transport)?;
        Ok(active.response.status)
    }

    fn content_length(&self) -> Result<Option<u64>> {
        let active = self.active.as_ref().ok_or(NetError::Transport)?;
        Ok(active.response.content_length)
    }

    fn next_chunk(&mut self) -> Result<Chunk> {
        let ready = self.is_ready();
        let active = self.active.as_mut().ok_or(NetError::Transport)?;
        if !ready {
            return Ok(Chunk::Pending);
        }
        if active.position >= active.response.body.len() {
            return Ok(Chunk::End);
        }
        let end = (active.position + active.response.chunk_size).min(active.response.body.len());
        let data = active.response.body[active.position..end].to_vec();
        active.position = end;
        Ok(Chunk::Data(data))
    }

    fn cancel(&mut self) {
        self.cancelled += 1;
        self.active = None;
    }
}

/// Deterministic [`Clock`] advancing a fixed step per read.
pub struct FakeClock {
    now: Cell<u64>,
    step: u64,
    freq: u64,
}

impl FakeClock {
    /// Clock at the given frequency, advancing one tick per read.
    pub fn new(freq: u64) -> Self {
        Self {
            now: Cell::new(0),
            step: 1,
            freq,
        }
    }

    pub fn with_step(freq: u64, step: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
            freq,
        }
    }
}

impl Clock for FakeClock {
    fn ticks(&self) -> u64 {
        let t = self.now.get();
        self.now.set(t + self.step);
        t
    }

    fn tick_frequency(&self) -> u64 {
        self.freq
    }
}
