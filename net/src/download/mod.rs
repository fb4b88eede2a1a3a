//! Chunked collateral download engine.
//!
//! Downloads every resolved collateral in resolution order, streaming
//! chunks into a caller-chosen sink while folding them into the content
//! verifier. The progress callback is throttled to one-percent
//! granularity per collateral: invoking it on every chunk measurably
//! collapses throughput on slow firmware consoles, so the gate is part
//! of the engine's contract, not a courtesy.

use alloc::boxed::Box;
use alloc::vec::Vec;

use phoenix_core::log_info;

use crate::certs::CONTENT_TLS_PINS;
use crate::dcat::CollateralDescriptor;
use crate::error::{CallbackAbort, NetError, Result};
use crate::http::{HttpMethod, HttpRequest};
use crate::time::{Clock, Timeouts};
use crate::transport::{wait_chunk, wait_ready, Chunk, Transport};
use crate::verify::{digests_match, ContentVerifier};

/// Per-collateral progress, mutated in place by the engine and read-only
/// to the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub collateral_index: usize,
    pub bytes_downloaded: u64,
    pub collateral_total_bytes: u64,
}

/// Whether finalized digests are compared. Skipping is a caller-visible
/// configuration choice, logged whenever it takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    Enabled,
    Skip,
}

/// Destination for one collateral's bytes.
pub trait CollateralSink {
    /// Write `chunk` at `offset`. Offsets arrive sequentially with no
    /// gaps; a sink refuses anything past its declared capacity.
    fn write_at(&mut self, offset: u64, chunk: &[u8]) -> Result<()>;
}

/// Maps each descriptor to its sink as the engine reaches it.
pub trait SinkPolicy {
    /// Open the sink for the collateral at `index`.
    fn open<'s>(
        &'s mut self,
        index: usize,
        descriptor: &CollateralDescriptor,
    ) -> Result<Box<dyn CollateralSink + 's>>;
}

/// Growable in-memory sink for collaterals held out of the volume.
#[derive(Default)]
pub struct MemorySink {
    data: Vec<u8>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl CollateralSink for MemorySink {
    fn write_at(&mut self, offset: u64, chunk: &[u8]) -> Result<()> {
        if offset != self.data.len() as u64 {
            return Err(NetError::Aborted);
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }
}

impl CollateralSink for &mut MemorySink {
    fn write_at(&mut self, offset: u64, chunk: &[u8]) -> Result<()> {
        (**self).write_at(offset, chunk)
    }
}

/// Download every descriptor in order through `transport`, routing bytes
/// via `sinks` and reporting throttled progress to `progress`.
///
/// A `CallbackAbort` from the callback is a clean stop: it propagates as
/// `Aborted` without any other error state, and no further collateral is
/// requested.
pub fn download_all<T, C, P, F>(
    transport: &mut T,
    clock: &C,
    timeouts: &Timeouts,
    descriptors: &[CollateralDescriptor],
    sinks: &mut P,
    verify: VerifyMode,
    progress: &mut F,
) -> Result<()>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
    P: SinkPolicy + ?Sized,
    F: FnMut(&DownloadProgress) -> core::result::Result<(), CallbackAbort>,
{
    for (index, descriptor) in descriptors.iter().enumerate() {
        let mut sink = sinks.open(index, descriptor)?;
        download_one(
            transport,
            clock,
            timeouts,
            descriptor,
            index,
            sink.as_mut(),
            verify,
            progress,
        )?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn download_one<T, C, F>(
    transport: &mut T,
    clock: &C,
    timeouts: &Timeouts,
    descriptor: &CollateralDescriptor,
    index: usize,
    sink: &mut dyn CollateralSink,
    verify: VerifyMode,
    progress: &mut F,
) -> Result<()>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
    F: FnMut(&DownloadProgress) -> core::result::Result<(), CallbackAbort>,
{
    let size = descriptor.size_bytes;

    // Ranged GET for exactly the declared size
    let mut request =
        HttpRequest::new(HttpMethod::Get, &descriptor.source_url, &CONTENT_TLS_PINS);
    if size > 0 {
        let range = alloc::format!("bytes=0-{}", size - 1);
        request = request.header("Range", range.as_str());
    }

    transport.begin(&request)?;
    wait_ready(transport, clock, timeouts.content_start())?;

    let status = transport.status_code()?;
    if status != 200 && status != 206 {
        return Err(NetError::HttpStatus(status));
    }

    let mut verifier = ContentVerifier::new();
    let mut state = DownloadProgress {
        collateral_index: index,
        bytes_downloaded: 0,
        collateral_total_bytes: size,
    };
    let mut last_percent: u64 = 0;

    loop {
        let chunk = match wait_chunk(transport, clock, timeouts.content_chunk())? {
            Chunk::Data(data) => data,
            Chunk::End => break,
            Chunk::Pending => continue,
        };

        // Guard against a server sending more than it declared, or the
        // position counter overflowing; reject before any partial write
        let end = state
            .bytes_downloaded
            .checked_add(chunk.len() as u64)
            .filter(|&e| e <= size)
            .ok_or(NetError::Aborted)?;

        verifier.update(&chunk);
        sink.write_at(state.bytes_downloaded, &chunk)?;
        state.bytes_downloaded = end;

        // One-percent progress gate
        let percent = if size == 0 {
            100
        } else {
            (state.bytes_downloaded as u128 * 100 / size as u128) as u64
        };
        if percent > last_percent {
            last_percent = percent;
            progress(&state).map_err(|_| NetError::Aborted)?;
        }
    }

    if state.bytes_downloaded != size {
        return Err(NetError::UnexpectedEof);
    }
    if state.bytes_downloaded == 0 {
        // Zero-length collateral still reports once
        progress(&state).map_err(|_| NetError::Aborted)?;
    }

    match verify {
        VerifyMode::Enabled => {
            let actual = verifier.finalize();
            if !digests_match(&descriptor.digest, &actual) {
                return Err(NetError::HashMismatch);
            }
        }
        VerifyMode::Skip => {
            log_info!("download: hash validation skipped by configuration");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{FakeClock, ScriptedResponse, ScriptedTransport};
    use crate::verify::ContentVerifier;
    use alloc::string::ToString;
    use alloc::vec;

    fn descriptor(url: &str, size: u64, digest: [u8; 32]) -> CollateralDescriptor {
        CollateralDescriptor {
            source_url: url.to_string(),
            target_path: "/x".to_string(),
            size_bytes: size,
            digest,
            store_in_memory: true,
        }
    }

    fn digest_of(data: &[u8]) -> [u8; 32] {
        let mut v = ContentVerifier::new();
        v.update(data);
        v.finalize()
    }

    struct MemoryPolicy {
        sinks: Vec<MemorySink>,
    }

    impl MemoryPolicy {
        fn new(count: usize) -> Self {
            let mut sinks = Vec::new();
            for _ in 0..count {
                sinks.push(MemorySink::new());
            }
            Self { sinks }
        }
    }

    impl SinkPolicy for MemoryPolicy {
        fn open<'s>(
            &'s mut self,
            index: usize,
            _descriptor: &CollateralDescriptor,
        ) -> Result<Box<dyn CollateralSink + 's>> {
            Ok(Box::new(&mut self.sinks[index]))
        }
    }

    #[test]
    fn test_download_in_order_with_verification() {
        let payload_a = vec![0xAAu8; 5000];
        let payload_b = vec![0xBBu8; 3000];

        let mut transport = ScriptedTransport::new();
        transport.push(ScriptedResponse::ok(&payload_a).chunk_size(512));
        transport.push(ScriptedResponse::ok(&payload_b).chunk_size(512));
        let clock = FakeClock::new(1_000);
        let timeouts = Timeouts::new(1_000);

        let descriptors = vec![
            descriptor("https://dl/a", 5000, digest_of(&payload_a)),
            descriptor("https://dl/b", 3000, digest_of(&payload_b)),
        ];
        let mut policy = MemoryPolicy::new(2);
        let mut seen = Vec::new();

        download_all(
            &mut transport,
            &clock,
            &timeouts,
            &descriptors,
            &mut policy,
            VerifyMode::Enabled,
            &mut |p: &DownloadProgress| {
                seen.push(*p);
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(policy.sinks[0].as_slice(), payload_a.as_slice());
        assert_eq!(policy.sinks[1].as_slice(), payload_b.as_slice());

        // Strict order: every report for collateral 0 precedes collateral 1
        let first_b = seen.iter().position(|p| p.collateral_index == 1).unwrap();
        assert!(seen[..first_b].iter().all(|p| p.collateral_index == 0));

        // bytes_downloaded strictly increases per collateral and never
        // exceeds the declared size
        for index in 0..2 {
            let series: Vec<u64> = seen
                .iter()
                .filter(|p| p.collateral_index == index)
                .map(|p| p.bytes_downloaded)
                .collect();
            assert!(series.windows(2).all(|w| w[0] < w[1]));
            assert!(series.iter().all(|&b| b <= descriptors[index].size_bytes));
            assert_eq!(*series.last().unwrap(), descriptors[index].size_bytes);
        }

        // Requests rode the content channel with an exact range
        assert_eq!(transport.requests[0].cert_set.name, "content");
        assert_eq!(
            transport.requests[0].find_header("Range"),
            Some("bytes=0-4999")
        );
    }

    #[test]
    fn test_progress_throttled_to_one_percent() {
        let payload = vec![7u8; 100_000];
        let mut transport = ScriptedTransport::new();
        // 1000 chunks of 100 bytes: unthrottled would report 1000 times
        transport.push(ScriptedResponse::ok(&payload).chunk_size(100));
        let clock = FakeClock::new(1_000);
        let timeouts = Timeouts::new(1_000);

        let descriptors = vec![descriptor("https://dl/a", 100_000, digest_of(&payload))];
        let mut policy = MemoryPolicy::new(1);
        let mut reports = 0usize;

        download_all(
            &mut transport,
            &clock,
            &timeouts,
            &descriptors,
            &mut policy,
            VerifyMode::Enabled,
            &mut |_| {
                reports += 1;
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(reports, 100, "one report per percent");
    }

    #[test]
    fn test_server_overflow_rejected_before_write() {
        let payload = vec![1u8; 2000];
        let mut transport = ScriptedTransport::new();
        transport.push(ScriptedResponse::ok(&payload).chunk_size(512));
        let clock = FakeClock::new(1_000);
        let timeouts = Timeouts::new(1_000);

        // Server delivers 2000 bytes but the descriptor declared 1000
        let descriptors = vec![descriptor("https://dl/a", 1000, digest_of(&payload))];
        let mut policy = MemoryPolicy::new(1);

        let err = download_all(
            &mut transport,
            &clock,
            &timeouts,
            &descriptors,
            &mut policy,
            VerifyMode::Enabled,
            &mut |_| Ok(()),
        )
        .unwrap_err();

        assert_eq!(err, NetError::Aborted);
        // Nothing past the declared boundary landed in the sink
        assert!(policy.sinks[0].as_slice().len() <= 1000);
    }

    #[test]
    fn test_hash_mismatch_detected() {
        let payload = vec![1u8; 1000];
        let mut corrupted = payload.clone();
        corrupted[500] ^= 0x01;

        let mut transport = ScriptedTransport::new();
        transport.push(ScriptedResponse::ok(&corrupted));
        let clock = FakeClock::new(1_000);
        let timeouts = Timeouts::new(1_000);

        let descriptors = vec![descriptor("https://dl/a", 1000, digest_of(&payload))];
        let mut policy = MemoryPolicy::new(1);

        let err = download_all(
            &mut transport,
            &clock,
            &timeouts,
            &descriptors,
            &mut policy,
            VerifyMode::Enabled,
            &mut |_| Ok(()),
        )
        .unwrap_err();
        assert_eq!(err, NetError::HashMismatch);
    }

    #[test]
    fn test_hash_mismatch_accepted_when_skipped() {
        let payload = vec![1u8; 1000];
        let mut corrupted = payload.clone();
        corrupted[500] ^= 0x01;

        let mut transport = ScriptedTransport::new();
        transport.push(ScriptedResponse::ok(&corrupted));
        let clock = FakeClock::new(1_000);
        let timeouts = Timeouts::new(1_000);

        let descriptors = vec![descriptor("https://dl/a", 1000, digest_of(&payload))];
        let mut policy = MemoryPolicy::new(1);

        // Documented divergence: skipping verification accepts the bytes
        download_all(
            &mut transport,
            &clock,
            &timeouts,
            &descriptors,
            &mut policy,
            VerifyMode::Skip,
            &mut |_| Ok(()),
        )
        .unwrap();
        assert_eq!(policy.sinks[0].as_slice(), corrupted.as_slice());
    }

    #[test]
    fn test_truncated_stream_is_unexpected_eof() {
        let payload = vec![1u8; 500];
        let mut transport = ScriptedTransport::new();
        transport.push(ScriptedResponse::ok(&payload));
        let clock = FakeClock::new(1_000);
        let timeouts = Timeouts::new(1_000);

        let descriptors = vec![descriptor("https://dl/a", 1000, digest_of(&payload))];
        let mut policy = MemoryPolicy::new(1);

        let err = download_all(
            &mut transport,
            &clock,
            &timeouts,
            &descriptors,
            &mut policy,
            VerifyMode::Enabled,
            &mut |_| Ok(()),
        )
        .unwrap_err();
        assert_eq!(err, NetError::UnexpectedEof);
    }

    #[test]
    fn test_callback_abort_is_clean_stop() {
        let payload = vec![1u8; 1000];
        let mut transport = ScriptedTransport::new();
        transport.push(ScriptedResponse::ok(&payload));
        transport.push(ScriptedResponse::ok(&payload));
        let clock = FakeClock::new(1_000);
        let timeouts = Timeouts::new(1_000);

        let descriptors = vec![
            descriptor("https://dl/a", 1000, digest_of(&payload)),
            descriptor("https://dl/b", 1000, digest_of(&payload)),
        ];
        let mut policy = MemoryPolicy::new(2);

        let err = download_all(
            &mut transport,
            &clock,
            &timeouts,
            &descriptors,
            &mut policy,
            VerifyMode::Enabled,
            &mut |_| Err(CallbackAbort),
        )
        .unwrap_err();

        assert_eq!(err, NetError::Aborted);
        // The second collateral was never requested
        assert_eq!(transport.requests.len(), 1);
    }

}
