//! Recovery phases and the external progress contract.

use phoenix_net::download::DownloadProgress;
use phoenix_net::CallbackAbort;

/// The run's phases, in order. Strictly forward-progressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecoveryPhase {
    Configuring,
    Configured,
    CollateralsDownloading,
    CollateralsDownloaded,
    ServicingOperations,
    StubOsRamboot,
}

impl RecoveryPhase {
    /// Human-readable name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configuring => "Configuring",
            Self::Configured => "Configured",
            Self::CollateralsDownloading => "CollateralsDownloading",
            Self::CollateralsDownloaded => "CollateralsDownloaded",
            Self::ServicingOperations => "ServicingOperations",
            Self::StubOsRamboot => "StubOsRamboot",
        }
    }
}

/// Phase-specific payload carried with a progress report.
#[derive(Debug, Clone, Copy)]
pub enum PhasePayload<'a> {
    None,
    Download(&'a DownloadProgress),
}

/// External progress consumer.
///
/// Invoked synchronously at every phase transition and, during
/// `CollateralsDownloading`, at one-percent download granularity. A
/// `CallbackAbort` return stops the run cleanly: teardown still runs,
/// and no further phase is entered.
pub trait ProgressSink {
    fn on_progress(
        &mut self,
        phase: RecoveryPhase,
        payload: PhasePayload<'_>,
    ) -> core::result::Result<(), CallbackAbort>;
}

/// Sink that accepts everything; for callers without a UI.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_progress(
        &mut self,
        _phase: RecoveryPhase,
        _payload: PhasePayload<'_>,
    ) -> core::result::Result<(), CallbackAbort> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_are_ordered() {
        assert!(RecoveryPhase::Configuring < RecoveryPhase::Configured);
        assert!(RecoveryPhase::Configured < RecoveryPhase::CollateralsDownloading);
        assert!(RecoveryPhase::CollateralsDownloading < RecoveryPhase::CollateralsDownloaded);
        assert!(RecoveryPhase::CollateralsDownloaded < RecoveryPhase::ServicingOperations);
        assert!(RecoveryPhase::ServicingOperations < RecoveryPhase::StubOsRamboot);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(RecoveryPhase::Configuring.name(), "Configuring");
        assert_eq!(RecoveryPhase::StubOsRamboot.name(), "StubOsRamboot");
    }
}
