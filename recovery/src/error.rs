//! Recovery error taxonomy.
//!
//! Low-level components return their own result types with no
//! side-channel state; everything is folded into this taxonomy at the
//! orchestrator boundary. The orchestrator additionally records the
//! FIRST fault of a run as the extended error - later faults during
//! teardown never overwrite the original cause.

use core::fmt;

use phoenix_core::builder::BuildError;
use phoenix_core::disk::GptError;
use phoenix_core::fs::fat32_format::Fat32Error;
use phoenix_core::ramdisk::RamdiskError;
use phoenix_net::NetError;
use phoenix_persistent::TokenError;
use wimfs::WimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryError {
    /// Re-entrant call while a run is in progress.
    Busy,
    /// `start` before a successful `configure`.
    NotConfigured,
    /// Allocation failure; fatal to the run, never retried.
    OutOfResources,
    /// A bounded network wait expired.
    Timeout,
    /// WIM/JSON/GPT invariant violation; never partially trusted.
    MalformedData,
    /// Downloaded content diverged from its declared digest.
    HashMismatch,
    /// Caller-requested stop or internal bounds guard.
    Aborted,
    /// Required resource missing after all fallbacks.
    NotFound,
    /// Ramdisk geometry outside FAT32 limits.
    InvalidGeometry,
    /// Access outside the ramdisk volume.
    OutOfBounds,
    /// Block or transport I/O failure.
    Io,
    /// Servicing token could not be written or honored.
    Servicing,
    /// Non-success HTTP status from a service.
    HttpStatus(u16),
}

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "Recovery run already in progress"),
            Self::NotConfigured => write!(f, "Recovery not configured"),
            Self::OutOfResources => write!(f, "Out of resources"),
            Self::Timeout => write!(f, "Network wait timed out"),
            Self::MalformedData => write!(f, "Malformed data"),
            Self::HashMismatch => write!(f, "Collateral digest mismatch"),
            Self::Aborted => write!(f, "Run aborted"),
            Self::NotFound => write!(f, "Required resource not found"),
            Self::InvalidGeometry => write!(f, "Ramdisk geometry invalid"),
            Self::OutOfBounds => write!(f, "Ramdisk access out of bounds"),
            Self::Io => write!(f, "I/O failure"),
            Self::Servicing => write!(f, "Servicing state failure"),
            Self::HttpStatus(code) => write!(f, "HTTP error: {}", code),
        }
    }
}

impl From<NetError> for RecoveryError {
    fn from(e: NetError) -> Self {
        match e {
            NetError::OutOfResources => Self::OutOfResources,
            NetError::Timeout => Self::Timeout,
            NetError::HttpStatus(code) => Self::HttpStatus(code),
            NetError::InvalidUrl | NetError::Dcat(_) | NetError::UnexpectedEof => {
                Self::MalformedData
            }
            NetError::HashMismatch => Self::HashMismatch,
            NetError::Aborted => Self::Aborted,
            NetError::NotFound => Self::NotFound,
            NetError::Transport => Self::Io,
        }
    }
}

impl From<RamdiskError> for RecoveryError {
    fn from(e: RamdiskError) -> Self {
        match e {
            RamdiskError::OutOfResources => Self::OutOfResources,
            RamdiskError::OutOfBounds | RamdiskError::ExtentOverlap => Self::OutOfBounds,
        }
    }
}

impl From<GptError> for RecoveryError {
    fn from(e: GptError) -> Self {
        match e {
            GptError::IoError => Self::Io,
            GptError::DiskTooSmall => Self::InvalidGeometry,
        }
    }
}

impl From<Fat32Error> for RecoveryError {
    fn from(e: Fat32Error) -> Self {
        match e {
            Fat32Error::InvalidGeometry => Self::InvalidGeometry,
            Fat32Error::NotFound => Self::NotFound,
            Fat32Error::VerifyFailed => Self::MalformedData,
            _ => Self::Io,
        }
    }
}

impl From<BuildError> for RecoveryError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::Gpt(e) => e.into(),
            BuildError::Fat32(e) => e.into(),
        }
    }
}

impl From<WimError> for RecoveryError {
    fn from(e: WimError) -> Self {
        match e {
            WimError::MalformedContainer => Self::MalformedData,
            WimError::NotFound => Self::NotFound,
            WimError::IoError => Self::Io,
            WimError::SinkError => Self::OutOfBounds,
        }
    }
}

impl From<TokenError> for RecoveryError {
    fn from(_: TokenError) -> Self {
        Self::Servicing
    }
}
