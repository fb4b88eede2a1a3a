//! Network error types

use core::fmt;

use crate::dcat::response::DcatParseError;

pub type Result<T> = core::result::Result<T, NetError>;

/// Marker returned by a caller-supplied callback to request a clean stop.
/// An abort is not an internal failure; it propagates as
/// [`NetError::Aborted`] without any other error state being flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackAbort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// Allocation failure; fatal to the current operation.
    OutOfResources,
    /// A poll loop exhausted its budget; the operation was cancelled.
    Timeout,
    /// Non-success HTTP status.
    HttpStatus(u16),
    InvalidUrl,
    /// Metadata response failed the bounded scanner.
    Dcat(DcatParseError),
    /// Finalized digest diverged from the expected digest.
    HashMismatch,
    /// Caller-requested stop, or an internal bounds/overflow guard fired.
    Aborted,
    /// Requested resource absent; callers may fall back to an older
    /// inventory record.
    NotFound,
    /// Stream ended before the declared length.
    UnexpectedEof,
    /// The underlying transport capability failed.
    Transport,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfResources => write!(f, "Out of resources"),
            Self::Timeout => write!(f, "Network wait exceeded budget"),
            Self::HttpStatus(code) => write!(f, "HTTP error: {}", code),
            Self::InvalidUrl => write!(f, "Invalid URL"),
            Self::Dcat(e) => write!(f, "Metadata response rejected: {}", e),
            Self::HashMismatch => write!(f, "Content digest mismatch"),
            Self::Aborted => write!(f, "Operation aborted"),
            Self::NotFound => write!(f, "Resource not found"),
            Self::UnexpectedEof => write!(f, "Unexpected end of stream"),
            Self::Transport => write!(f, "Transport capability failure"),
        }
    }
}

impl From<DcatParseError> for NetError {
    fn from(e: DcatParseError) -> Self {
        NetError::Dcat(e)
    }
}
