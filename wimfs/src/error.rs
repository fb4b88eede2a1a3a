//! Error types for WIM container operations

use core::fmt;

/// Result type for WIM operations
pub type Result<T> = core::result::Result<T, WimError>;

/// Errors that can occur while reading a WIM container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WimError {
    /// I/O error reading from the byte source
    IoError,

    /// Header, catalog, or length invariant violated; the container is
    /// treated as tampered or corrupt, never partially trusted
    MalformedContainer,

    /// Requested path absent from the resource catalog
    NotFound,

    /// Destination sink refused or truncated a write
    SinkError,
}

impl fmt::Display for WimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "I/O error reading container"),
            Self::MalformedContainer => write!(f, "Malformed or tampered WIM container"),
            Self::NotFound => write!(f, "Resource not found in catalog"),
            Self::SinkError => write!(f, "Destination sink write failed"),
        }
    }
}
