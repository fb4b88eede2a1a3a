use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fat32Error {
    IoError,
    /// Cluster count or FAT capacity outside the valid FAT32 envelope.
    InvalidGeometry,
    InvalidBlockSize,
    InvalidPath,
    FileTooLarge,
    NoSpace,
    NotFound,
    AlreadyExists,
    VerifyFailed,
}

impl fmt::Display for Fat32Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "Block I/O error"),
            Self::InvalidGeometry => write!(f, "Volume geometry outside FAT32 limits"),
            Self::InvalidBlockSize => write!(f, "Unsupported block size"),
            Self::InvalidPath => write!(f, "Path not representable as 8.3 names"),
            Self::FileTooLarge => write!(f, "File larger than FAT32 allows"),
            Self::NoSpace => write!(f, "No contiguous free clusters"),
            Self::NotFound => write!(f, "File or directory not found"),
            Self::AlreadyExists => write!(f, "Entry already exists"),
            Self::VerifyFailed => write!(f, "Formatted volume failed verification"),
        }
    }
}
