//! Servicing token record format.
//!
//! # Binary Format (v1)
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0x00    8     Magic number "PHXSVC\x01\x00"
//! 0x08    2     Prior driver version, major (little-endian u16)
//! 0x0A    2     Prior driver version, minor
//! 0x0C    4     Reserved
//! 0x10    8     Opaque orchestrator state handle
//! 0x18    4     CRC32 of header (offset 0x00-0x17)
//! 0x1C    4     Reserved (align to 32 bytes)
//! ```
//!
//! The token is written with boot-service-only visibility immediately
//! before a newer driver image is started, and must be deleted by the
//! FIRST action of whichever run reads it, before the contents are
//! acted on, so a crash mid-servicing cannot replay it. A token found
//! with any other storage attributes is destroyed, never honored.

use core::fmt;

use crate::store::{attributes, TokenStore};

/// Fixed record name in the token store.
pub const SERVICING_TOKEN_NAME: &str = "PhoenixServicingToken";

/// Magic number for token records: "PHXSVC\x01\x00"
pub const TOKEN_MAGIC: [u8; 8] = [b'P', b'H', b'X', b'S', b'V', b'C', 0x01, 0x00];

/// Serialized token size
pub const TOKEN_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Record shorter than the fixed layout.
    TooShort,
    /// Magic number mismatch.
    BadMagic,
    /// Header CRC mismatch.
    BadChecksum,
    /// Record stored with attributes a servicing token may not carry.
    UntrustedAttributes,
    /// Underlying store failure.
    StoreFailure,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "Token record truncated"),
            Self::BadMagic => write!(f, "Token magic mismatch"),
            Self::BadChecksum => write!(f, "Token checksum mismatch"),
            Self::UntrustedAttributes => write!(f, "Token stored with untrusted attributes"),
            Self::StoreFailure => write!(f, "Token store failure"),
        }
    }
}

/// Continuation state across a self-servicing reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicingToken {
    pub prior_major: u16,
    pub prior_minor: u16,
    /// Opaque handle to orchestrator state; only the writer interprets it.
    pub state_handle: u64,
}

impl ServicingToken {
    pub fn new(prior_major: u16, prior_minor: u16, state_handle: u64) -> Self {
        Self {
            prior_major,
            prior_minor,
            state_handle,
        }
    }

    /// Serialize to the fixed 32-byte record.
    pub fn serialize(&self) -> [u8; TOKEN_SIZE] {
        let mut buffer = [0u8; TOKEN_SIZE];
        buffer[0..8].copy_from_slice(&TOKEN_MAGIC);
        buffer[8..10].copy_from_slice(&self.prior_major.to_le_bytes());
        buffer[10..12].copy_from_slice(&self.prior_minor.to_le_bytes());
        buffer[16..24].copy_from_slice(&self.state_handle.to_le_bytes());
        let crc = crc32(&buffer[0..24]);
        buffer[24..28].copy_from_slice(&crc.to_le_bytes());
        buffer
    }

    /// Deserialize and validate a record.
    pub fn deserialize(buffer: &[u8]) -> Result<Self, TokenError> {
        if buffer.len() < TOKEN_SIZE {
            return Err(TokenError::TooShort);
        }
        if buffer[0..8] != TOKEN_MAGIC {
            return Err(TokenError::BadMagic);
        }
        let stored_crc = u32::from_le_bytes(buffer[24..28].try_into().unwrap());
        if stored_crc != crc32(&buffer[0..24]) {
            return Err(TokenError::BadChecksum);
        }

        Ok(Self {
            prior_major: u16::from_le_bytes([buffer[8], buffer[9]]),
            prior_minor: u16::from_le_bytes([buffer[10], buffer[11]]),
            state_handle: u64::from_le_bytes(buffer[16..24].try_into().unwrap()),
        })
    }

    /// Persist under the fixed name with boot-service-only visibility.
    pub fn persist<S: TokenStore + ?Sized>(&self, store: &mut S) -> Result<(), TokenError> {
        store.save(
            SERVICING_TOKEN_NAME,
            attributes::SERVICING_TOKEN,
            &self.serialize(),
        )
    }
}

/// Read-and-destroy the servicing token.
///
/// The record is deleted before its contents are examined; a malformed
/// or untrusted record therefore disappears the same way a valid one
/// does, and a second call always observes nothing.
pub fn take_token<S: TokenStore + ?Sized>(
    store: &mut S,
) -> Result<Option<ServicingToken>, TokenError> {
    let record = match store.load(SERVICING_TOKEN_NAME)? {
        Some(record) => record,
        None => return Ok(None),
    };

    // Delete first: the token must never survive being observed
    store.delete(SERVICING_TOKEN_NAME)?;

    if record.attributes != attributes::SERVICING_TOKEN {
        return Err(TokenError::UntrustedAttributes);
    }

    ServicingToken::deserialize(&record.data).map(Some)
}

// CRC32, IEEE 802.3 polynomial
fn crc32(data: &[u8]) -> u32 {
    const POLYNOMIAL: u32 = 0xEDB88320;

    let mut crc: u32 = 0xFFFFFFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}
