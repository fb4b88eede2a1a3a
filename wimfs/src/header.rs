//! WIM fixed-layout header parsing.
//!
//! # Binary layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0x00    8     Magic "MSWIM\x00\x00\x00"
//! 0x08    4     Header size (208, little-endian u32)
//! 0x0C    4     Format version
//! 0x10    4     Flags
//! 0x14    4     Compressed chunk size (0 when uncompressed)
//! 0x18    16    Image GUID
//! 0x28    2     Part number
//! 0x2A    2     Total parts
//! 0x2C    4     Image count
//! 0x30    24    Offset table resource descriptor
//! 0x48    24    XML catalog resource descriptor
//! 0x60    24    Boot metadata resource descriptor
//! 0x78    4     Boot index
//! 0x7C    24    Integrity table resource descriptor
//! 0x94    4     Trailing crypt hash size
//! 0x98    56    Reserved
//!
//! Resource descriptor (24 bytes):
//! 0x00    8     Size in container (low 56 bits) + flags (high 8 bits)
//! 0x08    8     Absolute byte offset
//! 0x10    8     Original (uncompressed) size
//! ```
//!
//! The XML catalog sits at the end of the payload, followed by the
//! integrity table and the trailing crypt hash. A well-formed container
//! therefore satisfies `xml_offset + xml_size + integrity_size +
//! crypt_hash_size == total length` exactly; any mismatch is rejected as
//! tampering rather than tolerated.

use crate::error::{Result, WimError};

/// WIM magic bytes
pub const WIM_MAGIC: [u8; 8] = *b"MSWIM\x00\x00\x00";

/// Fixed header size in bytes
pub const WIM_HEADER_SIZE: usize = 208;

const XML_DESCRIPTOR_OFFSET: usize = 0x48;
const INTEGRITY_DESCRIPTOR_OFFSET: usize = 0x7C;
const CRYPT_HASH_SIZE_OFFSET: usize = 0x94;

/// One resource descriptor from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Bytes the resource occupies inside the container.
    pub size: u64,
    /// Descriptor flag byte.
    pub flags: u8,
    /// Absolute byte offset of the resource.
    pub offset: u64,
    /// Uncompressed size.
    pub original_size: u64,
}

impl ResourceDescriptor {
    fn parse(raw: &[u8]) -> Self {
        let packed = u64::from_le_bytes(raw[0..8].try_into().unwrap());
        Self {
            size: packed & 0x00FF_FFFF_FFFF_FFFF,
            flags: (packed >> 56) as u8,
            offset: u64::from_le_bytes(raw[8..16].try_into().unwrap()),
            original_size: u64::from_le_bytes(raw[16..24].try_into().unwrap()),
        }
    }
}

/// Parsed WIM header fields the recovery flow consumes.
#[derive(Debug, Clone, Copy)]
pub struct WimHeader {
    /// Format version.
    pub version: u32,
    /// Header flag word.
    pub flags: u32,
    /// Number of images in the container.
    pub image_count: u32,
    /// XML catalog descriptor.
    pub xml: ResourceDescriptor,
    /// Integrity table descriptor.
    pub integrity: ResourceDescriptor,
    /// Size of the trailing crypt hash blob.
    pub crypt_hash_size: u32,
}

impl WimHeader {
    /// Parse the fixed header from the first [`WIM_HEADER_SIZE`] bytes.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < WIM_HEADER_SIZE {
            return Err(WimError::MalformedContainer);
        }
        if raw[0..8] != WIM_MAGIC {
            return Err(WimError::MalformedContainer);
        }
        let header_size = u32::from_le_bytes(raw[8..12].try_into().unwrap());
        if header_size as usize != WIM_HEADER_SIZE {
            return Err(WimError::MalformedContainer);
        }

        Ok(Self {
            version: u32::from_le_bytes(raw[12..16].try_into().unwrap()),
            flags: u32::from_le_bytes(raw[16..20].try_into().unwrap()),
            image_count: u32::from_le_bytes(raw[44..48].try_into().unwrap()),
            xml: ResourceDescriptor::parse(
                &raw[XML_DESCRIPTOR_OFFSET..XML_DESCRIPTOR_OFFSET + 24],
            ),
            integrity: ResourceDescriptor::parse(
                &raw[INTEGRITY_DESCRIPTOR_OFFSET..INTEGRITY_DESCRIPTOR_OFFSET + 24],
            ),
            crypt_hash_size: u32::from_le_bytes(
                raw[CRYPT_HASH_SIZE_OFFSET..CRYPT_HASH_SIZE_OFFSET + 4]
                    .try_into()
                    .unwrap(),
            ),
        })
    }

    /// Enforce the end-of-container accounting invariant: the XML catalog,
    /// integrity table, and crypt hash must together reach the container's
    /// final byte. Checked arithmetic; an overflow is malformed too.
    pub fn validate_length(&self, total_len: u64) -> Result<()> {
        let expected = self
            .xml
            .offset
            .checked_add(self.xml.size)
            .and_then(|v| v.checked_add(self.integrity.size))
            .and_then(|v| v.checked_add(self.crypt_hash_size as u64))
            .ok_or(WimError::MalformedContainer)?;
        if expected != total_len {
            return Err(WimError::MalformedContainer);
        }
        Ok(())
    }
}
