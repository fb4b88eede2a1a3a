//! DCAT metadata-service client.
//!
//! The metadata service maps a device's software inventory to concrete
//! collateral locations: for each required file name it reports a URL,
//! a size, and a base64 SHA-256 digest. Resolution tries the newest
//! inventory record first and falls back to older ones.

pub mod resolver;
pub mod response;

pub use resolver::{resolve, METADATA_RETRY_LIMIT};

use alloc::string::String;
use alloc::vec::Vec;

/// Which inventory slot a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryKind {
    /// Older, factory-installed inventory.
    Primary,
    /// Newer inventory from the most recent OS; tried first.
    Secondary,
}

/// One software-inventory record. At most two exist per run; a record
/// that fails resolution is marked invalid and never retried within the
/// run.
#[derive(Debug, Clone)]
pub struct SoftwareInventoryRecord {
    pub kind: InventoryKind,
    /// Opaque metadata-service query body derived from the inventory.
    pub request_payload: Vec<u8>,
    pub valid: bool,
}

impl SoftwareInventoryRecord {
    pub fn new(kind: InventoryKind, request_payload: Vec<u8>) -> Self {
        Self {
            kind,
            request_payload,
            valid: true,
        }
    }
}

/// One file the resolver must produce a descriptor for.
#[derive(Debug, Clone)]
pub struct RequiredFile {
    /// File name looked up in the metadata response.
    pub file_name: String,
    /// Where the download engine places the file on the recovery volume.
    pub target_path: String,
    /// Hold the file in memory instead of the volume.
    pub store_in_memory: bool,
}

/// A fully resolved collateral: everything the download engine needs.
/// Immutable once resolved; consumed exactly once.
#[derive(Debug, Clone)]
pub struct CollateralDescriptor {
    pub source_url: String,
    pub target_path: String,
    pub size_bytes: u64,
    pub digest: [u8; 32],
    pub store_in_memory: bool,
}
