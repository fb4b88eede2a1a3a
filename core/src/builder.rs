//! One-shot construction of the recovery disk image.
//!
//! Writes, in order: the protective MBR, the GPT pair describing one
//! partition spanning the usable region, and a fresh FAT32 volume inside
//! that partition, then re-reads the structures to confirm they took.

use core::fmt;

use gpt_disk_io::BlockIo;
use uguid::Guid;

use crate::disk::{write_gpt, GptError, PartitionExtent};
use crate::fs::fat32_format::{format_fat32, verify_fat32, Fat32Error, Fat32Geometry};
use crate::ramdisk::{RamdiskBlockIo, RamdiskVolume};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    Gpt(GptError),
    Fat32(Fat32Error),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpt(e) => write!(f, "GPT synthesis failed: {}", e),
            Self::Fat32(e) => write!(f, "FAT32 formatting failed: {}", e),
        }
    }
}

impl From<GptError> for BuildError {
    fn from(e: GptError) -> Self {
        Self::Gpt(e)
    }
}

impl From<Fat32Error> for BuildError {
    fn from(e: Fat32Error) -> Self {
        Self::Fat32(e)
    }
}

/// Turn a zero-filled ramdisk into a bootable single-partition FAT32
/// image. Returns where the partition sits and the validated geometry.
pub fn format_single_fat32_volume(
    volume: &mut RamdiskVolume,
    disk_guid: Guid,
    partition_guid: Guid,
    partition_name: &str,
) -> Result<(PartitionExtent, Fat32Geometry), BuildError> {
    let mut io = RamdiskBlockIo::new(volume);
    let extent = write_gpt(&mut io, disk_guid, partition_guid, partition_name)?;
    let geometry = format_fat32(&mut io, extent.start_lba, extent.sectors())?;
    verify_fat32(&mut io, extent.start_lba)?;
    io.flush().map_err(|_| BuildError::Fat32(Fat32Error::IoError))?;
    Ok((extent, geometry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uguid::guid;

    #[test]
    fn test_build_small_volume_rejected_whole() {
        let mut volume = RamdiskVolume::allocate(64 * 1024 * 1024).unwrap();
        let err = format_single_fat32_volume(
            &mut volume,
            guid!("11111111-2222-3333-4444-555555555555"),
            guid!("66666666-7777-8888-9999-aaaaaaaaaaaa"),
            "X",
        )
        .unwrap_err();
        assert_eq!(err, BuildError::Fat32(Fat32Error::InvalidGeometry));
        assert!(!volume.is_registered());
    }
}
