//! Boot-file extraction from the downloaded recovery image.
//!
//! The recovery image is itself a file on the ramdisk volume; each boot
//! file is a byte range inside it. Extraction allocates the destination
//! file, borrows the source and destination extents disjointly from the
//! volume, and streams the range across without an intermediate copy of
//! either region.

use alloc::vec::Vec;

use phoenix_core::fs::fat32_ops::{self, FileExtent};
use phoenix_core::log_info;
use phoenix_core::ramdisk::{RamdiskBlockIo, RamdiskVolume};
use wimfs::{duplicate_into, SliceSink, SliceSource, VecSink, WimError, WimImage};

use crate::config::BootFile;
use crate::error::RecoveryError;

/// Extract every configured boot file from the recovery image at
/// `wim_extent`. Returns the captured self-driver image when the
/// catalog carries one.
pub fn extract_boot_files(
    volume: &mut RamdiskVolume,
    partition_lba: u64,
    wim_extent: FileExtent,
    boot_files: &[BootFile],
) -> Result<Option<Vec<u8>>, RecoveryError> {
    let image = {
        let mut source = SliceSource::new(wim_slice(volume, wim_extent)?);
        WimImage::open(&mut source)?
    };

    let mut driver_image = None;

    for boot_file in boot_files {
        let (offset, size) = match image.find_resource(&boot_file.wim_path) {
            Ok(range) => range,
            Err(WimError::NotFound) if !boot_file.critical => {
                log_info!("extraction: optional boot file absent, continuing");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if boot_file.servicing {
            driver_image = Some(extract_to_memory(volume, wim_extent, offset, size)?);
            continue;
        }

        let destination = {
            let mut io = RamdiskBlockIo::new(volume);
            fat32_ops::allocate_file(&mut io, partition_lba, &boot_file.target_path, size)?
        };

        // Borrow the resource range and the destination file at once;
        // the source slice starts exactly at the resource
        let (src, dst) = volume.disjoint_extents(
            (wim_extent.byte_offset + offset, size),
            (destination.byte_offset, size),
        )?;
        let mut source = SliceSource::new(src);
        let mut sink = SliceSink::new(dst);
        duplicate_into(&mut source, 0, size, &mut sink)?;
    }

    Ok(driver_image)
}

fn extract_to_memory(
    volume: &RamdiskVolume,
    wim_extent: FileExtent,
    offset: u64,
    size: u64,
) -> Result<Vec<u8>, RecoveryError> {
    let mut source = SliceSource::new(wim_slice(volume, wim_extent)?);
    let mut sink = VecSink::new();
    duplicate_into(&mut source, offset, size, &mut sink)?;
    Ok(sink.into_inner())
}

fn wim_slice(volume: &RamdiskVolume, extent: FileExtent) -> Result<&[u8], RecoveryError> {
    let start = extent.byte_offset as usize;
    let end = start
        .checked_add(extent.size_bytes as usize)
        .ok_or(RecoveryError::OutOfBounds)?;
    volume
        .as_slice()
        .get(start..end)
        .ok_or(RecoveryError::OutOfBounds)
}
