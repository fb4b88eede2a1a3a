//! GPT synthesis for the recovery image.
//!
//! Writes, in order: the protective MBR, the primary header and entry
//! array, and the backup pair at the end of the device. The entry-array
//! CRC is computed first; the header CRC is computed only once the array
//! CRC is in place, over the 92 header bytes with the CRC field zeroed.

use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;
use uguid::Guid;

use super::crc32::crc32;
use super::gpt::{
    create_gpt_header, create_partition_entry, create_protective_mbr, write_gpt_header,
    GUID_BASIC_DATA, ENTRY_ARRAY_SECTORS, NUM_PARTITION_ENTRIES, PARTITION_ENTRY_SIZE,
};

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GptError {
    IoError,
    /// Device too small to hold both GPT copies plus a usable region.
    DiskTooSmall,
}

impl fmt::Display for GptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "Block I/O error while writing GPT"),
            Self::DiskTooSmall => write!(f, "Device too small for a GPT layout"),
        }
    }
}

/// Sector span of the single data partition, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionExtent {
    pub start_lba: u64,
    pub end_lba: u64,
}

impl PartitionExtent {
    pub fn sectors(&self) -> u64 {
        self.end_lba - self.start_lba + 1
    }
}

const ENTRY_ARRAY_BYTES: usize =
    (NUM_PARTITION_ENTRIES * PARTITION_ENTRY_SIZE) as usize;

/// Write a protective MBR plus primary and backup GPT describing one
/// partition spanning the whole usable region.
pub fn write_gpt<B: BlockIo>(
    block_io: &mut B,
    disk_guid: Guid,
    partition_guid: Guid,
    partition_name: &str,
) -> Result<PartitionExtent, GptError> {
    let disk_size_lba = block_io.num_blocks().map_err(|_| GptError::IoError)?;

    // MBR + two headers + two entry arrays + at least one usable sector
    if disk_size_lba < 3 + 2 * ENTRY_ARRAY_SECTORS + 1 {
        return Err(GptError::DiskTooSmall);
    }

    let mut header = create_gpt_header(disk_size_lba, disk_guid);

    let extent = PartitionExtent {
        start_lba: header.first_usable_lba,
        end_lba: header.last_usable_lba,
    };

    // Entry array: slot 0 holds the single data partition, the rest zero
    let mut entries = [0u8; ENTRY_ARRAY_BYTES];
    let entry = create_partition_entry(
        GUID_BASIC_DATA,
        partition_guid,
        extent.start_lba,
        extent.end_lba,
        partition_name,
    );
    entries[..PARTITION_ENTRY_SIZE as usize].copy_from_slice(&entry);

    // Array CRC first; the header CRC depends on it
    header.partition_array_crc32 = crc32(&entries);

    let mut header_sector = [0u8; 512];
    write_gpt_header(&header, &mut header_sector);
    header.header_crc32 = crc32(&header_sector[..header.header_size as usize]);
    write_gpt_header(&header, &mut header_sector);

    // Protective MBR at LBA 0
    let mbr = create_protective_mbr(disk_size_lba);
    block_io
        .write_blocks(Lba(0), &mbr)
        .map_err(|_| GptError::IoError)?;

    // Primary header + entries
    block_io
        .write_blocks(Lba(1), &header_sector)
        .map_err(|_| GptError::IoError)?;
    block_io
        .write_blocks(Lba(2), &entries)
        .map_err(|_| GptError::IoError)?;

    // Backup pair: entries end right before the backup header at the last LBA
    let backup_entry_lba = disk_size_lba - 1 - ENTRY_ARRAY_SECTORS;
    header.current_lba = disk_size_lba - 1;
    header.backup_lba = 1;
    header.partition_entry_lba = backup_entry_lba;
    header.header_crc32 = 0;
    write_gpt_header(&header, &mut header_sector);
    header.header_crc32 = crc32(&header_sector[..header.header_size as usize]);
    write_gpt_header(&header, &mut header_sector);

    block_io
        .write_blocks(Lba(backup_entry_lba), &entries)
        .map_err(|_| GptError::IoError)?;
    block_io
        .write_blocks(Lba(disk_size_lba - 1), &header_sector)
        .map_err(|_| GptError::IoError)?;

    block_io.flush().map_err(|_| GptError::IoError)?;

    Ok(extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ramdisk::{RamdiskBlockIo, RamdiskVolume};
    use uguid::guid;

    const DISK_GUID: Guid = guid!("11111111-2222-3333-4444-555555555555");
    const PART_GUID: Guid = guid!("66666666-7777-8888-9999-aaaaaaaaaaaa");

    fn written_image(sectors: u64) -> (RamdiskVolume, PartitionExtent) {
        let mut volume = RamdiskVolume::allocate(sectors * 512).unwrap();
        let extent = {
            let mut io = RamdiskBlockIo::new(&mut volume);
            write_gpt(&mut io, DISK_GUID, PART_GUID, "RECOVERY").unwrap()
        };
        (volume, extent)
    }

    #[test]
    fn test_primary_header_crc_validates() {
        let (volume, _) = written_image(4096);
        let image = volume.as_slice();

        let header = &image[512..512 + 92];
        let stored = u32::from_le_bytes(header[16..20].try_into().unwrap());

        let mut scratch = [0u8; 92];
        scratch.copy_from_slice(header);
        scratch[16..20].fill(0);
        assert_eq!(crc32(&scratch), stored);
    }

    #[test]
    fn test_entry_array_crc_validates_independently() {
        let (volume, _) = written_image(4096);
        let image = volume.as_slice();

        let header = &image[512..512 + 92];
        let stored_array_crc = u32::from_le_bytes(header[88..92].try_into().unwrap());
        let entries = &image[2 * 512..2 * 512 + ENTRY_ARRAY_BYTES];
        assert_eq!(crc32(entries), stored_array_crc);
    }

    #[test]
    fn test_backup_header_mirrors_primary() {
        let (volume, extent) = written_image(4096);
        let image = volume.as_slice();

        let backup = &image[4095 * 512..4095 * 512 + 92];
        assert_eq!(&backup[0..8], b"EFI PART");
        // current/backup LBAs are swapped in the backup header
        assert_eq!(u64::from_le_bytes(backup[24..32].try_into().unwrap()), 4095);
        assert_eq!(u64::from_le_bytes(backup[32..40].try_into().unwrap()), 1);

        let stored = u32::from_le_bytes(backup[16..20].try_into().unwrap());
        let mut scratch = [0u8; 92];
        scratch.copy_from_slice(backup);
        scratch[16..20].fill(0);
        assert_eq!(crc32(&scratch), stored);

        assert_eq!(extent.start_lba, 34);
        assert_eq!(extent.end_lba, 4062);
    }

    #[test]
    fn test_protective_mbr_written() {
        let (volume, _) = written_image(4096);
        let image = volume.as_slice();
        assert_eq!(image[446 + 4], 0xEE);
        assert_eq!(image[510], 0x55);
        assert_eq!(image[511], 0xAA);
    }

    #[test]
    fn test_disk_too_small() {
        let mut volume = RamdiskVolume::allocate(16 * 512).unwrap();
        let mut io = RamdiskBlockIo::new(&mut volume);
        assert_eq!(
            write_gpt(&mut io, DISK_GUID, PART_GUID, "X").unwrap_err(),
            GptError::DiskTooSmall
        );
    }
}
