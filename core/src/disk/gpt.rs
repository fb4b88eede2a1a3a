// GPT (GUID Partition Table) structure layout

use uguid::{guid, Guid};

pub const GPT_SIGNATURE: &[u8; 8] = b"EFI PART";

/// EFI System Partition type GUID
pub const GUID_EFI_SYSTEM: Guid = guid!("c12a7328-f81f-11d2-ba4b-00a0c93ec93b");

/// Microsoft Basic Data type GUID
pub const GUID_BASIC_DATA: Guid = guid!("ebd0a0a2-b9e5-4433-87c0-68b6b72699c7");

/// Partition entries per table (fixed standard layout)
pub const NUM_PARTITION_ENTRIES: u32 = 128;

/// Bytes per partition entry
pub const PARTITION_ENTRY_SIZE: u32 = 128;

/// Sectors occupied by the full entry array (128 x 128 / 512)
pub const ENTRY_ARRAY_SECTORS: u64 = 32;

pub struct GptHeader {
    pub signature: [u8; 8], // "EFI PART"
    pub revision: u32,
    pub header_size: u32,
    pub header_crc32: u32,
    pub reserved: u32,
    pub current_lba: u64,
    pub backup_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub disk_guid: Guid,
    pub partition_entry_lba: u64,
    pub num_partition_entries: u32,
    pub partition_entry_size: u32,
    pub partition_array_crc32: u32,
}

/// Create a primary GPT header for a disk of `disk_size_lba` sectors.
/// Both CRC fields start at zero; the writer fills them in after the
/// partition-entry-table CRC is known.
pub fn create_gpt_header(disk_size_lba: u64, disk_guid: Guid) -> GptHeader {
    GptHeader {
        signature: *GPT_SIGNATURE,
        revision: 0x00010000, // GPT 1.0
        header_size: 92,
        header_crc32: 0,
        reserved: 0,
        current_lba: 1,
        backup_lba: disk_size_lba - 1,
        first_usable_lba: 2 + ENTRY_ARRAY_SECTORS,
        last_usable_lba: disk_size_lba - 2 - ENTRY_ARRAY_SECTORS,
        disk_guid,
        partition_entry_lba: 2,
        num_partition_entries: NUM_PARTITION_ENTRIES,
        partition_entry_size: PARTITION_ENTRY_SIZE,
        partition_array_crc32: 0,
    }
}

/// Serialize a GPT header into a 512-byte sector buffer.
pub fn write_gpt_header(header: &GptHeader, buffer: &mut [u8; 512]) {
    buffer.fill(0);

    buffer[0..8].copy_from_slice(&header.signature);
    buffer[8..12].copy_from_slice(&header.revision.to_le_bytes());
    buffer[12..16].copy_from_slice(&header.header_size.to_le_bytes());
    buffer[16..20].copy_from_slice(&header.header_crc32.to_le_bytes());
    buffer[20..24].copy_from_slice(&header.reserved.to_le_bytes());
    buffer[24..32].copy_from_slice(&header.current_lba.to_le_bytes());
    buffer[32..40].copy_from_slice(&header.backup_lba.to_le_bytes());
    buffer[40..48].copy_from_slice(&header.first_usable_lba.to_le_bytes());
    buffer[48..56].copy_from_slice(&header.last_usable_lba.to_le_bytes());
    buffer[56..72].copy_from_slice(&header.disk_guid.to_bytes());
    buffer[72..80].copy_from_slice(&header.partition_entry_lba.to_le_bytes());
    buffer[80..84].copy_from_slice(&header.num_partition_entries.to_le_bytes());
    buffer[84..88].copy_from_slice(&header.partition_entry_size.to_le_bytes());
    buffer[88..92].copy_from_slice(&header.partition_array_crc32.to_le_bytes());
}

/// Create one 128-byte partition entry.
pub fn create_partition_entry(
    type_guid: Guid,
    unique_guid: Guid,
    start_lba: u64,
    end_lba: u64,
    name: &str,
) -> [u8; 128] {
    let mut entry = [0u8; 128];

    entry[0..16].copy_from_slice(&type_guid.to_bytes());
    entry[16..32].copy_from_slice(&unique_guid.to_bytes());
    entry[32..40].copy_from_slice(&start_lba.to_le_bytes());
    entry[40..48].copy_from_slice(&end_lba.to_le_bytes());
    entry[48..56].fill(0); // Attributes

    // Partition name (UTF-16LE, max 36 characters)
    for (i, &byte) in name.as_bytes().iter().take(36).enumerate() {
        entry[56 + i * 2] = byte;
        entry[56 + i * 2 + 1] = 0;
    }

    entry
}

/// Create the protective MBR sector: one partition of type 0xEE covering
/// the whole device so legacy tools leave the GPT alone.
pub fn create_protective_mbr(disk_size_lba: u64) -> [u8; 512] {
    let mut sector = [0u8; 512];

    let entry = &mut sector[446..462];
    entry[0] = 0x00; // Not bootable
    entry[1] = 0x00; // CHS start
    entry[2] = 0x02;
    entry[3] = 0x00;
    entry[4] = 0xEE; // Protective GPT type
    entry[5] = 0xFF; // CHS end (maxed)
    entry[6] = 0xFF;
    entry[7] = 0xFF;
    entry[8..12].copy_from_slice(&1u32.to_le_bytes()); // First LBA
    let size = u32::try_from(disk_size_lba - 1).unwrap_or(u32::MAX);
    entry[12..16].copy_from_slice(&size.to_le_bytes());

    sector[510] = 0x55;
    sector[511] = 0xAA;
    sector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = create_gpt_header(1_000_000, GUID_BASIC_DATA);
        let mut sector = [0u8; 512];
        write_gpt_header(&header, &mut sector);

        assert_eq!(&sector[0..8], b"EFI PART");
        assert_eq!(u32::from_le_bytes(sector[8..12].try_into().unwrap()), 0x00010000);
        assert_eq!(u32::from_le_bytes(sector[12..16].try_into().unwrap()), 92);
        assert_eq!(u64::from_le_bytes(sector[24..32].try_into().unwrap()), 1);
        assert_eq!(u64::from_le_bytes(sector[32..40].try_into().unwrap()), 999_999);
        assert_eq!(u64::from_le_bytes(sector[40..48].try_into().unwrap()), 34);
        assert_eq!(u64::from_le_bytes(sector[48..56].try_into().unwrap()), 999_966);
    }

    #[test]
    fn test_partition_entry_name_utf16() {
        let entry = create_partition_entry(GUID_BASIC_DATA, GUID_BASIC_DATA, 34, 99, "RECOVERY");
        assert_eq!(u64::from_le_bytes(entry[32..40].try_into().unwrap()), 34);
        assert_eq!(u64::from_le_bytes(entry[40..48].try_into().unwrap()), 99);
        assert_eq!(entry[56], b'R');
        assert_eq!(entry[57], 0);
        assert_eq!(entry[58], b'E');
    }

    #[test]
    fn test_protective_mbr() {
        let sector = create_protective_mbr(0x2000);
        assert_eq!(sector[446 + 4], 0xEE);
        assert_eq!(
            u32::from_le_bytes(sector[446 + 8..446 + 12].try_into().unwrap()),
            1
        );
        assert_eq!(
            u32::from_le_bytes(sector[446 + 12..446 + 16].try_into().unwrap()),
            0x1FFF
        );
        assert_eq!(sector[510], 0x55);
        assert_eq!(sector[511], 0xAA);
    }
}
