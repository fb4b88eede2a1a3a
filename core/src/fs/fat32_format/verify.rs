// FAT32 post-format verification

use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

use super::Fat32Error;

/// Re-read the structures written by `format_fat32` and confirm their
/// signatures and reserved markers survived intact.
pub fn verify_fat32<B: BlockIo>(
    block_io: &mut B,
    partition_lba_start: u64,
) -> Result<(), Fat32Error> {
    let mut buffer = [0u8; 512];

    // Boot sector
    block_io
        .read_blocks(Lba(partition_lba_start), &mut buffer)
        .map_err(|_| Fat32Error::IoError)?;

    if buffer[510] != 0x55 || buffer[511] != 0xAA {
        return Err(Fat32Error::VerifyFailed);
    }
    if &buffer[3..11] != b"PHOENIX " {
        return Err(Fat32Error::VerifyFailed);
    }

    let bytes_per_sector = u16::from_le_bytes([buffer[11], buffer[12]]);
    if bytes_per_sector != 512 {
        return Err(Fat32Error::InvalidBlockSize);
    }

    let reserved_sectors = u16::from_le_bytes([buffer[14], buffer[15]]);
    if reserved_sectors != 32 {
        return Err(Fat32Error::VerifyFailed);
    }
    if buffer[16] != 2 {
        return Err(Fat32Error::VerifyFailed);
    }

    let root_cluster = u32::from_le_bytes([buffer[44], buffer[45], buffer[46], buffer[47]]);
    if root_cluster != 2 {
        return Err(Fat32Error::VerifyFailed);
    }
    if u16::from_le_bytes([buffer[48], buffer[49]]) != 1 {
        return Err(Fat32Error::VerifyFailed);
    }
    if u16::from_le_bytes([buffer[50], buffer[51]]) != 6 {
        return Err(Fat32Error::VerifyFailed);
    }
    if &buffer[82..90] != b"FAT32   " {
        return Err(Fat32Error::VerifyFailed);
    }

    let fat_size = u32::from_le_bytes([buffer[36], buffer[37], buffer[38], buffer[39]]);

    // FSInfo sector
    block_io
        .read_blocks(Lba(partition_lba_start + 1), &mut buffer)
        .map_err(|_| Fat32Error::IoError)?;

    if u32::from_le_bytes(buffer[0..4].try_into().unwrap()) != 0x41615252 {
        return Err(Fat32Error::VerifyFailed);
    }
    if u32::from_le_bytes(buffer[484..488].try_into().unwrap()) != 0x61417272 {
        return Err(Fat32Error::VerifyFailed);
    }
    if u32::from_le_bytes(buffer[508..512].try_into().unwrap()) != 0xAA550000 {
        return Err(Fat32Error::VerifyFailed);
    }

    // Backup boot sector
    block_io
        .read_blocks(Lba(partition_lba_start + 6), &mut buffer)
        .map_err(|_| Fat32Error::IoError)?;

    if buffer[510] != 0x55 || buffer[511] != 0xAA {
        return Err(Fat32Error::VerifyFailed);
    }
    if &buffer[3..11] != b"PHOENIX " {
        return Err(Fat32Error::VerifyFailed);
    }

    // Both FAT heads carry the reserved cluster 0-2 markers
    for fat_num in 0..2u64 {
        let lba = partition_lba_start + reserved_sectors as u64 + fat_num * fat_size as u64;
        block_io
            .read_blocks(Lba(lba), &mut buffer)
            .map_err(|_| Fat32Error::IoError)?;

        let entry0 = u32::from_le_bytes(buffer[0..4].try_into().unwrap());
        let entry1 = u32::from_le_bytes(buffer[4..8].try_into().unwrap());
        let entry2 = u32::from_le_bytes(buffer[8..12].try_into().unwrap());
        if entry0 != 0x0FFFFFF8 || entry1 != 0x0FFFFFFF || entry2 != 0x0FFFFFFF {
            return Err(Fat32Error::VerifyFailed);
        }
    }

    Ok(())
}
