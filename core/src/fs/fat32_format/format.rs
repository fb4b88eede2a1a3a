// FAT32 filesystem formatter

use alloc::vec;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

use super::Fat32Error;

pub const BYTES_PER_SECTOR: u32 = 512;
pub const SECTORS_PER_CLUSTER: u32 = 8; // 4KB clusters
pub const RESERVED_SECTORS: u32 = 32;
pub const NUM_FATS: u32 = 2;
pub const FSINFO_SECTOR: u64 = 1;
pub const BACKUP_BOOT_SECTOR: u64 = 6;

pub const VOLUME_LABEL: [u8; 11] = *b"PHOENIXBMR ";

/// Sectors zeroed per write while clearing the FAT and root regions.
/// Bounds peak scratch memory instead of materializing whole regions.
const ZERO_BURST_SECTORS: u64 = 64;

/// Reserved FAT[0] entry: media descriptor in the low byte.
const FAT_ENTRY_MEDIA: u32 = 0x0FFFFFF8;
/// End-of-chain marker.
const FAT_ENTRY_EOC: u32 = 0x0FFFFFFF;

/// FAT32 Boot Sector (first 512 bytes of partition)
#[repr(C, packed)]
struct Fat32BootSector {
    jmp_boot: [u8; 3],       // Jump instruction
    oem_name: [u8; 8],       // OEM name
    bytes_per_sector: u16,   // Bytes per sector (usually 512)
    sectors_per_cluster: u8, // Sectors per cluster
    reserved_sectors: u16,   // Reserved sectors (usually 32 for FAT32)
    num_fats: u8,            // Number of FAT copies (usually 2)
    root_entry_count: u16,   // Root entries (0 for FAT32)
    total_sectors_16: u16,   // Total sectors (0 for FAT32)
    media_type: u8,          // Media descriptor (0xF8 for hard disk)
    fat_size_16: u16,        // FAT size (0 for FAT32)
    sectors_per_track: u16,  // Sectors per track
    num_heads: u16,          // Number of heads
    hidden_sectors: u32,     // Hidden sectors (LBA start)
    total_sectors_32: u32,   // Total sectors (actual count)
    fat_size_32: u32,        // FAT size in sectors
    ext_flags: u16,          // Extension flags
    fs_version: u16,         // Filesystem version
    root_cluster: u32,       // Root directory cluster (usually 2)
    fs_info_sector: u16,     // FSInfo sector (usually 1)
    backup_boot_sector: u16, // Backup boot sector (usually 6)
    reserved: [u8; 12],      // Reserved
    drive_number: u8,        // Drive number
    reserved1: u8,           // Reserved
    boot_signature: u8,      // Boot signature (0x29)
    volume_id: u32,          // Volume serial number
    volume_label: [u8; 11],  // Volume label
    fs_type: [u8; 8],        // Filesystem type ("FAT32   ")
    boot_code: [u8; 420],    // Boot code
    boot_sector_sig: u16,    // Boot sector signature (0xAA55)
}

impl Fat32BootSector {
    fn new(total_sectors: u32, fat_size: u32, hidden_sectors: u32) -> Self {
        Self {
            jmp_boot: [0xEB, 0x58, 0x90], // JMP short + NOP
            oem_name: *b"PHOENIX ",
            bytes_per_sector: BYTES_PER_SECTOR as u16,
            sectors_per_cluster: SECTORS_PER_CLUSTER as u8,
            reserved_sectors: RESERVED_SECTORS as u16,
            num_fats: NUM_FATS as u8,
            root_entry_count: 0, // FAT32 uses cluster chain
            total_sectors_16: 0, // Use 32-bit field
            media_type: 0xF8,    // Hard disk
            fat_size_16: 0,      // Use 32-bit field
            sectors_per_track: 63,
            num_heads: 255,
            hidden_sectors,
            total_sectors_32: total_sectors,
            fat_size_32: fat_size,
            ext_flags: 0,
            fs_version: 0,
            root_cluster: 2, // Root starts at cluster 2
            fs_info_sector: FSINFO_SECTOR as u16,
            backup_boot_sector: BACKUP_BOOT_SECTOR as u16,
            reserved: [0; 12],
            drive_number: 0x80, // Hard disk
            reserved1: 0,
            boot_signature: 0x29,
            volume_id: 0x50484E58, // Fixed serial; no entropy source pre-boot
            volume_label: VOLUME_LABEL,
            fs_type: *b"FAT32   ",
            boot_code: [0; 420],
            boot_sector_sig: 0xAA55,
        }
    }

    fn to_bytes(&self) -> [u8; 512] {
        unsafe { core::mem::transmute_copy(self) }
    }
}

/// FSInfo sector (sector 1)
#[repr(C, packed)]
struct FsInfoSector {
    lead_sig: u32, // 0x41615252
    reserved1: [u8; 480],
    struc_sig: u32,  // 0x61417272
    free_count: u32, // Free cluster count (-1 = unknown)
    next_free: u32,  // Next free cluster
    reserved2: [u8; 12],
    trail_sig: u32, // 0xAA550000
}

impl FsInfoSector {
    fn new(free_count: u32) -> Self {
        Self {
            lead_sig: 0x41615252,
            reserved1: [0; 480],
            struc_sig: 0x61417272,
            free_count,
            next_free: 3, // Start allocating from cluster 3
            reserved2: [0; 12],
            trail_sig: 0xAA550000,
        }
    }

    fn to_bytes(&self) -> [u8; 512] {
        unsafe { core::mem::transmute_copy(self) }
    }
}

/// Validated FAT32 geometry for one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fat32Geometry {
    pub total_sectors: u32,
    pub fat_size: u32,
    pub cluster_count: u32,
}

impl Fat32Geometry {
    /// Derive FAT size and cluster count from the partition size, then
    /// check both FAT32 invariants. Both must hold or the geometry is
    /// rejected:
    /// - cluster count in [65536, 0x0FFFFFFF] (a smaller count would be
    ///   detected as FAT16, a larger one overflows the 28-bit field)
    /// - the FAT must address every cluster, recomputed independently of
    ///   the sizing formula above
    pub fn compute(partition_sectors: u64) -> Result<Self, Fat32Error> {
        if partition_sectors == 0 || partition_sectors > u32::MAX as u64 {
            return Err(Fat32Error::InvalidGeometry);
        }
        let total_sectors = partition_sectors as u32;
        if total_sectors <= RESERVED_SECTORS {
            return Err(Fat32Error::InvalidGeometry);
        }

        let fat_size = calculate_fat_size(total_sectors);

        let fat_sectors = fat_size as u64 * NUM_FATS as u64;
        let usable = total_sectors as u64 - RESERVED_SECTORS as u64;
        if fat_sectors >= usable {
            return Err(Fat32Error::InvalidGeometry);
        }
        let data_sectors = usable - fat_sectors;
        let cluster_count = (data_sectors / SECTORS_PER_CLUSTER as u64) as u32;

        if !(65536..=0x0FFF_FFFF).contains(&cluster_count) {
            return Err(Fat32Error::InvalidGeometry);
        }

        // Independent capacity check: each FAT sector addresses 128 clusters
        let fat_capacity = fat_size as u64 * (BYTES_PER_SECTOR as u64 / 4);
        if fat_capacity < cluster_count as u64 + 2 {
            return Err(Fat32Error::InvalidGeometry);
        }

        Ok(Self {
            total_sectors,
            fat_size,
            cluster_count,
        })
    }

    pub fn cluster_bytes(&self) -> u64 {
        SECTORS_PER_CLUSTER as u64 * BYTES_PER_SECTOR as u64
    }

    /// First data sector, relative to the partition start.
    pub fn data_start_sector(&self) -> u64 {
        RESERVED_SECTORS as u64 + NUM_FATS as u64 * self.fat_size as u64
    }
}

/// FAT size in sectors from the cluster-count-driven formula: every data
/// cluster consumes one 4-byte FAT entry per FAT copy plus its own
/// sectors, so each FAT sector covers (256 * SecPerClus + NumFATs) / 2
/// sectors of the region being divided up.
fn calculate_fat_size(total_sectors: u32) -> u32 {
    let tmp1 = (total_sectors - RESERVED_SECTORS) as u64;
    let tmp2 = ((256 * SECTORS_PER_CLUSTER + NUM_FATS) / 2) as u64;
    tmp1.div_ceil(tmp2) as u32
}

/// Format a partition as a fresh FAT32 volume.
///
/// Writes the boot sector, FSInfo, their backups at sectors 6/7, zeroes
/// both FATs and the root cluster in bounded bursts, seeds the reserved
/// FAT entries for clusters 0-2, and places the volume label in the root
/// directory's first slot.
pub fn format_fat32<B: BlockIo>(
    block_io: &mut B,
    partition_lba_start: u64,
    partition_sectors: u64,
) -> Result<Fat32Geometry, Fat32Error> {
    let geometry = Fat32Geometry::compute(partition_sectors)?;

    let boot_sector = Fat32BootSector::new(
        geometry.total_sectors,
        geometry.fat_size,
        u32::try_from(partition_lba_start).unwrap_or(0),
    );
    let boot_bytes = boot_sector.to_bytes();

    write_sector(block_io, partition_lba_start, &boot_bytes)?;
    write_sector(
        block_io,
        partition_lba_start + BACKUP_BOOT_SECTOR,
        &boot_bytes,
    )?;

    // Root directory occupies exactly one cluster at format time
    let fsinfo = FsInfoSector::new(geometry.cluster_count - 1);
    let fsinfo_bytes = fsinfo.to_bytes();
    write_sector(block_io, partition_lba_start + FSINFO_SECTOR, &fsinfo_bytes)?;
    write_sector(
        block_io,
        partition_lba_start + BACKUP_BOOT_SECTOR + 1,
        &fsinfo_bytes,
    )?;

    // Clear both FATs and the root cluster
    let fat_region_sectors = geometry.fat_size as u64 * NUM_FATS as u64;
    zero_region(
        block_io,
        partition_lba_start + RESERVED_SECTORS as u64,
        fat_region_sectors,
    )?;
    zero_region(
        block_io,
        partition_lba_start + geometry.data_start_sector(),
        SECTORS_PER_CLUSTER as u64,
    )?;

    // Seed reserved entries for clusters 0-2: media descriptor, reserved
    // EOC, and the root directory's single-cluster chain
    let mut fat_head = [0u8; 512];
    fat_head[0..4].copy_from_slice(&FAT_ENTRY_MEDIA.to_le_bytes());
    fat_head[4..8].copy_from_slice(&FAT_ENTRY_EOC.to_le_bytes());
    fat_head[8..12].copy_from_slice(&FAT_ENTRY_EOC.to_le_bytes());

    write_sector(
        block_io,
        partition_lba_start + RESERVED_SECTORS as u64,
        &fat_head,
    )?;
    write_sector(
        block_io,
        partition_lba_start + RESERVED_SECTORS as u64 + geometry.fat_size as u64,
        &fat_head,
    )?;

    // Volume label in the root directory's first slot
    let mut label_sector = [0u8; 512];
    label_sector[0..11].copy_from_slice(&VOLUME_LABEL);
    label_sector[11] = 0x08; // ATTR_VOLUME_ID
    write_sector(
        block_io,
        partition_lba_start + geometry.data_start_sector(),
        &label_sector,
    )?;

    block_io.flush().map_err(|_| Fat32Error::IoError)?;

    Ok(geometry)
}

fn write_sector<B: BlockIo>(
    block_io: &mut B,
    lba: u64,
    bytes: &[u8; 512],
) -> Result<(), Fat32Error> {
    block_io
        .write_blocks(Lba(lba), bytes)
        .map_err(|_| Fat32Error::IoError)
}

fn zero_region<B: BlockIo>(
    block_io: &mut B,
    start_lba: u64,
    sectors: u64,
) -> Result<(), Fat32Error> {
    let scratch = vec![0u8; (ZERO_BURST_SECTORS * BYTES_PER_SECTOR as u64) as usize];
    let mut lba = start_lba;
    let mut remaining = sectors;
    while remaining > 0 {
        let burst = remaining.min(ZERO_BURST_SECTORS);
        let bytes = (burst * BYTES_PER_SECTOR as u64) as usize;
        block_io
            .write_blocks(Lba(lba), &scratch[..bytes])
            .map_err(|_| Fat32Error::IoError)?;
        lba += burst;
        remaining -= burst;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_valid_range() {
        // 640 MiB of partition sectors comfortably clears 65536 clusters
        let geometry = Fat32Geometry::compute(1_310_720).unwrap();
        assert!(geometry.cluster_count >= 65536);
        assert!(geometry.cluster_count <= 0x0FFF_FFFF);
        // FAT must cover every cluster plus the two reserved entries
        let capacity = geometry.fat_size as u64 * 128;
        assert!(capacity >= geometry.cluster_count as u64 + 2);
    }

    #[test]
    fn test_geometry_too_small_is_rejected() {
        // 64 MiB yields far fewer than 65536 4K clusters
        assert_eq!(
            Fat32Geometry::compute(131_072).unwrap_err(),
            Fat32Error::InvalidGeometry
        );
    }

    #[test]
    fn test_geometry_degenerate_sizes() {
        assert_eq!(
            Fat32Geometry::compute(0).unwrap_err(),
            Fat32Error::InvalidGeometry
        );
        assert_eq!(
            Fat32Geometry::compute(RESERVED_SECTORS as u64).unwrap_err(),
            Fat32Error::InvalidGeometry
        );
        assert_eq!(
            Fat32Geometry::compute(u32::MAX as u64 + 1).unwrap_err(),
            Fat32Error::InvalidGeometry
        );
    }

    #[test]
    fn test_boot_sector_layout() {
        let bytes = Fat32BootSector::new(1_310_720, 1281, 34).to_bytes();
        assert_eq!(&bytes[3..11], b"PHOENIX ");
        assert_eq!(u16::from_le_bytes([bytes[11], bytes[12]]), 512);
        assert_eq!(bytes[13], 8);
        assert_eq!(u16::from_le_bytes([bytes[14], bytes[15]]), 32);
        assert_eq!(bytes[16], 2);
        assert_eq!(
            u32::from_le_bytes(bytes[44..48].try_into().unwrap()),
            2,
            "root cluster"
        );
        assert_eq!(u16::from_le_bytes([bytes[48], bytes[49]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[50], bytes[51]]), 6);
        assert_eq!(&bytes[82..90], b"FAT32   ");
        assert_eq!(bytes[510], 0x55);
        assert_eq!(bytes[511], 0xAA);
    }

    #[test]
    fn test_fsinfo_layout() {
        let bytes = FsInfoSector::new(1234).to_bytes();
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 0x41615252);
        assert_eq!(
            u32::from_le_bytes(bytes[484..488].try_into().unwrap()),
            0x61417272
        );
        assert_eq!(u32::from_le_bytes(bytes[488..492].try_into().unwrap()), 1234);
        assert_eq!(u32::from_le_bytes(bytes[492..496].try_into().unwrap()), 3);
        assert_eq!(
            u32::from_le_bytes(bytes[508..512].try_into().unwrap()),
            0xAA550000
        );
    }
}
