// FAT32 directory entry management

use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

use super::super::fat32_format::Fat32Error;
use super::context::Fat32Context;
use super::filename;

const SECTOR_SIZE: usize = 512;
const ENTRY_SIZE: usize = 32;
const FAT_EOC_MIN: u32 = 0x0FFFFFF8;

pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
const ATTR_LONG_NAME: u8 = 0x0F;

#[derive(Debug, Clone, Copy)]
pub struct DirEntry {
    pub name: [u8; 11],
    pub attr: u8,
    pub first_cluster: u32,
    pub size: u32,
}

fn parse_entry(raw: &[u8]) -> DirEntry {
    let mut name = [0u8; 11];
    name.copy_from_slice(&raw[0..11]);
    let hi = u16::from_le_bytes([raw[20], raw[21]]) as u32;
    let lo = u16::from_le_bytes([raw[26], raw[27]]) as u32;
    DirEntry {
        name,
        attr: raw[11],
        first_cluster: (hi << 16) | lo,
        size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
    }
}

fn encode_entry(name: &[u8; 11], attr: u8, first_cluster: u32, size: u32) -> [u8; ENTRY_SIZE] {
    let mut raw = [0u8; ENTRY_SIZE];
    raw[0..11].copy_from_slice(name);
    raw[11] = attr;
    raw[20..22].copy_from_slice(&((first_cluster >> 16) as u16).to_le_bytes());
    raw[26..28].copy_from_slice(&(first_cluster as u16).to_le_bytes());
    raw[28..32].copy_from_slice(&size.to_le_bytes());
    raw
}

/// Scan a directory's cluster chain for an entry with the given 8.3 name.
pub fn find_entry<B: BlockIo>(
    block_io: &mut B,
    partition_start: u64,
    ctx: &Fat32Context,
    dir_cluster: u32,
    name: &[u8; 11],
) -> Result<Option<DirEntry>, Fat32Error> {
    let mut cluster = dir_cluster;
    let mut sector = [0u8; SECTOR_SIZE];

    loop {
        let first_sector = ctx.cluster_to_sector(cluster);
        for s in 0..ctx.sectors_per_cluster {
            let lba = partition_start + (first_sector + s) as u64;
            block_io
                .read_blocks(Lba(lba), &mut sector)
                .map_err(|_| Fat32Error::IoError)?;

            for raw in sector.chunks_exact(ENTRY_SIZE) {
                match raw[0] {
                    0x00 => return Ok(None), // end of directory
                    0xE5 => continue,        // deleted slot
                    _ => {}
                }
                if raw[11] == ATTR_LONG_NAME {
                    continue;
                }
                if &raw[0..11] == name {
                    return Ok(Some(parse_entry(raw)));
                }
            }
        }

        let next = ctx.read_fat_entry(block_io, partition_start, cluster)?;
        if next >= FAT_EOC_MIN || next == 0 {
            return Ok(None);
        }
        cluster = next;
    }
}

/// Place a new entry in the first free slot of the directory, extending
/// the directory by one cluster when the chain is full.
#[allow(clippy::too_many_arguments)]
pub fn create_entry<B: BlockIo>(
    block_io: &mut B,
    partition_start: u64,
    ctx: &Fat32Context,
    dir_cluster: u32,
    name: &[u8; 11],
    attr: u8,
    first_cluster: u32,
    size: u32,
) -> Result<(), Fat32Error> {
    let encoded = encode_entry(name, attr, first_cluster, size);
    let mut cluster = dir_cluster;
    let mut sector = [0u8; SECTOR_SIZE];

    loop {
        let first_sector = ctx.cluster_to_sector(cluster);
        for s in 0..ctx.sectors_per_cluster {
            let lba = partition_start + (first_sector + s) as u64;
            block_io
                .read_blocks(Lba(lba), &mut sector)
                .map_err(|_| Fat32Error::IoError)?;

            for (i, raw) in sector.chunks_exact(ENTRY_SIZE).enumerate() {
                if raw[0] == 0x00 || raw[0] == 0xE5 {
                    let off = i * ENTRY_SIZE;
                    sector[off..off + ENTRY_SIZE].copy_from_slice(&encoded);
                    return block_io
                        .write_blocks(Lba(lba), &sector)
                        .map_err(|_| Fat32Error::IoError);
                }
            }
        }

        let next = ctx.read_fat_entry(block_io, partition_start, cluster)?;
        if next >= FAT_EOC_MIN || next == 0 {
            // Chain exhausted: grow the directory by one cluster
            let grown = ctx.find_contiguous_free(block_io, partition_start, 1)?;
            ctx.write_chain(block_io, partition_start, grown, 1)?;
            ctx.write_fat_entry(block_io, partition_start, cluster, grown)?;
            ctx.consume_free_clusters(block_io, partition_start, grown, 1)?;
            zero_cluster(block_io, partition_start, ctx, grown)?;
            cluster = grown;
        } else {
            cluster = next;
        }
    }
}

/// Find a subdirectory by name, creating it when absent.
pub fn ensure_directory_exists<B: BlockIo>(
    block_io: &mut B,
    partition_start: u64,
    ctx: &Fat32Context,
    parent_cluster: u32,
    name: &str,
) -> Result<u32, Fat32Error> {
    let name83 = filename::to_8_3(name)?;

    if let Some(entry) = find_entry(block_io, partition_start, ctx, parent_cluster, &name83)? {
        if entry.attr & ATTR_DIRECTORY != 0 {
            return Ok(entry.first_cluster);
        }
        return Err(Fat32Error::InvalidPath);
    }

    let new_cluster = ctx.find_contiguous_free(block_io, partition_start, 1)?;
    ctx.write_chain(block_io, partition_start, new_cluster, 1)?;
    ctx.consume_free_clusters(block_io, partition_start, new_cluster, 1)?;
    zero_cluster(block_io, partition_start, ctx, new_cluster)?;

    // "." and ".." lead every directory cluster
    let mut sector = [0u8; SECTOR_SIZE];
    let dot = encode_entry(b".          ", ATTR_DIRECTORY, new_cluster, 0);
    let parent_ref = if parent_cluster == ctx.root_cluster {
        0 // ".." of a first-level directory points at cluster 0 by convention
    } else {
        parent_cluster
    };
    let dotdot = encode_entry(b"..         ", ATTR_DIRECTORY, parent_ref, 0);
    sector[0..ENTRY_SIZE].copy_from_slice(&dot);
    sector[ENTRY_SIZE..2 * ENTRY_SIZE].copy_from_slice(&dotdot);

    let lba = partition_start + ctx.cluster_to_sector(new_cluster) as u64;
    block_io
        .write_blocks(Lba(lba), &sector)
        .map_err(|_| Fat32Error::IoError)?;

    create_entry(
        block_io,
        partition_start,
        ctx,
        parent_cluster,
        &name83,
        ATTR_DIRECTORY,
        new_cluster,
        0,
    )?;

    Ok(new_cluster)
}

fn zero_cluster<B: BlockIo>(
    block_io: &mut B,
    partition_start: u64,
    ctx: &Fat32Context,
    cluster: u32,
) -> Result<(), Fat32Error> {
    let zeros = [0u8; SECTOR_SIZE];
    let first_sector = ctx.cluster_to_sector(cluster);
    for s in 0..ctx.sectors_per_cluster {
        let lba = partition_start + (first_sector + s) as u64;
        block_io
            .write_blocks(Lba(lba), &zeros)
            .map_err(|_| Fat32Error::IoError)?;
    }
    Ok(())
}
