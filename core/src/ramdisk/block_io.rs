//! `gpt_disk_io::BlockIo` adapter for the ramdisk buffer.
//!
//! Lets the GPT and FAT32 writers stay generic over block devices while
//! the recovery flow targets the in-memory volume.

use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

use super::{RamdiskError, RamdiskVolume, SECTOR_SIZE};

/// Sector-addressed view of a [`RamdiskVolume`].
pub struct RamdiskBlockIo<'a> {
    volume: &'a mut RamdiskVolume,
}

impl<'a> RamdiskBlockIo<'a> {
    pub fn new(volume: &'a mut RamdiskVolume) -> Self {
        Self { volume }
    }
}

impl BlockIo for RamdiskBlockIo<'_> {
    type Error = RamdiskError;

    fn block_size(&self) -> BlockSize {
        BlockSize::BS_512
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok(self.volume.total_sectors())
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        let offset = start_lba
            .0
            .checked_mul(SECTOR_SIZE)
            .ok_or(RamdiskError::OutOfBounds)?;
        self.volume.read(offset, dst)
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        let offset = start_lba
            .0
            .checked_mul(SECTOR_SIZE)
            .ok_or(RamdiskError::OutOfBounds)?;
        self.volume.write(offset, src)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
