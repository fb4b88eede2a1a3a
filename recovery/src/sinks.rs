//! Download sink routing onto the recovery volume.
//!
//! Each collateral either streams into a freshly allocated FAT32 file
//! on the ramdisk or into a memory buffer, chosen per descriptor. The
//! volume path never buffers a whole file in memory.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use phoenix_core::fs::fat32_ops::{self, FileExtent};
use phoenix_core::log_info;
use phoenix_core::ramdisk::{RamdiskBlockIo, RamdiskVolume};
use phoenix_net::dcat::CollateralDescriptor;
use phoenix_net::download::{CollateralSink, MemorySink, SinkPolicy};
use phoenix_net::{NetError, Result};

/// Byte-extent sink over an allocated file's data region.
pub struct ExtentSink<'a> {
    volume: &'a mut RamdiskVolume,
    base: u64,
    len: u64,
}

impl CollateralSink for ExtentSink<'_> {
    fn write_at(&mut self, offset: u64, chunk: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(chunk.len() as u64)
            .ok_or(NetError::Aborted)?;
        if end > self.len {
            return Err(NetError::Aborted);
        }
        self.volume
            .write(self.base + offset, chunk)
            .map_err(|_| NetError::Aborted)
    }
}

/// Routes descriptors to volume files or memory buffers and remembers
/// where everything landed.
pub struct VolumeSinkPolicy<'v> {
    volume: &'v mut RamdiskVolume,
    partition_lba: u64,
    placed: Vec<(String, FileExtent)>,
    memory: Vec<(usize, MemorySink)>,
}

impl<'v> VolumeSinkPolicy<'v> {
    pub fn new(volume: &'v mut RamdiskVolume, partition_lba: u64) -> Self {
        Self {
            volume,
            partition_lba,
            placed: Vec::new(),
            memory: Vec::new(),
        }
    }

    /// Volume placements and memory captures, by collateral order.
    pub fn into_parts(self) -> (Vec<(String, FileExtent)>, Vec<(usize, Vec<u8>)>) {
        let memory = self
            .memory
            .into_iter()
            .map(|(index, sink)| (index, sink.into_inner()))
            .collect();
        (self.placed, memory)
    }
}

impl SinkPolicy for VolumeSinkPolicy<'_> {
    fn open<'s>(
        &'s mut self,
        index: usize,
        descriptor: &CollateralDescriptor,
    ) -> Result<Box<dyn CollateralSink + 's>> {
        if descriptor.store_in_memory {
            self.memory.push((index, MemorySink::new()));
            let sink = self
                .memory
                .last_mut()
                .map(|(_, sink)| sink)
                .ok_or(NetError::OutOfResources)?;
            return Ok(Box::new(sink));
        }

        let extent = {
            let mut io = RamdiskBlockIo::new(self.volume);
            fat32_ops::allocate_file(
                &mut io,
                self.partition_lba,
                &descriptor.target_path,
                descriptor.size_bytes,
            )
        }
        .map_err(|_| {
            log_info!("download: target file allocation failed");
            NetError::OutOfResources
        })?;

        self.placed.push((descriptor.target_path.clone(), extent));
        Ok(Box::new(ExtentSink {
            volume: &mut *self.volume,
            base: extent.byte_offset,
            len: extent.size_bytes,
        }))
    }
}
