//! Byte source and sink abstractions.
//!
//! A WIM container may live in a memory buffer or inside a region of the
//! recovery disk image; `ByteSource` is the seekable seam between them
//! and the parser. `ByteSink` is the sequential destination used when
//! duplicating a resource out of the container.

use alloc::vec::Vec;

use crate::error::{Result, WimError};

/// Random-access byte container of known length.
pub trait ByteSource {
    /// Total length of the container in bytes.
    fn total_len(&mut self) -> Result<u64>;

    /// Fill `buf` from the container starting at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

/// Sequential destination for duplicated resource bytes.
pub trait ByteSink {
    /// Append one chunk. Chunks arrive in order with no gaps.
    fn write_all(&mut self, chunk: &[u8]) -> Result<()>;
}

/// `ByteSource` over an in-memory slice.
pub struct SliceSource<'a> {
    data: &'a [u8],
}

impl<'a> SliceSource<'a> {
    /// Wrap a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl ByteSource for SliceSource<'_> {
    fn total_len(&mut self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(WimError::IoError)?;
        if end > self.data.len() as u64 {
            return Err(WimError::IoError);
        }
        buf.copy_from_slice(&self.data[offset as usize..end as usize]);
        Ok(())
    }
}

/// `ByteSink` over a pre-sized mutable slice; refuses writes past its end.
pub struct SliceSink<'a> {
    data: &'a mut [u8],
    position: usize,
}

impl<'a> SliceSink<'a> {
    /// Wrap a destination slice.
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.position
    }
}

impl ByteSink for SliceSink<'_> {
    fn write_all(&mut self, chunk: &[u8]) -> Result<()> {
        let end = self
            .position
            .checked_add(chunk.len())
            .ok_or(WimError::SinkError)?;
        if end > self.data.len() {
            return Err(WimError::SinkError);
        }
        self.data[self.position..end].copy_from_slice(chunk);
        self.position = end;
        Ok(())
    }
}

/// `ByteSink` accumulating into a growable buffer.
#[derive(Default)]
pub struct VecSink {
    data: Vec<u8>,
}

impl VecSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the accumulated bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl ByteSink for VecSink {
    fn write_all(&mut self, chunk: &[u8]) -> Result<()> {
        self.data.extend_from_slice(chunk);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_source_bounds() {
        let data = [1u8, 2, 3, 4];
        let mut source = SliceSource::new(&data);
        assert_eq!(source.total_len().unwrap(), 4);

        let mut buf = [0u8; 2];
        source.read_at(1, &mut buf).unwrap();
        assert_eq!(buf, [2, 3]);

        assert_eq!(source.read_at(3, &mut buf).unwrap_err(), WimError::IoError);
        assert_eq!(
            source.read_at(u64::MAX, &mut buf).unwrap_err(),
            WimError::IoError
        );
    }

    #[test]
    fn test_slice_sink_refuses_overflow() {
        let mut out = [0u8; 4];
        let mut sink = SliceSink::new(&mut out);
        sink.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(sink.written(), 3);
        assert_eq!(sink.write_all(&[4, 5]).unwrap_err(), WimError::SinkError);
    }

    #[test]
    fn test_vec_sink_accumulates() {
        let mut sink = VecSink::new();
        sink.write_all(b"ab").unwrap();
        sink.write_all(b"cd").unwrap();
        assert_eq!(sink.into_inner(), b"abcd");
    }
}
