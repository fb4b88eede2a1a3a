//! WIM Container Reader
//!
//! A `no_std` reader for the subset of the WIM image format a recovery
//! flow needs: locating named boot files inside a downloaded image and
//! streaming their byte ranges out without decompressing or mounting
//! anything.
//!
//! # Overview
//!
//! A WIM container starts with a fixed 208-byte header whose resource
//! descriptors point at an XML catalog near the end of the file. The
//! catalog maps logical paths to absolute byte ranges. This crate:
//! - parses and sanity-checks the header against the container length
//! - decodes the XML catalog (UTF-16LE or UTF-8) into a resource index
//! - resolves logical paths to `(offset, size)` ranges
//! - streams ranges into a caller-provided sink in bounded chunks
//!
//! # Architecture
//!
//! The implementation is layered:
//! 1. **Source layer** - `ByteSource` abstracts the seekable container
//! 2. **Header layer** - fixed-layout header parsing and validation
//! 3. **Catalog layer** - XML tree parsing and the resource index
//! 4. **Transfer layer** - bounded streaming into a `ByteSink`
//!
//! # Usage
//!
//! ```ignore
//! use wimfs::{SliceSource, WimImage};
//!
//! let mut source = SliceSource::new(&container_bytes);
//! let image = WimImage::open(&mut source)?;
//!
//! let (offset, size) = image.find_resource("\\sources\\boot.sdi")?;
//! wimfs::duplicate_into(&mut source, offset, size, &mut sink)?;
//! ```

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod error;
pub mod header;
pub mod image;
pub mod source;
pub mod xml;

pub use error::{Result, WimError};
pub use header::WimHeader;
pub use image::{duplicate_into, CbmrInfo, WimImage, WimResourceEntry};
pub use source::{ByteSink, ByteSource, SliceSink, SliceSource, VecSink};
