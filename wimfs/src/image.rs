//! Open WIM containers and resolve catalog resources.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Result, WimError};
use crate::header::{WimHeader, WIM_HEADER_SIZE};
use crate::source::{ByteSink, ByteSource};
use crate::xml::{self, XmlNode};

/// Streaming copy chunk size for `duplicate_into`.
const COPY_CHUNK: usize = 64 * 1024;

/// Largest XML catalog accepted before the container is treated as
/// malformed; real catalogs are a few kilobytes.
const MAX_XML_BYTES: u64 = 4 * 1024 * 1024;

/// One `<FILE>` entry from the resource catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WimResourceEntry {
    /// Logical path, as written in the catalog.
    pub path: String,
    /// Absolute byte offset inside the container.
    pub offset: u64,
    /// Resource size in bytes.
    pub size: u64,
}

/// Recovery inventory payload carried in the optional `<CBMR>` node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CbmrInfo {
    /// Product name, e.g. an OS edition identifier.
    pub product: String,
    /// Installed OS version string.
    pub version: String,
    /// Installed OS build string.
    pub build: String,
    /// Architecture identifier.
    pub arch: String,
}

/// A parsed container: header fields plus the decoded resource index.
/// Opening reads only the header and catalog; resource bytes stay in the
/// source until duplicated out.
#[derive(Debug)]
pub struct WimImage {
    total_len: u64,
    image_count: u32,
    resources: Option<Vec<WimResourceEntry>>,
    cbmr: Option<CbmrInfo>,
}

impl WimImage {
    /// Open a container: parse the header, enforce the length invariant,
    /// and decode the XML catalog into the resource index.
    pub fn open<S: ByteSource>(source: &mut S) -> Result<Self> {
        let total_len = source.total_len()?;
        if total_len < WIM_HEADER_SIZE as u64 {
            return Err(WimError::MalformedContainer);
        }

        let mut raw_header = [0u8; WIM_HEADER_SIZE];
        source.read_at(0, &mut raw_header)?;
        let header = WimHeader::parse(&raw_header)?;
        header.validate_length(total_len)?;

        if header.xml.size == 0 || header.xml.size > MAX_XML_BYTES {
            return Err(WimError::MalformedContainer);
        }
        if header.xml.offset < WIM_HEADER_SIZE as u64 {
            return Err(WimError::MalformedContainer);
        }

        let mut xml_bytes = vec![0u8; header.xml.size as usize];
        source.read_at(header.xml.offset, &mut xml_bytes)?;
        let xml_text = decode_catalog_text(&xml_bytes)?;
        let root = xml::parse_document(&xml_text)?;
        if root.name != "WIM" {
            return Err(WimError::MalformedContainer);
        }

        // <RESOURCES> under <IMAGE> is optional: its absence only disables
        // file extraction, not opening the container
        let resources = root
            .child("IMAGE")
            .and_then(|image| image.child("RESOURCES"))
            .map(|res| parse_resources(res, total_len))
            .transpose()?;

        let cbmr = root.child("CBMR").map(parse_cbmr);

        Ok(Self {
            total_len,
            image_count: header.image_count,
            resources,
            cbmr,
        })
    }

    /// Container length in bytes.
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    /// Number of images declared by the header.
    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    /// Whether the catalog carries a `<RESOURCES>` index.
    pub fn has_resources(&self) -> bool {
        self.resources.is_some()
    }

    /// Inventory payload from the optional `<CBMR>` node.
    pub fn cbmr(&self) -> Option<&CbmrInfo> {
        self.cbmr.as_ref()
    }

    /// Resolve a logical path to its `(offset, size)` byte range.
    ///
    /// The catalog is scanned linearly and the first exact path match
    /// wins. A container without a resource index cannot serve lookups.
    pub fn find_resource(&self, path: &str) -> Result<(u64, u64)> {
        let resources = self
            .resources
            .as_ref()
            .ok_or(WimError::MalformedContainer)?;
        resources
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| (entry.offset, entry.size))
            .ok_or(WimError::NotFound)
    }
}

/// Stream `size` bytes starting at `offset` from the container into the
/// sink, in bounded chunks, without materializing the range.
pub fn duplicate_into<S: ByteSource, K: ByteSink>(
    source: &mut S,
    offset: u64,
    size: u64,
    sink: &mut K,
) -> Result<u64> {
    let total_len = source.total_len()?;
    let end = offset.checked_add(size).ok_or(WimError::MalformedContainer)?;
    if end > total_len {
        return Err(WimError::MalformedContainer);
    }

    let mut scratch = vec![0u8; COPY_CHUNK.min(size as usize).max(1)];
    let mut position = offset;
    let mut remaining = size;
    while remaining > 0 {
        let step = remaining.min(scratch.len() as u64) as usize;
        source.read_at(position, &mut scratch[..step])?;
        sink.write_all(&scratch[..step])?;
        position += step as u64;
        remaining -= step as u64;
    }
    Ok(size)
}

/// Decode the catalog text: UTF-16LE when the byte-order mark is present,
/// UTF-8 otherwise.
fn decode_catalog_text(bytes: &[u8]) -> Result<String> {
    if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xFE {
        let payload = &bytes[2..];
        if payload.len() % 2 != 0 {
            return Err(WimError::MalformedContainer);
        }
        let units = payload
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
        char::decode_utf16(units)
            .collect::<core::result::Result<String, _>>()
            .map_err(|_| WimError::MalformedContainer)
    } else {
        core::str::from_utf8(bytes)
            .map(String::from)
            .map_err(|_| WimError::MalformedContainer)
    }
}

fn parse_resources(node: &XmlNode, total_len: u64) -> Result<Vec<WimResourceEntry>> {
    let mut entries = Vec::new();
    for file in node.children_named("FILE") {
        let path = file.text_of("PATH").ok_or(WimError::MalformedContainer)?;
        let offset = parse_hex(file.text_of("OFFSET").ok_or(WimError::MalformedContainer)?)?;
        let size = parse_hex(file.text_of("SIZE").ok_or(WimError::MalformedContainer)?)?;

        // Catalog entries may never point past the container
        let end = offset.checked_add(size).ok_or(WimError::MalformedContainer)?;
        if end > total_len {
            return Err(WimError::MalformedContainer);
        }

        entries.push(WimResourceEntry {
            path: String::from(path),
            offset,
            size,
        });
    }
    Ok(entries)
}

fn parse_cbmr(node: &XmlNode) -> CbmrInfo {
    let text = |name: &str| String::from(node.text_of(name).unwrap_or(""));
    CbmrInfo {
        product: text("PRODUCT"),
        version: text("VERSION"),
        build: text("BUILD"),
        arch: text("ARCH"),
    }
}

/// Hexadecimal catalog field, with or without a `0x` prefix.
fn parse_hex(text: &str) -> Result<u64> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() {
        return Err(WimError::MalformedContainer);
    }
    u64::from_str_radix(digits, 16).map_err(|_| WimError::MalformedContainer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(parse_hex("1A0").unwrap(), 0x1A0);
        assert_eq!(parse_hex("0x1a0").unwrap(), 0x1A0);
        assert_eq!(parse_hex("0").unwrap(), 0);
        assert!(parse_hex("").is_err());
        assert!(parse_hex("0x").is_err());
        assert!(parse_hex("G1").is_err());
    }

    #[test]
    fn test_decode_utf8_catalog() {
        let text = decode_catalog_text(b"<WIM></WIM>").unwrap();
        assert_eq!(text, "<WIM></WIM>");
    }

    #[test]
    fn test_decode_utf16le_catalog() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<WIM></WIM>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_catalog_text(&bytes).unwrap(), "<WIM></WIM>");
    }

    #[test]
    fn test_decode_odd_utf16_rejected() {
        let bytes = [0xFF, 0xFE, 0x41];
        assert_eq!(
            decode_catalog_text(&bytes).unwrap_err(),
            WimError::MalformedContainer
        );
    }
}
