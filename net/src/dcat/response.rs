//! Bounded scanner for DCAT metadata responses.
//!
//! The response is JSON shaped like:
//!
//! ```text
//! {"Files":[
//!   {"FileName":"winre.wim","Size":534773760,
//!    "Digest":"<44 base64 chars>","Url":"https://..."},
//!   ...
//! ]}
//! ```
//!
//! Rather than a general JSON parser, each required file's block is
//! located by its quoted name and the three fields are pulled out by
//! bounded scans that stop at the block's closing brace. Any embedded
//! NUL, missing field, or malformed value aborts with a structured
//! error; the scanner never reads past the buffer it was handed.

use alloc::string::String;
use base64::Engine;
use core::fmt;

/// Structured scan failure; each variant names the exact failure point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcatParseError {
    /// A NUL byte anywhere in the response is treated as corruption.
    EmbeddedNul,
    /// The quoted file name never appears.
    FileBlockMissing,
    /// No closing brace after the file name.
    BlockUnterminated,
    /// A required field is absent from the block.
    FieldMissing(&'static str),
    /// A field's value never terminates inside the block.
    FieldUnterminated(&'static str),
    /// Digest is not exactly 44 base64 characters.
    DigestLength,
    /// Digest fails to decode to 32 bytes.
    DigestEncoding,
    /// Size field empty or non-numeric.
    SizeMalformed,
    /// Size field exceeds u64.
    SizeOverflow,
}

impl fmt::Display for DcatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmbeddedNul => write!(f, "embedded NUL in response"),
            Self::FileBlockMissing => write!(f, "file block not found"),
            Self::BlockUnterminated => write!(f, "file block unterminated"),
            Self::FieldMissing(name) => write!(f, "field '{}' missing", name),
            Self::FieldUnterminated(name) => write!(f, "field '{}' unterminated", name),
            Self::DigestLength => write!(f, "digest is not 44 characters"),
            Self::DigestEncoding => write!(f, "digest is not valid base64"),
            Self::SizeMalformed => write!(f, "size is not a number"),
            Self::SizeOverflow => write!(f, "size overflows 64 bits"),
        }
    }
}

/// Fields extracted for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub url: String,
    pub digest: [u8; 32],
    pub size: u64,
}

/// Locate `file_name`'s block and extract its `Url`, `Digest`, and
/// `Size` fields.
pub fn parse_file_record(body: &[u8], file_name: &str) -> Result<FileRecord, DcatParseError> {
    if body.contains(&0) {
        return Err(DcatParseError::EmbeddedNul);
    }

    let block = locate_block(body, file_name)?;

    let url = find_string_field(block, "Url")?;
    let digest_text = find_string_field(block, "Digest")?;
    let size = find_number_field(block, "Size")?;

    if digest_text.len() != 44 {
        return Err(DcatParseError::DigestLength);
    }
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(digest_text.as_bytes())
        .map_err(|_| DcatParseError::DigestEncoding)?;
    let digest: [u8; 32] = decoded
        .try_into()
        .map_err(|_| DcatParseError::DigestEncoding)?;

    Ok(FileRecord { url, digest, size })
}

/// Slice from the quoted file name to the block's closing brace.
fn locate_block<'a>(body: &'a [u8], file_name: &str) -> Result<&'a [u8], DcatParseError> {
    let mut needle = alloc::vec::Vec::with_capacity(file_name.len() + 2);
    needle.push(b'"');
    needle.extend_from_slice(file_name.as_bytes());
    needle.push(b'"');

    let start = find_subslice(body, &needle).ok_or(DcatParseError::FileBlockMissing)?;
    let after = &body[start + needle.len()..];
    let end = after
        .iter()
        .position(|&b| b == b'}')
        .ok_or(DcatParseError::BlockUnterminated)?;
    Ok(&after[..end])
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// `"key"` `:` `"value"` within the block.
fn find_string_field(block: &[u8], key: &'static str) -> Result<String, DcatParseError> {
    let rest = skip_to_value(block, key)?;
    if rest.first() != Some(&b'"') {
        return Err(DcatParseError::FieldUnterminated(key));
    }
    let rest = &rest[1..];
    let end = rest
        .iter()
        .position(|&b| b == b'"')
        .ok_or(DcatParseError::FieldUnterminated(key))?;
    core::str::from_utf8(&rest[..end])
        .map(String::from)
        .map_err(|_| DcatParseError::FieldUnterminated(key))
}

/// `"key"` `:` digits within the block, accumulated with checked
/// arithmetic so an oversized value errors instead of wrapping.
fn find_number_field(block: &[u8], key: &'static str) -> Result<u64, DcatParseError> {
    let rest = skip_to_value(block, key)?;

    let mut value: u64 = 0;
    let mut digits = 0usize;
    for &b in rest {
        match b {
            b'0'..=b'9' => {
                value = value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add((b - b'0') as u64))
                    .ok_or(DcatParseError::SizeOverflow)?;
                digits += 1;
            }
            _ => break,
        }
    }
    if digits == 0 {
        return Err(DcatParseError::SizeMalformed);
    }
    Ok(value)
}

/// Position the scan just past `"key"` and its colon, skipping spaces.
fn skip_to_value<'a>(block: &'a [u8], key: &'static str) -> Result<&'a [u8], DcatParseError> {
    let mut needle = alloc::vec::Vec::with_capacity(key.len() + 2);
    needle.push(b'"');
    needle.extend_from_slice(key.as_bytes());
    needle.push(b'"');

    let at = find_subslice(block, &needle).ok_or(DcatParseError::FieldMissing(key))?;
    let mut rest = &block[at + needle.len()..];

    while rest.first() == Some(&b' ') {
        rest = &rest[1..];
    }
    if rest.first() != Some(&b':') {
        return Err(DcatParseError::FieldMissing(key));
    }
    rest = &rest[1..];
    while rest.first() == Some(&b' ') {
        rest = &rest[1..];
    }
    Ok(rest)
}
