//! Pinned TLS certificate sets.
//!
//! Two disjoint, compile-time pin sets: one for the metadata (DCAT)
//! channel and one for the content-download channel. The metadata set is
//! strict and never reused for content. The transport binding enforces
//! the pins; this crate only selects which set rides on each request.

/// A named set of SHA-256 certificate pins.
#[derive(Debug, PartialEq, Eq)]
pub struct CertificateSet {
    pub name: &'static str,
    pub pins: &'static [[u8; 32]],
}

/// Pins accepted on the metadata-service channel.
pub static METADATA_TLS_PINS: CertificateSet = CertificateSet {
    name: "metadata",
    pins: &[
        [
            0x1f, 0x3f, 0x2c, 0x7a, 0x9b, 0x44, 0x58, 0x21, 0xd0, 0x6e, 0x93, 0x5c, 0x0d, 0xaa,
            0x41, 0xf2, 0x7c, 0x85, 0x16, 0x39, 0xe2, 0x5b, 0x04, 0xc8, 0x6a, 0xd7, 0x90, 0x3e,
            0x12, 0xfb, 0x67, 0x4d,
        ],
        [
            0x84, 0x0a, 0x61, 0xbe, 0x2f, 0x53, 0x7e, 0x98, 0x35, 0xc1, 0x4a, 0x0f, 0xd9, 0x26,
            0xb8, 0x70, 0x5e, 0xe3, 0x48, 0x1d, 0x06, 0x9f, 0xa2, 0x54, 0xcb, 0x38, 0x81, 0x6c,
            0xf5, 0x2a, 0x97, 0x10,
        ],
    ],
};

/// Pins accepted on the content-download channel.
pub static CONTENT_TLS_PINS: CertificateSet = CertificateSet {
    name: "content",
    pins: &[
        [
            0x3d, 0xb7, 0x52, 0x09, 0xee, 0x71, 0x2c, 0x46, 0x9a, 0x05, 0xd8, 0x63, 0x1b, 0xcf,
            0x24, 0x80, 0x47, 0xa9, 0x5f, 0x36, 0x11, 0xe0, 0x8d, 0x72, 0xbc, 0x29, 0x64, 0x0b,
            0x93, 0x58, 0xd6, 0x7f,
        ],
        [
            0xc2, 0x18, 0x4f, 0x95, 0x07, 0x6b, 0xd4, 0x3a, 0xe1, 0x50, 0x2d, 0x88, 0x49, 0x1e,
            0xf7, 0x62, 0xb3, 0x0c, 0x95, 0x27, 0x78, 0x44, 0x5a, 0xd1, 0x0e, 0x86, 0x3b, 0xfa,
            0x60, 0x15, 0xc9, 0x33,
        ],
        [
            0x55, 0xe8, 0x23, 0x7c, 0x90, 0x4b, 0x16, 0xa1, 0x6d, 0x3f, 0xb4, 0x0a, 0x57, 0xc6,
            0x39, 0xee, 0x82, 0x28, 0xd5, 0x41, 0x0f, 0x9c, 0x66, 0x13, 0xf8, 0x5e, 0x21, 0xbb,
            0x74, 0x8f, 0x02, 0xda,
        ],
    ],
};
