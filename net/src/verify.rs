//! Streaming SHA-256 content verification.

use sha2::{Digest, Sha256};

/// Streaming SHA-256 accumulator fed by the download engine one chunk at
/// a time. Stateless beyond the running hash; one instance per file.
pub struct ContentVerifier {
    hasher: Sha256,
}

impl ContentVerifier {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Fold one chunk into the accumulator.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Consume the accumulator and produce the digest.
    pub fn finalize(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }
}

impl Default for ContentVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Exact-byte digest comparison.
pub fn digests_match(expected: &[u8; 32], actual: &[u8; 32]) -> bool {
    expected == actual
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256 of "abc"
    const ABC_DIGEST: [u8; 32] = [
        0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae,
        0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61,
        0xf2, 0x00, 0x15, 0xad,
    ];

    #[test]
    fn test_known_digest() {
        let mut verifier = ContentVerifier::new();
        verifier.update(b"abc");
        assert_eq!(verifier.finalize(), ABC_DIGEST);
    }

    #[test]
    fn test_chunked_equals_whole() {
        let mut verifier = ContentVerifier::new();
        verifier.update(b"a");
        verifier.update(b"b");
        verifier.update(b"c");
        assert_eq!(verifier.finalize(), ABC_DIGEST);
    }

    #[test]
    fn test_digests_match_is_exact() {
        let mut other = ABC_DIGEST;
        other[31] ^= 1;
        assert!(digests_match(&ABC_DIGEST, &ABC_DIGEST));
        assert!(!digests_match(&ABC_DIGEST, &other));
    }
}
