//! SHA-256 integrity digests for downloaded content

use sha2::{Digest, Sha256};
use std::fmt;

use super::FetchError;

/// Size of a SHA-256 digest in bytes
pub const DIGEST_LEN: usize = 32;

/// A 256-bit content digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Digest([u8; DIGEST_LEN]);

impl Sha256Digest {
    /// Parse a header value: 64 hex characters, optionally prefixed `sha256:`
    pub fn parse_hex(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let hex_part = trimmed.strip_prefix("sha256:").unwrap_or(trimmed);
        if hex_part.len() != DIGEST_LEN * 2 {
            return None;
        }

        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(hex_part, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Parse the value of the integrity header named `header`
    pub(crate) fn from_header(header: &str, value: &str) -> Result<Self, FetchError> {
        Self::parse_hex(value).ok_or_else(|| FetchError::MalformedIntegrityHeader {
            header: header.to_string(),
            value: value.to_string(),
        })
    }

    /// Digest of an in-memory byte slice
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Incremental hasher fed one chunk at a time while streaming
#[derive(Default)]
pub struct DigestAccumulator {
    hasher: Sha256,
    bytes: u64,
}

impl DigestAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Bytes fed so far
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn finalize(self) -> Sha256Digest {
        Sha256Digest(self.hasher.finalize().into())
    }
}

/// Byte-for-byte comparison of the computed digest against the expected one
pub fn verify(expected: &Sha256Digest, actual: &Sha256Digest) -> Result<(), FetchError> {
    if expected.as_bytes() != actual.as_bytes() {
        return Err(FetchError::IntegrityMismatch {
            expected: expected.to_hex(),
            actual: actual.to_hex(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("test data")
    const TEST_DATA_HEX: &str = "916f0027a575074ce72a331777c3478d6513f786a591bd892da1a577bf2335f9";

    #[test]
    fn test_parse_plain_and_prefixed() {
        let plain = Sha256Digest::parse_hex(TEST_DATA_HEX).unwrap();
        let prefixed = Sha256Digest::parse_hex(&format!("sha256:{TEST_DATA_HEX}")).unwrap();
        let upper = Sha256Digest::parse_hex(&format!("  {}  ", TEST_DATA_HEX.to_uppercase())).unwrap();

        assert_eq!(plain, prefixed);
        assert_eq!(plain, upper);
        assert_eq!(plain, Sha256Digest::of(b"test data"));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(Sha256Digest::parse_hex("").is_none());
        assert!(Sha256Digest::parse_hex(&TEST_DATA_HEX[..62]).is_none());
        assert!(Sha256Digest::parse_hex(&format!("{TEST_DATA_HEX}00")).is_none());
        assert!(Sha256Digest::parse_hex(&"zz".repeat(32)).is_none());
        assert!(Sha256Digest::parse_hex(&format!("md5:{}", &TEST_DATA_HEX[..60])).is_none());

        let err = Sha256Digest::from_header("X-Content-SHA256", "nope").unwrap_err();
        assert!(matches!(err, FetchError::MalformedIntegrityHeader { .. }));
    }

    #[test]
    fn test_accumulator_matches_one_shot() {
        let mut acc = DigestAccumulator::new();
        acc.update(b"test ");
        acc.update(b"");
        acc.update(b"data");

        assert_eq!(acc.bytes(), 9);
        let digest = acc.finalize();
        assert_eq!(digest.to_hex(), TEST_DATA_HEX);
        assert_eq!(digest.to_string(), format!("sha256:{TEST_DATA_HEX}"));
    }

    #[test]
    fn test_verify() {
        let expected = Sha256Digest::of(b"test data");
        verify(&expected, &Sha256Digest::of(b"test data")).unwrap();

        let err = verify(&expected, &Sha256Digest::of(b"tampered")).unwrap_err();
        assert!(matches!(err, FetchError::IntegrityMismatch { .. }));
    }
}
