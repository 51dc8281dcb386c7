//! Digest value type.

use std::fmt;

/// Size of every digest in bytes.
pub const DIGEST_LEN: usize = 16;

/// A fixed-size digest of a block, a pair of blocks or a whole item.
///
/// This is a thin wrapper around a 16-byte array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockDigest([u8; DIGEST_LEN]);

impl BlockDigest {
    /// The size of the digest in bytes.
    pub const SIZE: usize = DIGEST_LEN;

    /// Creates a digest from a byte array.
    pub const fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates a digest from a slice.
    ///
    /// Returns `None` if the slice is not exactly 16 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; DIGEST_LEN] = slice.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Returns the digest as a byte array.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Returns the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a digest from a hex string.
    ///
    /// Returns `None` if the string is not valid hex or not exactly 32
    /// characters.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(hex_str, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl AsRef<[u8]> for BlockDigest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for BlockDigest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for BlockDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
