//! BLAKE3 digest primitive, truncated to 16 bytes.

use super::BlockHasher;
use crate::digest::BlockDigest;

/// A hasher that computes the first 16 bytes of the BLAKE3 output.
#[derive(Debug, Clone, Default)]
pub struct Blake3Hasher {
    state: blake3::Hasher,
}

impl Blake3Hasher {
    /// Creates a new hasher.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockHasher for Blake3Hasher {
    const NAME: &'static str = "blake3";

    fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    fn finalize(self) -> BlockDigest {
        let mut out = [0u8; BlockDigest::SIZE];
        self.state.finalize_xof().fill(&mut out);
        BlockDigest::new(out)
    }
}
