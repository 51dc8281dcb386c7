//! MD5 digest primitive.

use md5::{Digest, Md5};

use super::BlockHasher;
use crate::digest::BlockDigest;

/// A hasher that computes MD5 digests.
#[derive(Debug, Clone, Default)]
pub struct Md5Hasher {
    state: Md5,
}

impl Md5Hasher {
    /// Creates a new hasher.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockHasher for Md5Hasher {
    const NAME: &'static str = "md5";

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.state, data);
    }

    fn finalize(self) -> BlockDigest {
        let mut out = [0u8; BlockDigest::SIZE];
        out.copy_from_slice(&self.state.finalize());
        BlockDigest::new(out)
    }
}
