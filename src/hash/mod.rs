//! Digest primitives.
//!
//! The engine treats a primitive as an opaque incremental accumulator that
//! can be cloned at any point, including its unprocessed internal buffer.
//!
//! - [`Md5Hasher`] - MD5, the default
//! - [`Blake3Hasher`] - BLAKE3 truncated to 16 bytes (requires `hash-blake3` feature)

#[cfg(feature = "hash-blake3")]
mod blake3;
mod md5;

#[cfg(feature = "hash-blake3")]
pub use self::blake3::Blake3Hasher;
pub use self::md5::Md5Hasher;

use crate::digest::BlockDigest;

/// An incremental 16-byte digest primitive.
///
/// `Default` yields an empty context. `finalize` consumes the context, so a
/// context has to be recreated before it can be fed again. `Clone` must copy
/// the complete state so that clone and original stay indistinguishable
/// until they are fed different data.
pub trait BlockHasher: Clone + Default {
    /// Short lowercase name of the algorithm.
    const NAME: &'static str;

    /// Feeds more data.
    fn update(&mut self, data: &[u8]);

    /// Consumes the context and returns its digest.
    fn finalize(self) -> BlockDigest;

    /// Convenience method to digest data in one shot.
    fn digest(data: &[u8]) -> BlockDigest {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}
