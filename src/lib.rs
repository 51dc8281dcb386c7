//! md5chk
//!
//! Block digests and overlapping block digests in a single pass.
//!
//! `md5chk` reads an item once and describes it with a digest expression:
//!
//! - `d` - one digest over everything
//! - `d1+d2+d3=w` - one digest per block, then the whole-stream digest
//! - `d1-d12-d23=w` - the first block, then digests over each pair of
//!   adjacent blocks, then the whole-stream digest
//!
//! Comparing expressions of two copies of the same data shows which blocks
//! differ, without reading either copy twice. Overlap digests also catch
//! damage that only shows across a block boundary.
//!
//! The crate intentionally:
//! - does NOT buffer more than one I/O block
//! - does NOT re-read or seek backwards
//! - does NOT verify or compare expressions itself
//!
//! # Example
//!
//! ```
//! use md5chk::{DigestConfig, Md5Session, ReadSource};
//!
//! let config = DigestConfig::default().with_max_size(4).with_overlap(true);
//! let mut session = Md5Session::new(config)?;
//!
//! let expr = session.digest("data", ReadSource::new(&b"abcdefghijkl"[..]))?;
//! println!("{} data", expr);
//!
//! assert_eq!(expr.overlap_digests().count(), 2);
//! # Ok::<(), md5chk::ChkError>(())
//! ```
//!
//! # Output lines
//!
//! ```
//! use md5chk::{LineFormat, LineWriter, Md5Session, ReadSource};
//!
//! let mut session = Md5Session::default();
//! let mut writer = LineWriter::new(Vec::new(), LineFormat::default());
//!
//! session.digest_source("a b", ReadSource::new(&b""[..]), &mut writer)?;
//! writer.finish_line(b"a b")?;
//!
//! assert_eq!(writer.into_inner(), b"d41d8cd98f00b204e9800998ecf8427e a\\040b\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod digest;
mod error;
mod hash;
mod input;
mod output;
mod session;
mod source;

mod accumulator; // internal (multi-context state)

//
// Public surface
//

pub use config::{DEFAULT_BLOCK_SIZE, DEFAULT_SEGMENT_SIZE, DigestConfig, Salting, Window};
pub use digest::{
    BlockDigest, DIGEST_LEN, DigestExpr, Marker, ParseExprError, Separator, Term, TermSink,
};
pub use error::ChkError;
#[cfg(feature = "hash-blake3")]
pub use hash::Blake3Hasher;
pub use hash::{BlockHasher, Md5Hasher};
pub use input::{Delimiter, Input, NameReader, display_name, open_input};
pub use output::{LineFormat, LineWriter, escape_name};
pub use session::{Md5Session, Session};
pub use source::{ByteSource, ReadSource, SeekSource};
