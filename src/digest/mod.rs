//! Digest values and block expressions.
//!
//! - [`BlockDigest`] - 16-byte digest of a block, a block pair or a whole item
//! - [`DigestExpr`] - The `d1+d2=whole` style expression of one item
//! - [`TermSink`] - Receiver for expression terms as they are produced

mod expr;
mod value;

pub use expr::{DigestExpr, Marker, ParseExprError, Separator, Term, TermSink};
pub use value::{BlockDigest, DIGEST_LEN};
