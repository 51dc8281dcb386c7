//! Block expressions.
//!
//! An item's output is a small expression over digests:
//!
//! ```text
//! expr := digest ( ("+" | "-") digest )* [ "=" digest ] [ marker ]
//! ```
//!
//! `+` joins digests of single blocks, `-` joins digests over two adjacent
//! blocks and `=` introduces the digest of the whole window. A marker
//! (`[ERR]` or `[EOF]`) closes an expression that was cut short by a
//! failure after block digests were already emitted.

use std::fmt;
use std::io;
use std::str::FromStr;

use thiserror::Error;

use super::BlockDigest;

/// Joins two terms of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Separator {
    /// `+`: the next digest covers a single block.
    Block,
    /// `-`: the next digest covers the previous and the current block.
    Overlap,
    /// `=`: the next digest covers the whole window.
    Whole,
}

impl Separator {
    /// The character written for this separator.
    pub const fn as_char(&self) -> char {
        match self {
            Separator::Block => '+',
            Separator::Overlap => '-',
            Separator::Whole => '=',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Separator::Block),
            '-' => Some(Separator::Overlap),
            '=' => Some(Separator::Whole),
            _ => None,
        }
    }
}

/// In-band marker for a truncated expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Reading or closing the item failed.
    Err,
    /// The item ended before the requested window did.
    Eof,
}

impl Marker {
    /// The text written for this marker.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Marker::Err => "[ERR]",
            Marker::Eof => "[EOF]",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One digest of an expression with the separator preceding it.
///
/// Only the first term of an expression has no separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Term {
    /// Separator written before the digest.
    pub separator: Option<Separator>,
    /// The digest itself.
    pub digest: BlockDigest,
}

impl Term {
    /// Creates the leading term of an expression.
    pub fn first(digest: BlockDigest) -> Self {
        Self {
            separator: None,
            digest,
        }
    }

    /// Creates a term following `separator`.
    pub fn joined(separator: Separator, digest: BlockDigest) -> Self {
        Self {
            separator: Some(separator),
            digest,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(separator) = self.separator {
            write!(f, "{}", separator.as_char())?;
        }
        write!(f, "{}", self.digest)
    }
}

/// Receives expression terms while an item is being digested.
///
/// Terms arrive in output order as soon as they are known, so a sink
/// writing to a terminal shows block digests while a large item is still
/// being read.
pub trait TermSink {
    /// Accepts the next term.
    fn term(&mut self, term: &Term) -> io::Result<()>;

    /// Accepts the marker closing a truncated expression.
    fn marker(&mut self, marker: Marker) -> io::Result<()>;
}

impl<S: TermSink + ?Sized> TermSink for &mut S {
    fn term(&mut self, term: &Term) -> io::Result<()> {
        (**self).term(term)
    }

    fn marker(&mut self, marker: Marker) -> io::Result<()> {
        (**self).marker(marker)
    }
}

/// A complete or truncated expression collected in memory.
///
/// # Example
///
/// ```
/// use md5chk::DigestExpr;
///
/// let text = format!("{}+{}={}", "00".repeat(16), "11".repeat(16), "22".repeat(16));
/// let expr: DigestExpr = text.parse()?;
///
/// assert_eq!(expr.len(), 3);
/// assert_eq!(expr.block_digests().count(), 2);
/// assert_eq!(expr.whole().unwrap().to_hex(), "22".repeat(16));
/// assert_eq!(expr.to_string(), text);
/// # Ok::<(), md5chk::ParseExprError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DigestExpr {
    terms: Vec<Term>,
    marker: Option<Marker>,
}

impl DigestExpr {
    /// Creates an empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all terms in output order.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Returns the number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if no term was collected.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns the marker, if the expression was cut short.
    pub fn marker(&self) -> Option<Marker> {
        self.marker
    }

    /// Returns `true` if the expression was not cut short.
    pub fn is_complete(&self) -> bool {
        self.marker.is_none() && !self.terms.is_empty()
    }

    /// Returns the whole-window digest.
    ///
    /// This is the `=` term, or the only term of an unsegmented or
    /// single-block expression.
    pub fn whole(&self) -> Option<BlockDigest> {
        if self.marker.is_some() {
            return None;
        }
        match self.terms.as_slice() {
            [only] => Some(only.digest),
            [.., last] if last.separator == Some(Separator::Whole) => Some(last.digest),
            _ => None,
        }
    }

    /// Returns the digests that cover a single block.
    pub fn block_digests(&self) -> impl Iterator<Item = BlockDigest> + '_ {
        self.terms
            .iter()
            .filter(|t| matches!(t.separator, None | Some(Separator::Block)))
            .map(|t| t.digest)
    }

    /// Returns the digests that cover two adjacent blocks.
    pub fn overlap_digests(&self) -> impl Iterator<Item = BlockDigest> + '_ {
        self.terms
            .iter()
            .filter(|t| t.separator == Some(Separator::Overlap))
            .map(|t| t.digest)
    }
}

impl TermSink for DigestExpr {
    fn term(&mut self, term: &Term) -> io::Result<()> {
        self.terms.push(*term);
        Ok(())
    }

    fn marker(&mut self, marker: Marker) -> io::Result<()> {
        self.marker = Some(marker);
        Ok(())
    }
}

impl fmt::Display for DigestExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for term in &self.terms {
            write!(f, "{}", term)?;
        }
        if let Some(marker) = self.marker {
            write!(f, "{}", marker)?;
        }
        Ok(())
    }
}

/// Errors from parsing a [`DigestExpr`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseExprError {
    /// A digest was not 32 hex characters.
    #[error("invalid digest at byte {0}")]
    InvalidDigest(usize),
    /// An unknown character appeared where a separator was expected.
    #[error("unexpected character {1:?} at byte {0}")]
    UnexpectedChar(usize, char),
    /// Text followed the marker, or the expression was empty.
    #[error("malformed expression")]
    Malformed,
}

impl FromStr for DigestExpr {
    type Err = ParseExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const HEX_LEN: usize = 2 * BlockDigest::SIZE;

        let mut expr = DigestExpr::new();
        let mut pos = 0;

        while pos < s.len() {
            let rest = &s[pos..];
            if let Some(marker) = [Marker::Err, Marker::Eof]
                .into_iter()
                .find(|m| rest == m.as_str())
            {
                expr.marker = Some(marker);
                return Ok(expr);
            }

            let separator = if expr.terms.is_empty() {
                None
            } else {
                // `rest` is non-empty, so there is a next character.
                let c = rest.chars().next().ok_or(ParseExprError::Malformed)?;
                let separator =
                    Separator::from_char(c).ok_or(ParseExprError::UnexpectedChar(pos, c))?;
                pos += 1;
                Some(separator)
            };

            let hex = s
                .get(pos..pos + HEX_LEN)
                .ok_or(ParseExprError::InvalidDigest(pos))?;
            let digest = BlockDigest::from_hex(hex).ok_or(ParseExprError::InvalidDigest(pos))?;
            expr.terms.push(Term { separator, digest });
            pos += HEX_LEN;
        }

        if expr.terms.is_empty() {
            return Err(ParseExprError::Malformed);
        }
        Ok(expr)
    }
}
