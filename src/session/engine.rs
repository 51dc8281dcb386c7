//! Core digesting engine - Session with the block read loop.
//!
//! A [`Session`] digests items one after another. For every item it keeps a
//! whole-stream context and, once segmentation kicks in, a current-block
//! context and an overlap-combination context:
//!
//! - `maxsize == 0`: one digest for the whole window
//! - non-overlapping blocks: `d1+d2+d3=whole`
//! - overlapping blocks: `d1-d12-d23=whole`, where `d12` covers blocks 1
//!   and 2 together
//!
//! Overlap digests are produced by cloning the state of the block context
//! into the combination context, so every byte is read exactly once and
//! nothing is buffered beyond one I/O block.
//!
//! # Example
//!
//! ```
//! use md5chk::{DigestConfig, Md5Session, ReadSource};
//!
//! let config = DigestConfig::default().with_max_size(10);
//! let mut session = Md5Session::new(config)?;
//!
//! let data = [b'A'; 30];
//! let expr = session.digest("data", ReadSource::new(&data[..]))?;
//!
//! assert_eq!(expr.block_digests().count(), 3);
//! assert!(expr.whole().is_some());
//! # Ok::<(), md5chk::ChkError>(())
//! ```

use std::io::{self, BufWriter, Write};

use bytes::Bytes;
use tracing::{debug, instrument, trace};

use super::window::skip_to_window;
use crate::accumulator::{Accumulator, BLOCK, Effort, PAIR, WHOLE};
use crate::config::{DigestConfig, Salting};
use crate::digest::{DigestExpr, Separator, Term, TermSink};
use crate::error::ChkError;
use crate::hash::{BlockHasher, Md5Hasher};
use crate::source::ByteSource;

/// A session digesting with MD5.
pub type Md5Session = Session<Md5Hasher>;

/// Digests items one after another with one configuration.
///
/// The session owns the digest contexts, the read buffer and the block
/// number salt, which carries over from one item to the next unless
/// [`Salting::PerItem`] is configured. Items are independent otherwise: a
/// failing item leaves the session ready for the next one.
///
/// Terms are pushed to a [`TermSink`] as soon as they are known. If reading
/// fails after block digests were already pushed, the sink also receives a
/// [`Marker`](crate::Marker) before the error is returned.
#[derive(Debug)]
pub struct Session<H: BlockHasher = Md5Hasher> {
    config: DigestConfig,
    acc: Accumulator<H>,
    buffer: Vec<u8>,
}

impl<H: BlockHasher> Session<H> {
    /// Creates a new session.
    ///
    /// With pass-through enabled in `config`, hashed bytes are echoed to
    /// standard output, flushed on every write if `config` is unbuffered.
    ///
    /// # Errors
    ///
    /// Returns [`ChkError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: DigestConfig) -> Result<Self, ChkError> {
        let mut session = Self::build(config)?;
        if session.config.pass_through() {
            let unbuffered = session.config.unbuffered();
            session
                .acc
                .set_tee(Box::new(BufWriter::new(io::stdout())), unbuffered);
        }
        Ok(session)
    }

    /// Creates a new session echoing hashed bytes to `sink`.
    ///
    /// The sink is used regardless of the pass-through flag in `config`.
    pub fn with_pass_through(
        config: DigestConfig,
        sink: impl Write + 'static,
    ) -> Result<Self, ChkError> {
        let mut session = Self::build(config.with_pass_through(true))?;
        let unbuffered = session.config.unbuffered();
        session.acc.set_tee(Box::new(sink), unbuffered);
        Ok(session)
    }

    fn build(config: DigestConfig) -> Result<Self, ChkError> {
        config.validate()?;
        Ok(Self {
            acc: Accumulator::new(config.salting().is_enabled(), config.prefix().cloned()),
            buffer: vec![0u8; config.block_size()],
            config,
        })
    }

    /// Returns the configuration used by this session.
    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    /// Digests one item read from `source`, pushing terms to `sink`.
    #[instrument(level = "debug", skip_all, fields(name = %name))]
    pub fn digest_source<S, K>(&mut self, name: &str, source: S, sink: &mut K) -> Result<(), ChkError>
    where
        S: ByteSource,
        K: TermSink + ?Sized,
    {
        let result = self.run_source(name, source, sink);
        self.settle(result)
    }

    /// Digests one item read from `source` and collects the expression.
    pub fn digest<S: ByteSource>(&mut self, name: &str, source: S) -> Result<DigestExpr, ChkError> {
        let mut expr = DigestExpr::new();
        self.digest_source(name, source, &mut expr)?;
        Ok(expr)
    }

    /// Digests a literal as if it were an item's content.
    ///
    /// The window applies as substring bounds; segmentation never does, so
    /// exactly one term is pushed.
    #[instrument(level = "debug", skip_all)]
    pub fn digest_literal<K>(&mut self, literal: impl Into<Bytes>, sink: &mut K) -> Result<(), ChkError>
    where
        K: TermSink + ?Sized,
    {
        let result = self.run_literal(literal.into(), sink);
        self.settle(result)
    }

    fn run_literal<K: TermSink + ?Sized>(&mut self, literal: Bytes, sink: &mut K) -> Result<(), ChkError> {
        let window = self.config.window();
        let len = literal.len() as u64;
        if len < window.required_len() {
            return Err(ChkError::ShortRead {
                name: String::from_utf8_lossy(&literal).into_owned(),
                wanted: window.required_len(),
                got: len,
            });
        }

        // Both bounds are within `literal`, so they fit in usize.
        let start = window.offset() as usize;
        let end = window.limit().map_or(literal.len(), |exact| start + exact as usize);
        let content = literal.slice(start..end);

        self.acc.start_item(self.config.salting() == Salting::PerItem);
        self.acc
            .update_all(&content)
            .map_err(|e| ChkError::StreamRead {
                name: String::from_utf8_lossy(&literal).into_owned(),
                source: e,
            })?;
        sink.term(&Term::first(self.acc.finalize_context(WHOLE)))?;
        Ok(())
    }

    fn run_source<S, K>(&mut self, name: &str, mut source: S, sink: &mut K) -> Result<(), ChkError>
    where
        S: ByteSource,
        K: TermSink + ?Sized,
    {
        skip_to_window(name, &mut source, self.config.window(), &mut self.buffer)?;
        self.acc.start_item(self.config.salting() == Salting::PerItem);

        let blocks = match self.read_blocks(name, &mut source, sink) {
            Ok(blocks) => blocks,
            Err(e) => {
                self.mark(&e, sink);
                return Err(e);
            }
        };

        if let Err(e) = source.close() {
            let e = ChkError::Close {
                name: name.to_owned(),
                source: e,
            };
            self.mark(&e, sink);
            return Err(e);
        }

        self.close_expr(blocks, sink)?;
        debug!(blocks, effort = ?self.acc.effort(), "item digested");
        Ok(())
    }

    /// Runs the block loop; returns the number of blocks seen.
    fn read_blocks<S, K>(&mut self, name: &str, source: &mut S, sink: &mut K) -> Result<u64, ChkError>
    where
        S: ByteSource,
        K: TermSink + ?Sized,
    {
        let max_size = self.config.max_size();
        let window = self.config.window();
        let mut remaining = window.limit();
        let mut total = 0u64;
        let mut blocks = 0u64;

        while remaining != Some(0) {
            let limit = match (max_size, remaining) {
                (0, remaining) => remaining,
                (max, Some(remaining)) => Some(max.min(remaining)),
                (max, None) => Some(max),
            };

            let (got, ended) = self.read_block(name, source, limit)?;
            total += got;

            if let Some(remaining) = remaining.as_mut() {
                if ended {
                    return Err(ChkError::ShortRead {
                        name: name.to_owned(),
                        wanted: window.required_len(),
                        got: window.offset() + total,
                    });
                }
                *remaining -= got;
            }

            if got > 0 && max_size > 0 {
                blocks += 1;
                self.advance(blocks, sink)?;
            }
            if ended {
                break;
            }
        }
        Ok(blocks)
    }

    /// Reads one block of at most `limit` bytes into the live contexts.
    ///
    /// Returns the byte count and whether the source ended before `limit`
    /// was reached.
    fn read_block<S: ByteSource>(
        &mut self,
        name: &str,
        source: &mut S,
        limit: Option<u64>,
    ) -> Result<(u64, bool), ChkError> {
        let mut got = 0u64;
        loop {
            let want = match limit {
                Some(limit) => (limit - got).min(self.buffer.len() as u64) as usize,
                None => self.buffer.len(),
            };
            if want == 0 {
                return Ok((got, false));
            }

            let n = source
                .read(&mut self.buffer[..want])
                .map_err(|e| ChkError::StreamRead {
                    name: name.to_owned(),
                    source: e,
                })?;
            if n == 0 {
                return Ok((got, true));
            }

            self.acc
                .update_all(&self.buffer[..n])
                .map_err(|e| ChkError::StreamRead {
                    name: name.to_owned(),
                    source: e,
                })?;
            got += n as u64;
        }
    }

    /// Emits the digests due after block number `block` was read.
    fn advance<K: TermSink + ?Sized>(&mut self, block: u64, sink: &mut K) -> Result<(), ChkError> {
        let effort = self.acc.effort();
        trace!(block, ?effort, "block complete");

        match (effort, self.config.overlap()) {
            (Effort::Unsegmented, _) => {
                self.acc.set_effort(Effort::Blocks);
                self.acc.clone_context(WHOLE, BLOCK);
                sink.term(&Term::first(self.acc.finalize_context(BLOCK)))?;
            }
            (Effort::Blocks, false) => {
                sink.term(&Term::joined(Separator::Block, self.acc.finalize_context(BLOCK)))?;
            }
            (Effort::Blocks, true) => {
                // The whole-stream context holds exactly blocks 1 and 2.
                self.acc.set_effort(Effort::Overlap);
                self.acc.clone_context(WHOLE, PAIR);
                self.emit_pair(sink)?;
            }
            (Effort::Overlap, _) => self.emit_pair(sink)?,
        }

        self.acc.init_context(BLOCK);
        Ok(())
    }

    /// Emits the digest over the previous and the current block, then seeds
    /// the combination context with the current block.
    fn emit_pair<K: TermSink + ?Sized>(&mut self, sink: &mut K) -> Result<(), ChkError> {
        sink.term(&Term::joined(Separator::Overlap, self.acc.finalize_context(PAIR)))?;
        self.acc.clone_context(BLOCK, PAIR);
        Ok(())
    }

    /// Emits the closing terms after the source ended cleanly.
    fn close_expr<K: TermSink + ?Sized>(&mut self, blocks: u64, sink: &mut K) -> Result<(), ChkError> {
        match self.acc.effort() {
            Effort::Unsegmented => {
                sink.term(&Term::first(self.acc.finalize_context(WHOLE)))?;
            }
            // The single block digest already is the answer.
            Effort::Blocks | Effort::Overlap if blocks == 1 => {}
            effort => {
                // Two overlapping blocks close with the last block's own
                // digest, three or more don't.
                if effort == Effort::Overlap && blocks == 2 {
                    sink.term(&Term::joined(Separator::Block, self.acc.finalize_context(PAIR)))?;
                }
                sink.term(&Term::joined(Separator::Whole, self.acc.finalize_context(WHOLE)))?;
            }
        }
        Ok(())
    }

    /// Writes the in-band marker for `err` if block digests are out already.
    fn mark<K: TermSink + ?Sized>(&mut self, err: &ChkError, sink: &mut K) {
        if !self.acc.effort().is_segmented() {
            return;
        }
        if let Some(marker) = err.marker() {
            if let Err(e) = sink.marker(marker) {
                debug!(error = %e, "cannot write marker");
            }
        }
    }

    fn settle(&mut self, result: Result<(), ChkError>) -> Result<(), ChkError> {
        let flushed = self.acc.flush_tee();
        match result {
            Ok(()) => flushed.map_err(ChkError::from),
            Err(e) => {
                debug!(error = %e, "item failed");
                Err(e)
            }
        }
    }
}

impl Default for Session<Md5Hasher> {
    fn default() -> Self {
        Self {
            acc: Accumulator::new(false, None),
            buffer: vec![0u8; crate::config::DEFAULT_BLOCK_SIZE],
            config: DigestConfig::default(),
        }
    }
}
