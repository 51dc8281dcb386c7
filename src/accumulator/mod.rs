//! Multi-context accumulator.
//!
//! Holds the whole-stream context (0), the current-block context (1) and the
//! overlap-combination context (2). Incoming bytes go to every live context
//! in one pass; block and overlap digests are derived by cloning context
//! state, never by buffering or re-reading data.

mod salt;

use std::fmt;
use std::io::{self, Write};
use std::mem;

use bytes::Bytes;

use crate::digest::BlockDigest;
use crate::hash::BlockHasher;

pub(crate) use salt::SaltCounter;

/// Index of the whole-stream context.
pub(crate) const WHOLE: usize = 0;
/// Index of the current-block context.
pub(crate) const BLOCK: usize = 1;
/// Index of the overlap-combination context.
pub(crate) const PAIR: usize = 2;

/// How many contexts are live beyond the whole-stream one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effort {
    /// Only the whole-stream context (effort 0).
    Unsegmented,
    /// Whole-stream and current-block contexts (effort 1).
    Blocks,
    /// All three contexts (effort 2).
    Overlap,
}

impl Effort {
    /// Number of live contexts.
    pub(crate) fn live(self) -> usize {
        match self {
            Effort::Unsegmented => 1,
            Effort::Blocks => 2,
            Effort::Overlap => 3,
        }
    }

    /// Returns `true` once at least one block digest was emitted.
    pub(crate) fn is_segmented(self) -> bool {
        self != Effort::Unsegmented
    }
}

pub(crate) struct Accumulator<H> {
    contexts: [H; 3],
    effort: Effort,
    salt: Option<SaltCounter>,
    prefix: Option<Bytes>,
    tee: Option<Box<dyn Write>>,
    flush_tee: bool,
}

impl<H: BlockHasher> Accumulator<H> {
    pub(crate) fn new(salted: bool, prefix: Option<Bytes>) -> Self {
        Self {
            contexts: Default::default(),
            effort: Effort::Unsegmented,
            salt: salted.then(SaltCounter::new),
            prefix,
            tee: None,
            flush_tee: false,
        }
    }

    /// Echoes every future update to `tee`, flushing after each write if
    /// `flush` is set.
    pub(crate) fn set_tee(&mut self, tee: Box<dyn Write>, flush: bool) {
        self.tee = Some(tee);
        self.flush_tee = flush;
    }

    /// Prepares for a new item: drops all block state and initialises the
    /// whole-stream context.
    pub(crate) fn start_item(&mut self, reset_salt: bool) {
        if reset_salt {
            if let Some(salt) = self.salt.as_mut() {
                salt.reset();
            }
        }
        self.effort = Effort::Unsegmented;
        self.init_context(WHOLE);
    }

    pub(crate) fn effort(&self) -> Effort {
        self.effort
    }

    pub(crate) fn set_effort(&mut self, effort: Effort) {
        self.effort = effort;
    }

    /// Resets context `n`, then hashes in the salt (consuming one block
    /// number) and the prefix.
    pub(crate) fn init_context(&mut self, n: usize) {
        let ctx = &mut self.contexts[n];
        *ctx = H::default();
        if let Some(salt) = self.salt.as_mut() {
            ctx.update(&salt.next_label());
        }
        if let Some(prefix) = &self.prefix {
            ctx.update(prefix);
        }
    }

    /// Feeds `data` to every live context, highest index first, and to the
    /// pass-through sink.
    pub(crate) fn update_all(&mut self, data: &[u8]) -> io::Result<()> {
        for ctx in self.contexts[..self.effort.live()].iter_mut().rev() {
            ctx.update(data);
        }
        if let Some(tee) = self.tee.as_mut() {
            tee.write_all(data)?;
            if self.flush_tee {
                tee.flush()?;
            }
        }
        Ok(())
    }

    /// Overwrites context `to` with the complete state of context `from`.
    pub(crate) fn clone_context(&mut self, from: usize, to: usize) {
        self.contexts[to] = self.contexts[from].clone();
    }

    /// Yields the digest of context `n`.
    ///
    /// The context is left empty; it must be re-initialised before it is
    /// fed again.
    pub(crate) fn finalize_context(&mut self, n: usize) -> BlockDigest {
        mem::take(&mut self.contexts[n]).finalize()
    }

    pub(crate) fn flush_tee(&mut self) -> io::Result<()> {
        match self.tee.as_mut() {
            Some(tee) => tee.flush(),
            None => Ok(()),
        }
    }
}

impl<H> fmt::Debug for Accumulator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("effort", &self.effort)
            .field("salt", &self.salt)
            .field("prefix", &self.prefix)
            .field("tee", &self.tee.is_some())
            .field("flush_tee", &self.flush_tee)
            .finish()
    }
}
