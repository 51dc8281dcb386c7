//! Configuration for digesting behavior.
//!
//! This module provides types to configure how items are digested:
//!
//! - [`DigestConfig`] - Block segmentation, windowing, salting and prefix
//! - [`Window`] - The sub-range of an item that is actually hashed
//! - [`Salting`] - Block-number salting mode
//!
//! # Example
//!
//! ```
//! use md5chk::{DigestConfig, Salting, Window};
//!
//! // 1 MiB blocks with overlapping combination digests
//! let config = DigestConfig::default()
//!     .with_max_size(1024 * 1024)
//!     .with_overlap(true);
//!
//! // Hash 10 bytes starting at offset 5, salted per block
//! let config = DigestConfig::default()
//!     .with_window(Window::new(5, 10))
//!     .with_salting(Salting::PerItem);
//! config.validate()?;
//!
//! # Ok::<(), md5chk::ChkError>(())
//! ```

use bytes::Bytes;

use crate::error::ChkError;

/// Default I/O block size (ten times the classic `BUFSIZ` of 8 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 10 * 8192;

/// Block size used when overlap or salting is requested without a
/// maximum block size (1 MiB).
pub const DEFAULT_SEGMENT_SIZE: u64 = 1024 * 1024;

/// The sub-range of an item that is hashed.
///
/// `offset` bytes are skipped first. If `exact` is non-zero exactly that
/// many bytes are hashed afterwards and fewer available bytes is an error;
/// zero means "everything up to the end".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Window {
    offset: u64,
    exact: u64,
}

impl Window {
    /// Creates a window skipping `offset` bytes and hashing `exact` bytes.
    pub const fn new(offset: u64, exact: u64) -> Self {
        Self { offset, exact }
    }

    /// The window covering the whole item.
    pub const fn whole() -> Self {
        Self { offset: 0, exact: 0 }
    }

    /// Bytes skipped before hashing starts.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Exact byte count to hash, or 0 for unbounded.
    pub fn exact(&self) -> u64 {
        self.exact
    }

    /// The exact byte count, if one was requested.
    pub fn limit(&self) -> Option<u64> {
        (self.exact != 0).then_some(self.exact)
    }

    /// Returns `true` if the window covers the whole item.
    pub fn is_whole(&self) -> bool {
        self.offset == 0 && self.exact == 0
    }

    /// Minimum item length needed to satisfy the window.
    pub fn required_len(&self) -> u64 {
        self.offset.saturating_add(self.exact)
    }
}

/// Block-number salting.
///
/// A salted context gets the current block counter hashed in, as a
/// 20 digit zero padded decimal, before the prefix and any data. Every
/// context initialisation consumes one counter value, so equal blocks at
/// different positions produce different digests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Salting {
    /// No salting.
    #[default]
    Off,
    /// One counter for the whole session, starting at 1.
    Continuous,
    /// The counter restarts at 1 for every item.
    PerItem,
}

impl Salting {
    /// Returns `true` unless salting is off.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Salting::Off)
    }
}

/// Configuration for one digesting session.
///
/// `max_size` controls segmentation: zero gives one digest per item, any
/// other value additionally yields one digest per block of at most
/// `max_size` bytes (plus overlap combinations if `overlap` is set).
/// `block_size` only controls how much is requested from the source per
/// read and never influences the digests.
///
/// # Example
///
/// ```
/// use md5chk::DigestConfig;
///
/// let config = DigestConfig::default().with_overlap(true);
///
/// // Overlap without an explicit block size uses 1 MiB blocks
/// assert_eq!(config.max_size(), 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DigestConfig {
    /// I/O request size in bytes.
    block_size: usize,

    /// Maximum block size for per-block digests, 0 for none.
    max_size: u64,

    /// Whether to emit digests over adjacent block pairs.
    overlap: bool,

    /// The hashed sub-range of every item.
    window: Window,

    /// Constant hashed into every context before any data.
    prefix: Option<Bytes>,

    /// Block-number salting mode.
    salting: Salting,

    /// Echo every hashed byte to the pass-through sink.
    pass_through: bool,

    /// Flush the pass-through sink after every write.
    unbuffered: bool,
}

impl DigestConfig {
    /// Creates a new configuration with the given I/O block size and
    /// maximum block size.
    ///
    /// # Errors
    ///
    /// Returns [`ChkError::InvalidConfig`] if `block_size` is zero.
    pub fn new(block_size: usize, max_size: u64) -> Result<Self, ChkError> {
        let config = Self {
            block_size,
            max_size,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the I/O block size.
    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the maximum block size (0 disables segmentation).
    pub fn with_max_size(mut self, size: u64) -> Self {
        self.max_size = size;
        self
    }

    /// Enables or disables overlap combination digests.
    pub fn with_overlap(mut self, overlap: bool) -> Self {
        self.overlap = overlap;
        self
    }

    /// Sets the window.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Sets the constant prefix.
    pub fn with_prefix(mut self, prefix: Option<impl Into<Bytes>>) -> Self {
        self.prefix = prefix.map(Into::into);
        self
    }

    /// Sets the salting mode.
    pub fn with_salting(mut self, salting: Salting) -> Self {
        self.salting = salting;
        self
    }

    /// Enables or disables pass-through of the hashed bytes.
    pub fn with_pass_through(mut self, pass_through: bool) -> Self {
        self.pass_through = pass_through;
        self
    }

    /// Flushes passed-through bytes after every write, so they interleave
    /// with the digest lines.
    pub fn with_unbuffered(mut self, unbuffered: bool) -> Self {
        self.unbuffered = unbuffered;
        self
    }

    /// Returns the I/O block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the effective maximum block size.
    ///
    /// Overlap and salting only make sense with segmentation, so they
    /// imply [`DEFAULT_SEGMENT_SIZE`] when no size was set.
    pub fn max_size(&self) -> u64 {
        if self.max_size == 0 && (self.overlap || self.salting.is_enabled()) {
            DEFAULT_SEGMENT_SIZE
        } else {
            self.max_size
        }
    }

    /// Returns `true` if overlap combination digests are enabled.
    pub fn overlap(&self) -> bool {
        self.overlap
    }

    /// Returns the window.
    pub fn window(&self) -> Window {
        self.window
    }

    /// Returns the constant prefix, if set.
    pub fn prefix(&self) -> Option<&Bytes> {
        self.prefix.as_ref()
    }

    /// Returns the salting mode.
    pub fn salting(&self) -> Salting {
        self.salting
    }

    /// Returns `true` if pass-through is enabled.
    pub fn pass_through(&self) -> bool {
        self.pass_through
    }

    /// Returns `true` if passed-through bytes are flushed on every write.
    pub fn unbuffered(&self) -> bool {
        self.unbuffered
    }

    /// Validates the current configuration.
    pub fn validate(&self) -> Result<(), ChkError> {
        if self.block_size == 0 {
            return Err(ChkError::InvalidConfig {
                message: "block size must be non-zero",
            });
        }

        if self.window.offset.checked_add(self.window.exact).is_none() {
            return Err(ChkError::InvalidConfig {
                message: "offset plus exact length overflows",
            });
        }

        Ok(())
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_size: 0,
            overlap: false,
            window: Window::whole(),
            prefix: None,
            salting: Salting::Off,
            pass_through: false,
            unbuffered: false,
        }
    }
}
