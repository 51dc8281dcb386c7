//! Error types for md5chk.
//!
//! Every variant except [`ChkError::InvalidConfig`] and [`ChkError::Io`]
//! concerns a single item: the caller reports it, remembers that something
//! failed and carries on with the next item.

use std::io;

use thiserror::Error;

use crate::digest::Marker;

/// Errors that can occur while digesting one item.
#[derive(Debug, Error)]
pub enum ChkError {
    /// The item could not be opened.
    #[error("cannot open: {name}")]
    Open {
        /// Name of the item as given by the caller.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Seeking to the window offset failed.
    #[error("cannot seek to offset {offset}: {name}")]
    Seek {
        /// Name of the item.
        name: String,
        /// The requested offset.
        offset: u64,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The window asked for more bytes than the item holds.
    #[error("unexpected EOF after {got} of {wanted} bytes: {name}")]
    ShortRead {
        /// Name of the item.
        name: String,
        /// Bytes the window needed (offset plus exact length).
        wanted: u64,
        /// Bytes that were actually available.
        got: u64,
    },

    /// Reading the item failed midway.
    #[error("read error: {name}")]
    StreamRead {
        /// Name of the item.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Closing the item failed after it was read completely.
    #[error("cannot close: {name}")]
    Close {
        /// Name of the item.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Invalid configuration parameter.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// Writing digests or flushing pass-through data failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ChkError {
    /// The in-band marker written after a partial expression, if any.
    ///
    /// Only failures that can happen once block digests are already on
    /// their way out have one.
    pub fn marker(&self) -> Option<Marker> {
        match self {
            ChkError::ShortRead { .. } => Some(Marker::Eof),
            ChkError::StreamRead { .. } | ChkError::Close { .. } => Some(Marker::Err),
            _ => None,
        }
    }
}
