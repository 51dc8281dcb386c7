//! Digesting engine.
//!
//! - [`Session`] - Digests items one after another with one configuration

mod engine;
mod window;

pub use engine::{Md5Session, Session};
