//! Runtime plumbing shared by the CLI and the sync engine.
//!
//! [`config`] loads the app credentials (JSON) and the sync document list
//! (YAML or JSON); [`logging`] installs the `tracing` subscriber. Both are
//! read once in `main` and handed down as plain values.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
