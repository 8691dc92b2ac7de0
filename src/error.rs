//! Error types shared by every indicator and registry.
//!
//! Only conditions the caller can act on are surfaced here. A terminal that cannot be
//! measured, a failed write, or a worker thread that could not be spawned are degraded
//! locally (and logged through [`tracing`]) instead of aborting the caller's work.

use std::{error::Error as StdError, io, time::Duration};

use compact_str::CompactString;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by builders, run helpers, and registries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration cannot produce a usable indicator.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// [`run_with_timeout`](crate::Spinner::run_with_timeout) gave up waiting.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The wrapped task returned its own error.
    #[error("task failed: {0}")]
    Task(#[source] Box<dyn StdError + Send + Sync>),

    /// The wrapped task panicked before producing a result.
    #[error("task panicked")]
    Panicked,

    /// The worker thread for a task could not be spawned.
    #[error("failed to spawn worker thread")]
    Spawn(#[from] io::Error),

    /// A registry already holds an indicator under this name.
    #[error("an indicator named `{0}` is already registered")]
    Duplicate(CompactString),

    /// A registry holds no indicator under this name.
    #[error("no indicator named `{0}`")]
    NotFound(CompactString),
}
