//! Error types for the watch lifecycle.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher setup and teardown.
///
/// Per-entity runtime trouble (a monitored file disappearing) is not an
/// error: it is detected by the existence monitor and contained to that
/// entity. Everything here is a setup failure that either skips one
/// entity or aborts the run.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Too many files: {count} given, hard limit is {limit}")]
    TooManyFiles { count: usize, limit: usize },

    #[error("Cannot resolve path {path}: {source}")]
    PathResolve {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to start `{stage}` stage: {source}")]
    Spawn {
        stage: &'static str,
        source: std::io::Error,
    },

    #[error("Failed to plumb pipeline stages: {reason}")]
    Pipe { reason: String },

    #[error("Failed to install interrupt handler: {source}")]
    Interrupt { source: std::io::Error },

    #[error("None of the given files can be monitored")]
    NoWatchableFiles,
}
