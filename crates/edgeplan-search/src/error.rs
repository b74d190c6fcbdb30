//! Search error types.
//!
//! Data problems (infeasible plans, missing table entries) never surface
//! here — they are absorbed by the fitness score. These errors are broken
//! coordination invariants or I/O failures, and they abort the run.

use thiserror::Error;

use crate::front::Algorithm;

/// Errors that can occur while driving the concurrent search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A coordination signal closed while a participant still expected it.
    #[error("coordination signal closed early: {0}")]
    SignalClosed(&'static str),

    /// The rendezvous produced an event that doesn't fit the protocol.
    #[error("coordination protocol violation: {0}")]
    Protocol(String),

    /// A second handoff was requested in a direction already consumed.
    #[error("handoff to {0:?} already performed")]
    HandoffRepeated(Algorithm),

    #[error("invalid search config: {0}")]
    Config(String),

    /// A worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Task(String),

    #[error("progress log I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact serialization: {0}")]
    Artifact(#[from] serde_json::Error),
}

pub type SearchResult<T> = Result<T, SearchError>;
