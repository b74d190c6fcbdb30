//! Trace input error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading external inputs.
///
/// All of these are fatal at startup — the optimizer never starts against
/// partial tables.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed heatmap row at {path}:{line}: {reason}")]
    HeatmapRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

pub type TraceResult<T> = Result<T, TraceError>;
