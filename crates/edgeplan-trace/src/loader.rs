//! Typed JSON loaders for the optimizer's external inputs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use edgeplan_model::ResourceSpec;

use crate::error::{TraceError, TraceResult};
use crate::types::{ProcessingTimes, TraceSet};

/// Read and deserialize one JSON input file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> TraceResult<T> {
    let raw = fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| TraceError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a recorded trace set.
pub fn load_traces(path: &Path) -> TraceResult<TraceSet> {
    let traces: TraceSet = load_json(path)?;
    debug!(path = %path.display(), traces = traces.len(), "loaded trace set");
    Ok(traces)
}

/// Load a `service → operation → microseconds` processing-time table.
pub fn load_processing_times(path: &Path) -> TraceResult<ProcessingTimes> {
    load_json(path)
}

/// Load a `name → {cpu, memory}` resource table (nodes or services).
pub fn load_resource_table(path: &Path) -> TraceResult<HashMap<String, ResourceSpec>> {
    load_json(path)
}
