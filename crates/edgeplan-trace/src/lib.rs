//! edgeplan-trace — recorded call traces and the tables derived from them.
//!
//! Everything here is produced by collaborators (a tracing backend export,
//! benchmark tables) and consumed read-only by the optimizer:
//!
//! - **`types`** — trace set and processing-time table shapes
//! - **`loader`** — typed JSON loaders for traces and resource tables
//! - **`calls`** — directed service-call counting
//! - **`heatmap`** — pairwise dependency weights: call-count and
//!   invocation-chain (DepIC) variants, with CSV import/export

pub mod calls;
pub mod error;
pub mod heatmap;
pub mod loader;
pub mod types;

pub use calls::{CallKey, count_service_calls};
pub use error::{TraceError, TraceResult};
pub use heatmap::{Heatmap, dep_ic_heatmap, invocation_chains};
pub use loader::{load_processing_times, load_resource_table, load_traces};
pub use types::{ProcessingTimes, Span, Trace, TraceSet};
