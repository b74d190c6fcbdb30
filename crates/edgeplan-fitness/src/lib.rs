//! edgeplan-fitness — scores a candidate deployment plan.
//!
//! The evaluator turns a plan plus the recorded trace data into one scalar:
//! the predicted average end-to-end latency (µs), minus a co-location bonus
//! when a dependency heatmap is supplied. Lower is better; infeasible plans
//! collapse to a large sentinel penalty instead of erroring so the search
//! is steered away rather than aborted.

pub mod evaluator;

pub use evaluator::{DEFAULT_NETWORK_DELAY_US, Evaluator, INFEASIBLE_PENALTY};
