//! Model error types.

use thiserror::Error;

/// Errors that can occur while building or translating model types.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("cluster model needs at least one node and one service")]
    EmptyModel,

    #[error("solution shape does not match the cluster model ({nodes} nodes × {services} services)")]
    ShapeMismatch { nodes: usize, services: usize },
}

pub type ModelResult<T> = Result<T, ModelError>;
