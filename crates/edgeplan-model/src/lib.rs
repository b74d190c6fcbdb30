//! edgeplan-model — cluster topology and candidate deployment plans.
//!
//! This crate holds the data model shared by every search algorithm:
//!
//! - **`cluster`** — node/service resource tables and the designated
//!   cloud node (`ClusterModel`)
//! - **`solution`** — the replica matrix a search candidate represents
//! - **`particle`** — one candidate plus its search metadata
//! - **`operators`** — the mutation/imitation primitives (transfer, copy,
//!   velocity discretization) used by the optimizers

pub mod cluster;
pub mod error;
pub mod operators;
pub mod particle;
pub mod solution;

pub use cluster::{ClusterModel, NodeId, NodeSpec, ResourceSpec, ServiceId, ServiceSpec};
pub use error::{ModelError, ModelResult};
pub use operators::{
    VelocityCoefficients, copy_operator, random_solution, replica_draw, select_random_rows,
    sigmoid, transfer_operator, velocity_step,
};
pub use particle::Particle;
pub use solution::Solution;
