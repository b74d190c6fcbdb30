//! edgeplan-search — the concurrent multi-algorithm scheduler.
//!
//! Three cooperating tasks search the deployment space in lockstep:
//! a discrete particle-swarm worker, a grey-wolf worker, and a coordinator
//! that merges their published Pareto fronts once per iteration. Workers
//! exchange non-dominated candidates through the shared
//! [`context::CoordinationContext`] and may hand their whole population to
//! the other algorithm mid-run when the coordinator observes a sustained
//! performance imbalance.
//!
//! # Iteration protocol
//!
//! ```text
//! worker:       publish front ─▶ await merge ─▶ transform? ─▶ exchange
//!                    ─▶ search step ─▶ signal done ─▶ await next iteration
//! coordinator:  await both publishes ─▶ merge + imbalance ─▶ signal merge
//!                    ─▶ signal done ─▶ await next iteration
//! driver:       await 3 × done ─▶ progress row ─▶ broadcast next iteration
//! ```
//!
//! The driver owns the iteration budget, performs the one-shot algorithm
//! handoff, and persists the best plan of the final merged front.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod dpso;
pub mod driver;
pub mod error;
pub mod front;
pub mod gwo;
pub mod progress;
pub mod protocol;
pub mod pso;

pub use config::SearchConfig;
pub use context::{CoordinationContext, Lane, Transform};
pub use coordinator::Coordinator;
pub use dpso::DpsoOptimizer;
pub use driver::{Driver, IterationRecord, RunOutcome};
pub use error::{SearchError, SearchResult};
pub use front::{Algorithm, FrontEntry, ParetoFront};
pub use gwo::GwoWorker;
pub use progress::ProgressLog;
pub use protocol::{WorkerEvent, WorkerLinks};
pub use pso::PsoWorker;
