//! Worker ↔ driver protocol types.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use edgeplan_model::Particle;

use crate::context::{CoordinationContext, Lane};
use crate::front::Algorithm;

/// Events the driver collects to complete each iteration's rendezvous.
#[derive(Debug)]
pub enum WorkerEvent {
    /// A lane finished its search step for the iteration.
    IterationComplete { lane: Lane, iteration: u64 },
    /// The coordinator finished the iteration's merge.
    CoordinatorComplete { iteration: u64 },
    /// A lane consumed the transform flag: it retires now and its
    /// particles move to a new worker of the target algorithm.
    /// Counts as the lane's completion for the iteration.
    Handoff {
        lane: Lane,
        iteration: u64,
        target: Algorithm,
        particles: Vec<Particle>,
    },
}

/// The channel bundle every worker runs against.
#[derive(Debug)]
pub struct WorkerLinks {
    pub ctx: Arc<CoordinationContext>,
    /// Merged-front readiness, per-worker receiver.
    pub merge_rx: watch::Receiver<u64>,
    /// Next-iteration broadcast, per-worker receiver.
    pub next_rx: watch::Receiver<u64>,
    /// Completion/handoff events to the driver.
    pub events: mpsc::UnboundedSender<WorkerEvent>,
}
