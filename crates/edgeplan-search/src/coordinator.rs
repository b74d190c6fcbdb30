//! The merge coordinator.
//!
//! Once per iteration, after both lanes have published, it folds the two
//! fronts into the merged front with the same dominance insertion rule,
//! tracks which algorithm's candidates are being displaced, and requests a
//! one-shot handoff when the imbalance stays on one side long enough.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::context::{CoordinationContext, Lane};
use crate::error::{SearchError, SearchResult};
use crate::front::{Algorithm, ParetoFront};
use crate::protocol::WorkerEvent;

pub struct Coordinator {
    ctx: Arc<CoordinationContext>,
    publish_rx: [watch::Receiver<u64>; 2],
    events: mpsc::UnboundedSender<WorkerEvent>,
    next_rx: watch::Receiver<u64>,
    max_iterations: u64,
    threshold: i64,
    imbalance: i64,
    /// Directions already used: [PSO→GWO, GWO→PSO].
    spent: [bool; 2],
}

impl Coordinator {
    pub fn new(
        ctx: Arc<CoordinationContext>,
        cfg: &SearchConfig,
        events: mpsc::UnboundedSender<WorkerEvent>,
        next_rx: watch::Receiver<u64>,
    ) -> Self {
        let publish_rx = [
            ctx.subscribe_publish(Lane::Pso),
            ctx.subscribe_publish(Lane::Gwo),
        ];
        Self {
            ctx,
            publish_rx,
            events,
            next_rx,
            max_iterations: cfg.max_iterations,
            threshold: cfg.transform_threshold(),
            imbalance: 0,
            spent: [false, false],
        }
    }

    pub async fn run(mut self) -> SearchResult<()> {
        for iteration in 1..=self.max_iterations {
            for rx in &mut self.publish_rx {
                rx.wait_for(|v| *v >= iteration)
                    .await
                    .map_err(|_| SearchError::SignalClosed("lane publish signal"))?;
            }

            let (pso_front, gwo_front) = self.ctx.lane_fronts().await;
            let (merged, displaced) = merge_fronts(pso_front, gwo_front);
            self.update_imbalance(displaced, iteration).await;

            debug!(
                iteration,
                merged = merged.len(),
                imbalance = self.imbalance,
                "merged iteration fronts"
            );
            self.ctx.complete_merge(merged, iteration).await;

            self.events
                .send(WorkerEvent::CoordinatorComplete { iteration })
                .map_err(|_| SearchError::SignalClosed("driver event channel"))?;

            self.next_rx
                .wait_for(|v| *v >= iteration)
                .await
                .map_err(|_| SearchError::SignalClosed("next-iteration broadcast"))?;
        }
        Ok(())
    }

    /// Move the imbalance toward whichever algorithm lost more candidates
    /// this merge, and flip the transform flag on a threshold crossing.
    async fn update_imbalance(&mut self, displaced: [u32; 2], iteration: u64) {
        let (pso, gwo) = (
            displaced[Algorithm::Pso.index()],
            displaced[Algorithm::Gwo.index()],
        );
        if pso > gwo {
            self.imbalance += 1;
        } else if gwo > pso {
            self.imbalance -= 1;
        }

        let request = if self.imbalance > self.threshold && !self.spent[0] {
            Some((Algorithm::Gwo, 0))
        } else if self.imbalance < -self.threshold && !self.spent[1] {
            Some((Algorithm::Pso, 1))
        } else {
            None
        };

        if let Some((target, direction)) = request {
            if self.ctx.request_transform(target).await {
                self.spent[direction] = true;
                self.imbalance = 0;
                info!(iteration, ?target, "requesting algorithm handoff");
            }
        }
    }
}

/// Fold both lane fronts into one, counting how many of each algorithm's
/// candidates are displaced by a member of the other front.
///
/// The displacement count is cross-front and independent of insertion
/// order — a candidate only dominated within its own lane does not signal
/// anything about the other algorithm.
fn merge_fronts(pso: ParetoFront, gwo: ParetoFront) -> (ParetoFront, [u32; 2]) {
    let mut displaced = [0u32; 2];
    for entry in pso.entries() {
        if gwo.entries().iter().any(|g| g.dominates(entry)) {
            displaced[Algorithm::Pso.index()] += 1;
        }
    }
    for entry in gwo.entries() {
        if pso.entries().iter().any(|p| p.dominates(entry)) {
            displaced[Algorithm::Gwo.index()] += 1;
        }
    }

    let mut merged = ParetoFront::new();
    for entry in pso.into_entries().into_iter().chain(gwo.into_entries()) {
        merged.insert(entry);
    }
    (merged, displaced)
}
