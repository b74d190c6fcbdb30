//! The shared coordination context.
//!
//! The only mutable state crossing task boundaries: both lanes' latest
//! Pareto fronts, the merged front, the transform flag, and a one-time
//! ready indicator, all behind a single reader/writer lock. The context is
//! constructed by the driver and handed to every worker by `Arc` — nothing
//! here is ambient or static.
//!
//! Two `watch` channels carry the iteration ordering: each lane announces
//! the iteration its front was published for, and the coordinator announces
//! the iteration the merged front is ready for. Workers wait on their own
//! receiver clones, so no worker can observe a merge for an iteration it
//! has not published.

use rand::Rng;
use tokio::sync::{RwLock, watch};

use crate::front::{Algorithm, FrontEntry, ParetoFront};

/// The two worker slots sharing the context. A slot keeps its name across
/// a handoff; the algorithm running in it is what changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Pso,
    Gwo,
}

impl Lane {
    pub fn index(self) -> usize {
        match self {
            Lane::Pso => 0,
            Lane::Gwo => 1,
        }
    }
}

/// Pending algorithm-switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    None,
    /// The worker currently running PSO should hand its population to GWO.
    ToGwo,
    /// The worker currently running GWO should hand its population to PSO.
    ToPso,
}

#[derive(Debug, Default)]
struct ContextState {
    lane_fronts: [ParetoFront; 2],
    merged: ParetoFront,
    transform: TransformState,
    /// Set once the first merged front has been produced.
    ready: bool,
}

#[derive(Debug, Default)]
struct TransformState {
    pending: Option<Algorithm>,
}

/// Shared state plus the publish/merge iteration signals.
#[derive(Debug)]
pub struct CoordinationContext {
    state: RwLock<ContextState>,
    publish_tx: [watch::Sender<u64>; 2],
    merge_tx: watch::Sender<u64>,
}

impl Default for CoordinationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinationContext {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ContextState::default()),
            publish_tx: [watch::channel(0).0, watch::channel(0).0],
            merge_tx: watch::channel(0).0,
        }
    }

    /// Store a lane's front for the given iteration and announce it.
    pub async fn publish_front(&self, lane: Lane, front: ParetoFront, iteration: u64) {
        {
            let mut state = self.state.write().await;
            state.lane_fronts[lane.index()] = front;
        }
        self.publish_tx[lane.index()].send_replace(iteration);
    }

    /// Subscribe to a lane's publish announcements.
    pub fn subscribe_publish(&self, lane: Lane) -> watch::Receiver<u64> {
        self.publish_tx[lane.index()].subscribe()
    }

    /// Subscribe to merged-front announcements.
    pub fn subscribe_merge(&self) -> watch::Receiver<u64> {
        self.merge_tx.subscribe()
    }

    /// Snapshot both lane fronts for merging.
    pub async fn lane_fronts(&self) -> (ParetoFront, ParetoFront) {
        let state = self.state.read().await;
        (
            state.lane_fronts[0].clone(),
            state.lane_fronts[1].clone(),
        )
    }

    /// Install the merged front for an iteration and wake the waiters.
    pub async fn complete_merge(&self, merged: ParetoFront, iteration: u64) {
        {
            let mut state = self.state.write().await;
            state.merged = merged;
            state.ready = true;
        }
        self.merge_tx.send_replace(iteration);
    }

    /// Whether a first merged front exists.
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.ready
    }

    /// Request an algorithm switch. Returns false if another request is
    /// still pending — requests never overwrite each other.
    pub async fn request_transform(&self, target: Algorithm) -> bool {
        let mut state = self.state.write().await;
        if state.transform.pending.is_some() {
            return false;
        }
        state.transform.pending = Some(target);
        true
    }

    /// The pending transform, if any (without consuming it).
    pub async fn transform(&self) -> Transform {
        match self.state.read().await.transform.pending {
            None => Transform::None,
            Some(Algorithm::Gwo) => Transform::ToGwo,
            Some(Algorithm::Pso) => Transform::ToPso,
        }
    }

    /// Consume a pending transform addressed to a worker currently running
    /// `running`. The flag resets to none in the same critical section, so
    /// a request can never be consumed twice or re-trigger.
    pub async fn take_transform(&self, running: Algorithm) -> Option<Algorithm> {
        let mut state = self.state.write().await;
        match state.transform.pending {
            Some(target) if target != running => {
                state.transform.pending = None;
                Some(target)
            }
            _ => None,
        }
    }

    /// A uniformly random member of the merged front.
    pub async fn sample_merged<R: Rng>(&self, rng: &mut R) -> Option<FrontEntry> {
        let state = self.state.read().await;
        if state.merged.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..state.merged.len());
        Some(state.merged.entries()[idx].clone())
    }

    /// The best member of the merged front.
    pub async fn merged_best(&self) -> Option<FrontEntry> {
        self.state.read().await.merged.best().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgeplan_model::{ClusterModel, NodeSpec, ServiceSpec, Solution};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn entry(score: f64, origin: Algorithm) -> FrontEntry {
        let model = ClusterModel::new(
            vec![NodeSpec {
                id: "n".into(),
                cpu: 1,
                memory: 1,
            }],
            vec![ServiceSpec {
                id: "s".into(),
                cpu: 1,
                memory: 1,
            }],
            "n",
            &[],
        )
        .unwrap();
        FrontEntry {
            solution: Solution::zeroed(&model),
            score,
            origin,
        }
    }

    #[tokio::test]
    async fn publish_announces_the_iteration() {
        let ctx = CoordinationContext::new();
        let mut rx = ctx.subscribe_publish(Lane::Pso);
        assert_eq!(*rx.borrow(), 0);

        let mut front = ParetoFront::new();
        front.insert(entry(1.0, Algorithm::Pso));
        ctx.publish_front(Lane::Pso, front, 3).await;

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 3);
        let (pso, gwo) = ctx.lane_fronts().await;
        assert_eq!(pso.len(), 1);
        assert!(gwo.is_empty());
    }

    #[tokio::test]
    async fn transform_is_consumed_exactly_once() {
        let ctx = CoordinationContext::new();
        assert!(ctx.request_transform(Algorithm::Gwo).await);
        assert_eq!(ctx.transform().await, Transform::ToGwo);

        // A GWO worker is not the addressee of a switch-to-GWO request.
        assert_eq!(ctx.take_transform(Algorithm::Gwo).await, None);

        assert_eq!(ctx.take_transform(Algorithm::Pso).await, Some(Algorithm::Gwo));
        assert_eq!(ctx.transform().await, Transform::None);
        assert_eq!(ctx.take_transform(Algorithm::Pso).await, None);
    }

    #[tokio::test]
    async fn pending_transform_is_not_overwritten() {
        let ctx = CoordinationContext::new();
        assert!(ctx.request_transform(Algorithm::Gwo).await);
        assert!(!ctx.request_transform(Algorithm::Pso).await);
        assert_eq!(ctx.transform().await, Transform::ToGwo);
    }

    #[tokio::test]
    async fn ready_flips_once_merged() {
        let ctx = CoordinationContext::new();
        assert!(!ctx.is_ready().await);

        let mut merged = ParetoFront::new();
        merged.insert(entry(2.0, Algorithm::Gwo));
        ctx.complete_merge(merged, 1).await;

        assert!(ctx.is_ready().await);
        assert_eq!(ctx.merged_best().await.unwrap().score, 2.0);
    }

    #[tokio::test]
    async fn sampling_an_empty_merged_front_is_none() {
        let ctx = CoordinationContext::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(ctx.sample_merged(&mut rng).await.is_none());
    }
}
