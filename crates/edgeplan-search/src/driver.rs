//! The run driver.
//!
//! Owns the iteration budget: spawns the two search workers and the
//! coordinator, performs the 3-way rendezvous each iteration, executes the
//! one-shot algorithm handoff, appends progress rows, and persists the
//! best plan of the final merged front. This is the library entry point —
//! callers hand it an evaluator and a config and get the best plan back.

use std::path::PathBuf;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use edgeplan_fitness::Evaluator;
use edgeplan_model::Solution;

use crate::config::SearchConfig;
use crate::context::{CoordinationContext, Lane};
use crate::coordinator::Coordinator;
use crate::error::{SearchError, SearchResult};
use crate::front::Algorithm;
use crate::gwo::GwoWorker;
use crate::progress::ProgressLog;
use crate::protocol::{WorkerEvent, WorkerLinks};
use crate::pso::PsoWorker;

/// Best score known after one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub iteration: u64,
    pub best_score: f64,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub solution: Solution,
    pub score: f64,
    pub history: Vec<IterationRecord>,
}

pub struct Driver {
    evaluator: Arc<Evaluator>,
    cfg: Arc<SearchConfig>,
    progress_path: Option<PathBuf>,
    artifact_path: Option<PathBuf>,
}

impl Driver {
    pub fn new(evaluator: Arc<Evaluator>, cfg: SearchConfig) -> Self {
        Self {
            evaluator,
            cfg: Arc::new(cfg),
            progress_path: None,
            artifact_path: None,
        }
    }

    /// Append per-iteration `(iteration, bestScore)` rows to this file.
    pub fn with_progress_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.progress_path = Some(path.into());
        self
    }

    /// Write the final best plan to this file as `node → service → count`.
    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }

    /// Run the full iteration budget and return the best plan found.
    pub async fn run(&self) -> SearchResult<RunOutcome> {
        self.cfg.validate()?;
        let seed = self.cfg.seed.unwrap_or_else(|| rand::rng().random());
        info!(
            seed,
            population = self.cfg.population,
            iterations = self.cfg.max_iterations,
            "starting concurrent search"
        );

        let ctx = Arc::new(CoordinationContext::new());
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<WorkerEvent>();
        let (next_tx, next_rx) = watch::channel(0u64);

        let links = || WorkerLinks {
            ctx: ctx.clone(),
            merge_rx: ctx.subscribe_merge(),
            next_rx: next_rx.clone(),
            events: events_tx.clone(),
        };

        let pso = PsoWorker::new(
            Lane::Pso,
            self.cfg.clone(),
            self.evaluator.clone(),
            links(),
            ChaCha8Rng::seed_from_u64(seed),
        );
        let gwo = GwoWorker::new(
            Lane::Gwo,
            self.cfg.clone(),
            self.evaluator.clone(),
            links(),
            ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
        );
        let coordinator = Coordinator::new(ctx.clone(), &self.cfg, events_tx.clone(), next_rx.clone());

        let mut handles: Vec<JoinHandle<SearchResult<()>>> = vec![
            tokio::spawn(pso.run()),
            tokio::spawn(gwo.run()),
            tokio::spawn(coordinator.run()),
        ];
        // A dedicated stream for workers spawned on handoff.
        let mut handoff_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(2));
        let mut handoff_spent = [false, false];

        let mut progress = match &self.progress_path {
            Some(path) => Some(ProgressLog::open(path)?),
            None => None,
        };
        let mut history = Vec::with_capacity(self.cfg.max_iterations as usize);
        let mut best_seen = f64::INFINITY;

        for iteration in 1..=self.cfg.max_iterations {
            let mut lane_done = [false, false];
            let mut coordinator_done = false;

            while !(lane_done[0] && lane_done[1] && coordinator_done) {
                let event = events_rx
                    .recv()
                    .await
                    .ok_or(SearchError::SignalClosed("worker event channel"))?;
                match event {
                    WorkerEvent::IterationComplete {
                        lane,
                        iteration: at,
                    } if at == iteration => {
                        lane_done[lane.index()] = true;
                    }
                    WorkerEvent::CoordinatorComplete { iteration: at } if at == iteration => {
                        coordinator_done = true;
                    }
                    WorkerEvent::Handoff {
                        lane,
                        iteration: at,
                        target,
                        particles,
                    } if at == iteration => {
                        let handle = self.spawn_replacement(
                            lane,
                            target,
                            particles,
                            iteration + 1,
                            links(),
                            &mut handoff_rng,
                            &mut handoff_spent,
                        )?;
                        handles.push(handle);
                        // The handoff is the lane's completion for this
                        // iteration.
                        lane_done[lane.index()] = true;
                    }
                    other => {
                        return Err(SearchError::Protocol(format!(
                            "unexpected event at iteration {iteration}: {other:?}"
                        )));
                    }
                }
            }

            let merged_best = ctx
                .merged_best()
                .await
                .ok_or_else(|| SearchError::Protocol("merged front is empty".to_string()))?;
            if merged_best.score < best_seen {
                best_seen = merged_best.score;
            }
            history.push(IterationRecord {
                iteration,
                best_score: best_seen,
            });
            if let Some(log) = progress.as_mut() {
                log.record(iteration, best_seen)?;
            }
            debug!(iteration, best_score = best_seen, "iteration complete");

            next_tx.send_replace(iteration);
        }

        // The budget is exhausted; closing our channel ends the protocol
        // exactly once. Workers already retired by a handoff are unaffected.
        drop(links);
        drop(events_tx);
        for handle in handles {
            handle
                .await
                .map_err(|e| SearchError::Task(e.to_string()))??;
        }

        let final_best = ctx
            .merged_best()
            .await
            .ok_or_else(|| SearchError::Protocol("merged front is empty".to_string()))?;
        info!(score = final_best.score, "search finished");

        if let Some(path) = &self.artifact_path {
            let map = final_best.solution.to_node_map(self.evaluator.model());
            let json = serde_json::to_string_pretty(&map)?;
            std::fs::write(path, json).map_err(SearchError::Io)?;
            info!(path = %path.display(), "deployment plan written");
        }

        Ok(RunOutcome {
            solution: final_best.solution,
            score: final_best.score,
            history,
        })
    }

    /// Construct and start the replacement worker for a handoff — the only
    /// place a new algorithm instance is created mid-run, once per
    /// direction.
    #[allow(clippy::too_many_arguments)]
    fn spawn_replacement(
        &self,
        lane: Lane,
        target: Algorithm,
        particles: Vec<edgeplan_model::Particle>,
        start_iteration: u64,
        links: WorkerLinks,
        rng: &mut ChaCha8Rng,
        spent: &mut [bool; 2],
    ) -> SearchResult<JoinHandle<SearchResult<()>>> {
        let direction = target.index();
        if spent[direction] {
            return Err(SearchError::HandoffRepeated(target));
        }
        spent[direction] = true;

        info!(
            ?lane,
            ?target,
            transferred = particles.len(),
            start_iteration,
            "spawning replacement worker"
        );
        let worker_rng = ChaCha8Rng::seed_from_u64(rng.random());
        let handle = match target {
            Algorithm::Gwo => tokio::spawn(
                GwoWorker::resume(
                    lane,
                    self.cfg.clone(),
                    self.evaluator.clone(),
                    links,
                    worker_rng,
                    particles,
                    start_iteration,
                )
                .run(),
            ),
            Algorithm::Pso => tokio::spawn(
                PsoWorker::resume(
                    lane,
                    self.cfg.clone(),
                    self.evaluator.clone(),
                    links,
                    worker_rng,
                    particles,
                    start_iteration,
                )
                .run(),
            ),
        };
        Ok(handle)
    }
}
