//! The grey-wolf worker.
//!
//! Keeps the three best-scoring particles as strictly ordered leaders
//! (alpha/beta/delta). Each particle either explores via the transfer
//! operator (with probability `a`, decaying linearly over the budget) or
//! imitates one uniformly chosen leader on exactly one random service row.
//! Same coordination protocol as the PSO worker, with the symmetric
//! GWO → PSO handoff.

use std::sync::Arc;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use edgeplan_fitness::Evaluator;
use edgeplan_model::{Particle, Solution, copy_operator, random_solution, select_random_rows,
    transfer_operator};

use crate::config::SearchConfig;
use crate::context::Lane;
use crate::error::{SearchError, SearchResult};
use crate::front::{Algorithm, FrontEntry, ParetoFront};
use crate::protocol::{WorkerEvent, WorkerLinks};

/// The three pack leaders, ascending by score.
#[derive(Debug, Default)]
struct Leaders {
    ranked: Vec<(Solution, f64)>,
}

impl Leaders {
    /// Offer a candidate; it displaces lower-ranked leaders if strictly
    /// better than one of them.
    fn offer(&mut self, solution: &Solution, score: f64) {
        let position = self
            .ranked
            .iter()
            .position(|(_, s)| score < *s)
            .unwrap_or(self.ranked.len());
        if position < 3 {
            self.ranked.insert(position, (solution.clone(), score));
            self.ranked.truncate(3);
        }
    }

    /// One leader chosen uniformly at random.
    fn choose(&self, rng: &mut impl Rng) -> Option<Solution> {
        if self.ranked.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.ranked.len());
        Some(self.ranked[idx].0.clone())
    }

    fn alpha_score(&self) -> Option<f64> {
        self.ranked.first().map(|(_, s)| *s)
    }
}

pub struct GwoWorker {
    lane: Lane,
    cfg: Arc<SearchConfig>,
    evaluator: Arc<Evaluator>,
    links: WorkerLinks,
    rng: ChaCha8Rng,
    particles: Vec<Particle>,
    leaders: Leaders,
    start_iteration: u64,
}

impl GwoWorker {
    /// A worker with a fresh random population, starting at iteration 1.
    pub fn new(
        lane: Lane,
        cfg: Arc<SearchConfig>,
        evaluator: Arc<Evaluator>,
        links: WorkerLinks,
        mut rng: ChaCha8Rng,
    ) -> Self {
        let particles: Vec<Particle> = (0..cfg.population)
            .map(|_| {
                let solution = random_solution(evaluator.model(), &mut rng);
                let score = evaluator.evaluate(&solution);
                Particle::new(solution, score)
            })
            .collect();
        let mut leaders = Leaders::default();
        for particle in &particles {
            leaders.offer(&particle.best, particle.best_score);
        }
        Self {
            lane,
            cfg,
            evaluator,
            links,
            rng,
            particles,
            leaders,
            start_iteration: 1,
        }
    }

    /// A worker seeded with transferred particles, resuming mid-run.
    pub fn resume(
        lane: Lane,
        cfg: Arc<SearchConfig>,
        evaluator: Arc<Evaluator>,
        links: WorkerLinks,
        mut rng: ChaCha8Rng,
        mut transferred: Vec<Particle>,
        start_iteration: u64,
    ) -> Self {
        transferred.truncate(cfg.population);
        while transferred.len() < cfg.population {
            let solution = random_solution(evaluator.model(), &mut rng);
            let score = evaluator.evaluate(&solution);
            transferred.push(Particle::new(solution, score));
        }
        let mut leaders = Leaders::default();
        for particle in &transferred {
            leaders.offer(&particle.best, particle.best_score);
        }
        Self {
            lane,
            cfg,
            evaluator,
            links,
            rng,
            particles: transferred,
            leaders,
            start_iteration,
        }
    }

    pub async fn run(mut self) -> SearchResult<()> {
        for iteration in self.start_iteration..=self.cfg.max_iterations {
            let front = self.build_front();
            self.links
                .ctx
                .publish_front(self.lane, front, iteration)
                .await;

            self.links
                .merge_rx
                .wait_for(|v| *v >= iteration)
                .await
                .map_err(|_| SearchError::SignalClosed("merged-front signal"))?;

            if let Some(target) = self.links.ctx.take_transform(Algorithm::Gwo).await {
                let particles = self.surrender_half();
                info!(
                    iteration,
                    transferred = particles.len(),
                    "GWO worker hands its population to PSO"
                );
                self.links
                    .events
                    .send(WorkerEvent::Handoff {
                        lane: self.lane,
                        iteration,
                        target,
                        particles,
                    })
                    .map_err(|_| SearchError::SignalClosed("driver event channel"))?;
                return Ok(());
            }

            self.exchange_with_merged().await;
            self.step(iteration);

            self.links
                .events
                .send(WorkerEvent::IterationComplete {
                    lane: self.lane,
                    iteration,
                })
                .map_err(|_| SearchError::SignalClosed("driver event channel"))?;

            self.links
                .next_rx
                .wait_for(|v| *v >= iteration)
                .await
                .map_err(|_| SearchError::SignalClosed("next-iteration broadcast"))?;
        }
        debug!(alpha = ?self.leaders.alpha_score(), "GWO worker finished its budget");
        Ok(())
    }

    fn build_front(&self) -> ParetoFront {
        let mut front = ParetoFront::new();
        for particle in &self.particles {
            front.insert(FrontEntry {
                solution: particle.best.clone(),
                score: particle.best_score,
                origin: Algorithm::Gwo,
            });
        }
        front
    }

    async fn exchange_with_merged(&mut self) {
        let Some(pick) = self.links.ctx.sample_merged(&mut self.rng).await else {
            return;
        };
        let worst = self.worst_index();
        let score = self.evaluator.evaluate(&pick.solution);
        let particle = &mut self.particles[worst];
        particle.current = pick.solution;
        particle.record_score(score);
    }

    fn worst_index(&self) -> usize {
        let mut worst = 0;
        for (i, particle) in self.particles.iter().enumerate() {
            if particle.best_score > self.particles[worst].best_score {
                worst = i;
            }
        }
        worst
    }

    /// One GWO iteration: explore or imitate a leader, then re-rank.
    fn step(&mut self, iteration: u64) {
        let a = self.cfg.gwo_a(iteration);
        let services = self.evaluator.model().service_count();

        for i in 0..self.particles.len() {
            if self.rng.random::<f64>() < a {
                transfer_operator(
                    &mut self.particles[i].current,
                    self.cfg.exploration_fraction,
                    &mut self.rng,
                );
            } else if let Some(leader) = self.leaders.choose(&mut self.rng) {
                // Single-row imitation.
                let row = select_random_rows(1, services, &mut self.rng);
                copy_operator(&mut self.particles[i].current, &leader, &row);
            }

            let score = self.evaluator.evaluate(&self.particles[i].current);
            let particle = &mut self.particles[i];
            particle.record_score(score);
            // Leaders re-rank after every particle update.
            self.leaders.offer(&particle.best, particle.best_score);
        }
    }

    /// Package the first half of the population for a handoff.
    fn surrender_half(&mut self) -> Vec<Particle> {
        let half = self.particles.len() / 2;
        self.particles.drain(..half).collect()
    }

    #[cfg(test)]
    pub(crate) fn particles(&self) -> &[Particle] {
        &self.particles
    }
}
