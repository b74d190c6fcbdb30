//! The particle-swarm worker.
//!
//! Discrete PSO over replica matrices: every particle is reshuffled by the
//! transfer operator, then pulled back toward its personal best by the copy
//! operator on a small random row subset. The worker participates in the
//! publish/merge/transform/exchange protocol each iteration.

use std::sync::Arc;

use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use edgeplan_fitness::Evaluator;
use edgeplan_model::{Particle, copy_operator, random_solution, select_random_rows,
    transfer_operator};

use crate::config::SearchConfig;
use crate::context::Lane;
use crate::error::{SearchError, SearchResult};
use crate::front::{Algorithm, FrontEntry, ParetoFront};
use crate::protocol::{WorkerEvent, WorkerLinks};

pub struct PsoWorker {
    lane: Lane,
    cfg: Arc<SearchConfig>,
    evaluator: Arc<Evaluator>,
    links: WorkerLinks,
    rng: ChaCha8Rng,
    particles: Vec<Particle>,
    start_iteration: u64,
}

impl PsoWorker {
    /// A worker with a fresh random population, starting at iteration 1.
    pub fn new(
        lane: Lane,
        cfg: Arc<SearchConfig>,
        evaluator: Arc<Evaluator>,
        links: WorkerLinks,
        mut rng: ChaCha8Rng,
    ) -> Self {
        let particles = (0..cfg.population)
            .map(|_| {
                let solution = random_solution(evaluator.model(), &mut rng);
                let score = evaluator.evaluate(&solution);
                Particle::new(solution, score)
            })
            .collect();
        Self {
            lane,
            cfg,
            evaluator,
            links,
            rng,
            particles,
            start_iteration: 1,
        }
    }

    /// A worker seeded with particles transferred from the other algorithm,
    /// topped up with fresh random particles, resuming mid-run.
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
        Self {
            lane,
            cfg,
            evaluator,
            links,
            rng,
            particles: transferred,
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

            if let Some(target) = self.links.ctx.take_transform(Algorithm::Pso).await {
                let particles = self.surrender_half();
                info!(
                    iteration,
                    transferred = particles.len(),
                    "PSO worker hands its population to GWO"
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
            self.step();

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
        debug!("PSO worker finished its budget");
        Ok(())
    }

    /// Non-dominated set over the population's personal bests.
    fn build_front(&self) -> ParetoFront {
        let mut front = ParetoFront::new();
        for particle in &self.particles {
            front.insert(FrontEntry {
                solution: particle.best.clone(),
                score: particle.best_score,
                origin: Algorithm::Pso,
            });
        }
        front
    }

    /// Replace the worst particle's plan with a random merged-front member.
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

    /// One PSO iteration over the whole population.
    fn step(&mut self) {
        let services = self.evaluator.model().service_count();
        let copy_rows = (self.cfg.imitation_fraction * services as f64).round() as usize;

        for i in 0..self.particles.len() {
            let rows = select_random_rows(copy_rows, services, &mut self.rng);
            let particle = &mut self.particles[i];

            transfer_operator(
                &mut particle.current,
                self.cfg.exploration_fraction,
                &mut self.rng,
            );
            let pbest = particle.best.clone();
            copy_operator(&mut particle.current, &pbest, &rows);

            let score = self.evaluator.evaluate(&particle.current);
            particle.record_score(score);
        }
    }

    /// Package the first half of the population for a handoff; ownership
    /// moves, nothing is duplicated.
    fn surrender_half(&mut self) -> Vec<Particle> {
        let half = self.particles.len() / 2;
        self.particles.drain(..half).collect()
    }

    #[cfg(test)]
    pub(crate) fn particles(&self) -> &[Particle] {
        &self.particles
    }
}
