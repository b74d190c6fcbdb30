//! Standalone discretized-PSO optimizer.
//!
//! The single-threaded velocity variant: every (node, service) cell keeps a
//! continuous velocity pulled toward the personal and global bests, and the
//! cell's replica count is re-drawn each iteration as three Bernoulli
//! trials on the sigmoid of that velocity. Useful as a baseline against
//! the concurrent scheduler and for calibrating the fitness model.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use edgeplan_fitness::Evaluator;
use edgeplan_model::{Particle, Solution, random_solution, velocity_step};

use crate::config::SearchConfig;
use crate::driver::{IterationRecord, RunOutcome};
use crate::error::SearchResult;
use crate::progress::ProgressLog;

pub struct DpsoOptimizer {
    cfg: SearchConfig,
    evaluator: Arc<Evaluator>,
    rng: ChaCha8Rng,
    particles: Vec<Particle>,
    best: Solution,
    best_score: f64,
}

impl DpsoOptimizer {
    pub fn new(cfg: SearchConfig, evaluator: Arc<Evaluator>) -> SearchResult<Self> {
        cfg.validate()?;
        let seed = cfg.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let particles: Vec<Particle> = (0..cfg.population)
            .map(|_| {
                let solution = random_solution(evaluator.model(), &mut rng);
                let score = evaluator.evaluate(&solution);
                Particle::with_velocity(solution, score)
            })
            .collect();

        let (best, best_score) = particles
            .iter()
            .min_by(|a, b| a.best_score.total_cmp(&b.best_score))
            .map(|p| (p.best.clone(), p.best_score))
            .expect("population is validated non-empty");

        info!(seed, population = cfg.population, "DPSO initialized");
        Ok(Self {
            cfg,
            evaluator,
            rng,
            particles,
            best,
            best_score,
        })
    }

    /// Run the full iteration budget, optionally appending progress rows.
    pub fn run(&mut self, mut progress: Option<&mut ProgressLog>) -> SearchResult<RunOutcome> {
        let mut history = Vec::with_capacity(self.cfg.max_iterations as usize);

        for iteration in 1..=self.cfg.max_iterations {
            for i in 0..self.particles.len() {
                let particle = &mut self.particles[i];
                velocity_step(particle, &self.best, &self.cfg.velocity, &mut self.rng);

                let score = self.evaluator.evaluate(&particle.current);
                particle.record_score(score);
                if particle.best_score < self.best_score {
                    self.best_score = particle.best_score;
                    self.best = particle.best.clone();
                }
            }

            debug!(iteration, best_score = self.best_score, "DPSO iteration");
            if let Some(log) = progress.as_deref_mut() {
                log.record(iteration, self.best_score)?;
            }
            history.push(IterationRecord {
                iteration,
                best_score: self.best_score,
            });
        }

        Ok(RunOutcome {
            solution: self.best.clone(),
            score: self.best_score,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use edgeplan_model::{ClusterModel, NodeSpec, ServiceSpec};
    use edgeplan_trace::{Span, Trace, TraceSet};

    fn evaluator() -> Arc<Evaluator> {
        let model = Arc::new(
            ClusterModel::new(
                vec![
                    NodeSpec {
                        id: "edge".into(),
                        cpu: 100,
                        memory: 100,
                    },
                    NodeSpec {
                        id: "cloud".into(),
                        cpu: 100,
                        memory: 100,
                    },
                ],
                vec![ServiceSpec {
                    id: "svc".into(),
                    cpu: 1,
                    memory: 1,
                }],
                "cloud",
                &[],
            )
            .unwrap(),
        );
        let traces = TraceSet {
            data: vec![Trace {
                trace_id: "t".into(),
                duration: 100,
                spans: vec![Span {
                    span_id: "s".into(),
                    operation_name: "op".into(),
                    service_name: "svc".into(),
                    parent_service: None,
                    start_time: 0,
                    duration: 100,
                }],
            }],
        };
        let edge = HashMap::from([(
            "svc".to_string(),
            HashMap::from([("op".to_string(), 100u64)]),
        )]);
        let cloud = HashMap::from([(
            "svc".to_string(),
            HashMap::from([("op".to_string(), 50u64)]),
        )]);
        Arc::new(Evaluator::new(model, &traces, &edge, &cloud).with_network_delay(0.0))
    }

    #[test]
    fn seeded_run_has_monotone_best_scores() {
        let cfg = SearchConfig {
            population: 10,
            max_iterations: 30,
            seed: Some(17),
            ..SearchConfig::default()
        };
        let mut dpso = DpsoOptimizer::new(cfg, evaluator()).unwrap();

        let outcome = dpso.run(None).unwrap();
        assert_eq!(outcome.history.len(), 30);
        for pair in outcome.history.windows(2) {
            assert!(pair[1].best_score <= pair[0].best_score);
        }
        assert_eq!(outcome.score, outcome.history.last().unwrap().best_score);
    }

    #[test]
    fn finds_the_cloud_placement() {
        let cfg = SearchConfig {
            population: 10,
            max_iterations: 40,
            seed: Some(5),
            ..SearchConfig::default()
        };
        let mut dpso = DpsoOptimizer::new(cfg, evaluator()).unwrap();

        let outcome = dpso.run(None).unwrap();
        // Velocity draws can zero a row entirely (cloud probability 0,
        // edge time); the reachable optimum is everything on the cloud.
        assert_eq!(outcome.score, 50.0);
        let total = outcome.solution.service_total(0);
        assert!(total > 0);
        assert_eq!(outcome.solution.get(1, 0), total);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = SearchConfig {
            population: 0,
            ..SearchConfig::default()
        };
        assert!(DpsoOptimizer::new(cfg, evaluator()).is_err());
    }
}
