//! Mutation and imitation primitives shared by the search algorithms.
//!
//! Every routine draws randomness through `&mut impl Rng` so callers can
//! seed runs deterministically.

use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterModel;
use crate::particle::Particle;
use crate::solution::Solution;

/// Upper bound on the per-service replica total drawn for a fresh plan.
const MAX_INITIAL_REPLICAS: u32 = 10;

/// Coefficients for the velocity update of the discretized-PSO variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VelocityCoefficients {
    /// Inertia weight `w`.
    pub inertia: f64,
    /// Pull toward the personal best, `c1`.
    pub cognitive: f64,
    /// Pull toward the global best, `c2`.
    pub social: f64,
}

impl Default for VelocityCoefficients {
    fn default() -> Self {
        Self {
            inertia: 0.5,
            cognitive: 1.5,
            social: 1.5,
        }
    }
}

/// Generate a fresh random plan: each service draws a total replica count
/// in `1..=MAX_INITIAL_REPLICAS` and scatters it one unit at a time onto
/// uniformly random nodes.
pub fn random_solution(model: &ClusterModel, rng: &mut impl Rng) -> Solution {
    let mut solution = Solution::zeroed(model);
    for service in 0..model.service_count() {
        let total = rng.random_range(1..=MAX_INITIAL_REPLICAS);
        for _ in 0..total {
            let node = rng.random_range(0..model.node_count());
            solution.add(node, service, 1);
        }
    }
    solution
}

/// Pick `count` distinct service rows uniformly at random.
pub fn select_random_rows(count: usize, services: usize, rng: &mut impl Rng) -> Vec<usize> {
    let count = count.min(services);
    index::sample(rng, services, count).into_vec()
}

/// Reshuffle a random subset of service rows, preserving each row's total.
///
/// Selects `round(exploration_fraction × |services|)` rows (at least one, so
/// small clusters still explore); for each, the current replica total is
/// collected, the row zeroed, and the same number of units redistributed
/// one at a time onto uniformly random nodes.
pub fn transfer_operator(solution: &mut Solution, exploration_fraction: f64, rng: &mut impl Rng) {
    let services = solution.service_count();
    let count = ((exploration_fraction * services as f64).round() as usize).max(1);

    for service in select_random_rows(count, services, rng) {
        let total = solution.service_total(service);
        for node in 0..solution.node_count() {
            solution.set(node, service, 0);
        }
        for _ in 0..total {
            let node = rng.random_range(0..solution.node_count());
            solution.add(node, service, 1);
        }
    }
}

/// Overwrite the selected service rows with the reference plan's counts.
///
/// Pure imitation — no blending.
pub fn copy_operator(solution: &mut Solution, reference: &Solution, rows: &[usize]) {
    for &service in rows {
        for node in 0..solution.node_count() {
            solution.set(node, service, reference.get(node, service));
        }
    }
}

/// Standard logistic sigmoid.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Draw a replica count in `{0, 1, 2, 3}` as three independent Bernoulli
/// trials each succeeding with the given probability.
pub fn replica_draw(probability: f64, rng: &mut impl Rng) -> u32 {
    let mut count = 0;
    for _ in 0..3 {
        if rng.random::<f64>() < probability {
            count += 1;
        }
    }
    count
}

/// One velocity update of the discretized-PSO variant.
///
/// Per (node, service) cell:
/// `v = w·v + c1·r1·(pbest − current) + c2·r2·(gbest − current)`,
/// then the cell's new count is drawn by [`replica_draw`] with probability
/// `sigmoid(v)`.
pub fn velocity_step(
    particle: &mut Particle,
    global_best: &Solution,
    coefficients: &VelocityCoefficients,
    rng: &mut impl Rng,
) {
    let nodes = particle.current.node_count();
    let services = particle.current.service_count();
    let velocity = particle
        .velocity
        .get_or_insert_with(|| vec![0.0; nodes * services]);

    for node in 0..nodes {
        for service in 0..services {
            let cell = node * services + service;
            let current = particle.current.get(node, service) as f64;
            let pbest = particle.best.get(node, service) as f64;
            let gbest = global_best.get(node, service) as f64;
            let (r1, r2) = (rng.random::<f64>(), rng.random::<f64>());

            velocity[cell] = coefficients.inertia * velocity[cell]
                + coefficients.cognitive * r1 * (pbest - current)
                + coefficients.social * r2 * (gbest - current);

            let next = replica_draw(sigmoid(velocity[cell]), rng);
            particle.current.set(node, service, next);
        }
    }
}
