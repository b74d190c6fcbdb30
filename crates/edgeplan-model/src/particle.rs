//! One search candidate plus its metadata.

use crate::solution::Solution;

/// A candidate deployment plan with the search state the optimizers track
/// for it: an optional per-cell velocity (used only by the continuous-PSO
/// discretization) and the best plan this particle has seen so far.
#[derive(Debug, Clone)]
pub struct Particle {
    /// The plan being mutated in place every iteration.
    pub current: Solution,
    /// Per-(node, service) velocity, `None` outside the velocity variant.
    pub velocity: Option<Vec<f64>>,
    /// Best plan observed for this particle.
    pub best: Solution,
    /// Score of `best`; lower is better.
    pub best_score: f64,
}

impl Particle {
    /// Create a particle whose personal best starts at its initial plan.
    pub fn new(solution: Solution, score: f64) -> Self {
        Self {
            best: solution.clone(),
            current: solution,
            velocity: None,
            best_score: score,
        }
    }

    /// Create a particle carrying a zeroed velocity map.
    pub fn with_velocity(solution: Solution, score: f64) -> Self {
        let cells = solution.node_count() * solution.service_count();
        let mut particle = Self::new(solution, score);
        particle.velocity = Some(vec![0.0; cells]);
        particle
    }

    /// Fold a fresh evaluation of `current` into the personal best.
    ///
    /// Only a strictly better score replaces the best.
    pub fn record_score(&mut self, score: f64) {
        if score < self.best_score {
            self.best_score = score;
            self.best = self.current.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterModel, NodeSpec, ServiceSpec};

    fn solution() -> Solution {
        let model = ClusterModel::new(
            vec![NodeSpec {
                id: "edge".into(),
                cpu: 4,
                memory: 8,
            }],
            vec![ServiceSpec {
                id: "cart".into(),
                cpu: 1,
                memory: 1,
            }],
            "edge",
            &[],
        )
        .unwrap();
        Solution::zeroed(&model)
    }

    #[test]
    fn best_only_improves() {
        let mut particle = Particle::new(solution(), 10.0);

        particle.current.set(0, 0, 3);
        particle.record_score(12.0);
        assert_eq!(particle.best_score, 10.0);
        assert_eq!(particle.best.service_total(0), 0);

        particle.record_score(7.0);
        assert_eq!(particle.best_score, 7.0);
        assert_eq!(particle.best.service_total(0), 3);
    }

    #[test]
    fn equal_score_keeps_existing_best() {
        let mut particle = Particle::new(solution(), 10.0);
        particle.current.set(0, 0, 1);
        particle.record_score(10.0);
        assert_eq!(particle.best.service_total(0), 0);
    }

    #[test]
    fn velocity_is_sized_to_the_matrix() {
        let particle = Particle::with_velocity(solution(), 1.0);
        assert_eq!(particle.velocity.as_ref().unwrap().len(), 1);
    }
}
