//! Search configuration.

use serde::{Deserialize, Serialize};

use edgeplan_model::VelocityCoefficients;

use crate::error::{SearchError, SearchResult};

/// Tunables shared by every optimizer in this crate.
///
/// The defaults reproduce the parameters the predicted-latency model was
/// calibrated with: transfer reshuffles 45% of service rows, PSO copies
/// back 10% of rows from the personal best, and GWO's exploration
/// parameter decays linearly from 0.8 to 0.2 over the budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Particles per worker population.
    pub population: usize,
    /// Fixed iteration budget.
    pub max_iterations: u64,
    /// RNG seed; `None` draws one at startup.
    pub seed: Option<u64>,
    /// Share of service rows the transfer operator reshuffles.
    pub exploration_fraction: f64,
    /// Share of rows PSO copies back from the personal best.
    pub imitation_fraction: f64,
    /// Velocity-update coefficients for the discretized-PSO variant.
    pub velocity: VelocityCoefficients,
    /// GWO exploration parameter at the first iteration.
    pub gwo_a_start: f64,
    /// GWO exploration parameter at the last iteration.
    pub gwo_a_end: f64,
    /// Imbalance the coordinator tolerates before requesting a handoff;
    /// `None` means `max_iterations / 2`.
    pub switch_threshold: Option<i64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population: 30,
            max_iterations: 100,
            seed: None,
            exploration_fraction: 0.45,
            imitation_fraction: 0.1,
            velocity: VelocityCoefficients::default(),
            gwo_a_start: 0.8,
            gwo_a_end: 0.2,
            switch_threshold: None,
        }
    }
}

impl SearchConfig {
    /// The imbalance threshold that triggers a handoff.
    pub fn transform_threshold(&self) -> i64 {
        self.switch_threshold
            .unwrap_or((self.max_iterations / 2) as i64)
            .max(1)
    }

    /// GWO's exploration parameter for a 1-based iteration.
    pub fn gwo_a(&self, iteration: u64) -> f64 {
        let progress = (iteration.saturating_sub(1)) as f64 / self.max_iterations as f64;
        self.gwo_a_start - progress * (self.gwo_a_start - self.gwo_a_end)
    }

    pub fn validate(&self) -> SearchResult<()> {
        if self.population < 2 {
            return Err(SearchError::Config(
                "population must be at least 2".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(SearchError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("exploration_fraction", self.exploration_fraction),
            ("imitation_fraction", self.imitation_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SearchError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SearchConfig::default().validate().unwrap();
    }

    #[test]
    fn gwo_a_decays_linearly() {
        let cfg = SearchConfig {
            max_iterations: 100,
            ..SearchConfig::default()
        };
        assert!((cfg.gwo_a(1) - 0.8).abs() < 1e-12);
        let mid = cfg.gwo_a(51);
        assert!(mid < 0.8 && mid > 0.2);
        assert!((cfg.gwo_a(101) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn threshold_defaults_to_half_the_budget() {
        let cfg = SearchConfig {
            max_iterations: 80,
            ..SearchConfig::default()
        };
        assert_eq!(cfg.transform_threshold(), 40);

        let explicit = SearchConfig {
            switch_threshold: Some(3),
            ..cfg
        };
        assert_eq!(explicit.transform_threshold(), 3);
    }

    #[test]
    fn tiny_population_is_rejected() {
        let cfg = SearchConfig {
            population: 1,
            ..SearchConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(SearchError::Config(_))));
    }
}
