use std::collections::BTreeSet;

use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    errors::ConfigError,
    solver::{construction::construct_solution::FirstSolutionStrategy, ls::r#move::MoveKind},
};

#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    pub first_solution_strategy: FirstSolutionStrategy,

    /// Wall-clock budget of the improvement phase.
    pub time_limit: Option<SignedDuration>,

    /// Number of improve cycles after construction.
    pub max_iterations: Option<usize>,

    pub enabled_moves: BTreeSet<MoveKind>,
    pub random_seed: u64,

    /// Consecutive improve cycles without a new best before the search stops.
    pub patience: usize,

    pub acceptance: AcceptancePolicy,
    pub threads: Threads,
}

/// Which improving move local search applies in each round.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AcceptancePolicy {
    /// The first improving move in scan order
    #[default]
    FirstImprovement,
    /// The most improving move of the whole neighbourhood
    BestImprovement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Threads {
    Single,
    Auto,
    Multi(usize),
}

impl Threads {
    pub fn number_of_threads(&self) -> usize {
        match self {
            Threads::Single => 1,
            Threads::Multi(num) => *num,
            Threads::Auto => std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

impl From<usize> for Threads {
    fn from(count: usize) -> Self {
        if count == 1 {
            Threads::Single
        } else {
            Threads::Multi(count)
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            first_solution_strategy: FirstSolutionStrategy::default(),
            time_limit: Some(SignedDuration::from_secs(30)),
            max_iterations: Some(1000),
            enabled_moves: MoveKind::ALL.into_iter().collect(),
            random_seed: 0,
            patience: 100,
            acceptance: AcceptancePolicy::default(),
            threads: Threads::Single,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_limit.is_none() && self.max_iterations.is_none() {
            return Err(ConfigError::MissingBudget);
        }

        if let Some(time_limit) = self.time_limit
            && (time_limit.is_zero() || time_limit.is_negative())
        {
            return Err(ConfigError::InvalidTimeLimit(time_limit));
        }

        if self.threads == Threads::Multi(0) {
            return Err(ConfigError::InvalidThreads);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SolverConfig::default();

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.enabled_moves.len(), 3);
        assert_eq!(config.threads.number_of_threads(), 1);
    }

    #[test]
    fn test_missing_budget() {
        let config = SolverConfig {
            time_limit: None,
            max_iterations: None,
            ..SolverConfig::default()
        };

        assert_eq!(config.validate(), Err(ConfigError::MissingBudget));
    }

    #[test]
    fn test_invalid_time_limit() {
        let config = SolverConfig {
            time_limit: Some(SignedDuration::ZERO),
            ..SolverConfig::default()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidTimeLimit(SignedDuration::ZERO))
        );

        let config = SolverConfig {
            time_limit: None,
            max_iterations: Some(5),
            ..SolverConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_invalid_threads() {
        let config = SolverConfig {
            threads: Threads::from(0),
            ..SolverConfig::default()
        };

        assert_eq!(config.validate(), Err(ConfigError::InvalidThreads));
        assert_eq!(Threads::from(1), Threads::Single);
        assert_eq!(Threads::from(4).number_of_threads(), 4);
    }
}
