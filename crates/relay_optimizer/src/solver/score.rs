use std::cmp::Ordering;

use schemars::JsonSchema;
use serde::Serialize;

/// Two-level objective: the hard score counts constraint violations, the
/// soft score is the travel cost. Lower is better and hard always dominates.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Score {
    pub hard_score: f64,
    pub soft_score: f64,
}

impl Score {
    pub fn new(hard_score: f64, soft_score: f64) -> Self {
        Score {
            hard_score,
            soft_score,
        }
    }

    pub fn hard(hard_score: f64) -> Self {
        Score {
            hard_score,
            soft_score: 0.0,
        }
    }

    pub fn soft(soft_score: f64) -> Self {
        Score {
            hard_score: 0.0,
            soft_score,
        }
    }

    pub fn is_infeasible(&self) -> bool {
        self.hard_score > 0.0
    }
}

impl Eq for Score {}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hard_score
            .total_cmp(&other.hard_score)
            .then_with(|| self.soft_score.total_cmp(&other.soft_score))
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
