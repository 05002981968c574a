use std::collections::BTreeMap;

use jiff::SignedDuration;
use serde::Serialize;

use crate::solver::{ls::r#move::MoveKind, score::Score};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ScoreEvolutionRow {
    /// Improve cycle that produced the score, 0 for the construction.
    pub iteration: usize,
    pub score: Score,
    pub elapsed: SignedDuration,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct SearchStatistics {
    pub iterations: usize,
    pub moves_applied: usize,
    pub moves_by_kind: BTreeMap<MoveKind, usize>,
    pub penalized_arcs: usize,
    pub inserted_nodes: usize,
    pub elapsed: SignedDuration,

    /// Every new best score, in the order they were found.
    pub score_evolution: Vec<ScoreEvolutionRow>,
}

impl SearchStatistics {
    pub fn add_best_score(&mut self, row: ScoreEvolutionRow) {
        self.score_evolution.push(row);
    }

    pub fn add_moves(&mut self, moves_by_kind: &BTreeMap<MoveKind, usize>) {
        for (&kind, &count) in moves_by_kind {
            *self.moves_by_kind.entry(kind).or_insert(0) += count;
            self.moves_applied += count;
        }
    }

    pub fn best_score(&self) -> Option<Score> {
        self.score_evolution.last().map(|row| row.score)
    }
}
