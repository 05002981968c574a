use super::{
    evaluation::evaluator::Evaluation, score::Score, solution::working_solution::WorkingSolution,
};

/// Candidate kept by the search, with its score on true costs.
#[derive(Clone, Debug)]
pub struct AcceptedSolution {
    pub solution: WorkingSolution,
    pub score: Score,
    pub evaluation: Evaluation,
}

impl AcceptedSolution {
    pub fn new(solution: WorkingSolution, evaluation: Evaluation) -> Self {
        AcceptedSolution {
            solution,
            score: evaluation.score(),
            evaluation,
        }
    }

    pub fn is_feasible(&self) -> bool {
        !self.score.is_infeasible()
    }
}
