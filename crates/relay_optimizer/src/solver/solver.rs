use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{
    errors::SolveError,
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{
        accepted_solution::AcceptedSolution,
        evaluation::evaluator::SolutionEvaluator,
        guided_local_search::{
            BestSolutionHandler, GuidedLocalSearch, SearchOutcome, TerminationReason,
        },
        solution::routing_solution::{Solution, SolutionStatus},
        solver_config::SolverConfig,
        stop_signal::StopSignal,
    },
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub enum SolverStatus {
    Pending,
    Running,
    Completed,
}

pub struct Solver {
    problem: Arc<VehicleRoutingProblem>,
    config: SolverConfig,
    stop_signal: StopSignal,
    on_best_solution_handler: Option<BestSolutionHandler>,
    status: RwLock<SolverStatus>,
}

impl Solver {
    pub fn new(problem: impl Into<Arc<VehicleRoutingProblem>>, config: SolverConfig) -> Self {
        Solver {
            problem: problem.into(),
            config,
            stop_signal: StopSignal::new(),
            on_best_solution_handler: None,
            status: RwLock::new(SolverStatus::Pending),
        }
    }

    /// Registers a callback invoked with every new best solution, starting
    /// with the constructed one.
    pub fn on_best_solution<F>(&mut self, callback: F)
    where
        F: FnMut(&AcceptedSolution) + Send + Sync + 'static,
    {
        self.on_best_solution_handler = Some(Arc::new(Mutex::new(callback)));
    }

    /// Handle that stops a running solve from another thread.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop_signal.clone()
    }

    pub fn stop(&self) {
        self.stop_signal.stop();
    }

    pub fn status(&self) -> SolverStatus {
        *self.status.read()
    }

    pub fn problem(&self) -> &Arc<VehicleRoutingProblem> {
        &self.problem
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[instrument(skip_all, level = "debug")]
    pub fn solve(&self) -> Result<Solution, SolveError> {
        self.config.validate()?;

        *self.status.write() = SolverStatus::Running;

        let mut search = GuidedLocalSearch::new(
            Arc::clone(&self.problem),
            self.config.clone(),
            self.stop_signal.clone(),
        );
        if let Some(handler) = &self.on_best_solution_handler {
            search.on_best_solution(Arc::clone(handler));
        }

        let outcome = search.run();

        *self.status.write() = SolverStatus::Completed;

        self.finalize(outcome)
    }

    /// Turns the best candidate into the caller-facing [`Solution`] after
    /// checking it once more from scratch.
    fn finalize(&self, outcome: SearchOutcome) -> Result<Solution, SolveError> {
        let SearchOutcome {
            best,
            initial_score,
            termination,
            statistics,
        } = outcome;

        let mut solution = Solution {
            routes: best.solution.to_routes(),
            total_cost: best.evaluation.total_cost,
            status: SolutionStatus::Infeasible,
            violations: Vec::new(),
            unassigned: best.solution.unassigned_nodes().collect(),
            statistics,
        };

        let evaluation = SolutionEvaluator::new(&self.problem).evaluate(&solution);
        solution.total_cost = evaluation.total_cost;
        solution.violations = evaluation.violations.clone();

        // Every move checks its route, so only unassigned nodes can make the
        // search output infeasible.
        if evaluation.has_structural_violations()
            || evaluation
                .violations
                .iter()
                .any(|violation| violation.vehicle.is_some())
        {
            error!(violations = ?evaluation.violations, "search produced a corrupted solution");
            return Err(SolveError::InvariantViolation {
                violations: evaluation.violations,
            });
        }

        if !evaluation.feasible {
            warn!(
                violations = evaluation.violations.len(),
                unassigned = solution.unassigned.len(),
                "no feasible solution found"
            );
            return Err(SolveError::NoFeasibleSolution {
                best: Box::new(solution),
                violations: evaluation.violations,
            });
        }

        solution.status = match termination {
            TerminationReason::Converged => SolutionStatus::OptimalWithinBudget,
            _ if best.score < initial_score => SolutionStatus::FeasibleImproved,
            _ => SolutionStatus::BudgetExhausted,
        };

        info!(
            status = ?solution.status,
            total_cost = solution.total_cost,
            routes = solution.non_empty_routes().count(),
            "solve completed"
        );

        Ok(solution)
    }
}

/// Solves `problem` with `config` in one call.
pub fn solve(
    problem: impl Into<Arc<VehicleRoutingProblem>>,
    config: SolverConfig,
) -> Result<Solution, SolveError> {
    Solver::new(problem, config).solve()
}
