use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{
    problem::{node::NodeIdx, vehicle_routing_problem::VehicleRoutingProblem},
    solver::{
        accepted_solution::AcceptedSolution,
        construction::construct_solution::construct_solution,
        evaluation::evaluator::SolutionEvaluator,
        insertion::insert_unassigned,
        ls::local_search::LocalSearch,
        penalties::ArcPenalties,
        score::Score,
        solution::working_solution::WorkingSolution,
        solver_config::SolverConfig,
        statistics::{ScoreEvolutionRow, SearchStatistics},
        stop_signal::StopSignal,
    },
};

/// Scale of the penalty weight relative to the average arc cost of the first
/// local optimum.
const PENALTY_FACTOR: f64 = 0.1;

pub type BestSolutionHandler = Arc<Mutex<dyn FnMut(&AcceptedSolution) + Send + Sync + 'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Construct,
    Improve,
    Penalize,
    Done,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Patience ran out or there was nothing left to penalize.
    Converged,
    IterationLimit,
    TimeLimit,
    Stopped,
}

#[derive(Debug)]
pub struct SearchOutcome {
    pub best: AcceptedSolution,
    pub initial_score: Score,
    pub termination: TerminationReason,
    pub statistics: SearchStatistics,
}

struct SearchState {
    phase: SearchPhase,
    started_at: Timestamp,
    iteration: usize,
    iterations_without_improvement: usize,
    current: WorkingSolution,
    best: AcceptedSolution,
    penalties: ArcPenalties,
    rng: SmallRng,
    statistics: SearchStatistics,
}

impl SearchState {
    fn elapsed(&self) -> SignedDuration {
        Timestamp::now().duration_since(self.started_at)
    }
}

/// Guided local search.
///
/// Runs local search to a local optimum, then penalizes the arc of that
/// optimum with the highest `cost / (1 + penalty)` utility so the next descent
/// on augmented costs is pushed away from it. The best solution is judged on
/// true costs only.
pub struct GuidedLocalSearch {
    problem: Arc<VehicleRoutingProblem>,
    config: SolverConfig,
    local_search: LocalSearch,
    stop_signal: StopSignal,
    on_best_solution_handler: Option<BestSolutionHandler>,
}

impl GuidedLocalSearch {
    pub fn new(
        problem: Arc<VehicleRoutingProblem>,
        config: SolverConfig,
        stop_signal: StopSignal,
    ) -> Self {
        let local_search = LocalSearch::new(&config.enabled_moves, config.acceptance, config.threads);

        GuidedLocalSearch {
            problem,
            config,
            local_search,
            stop_signal,
            on_best_solution_handler: None,
        }
    }

    pub fn on_best_solution(&mut self, handler: BestSolutionHandler) {
        self.on_best_solution_handler = Some(handler);
    }

    #[instrument(skip_all, level = "debug")]
    pub fn run(&self) -> SearchOutcome {
        let mut state = self.construct();
        let initial_score = state.best.score;

        let termination = loop {
            if let Some(reason) = self.check_termination(&state) {
                break reason;
            }

            state.phase = SearchPhase::Improve;
            self.improve(&mut state);

            if let Some(reason) = self.check_termination(&state) {
                break reason;
            }

            state.phase = SearchPhase::Penalize;
            if !self.penalize(&mut state) {
                break TerminationReason::Converged;
            }
        };

        state.phase = SearchPhase::Done;
        state.statistics.elapsed = state.elapsed();

        info!(
            phase = ?state.phase,
            ?termination,
            iterations = state.iteration,
            score = ?state.best.score,
            elapsed = ?state.statistics.elapsed,
            "search finished"
        );

        SearchOutcome {
            best: state.best,
            initial_score,
            termination,
            statistics: state.statistics,
        }
    }

    fn construct(&self) -> SearchState {
        let started_at = Timestamp::now();
        let solution = construct_solution(&self.problem, self.config.first_solution_strategy);
        let evaluation = SolutionEvaluator::new(&self.problem).evaluate_working(&solution);

        let mut state = SearchState {
            phase: SearchPhase::Construct,
            started_at,
            iteration: 0,
            iterations_without_improvement: 0,
            current: solution.clone(),
            best: AcceptedSolution::new(solution, evaluation),
            penalties: ArcPenalties::default(),
            rng: SmallRng::seed_from_u64(self.config.random_seed),
            statistics: SearchStatistics::default(),
        };

        self.record_best(&mut state);

        state
    }

    fn improve(&self, state: &mut SearchState) {
        state.iteration += 1;

        state.statistics.inserted_nodes += insert_unassigned(&mut state.current);

        let started_at = state.started_at;
        let outcome = self
            .local_search
            .run(&mut state.current, &state.penalties, || {
                self.is_out_of_time(started_at)
            });

        state.statistics.iterations = state.iteration;
        state.statistics.add_moves(&outcome.moves_by_kind);

        let evaluation = SolutionEvaluator::new(&self.problem).evaluate_working(&state.current);
        let score = evaluation.score();

        if score < state.best.score {
            debug!(
                iteration = state.iteration,
                ?score,
                previous = ?state.best.score,
                "new best solution"
            );

            state.best = AcceptedSolution::new(state.current.clone(), evaluation);
            state.iterations_without_improvement = 0;
            self.record_best(state);
        } else {
            state.iterations_without_improvement += 1;
        }
    }

    /// Penalizes one arc of the current local optimum. Returns false when
    /// the solution has no arc left to penalize.
    fn penalize(&self, state: &mut SearchState) -> bool {
        let arcs: Vec<(NodeIdx, NodeIdx)> = state
            .current
            .routes()
            .iter()
            .flat_map(|route| route.arcs(&self.problem))
            .collect();

        if arcs.is_empty() {
            return false;
        }

        if state.penalties.lambda() == 0.0 {
            let lambda = PENALTY_FACTOR * state.current.total_cost() / arcs.len() as f64;
            debug!(lambda, "penalty weight set");
            state.penalties.set_lambda(lambda);
        }

        let utility = |&(from, to): &(NodeIdx, NodeIdx)| {
            self.problem.travel_cost(from, to) / (1.0 + f64::from(state.penalties.penalty(from, to)))
        };

        let max_utility = arcs
            .iter()
            .map(utility)
            .max_by(|a, b| a.total_cmp(b))
            .unwrap_or(0.0);

        let candidates: Vec<(NodeIdx, NodeIdx)> = arcs
            .iter()
            .copied()
            .filter(|arc| utility(arc) == max_utility)
            .collect();

        let (from, to) = match candidates.len() {
            0 => return false,
            1 => candidates[0],
            len => candidates[state.rng.random_range(0..len)],
        };

        state.penalties.increment(from, to);
        state.statistics.penalized_arcs += 1;

        true
    }

    fn check_termination(&self, state: &SearchState) -> Option<TerminationReason> {
        if self.stop_signal.is_stopped() {
            return Some(TerminationReason::Stopped);
        }

        if self.is_out_of_time(state.started_at) {
            return Some(TerminationReason::TimeLimit);
        }

        if let Some(max_iterations) = self.config.max_iterations
            && state.iteration >= max_iterations
        {
            return Some(TerminationReason::IterationLimit);
        }

        if state.iterations_without_improvement > self.config.patience {
            return Some(TerminationReason::Converged);
        }

        None
    }

    fn is_out_of_time(&self, started_at: Timestamp) -> bool {
        self.stop_signal.is_stopped()
            || self
                .config
                .time_limit
                .is_some_and(|limit| Timestamp::now().duration_since(started_at) >= limit)
    }

    fn record_best(&self, state: &mut SearchState) {
        let elapsed = state.elapsed();
        state.statistics.add_best_score(ScoreEvolutionRow {
            iteration: state.iteration,
            score: state.best.score,
            elapsed,
        });

        if let Some(handler) = &self.on_best_solution_handler {
            handler.lock()(&state.best);
        }
    }
}
