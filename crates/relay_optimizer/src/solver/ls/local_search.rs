use std::{
    collections::{BTreeMap, BTreeSet},
    ops::ControlFlow,
    sync::Arc,
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, instrument, trace, warn};

use crate::{
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{
        ls::{
            exchange::ExchangeOperator,
            or_opt::OrOptOperator,
            r#move::{LocalSearchMove, LocalSearchOperator, MoveKind},
            two_opt::TwoOptOperator,
        },
        penalties::{ArcCosts, ArcPenalties},
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
        solver_config::{AcceptancePolicy, Threads},
    },
};

/// Minimum improvement for a move to be applied.
const EPSILON: f64 = 1e-6;

type RoutePair = (RouteIdx, RouteIdx);

#[derive(Debug, Clone)]
struct Candidate {
    delta: f64,
    r#move: LocalSearchMove,
}

/// Scan result per route pair. `None` means the pair was not scanned since
/// one of its routes last changed.
type PairCache = Vec<Option<Option<Candidate>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalSearchOutcome {
    pub moves_applied: usize,
    pub moves_by_kind: BTreeMap<MoveKind, usize>,

    /// False when the search was stopped before reaching a local optimum.
    pub converged: bool,
}

/// Descends to a local optimum by applying one improving move per round.
///
/// Every ordered route pair is scanned in row-major order, and for each pair
/// the operators are tried in the order 2-opt, Or-opt, Exchange. Scan
/// results are cached per pair and only recomputed once a move touches one
/// of the pair's routes, so the thread pool only ever sees the stale pairs
/// and the committed move is the same with or without it.
pub struct LocalSearch {
    enabled_moves: BTreeSet<MoveKind>,
    acceptance: AcceptancePolicy,
    thread_pool: Option<rayon::ThreadPool>,
}

impl LocalSearch {
    pub fn new(
        enabled_moves: &BTreeSet<MoveKind>,
        acceptance: AcceptancePolicy,
        threads: Threads,
    ) -> Self {
        let num_threads = threads.number_of_threads();
        let thread_pool = if num_threads > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()
            {
                Ok(pool) => Some(pool),
                Err(error) => {
                    warn!(%error, "could not create the search thread pool, scanning sequentially");
                    None
                }
            }
        } else {
            None
        };

        LocalSearch {
            enabled_moves: enabled_moves.clone(),
            acceptance,
            thread_pool,
        }
    }

    /// Applies improving moves until none is left or `should_stop` returns
    /// true. The stop condition is polled between rounds only.
    #[instrument(skip_all, level = "debug")]
    pub fn run(
        &self,
        solution: &mut WorkingSolution,
        penalties: &ArcPenalties,
        should_stop: impl Fn() -> bool,
    ) -> LocalSearchOutcome {
        let problem = Arc::clone(solution.problem());
        let costs = ArcCosts::with_penalties(&problem, penalties);

        let pairs: Vec<RoutePair> = RouteIdx::range(solution.num_routes())
            .flat_map(|r1| RouteIdx::range(solution.num_routes()).map(move |r2| (r1, r2)))
            .collect();
        let mut cache: PairCache = vec![None; pairs.len()];

        let mut outcome = LocalSearchOutcome::default();

        loop {
            if should_stop() {
                debug!(moves_applied = outcome.moves_applied, "local search stopped");
                return outcome;
            }

            let Some(index) = self.select_pair(&problem, solution, &costs, &pairs, &mut cache)
            else {
                break;
            };

            let Some(Some(candidate)) = cache[index].take() else {
                break;
            };

            trace!(
                operator = candidate.r#move.operator_name(),
                delta = candidate.delta,
                "applying move"
            );
            candidate.r#move.apply(&problem, solution);
            solution.debug_assert_consistent();

            outcome.moves_applied += 1;
            *outcome
                .moves_by_kind
                .entry(candidate.r#move.kind())
                .or_insert(0) += 1;

            let updated_routes = candidate.r#move.updated_routes();
            for (entry, (r1, r2)) in cache.iter_mut().zip(&pairs) {
                if updated_routes.contains(r1) || updated_routes.contains(r2) {
                    *entry = None;
                }
            }
        }

        debug!(moves_applied = outcome.moves_applied, "local optimum reached");

        outcome.converged = true;
        outcome
    }

    /// Index of the pair holding the move to apply this round.
    fn select_pair(
        &self,
        problem: &VehicleRoutingProblem,
        solution: &WorkingSolution,
        costs: &ArcCosts,
        pairs: &[RoutePair],
        cache: &mut PairCache,
    ) -> Option<usize> {
        if let Some(pool) = &self.thread_pool {
            let stale: Vec<usize> = (0..pairs.len()).filter(|&i| cache[i].is_none()).collect();

            let results: Vec<(usize, Option<Candidate>)> = pool.install(|| {
                stale
                    .par_iter()
                    .map(|&i| (i, self.scan_pair(problem, solution, costs, pairs[i])))
                    .collect()
            });

            for (i, result) in results {
                cache[i] = Some(result);
            }
        } else if self.acceptance == AcceptancePolicy::FirstImprovement {
            for (i, &pair) in pairs.iter().enumerate() {
                let result = cache[i]
                    .get_or_insert_with(|| self.scan_pair(problem, solution, costs, pair));
                if result.is_some() {
                    return Some(i);
                }
            }

            return None;
        } else {
            for (entry, &pair) in cache.iter_mut().zip(pairs) {
                if entry.is_none() {
                    *entry = Some(self.scan_pair(problem, solution, costs, pair));
                }
            }
        }

        self.pick(cache)
    }

    fn pick(&self, cache: &PairCache) -> Option<usize> {
        let candidates = cache
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.as_ref()?.as_ref().map(|c| (i, c.delta)));

        match self.acceptance {
            AcceptancePolicy::FirstImprovement => candidates.map(|(i, _)| i).next(),
            AcceptancePolicy::BestImprovement => candidates
                .fold(None, |best: Option<(usize, f64)>, (i, delta)| match best {
                    Some((_, best_delta)) if best_delta <= delta => best,
                    _ => Some((i, delta)),
                })
                .map(|(i, _)| i),
        }
    }

    fn scan_pair(
        &self,
        problem: &VehicleRoutingProblem,
        solution: &WorkingSolution,
        costs: &ArcCosts,
        pair: RoutePair,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;

        if self.enabled_moves.contains(&MoveKind::TwoOpt)
            && self
                .scan_operator::<TwoOptOperator>(
                    problem,
                    solution,
                    costs,
                    pair,
                    &mut best,
                    LocalSearchMove::TwoOpt,
                )
                .is_break()
        {
            return best;
        }

        if self.enabled_moves.contains(&MoveKind::OrOpt)
            && self
                .scan_operator::<OrOptOperator>(
                    problem,
                    solution,
                    costs,
                    pair,
                    &mut best,
                    LocalSearchMove::OrOpt,
                )
                .is_break()
        {
            return best;
        }

        if self.enabled_moves.contains(&MoveKind::Exchange) {
            let _ = self.scan_operator::<ExchangeOperator>(
                problem,
                solution,
                costs,
                pair,
                &mut best,
                LocalSearchMove::Exchange,
            );
        }

        best
    }

    /// Keeps the best valid improving move of one operator in `best`. Breaks
    /// on the first one under first-improvement.
    fn scan_operator<O: LocalSearchOperator>(
        &self,
        problem: &VehicleRoutingProblem,
        solution: &WorkingSolution,
        costs: &ArcCosts,
        pair: RoutePair,
        best: &mut Option<Candidate>,
        wrap: fn(O) -> LocalSearchMove,
    ) -> ControlFlow<()> {
        O::generate_moves(problem, solution, pair, |op| {
            let threshold = best.as_ref().map_or(-EPSILON, |candidate| candidate.delta);
            let delta = op.delta(solution, costs);

            if delta < threshold && op.is_valid(solution) {
                *best = Some(Candidate {
                    delta,
                    r#move: wrap(op),
                });

                if self.acceptance == AcceptancePolicy::FirstImprovement {
                    return ControlFlow::Break(());
                }
            }

            ControlFlow::Continue(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::test_utils::{
        TestRoute, create_basic_vehicles, create_capacitated_vehicles, create_euclidean_matrix,
        create_line_matrix, create_location_grid, create_test_problem,
        create_test_problem_with_demands, create_test_working_solution, route_nodes,
        scenario_matrix,
    };

    use super::*;

    fn all_moves() -> BTreeSet<MoveKind> {
        MoveKind::ALL.into_iter().collect()
    }

    #[test]
    fn test_local_search_scenario_reaches_optimum() {
        let problem = Arc::new(create_test_problem(
            scenario_matrix(),
            create_basic_vehicles(1),
        ));
        let mut solution = create_test_working_solution(
            Arc::clone(&problem),
            vec![TestRoute {
                vehicle_id: 0,
                nodes: vec![1, 3, 2],
            }],
        );

        let local_search = LocalSearch::new(
            &all_moves(),
            AcceptancePolicy::FirstImprovement,
            Threads::Single,
        );
        let outcome = local_search.run(&mut solution, &ArcPenalties::default(), || false);

        assert!(outcome.converged);
        assert_eq!(outcome.moves_applied, 1);
        assert_eq!(outcome.moves_by_kind.get(&MoveKind::TwoOpt), Some(&1));
        assert_eq!(route_nodes(&solution, 0), vec![2, 3, 1]);
        assert_eq!(solution.total_cost(), 21.0);
    }

    #[test]
    fn test_local_search_only_uses_enabled_moves() {
        let problem = Arc::new(create_test_problem(
            create_line_matrix(5),
            create_basic_vehicles(2),
        ));
        let mut solution = create_test_working_solution(
            Arc::clone(&problem),
            vec![
                TestRoute {
                    vehicle_id: 0,
                    nodes: vec![1, 4],
                },
                TestRoute {
                    vehicle_id: 1,
                    nodes: vec![2, 3],
                },
            ],
        );

        // 2-opt alone cannot move nodes between routes
        let local_search = LocalSearch::new(
            &BTreeSet::from([MoveKind::TwoOpt]),
            AcceptancePolicy::FirstImprovement,
            Threads::Single,
        );
        let outcome = local_search.run(&mut solution, &ArcPenalties::default(), || false);

        assert!(outcome.converged);
        assert_eq!(outcome.moves_applied, 0);
        assert_eq!(route_nodes(&solution, 0), vec![1, 4]);
    }

    #[test]
    fn test_local_search_never_breaks_capacity() {
        let problem = Arc::new(create_test_problem_with_demands(
            create_line_matrix(6),
            create_capacitated_vehicles(vec![3.0, 3.0]),
            vec![0.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        ));
        let mut solution = create_test_working_solution(
            Arc::clone(&problem),
            vec![
                TestRoute {
                    vehicle_id: 0,
                    nodes: vec![1, 5, 3],
                },
                TestRoute {
                    vehicle_id: 1,
                    nodes: vec![4, 2],
                },
            ],
        );
        let before = solution.total_cost();

        let local_search = LocalSearch::new(
            &all_moves(),
            AcceptancePolicy::BestImprovement,
            Threads::Single,
        );
        local_search.run(&mut solution, &ArcPenalties::default(), || false);

        assert!(solution.total_cost() < before);
        for route in solution.routes() {
            assert!(route.total_load() <= 3.0);
        }
        assert!(!solution.has_unassigned());
    }

    #[test]
    fn test_local_search_stop_is_honoured() {
        let problem = Arc::new(create_test_problem(
            scenario_matrix(),
            create_basic_vehicles(1),
        ));
        let mut solution = create_test_working_solution(
            Arc::clone(&problem),
            vec![TestRoute {
                vehicle_id: 0,
                nodes: vec![1, 3, 2],
            }],
        );

        let local_search = LocalSearch::new(
            &all_moves(),
            AcceptancePolicy::FirstImprovement,
            Threads::Single,
        );
        let outcome = local_search.run(&mut solution, &ArcPenalties::default(), || true);

        assert!(!outcome.converged);
        assert_eq!(outcome.moves_applied, 0);
        assert_eq!(solution.total_cost(), 33.0);
    }

    #[test]
    fn test_parallel_scan_matches_sequential_scan() {
        let locations = create_location_grid(4, 4);
        let problem = Arc::new(create_test_problem(
            create_euclidean_matrix(&locations),
            create_basic_vehicles(3),
        ));
        let initial = create_test_working_solution(
            Arc::clone(&problem),
            vec![
                TestRoute {
                    vehicle_id: 0,
                    nodes: vec![15, 1, 9, 4, 12],
                },
                TestRoute {
                    vehicle_id: 1,
                    nodes: vec![2, 14, 7, 10, 5],
                },
                TestRoute {
                    vehicle_id: 2,
                    nodes: vec![3, 11, 6, 13, 8],
                },
            ],
        );

        for acceptance in [
            AcceptancePolicy::FirstImprovement,
            AcceptancePolicy::BestImprovement,
        ] {
            let mut sequential = initial.clone();
            LocalSearch::new(&all_moves(), acceptance, Threads::Single).run(
                &mut sequential,
                &ArcPenalties::default(),
                || false,
            );

            let mut parallel = initial.clone();
            LocalSearch::new(&all_moves(), acceptance, Threads::Multi(4)).run(
                &mut parallel,
                &ArcPenalties::default(),
                || false,
            );

            assert!(sequential.is_identical(&parallel));
            assert!(sequential.total_cost() < initial.total_cost());
        }
    }

    #[test]
    fn test_penalties_steer_the_search() {
        let problem = Arc::new(create_test_problem(
            create_line_matrix(4),
            create_basic_vehicles(1),
        ));
        let mut solution = create_test_working_solution(
            Arc::clone(&problem),
            vec![TestRoute {
                vehicle_id: 0,
                nodes: vec![1, 2, 3],
            }],
        );

        let mut penalties = ArcPenalties::default();
        penalties.increment(problem.depot(), 1usize.into());
        penalties.set_lambda(10.0);

        let local_search = LocalSearch::new(
            &all_moves(),
            AcceptancePolicy::FirstImprovement,
            Threads::Single,
        );
        local_search.run(&mut solution, &penalties, || false);

        // Same true cost, without the penalized arc
        assert_eq!(route_nodes(&solution, 0), vec![2, 3, 1]);
        assert_eq!(solution.total_cost(), 6.0);
    }
}
