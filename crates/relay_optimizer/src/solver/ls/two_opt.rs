use std::ops::ControlFlow;

use smallvec::smallvec;

use crate::{
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{
        ls::r#move::{LocalSearchOperator, UpdatedRoutes},
        penalties::ArcCosts,
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

/// **Intra-Route 2-Opt**
///
/// Reverses the stops between `from` and `to` (inclusive), which removes a
/// crossing inside a single route.
///
/// ```text
/// BEFORE:
///    ... (prev) --x--> [from] -> ... -> [to] --x--> (next) ...
///          ^             ^               ^            ^
///          A             B               C            D
///
/// AFTER (Sequence Reversed):
///    ... (prev) -----> [to] -> ... -> [from] -----> (next) ...
///          ^             ^               ^            ^
///          A             C               B            D
///
/// Edges Removed: (prev->from), (to->next)
/// Edges Added:   (prev->to),   (from->next)
/// ```
///
/// With asymmetric or penalized costs every arc inside the segment changes
/// direction too, so the delta also covers them.
#[derive(Debug, Clone)]
pub struct TwoOptOperator {
    route_id: RouteIdx,
    from: usize,
    to: usize,
}

impl TwoOptOperator {
    pub fn new(route_id: RouteIdx, from: usize, to: usize) -> Self {
        debug_assert!(from < to, "TwoOpt: cannot have from >= to");

        TwoOptOperator { route_id, from, to }
    }

    fn boundary_delta(&self, solution: &WorkingSolution, costs: &ArcCosts) -> f64 {
        let problem = solution.problem();
        let route = solution.route(self.route_id);

        let prev = route.previous_node(problem, self.from);
        let from = route.node(self.from);
        let to = route.node(self.to);
        let next = route.next_node(problem, self.to);

        costs.cost(prev, to) + costs.cost(from, next) - costs.cost(prev, from) - costs.cost(to, next)
    }

    fn segment_delta(&self, solution: &WorkingSolution, costs: &ArcCosts) -> f64 {
        let segment = &solution.route(self.route_id).nodes()[self.from..=self.to];

        segment
            .windows(2)
            .map(|pair| costs.cost(pair[1], pair[0]) - costs.cost(pair[0], pair[1]))
            .sum()
    }
}

impl LocalSearchOperator for TwoOptOperator {
    fn generate_moves<C>(
        _problem: &VehicleRoutingProblem,
        solution: &WorkingSolution,
        (r1, r2): (RouteIdx, RouteIdx),
        mut consumer: C,
    ) -> ControlFlow<()>
    where
        C: FnMut(Self) -> ControlFlow<()>,
    {
        if r1 != r2 {
            return ControlFlow::Continue(());
        }

        let len = solution.route(r1).len();
        if len < 2 {
            return ControlFlow::Continue(());
        }

        for from in 0..len - 1 {
            for to in from + 1..len {
                consumer(TwoOptOperator::new(r1, from, to))?;
            }
        }

        ControlFlow::Continue(())
    }

    fn delta(&self, solution: &WorkingSolution, costs: &ArcCosts) -> f64 {
        let delta = self.boundary_delta(solution, costs);

        if costs.is_symmetric() {
            delta
        } else {
            delta + self.segment_delta(solution, costs)
        }
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        let route = solution.route(self.route_id);
        let reversed = route.nodes()[self.from..=self.to].iter().rev().copied();

        route.is_valid_change(solution.problem(), reversed, self.from, self.to + 1)
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut WorkingSolution) {
        solution
            .route_mut(self.route_id)
            .reverse_segment(problem, self.from, self.to);
    }

    fn updated_routes(&self) -> UpdatedRoutes {
        smallvec![self.route_id]
    }
}
