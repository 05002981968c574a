use std::{iter, ops::ControlFlow};

use smallvec::smallvec;

use crate::{
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{
        ls::r#move::{LocalSearchOperator, UpdatedRoutes},
        penalties::ArcCosts,
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

/// **Inter-Route Exchange**
///
/// Swaps the stop at `first` in `first_route` with the stop at `second` in
/// `second_route`.
///
/// ```text
/// BEFORE:
///    R1: (p1) -> [A] -> (n1)
///    R2: (p2) -> [B] -> (n2)
///
/// AFTER:
///    R1: (p1) -> [B] -> (n1)
///    R2: (p2) -> [A] -> (n2)
/// ```
#[derive(Debug, Clone)]
pub struct ExchangeOperator {
    first_route: RouteIdx,
    first: usize,
    second_route: RouteIdx,
    second: usize,
}

impl ExchangeOperator {
    pub fn new(first_route: RouteIdx, first: usize, second_route: RouteIdx, second: usize) -> Self {
        debug_assert!(first_route != second_route, "Exchange: routes must differ");

        ExchangeOperator {
            first_route,
            first,
            second_route,
            second,
        }
    }
}

impl LocalSearchOperator for ExchangeOperator {
    fn generate_moves<C>(
        _problem: &VehicleRoutingProblem,
        solution: &WorkingSolution,
        (r1, r2): (RouteIdx, RouteIdx),
        mut consumer: C,
    ) -> ControlFlow<()>
    where
        C: FnMut(Self) -> ControlFlow<()>,
    {
        // Each unordered pair once
        if r1 >= r2 {
            return ControlFlow::Continue(());
        }

        for first in 0..solution.route(r1).len() {
            for second in 0..solution.route(r2).len() {
                consumer(ExchangeOperator::new(r1, first, r2, second))?;
            }
        }

        ControlFlow::Continue(())
    }

    fn delta(&self, solution: &WorkingSolution, costs: &ArcCosts) -> f64 {
        let problem = solution.problem();
        let r1 = solution.route(self.first_route);
        let r2 = solution.route(self.second_route);

        let a = r1.node(self.first);
        let p1 = r1.previous_node(problem, self.first);
        let n1 = r1.next_node(problem, self.first);

        let b = r2.node(self.second);
        let p2 = r2.previous_node(problem, self.second);
        let n2 = r2.next_node(problem, self.second);

        let removed = costs.cost(p1, a) + costs.cost(a, n1) + costs.cost(p2, b) + costs.cost(b, n2);
        let added = costs.cost(p1, b) + costs.cost(b, n1) + costs.cost(p2, a) + costs.cost(a, n2);

        added - removed
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        let problem = solution.problem();
        let r1 = solution.route(self.first_route);
        let r2 = solution.route(self.second_route);

        let a = r1.node(self.first);
        let b = r2.node(self.second);

        r1.is_valid_change(problem, iter::once(b), self.first, self.first + 1)
            && r2.is_valid_change(problem, iter::once(a), self.second, self.second + 1)
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut WorkingSolution) {
        let b = solution.route(self.second_route).node(self.second);

        let removed = solution.route_mut(self.first_route).replace_segment(
            problem,
            self.first,
            self.first + 1,
            iter::once(b),
        );

        solution.route_mut(self.second_route).replace_segment(
            problem,
            self.second,
            self.second + 1,
            removed,
        );
    }

    fn updated_routes(&self) -> UpdatedRoutes {
        smallvec![self.first_route, self.second_route]
    }
}
