use std::{iter, ops::ControlFlow};

use smallvec::{SmallVec, smallvec};

use crate::{
    problem::{node::NodeIdx, vehicle_routing_problem::VehicleRoutingProblem},
    solver::{
        ls::r#move::{LocalSearchOperator, UpdatedRoutes},
        penalties::ArcCosts,
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

pub const MAX_SEGMENT_LENGTH: usize = 3;

/// **Or-Opt**
///
/// Moves a segment of `segment_length` consecutive stops starting at `from`
/// so that it is visited right before the stop at position `to` of the target
/// route. `to` is expressed in the target route's positions before the move,
/// `to == len` meaning "before the end node".
///
/// ```text
/// BEFORE:
///    (prev) --x--> [first .. last] --x--> (next)     (a) --x--> (b)
///
/// AFTER:
///    (prev) -----> (next)     (a) -----> [first .. last] -----> (b)
///
/// Edges Removed: (prev->first), (last->next), (a->b)
/// Edges Added:   (prev->next),  (a->first),   (last->b)
/// ```
///
/// A source route left empty loses its whole cost, and an empty target
/// route has no `(a->b)` arc to break.
#[derive(Debug, Clone)]
pub struct OrOptOperator {
    from_route: RouteIdx,
    from: usize,
    segment_length: usize,
    to_route: RouteIdx,
    to: usize,
}

impl OrOptOperator {
    pub fn new(
        from_route: RouteIdx,
        from: usize,
        segment_length: usize,
        to_route: RouteIdx,
        to: usize,
    ) -> Self {
        debug_assert!((1..=MAX_SEGMENT_LENGTH).contains(&segment_length));
        debug_assert!(
            from_route != to_route || to < from || to > from + segment_length,
            "OrOpt: insertion point inside the moved segment"
        );

        OrOptOperator {
            from_route,
            from,
            segment_length,
            to_route,
            to,
        }
    }

    fn segment_end(&self) -> usize {
        self.from + self.segment_length
    }

    fn is_intra_route(&self) -> bool {
        self.from_route == self.to_route
    }

    fn segment<'a>(&self, solution: &'a WorkingSolution) -> &'a [NodeIdx] {
        &solution.route(self.from_route).nodes()[self.from..self.segment_end()]
    }

    fn removal_delta(&self, solution: &WorkingSolution, costs: &ArcCosts) -> f64 {
        let problem = solution.problem();
        let route = solution.route(self.from_route);
        let segment = self.segment(solution);

        let prev = route.previous_node(problem, self.from);
        let next = route.node_or_end(problem, self.segment_end());
        let (first, last) = (segment[0], segment[segment.len() - 1]);

        let removed = costs.cost(prev, first) + costs.cost(last, next);

        if self.segment_length == route.len() {
            -removed
        } else {
            costs.cost(prev, next) - removed
        }
    }

    fn insertion_delta(&self, solution: &WorkingSolution, costs: &ArcCosts) -> f64 {
        let problem = solution.problem();
        let route = solution.route(self.to_route);
        let segment = self.segment(solution);

        let a = route.previous_node(problem, self.to);
        let b = route.node_or_end(problem, self.to);
        let (first, last) = (segment[0], segment[segment.len() - 1]);

        let added = costs.cost(a, first) + costs.cost(last, b);

        if route.is_empty() {
            added
        } else {
            added - costs.cost(a, b)
        }
    }
}

impl LocalSearchOperator for OrOptOperator {
    fn generate_moves<C>(
        _problem: &VehicleRoutingProblem,
        solution: &WorkingSolution,
        (r1, r2): (RouteIdx, RouteIdx),
        mut consumer: C,
    ) -> ControlFlow<()>
    where
        C: FnMut(Self) -> ControlFlow<()>,
    {
        let source_len = solution.route(r1).len();
        let target_len = solution.route(r2).len();

        for segment_length in 1..=MAX_SEGMENT_LENGTH.min(source_len) {
            for from in 0..=source_len - segment_length {
                for to in 0..=target_len {
                    if r1 == r2 && (from..=from + segment_length).contains(&to) {
                        continue;
                    }

                    consumer(OrOptOperator::new(r1, from, segment_length, r2, to))?;
                }
            }
        }

        ControlFlow::Continue(())
    }

    fn delta(&self, solution: &WorkingSolution, costs: &ArcCosts) -> f64 {
        self.removal_delta(solution, costs) + self.insertion_delta(solution, costs)
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        let problem = solution.problem();
        let segment = self.segment(solution).iter().copied();

        if self.is_intra_route() {
            let route = solution.route(self.from_route);
            let nodes = route.nodes();

            return if self.to < self.from {
                let shifted = nodes[self.to..self.from].iter().copied();
                route.is_valid_change(problem, segment.chain(shifted), self.to, self.segment_end())
            } else {
                let shifted = nodes[self.segment_end()..self.to].iter().copied();
                route.is_valid_change(problem, shifted.chain(segment), self.from, self.to)
            };
        }

        solution.route(self.from_route).is_valid_change(
            problem,
            iter::empty(),
            self.from,
            self.segment_end(),
        ) && solution
            .route(self.to_route)
            .is_valid_change(problem, segment, self.to, self.to)
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut WorkingSolution) {
        if self.is_intra_route() {
            let nodes = solution.route(self.from_route).nodes();
            let (start, end, reordered): (usize, usize, SmallVec<[NodeIdx; 8]>) =
                if self.to < self.from {
                    let segment = &nodes[self.from..self.segment_end()];
                    let shifted = &nodes[self.to..self.from];
                    (
                        self.to,
                        self.segment_end(),
                        segment.iter().chain(shifted).copied().collect(),
                    )
                } else {
                    let segment = &nodes[self.from..self.segment_end()];
                    let shifted = &nodes[self.segment_end()..self.to];
                    (
                        self.from,
                        self.to,
                        shifted.iter().chain(segment).copied().collect(),
                    )
                };

            solution
                .route_mut(self.from_route)
                .replace_segment(problem, start, end, reordered);
            return;
        }

        let removed = solution.route_mut(self.from_route).replace_segment(
            problem,
            self.from,
            self.segment_end(),
            iter::empty(),
        );

        solution
            .route_mut(self.to_route)
            .replace_segment(problem, self.to, self.to, removed);
    }

    fn updated_routes(&self) -> UpdatedRoutes {
        if self.is_intra_route() {
            smallvec![self.from_route]
        } else {
            smallvec![self.from_route, self.to_route]
        }
    }
}
