use std::iter;

use tracing::debug;

use crate::{
    problem::node::NodeIdx,
    solver::solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

#[derive(Clone, Debug, PartialEq)]
pub struct Insertion {
    pub route_id: RouteIdx,
    pub node: NodeIdx,
    pub position: usize,
    pub delta: f64,
}

/// Every (route, position) a stop can be inserted at, in scan order.
pub fn for_each_insertion(solution: &WorkingSolution, mut f: impl FnMut(RouteIdx, usize)) {
    for route_id in RouteIdx::range(solution.num_routes()) {
        for position in 0..=solution.route(route_id).len() {
            f(route_id, position);
        }
    }
}

/// Cost added by visiting `node` right before `position`.
pub fn insertion_delta(
    solution: &WorkingSolution,
    route_id: RouteIdx,
    node: NodeIdx,
    position: usize,
) -> f64 {
    let problem = solution.problem();
    let route = solution.route(route_id);

    let prev = route.previous_node(problem, position);
    let next = route.node_or_end(problem, position);

    let added = problem.travel_cost(prev, node) + problem.travel_cost(node, next);

    if route.is_empty() {
        added
    } else {
        added - problem.travel_cost(prev, next)
    }
}

/// Cheapest feasible insertion of `node`, ties going to the lowest route and
/// position.
pub fn best_insertion(solution: &WorkingSolution, node: NodeIdx) -> Option<Insertion> {
    let problem = solution.problem();
    let mut best: Option<Insertion> = None;

    for_each_insertion(solution, |route_id, position| {
        let delta = insertion_delta(solution, route_id, node, position);
        if !delta.is_finite() || best.as_ref().is_some_and(|best| best.delta <= delta) {
            return;
        }

        if solution
            .route(route_id)
            .is_valid_change(problem, iter::once(node), position, position)
        {
            best = Some(Insertion {
                route_id,
                node,
                position,
                delta,
            });
        }
    });

    best
}

/// Repairs a solution by repeatedly inserting the unassigned node with the
/// cheapest feasible insertion. Returns the number of inserted nodes.
pub fn insert_unassigned(solution: &mut WorkingSolution) -> usize {
    let mut inserted = 0;

    loop {
        let best = solution
            .unassigned_nodes()
            .filter_map(|node| best_insertion(solution, node))
            .fold(None, |best: Option<Insertion>, insertion| match best {
                Some(best) if best.delta <= insertion.delta => Some(best),
                _ => Some(insertion),
            });

        let Some(insertion) = best else {
            break;
        };

        solution.insert_node(insertion.route_id, insertion.position, insertion.node);
        inserted += 1;
    }

    if inserted > 0 {
        solution.debug_assert_consistent();
        debug!(inserted, "unassigned nodes inserted");
    }

    inserted
}
