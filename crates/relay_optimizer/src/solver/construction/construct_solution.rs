use std::{iter, sync::Arc};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    problem::{node::NodeIdx, vehicle_routing_problem::VehicleRoutingProblem},
    solver::solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    timer_debug,
};

use super::{
    cheapest_arc::cheapest_arc, nearest_neighbor::nearest_neighbor, savings::savings,
};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FirstSolutionStrategy {
    /// Fills one vehicle after the other with the cheapest reachable node.
    #[default]
    CheapestArc,
    /// Grows every route together, one node per vehicle and turn.
    NearestNeighbor,
    /// Clarke-Wright savings.
    Savings,
}

/// Builds the initial solution. Never fails: nodes that cannot be placed
/// without breaking a constraint stay unassigned.
#[instrument(skip_all, level = "debug")]
pub fn construct_solution(
    problem: &Arc<VehicleRoutingProblem>,
    strategy: FirstSolutionStrategy,
) -> WorkingSolution {
    let solution = timer_debug!(
        "construction",
        match strategy {
            FirstSolutionStrategy::CheapestArc => cheapest_arc(problem),
            FirstSolutionStrategy::NearestNeighbor => nearest_neighbor(problem),
            FirstSolutionStrategy::Savings => savings(problem),
        }
    );

    solution.debug_assert_consistent();

    debug!(
        ?strategy,
        cost = solution.total_cost(),
        routes = solution.non_empty_routes_count(),
        unassigned = solution.unassigned_nodes().count(),
        "initial solution built"
    );

    solution
}

/// Unassigned node with the cheapest arc from the current end of the route
/// that can be appended without breaking a constraint. Ties go to the lowest
/// node index.
pub(super) fn cheapest_feasible_extension(
    solution: &WorkingSolution,
    route_id: RouteIdx,
) -> Option<NodeIdx> {
    let problem = solution.problem();
    let route = solution.route(route_id);
    let position = route.len();
    let last = route.previous_node(problem, position);

    solution
        .unassigned_nodes()
        .filter(|&node| route.is_valid_change(problem, iter::once(node), position, position))
        .min_by(|&a, &b| {
            problem
                .travel_cost(last, a)
                .total_cmp(&problem.travel_cost(last, b))
        })
}
