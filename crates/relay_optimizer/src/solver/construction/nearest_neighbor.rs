use std::sync::Arc;

use crate::{
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

use super::construct_solution::cheapest_feasible_extension;

/// Grows all routes in turns. A route that has no feasible candidate left is
/// closed for the rest of the construction.
pub fn nearest_neighbor(problem: &Arc<VehicleRoutingProblem>) -> WorkingSolution {
    let mut solution = WorkingSolution::new(Arc::clone(problem));
    let mut open_routes: Vec<RouteIdx> = RouteIdx::range(solution.num_routes()).collect();

    while !open_routes.is_empty() {
        open_routes.retain(
            |&route_id| match cheapest_feasible_extension(&solution, route_id) {
                Some(node) => {
                    solution.append_node(route_id, node);
                    true
                }
                None => false,
            },
        );
    }

    solution
}
