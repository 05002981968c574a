use std::sync::Arc;

use crate::{
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

use super::construct_solution::cheapest_feasible_extension;

/// Completes each route in vehicle order before opening the next one.
pub fn cheapest_arc(problem: &Arc<VehicleRoutingProblem>) -> WorkingSolution {
    let mut solution = WorkingSolution::new(Arc::clone(problem));

    for route_id in RouteIdx::range(solution.num_routes()) {
        while let Some(node) = cheapest_feasible_extension(&solution, route_id) {
            solution.append_node(route_id, node);
        }
    }

    solution
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{
        create_basic_vehicles, create_capacitated_vehicles, create_line_matrix,
        create_test_problem, create_test_problem_with_demands, route_nodes, scenario_matrix,
    };

    use super::*;

    #[test]
    fn test_cheapest_arc_scenario() {
        let problem = Arc::new(create_test_problem(
            scenario_matrix(),
            create_basic_vehicles(1),
        ));

        let solution = cheapest_arc(&problem);

        assert_eq!(route_nodes(&solution, 0), vec![1, 3, 2]);
        assert_eq!(solution.total_cost(), 33.0);
        assert!(!solution.has_unassigned());
    }

    #[test]
    fn test_cheapest_arc_fills_vehicles_in_order() {
        let problem = Arc::new(create_test_problem_with_demands(
            create_line_matrix(5),
            create_capacitated_vehicles(vec![2.0, 2.0]),
            vec![0.0, 1.0, 1.0, 1.0, 1.0],
        ));

        let solution = cheapest_arc(&problem);

        assert_eq!(route_nodes(&solution, 0), vec![1, 2]);
        assert_eq!(route_nodes(&solution, 1), vec![3, 4]);
    }

    #[test]
    fn test_cheapest_arc_leaves_oversized_nodes_unassigned() {
        let problem = Arc::new(create_test_problem_with_demands(
            create_line_matrix(4),
            create_capacitated_vehicles(vec![5.0]),
            vec![0.0, 2.0, 9.0, 3.0],
        ));

        let solution = cheapest_arc(&problem);

        assert_eq!(route_nodes(&solution, 0), vec![1, 3]);
        assert_eq!(
            solution.unassigned_nodes().map(|node| node.get()).collect::<Vec<_>>(),
            vec![2]
        );
    }
}
