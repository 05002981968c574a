use std::sync::Arc;

use fixedbitset::FixedBitSet;

use crate::{
    problem::{
        node::NodeIdx, travel_cost_matrix::Cost, vehicle::VehicleIdx,
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solver::solution::{
        route::WorkingSolutionRoute, route_id::RouteIdx, routing_solution::SolutionRoute,
    },
};

/// Mutable candidate solution used by every search phase.
///
/// Holds one route per vehicle and tracks which required nodes are already
/// visited, so unassigned nodes never need a full scan of the routes.
#[derive(Clone, Debug)]
pub struct WorkingSolution {
    problem: Arc<VehicleRoutingProblem>,
    routes: Vec<WorkingSolutionRoute>,
    assigned: FixedBitSet,
}

impl WorkingSolution {
    pub fn new(problem: Arc<VehicleRoutingProblem>) -> Self {
        let routes = VehicleIdx::range(problem.num_vehicles())
            .map(|vehicle_id| WorkingSolutionRoute::empty(&problem, vehicle_id))
            .collect();
        let assigned = FixedBitSet::with_capacity(problem.num_nodes());

        WorkingSolution {
            problem,
            routes,
            assigned,
        }
    }

    pub fn problem(&self) -> &Arc<VehicleRoutingProblem> {
        &self.problem
    }

    pub fn routes(&self) -> &[WorkingSolutionRoute] {
        &self.routes
    }

    pub fn route(&self, route_id: RouteIdx) -> &WorkingSolutionRoute {
        &self.routes[route_id]
    }

    /// Direct access for moves that only reorder assigned nodes.
    pub(crate) fn route_mut(&mut self, route_id: RouteIdx) -> &mut WorkingSolutionRoute {
        &mut self.routes[route_id]
    }

    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    pub fn non_empty_routes_iter(&self) -> impl Iterator<Item = &WorkingSolutionRoute> {
        self.routes.iter().filter(|route| !route.is_empty())
    }

    pub fn non_empty_routes_count(&self) -> usize {
        self.non_empty_routes_iter().count()
    }

    pub fn is_assigned(&self, node: NodeIdx) -> bool {
        self.assigned.contains(node.get())
    }

    /// Required nodes not visited by any route, in ascending order.
    pub fn unassigned_nodes(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.problem
            .required_nodes()
            .iter()
            .copied()
            .filter(|&node| !self.is_assigned(node))
    }

    pub fn has_unassigned(&self) -> bool {
        self.unassigned_nodes().next().is_some()
    }

    pub fn total_cost(&self) -> Cost {
        self.routes.iter().map(|route| route.cost()).sum()
    }

    pub fn insert_node(&mut self, route_id: RouteIdx, position: usize, node: NodeIdx) {
        debug_assert!(!self.is_assigned(node), "node {node} is already assigned");

        self.assigned.insert(node.get());
        self.routes[route_id].insert(&self.problem, position, node);
    }

    pub fn append_node(&mut self, route_id: RouteIdx, node: NodeIdx) {
        let position = self.routes[route_id].len();
        self.insert_node(route_id, position, node);
    }

    /// Replaces the stops of an unused route.
    pub fn assign_route(&mut self, route_id: RouteIdx, nodes: &[NodeIdx]) {
        debug_assert!(self.routes[route_id].is_empty());

        for &node in nodes {
            debug_assert!(!self.is_assigned(node), "node {node} is already assigned");
            self.assigned.insert(node.get());
        }

        self.routes[route_id].replace_segment(&self.problem, 0, 0, nodes.iter().copied());
    }

    /// Empties every route.
    pub fn reset(&mut self) {
        self.assigned.clear();
        for route in &mut self.routes {
            route.clear(&self.problem);
        }
    }

    /// Two solutions are identical when every route visits the same stops in
    /// the same order.
    pub fn is_identical(&self, other: &WorkingSolution) -> bool {
        self.routes.len() == other.routes.len()
            && self
                .routes
                .iter()
                .zip(&other.routes)
                .all(|(route, other_route)| {
                    route.vehicle_id == other_route.vehicle_id && route.nodes == other_route.nodes
                })
    }

    /// Routes with their start and end nodes, as exposed in a [`Solution`](super::routing_solution::Solution).
    pub fn to_routes(&self) -> Vec<SolutionRoute> {
        self.routes
            .iter()
            .map(|route| {
                let vehicle = route.vehicle(&self.problem);
                let nodes = if route.is_empty() {
                    Vec::new()
                } else {
                    let mut nodes = Vec::with_capacity(route.len() + 2);
                    nodes.push(vehicle.start_node());
                    nodes.extend_from_slice(route.nodes());
                    nodes.push(vehicle.end_node());
                    nodes
                };

                SolutionRoute {
                    vehicle: route.vehicle_id(),
                    nodes,
                    cost: route.cost(),
                    load: route.total_load(),
                }
            })
            .collect()
    }

    /// Panics in debug builds when a node is visited twice or a visited node
    /// is missing from the assignment set.
    pub(crate) fn debug_assert_consistent(&self) {
        if cfg!(debug_assertions) {
            let mut seen = FixedBitSet::with_capacity(self.problem.num_nodes());
            for node in self.routes.iter().flat_map(|route| route.nodes()) {
                assert!(!seen.put(node.get()), "node {node} visited twice");
            }
            assert_eq!(seen, self.assigned, "assignment set out of sync");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::test_utils::{
        TestRoute, create_basic_vehicles, create_line_matrix, create_test_problem,
        create_test_working_solution,
    };

    use super::*;

    #[test]
    fn test_new_solution_is_empty() {
        let problem = Arc::new(create_test_problem(
            create_line_matrix(5),
            create_basic_vehicles(2),
        ));
        let solution = WorkingSolution::new(problem);

        assert_eq!(solution.num_routes(), 2);
        assert_eq!(solution.non_empty_routes_count(), 0);
        assert_eq!(solution.total_cost(), 0.0);
        assert_eq!(
            solution.unassigned_nodes().collect::<Vec<_>>(),
            vec![
                NodeIdx::new(1),
                NodeIdx::new(2),
                NodeIdx::new(3),
                NodeIdx::new(4)
            ]
        );
    }

    #[test]
    fn test_insert_tracks_assignment() {
        let problem = Arc::new(create_test_problem(
            create_line_matrix(5),
            create_basic_vehicles(2),
        ));
        let solution = create_test_working_solution(
            problem,
            vec![
                TestRoute {
                    vehicle_id: 0,
                    nodes: vec![1, 2],
                },
                TestRoute {
                    vehicle_id: 1,
                    nodes: vec![4],
                },
            ],
        );

        assert!(solution.is_assigned(NodeIdx::new(2)));
        assert_eq!(
            solution.unassigned_nodes().collect::<Vec<_>>(),
            vec![NodeIdx::new(3)]
        );
        assert!(solution.has_unassigned());
        assert_eq!(solution.total_cost(), 4.0 + 8.0);
        solution.debug_assert_consistent();
    }

    #[test]
    fn test_to_routes() {
        let problem = Arc::new(create_test_problem(
            create_line_matrix(4),
            create_basic_vehicles(2),
        ));
        let solution = create_test_working_solution(
            problem,
            vec![TestRoute {
                vehicle_id: 0,
                nodes: vec![2, 1, 3],
            }],
        );

        let routes = solution.to_routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(
            routes[0].nodes,
            [0, 2, 1, 3, 0].map(NodeIdx::new).to_vec()
        );
        assert_eq!(routes[0].cost, 2.0 + 1.0 + 2.0 + 3.0);
        assert!(routes[1].nodes.is_empty());
        assert_eq!(routes[1].cost, 0.0);
    }

    #[test]
    fn test_is_identical() {
        let problem = Arc::new(create_test_problem(
            create_line_matrix(4),
            create_basic_vehicles(1),
        ));
        let first = create_test_working_solution(
            Arc::clone(&problem),
            vec![TestRoute {
                vehicle_id: 0,
                nodes: vec![1, 2, 3],
            }],
        );
        let mut second = first.clone();
        assert!(first.is_identical(&second));

        second
            .route_mut(RouteIdx::new(0))
            .reverse_segment(&problem, 0, 2);
        assert!(!first.is_identical(&second));
    }

    #[test]
    fn test_reset() {
        let problem = Arc::new(create_test_problem(
            create_line_matrix(4),
            create_basic_vehicles(1),
        ));
        let mut solution = create_test_working_solution(
            problem,
            vec![TestRoute {
                vehicle_id: 0,
                nodes: vec![1, 2],
            }],
        );

        solution.reset();
        assert_eq!(solution.non_empty_routes_count(), 0);
        assert_eq!(solution.unassigned_nodes().count(), 3);
    }
}
