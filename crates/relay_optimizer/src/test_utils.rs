use std::sync::Arc;

use crate::{
    problem::{
        node::NodeIdx,
        travel_cost_matrix::TravelMatrices,
        vehicle::VehicleBuilder,
        vehicle_routing_problem::{VehicleRoutingProblem, VehicleRoutingProblemBuilder},
    },
    solver::solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

/// Asymmetric four-node instance whose only vehicle starts at node 0.
pub fn scenario_matrix() -> Vec<Vec<f64>> {
    vec![
        vec![0.0, 2.0, 9.0, 10.0],
        vec![1.0, 0.0, 6.0, 4.0],
        vec![15.0, 7.0, 0.0, 8.0],
        vec![6.0, 3.0, 12.0, 0.0],
    ]
}

/// Nodes on a line, one unit apart.
pub fn create_line_matrix(num_nodes: usize) -> Vec<Vec<f64>> {
    (0..num_nodes)
        .map(|from| {
            (0..num_nodes)
                .map(|to| from.abs_diff(to) as f64)
                .collect()
        })
        .collect()
}

pub fn create_location_grid(rows: usize, cols: usize) -> Vec<(f64, f64)> {
    let mut locations = Vec::new();

    for y in 0..rows {
        for x in 0..cols {
            locations.push((x as f64, y as f64));
        }
    }

    locations
}

pub fn create_euclidean_matrix(locations: &[(f64, f64)]) -> Vec<Vec<f64>> {
    locations
        .iter()
        .map(|&(x1, y1)| {
            locations
                .iter()
                .map(|&(x2, y2)| ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt())
                .collect()
        })
        .collect()
}

pub fn create_basic_vehicles(count: usize) -> Vec<VehicleBuilder> {
    (0..count)
        .map(|index| {
            let mut builder = VehicleBuilder::default();
            builder.set_vehicle_id(index.to_string());
            builder
        })
        .collect()
}

pub fn create_capacitated_vehicles(capacities: Vec<f64>) -> Vec<VehicleBuilder> {
    capacities
        .into_iter()
        .enumerate()
        .map(|(index, capacity)| {
            let mut builder = VehicleBuilder::default();
            builder.set_vehicle_id(index.to_string());
            builder.set_capacity(capacity);
            builder
        })
        .collect()
}

pub fn create_test_problem(
    matrix: Vec<Vec<f64>>,
    vehicles: Vec<VehicleBuilder>,
) -> VehicleRoutingProblem {
    let mut builder = VehicleRoutingProblemBuilder::default();

    builder.set_matrices(TravelMatrices::new(matrix).unwrap());
    builder.set_vehicles(vehicles);

    builder.build().unwrap()
}

pub fn create_test_problem_with_demands(
    matrix: Vec<Vec<f64>>,
    vehicles: Vec<VehicleBuilder>,
    demands: Vec<f64>,
) -> VehicleRoutingProblem {
    let mut builder = VehicleRoutingProblemBuilder::default();

    builder.set_matrices(TravelMatrices::new(matrix).unwrap());
    builder.set_vehicles(vehicles);
    builder.set_demands(demands);

    builder.build().unwrap()
}

pub struct TestRoute {
    pub vehicle_id: usize,
    pub nodes: Vec<usize>,
}

pub fn create_test_working_solution(
    problem: Arc<VehicleRoutingProblem>,
    routes: Vec<TestRoute>,
) -> WorkingSolution {
    let mut solution = WorkingSolution::new(problem);

    for route in routes {
        for node in route.nodes {
            solution.append_node(RouteIdx::new(route.vehicle_id), NodeIdx::new(node));
        }
    }

    solution
}

pub fn route_nodes(solution: &WorkingSolution, route_id: usize) -> Vec<usize> {
    solution
        .route(RouteIdx::new(route_id))
        .nodes()
        .iter()
        .map(|node| node.get())
        .collect()
}
