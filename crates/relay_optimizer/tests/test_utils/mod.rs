#![allow(dead_code)]

use relay_optimizer::problem::{
    node::NodeIdx,
    time_window::TimeWindow,
    travel_cost_matrix::TravelMatrices,
    vehicle::VehicleBuilder,
    vehicle_routing_problem::{VehicleRoutingProblem, VehicleRoutingProblemBuilder},
};
use relay_optimizer::solver::solution::routing_solution::Solution;

//
//  Locations are laid out row by row, node 0 at the origin:
//
//  Y-axis
//  ^
//  | (0.0, 1.0)  (1.0, 1.0)  (2.0, 1.0)
//  |
//  | (0.0, 0.0)  (1.0, 0.0)  (2.0, 0.0)
//  +----------------------------------> X-axis
pub fn create_location_grid(rows: usize, cols: usize) -> Vec<(f64, f64)> {
    (0..rows)
        .flat_map(|y| (0..cols).map(move |x| (x as f64, y as f64)))
        .collect()
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

pub fn create_line_matrix(num_nodes: usize) -> Vec<Vec<f64>> {
    (0..num_nodes)
        .map(|from| {
            (0..num_nodes)
                .map(|to| from.abs_diff(to) as f64)
                .collect()
        })
        .collect()
}

pub fn scenario_matrix() -> Vec<Vec<f64>> {
    vec![
        vec![0.0, 2.0, 9.0, 10.0],
        vec![1.0, 0.0, 6.0, 4.0],
        vec![15.0, 7.0, 0.0, 8.0],
        vec![6.0, 3.0, 12.0, 0.0],
    ]
}

pub fn create_vehicles(capacities: &[Option<f64>]) -> Vec<VehicleBuilder> {
    capacities
        .iter()
        .enumerate()
        .map(|(index, capacity)| {
            let mut builder = VehicleBuilder::default();
            builder.set_vehicle_id(format!("vehicle-{index}"));
            if let Some(capacity) = *capacity {
                builder.set_capacity(capacity);
            }
            builder
        })
        .collect()
}

pub struct TestProblem {
    pub matrix: Vec<Vec<f64>>,
    pub vehicles: Vec<VehicleBuilder>,
    pub demands: Option<Vec<f64>>,
    pub time_windows: Option<Vec<Option<TimeWindow>>>,
}

impl TestProblem {
    pub fn new(matrix: Vec<Vec<f64>>, vehicles: Vec<VehicleBuilder>) -> Self {
        TestProblem {
            matrix,
            vehicles,
            demands: None,
            time_windows: None,
        }
    }

    pub fn build(self) -> VehicleRoutingProblem {
        let mut builder = VehicleRoutingProblemBuilder::default();
        builder
            .set_matrices(TravelMatrices::new(self.matrix).unwrap())
            .set_vehicles(self.vehicles);

        if let Some(demands) = self.demands {
            builder.set_demands(demands);
        }

        if let Some(time_windows) = self.time_windows {
            builder.set_time_windows(time_windows);
        }

        builder.build().unwrap()
    }
}

/// Checks the structural guarantees every returned solution must hold.
pub fn assert_solution_invariants(problem: &VehicleRoutingProblem, solution: &Solution) {
    let mut visits = vec![0; problem.num_nodes()];
    let mut total_cost = 0.0;

    for route in &solution.routes {
        let vehicle = problem.vehicle(route.vehicle);

        if route.is_empty() {
            assert_eq!(route.cost, 0.0);
            continue;
        }

        assert_eq!(route.nodes.first(), Some(&vehicle.start_node()));
        assert_eq!(route.nodes.last(), Some(&vehicle.end_node()));

        let cost: f64 = route
            .nodes
            .windows(2)
            .map(|arc| problem.travel_cost(arc[0], arc[1]))
            .sum();
        assert!((cost - route.cost).abs() < 1e-9);
        total_cost += route.cost;

        let load: f64 = route.stops().iter().map(|&node| problem.demand(node)).sum();
        assert!((load - route.load).abs() < 1e-9);
        if let Some(capacity) = vehicle.capacity() {
            assert!(route.load <= capacity);
        }

        for node in route.stops() {
            visits[node.get()] += 1;
        }
    }

    assert!((total_cost - solution.total_cost).abs() < 1e-9);

    for &node in problem.required_nodes() {
        let expected = if solution.unassigned.contains(&node) { 0 } else { 1 };
        assert_eq!(visits[node.get()], expected, "node {node}");
    }

    assert_eq!(visits[NodeIdx::new(0).get()], 0);
}
