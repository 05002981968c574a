use fixedbitset::FixedBitSet;
use serde::Serialize;

use crate::{
    problem::{
        node::NodeIdx, travel_cost_matrix::Cost, vehicle::VehicleIdx,
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solver::{
        score::Score,
        solution::{
            routing_solution::{Solution, SolutionRoute},
            working_solution::WorkingSolution,
        },
    },
};

use super::violation::{Violation, ViolationKind};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub total_cost: Cost,
    pub feasible: bool,
    pub violations: Vec<Violation>,
}

impl Evaluation {
    pub fn score(&self) -> Score {
        Score::new(self.violations.len() as f64, self.total_cost)
    }

    pub fn has_structural_violations(&self) -> bool {
        self.violations
            .iter()
            .any(|violation| violation.kind.is_structural())
    }
}

/// Recomputes cost and feasibility of a solution from scratch, trusting
/// nothing but the visited node sequences.
///
/// Violations are reported in route order, then duplicate visits and
/// unassigned nodes by ascending node index.
pub struct SolutionEvaluator<'a> {
    problem: &'a VehicleRoutingProblem,
}

impl<'a> SolutionEvaluator<'a> {
    pub fn new(problem: &'a VehicleRoutingProblem) -> Self {
        SolutionEvaluator { problem }
    }

    pub fn evaluate(&self, solution: &Solution) -> Evaluation {
        self.evaluate_routes(&solution.routes)
    }

    pub fn evaluate_working(&self, solution: &WorkingSolution) -> Evaluation {
        self.evaluate_routes(&solution.to_routes())
    }

    pub fn evaluate_routes(&self, routes: &[SolutionRoute]) -> Evaluation {
        let problem = self.problem;
        let num_nodes = problem.num_nodes();

        let mut violations = Vec::new();
        let mut visits = vec![0_usize; num_nodes];
        let mut seen_vehicles = FixedBitSet::with_capacity(problem.num_vehicles());
        let mut route_costs = Vec::with_capacity(routes.len());

        for route in routes {
            if route.vehicle.get() >= problem.num_vehicles()
                || seen_vehicles.put(route.vehicle.get())
            {
                violations.push(Violation::new(
                    route.nodes.first().copied(),
                    Some(route.vehicle),
                    ViolationKind::UnknownVehicle,
                    1.0,
                ));
                continue;
            }

            if route.is_empty() {
                continue;
            }

            route_costs.push(self.evaluate_route(route, &mut visits, &mut violations));
        }

        for (node, &count) in visits.iter().enumerate() {
            if count > 1 {
                violations.push(Violation::new(
                    Some(NodeIdx::new(node)),
                    None,
                    ViolationKind::DuplicateVisit,
                    (count - 1) as f64,
                ));
            }
        }

        for &node in problem.required_nodes() {
            if visits[node.get()] > 0 {
                continue;
            }

            let demand = problem.demand(node);
            let violation = match problem.max_capacity() {
                Some(max_capacity) if demand > max_capacity => Violation::new(
                    Some(node),
                    None,
                    ViolationKind::CapacityExceeded,
                    demand - max_capacity,
                ),
                _ => Violation::new(Some(node), None, ViolationKind::Unassigned, demand),
            };
            violations.push(violation);
        }

        Evaluation {
            total_cost: route_costs.into_iter().sum(),
            feasible: violations.is_empty(),
            violations,
        }
    }

    /// Walks one route accumulating load and simulated arrival times, and
    /// returns the sum of its arc costs.
    fn evaluate_route(
        &self,
        route: &SolutionRoute,
        visits: &mut [usize],
        violations: &mut Vec<Violation>,
    ) -> Cost {
        let problem = self.problem;
        let vehicle_id: VehicleIdx = route.vehicle;
        let vehicle = problem.vehicle(vehicle_id);
        let nodes = &route.nodes;

        let mut out_of_range = false;
        for &node in nodes {
            if node.get() >= problem.num_nodes() {
                violations.push(Violation::new(
                    Some(node),
                    Some(vehicle_id),
                    ViolationKind::InvalidNode,
                    1.0,
                ));
                out_of_range = true;
            }
        }
        if out_of_range {
            return 0.0;
        }

        let first = nodes[0];
        let last = nodes[nodes.len() - 1];
        if nodes.len() < 2 || first != vehicle.start_node() {
            violations.push(Violation::new(
                Some(first),
                Some(vehicle_id),
                ViolationKind::RouteEndpointMismatch,
                1.0,
            ));
        }
        if last != vehicle.end_node() {
            violations.push(Violation::new(
                Some(last),
                Some(vehicle_id),
                ViolationKind::RouteEndpointMismatch,
                1.0,
            ));
        }

        let mut cost = 0.0;
        let mut load = 0.0;
        let mut first_overflow = None;
        let mut previous = first;
        let mut departure = problem.vehicle_start_time(vehicle_id);

        for (position, &node) in nodes.iter().enumerate().skip(1) {
            let arc_cost = problem.travel_cost(previous, node);
            if arc_cost.is_infinite() {
                violations.push(Violation::new(
                    Some(node),
                    Some(vehicle_id),
                    ViolationKind::ForbiddenArc,
                    1.0,
                ));
            } else {
                cost += arc_cost;
            }

            let arrival = departure + problem.travel_time(previous, node);
            let lateness = problem.time_window(node).lateness(arrival);
            if problem.has_time_windows() && lateness > 0.0 {
                violations.push(Violation::new(
                    Some(node),
                    Some(vehicle_id),
                    ViolationKind::TimeWindowMissed,
                    lateness,
                ));
            }

            if position + 1 < nodes.len() {
                if problem.is_required(node) {
                    visits[node.get()] += 1;
                } else {
                    violations.push(Violation::new(
                        Some(node),
                        Some(vehicle_id),
                        ViolationKind::InvalidNode,
                        1.0,
                    ));
                }

                load += problem.demand(node);
                if first_overflow.is_none() && !vehicle.can_carry(load) {
                    first_overflow = Some(node);
                }

                departure = problem.departure_time(node, arrival);
            }

            previous = node;
        }

        if let Some(node) = first_overflow {
            violations.push(Violation::new(
                Some(node),
                Some(vehicle_id),
                ViolationKind::CapacityExceeded,
                vehicle.overflow(load),
            ));
        }

        cost
    }
}
