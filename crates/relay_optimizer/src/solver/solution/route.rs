use smallvec::SmallVec;

use crate::problem::{
    node::NodeIdx,
    travel_cost_matrix::{Cost, Time},
    vehicle::{Load, Vehicle, VehicleIdx},
    vehicle_routing_problem::VehicleRoutingProblem,
};

/// Stops served by one vehicle, with running load and schedule.
///
/// Only the stops are stored: the start and end nodes of the vehicle are
/// implicit and looked up in the problem. An empty route means the vehicle
/// stays unused and costs nothing.
#[derive(Clone, Debug)]
pub struct WorkingSolutionRoute {
    pub(super) vehicle_id: VehicleIdx,

    /// Stops in visiting order
    pub(super) nodes: Vec<NodeIdx>,

    /// loads[i] is the cumulative load once stop i has been served
    pub(super) loads: Vec<Load>,

    pub(super) arrival_times: Vec<Time>,

    /// Departure after waiting for the window and serving the stop
    pub(super) departure_times: Vec<Time>,

    pub(super) end_arrival: Time,

    pub(super) cost: Cost,
}

impl WorkingSolutionRoute {
    pub fn empty(problem: &VehicleRoutingProblem, vehicle_id: VehicleIdx) -> Self {
        let mut route = WorkingSolutionRoute {
            vehicle_id,
            nodes: Vec::new(),
            loads: Vec::new(),
            arrival_times: Vec::new(),
            departure_times: Vec::new(),
            end_arrival: 0.0,
            cost: 0.0,
        };

        route.update(problem);

        route
    }

    pub fn vehicle_id(&self) -> VehicleIdx {
        self.vehicle_id
    }

    pub fn vehicle<'a>(&self, problem: &'a VehicleRoutingProblem) -> &'a Vehicle {
        problem.vehicle(self.vehicle_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeIdx] {
        &self.nodes
    }

    pub fn node(&self, position: usize) -> NodeIdx {
        self.nodes[position]
    }

    pub fn contains(&self, node: NodeIdx) -> bool {
        self.nodes.contains(&node)
    }

    pub fn cost(&self) -> Cost {
        self.cost
    }

    pub fn total_load(&self) -> Load {
        self.loads.last().copied().unwrap_or(0.0)
    }

    pub fn load_at(&self, position: usize) -> Load {
        self.loads[position]
    }

    pub fn arrival_time(&self, position: usize) -> Time {
        self.arrival_times[position]
    }

    pub fn departure_time(&self, position: usize) -> Time {
        self.departure_times[position]
    }

    pub fn end_arrival(&self) -> Time {
        self.end_arrival
    }

    /// Node visited right before `position`, the vehicle start for the first stop.
    pub fn previous_node(&self, problem: &VehicleRoutingProblem, position: usize) -> NodeIdx {
        if position == 0 {
            self.vehicle(problem).start_node()
        } else {
            self.nodes[position - 1]
        }
    }

    /// Node visited right after `position`, the vehicle end for the last stop.
    pub fn next_node(&self, problem: &VehicleRoutingProblem, position: usize) -> NodeIdx {
        match self.nodes.get(position + 1) {
            Some(&node) => node,
            None => self.vehicle(problem).end_node(),
        }
    }

    /// Node at `position`, or the vehicle end when `position` is one past the last stop.
    pub fn node_or_end(&self, problem: &VehicleRoutingProblem, position: usize) -> NodeIdx {
        match self.nodes.get(position) {
            Some(&node) => node,
            None => self.vehicle(problem).end_node(),
        }
    }

    /// Every traversed arc from start to end. Empty for an unused vehicle.
    pub fn arcs<'a>(
        &'a self,
        problem: &VehicleRoutingProblem,
    ) -> impl Iterator<Item = (NodeIdx, NodeIdx)> + 'a {
        let vehicle = self.vehicle(problem);
        let (start, end) = (vehicle.start_node(), vehicle.end_node());

        let stops: &'a [NodeIdx] = &self.nodes;
        let (head, tail) = match (stops.first(), stops.last()) {
            (Some(&first), Some(&last)) => (Some((start, first)), Some((last, end))),
            _ => (None, None),
        };

        head.into_iter()
            .chain(stops.windows(2).map(|pair| (pair[0], pair[1])))
            .chain(tail)
    }

    pub fn insert(&mut self, problem: &VehicleRoutingProblem, position: usize, node: NodeIdx) {
        self.nodes.insert(position, node);
        self.update(problem);
    }

    pub fn push(&mut self, problem: &VehicleRoutingProblem, node: NodeIdx) {
        self.nodes.push(node);
        self.update(problem);
    }

    pub fn remove(&mut self, problem: &VehicleRoutingProblem, position: usize) -> NodeIdx {
        let node = self.nodes.remove(position);
        self.update(problem);
        node
    }

    /// Replaces the stops in `[start, end)` and returns the removed ones.
    pub fn replace_segment<I>(
        &mut self,
        problem: &VehicleRoutingProblem,
        start: usize,
        end: usize,
        replacement: I,
    ) -> SmallVec<[NodeIdx; 4]>
    where
        I: IntoIterator<Item = NodeIdx>,
    {
        let removed = self.nodes.splice(start..end, replacement).collect();
        self.update(problem);
        removed
    }

    /// Reverses the stops in `[from, to]`.
    pub fn reverse_segment(&mut self, problem: &VehicleRoutingProblem, from: usize, to: usize) {
        self.nodes[from..=to].reverse();
        self.update(problem);
    }

    pub(super) fn clear(&mut self, problem: &VehicleRoutingProblem) {
        self.nodes.clear();
        self.update(problem);
    }

    /// Recomputes loads, schedule and cost after the stop sequence changed.
    pub(super) fn update(&mut self, problem: &VehicleRoutingProblem) {
        self.loads.clear();
        self.arrival_times.clear();
        self.departure_times.clear();

        if self.nodes.is_empty() {
            self.end_arrival = problem.vehicle_start_time(self.vehicle_id);
            self.cost = 0.0;
            return;
        }

        let vehicle = problem.vehicle(self.vehicle_id);
        let mut previous = vehicle.start_node();
        let mut departure = problem.vehicle_start_time(self.vehicle_id);
        let mut load = 0.0;
        let mut cost = 0.0;

        for &node in &self.nodes {
            cost += problem.travel_cost(previous, node);
            load += problem.demand(node);

            let arrival = departure + problem.travel_time(previous, node);
            departure = problem.departure_time(node, arrival);

            self.loads.push(load);
            self.arrival_times.push(arrival);
            self.departure_times.push(departure);

            previous = node;
        }

        let end = vehicle.end_node();
        cost += problem.travel_cost(previous, end);

        self.end_arrival = departure + problem.travel_time(previous, end);
        self.cost = cost;
    }

    /// Checks whether replacing the stops in `[start, end)` with `replacement`
    /// keeps the route within capacity, time windows and finite arcs.
    pub fn is_valid_change<I>(
        &self,
        problem: &VehicleRoutingProblem,
        replacement: I,
        start: usize,
        end: usize,
    ) -> bool
    where
        I: Iterator<Item = NodeIdx> + Clone,
    {
        self.is_valid_capacity_change(problem, replacement.clone(), start, end)
            && self.is_valid_schedule_change(problem, replacement, start, end)
    }

    pub fn is_valid_capacity_change(
        &self,
        problem: &VehicleRoutingProblem,
        replacement: impl Iterator<Item = NodeIdx>,
        start: usize,
        end: usize,
    ) -> bool {
        if !problem.has_capacity() {
            return true;
        }

        let removed: Load = self.nodes[start..end]
            .iter()
            .map(|&node| problem.demand(node))
            .sum();
        let added: Load = replacement.map(|node| problem.demand(node)).sum();

        self.vehicle(problem)
            .can_carry(self.total_load() - removed + added)
    }

    /// Simulates the route from the first changed stop. The simulation stops
    /// early once the schedule is no later than before, as every later stop
    /// was already reachable in time.
    pub fn is_valid_schedule_change(
        &self,
        problem: &VehicleRoutingProblem,
        replacement: impl Iterator<Item = NodeIdx>,
        start: usize,
        end: usize,
    ) -> bool {
        let mut replacement = replacement.peekable();
        if start == 0 && end == self.nodes.len() && replacement.peek().is_none() {
            return true;
        }

        let has_time_windows = problem.has_time_windows();
        let mut previous = self.previous_node(problem, start);
        let mut departure = if start == 0 {
            problem.vehicle_start_time(self.vehicle_id)
        } else {
            self.departure_times[start - 1]
        };

        for node in replacement {
            if problem.is_forbidden(previous, node) {
                return false;
            }

            let arrival = departure + problem.travel_time(previous, node);
            if has_time_windows && !problem.time_window(node).is_satisfied(arrival) {
                return false;
            }

            departure = problem.departure_time(node, arrival);
            previous = node;
        }

        for (position, &node) in self.nodes.iter().enumerate().skip(end) {
            if problem.is_forbidden(previous, node) {
                return false;
            }

            if !has_time_windows {
                return true;
            }

            let arrival = departure + problem.travel_time(previous, node);
            if arrival <= self.arrival_times[position] {
                return true;
            }

            if !problem.time_window(node).is_satisfied(arrival) {
                return false;
            }

            departure = problem.departure_time(node, arrival);
            previous = node;
        }

        let end_node = self.vehicle(problem).end_node();
        if problem.is_forbidden(previous, end_node) {
            return false;
        }

        !has_time_windows
            || problem
                .time_window(end_node)
                .is_satisfied(departure + problem.travel_time(previous, end_node))
    }
}

#[cfg(test)]
mod tests {
    use std::iter;

    use crate::{
        problem::{
            time_window::TimeWindow, travel_cost_matrix::TravelMatrices,
            vehicle_routing_problem::VehicleRoutingProblemBuilder,
        },
        test_utils::{
            create_basic_vehicles, create_capacitated_vehicles, create_line_matrix,
            create_test_problem, create_test_problem_with_demands,
        },
    };

    use super::*;

    fn route_with(problem: &VehicleRoutingProblem, nodes: &[usize]) -> WorkingSolutionRoute {
        let mut route = WorkingSolutionRoute::empty(problem, VehicleIdx::new(0));
        for &node in nodes {
            route.push(problem, NodeIdx::new(node));
        }
        route
    }

    fn node_ids(route: &WorkingSolutionRoute) -> Vec<usize> {
        route.nodes().iter().map(|node| node.get()).collect()
    }

    #[test]
    fn test_route_data_correctness() {
        let problem = create_test_problem_with_demands(
            create_line_matrix(5),
            create_capacitated_vehicles(vec![100.0]),
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
        );
        let route = route_with(&problem, &[2, 4, 1]);

        // 0 -> 2 -> 4 -> 1 -> 0
        assert_eq!(route.cost(), 2.0 + 2.0 + 3.0 + 1.0);
        assert_eq!(route.total_load(), 7.0);
        assert_eq!(route.load_at(0), 2.0);
        assert_eq!(route.load_at(1), 6.0);
        assert_eq!(route.arrival_time(0), 2.0);
        assert_eq!(route.arrival_time(2), 7.0);
        assert_eq!(route.end_arrival(), 8.0);
    }

    #[test]
    fn test_empty_route_costs_nothing() {
        let problem = create_test_problem(create_line_matrix(4), create_basic_vehicles(1));
        let route = WorkingSolutionRoute::empty(&problem, VehicleIdx::new(0));

        assert!(route.is_empty());
        assert_eq!(route.cost(), 0.0);
        assert_eq!(route.total_load(), 0.0);
        assert_eq!(route.arcs(&problem).count(), 0);
    }

    #[test]
    fn test_neighbours_and_arcs() {
        let problem = create_test_problem(create_line_matrix(5), create_basic_vehicles(1));
        let route = route_with(&problem, &[3, 1]);

        assert_eq!(route.previous_node(&problem, 0), NodeIdx::new(0));
        assert_eq!(route.previous_node(&problem, 1), NodeIdx::new(3));
        assert_eq!(route.next_node(&problem, 0), NodeIdx::new(1));
        assert_eq!(route.next_node(&problem, 1), NodeIdx::new(0));
        assert_eq!(route.node_or_end(&problem, 2), NodeIdx::new(0));

        let arcs: Vec<(usize, usize)> = route
            .arcs(&problem)
            .map(|(from, to)| (from.get(), to.get()))
            .collect();
        assert_eq!(arcs, vec![(0, 3), (3, 1), (1, 0)]);
    }

    #[test]
    fn test_replace_segment() {
        let problem = create_test_problem(create_line_matrix(6), create_basic_vehicles(1));
        let mut route = route_with(&problem, &[1, 2, 3]);

        let removed = route.replace_segment(
            &problem,
            1,
            3,
            [NodeIdx::new(5), NodeIdx::new(4), NodeIdx::new(3)],
        );

        assert_eq!(removed.as_slice(), &[NodeIdx::new(2), NodeIdx::new(3)]);
        assert_eq!(node_ids(&route), vec![1, 5, 4, 3]);
        assert_eq!(route.cost(), 1.0 + 4.0 + 1.0 + 1.0 + 3.0);

        route.replace_segment(&problem, 0, 2, iter::empty());
        assert_eq!(node_ids(&route), vec![4, 3]);
    }

    #[test]
    fn test_reverse_segment() {
        let problem = create_test_problem(create_line_matrix(6), create_basic_vehicles(1));
        let mut route = route_with(&problem, &[1, 2, 3, 4, 5]);

        route.reverse_segment(&problem, 1, 3);
        assert_eq!(node_ids(&route), vec![1, 4, 3, 2, 5]);
    }

    #[test]
    fn test_is_valid_capacity_change() {
        let problem = create_test_problem_with_demands(
            create_line_matrix(5),
            create_capacitated_vehicles(vec![10.0]),
            vec![0.0, 4.0, 4.0, 2.0, 5.0],
        );
        let route = route_with(&problem, &[1, 2]);

        assert!(route.is_valid_change(&problem, iter::once(NodeIdx::new(3)), 2, 2));
        assert!(!route.is_valid_change(&problem, iter::once(NodeIdx::new(4)), 2, 2));
        assert!(route.is_valid_change(&problem, iter::once(NodeIdx::new(4)), 0, 1));
    }

    #[test]
    fn test_is_valid_schedule_change() {
        let mut problem_builder = VehicleRoutingProblemBuilder::default();
        problem_builder
            .set_matrices(TravelMatrices::new(create_line_matrix(4)).unwrap())
            .set_vehicles(create_basic_vehicles(1))
            .set_time_windows(vec![
                None,
                Some(TimeWindow::new(None, Some(1.0))),
                None,
                Some(TimeWindow::new(Some(10.0), Some(12.0))),
            ]);
        let problem = problem_builder.build().unwrap();

        let route = route_with(&problem, &[1, 3]);
        assert_eq!(route.arrival_time(1), 3.0);
        assert_eq!(route.departure_time(1), 10.0);

        // Node 1 must stay first
        assert!(!route.is_valid_change(&problem, iter::once(NodeIdx::new(2)), 0, 0));
        assert!(route.is_valid_change(&problem, iter::once(NodeIdx::new(2)), 1, 1));
        assert!(route.is_valid_change(&problem, iter::once(NodeIdx::new(2)), 2, 2));

        let reversed = [NodeIdx::new(3), NodeIdx::new(1)];
        assert!(!route.is_valid_change(&problem, reversed.into_iter(), 0, 2));
    }

    #[test]
    fn test_forbidden_arc_is_invalid() {
        let mut matrix = create_line_matrix(4);
        matrix[1][2] = f64::INFINITY;
        let problem = create_test_problem(matrix, create_basic_vehicles(1));
        let route = route_with(&problem, &[1]);

        assert!(!route.is_valid_change(&problem, iter::once(NodeIdx::new(2)), 1, 1));
        assert!(route.is_valid_change(&problem, iter::once(NodeIdx::new(2)), 0, 0));
        assert!(route.is_valid_change(&problem, iter::empty(), 0, 1));
    }
}
