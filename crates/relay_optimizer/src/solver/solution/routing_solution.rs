use schemars::JsonSchema;
use serde::Serialize;

use crate::{
    problem::{
        node::NodeIdx,
        travel_cost_matrix::Cost,
        vehicle::{Load, VehicleIdx},
    },
    solver::{evaluation::violation::Violation, statistics::SearchStatistics},
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum SolutionStatus {
    /// The search converged before its budget ran out.
    OptimalWithinBudget,
    /// The budget or a stop request ended the search after it improved on
    /// the initial solution.
    FeasibleImproved,
    /// The budget ran out without any improvement on the initial solution.
    BudgetExhausted,
    Infeasible,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SolutionRoute {
    pub vehicle: VehicleIdx,
    /// Visited nodes from the vehicle start to its end, empty for an unused vehicle.
    pub nodes: Vec<NodeIdx>,
    pub cost: Cost,
    pub load: Load,
}

impl SolutionRoute {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Visited nodes without the start and end nodes.
    pub fn stops(&self) -> &[NodeIdx] {
        match self.nodes.len() {
            0..=2 => &[],
            len => &self.nodes[1..len - 1],
        }
    }
}

/// Final answer of a solve.
#[derive(Serialize, Debug, Clone)]
pub struct Solution {
    pub routes: Vec<SolutionRoute>,
    pub total_cost: Cost,
    pub status: SolutionStatus,
    pub violations: Vec<Violation>,
    pub unassigned: Vec<NodeIdx>,
    pub statistics: SearchStatistics,
}

impl Solution {
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn non_empty_routes(&self) -> impl Iterator<Item = &SolutionRoute> {
        self.routes.iter().filter(|route| !route.is_empty())
    }
}
