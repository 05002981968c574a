use std::ops::ControlFlow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{
        ls::{exchange::ExchangeOperator, or_opt::OrOptOperator, two_opt::TwoOptOperator},
        penalties::ArcCosts,
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

pub type UpdatedRoutes = SmallVec<[RouteIdx; 2]>;

pub trait LocalSearchOperator: Sized {
    /// Enumerates the moves of this kind on a route pair, in a fixed order.
    /// Generation ends as soon as `consumer` breaks.
    fn generate_moves<C>(
        problem: &VehicleRoutingProblem,
        solution: &WorkingSolution,
        pair: (RouteIdx, RouteIdx),
        consumer: C,
    ) -> ControlFlow<()>
    where
        C: FnMut(Self) -> ControlFlow<()>;

    /// Cost added minus cost removed, using the given arc costs.
    fn delta(&self, solution: &WorkingSolution, costs: &ArcCosts) -> f64;

    fn is_valid(&self, solution: &WorkingSolution) -> bool;

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut WorkingSolution);

    fn updated_routes(&self) -> UpdatedRoutes;
}

#[derive(
    Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    TwoOpt,
    OrOpt,
    Exchange,
}

impl MoveKind {
    pub const ALL: [MoveKind; 3] = [MoveKind::TwoOpt, MoveKind::OrOpt, MoveKind::Exchange];
}

#[derive(Debug, Clone)]
pub enum LocalSearchMove {
    /// Reverses a segment of one route.
    TwoOpt(TwoOptOperator),
    /// Moves a segment of up to three stops within a route or to another one.
    OrOpt(OrOptOperator),
    /// Swaps one stop of a route with one stop of another route.
    Exchange(ExchangeOperator),
}

impl LocalSearchMove {
    pub fn operator_name(&self) -> &'static str {
        match self {
            LocalSearchMove::TwoOpt(_) => "Two-Opt",
            LocalSearchMove::OrOpt(_) => "Or-Opt",
            LocalSearchMove::Exchange(_) => "Exchange",
        }
    }

    pub fn kind(&self) -> MoveKind {
        match self {
            LocalSearchMove::TwoOpt(_) => MoveKind::TwoOpt,
            LocalSearchMove::OrOpt(_) => MoveKind::OrOpt,
            LocalSearchMove::Exchange(_) => MoveKind::Exchange,
        }
    }

    pub fn delta(&self, solution: &WorkingSolution, costs: &ArcCosts) -> f64 {
        match self {
            LocalSearchMove::TwoOpt(op) => op.delta(solution, costs),
            LocalSearchMove::OrOpt(op) => op.delta(solution, costs),
            LocalSearchMove::Exchange(op) => op.delta(solution, costs),
        }
    }

    pub fn is_valid(&self, solution: &WorkingSolution) -> bool {
        match self {
            LocalSearchMove::TwoOpt(op) => op.is_valid(solution),
            LocalSearchMove::OrOpt(op) => op.is_valid(solution),
            LocalSearchMove::Exchange(op) => op.is_valid(solution),
        }
    }

    pub fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut WorkingSolution) {
        match self {
            LocalSearchMove::TwoOpt(op) => op.apply(problem, solution),
            LocalSearchMove::OrOpt(op) => op.apply(problem, solution),
            LocalSearchMove::Exchange(op) => op.apply(problem, solution),
        }
    }

    pub fn updated_routes(&self) -> UpdatedRoutes {
        match self {
            LocalSearchMove::TwoOpt(op) => op.updated_routes(),
            LocalSearchMove::OrOpt(op) => op.updated_routes(),
            LocalSearchMove::Exchange(op) => op.updated_routes(),
        }
    }
}
