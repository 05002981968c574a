use fxhash::FxHashMap;

use crate::problem::{
    node::NodeIdx, travel_cost_matrix::Cost, vehicle_routing_problem::VehicleRoutingProblem,
};

/// Penalty counters of guided local search, keyed by directed arc.
#[derive(Debug, Clone, Default)]
pub struct ArcPenalties {
    penalties: FxHashMap<(NodeIdx, NodeIdx), u32>,
    lambda: f64,
}

impl ArcPenalties {
    pub fn penalty(&self, from: NodeIdx, to: NodeIdx) -> u32 {
        self.penalties.get(&(from, to)).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, from: NodeIdx, to: NodeIdx) {
        *self.penalties.entry((from, to)).or_insert(0) += 1;
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn set_lambda(&mut self, lambda: f64) {
        self.lambda = lambda;
    }

    pub fn len(&self) -> usize {
        self.penalties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.penalties.is_empty()
    }

    /// Whether penalties change any arc cost.
    pub fn is_active(&self) -> bool {
        self.lambda > 0.0 && !self.penalties.is_empty()
    }
}

/// Arc costs seen by local search: the travel cost, augmented by
/// `lambda * penalty` while guided local search penalties are active.
#[derive(Clone, Copy)]
pub struct ArcCosts<'a> {
    problem: &'a VehicleRoutingProblem,
    penalties: Option<&'a ArcPenalties>,
}

impl<'a> ArcCosts<'a> {
    pub fn new(problem: &'a VehicleRoutingProblem) -> Self {
        ArcCosts {
            problem,
            penalties: None,
        }
    }

    pub fn with_penalties(problem: &'a VehicleRoutingProblem, penalties: &'a ArcPenalties) -> Self {
        ArcCosts {
            problem,
            penalties: penalties.is_active().then_some(penalties),
        }
    }

    #[inline(always)]
    pub fn cost(&self, from: NodeIdx, to: NodeIdx) -> Cost {
        let cost = self.problem.travel_cost(from, to);

        match self.penalties {
            Some(penalties) if from != to => {
                cost + penalties.lambda() * f64::from(penalties.penalty(from, to))
            }
            _ => cost,
        }
    }

    /// Reversing a segment keeps its cost only when costs are symmetric and
    /// unpenalized.
    pub fn is_symmetric(&self) -> bool {
        self.penalties.is_none() && self.problem.matrices().is_symmetric()
    }
}
