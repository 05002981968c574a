/// Source of arc values used to build a [`TravelMatrices`](super::travel_cost_matrix::TravelMatrices).
///
/// Anything that can answer `cost(from, to)` for nodes `0..num_nodes()` can be
/// turned into a distance model. Row lengths are reported separately so that
/// ragged inputs are rejected instead of silently truncated.
pub trait CostProvider {
    fn num_nodes(&self) -> usize;

    fn row_len(&self, _from: usize) -> usize {
        self.num_nodes()
    }

    fn cost(&self, from: usize, to: usize) -> f64;
}

impl CostProvider for [Vec<f64>] {
    fn num_nodes(&self) -> usize {
        self.len()
    }

    fn row_len(&self, from: usize) -> usize {
        self[from].len()
    }

    fn cost(&self, from: usize, to: usize) -> f64 {
        self[from][to]
    }
}

impl CostProvider for Vec<Vec<f64>> {
    fn num_nodes(&self) -> usize {
        self.as_slice().num_nodes()
    }

    fn row_len(&self, from: usize) -> usize {
        self.as_slice().row_len(from)
    }

    fn cost(&self, from: usize, to: usize) -> f64 {
        self.as_slice().cost(from, to)
    }
}

/// Adapts a closure into a square [`CostProvider`].
pub struct FnCostProvider<F> {
    num_nodes: usize,
    cost_fn: F,
}

impl<F> FnCostProvider<F>
where
    F: Fn(usize, usize) -> f64,
{
    pub fn new(num_nodes: usize, cost_fn: F) -> Self {
        FnCostProvider { num_nodes, cost_fn }
    }
}

impl<F> CostProvider for FnCostProvider<F>
where
    F: Fn(usize, usize) -> f64,
{
    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn cost(&self, from: usize, to: usize) -> f64 {
        (self.cost_fn)(from, to)
    }
}
