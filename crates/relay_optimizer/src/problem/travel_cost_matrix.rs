use std::sync::Arc;

use crate::errors::{InputError, MatrixKind};

use super::{cost_provider::CostProvider, node::NodeIdx};

pub type Cost = f64;
pub type Time = f64;

/// Read-only cost and travel time lookup between nodes.
///
/// Both matrices use a flat row-major layout: the value of arc `(from, to)` is
/// stored at `from * num_nodes + to`. When no duration matrix is supplied the
/// travel time of an arc equals its cost and both share the same storage.
///
/// An infinite cost marks a forbidden arc. An arc with an infinite travel
/// time is forbidden as well, whatever its cost.
#[derive(Debug, Clone)]
pub struct TravelMatrices {
    costs: Arc<Vec<Cost>>,
    times: Arc<Vec<Time>>,
    num_nodes: usize,
    is_symmetric: bool,
}

fn is_flat_matrix_symmetric(matrix: &[f64], num_nodes: usize) -> bool {
    for i in 0..num_nodes {
        for j in (i + 1)..num_nodes {
            if matrix[i * num_nodes + j] != matrix[j * num_nodes + i] {
                return false;
            }
        }
    }
    true
}

fn read_flat_matrix<P>(provider: &P, matrix: MatrixKind) -> Result<Vec<f64>, InputError>
where
    P: CostProvider + ?Sized,
{
    let num_nodes = provider.num_nodes();
    if num_nodes == 0 {
        return Err(InputError::EmptyMatrix { matrix });
    }

    let mut values = Vec::with_capacity(num_nodes * num_nodes);

    for from in 0..num_nodes {
        let found = provider.row_len(from);
        if found != num_nodes {
            return Err(InputError::NonSquareMatrix {
                matrix,
                row: from,
                expected: num_nodes,
                found,
            });
        }

        for to in 0..num_nodes {
            let value = provider.cost(from, to);

            if value.is_nan() {
                return Err(InputError::InvalidCost { matrix, from, to });
            }

            if value < 0.0 {
                return Err(InputError::NegativeCost {
                    matrix,
                    from,
                    to,
                    value,
                });
            }

            if from == to && value != 0.0 {
                return Err(InputError::SelfLoopCost {
                    matrix,
                    node: from,
                    value,
                });
            }

            values.push(value);
        }
    }

    Ok(values)
}

impl TravelMatrices {
    pub fn new(costs: Vec<Vec<Cost>>) -> Result<Self, InputError> {
        Self::from_provider(&costs)
    }

    /// Copies and validates the arc costs of `provider`.
    pub fn from_provider<P>(provider: &P) -> Result<Self, InputError>
    where
        P: CostProvider + ?Sized,
    {
        let costs = read_flat_matrix(provider, MatrixKind::Costs)?;
        let num_nodes = provider.num_nodes();
        let is_symmetric = is_flat_matrix_symmetric(&costs, num_nodes);

        let costs = Arc::new(costs);

        Ok(TravelMatrices {
            times: Arc::clone(&costs),
            costs,
            num_nodes,
            is_symmetric,
        })
    }

    /// Replaces the travel times, which otherwise equal the arc costs.
    pub fn with_durations<P>(mut self, provider: &P) -> Result<Self, InputError>
    where
        P: CostProvider + ?Sized,
    {
        if provider.num_nodes() != self.num_nodes {
            return Err(InputError::DurationsSizeMismatch {
                expected: self.num_nodes,
                found: provider.num_nodes(),
            });
        }

        let times = read_flat_matrix(provider, MatrixKind::Durations)?;

        if times.iter().any(|time| time.is_infinite()) {
            let costs = Arc::make_mut(&mut self.costs);
            for (cost, time) in costs.iter_mut().zip(&times) {
                if time.is_infinite() {
                    *cost = f64::INFINITY;
                }
            }
            self.is_symmetric = is_flat_matrix_symmetric(costs, self.num_nodes);
        }

        self.times = Arc::new(times);
        Ok(self)
    }

    #[inline(always)]
    fn index(&self, from: NodeIdx, to: NodeIdx) -> usize {
        from.arc_index(to, self.num_nodes)
    }

    #[inline(always)]
    pub fn travel_cost(&self, from: NodeIdx, to: NodeIdx) -> Cost {
        if from == to {
            return 0.0;
        }

        self.costs[self.index(from, to)]
    }

    #[inline(always)]
    pub fn travel_time(&self, from: NodeIdx, to: NodeIdx) -> Time {
        if from == to {
            return 0.0;
        }

        self.times[self.index(from, to)]
    }

    /// Largest finite arc cost.
    pub fn max_cost(&self) -> Cost {
        self.costs
            .iter()
            .copied()
            .filter(|cost| cost.is_finite())
            .fold(0.0, f64::max)
    }

    pub fn is_symmetric(&self) -> bool {
        self.is_symmetric
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn has_durations(&self) -> bool {
        !Arc::ptr_eq(&self.costs, &self.times)
    }
}

#[cfg(test)]
mod tests {
    use crate::problem::cost_provider::FnCostProvider;

    use super::*;

    #[test]
    fn test_travel_cost_lookup() {
        let matrices = TravelMatrices::new(vec![
            vec![0.0, 2.0, 9.0],
            vec![1.0, 0.0, 6.0],
            vec![15.0, 7.0, 0.0],
        ])
        .unwrap();

        assert_eq!(matrices.num_nodes(), 3);
        assert_eq!(matrices.travel_cost(NodeIdx::new(0), NodeIdx::new(1)), 2.0);
        assert_eq!(matrices.travel_cost(NodeIdx::new(1), NodeIdx::new(0)), 1.0);
        assert_eq!(matrices.travel_time(NodeIdx::new(2), NodeIdx::new(0)), 15.0);
        assert_eq!(matrices.max_cost(), 15.0);
        assert!(!matrices.is_symmetric());
        assert!(!matrices.has_durations());
    }

    #[test]
    fn test_symmetric_detection() {
        let matrices =
            TravelMatrices::from_provider(&FnCostProvider::new(5, |i, j| i.abs_diff(j) as f64))
                .unwrap();

        assert!(matrices.is_symmetric());
    }

    #[test]
    fn test_non_square_matrix_is_rejected() {
        let result = TravelMatrices::new(vec![
            vec![0.0, 1.0, 2.0, 3.0],
            vec![1.0, 0.0, 2.0, 3.0],
            vec![1.0, 2.0, 0.0, 3.0],
        ]);

        assert_eq!(
            result.unwrap_err(),
            InputError::NonSquareMatrix {
                matrix: MatrixKind::Costs,
                row: 0,
                expected: 3,
                found: 4,
            }
        );
    }

    #[test]
    fn test_ragged_matrix_is_rejected() {
        let result = TravelMatrices::new(vec![vec![0.0, 1.0], vec![1.0]]);

        assert!(matches!(
            result,
            Err(InputError::NonSquareMatrix {
                row: 1,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_negative_cost_is_rejected() {
        let result = TravelMatrices::new(vec![vec![0.0, -1.0], vec![1.0, 0.0]]);

        assert_eq!(
            result.unwrap_err(),
            InputError::NegativeCost {
                matrix: MatrixKind::Costs,
                from: 0,
                to: 1,
                value: -1.0,
            }
        );
    }

    #[test]
    fn test_nan_and_self_loop_are_rejected() {
        let nan = TravelMatrices::new(vec![vec![0.0, f64::NAN], vec![1.0, 0.0]]);
        assert!(matches!(
            nan,
            Err(InputError::InvalidCost { from: 0, to: 1, .. })
        ));

        let self_loop = TravelMatrices::new(vec![vec![0.0, 1.0], vec![1.0, 3.0]]);
        assert!(matches!(
            self_loop,
            Err(InputError::SelfLoopCost { node: 1, .. })
        ));

        let empty = TravelMatrices::new(vec![]);
        assert!(matches!(empty, Err(InputError::EmptyMatrix { .. })));
    }

    #[test]
    fn test_infinite_cost_marks_forbidden_arc() {
        let matrices =
            TravelMatrices::new(vec![vec![0.0, f64::INFINITY], vec![1.0, 0.0]]).unwrap();

        assert!(
            matrices
                .travel_cost(NodeIdx::new(0), NodeIdx::new(1))
                .is_infinite()
        );
        assert_eq!(matrices.max_cost(), 1.0);
    }

    #[test]
    fn test_with_durations() {
        let matrices = TravelMatrices::new(vec![vec![0.0, 4.0], vec![4.0, 0.0]])
            .unwrap()
            .with_durations(&vec![vec![0.0, 10.0], vec![12.0, 0.0]])
            .unwrap();

        assert!(matrices.has_durations());
        assert_eq!(matrices.travel_cost(NodeIdx::new(0), NodeIdx::new(1)), 4.0);
        assert_eq!(matrices.travel_time(NodeIdx::new(1), NodeIdx::new(0)), 12.0);

        let mismatch = TravelMatrices::new(vec![vec![0.0, 4.0], vec![4.0, 0.0]])
            .unwrap()
            .with_durations(&vec![vec![0.0]]);
        assert_eq!(
            mismatch.unwrap_err(),
            InputError::DurationsSizeMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_infinite_duration_forbids_arc() {
        let matrices = TravelMatrices::new(vec![
            vec![0.0, 3.0, 5.0],
            vec![3.0, 0.0, 4.0],
            vec![5.0, 4.0, 0.0],
        ])
        .unwrap()
        .with_durations(&vec![
            vec![0.0, 6.0, 10.0],
            vec![6.0, 0.0, f64::INFINITY],
            vec![10.0, 8.0, 0.0],
        ])
        .unwrap();

        assert!(matrices.has_durations());
        assert!(
            matrices
                .travel_cost(NodeIdx::new(1), NodeIdx::new(2))
                .is_infinite()
        );
        assert_eq!(matrices.travel_cost(NodeIdx::new(2), NodeIdx::new(1)), 4.0);
        assert_eq!(matrices.travel_time(NodeIdx::new(0), NodeIdx::new(2)), 10.0);
        assert_eq!(matrices.max_cost(), 5.0);
        assert!(!matrices.is_symmetric());
    }
}
