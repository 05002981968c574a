use std::fmt;

use jiff::SignedDuration;
use serde::Serialize;
use thiserror::Error;

use crate::solver::{evaluation::violation::Violation, solution::routing_solution::Solution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatrixKind {
    Costs,
    Durations,
}

impl fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixKind::Costs => write!(f, "cost"),
            MatrixKind::Durations => write!(f, "duration"),
        }
    }
}

/// Rejection of a malformed problem, raised before any search starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("{matrix} matrix is empty")]
    EmptyMatrix { matrix: MatrixKind },

    #[error("{matrix} matrix is not square: row {row} has {found} columns, expected {expected}")]
    NonSquareMatrix {
        matrix: MatrixKind,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("{matrix} matrix has negative value {value} on arc ({from}, {to})")]
    NegativeCost {
        matrix: MatrixKind,
        from: usize,
        to: usize,
        value: f64,
    },

    #[error("{matrix} matrix has a NaN value on arc ({from}, {to})")]
    InvalidCost {
        matrix: MatrixKind,
        from: usize,
        to: usize,
    },

    #[error("{matrix} matrix has non-zero self-loop value {value} on node {node}")]
    SelfLoopCost {
        matrix: MatrixKind,
        node: usize,
        value: f64,
    },

    #[error("duration matrix covers {found} nodes, expected {expected}")]
    DurationsSizeMismatch { expected: usize, found: usize },

    #[error("depot {depot} is out of range for {num_nodes} nodes")]
    DepotOutOfRange { depot: usize, num_nodes: usize },

    #[error("problem has no vehicles")]
    NoVehicles,

    #[error("vehicle {vehicle} references node {node}, out of range for {num_nodes} nodes")]
    VehicleNodeOutOfRange {
        vehicle: usize,
        node: usize,
        num_nodes: usize,
    },

    #[error("vehicle {vehicle} has invalid capacity {capacity}")]
    InvalidCapacity { vehicle: usize, capacity: f64 },

    #[error("{field} has {found} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("node {node} has invalid demand {demand}")]
    InvalidDemand { node: usize, demand: f64 },

    #[error("depot {depot} must have zero demand, got {demand}")]
    DepotDemand { depot: usize, demand: f64 },

    #[error("node {node} has invalid time window [{earliest}, {latest}]")]
    InvalidTimeWindow {
        node: usize,
        earliest: f64,
        latest: f64,
    },

    #[error("node {node} has invalid service duration {duration}")]
    InvalidServiceDuration { node: usize, duration: f64 },
}

/// Rejection of solver options.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown solver option `{key}`")]
    UnknownOption { key: String },

    #[error("solver config must be an object")]
    NotAnObject,

    #[error("malformed solver config: {0}")]
    Malformed(String),

    #[error("either a time limit or a maximum number of iterations is required")]
    MissingBudget,

    #[error("time limit must be positive, got {0}")]
    InvalidTimeLimit(SignedDuration),

    #[error("the number of threads must be at least 1")]
    InvalidThreads,
}

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The search could not place every node within the constraints. The best
    /// candidate found is kept so that the caller can inspect or relax it.
    #[error("no feasible solution found, {} violation(s)", .violations.len())]
    NoFeasibleSolution {
        best: Box<Solution>,
        violations: Vec<Violation>,
    },

    #[error("search produced a corrupted solution: {violations:?}")]
    InvariantViolation { violations: Vec<Violation> },
}
