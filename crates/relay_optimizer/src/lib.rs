pub mod errors;
pub mod json;
pub mod problem;
pub mod solver;
mod utils;

pub use errors::{ConfigError, InputError, SolveError};
pub use solver::solver::{Solver, solve};

#[cfg(test)]
pub(crate) mod test_utils;
