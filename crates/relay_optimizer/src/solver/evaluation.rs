pub mod evaluator;
pub mod violation;
