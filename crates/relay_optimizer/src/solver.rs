pub mod accepted_solution;
pub mod construction;
pub mod evaluation;
pub mod guided_local_search;
pub mod insertion;
pub mod ls;
pub mod penalties;
pub mod score;
pub mod solution;
pub mod solver;
pub mod solver_config;
pub mod statistics;
pub mod stop_signal;
