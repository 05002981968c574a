pub mod cheapest_arc;
pub mod construct_solution;
pub mod nearest_neighbor;
pub mod savings;
