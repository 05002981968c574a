pub mod cost_provider;
pub mod node;
pub mod time_window;
pub mod travel_cost_matrix;
pub mod vehicle;
pub mod vehicle_routing_problem;
