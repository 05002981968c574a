use crate::{
    define_index_newtype, problem::vehicle::VehicleIdx,
    solver::solution::route::WorkingSolutionRoute,
};

define_index_newtype!(RouteIdx, WorkingSolutionRoute);

// Every vehicle owns exactly one route, at the same position
impl From<VehicleIdx> for RouteIdx {
    fn from(vehicle_id: VehicleIdx) -> Self {
        RouteIdx::new(vehicle_id.get())
    }
}
