use schemars::JsonSchema;
use serde::Serialize;

use crate::problem::{node::NodeIdx, vehicle::VehicleIdx};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    CapacityExceeded,
    TimeWindowMissed,
    Unassigned,
    DuplicateVisit,
    ForbiddenArc,
    InvalidNode,
    RouteEndpointMismatch,
    UnknownVehicle,
}

impl ViolationKind {
    /// Kinds that can only come from a corrupted solution, never from a hard
    /// instance.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ViolationKind::DuplicateVisit
                | ViolationKind::InvalidNode
                | ViolationKind::RouteEndpointMismatch
                | ViolationKind::UnknownVehicle
        )
    }
}

/// One broken constraint, located on a node and optionally on the vehicle
/// serving it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Violation {
    pub node: Option<NodeIdx>,
    pub vehicle: Option<VehicleIdx>,
    pub kind: ViolationKind,
    /// How far the constraint is exceeded: overflowing load, lateness, extra
    /// visits or unserved demand depending on the kind.
    pub magnitude: f64,
}

impl Violation {
    pub fn new(
        node: Option<NodeIdx>,
        vehicle: Option<VehicleIdx>,
        kind: ViolationKind,
        magnitude: f64,
    ) -> Self {
        Violation {
            node,
            vehicle,
            kind,
            magnitude,
        }
    }
}
