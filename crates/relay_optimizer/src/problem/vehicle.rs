use serde::Serialize;

use crate::define_index_newtype;

use super::node::NodeIdx;

define_index_newtype!(VehicleIdx, Vehicle);

pub type Load = f64;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Vehicle {
    external_id: String,
    capacity: Option<Load>,
    start_node: NodeIdx,
    end_node: NodeIdx,
}

impl Vehicle {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// `None` when the vehicle carries any load.
    pub fn capacity(&self) -> Option<Load> {
        self.capacity
    }

    pub fn start_node(&self) -> NodeIdx {
        self.start_node
    }

    pub fn end_node(&self) -> NodeIdx {
        self.end_node
    }

    pub fn can_carry(&self, load: Load) -> bool {
        match self.capacity {
            Some(capacity) => load <= capacity,
            None => true,
        }
    }

    pub fn overflow(&self, load: Load) -> Load {
        match self.capacity {
            Some(capacity) => (load - capacity).max(0.0),
            None => 0.0,
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct VehicleBuilder {
    external_id: Option<String>,
    capacity: Option<Load>,
    start_node: Option<usize>,
    end_node: Option<usize>,
}

impl VehicleBuilder {
    pub fn set_vehicle_id(&mut self, external_id: String) -> &mut VehicleBuilder {
        self.external_id = Some(external_id);
        self
    }

    pub fn set_capacity(&mut self, capacity: Load) -> &mut VehicleBuilder {
        self.capacity = Some(capacity);
        self
    }

    pub fn set_start_node(&mut self, start_node: usize) -> &mut VehicleBuilder {
        self.start_node = Some(start_node);
        self
    }

    pub fn set_end_node(&mut self, end_node: usize) -> &mut VehicleBuilder {
        self.end_node = Some(end_node);
        self
    }

    /// Starts and ends the vehicle at `depot`.
    pub fn set_depot(&mut self, depot: usize) -> &mut VehicleBuilder {
        self.start_node = Some(depot);
        self.end_node = Some(depot);
        self
    }

    pub(crate) fn capacity(&self) -> Option<Load> {
        self.capacity
    }

    pub(crate) fn start_node(&self) -> Option<usize> {
        self.start_node
    }

    pub(crate) fn end_node(&self) -> Option<usize> {
        self.end_node
    }

    /// Missing terminals fall back to the problem depot, a missing id to the
    /// vehicle position.
    pub fn build(self, index: usize, depot: usize) -> Vehicle {
        Vehicle {
            external_id: self.external_id.unwrap_or_else(|| index.to_string()),
            capacity: self.capacity,
            start_node: self.start_node.unwrap_or(depot).into(),
            end_node: self.end_node.unwrap_or(depot).into(),
        }
    }
}
