use fixedbitset::FixedBitSet;

use crate::errors::{InputError, MatrixKind};

use super::{
    node::NodeIdx,
    time_window::TimeWindow,
    travel_cost_matrix::{Cost, Time, TravelMatrices},
    vehicle::{Load, Vehicle, VehicleBuilder, VehicleIdx},
};

/// Immutable description of one routing request.
///
/// Built once through [`VehicleRoutingProblemBuilder`], which rejects any
/// malformed input, and then shared read-only by every search phase.
#[derive(Debug)]
pub struct VehicleRoutingProblem {
    matrices: TravelMatrices,
    depot: NodeIdx,
    vehicles: Vec<Vehicle>,
    demands: Vec<Load>,
    time_windows: Vec<TimeWindow>,
    service_durations: Vec<Time>,
    required: FixedBitSet,
    required_nodes: Vec<NodeIdx>,

    has_time_windows: bool,
    has_capacity: bool,
    max_capacity: Option<Load>,
}

impl VehicleRoutingProblem {
    pub fn num_nodes(&self) -> usize {
        self.matrices.num_nodes()
    }

    pub fn depot(&self) -> NodeIdx {
        self.depot
    }

    pub fn matrices(&self) -> &TravelMatrices {
        &self.matrices
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, vehicle_id: VehicleIdx) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    pub fn demand(&self, node: NodeIdx) -> Load {
        self.demands[node.get()]
    }

    pub fn time_window(&self, node: NodeIdx) -> &TimeWindow {
        &self.time_windows[node.get()]
    }

    pub fn service_duration(&self, node: NodeIdx) -> Time {
        self.service_durations[node.get()]
    }

    /// Whether the node must be visited by exactly one route.
    pub fn is_required(&self, node: NodeIdx) -> bool {
        self.required.contains(node.get())
    }

    pub fn required_nodes(&self) -> &[NodeIdx] {
        &self.required_nodes
    }

    pub fn has_time_windows(&self) -> bool {
        self.has_time_windows
    }

    pub fn has_capacity(&self) -> bool {
        self.has_capacity
    }

    /// Largest capacity of the fleet, `None` when some vehicle is unconstrained.
    pub fn max_capacity(&self) -> Option<Load> {
        self.max_capacity
    }

    /// Whether any single vehicle can carry `load`.
    pub fn fits_any_vehicle(&self, load: Load) -> bool {
        match self.max_capacity {
            Some(capacity) => load <= capacity,
            None => true,
        }
    }

    #[inline(always)]
    pub fn travel_cost(&self, from: NodeIdx, to: NodeIdx) -> Cost {
        self.matrices.travel_cost(from, to)
    }

    #[inline(always)]
    pub fn travel_time(&self, from: NodeIdx, to: NodeIdx) -> Time {
        self.matrices.travel_time(from, to)
    }

    #[inline(always)]
    pub fn is_forbidden(&self, from: NodeIdx, to: NodeIdx) -> bool {
        self.travel_cost(from, to).is_infinite()
    }

    /// Time at which the vehicle leaves its start node.
    pub fn vehicle_start_time(&self, vehicle_id: VehicleIdx) -> Time {
        self.time_window(self.vehicle(vehicle_id).start_node())
            .earliest()
            .unwrap_or(0.0)
    }

    /// Departure from `node` after arriving at `arrival`, waiting for its
    /// window to open and serving it.
    #[inline(always)]
    pub fn departure_time(&self, node: NodeIdx, arrival: Time) -> Time {
        self.time_window(node).service_start(arrival) + self.service_duration(node)
    }
}

#[derive(Default)]
pub struct VehicleRoutingProblemBuilder {
    matrices: Option<TravelMatrices>,
    depot: Option<usize>,
    vehicles: Option<Vec<VehicleBuilder>>,
    demands: Option<Vec<Load>>,
    time_windows: Option<Vec<Option<TimeWindow>>>,
    service_durations: Option<Vec<Time>>,
}

impl VehicleRoutingProblemBuilder {
    pub fn set_matrices(&mut self, matrices: TravelMatrices) -> &mut VehicleRoutingProblemBuilder {
        self.matrices = Some(matrices);
        self
    }

    pub fn set_depot(&mut self, depot: usize) -> &mut VehicleRoutingProblemBuilder {
        self.depot = Some(depot);
        self
    }

    pub fn set_vehicles(
        &mut self,
        vehicles: Vec<VehicleBuilder>,
    ) -> &mut VehicleRoutingProblemBuilder {
        self.vehicles = Some(vehicles);
        self
    }

    pub fn add_vehicle(&mut self, vehicle: VehicleBuilder) -> &mut VehicleRoutingProblemBuilder {
        if let Some(vehicles) = &mut self.vehicles {
            vehicles.push(vehicle);
        } else {
            self.vehicles = Some(vec![vehicle]);
        }

        self
    }

    pub fn set_demands(&mut self, demands: Vec<Load>) -> &mut VehicleRoutingProblemBuilder {
        self.demands = Some(demands);
        self
    }

    pub fn set_time_windows(
        &mut self,
        time_windows: Vec<Option<TimeWindow>>,
    ) -> &mut VehicleRoutingProblemBuilder {
        self.time_windows = Some(time_windows);
        self
    }

    pub fn set_service_durations(
        &mut self,
        service_durations: Vec<Time>,
    ) -> &mut VehicleRoutingProblemBuilder {
        self.service_durations = Some(service_durations);
        self
    }

    pub fn build(self) -> Result<VehicleRoutingProblem, InputError> {
        let matrices = self.matrices.ok_or(InputError::EmptyMatrix {
            matrix: MatrixKind::Costs,
        })?;
        let num_nodes = matrices.num_nodes();

        let depot = self.depot.unwrap_or(0);
        if depot >= num_nodes {
            return Err(InputError::DepotOutOfRange { depot, num_nodes });
        }

        let vehicle_builders = self.vehicles.unwrap_or_default();
        if vehicle_builders.is_empty() {
            return Err(InputError::NoVehicles);
        }

        for (vehicle, builder) in vehicle_builders.iter().enumerate() {
            for node in [builder.start_node(), builder.end_node()].into_iter().flatten() {
                if node >= num_nodes {
                    return Err(InputError::VehicleNodeOutOfRange {
                        vehicle,
                        node,
                        num_nodes,
                    });
                }
            }

            if let Some(capacity) = builder.capacity()
                && !(capacity.is_finite() && capacity >= 0.0)
            {
                return Err(InputError::InvalidCapacity { vehicle, capacity });
            }
        }

        let vehicles: Vec<Vehicle> = vehicle_builders
            .into_iter()
            .enumerate()
            .map(|(index, builder)| builder.build(index, depot))
            .collect();

        let demands = validate_per_node("demands", self.demands, num_nodes, 0.0)?;
        for (node, &demand) in demands.iter().enumerate() {
            if !(demand.is_finite() && demand >= 0.0) {
                return Err(InputError::InvalidDemand { node, demand });
            }
        }
        if demands[depot] != 0.0 {
            return Err(InputError::DepotDemand {
                depot,
                demand: demands[depot],
            });
        }

        let time_windows: Vec<TimeWindow> =
            validate_per_node("time_windows", self.time_windows, num_nodes, None)?
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect();
        for (node, time_window) in time_windows.iter().enumerate() {
            let earliest = time_window.earliest().unwrap_or(f64::NEG_INFINITY);
            let latest = time_window.latest().unwrap_or(f64::INFINITY);
            if earliest.is_nan() || latest.is_nan() || earliest > latest {
                return Err(InputError::InvalidTimeWindow {
                    node,
                    earliest,
                    latest,
                });
            }
        }

        let service_durations =
            validate_per_node("service_durations", self.service_durations, num_nodes, 0.0)?;
        for (node, &duration) in service_durations.iter().enumerate() {
            if !(duration.is_finite() && duration >= 0.0) {
                return Err(InputError::InvalidServiceDuration { node, duration });
            }
        }

        let mut required = FixedBitSet::with_capacity(num_nodes);
        required.insert_range(..);
        required.set(depot, false);
        for vehicle in &vehicles {
            required.set(vehicle.start_node().get(), false);
            required.set(vehicle.end_node().get(), false);
        }
        let required_nodes = required.ones().map(NodeIdx::new).collect();

        let max_capacity = vehicles
            .iter()
            .map(|vehicle| vehicle.capacity())
            .try_fold(0.0_f64, |max, capacity| capacity.map(|c| max.max(c)));

        Ok(VehicleRoutingProblem {
            has_time_windows: time_windows.iter().any(|tw| !tw.is_empty()),
            has_capacity: vehicles.iter().any(|vehicle| vehicle.capacity().is_some()),
            max_capacity,
            matrices,
            depot: NodeIdx::new(depot),
            vehicles,
            demands,
            time_windows,
            service_durations,
            required,
            required_nodes,
        })
    }
}

fn validate_per_node<T: Clone>(
    field: &'static str,
    values: Option<Vec<T>>,
    num_nodes: usize,
    default: T,
) -> Result<Vec<T>, InputError> {
    match values {
        Some(values) if values.len() != num_nodes => Err(InputError::LengthMismatch {
            field,
            expected: num_nodes,
            found: values.len(),
        }),
        Some(values) => Ok(values),
        None => Ok(vec![default; num_nodes]),
    }
}
