use std::collections::BTreeSet;

use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    errors::{ConfigError, InputError, SolveError},
    problem::{
        cost_provider::CostProvider,
        time_window::TimeWindow,
        travel_cost_matrix::TravelMatrices,
        vehicle::VehicleBuilder,
        vehicle_routing_problem::{VehicleRoutingProblem, VehicleRoutingProblemBuilder},
    },
    solver::{
        construction::construct_solution::FirstSolutionStrategy,
        ls::r#move::MoveKind,
        solution::routing_solution::Solution,
        solver::Solver,
        solver_config::{AcceptancePolicy, SolverConfig, Threads},
    },
};

/// Keys accepted in the `config` object.
pub const RECOGNIZED_OPTIONS: [&str; 8] = [
    "first_solution_strategy",
    "time_limit",
    "max_iterations",
    "enabled_moves",
    "random_seed",
    "patience",
    "acceptance",
    "threads",
];

#[derive(Serialize, Deserialize, JsonSchema, Debug)]
#[serde(deny_unknown_fields, rename = "VehicleRoutingProblem")]
pub struct JsonVehicleRoutingProblem {
    /// Square arc cost matrix, `null` marking a forbidden arc.
    pub matrix: Vec<Vec<Option<f64>>>,

    /// Travel times, the arc costs when absent.
    pub durations: Option<Vec<Vec<Option<f64>>>>,

    #[serde(default)]
    pub depot: usize,

    pub vehicles: Vec<JsonVehicle>,
    pub demands: Option<Vec<f64>>,
    pub time_windows: Option<Vec<Option<JsonTimeWindow>>>,
    pub service_durations: Option<Vec<f64>>,

    #[schemars(with = "Option<JsonSolverConfig>")]
    pub config: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Default)]
#[serde(deny_unknown_fields, rename = "Vehicle")]
pub struct JsonVehicle {
    pub id: Option<String>,
    pub capacity: Option<f64>,

    /// Start node, the depot when absent.
    pub start: Option<usize>,

    /// End node, the depot when absent.
    pub end: Option<usize>,
}

/// `[earliest, latest]`, either bound may be `null`.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy)]
#[serde(rename = "TimeWindow")]
pub struct JsonTimeWindow(pub Option<f64>, pub Option<f64>);

impl From<JsonTimeWindow> for TimeWindow {
    fn from(value: JsonTimeWindow) -> Self {
        TimeWindow::new(value.0, value.1)
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Default)]
#[serde(deny_unknown_fields, rename = "SolverConfig")]
pub struct JsonSolverConfig {
    pub first_solution_strategy: Option<FirstSolutionStrategy>,

    /// ISO 8601 duration, `null` to disable the time limit.
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<SignedDuration>")]
    pub time_limit: Option<Option<SignedDuration>>,

    /// `null` to disable the iteration limit.
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<usize>")]
    pub max_iterations: Option<Option<usize>>,

    pub enabled_moves: Option<BTreeSet<MoveKind>>,
    pub random_seed: Option<u64>,
    pub patience: Option<usize>,
    pub acceptance: Option<AcceptancePolicy>,
    pub threads: Option<usize>,
}

impl JsonSolverConfig {
    /// Parses a raw `config` object, naming the first unknown key if any.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let object = value.as_object().ok_or(ConfigError::NotAnObject)?;

        if let Some(key) = object
            .keys()
            .find(|key| !RECOGNIZED_OPTIONS.contains(&key.as_str()))
        {
            return Err(ConfigError::UnknownOption { key: key.clone() });
        }

        serde_json::from_value(value.clone()).map_err(|error| ConfigError::Malformed(error.to_string()))
    }

    pub fn apply(self, config: &mut SolverConfig) {
        if let Some(strategy) = self.first_solution_strategy {
            config.first_solution_strategy = strategy;
        }

        if let Some(time_limit) = self.time_limit {
            config.time_limit = time_limit;
        }

        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }

        if let Some(enabled_moves) = self.enabled_moves {
            config.enabled_moves = enabled_moves;
        }

        if let Some(random_seed) = self.random_seed {
            config.random_seed = random_seed;
        }

        if let Some(patience) = self.patience {
            config.patience = patience;
        }

        if let Some(acceptance) = self.acceptance {
            config.acceptance = acceptance;
        }

        if let Some(threads) = self.threads {
            config.threads = Threads::from(threads);
        }
    }
}

/// Reads a JSON matrix with `null` standing for an infinite value.
struct NullableMatrix<'a>(&'a [Vec<Option<f64>>]);

impl CostProvider for NullableMatrix<'_> {
    fn num_nodes(&self) -> usize {
        self.0.len()
    }

    fn row_len(&self, from: usize) -> usize {
        self.0[from].len()
    }

    fn cost(&self, from: usize, to: usize) -> f64 {
        self.0[from][to].unwrap_or(f64::INFINITY)
    }
}

impl JsonVehicleRoutingProblem {
    #[instrument(skip_all, level = "debug")]
    pub fn build_problem(&self) -> Result<VehicleRoutingProblem, InputError> {
        let mut matrices = TravelMatrices::from_provider(&NullableMatrix(&self.matrix))?;
        if let Some(durations) = &self.durations {
            matrices = matrices.with_durations(&NullableMatrix(durations))?;
        }

        let vehicles = self
            .vehicles
            .iter()
            .map(|vehicle| {
                let mut builder = VehicleBuilder::default();

                if let Some(id) = &vehicle.id {
                    builder.set_vehicle_id(id.clone());
                }

                if let Some(capacity) = vehicle.capacity {
                    builder.set_capacity(capacity);
                }

                if let Some(start) = vehicle.start {
                    builder.set_start_node(start);
                }

                if let Some(end) = vehicle.end {
                    builder.set_end_node(end);
                }

                builder
            })
            .collect();

        let mut builder = VehicleRoutingProblemBuilder::default();
        builder
            .set_matrices(matrices)
            .set_depot(self.depot)
            .set_vehicles(vehicles);

        if let Some(demands) = &self.demands {
            builder.set_demands(demands.clone());
        }

        if let Some(time_windows) = &self.time_windows {
            builder.set_time_windows(
                time_windows
                    .iter()
                    .map(|window| window.map(TimeWindow::from))
                    .collect(),
            );
        }

        if let Some(service_durations) = &self.service_durations {
            builder.set_service_durations(service_durations.clone());
        }

        builder.build()
    }

    /// Solver options of the request on top of the defaults.
    pub fn solver_config(&self) -> Result<SolverConfig, ConfigError> {
        let mut config = SolverConfig::default();

        if let Some(value) = &self.config {
            JsonSolverConfig::from_value(value)?.apply(&mut config);
        }

        Ok(config)
    }

    /// Validates the whole request and prepares a solver for it.
    pub fn solver(&self) -> Result<Solver, SolveError> {
        self.solver_with(|_| {})
    }

    /// Like [`Self::solver`], with `configure` adjusting the request options.
    pub fn solver_with(
        &self,
        configure: impl FnOnce(&mut SolverConfig),
    ) -> Result<Solver, SolveError> {
        let problem = self.build_problem()?;
        let mut config = self.solver_config()?;
        configure(&mut config);

        Ok(Solver::new(problem, config))
    }

    pub fn solve(&self) -> Result<Solution, SolveError> {
        self.solver()?.solve()
    }
}
