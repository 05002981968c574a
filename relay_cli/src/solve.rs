use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use indicatif::{ProgressBar, ProgressStyle};
use relay_optimizer::{
    SolveError,
    json::types::JsonVehicleRoutingProblem,
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{
        construction::construct_solution::FirstSolutionStrategy,
        solution::routing_solution::Solution, solver_config::SolverConfig,
    },
};
use tracing::{info, warn};

use crate::{file_utils::read_folder, parsers};

#[derive(Args)]
pub struct SolveArgs {
    /// Problem file, or a folder searched for .json problems
    #[arg(short, long)]
    input: PathBuf,

    /// Time limit, overrides the config of the problem file (e.g. "30s", "PT1M")
    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<jiff::SignedDuration>,

    /// Maximum number of improve cycles
    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long)]
    threads: Option<usize>,

    /// cheapest-arc, nearest-neighbor or savings
    #[arg(long, value_parser = parsers::parse_strategy)]
    strategy: Option<FirstSolutionStrategy>,

    #[arg(long)]
    seed: Option<u64>,

    /// Output folder for .solution.json files
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl SolveArgs {
    fn apply(&self, config: &mut SolverConfig) {
        if let Some(timeout) = self.timeout {
            config.time_limit = Some(timeout);
        }

        if let Some(iterations) = self.iterations {
            config.max_iterations = Some(iterations);
        }

        if let Some(threads) = self.threads {
            config.threads = threads.into();
        }

        if let Some(strategy) = self.strategy {
            config.first_solution_strategy = strategy;
        }

        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
    }
}

pub fn run(args: SolveArgs) -> Result<(), anyhow::Error> {
    let paths = if args.input.is_file() {
        vec![args.input.clone()]
    } else {
        read_folder(&args.input)?
    };

    for path in paths {
        info!("Solving {:?}", path);

        let content =
            fs::read_to_string(&path).with_context(|| format!("failed to read {path:?}"))?;
        let input: JsonVehicleRoutingProblem =
            serde_json::from_str(&content).with_context(|| format!("failed to parse {path:?}"))?;

        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::default_spinner().template("{spinner} [{elapsed}] {msg}")?);
        bar.enable_steady_tick(Duration::from_millis(120));

        let mut solver = input.solver_with(|config| args.apply(config))?;
        let progress = bar.clone();
        solver.on_best_solution(move |accepted| {
            progress.set_message(format!("best cost {:.2}", accepted.evaluation.total_cost));
        });

        let result = solver.solve();
        bar.finish_and_clear();

        let solution = match result {
            Ok(solution) => solution,
            Err(SolveError::NoFeasibleSolution { best, violations }) => {
                warn!(violations = violations.len(), "No feasible solution found");
                *best
            }
            Err(error) => return Err(error.into()),
        };

        print_solution(solver.problem(), &solution);

        if let Some(output) = &args.output {
            write_solution(output, &path, &solution)?;
        }
    }

    Ok(())
}

fn print_solution(problem: &VehicleRoutingProblem, solution: &Solution) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Vehicle", "Route", "Load", "Cost"]);

    for route in solution.non_empty_routes() {
        let nodes = route
            .nodes
            .iter()
            .map(|node| node.to_string())
            .collect::<Vec<_>>()
            .join(" → ");

        table.add_row(vec![
            problem.vehicle(route.vehicle).external_id().to_owned(),
            nodes,
            format!("{}", route.load),
            format!("{:.2}", route.cost),
        ]);
    }

    println!("{table}");
    println!(
        "status: {:?}, total cost: {:.2}, iterations: {}, moves: {}, elapsed: {:#}",
        solution.status,
        solution.total_cost,
        solution.statistics.iterations,
        solution.statistics.moves_applied,
        solution.statistics.elapsed,
    );

    if !solution.unassigned.is_empty() {
        println!("unassigned: {:?}", solution.unassigned);
    }

    for violation in &solution.violations {
        println!("violation: {violation:?}");
    }
}

fn write_solution(output: &Path, input: &Path, solution: &Solution) -> Result<(), anyhow::Error> {
    fs::create_dir_all(output)?;

    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("problem"));
    let path = output.join(format!("{stem}.solution.json"));

    fs::write(&path, serde_json::to_string_pretty(solution)?)?;
    info!("Solution written to {:?}", path);

    Ok(())
}
