//! Clarke-Wright savings construction.
//!
//! Every node starts on its own chain. Chains are then joined tail to head in
//! decreasing order of
//!
//! ```text
//! s(i, j) = c(depot, i) + c(j, depot) - c(i, j)
//! ```
//!
//! as long as some vehicle can still serve the joined chain. Once positive
//! savings run out, joins continue only while there are more chains than
//! vehicles. Chains are finally handed to vehicles by decreasing load.

use std::sync::Arc;

use crate::{
    problem::{node::NodeIdx, vehicle::Load, vehicle_routing_problem::VehicleRoutingProblem},
    solver::solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

#[derive(Debug)]
struct Saving {
    from: NodeIdx,
    to: NodeIdx,
    value: f64,
}

#[derive(Debug)]
struct Chain {
    nodes: Vec<NodeIdx>,
    load: Load,
}

fn can_any_vehicle_serve(solution: &WorkingSolution, nodes: &[NodeIdx]) -> bool {
    let problem = solution.problem();
    solution
        .routes()
        .iter()
        .any(|route| route.is_valid_change(problem, nodes.iter().copied(), 0, 0))
}

fn compute_savings(problem: &VehicleRoutingProblem, nodes: &[NodeIdx]) -> Vec<Saving> {
    let depot = problem.depot();
    let mut savings = Vec::with_capacity(nodes.len() * nodes.len().saturating_sub(1));

    for &from in nodes {
        for &to in nodes {
            if from == to || problem.is_forbidden(from, to) {
                continue;
            }

            let value = problem.travel_cost(depot, from) + problem.travel_cost(to, depot)
                - problem.travel_cost(from, to);

            if value.is_finite() {
                savings.push(Saving { from, to, value });
            }
        }
    }

    // Stable, so equal savings keep their (from, to) order
    savings.sort_by(|a, b| b.value.total_cmp(&a.value));

    savings
}

pub fn savings(problem: &Arc<VehicleRoutingProblem>) -> WorkingSolution {
    let mut solution = WorkingSolution::new(Arc::clone(problem));

    let mut chains: Vec<Option<Chain>> = Vec::with_capacity(problem.num_nodes());
    let mut chain_of: Vec<Option<usize>> = vec![None; problem.num_nodes()];

    for &node in problem.required_nodes() {
        if can_any_vehicle_serve(&solution, &[node]) {
            chain_of[node.get()] = Some(chains.len());
            chains.push(Some(Chain {
                nodes: vec![node],
                load: problem.demand(node),
            }));
        }
    }

    let servable: Vec<NodeIdx> = problem
        .required_nodes()
        .iter()
        .copied()
        .filter(|node| chain_of[node.get()].is_some())
        .collect();

    let mut num_chains = servable.len();

    for saving in compute_savings(problem, &servable) {
        if saving.value <= 0.0 && num_chains <= problem.num_vehicles() {
            break;
        }

        let (Some(tail_chain), Some(head_chain)) =
            (chain_of[saving.from.get()], chain_of[saving.to.get()])
        else {
            continue;
        };

        if tail_chain == head_chain {
            continue;
        }

        let (Some(tail), Some(head)) = (&chains[tail_chain], &chains[head_chain]) else {
            continue;
        };

        if tail.nodes.last() != Some(&saving.from) || head.nodes.first() != Some(&saving.to) {
            continue;
        }

        let load = tail.load + head.load;
        if !problem.fits_any_vehicle(load) {
            continue;
        }

        let mut merged = Vec::with_capacity(tail.nodes.len() + head.nodes.len());
        merged.extend_from_slice(&tail.nodes);
        merged.extend_from_slice(&head.nodes);

        if !can_any_vehicle_serve(&solution, &merged) {
            continue;
        }

        for node in &head.nodes {
            chain_of[node.get()] = Some(tail_chain);
        }

        chains[head_chain] = None;
        chains[tail_chain] = Some(Chain {
            nodes: merged,
            load,
        });
        num_chains -= 1;
    }

    let mut chains: Vec<Chain> = chains.into_iter().flatten().collect();
    chains.sort_by(|a, b| b.load.total_cmp(&a.load));

    for chain in chains {
        let route_id = RouteIdx::range(solution.num_routes()).find(|&route_id| {
            let route = solution.route(route_id);
            route.is_empty() && route.is_valid_change(problem, chain.nodes.iter().copied(), 0, 0)
        });

        if let Some(route_id) = route_id {
            solution.assign_route(route_id, &chain.nodes);
        }
    }

    solution
}
