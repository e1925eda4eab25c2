//! Proptest strategies and collaborators for search property tests.
//!
//! Instances are small complete graphs with integer weights, so every route
//! cost is integral and the search can round bounds without slack. Fleet
//! sizes and whether idle vehicles are allowed vary per case, and
//! [`brute_force_optimum`] gives the reference cost for small instances.

use std::time::Duration;

use proptest::prelude::*;
use starroute_core::{
    Branch, Instance, InstanceBuilder, MasterProblem, RmpIntegerSolution, RmpLinearSolution,
    Route,
};

fn pair_count(customers: usize) -> usize {
    (0..=customers).map(|a| customers - a).sum()
}

/// Fleet rules of a generated instance.
#[derive(Debug, Clone, Copy)]
struct Fleet {
    vehicles: u32,
    allow_idle: bool,
}

/// Strategy for instances with `2..=max_customers` customers.
///
/// Customer `i` sits at node `i` and may also be served from node `i + 1`
/// (wrapping to `1`). Demands may exceed capacity and the fleet may be too
/// small, either of which makes the instance infeasible.
pub fn routing_instance(max_customers: usize) -> impl Strategy<Value = Instance> {
    (2..=max_customers).prop_flat_map(|customers| {
        let most = u32::try_from(customers).unwrap_or(1);
        (
            proptest::collection::vec(1_u32..=3, customers),
            proptest::collection::vec(any::<bool>(), customers),
            proptest::collection::vec(1_u32..=9, pair_count(customers)),
            2_u32..=5,
            (1..=most, any::<bool>()),
        )
            .prop_filter_map(
                "instance must build",
                move |(demands, shared, weights, capacity, (vehicles, allow_idle))| {
                    let fleet = Fleet {
                        vehicles,
                        allow_idle,
                    };
                    build_instance(customers, &demands, &shared, &weights, capacity, fleet)
                },
            )
    })
}

fn build_instance(
    customers: usize,
    demands: &[u32],
    shared: &[bool],
    weights: &[u32],
    capacity: u32,
    fleet: Fleet,
) -> Option<Instance> {
    let mut builder = InstanceBuilder::new(customers + 1, 0)
        .vehicles(fleet.vehicles)
        .capacity(capacity)
        .allow_unused_vehicles(fleet.allow_idle);
    for ((node, &demand), &also_next) in (1..=customers).zip(demands).zip(shared) {
        let next = if node == customers { 1 } else { node + 1 };
        let neighbourhood = if also_next && next != node {
            vec![node, next]
        } else {
            vec![node]
        };
        builder = builder.customer(node, demand, neighbourhood);
    }
    let mut weight_iter = weights.iter();
    for a in 0..=customers {
        for b in (a + 1)..=customers {
            let weight = weight_iter.next()?;
            builder = builder.symmetric_edge(a, b, f64::from(*weight));
        }
    }
    builder.build().ok()
}

/// Cheapest depot cycle through every node of `stops`, in any order.
fn cycle_cost(instance: &Instance, stops: &[usize]) -> f64 {
    fn extend(instance: &Instance, at: usize, left: &mut Vec<usize>) -> f64 {
        if left.is_empty() {
            return instance
                .edge_weight(at, instance.depot())
                .unwrap_or(f64::INFINITY);
        }
        let mut best = f64::INFINITY;
        for slot in 0..left.len() {
            let next = left.remove(slot);
            let step = instance.edge_weight(at, next).unwrap_or(f64::INFINITY);
            best = best.min(step + extend(instance, next, left));
            left.insert(slot, next);
        }
        best
    }
    extend(instance, instance.depot(), &mut stops.to_vec())
}

/// Cheapest way to serve the customers at dense indices `group` with one
/// vehicle, or to run that vehicle empty.
fn group_cost(instance: &Instance, cycles: &[(Vec<usize>, f64)], group: &[usize]) -> f64 {
    let members: Vec<_> = group
        .iter()
        .filter_map(|&index| instance.customer(index))
        .collect();
    let demand: u32 = members.iter().map(|c| c.demand).sum();
    if demand > instance.capacity() {
        return f64::INFINITY;
    }
    if members.is_empty() && instance.allow_unused_vehicles() {
        return 0.0;
    }
    cycles
        .iter()
        .filter(|(stops, _)| {
            members
                .iter()
                .all(|c| c.neighbourhood.iter().any(|node| stops.contains(node)))
        })
        .map(|&(_, cost)| cost)
        .fold(f64::INFINITY, f64::min)
}

fn assign(
    instance: &Instance,
    cycles: &[(Vec<usize>, f64)],
    customers: &[usize],
    groups: &mut Vec<Vec<usize>>,
) -> f64 {
    let Some((&first, rest)) = customers.split_first() else {
        return groups
            .iter()
            .map(|group| group_cost(instance, cycles, group))
            .sum();
    };
    let mut best = f64::INFINITY;
    for vehicle in 0..groups.len() {
        if let Some(group) = groups.get_mut(vehicle) {
            group.push(first);
        }
        best = best.min(assign(instance, cycles, rest, groups));
        if let Some(group) = groups.get_mut(vehicle) {
            group.pop();
        }
    }
    best
}

/// Optimal total cost by trying every split of the customers over the
/// fleet; infinite when no split fits.
///
/// Only practical for a handful of customers.
pub fn brute_force_optimum(instance: &Instance) -> f64 {
    let stops: Vec<usize> = instance
        .nodes()
        .filter(|&node| node != instance.depot())
        .collect();
    let subsets = 1_u32 << stops.len();
    let cycles: Vec<(Vec<usize>, f64)> = (1..subsets)
        .map(|mask| {
            let chosen: Vec<usize> = stops
                .iter()
                .enumerate()
                .filter(|&(bit, _)| (mask >> bit) & 1 == 1)
                .map(|(_, &node)| node)
                .collect();
            let cost = cycle_cost(instance, &chosen);
            (chosen, cost)
        })
        .collect();
    let customers: Vec<usize> = (0..instance.customer_count()).collect();
    let vehicles = usize::try_from(instance.vehicles()).unwrap_or(0);
    let mut groups = vec![Vec::new(); vehicles];
    assign(instance, &cycles, &customers, &mut groups)
}

/// Master wrapper that records every relaxation objective it reports.
#[derive(Debug)]
pub struct RecordingMaster<M> {
    inner: M,
    /// Relaxation objectives in solve order.
    pub objectives: Vec<f64>,
}

impl<M> RecordingMaster<M> {
    /// Wrap `inner`.
    pub const fn new(inner: M) -> Self {
        Self {
            inner,
            objectives: Vec::new(),
        }
    }
}

impl<M: MasterProblem> MasterProblem for RecordingMaster<M> {
    fn add_columns(&mut self, columns: Vec<Route>) {
        self.inner.add_columns(columns);
    }

    fn add_branch(&mut self, branch: Branch) {
        self.inner.add_branch(branch);
    }

    fn remove_branch(&mut self, branch: &Branch) {
        self.inner.remove_branch(branch);
    }

    fn solve_relaxation(&mut self, time_remaining: Duration) -> RmpLinearSolution {
        let solution = self.inner.solve_relaxation(time_remaining);
        self.objectives.push(solution.objective);
        solution
    }

    fn solve_integer(&mut self, time_remaining: Duration) -> RmpIntegerSolution {
        self.inner.solve_integer(time_remaining)
    }

    fn columns(&self) -> &[Route] {
        self.inner.columns()
    }
}
