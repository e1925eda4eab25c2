//! Pulse algorithm: depth-first ESPPRC search pruned by completion bounds.
//!
//! Phase A fills a `(node, demand bucket)` table with the cheapest completion
//! cost to the sink, from the highest bucket down so that each run can prune
//! with the bounds already known. Phase B searches from the source, cutting a
//! branch when its cost plus the completion bound cannot beat the best path
//! found so far, or when a direct edge from an earlier node would reach the
//! same place for less. Skipping a node changes which branch edges a path
//! uses, so the second cut is off while visit-flow branches are active.

use std::ops::{Deref, DerefMut};

use starroute_core::{Deadline, Instance, Route, VisitRule};

use crate::{BitSet, EspprcGraph, PricedRoute, PricingDuals, PricingError};

/// Mutable path explored by the pulse search.
#[derive(Debug, Clone)]
pub struct PartialPath {
    nodes: Vec<usize>,
    partial_costs: Vec<f64>,
    cost: f64,
    demand: u32,
    visited_nodes: BitSet,
    visited_customers: BitSet,
}

#[derive(Debug, Clone, Copy)]
enum Undo {
    Node {
        node: usize,
        cost: f64,
    },
    Customer {
        customer: usize,
        cost: f64,
        demand: u32,
        last_partial: Option<f64>,
    },
}

/// Scoped mutation of a [`PartialPath`], undone when the guard drops.
///
/// Undo restores the saved values verbatim rather than subtracting, so no
/// floating-point drift accumulates across the search.
pub struct PathGuard<'p> {
    path: &'p mut PartialPath,
    undo: Undo,
}

impl Deref for PathGuard<'_> {
    type Target = PartialPath;

    fn deref(&self) -> &Self::Target {
        self.path
    }
}

impl DerefMut for PathGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.path
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        match self.undo {
            Undo::Node { node, cost } => {
                self.path.nodes.pop();
                self.path.partial_costs.pop();
                self.path.visited_nodes.remove(node);
                self.path.cost = cost;
            }
            Undo::Customer {
                customer,
                cost,
                demand,
                last_partial,
            } => {
                self.path.visited_customers.remove(customer);
                self.path.cost = cost;
                self.path.demand = demand;
                if let (Some(slot), Some(value)) = (self.path.partial_costs.last_mut(), last_partial)
                {
                    *slot = value;
                }
            }
        }
    }
}

impl PartialPath {
    /// An empty path carrying `cost` and `demand` before its first node.
    #[must_use]
    pub fn new(graph_size: usize, customer_count: usize, cost: f64, demand: u32) -> Self {
        Self {
            nodes: Vec::new(),
            partial_costs: Vec::new(),
            cost,
            demand,
            visited_nodes: BitSet::new(graph_size),
            visited_customers: BitSet::new(customer_count),
        }
    }

    /// Graph nodes in order.
    #[must_use]
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Current reduced cost.
    #[must_use]
    pub const fn cost(&self) -> f64 {
        self.cost
    }

    /// Current demand.
    #[must_use]
    pub const fn demand(&self) -> u32 {
        self.demand
    }

    /// Last graph node, if any.
    #[must_use]
    pub fn last(&self) -> Option<usize> {
        self.nodes.last().copied()
    }

    /// Whether graph node `node` is on the path.
    #[must_use]
    pub fn visits(&self, node: usize) -> bool {
        self.visited_nodes.contains(node)
    }

    /// Whether customer `index` is served.
    #[must_use]
    pub fn serves(&self, index: usize) -> bool {
        self.visited_customers.contains(index)
    }

    /// Append `node`, changing the cost by `delta`.
    pub fn push_node(&mut self, node: usize, delta: f64) -> PathGuard<'_> {
        let undo = Undo::Node {
            node,
            cost: self.cost,
        };
        self.nodes.push(node);
        self.visited_nodes.insert(node);
        self.cost += delta;
        self.partial_costs.push(self.cost);
        PathGuard { path: self, undo }
    }

    /// Serve customer `index` at the current node.
    pub fn serve_customer(&mut self, index: usize, demand: u32, cost: f64) -> PathGuard<'_> {
        let undo = Undo::Customer {
            customer: index,
            cost: self.cost,
            demand: self.demand,
            last_partial: self.partial_costs.last().copied(),
        };
        self.visited_customers.insert(index);
        self.demand = self.demand.saturating_add(demand);
        self.cost = cost;
        if let Some(slot) = self.partial_costs.last_mut() {
            *slot = cost;
        }
        PathGuard { path: self, undo }
    }

    fn moves<'s>(&'s self, graph: &'s EspprcGraph) -> impl Iterator<Item = (usize, usize)> + 's {
        self.nodes
            .windows(2)
            .filter_map(|pair| match *pair {
                [from, to] => Some((graph.to_instance(from), graph.to_instance(to))),
                _ => None,
            })
    }

    /// Whether the path traverses instance edge `start -> end`.
    #[must_use]
    pub fn contains_edge(&self, graph: &EspprcGraph, start: usize, end: usize) -> bool {
        self.moves(graph).any(|(from, to)| from == start && to == end)
    }

    /// Whether the path left `start` other than towards `end`, or entered
    /// `end` from somewhere other than `start`.
    #[must_use]
    pub fn forbids_edge(&self, graph: &EspprcGraph, start: usize, end: usize) -> bool {
        self.moves(graph)
            .any(|(from, to)| (from == start && to != end) || (from != start && to == end))
    }
}

/// Tuning for a pulse run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseSettings {
    /// Demand units per bound bucket; at least one.
    pub bucket_size: u32,
    /// Skip customers whose dual is below epsilon.
    pub prune_unprofitable: bool,
    /// Keep every improving sink path instead of only the best one.
    pub record_improving: bool,
    /// Reduced-cost tolerance.
    pub epsilon: f64,
}

/// Result of one pulse run.
#[derive(Debug, Clone, Default)]
pub struct PulseOutcome {
    /// Recorded paths with negative reduced cost, cheapest first.
    pub columns: Vec<PricedRoute>,
    /// Pulses propagated in both phases.
    pub pulses_propagated: u64,
    /// Whether the deadline cut the search short.
    pub timed_out: bool,
}

#[derive(Debug, Clone)]
struct Snapshot {
    nodes: Vec<usize>,
    customers: Vec<usize>,
    cost: f64,
}

/// One pulse run over a fixed set of duals.
pub struct Pulse<'a> {
    instance: &'a Instance,
    graph: &'a EspprcGraph,
    duals: &'a PricingDuals,
    ordered_customers: &'a [Vec<usize>],
    settings: PulseSettings,
    deadline: &'a Deadline,
    bounds: Vec<Vec<f64>>,
    best: f64,
    recording: bool,
    found: Vec<Snapshot>,
    pulses: u64,
    timed_out: bool,
}

impl<'a> Pulse<'a> {
    /// Prepare a run.
    ///
    /// `ordered_customers` lists, per graph node, the customer indices to try
    /// there in priority order; see [`order_by_benefit`].
    #[must_use]
    pub fn new(
        instance: &'a Instance,
        graph: &'a EspprcGraph,
        duals: &'a PricingDuals,
        ordered_customers: &'a [Vec<usize>],
        settings: PulseSettings,
        deadline: &'a Deadline,
    ) -> Self {
        let buckets = Self::bucket_of(settings.bucket_size, instance.capacity()) + 1;
        Self {
            instance,
            graph,
            duals,
            ordered_customers,
            settings,
            deadline,
            bounds: vec![vec![f64::NEG_INFINITY; buckets]; graph.size()],
            best: f64::INFINITY,
            recording: false,
            found: Vec::new(),
            pulses: 0,
            timed_out: false,
        }
    }

    fn bucket_of(bucket_size: u32, demand: u32) -> usize {
        demand.checked_div(bucket_size.max(1)).unwrap_or(demand) as usize
    }

    /// Run both phases.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] when a recorded path cannot be turned into a
    /// route.
    pub fn run(mut self) -> Result<PulseOutcome, PricingError> {
        self.compute_bounds();
        if !self.timed_out {
            self.best = f64::INFINITY;
            self.found.clear();
            self.recording = true;
            let mut path = PartialPath::new(
                self.graph.size(),
                self.instance.customer_count(),
                self.duals.initial_cost(),
                0,
            );
            self.pulse_node(self.graph.source(), &mut path);
        }
        let columns = self.columns()?;
        Ok(PulseOutcome {
            columns,
            pulses_propagated: self.pulses,
            timed_out: self.timed_out,
        })
    }

    /// Completion bound table, indexed by graph node then demand bucket.
    ///
    /// Entries left at negative infinity were not computed.
    #[must_use]
    pub fn bounds(mut self) -> Vec<Vec<f64>> {
        self.compute_bounds();
        self.bounds
    }

    fn compute_bounds(&mut self) {
        let step = self.settings.bucket_size.max(1);
        let top = Self::bucket_of(step, self.instance.capacity());
        let customer_count = self.instance.customer_count();
        for bucket in (0..=top).rev() {
            let demand = u32::try_from(bucket)
                .unwrap_or(u32::MAX)
                .saturating_mul(step);
            for node in 0..self.graph.size() {
                self.best = f64::INFINITY;
                let mut path = PartialPath::new(self.graph.size(), customer_count, 0.0, demand);
                self.pulse_node(node, &mut path);
                if self.timed_out {
                    log::warn!("pulse bound phase expired at node {node}, bucket {bucket}");
                    return;
                }
                if let Some(entry) = self.bounds.get_mut(node).and_then(|row| row.get_mut(bucket)) {
                    *entry = self.best;
                }
            }
        }
    }

    fn prunes_on_bound(&self, node: usize, cost: f64, demand: u32) -> bool {
        let bucket = Self::bucket_of(self.settings.bucket_size, demand);
        let bound = self
            .bounds
            .get(node)
            .and_then(|row| row.get(bucket))
            .copied()
            .unwrap_or(f64::NEG_INFINITY);
        if bound == f64::INFINITY {
            return true;
        }
        if self.best == f64::INFINITY || bound == f64::NEG_INFINITY {
            return false;
        }
        // Completions are bounded without the prefix, so they miss any
        // branch dual earned by pairing a prefix customer with a later edge.
        cost + bound - self.duals.flow_gain_bound() >= self.best
    }

    fn prunes_on_rollback(&self, next: usize, path: &PartialPath) -> bool {
        let size = path.nodes.len();
        if size <= 1 || self.duals.has_flow_branches() {
            return false;
        }
        let (Some(last), Some(&last_cost)) = (path.last(), path.partial_costs.last()) else {
            return false;
        };
        let Some(weight) = self.graph.edge_weight(last, next) else {
            return false;
        };
        let detour = last_cost + weight;
        path.nodes
            .iter()
            .zip(&path.partial_costs)
            .take(size - 1)
            .any(|(&earlier, &earlier_cost)| {
                self.graph
                    .edge_weight(earlier, next)
                    .is_some_and(|direct| detour >= earlier_cost + direct)
            })
    }

    fn pulse_node(&mut self, next: usize, path: &mut PartialPath) {
        if path.visits(next) {
            return;
        }
        let mut delta = 0.0;
        if let Some(last) = path.last() {
            let Some(weight) = self.graph.edge_weight(last, next) else {
                return;
            };
            let from = self.graph.to_instance(last);
            let to = self.graph.to_instance(next);
            let mut flow_dual = 0.0;
            for branch in self.duals.flow_branches() {
                if !path.serves(branch.customer) {
                    continue;
                }
                let (start, end) = (branch.edge.start, branch.edge.end);
                let violates = match branch.rule {
                    Some(VisitRule::Require) => {
                        (start != from && end == to) || (start == from && end != to)
                    }
                    Some(VisitRule::Forbid) => start == from && end == to,
                    None => false,
                };
                if violates {
                    return;
                }
                if start == from && end == to {
                    flow_dual += branch.dual;
                }
            }
            delta = weight - flow_dual;
        }
        if self.prunes_on_bound(next, path.cost() + delta, path.demand())
            || self.prunes_on_rollback(next, path)
        {
            return;
        }
        let mut guard = path.push_node(next, delta);
        self.propagate(next, &mut guard, 0);
    }

    fn pulse_customer(&mut self, node: usize, customer: usize, rank: usize, path: &mut PartialPath) {
        if path.serves(customer) {
            return;
        }
        let Some(customer_demand) = self.instance.customer(customer).map(|c| c.demand) else {
            return;
        };
        let demand = path.demand().saturating_add(customer_demand);
        if demand > self.instance.capacity() {
            return;
        }
        let dual = self.duals.dual(customer);
        if self.settings.prune_unprofitable && dual < self.settings.epsilon {
            return;
        }
        let mut flow_dual = 0.0;
        for branch in self.duals.branches_for(customer) {
            let (start, end) = (branch.edge.start, branch.edge.end);
            let contains = path.contains_edge(self.graph, start, end);
            let violates = match branch.rule {
                Some(VisitRule::Require) => path.forbids_edge(self.graph, start, end),
                Some(VisitRule::Forbid) => contains,
                None => false,
            };
            if violates {
                return;
            }
            if contains {
                flow_dual += branch.dual;
            }
        }
        let cost = path.cost() - dual - flow_dual;
        if self.prunes_on_bound(node, cost, demand) {
            return;
        }
        let mut guard = path.serve_customer(customer, customer_demand, cost);
        self.propagate(node, &mut guard, rank + 1);
    }

    fn propagate(&mut self, node: usize, path: &mut PartialPath, first_rank: usize) {
        self.pulses += 1;
        if self.timed_out || self.deadline.expired() {
            self.timed_out = true;
            return;
        }
        if node == self.graph.sink() {
            self.reach_sink(path);
            return;
        }
        let ordered = self.ordered_customers;
        let customers = ordered.get(node).map_or(&[][..], Vec::as_slice);
        for (rank, &customer) in customers.iter().enumerate().skip(first_rank) {
            self.pulse_customer(node, customer, rank, path);
        }
        let graph = self.graph;
        for &(next, _) in graph.successors(node) {
            self.pulse_node(next, path);
        }
    }

    fn reach_sink(&mut self, path: &PartialPath) {
        if path.cost() >= self.best {
            return;
        }
        self.best = path.cost();
        if !self.recording || self.best >= -self.settings.epsilon {
            return;
        }
        if !self.settings.record_improving {
            self.found.clear();
        }
        self.found.push(Snapshot {
            nodes: path.nodes().to_vec(),
            customers: path.visited_customers.iter().collect(),
            cost: path.cost(),
        });
    }

    fn columns(&self) -> Result<Vec<PricedRoute>, PricingError> {
        let mut columns = self
            .found
            .iter()
            .map(|snapshot| {
                let nodes = snapshot
                    .nodes
                    .iter()
                    .map(|&n| self.graph.to_instance(n))
                    .collect();
                let customers = snapshot
                    .customers
                    .iter()
                    .map(|&index| {
                        self.instance
                            .customer(index)
                            .map(|c| c.node)
                            .ok_or(PricingError::UnknownCustomer { customer: index })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PricedRoute {
                    route: Route::through(self.instance, nodes, customers)?,
                    reduced_cost: snapshot.cost,
                })
            })
            .collect::<Result<Vec<_>, PricingError>>()?;
        columns.sort_by(|a, b| a.reduced_cost.total_cmp(&b.reduced_cost));
        Ok(columns)
    }
}

/// Customer indices per graph node, by decreasing dual per unit of demand.
///
/// Trying the most rewarding customers first tightens the best known cost
/// early, which strengthens the bound cut. Zero-demand customers come first.
#[must_use]
pub fn order_by_benefit(graph: &EspprcGraph, instance: &Instance, duals: &PricingDuals) -> Vec<Vec<usize>> {
    let benefit = |index: usize| {
        let dual = duals.dual(index);
        match instance.customer(index).map(|c| c.demand) {
            Some(0) | None => f64::INFINITY,
            Some(demand) => dual / f64::from(demand),
        }
    };
    (0..graph.size())
        .map(|node| {
            let mut customers = graph.reverse_neighbourhood(node).to_vec();
            customers.sort_by(|&a, &b| benefit(b).total_cmp(&benefit(a)).then_with(|| a.cmp(&b)));
            customers
        })
        .collect()
}

#[cfg(test)]
mod tests;
