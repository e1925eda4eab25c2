//! Label-setting search for the elementary shortest path with resource
//! constraints.
//!
//! Labels are popped in ascending cost order. A label at node `u` is extended
//! by serving a customer available at `u` (the vehicle stays put) or by moving
//! along an edge. Which labels survive is decided by the [`LabelContainer`]
//! strategy.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use starroute_core::{Deadline, Instance, VisitRule};

use crate::{
    EspprcGraph, Label, LabelArena, LabelContainer, LabelId, PricedRoute, PricingDuals,
    PricingError,
};

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    cost: f64,
    id: LabelId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Reversed so the max-heap pops the cheapest label, oldest first on ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Result of one label-setting run.
#[derive(Debug, Clone, Default)]
pub struct LabelingOutcome {
    /// Sink labels with negative reduced cost, cheapest first.
    pub columns: Vec<PricedRoute>,
    /// Labels popped from the queue.
    pub labels_processed: u64,
    /// Whether the deadline cut the search short.
    pub timed_out: bool,
}

/// One label-setting run over a fixed set of duals.
pub struct LabelSetting<'a, C: LabelContainer> {
    instance: &'a Instance,
    graph: &'a EspprcGraph,
    duals: &'a PricingDuals,
    container: C,
    arena: LabelArena,
    epsilon: f64,
    prune_unprofitable: bool,
}

impl<'a, C: LabelContainer> LabelSetting<'a, C> {
    /// Prepare a run using `container` for dominance.
    #[must_use]
    pub const fn new(
        instance: &'a Instance,
        graph: &'a EspprcGraph,
        duals: &'a PricingDuals,
        container: C,
        epsilon: f64,
    ) -> Self {
        Self {
            instance,
            graph,
            duals,
            container,
            arena: LabelArena::new(),
            epsilon,
            prune_unprofitable: false,
        }
    }

    /// Skip customers whose dual is below epsilon.
    ///
    /// Such customers never lower a path's reduced cost on their own, but
    /// skipping them is a heuristic: it can hide columns that need them to
    /// satisfy a branch.
    #[must_use]
    pub const fn prune_unprofitable(mut self, enabled: bool) -> Self {
        self.prune_unprofitable = enabled;
        self
    }

    /// Run until the queue empties or `deadline` expires.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] when a surviving sink label cannot be turned
    /// back into a route.
    pub fn run(mut self, deadline: &Deadline) -> Result<LabelingOutcome, PricingError> {
        let root = Label::root(
            self.graph,
            self.instance.customer_count(),
            self.duals.initial_cost(),
        );
        let mut queue = BinaryHeap::new();
        self.accept(root, &mut queue);

        let mut outcome = LabelingOutcome::default();
        while let Some(entry) = queue.pop() {
            outcome.labels_processed += 1;
            if deadline.expired() {
                outcome.timed_out = true;
                break;
            }
            let Some(label) = self.arena.get(entry.id) else {
                return Err(PricingError::BrokenParentChain {
                    label: entry.id.index(),
                });
            };
            if self.container.dominates(label) {
                continue;
            }
            let mut extensions = self.customer_extensions(entry.id, label);
            extensions.extend(self.node_extensions(entry.id, label));
            for next in extensions {
                if !self.container.dominates(&next) {
                    self.accept(next, &mut queue);
                }
            }
        }

        outcome.columns = self.negative_columns()?;
        Ok(outcome)
    }

    fn accept(&mut self, label: Label, queue: &mut BinaryHeap<QueueEntry>) {
        let cost = label.cost;
        let node = label.node;
        let id = self.arena.push(label);
        if let Some(stored) = self.arena.get(id) {
            self.container.insert(id, stored);
        }
        log::trace!("label {} at node {node} with cost {cost}", id.index());
        queue.push(QueueEntry { cost, id });
    }

    fn customer_extensions(&self, id: LabelId, label: &Label) -> Vec<Label> {
        let capacity = self.instance.capacity();
        let mut extensions = Vec::new();
        for &customer in self.graph.reverse_neighbourhood(label.node) {
            if label.visited_customers.contains(customer) {
                continue;
            }
            let Some(demand) = self
                .instance
                .customer(customer)
                .map(|c| label.demand.saturating_add(c.demand))
                .filter(|&d| d <= capacity)
            else {
                continue;
            };
            let dual = self.duals.dual(customer);
            if self.prune_unprofitable && dual < self.epsilon {
                continue;
            }
            let mut flow_dual = 0.0;
            let mut violates = false;
            for branch in self.duals.branches_for(customer) {
                let (start, end) = (branch.edge.start, branch.edge.end);
                let contains = self.arena.contains_edge(id, self.graph, start, end);
                violates |= match branch.rule {
                    Some(VisitRule::Require) => self.arena.forbids_edge(id, self.graph, start, end),
                    Some(VisitRule::Forbid) => contains,
                    None => false,
                };
                if contains {
                    flow_dual += branch.dual;
                }
            }
            if violates {
                continue;
            }
            let mut visited_customers = label.visited_customers.clone();
            visited_customers.insert(customer);
            extensions.push(Label {
                node: label.node,
                cost: label.cost - dual - flow_dual,
                demand,
                visited_nodes: label.visited_nodes.clone(),
                visited_customers,
                parent: Some(id),
            });
        }
        extensions
    }

    fn node_extensions(&self, id: LabelId, label: &Label) -> Vec<Label> {
        let from = self.graph.to_instance(label.node);
        let mut extensions = Vec::new();
        for &(next, weight) in self.graph.successors(label.node) {
            if label.visited_nodes.contains(next) {
                continue;
            }
            let to = self.graph.to_instance(next);
            let mut flow_dual = 0.0;
            let mut violates = false;
            for branch in self.duals.flow_branches() {
                if !label.visited_customers.contains(branch.customer) {
                    continue;
                }
                let (start, end) = (branch.edge.start, branch.edge.end);
                violates |= match branch.rule {
                    Some(VisitRule::Require) => {
                        (start != from && end == to) || (start == from && end != to)
                    }
                    Some(VisitRule::Forbid) => start == from && end == to,
                    None => false,
                };
                if start == from && end == to {
                    flow_dual += branch.dual;
                }
            }
            if violates {
                continue;
            }
            let mut visited_nodes = label.visited_nodes.clone();
            visited_nodes.insert(next);
            extensions.push(Label {
                node: next,
                cost: label.cost + weight - flow_dual,
                demand: label.demand,
                visited_nodes,
                visited_customers: label.visited_customers.clone(),
                parent: Some(id),
            });
        }
        extensions
    }

    fn negative_columns(&self) -> Result<Vec<PricedRoute>, PricingError> {
        let mut sink_labels: Vec<(LabelId, f64)> = self
            .container
            .labels_at(self.graph.sink())
            .into_iter()
            .filter(|&(_, cost)| cost < -self.epsilon)
            .collect();
        sink_labels.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        sink_labels
            .into_iter()
            .map(|(id, reduced_cost)| {
                Ok(PricedRoute {
                    route: self.arena.to_route(id, self.graph, self.instance)?,
                    reduced_cost,
                })
            })
            .collect()
    }
}
