//! Dominance containers for the label-setting search.
//!
//! A container remembers the labels accepted at each graph node and decides
//! whether a new label is dominated by one of them. The exact container
//! compares visited sets; the relaxed one only compares demand.

use std::collections::HashMap;

use crate::{BitSet, Label, LabelId, MinSegmentTree};

/// Strategy deciding which labels survive at each node.
pub trait LabelContainer {
    /// Record an accepted label.
    fn insert(&mut self, id: LabelId, label: &Label);

    /// Whether a stored label makes `label` redundant.
    fn dominates(&self, label: &Label) -> bool;

    /// Stored labels at `node` with their costs.
    fn labels_at(&self, node: usize) -> Vec<(LabelId, f64)>;
}

#[derive(Debug, Clone, Copy)]
struct Stored {
    id: LabelId,
    cost: f64,
}

/// Elementary dominance over visited-node and visited-customer sets.
///
/// A stored label dominates a candidate at the same node when both of its
/// visited sets are subsets of the candidate's and it is cheaper by more
/// than `epsilon`. The relation is transitive and never holds between a
/// label and itself.
#[derive(Debug)]
pub struct ExactLabelContainer {
    epsilon: f64,
    nodes: Vec<HashMap<BitSet, HashMap<BitSet, Stored>>>,
}

impl ExactLabelContainer {
    /// Container for a graph of `size` nodes.
    #[must_use]
    pub fn new(size: usize, epsilon: f64) -> Self {
        Self {
            epsilon,
            nodes: vec![HashMap::new(); size],
        }
    }
}

impl LabelContainer for ExactLabelContainer {
    fn insert(&mut self, id: LabelId, label: &Label) {
        if let Some(buckets) = self.nodes.get_mut(label.node) {
            buckets
                .entry(label.visited_nodes.clone())
                .or_default()
                .insert(
                    label.visited_customers.clone(),
                    Stored {
                        id,
                        cost: label.cost,
                    },
                );
        }
    }

    fn dominates(&self, label: &Label) -> bool {
        let Some(buckets) = self.nodes.get(label.node) else {
            return false;
        };
        buckets
            .iter()
            .filter(|(visited_nodes, _)| visited_nodes.is_subset(&label.visited_nodes))
            .flat_map(|(_, by_customers)| by_customers.iter())
            .any(|(visited_customers, stored)| {
                visited_customers.is_subset(&label.visited_customers)
                    && stored.cost + self.epsilon < label.cost
            })
    }

    fn labels_at(&self, node: usize) -> Vec<(LabelId, f64)> {
        self.nodes
            .get(node)
            .into_iter()
            .flat_map(HashMap::values)
            .flat_map(HashMap::values)
            .map(|s| (s.id, s.cost))
            .collect()
    }
}

/// Demand-only dominance, one range-minimum tree per node.
///
/// A candidate is dominated when some stored label at its node with no
/// more demand is strictly cheaper. At most one label is kept per
/// `(node, demand)` slot.
#[derive(Debug)]
pub struct RelaxedLabelContainer {
    slots: Vec<Vec<Option<Stored>>>,
    trees: Vec<MinSegmentTree>,
}

impl RelaxedLabelContainer {
    /// Container for a graph of `size` nodes and vehicle capacity `capacity`.
    #[must_use]
    pub fn new(size: usize, capacity: u32) -> Self {
        let width = capacity as usize + 1;
        Self {
            slots: vec![vec![None; width]; size],
            trees: vec![MinSegmentTree::new(width); size],
        }
    }
}

impl LabelContainer for RelaxedLabelContainer {
    fn insert(&mut self, id: LabelId, label: &Label) {
        let demand = label.demand as usize;
        if let Some(slot) = self
            .slots
            .get_mut(label.node)
            .and_then(|slots| slots.get_mut(demand))
        {
            *slot = Some(Stored {
                id,
                cost: label.cost,
            });
        }
        if let Some(tree) = self.trees.get_mut(label.node) {
            tree.update(demand, label.cost);
        }
    }

    fn dominates(&self, label: &Label) -> bool {
        self.trees
            .get(label.node)
            .is_some_and(|tree| tree.query(0, label.demand as usize + 1) < label.cost)
    }

    fn labels_at(&self, node: usize) -> Vec<(LabelId, f64)> {
        self.slots
            .get(node)
            .into_iter()
            .flatten()
            .flatten()
            .map(|s| (s.id, s.cost))
            .collect()
    }
}
