//! Labels and the arena that owns them.
//!
//! A label is an immutable record of a partial path. Its parent link is an
//! index into the [`LabelArena`], so walking back to the source never chases
//! a pointer and the whole chain is freed at once with the arena.

use starroute_core::{Instance, Route};

use crate::{BitSet, EspprcGraph, PricingError};

/// Index of a label inside a [`LabelArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelId(pub(crate) usize);

impl LabelId {
    /// Arena position.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A partial-path state of the label-setting search.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// Current graph node.
    pub node: usize,
    /// Accumulated reduced cost.
    pub cost: f64,
    /// Accumulated demand.
    pub demand: u32,
    /// Graph nodes on the path.
    pub visited_nodes: BitSet,
    /// Dense indices of the served customers.
    pub visited_customers: BitSet,
    /// Label this one was extended from.
    pub parent: Option<LabelId>,
}

impl Label {
    /// The label sitting at `source` before any move.
    #[must_use]
    pub fn root(graph: &EspprcGraph, customer_count: usize, cost: f64) -> Self {
        let mut visited_nodes = BitSet::new(graph.size());
        visited_nodes.insert(graph.source());
        Self {
            node: graph.source(),
            cost,
            demand: 0,
            visited_nodes,
            visited_customers: BitSet::new(customer_count),
            parent: None,
        }
    }
}

/// Append-only store of labels.
#[derive(Debug, Default)]
pub struct LabelArena {
    labels: Vec<Label>,
}

impl LabelArena {
    /// An empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self { labels: Vec::new() }
    }

    /// Store `label` and return its id.
    pub fn push(&mut self, label: Label) -> LabelId {
        self.labels.push(label);
        LabelId(self.labels.len() - 1)
    }

    /// Look up a label.
    #[must_use]
    pub fn get(&self, id: LabelId) -> Option<&Label> {
        self.labels.get(id.0)
    }

    /// Number of stored labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels from `id` back to the root, `id` first.
    pub fn chain(&self, id: LabelId) -> impl Iterator<Item = &Label> + '_ {
        std::iter::successors(self.get(id), move |label| {
            label.parent.and_then(|parent| self.get(parent))
        })
    }

    /// Consecutive `(from, to)` node moves on the chain ending at `id`, last
    /// move first, in instance node ids.
    fn moves<'s>(
        &'s self,
        id: LabelId,
        graph: &'s EspprcGraph,
    ) -> impl Iterator<Item = (usize, usize)> + 's {
        let children = self.chain(id);
        let parents = self.chain(id).skip(1);
        children
            .zip(parents)
            .filter(|(child, parent)| child.node != parent.node)
            .map(|(child, parent)| (graph.to_instance(parent.node), graph.to_instance(child.node)))
    }

    /// Whether the path of `id` traverses `start -> end`.
    #[must_use]
    pub fn contains_edge(&self, id: LabelId, graph: &EspprcGraph, start: usize, end: usize) -> bool {
        self.moves(id, graph).any(|(from, to)| from == start && to == end)
    }

    /// Whether the path of `id` left `start` other than towards `end`, or
    /// entered `end` from somewhere other than `start`.
    #[must_use]
    pub fn forbids_edge(&self, id: LabelId, graph: &EspprcGraph, start: usize, end: usize) -> bool {
        self.moves(id, graph)
            .any(|(from, to)| (from == start && to != end) || (from != start && to == end))
    }

    /// Instance nodes of the path ending at `id`, in travel order.
    pub fn path(&self, id: LabelId, graph: &EspprcGraph) -> Result<Vec<usize>, PricingError> {
        let mut nodes = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let label = self.get(current).ok_or(PricingError::BrokenParentChain {
                label: current.index(),
            })?;
            if nodes.last() != Some(&label.node) {
                nodes.push(label.node);
            }
            cursor = label.parent;
        }
        nodes.reverse();
        Ok(nodes.into_iter().map(|n| graph.to_instance(n)).collect())
    }

    /// Rebuild the route represented by label `id`.
    pub fn to_route(
        &self,
        id: LabelId,
        graph: &EspprcGraph,
        instance: &Instance,
    ) -> Result<Route, PricingError> {
        let label = self
            .get(id)
            .ok_or(PricingError::BrokenParentChain { label: id.index() })?;
        let customers = label
            .visited_customers
            .iter()
            .map(|index| {
                instance
                    .customer(index)
                    .map(|c| c.node)
                    .ok_or(PricingError::UnknownCustomer { customer: index })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Route::through(instance, self.path(id, graph)?, customers)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use starroute_core::test_support::two_customer_instance;

    struct Chain {
        instance: Instance,
        graph: EspprcGraph,
        arena: LabelArena,
        tip: LabelId,
    }

    fn extend(arena: &mut LabelArena, from: LabelId, node: usize, customer: Option<usize>) -> LabelId {
        let mut label = arena.get(from).expect("parent exists").clone();
        label.node = node;
        label.visited_nodes.insert(node);
        if let Some(c) = customer {
            label.visited_customers.insert(c);
        }
        label.parent = Some(from);
        arena.push(label)
    }

    /// Source, node 1, serve customer 0, node 2, serve customer 1, sink.
    #[fixture]
    fn chain() -> Chain {
        let instance = two_customer_instance();
        let graph = EspprcGraph::new(&instance);
        let mut arena = LabelArena::new();
        let root = arena.push(Label::root(&graph, 2, 0.0));
        let at_one = extend(&mut arena, root, 1, None);
        let served_one = extend(&mut arena, at_one, 1, Some(0));
        let at_two = extend(&mut arena, served_one, 2, None);
        let served_two = extend(&mut arena, at_two, 2, Some(1));
        let tip = extend(&mut arena, served_two, graph.sink(), None);
        Chain {
            instance,
            graph,
            arena,
            tip,
        }
    }

    #[rstest]
    fn path_merges_customer_steps_and_maps_the_sink(chain: Chain) {
        let path = chain.arena.path(chain.tip, &chain.graph).expect("intact chain");
        assert_eq!(path, vec![0, 1, 2, 0]);
    }

    #[rstest]
    fn to_route_uses_instance_weights(chain: Chain) {
        let route = chain
            .arena
            .to_route(chain.tip, &chain.graph, &chain.instance)
            .expect("valid route");
        assert_eq!(route.cost(), 5.0);
        assert!(route.serves(1) && route.serves(2));
    }

    #[rstest]
    #[case(1, 2, true)]
    #[case(2, 0, true)]
    #[case(2, 1, false)]
    #[case(1, 1, false)]
    fn contains_edge_ignores_customer_steps(
        chain: Chain,
        #[case] start: usize,
        #[case] end: usize,
        #[case] expected: bool,
    ) {
        assert_eq!(chain.arena.contains_edge(chain.tip, &chain.graph, start, end), expected);
    }

    #[rstest]
    #[case(1, 2, false)]
    #[case(0, 2, true)]
    #[case(2, 1, true)]
    fn forbids_edge_detects_other_moves(
        chain: Chain,
        #[case] start: usize,
        #[case] end: usize,
        #[case] expected: bool,
    ) {
        assert_eq!(chain.arena.forbids_edge(chain.tip, &chain.graph, start, end), expected);
    }
}
