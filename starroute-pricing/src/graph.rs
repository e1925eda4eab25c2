//! Pricing graph with a distinct sink standing in for the return to the depot.
//!
//! Graph ids `0..N` are the instance nodes, the depot doubling as the source.
//! The sink gets id `N`. No edge enters the source and none leaves the sink,
//! so a path can never close a zero-length loop through the depot.

use starroute_core::Instance;

/// ESPPRC graph derived from an [`Instance`].
#[derive(Debug, Clone)]
pub struct EspprcGraph {
    depot: usize,
    sink: usize,
    successors: Vec<Vec<(usize, f64)>>,
    reverse_neighbourhoods: Vec<Vec<usize>>,
}

impl EspprcGraph {
    /// Build the graph for `instance`.
    #[must_use]
    pub fn new(instance: &Instance) -> Self {
        let depot = instance.depot();
        let sink = instance.node_count();
        let mut successors = Vec::with_capacity(sink + 1);
        let mut reverse_neighbourhoods = Vec::with_capacity(sink + 1);
        for node in instance.nodes() {
            let mut out: Vec<(usize, f64)> = instance
                .successors(node)
                .filter(|&(head, _)| head != depot)
                .collect();
            if node != depot {
                if let Some(weight) = instance.edge_weight(node, depot) {
                    out.push((sink, weight));
                }
            }
            successors.push(out);
            reverse_neighbourhoods.push(
                instance
                    .reverse_neighbourhood(node)
                    .iter()
                    .filter_map(|&customer| instance.customer_index(customer))
                    .collect(),
            );
        }
        successors.push(Vec::new());
        reverse_neighbourhoods.push(Vec::new());
        Self {
            depot,
            sink,
            successors,
            reverse_neighbourhoods,
        }
    }

    /// Number of graph nodes, sink included.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.sink + 1
    }

    /// Source id; equal to the depot.
    #[must_use]
    pub const fn source(&self) -> usize {
        self.depot
    }

    /// Sink id.
    #[must_use]
    pub const fn sink(&self) -> usize {
        self.sink
    }

    /// Instance node behind a graph id; the sink maps to the depot.
    #[must_use]
    pub const fn to_instance(&self, node: usize) -> usize {
        if node == self.sink { self.depot } else { node }
    }

    /// Outgoing edges of `node` as `(head, weight)` pairs.
    #[must_use]
    pub fn successors(&self, node: usize) -> &[(usize, f64)] {
        self.successors.get(node).map_or(&[], Vec::as_slice)
    }

    /// Weight of `from -> to` in the pricing graph.
    #[must_use]
    pub fn edge_weight(&self, from: usize, to: usize) -> Option<f64> {
        self.successors(from)
            .iter()
            .find(|&&(head, _)| head == to)
            .map(|&(_, weight)| weight)
    }

    /// Dense indices of the customers servable at `node`.
    #[must_use]
    pub fn reverse_neighbourhood(&self, node: usize) -> &[usize] {
        self.reverse_neighbourhoods
            .get(node)
            .map_or(&[], Vec::as_slice)
    }
}
