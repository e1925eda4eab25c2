//! Depot-to-depot routes used as master-problem columns.
//!
//! A route records the visited nodes, the weight of each traversed edge and
//! the set of customers it serves. Serving a customer does not move the
//! vehicle, so the customer set is independent of the node sequence beyond
//! the requirement that each customer be servable from some visited node.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::{Edge, Instance};

/// Errors raised when constructing a [`Route`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// A route needs at least the depot twice.
    #[error("route must contain at least two nodes, got {len}")]
    TooShort {
        /// Number of nodes supplied.
        len: usize,
    },
    /// The route does not start and end at the same node.
    #[error("route must start and end at the same node, got {first} and {last}")]
    NotClosed {
        /// First node.
        first: usize,
        /// Last node.
        last: usize,
    },
    /// The route does not start and end at the instance depot.
    #[error("route must start and end at depot {depot}")]
    NotDepotBounded {
        /// Depot the route should be anchored at.
        depot: usize,
    },
    /// The weight list does not match the number of edges.
    #[error("route with {nodes} nodes cannot carry {weights} edge weights")]
    WeightCountMismatch {
        /// Number of nodes.
        nodes: usize,
        /// Number of weights supplied.
        weights: usize,
    },
    /// Two consecutive nodes are not joined by an edge.
    #[error("instance has no edge {from}->{to}")]
    MissingEdge {
        /// Tail node.
        from: usize,
        /// Head node.
        to: usize,
    },
    /// A served node is not a customer of the instance.
    #[error("node {node} is not a customer")]
    UnknownCustomer {
        /// Offending node.
        node: usize,
    },
}

/// An ordered depot-to-depot path with its served customers.
///
/// # Examples
///
/// ```
/// use starroute_core::Route;
///
/// # fn main() -> Result<(), starroute_core::RouteError> {
/// let route = Route::new(vec![0, 1, 2, 0], vec![2.0, 1.0, 2.0], [1, 2])?;
/// assert_eq!(route.cost(), 5.0);
/// assert!(route.serves(2));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Route {
    nodes: Vec<usize>,
    weights: Vec<f64>,
    customers: BTreeSet<usize>,
    cost: f64,
}

impl Route {
    /// Build a route from explicit nodes and edge weights.
    ///
    /// The cost is the sum of `weights`.
    pub fn new(
        nodes: Vec<usize>,
        weights: Vec<f64>,
        customers: impl IntoIterator<Item = usize>,
    ) -> Result<Self, RouteError> {
        let (Some(&first), Some(&last)) = (nodes.first(), nodes.last()) else {
            return Err(RouteError::TooShort { len: nodes.len() });
        };
        if nodes.len() < 2 {
            return Err(RouteError::TooShort { len: nodes.len() });
        }
        if first != last {
            return Err(RouteError::NotClosed { first, last });
        }
        if weights.len() + 1 != nodes.len() {
            return Err(RouteError::WeightCountMismatch {
                nodes: nodes.len(),
                weights: weights.len(),
            });
        }
        let cost = weights.iter().sum();
        Ok(Self {
            nodes,
            weights,
            customers: customers.into_iter().collect(),
            cost,
        })
    }

    /// Build a route whose weights are read from `instance`.
    ///
    /// Fails when the path leaves the depot, uses a missing edge or serves a
    /// node that is not a customer.
    pub fn through(
        instance: &Instance,
        nodes: Vec<usize>,
        customers: impl IntoIterator<Item = usize>,
    ) -> Result<Self, RouteError> {
        let depot = instance.depot();
        if nodes.len() < 2 {
            return Err(RouteError::TooShort { len: nodes.len() });
        }
        if nodes.first() != Some(&depot) || nodes.last() != Some(&depot) {
            return Err(RouteError::NotDepotBounded { depot });
        }
        let weights = nodes
            .windows(2)
            .map(|pair| match *pair {
                [from, to] => instance
                    .edge_weight(from, to)
                    .ok_or(RouteError::MissingEdge { from, to }),
                _ => Err(RouteError::TooShort { len: pair.len() }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let served: BTreeSet<usize> = customers.into_iter().collect();
        if let Some(&node) = served.iter().find(|&&c| !instance.is_customer(c)) {
            return Err(RouteError::UnknownCustomer { node });
        }
        Self::new(nodes, weights, served)
    }

    /// Visited nodes, first and last being the depot.
    #[must_use]
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Weight of each traversed edge.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Customer nodes served by the route.
    #[must_use]
    pub const fn customers(&self) -> &BTreeSet<usize> {
        &self.customers
    }

    /// Sum of edge weights.
    #[must_use]
    pub const fn cost(&self) -> f64 {
        self.cost
    }

    /// Whether the route serves the customer at `node`.
    #[must_use]
    pub fn serves(&self, node: usize) -> bool {
        self.customers.contains(&node)
    }

    /// Traversed edges in order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.nodes
            .windows(2)
            .filter_map(|pair| match *pair {
                [start, end] => Some(Edge::new(start, end)),
                _ => None,
            })
    }

    /// Whether the route traverses `edge`.
    #[must_use]
    pub fn contains_edge(&self, edge: Edge) -> bool {
        self.edges().any(|e| e == edge)
    }

    /// Whether the route only leaves the depot and comes straight back.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// Total demand of the served customers.
    #[must_use]
    pub fn demand(&self, instance: &Instance) -> u32 {
        instance.total_demand(&self.customers)
    }

    /// Same path with no customers attached.
    #[must_use]
    pub fn copy_without_customers(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            weights: self.weights.clone(),
            customers: BTreeSet::new(),
            cost: self.cost,
        }
    }

    /// Replace the served customer set, keeping the path.
    #[must_use]
    pub fn with_customers(mut self, customers: impl IntoIterator<Item = usize>) -> Self {
        self.customers = customers.into_iter().collect();
        self
    }

    /// Whether two routes describe the same column.
    #[must_use]
    pub fn same_column(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.customers == other.customers
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nodes = self.nodes.iter();
        if let Some(first) = nodes.next() {
            write!(f, "{first}")?;
        }
        for node in nodes {
            write!(f, " -> {node}")?;
        }
        write!(f, " serving {:?} (cost {})", self.customers, self.cost)
    }
}
