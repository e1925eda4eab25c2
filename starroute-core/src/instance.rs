//! Read-only star-routing problem data.
//!
//! An [`Instance`] is an asymmetric weighted graph with a depot, a fleet of
//! identical vehicles and a list of customers. Each customer carries a
//! *neighbourhood*: the nodes whose visit counts as serving it. The reverse
//! lookup, from a node to the customers servable there, is precomputed at
//! construction.

use std::collections::BTreeSet;
use std::ops::Range;

use thiserror::Error;

/// A customer located at a node of the graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Customer {
    /// Node at which the customer lives.
    pub node: usize,
    /// Capacity consumed when the customer is served.
    pub demand: u32,
    /// Nodes whose visit serves the customer.
    pub neighbourhood: Vec<usize>,
}

/// A directed weighted edge in an [`InstanceDescription`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeDescription {
    /// Tail node.
    pub from: usize,
    /// Head node.
    pub to: usize,
    /// Travel cost; finite and non-negative.
    pub weight: f64,
}

/// Plain, serialisable form of an [`Instance`].
///
/// Loading an instance from JSON goes through this type, so the same
/// validation applies whichever way the instance is built.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceDescription {
    /// Number of nodes; node ids are `0..node_count`.
    pub node_count: usize,
    /// Depot node id.
    pub depot: usize,
    /// Fleet size `K`.
    pub vehicles: u32,
    /// Vehicle capacity `Q`.
    pub capacity: u32,
    /// Whether fewer than `K` routes may be used.
    #[cfg_attr(feature = "serde", serde(default))]
    pub allow_unused_vehicles: bool,
    /// Customers in their canonical order.
    pub customers: Vec<Customer>,
    /// Directed edges; absent pairs are not traversable.
    pub edges: Vec<EdgeDescription>,
}

/// Errors returned when an [`Instance`] fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstanceError {
    /// The graph has no nodes.
    #[error("instance must contain at least one node")]
    EmptyGraph,
    /// The fleet is empty.
    #[error("instance must provide at least one vehicle")]
    NoVehicles,
    /// The depot id does not name a node.
    #[error("depot {depot} is outside the node range 0..{node_count}")]
    DepotOutOfRange {
        /// Requested depot id.
        depot: usize,
        /// Number of nodes in the graph.
        node_count: usize,
    },
    /// A customer, neighbour or edge endpoint does not name a node.
    #[error("node {node} is outside the node range 0..{node_count}")]
    NodeOutOfRange {
        /// Offending node id.
        node: usize,
        /// Number of nodes in the graph.
        node_count: usize,
    },
    /// The depot was declared as a customer.
    #[error("depot {depot} cannot be a customer")]
    DepotIsCustomer {
        /// Depot node id.
        depot: usize,
    },
    /// The same node was declared as a customer twice.
    #[error("customer at node {node} is declared more than once")]
    DuplicateCustomer {
        /// Node id declared twice.
        node: usize,
    },
    /// An edge starts and ends at the same node.
    #[error("self-loop at node {node} is not allowed")]
    SelfLoop {
        /// Node carrying the loop.
        node: usize,
    },
    /// An edge weight is negative or not finite.
    #[error("edge {from}->{to} has invalid weight {weight}")]
    InvalidWeight {
        /// Tail node.
        from: usize,
        /// Head node.
        to: usize,
        /// Rejected weight.
        weight: f64,
    },
}

/// Immutable star-routing instance.
///
/// # Examples
///
/// ```
/// use starroute_core::InstanceBuilder;
///
/// # fn main() -> Result<(), starroute_core::InstanceError> {
/// let instance = InstanceBuilder::new(3, 0)
///     .vehicles(1)
///     .capacity(10)
///     .customer(1, 4, [1, 2])
///     .symmetric_edge(0, 1, 3.0)
///     .symmetric_edge(0, 2, 2.0)
///     .build()?;
/// assert_eq!(instance.reverse_neighbourhood(2), &[1]);
/// assert_eq!(instance.edge_weight(1, 0), Some(3.0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "InstanceDescription", into = "InstanceDescription")
)]
pub struct Instance {
    node_count: usize,
    depot: usize,
    vehicles: u32,
    capacity: u32,
    allow_unused_vehicles: bool,
    customers: Vec<Customer>,
    customer_index: Vec<Option<usize>>,
    weights: Vec<Option<f64>>,
    reverse_neighbourhoods: Vec<Vec<usize>>,
}

impl Instance {
    /// Number of nodes in the graph.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.node_count
    }

    /// Node ids `0..node_count`.
    #[must_use]
    pub const fn nodes(&self) -> Range<usize> {
        0..self.node_count
    }

    /// Depot node id.
    #[must_use]
    pub const fn depot(&self) -> usize {
        self.depot
    }

    /// Fleet size `K`.
    #[must_use]
    pub const fn vehicles(&self) -> u32 {
        self.vehicles
    }

    /// Vehicle capacity `Q`.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Whether solutions may use fewer than [`Self::vehicles`] routes.
    #[must_use]
    pub const fn allow_unused_vehicles(&self) -> bool {
        self.allow_unused_vehicles
    }

    /// Customers in canonical order; the position is the customer index.
    #[must_use]
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// Number of customers.
    #[must_use]
    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    /// Customer at a dense customer index.
    #[must_use]
    pub fn customer(&self, index: usize) -> Option<&Customer> {
        self.customers.get(index)
    }

    /// Dense index of the customer located at `node`.
    #[must_use]
    pub fn customer_index(&self, node: usize) -> Option<usize> {
        self.customer_index.get(node).copied().flatten()
    }

    /// Whether a customer lives at `node`.
    #[must_use]
    pub fn is_customer(&self, node: usize) -> bool {
        self.customer_index(node).is_some()
    }

    /// Demand of the customer at `node`.
    #[must_use]
    pub fn demand(&self, node: usize) -> Option<u32> {
        self.customer_index(node)
            .and_then(|index| self.customers.get(index))
            .map(|customer| customer.demand)
    }

    /// Total demand of a set of customer nodes. Unknown nodes count as zero.
    #[must_use]
    pub fn total_demand<'c>(&self, customers: impl IntoIterator<Item = &'c usize>) -> u32 {
        customers
            .into_iter()
            .filter_map(|&node| self.demand(node))
            .fold(0_u32, u32::saturating_add)
    }

    /// Weight of the edge `from -> to`, or `None` when the edge is absent.
    #[must_use]
    pub fn edge_weight(&self, from: usize, to: usize) -> Option<f64> {
        if from >= self.node_count || to >= self.node_count {
            return None;
        }
        self.weights
            .get(from * self.node_count + to)
            .copied()
            .flatten()
    }

    /// Outgoing edges of `node` as `(head, weight)` pairs.
    pub fn successors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let row = if node < self.node_count {
            self.weights
                .get(node * self.node_count..(node + 1) * self.node_count)
                .unwrap_or_default()
        } else {
            &[]
        };
        row.iter()
            .enumerate()
            .filter_map(|(head, weight)| weight.map(|w| (head, w)))
    }

    /// Nodes whose visit serves the customer at `customer`.
    ///
    /// Returns an empty slice when no customer lives at that node.
    #[must_use]
    pub fn neighbourhood(&self, customer: usize) -> &[usize] {
        self.customer_index(customer)
            .and_then(|index| self.customers.get(index))
            .map_or(&[], |c| c.neighbourhood.as_slice())
    }

    /// Customer nodes servable by visiting `node`, in customer-index order.
    #[must_use]
    pub fn reverse_neighbourhood(&self, node: usize) -> &[usize] {
        self.reverse_neighbourhoods
            .get(node)
            .map_or(&[], Vec::as_slice)
    }

    /// Sum of every edge weight, used to scale penalties and tie-breakers.
    #[must_use]
    pub fn total_edge_weight(&self) -> f64 {
        self.weights.iter().flatten().sum()
    }

    /// Convert into the plain serialisable description.
    #[must_use]
    pub fn describe(&self) -> InstanceDescription {
        let edges = self
            .nodes()
            .flat_map(|from| {
                self.successors(from)
                    .map(move |(to, weight)| EdgeDescription { from, to, weight })
            })
            .collect();
        InstanceDescription {
            node_count: self.node_count,
            depot: self.depot,
            vehicles: self.vehicles,
            capacity: self.capacity,
            allow_unused_vehicles: self.allow_unused_vehicles,
            customers: self.customers.clone(),
            edges,
        }
    }

    fn from_description(description: InstanceDescription) -> Result<Self, InstanceError> {
        let InstanceDescription {
            node_count,
            depot,
            vehicles,
            capacity,
            allow_unused_vehicles,
            customers,
            edges,
        } = description;
        if node_count == 0 {
            return Err(InstanceError::EmptyGraph);
        }
        if vehicles == 0 {
            return Err(InstanceError::NoVehicles);
        }
        if depot >= node_count {
            return Err(InstanceError::DepotOutOfRange { depot, node_count });
        }
        let in_range = |node: usize| {
            if node < node_count {
                Ok(node)
            } else {
                Err(InstanceError::NodeOutOfRange { node, node_count })
            }
        };

        let mut customer_index = vec![None; node_count];
        let mut reverse_neighbourhoods = vec![Vec::new(); node_count];
        let mut normalised = Vec::with_capacity(customers.len());
        for (index, customer) in customers.into_iter().enumerate() {
            let node = in_range(customer.node)?;
            if node == depot {
                return Err(InstanceError::DepotIsCustomer { depot });
            }
            let slot = customer_index
                .get_mut(node)
                .ok_or(InstanceError::NodeOutOfRange { node, node_count })?;
            if slot.is_some() {
                return Err(InstanceError::DuplicateCustomer { node });
            }
            *slot = Some(index);
            let neighbourhood = customer
                .neighbourhood
                .into_iter()
                .map(in_range)
                .collect::<Result<BTreeSet<_>, _>>()?;
            for &neighbour in &neighbourhood {
                if let Some(servable) = reverse_neighbourhoods.get_mut(neighbour) {
                    servable.push(node);
                }
            }
            if customer.demand > capacity {
                log::warn!(
                    "customer {node} demands {} but vehicles carry {capacity}; the instance is infeasible",
                    customer.demand
                );
            }
            normalised.push(Customer {
                node,
                demand: customer.demand,
                neighbourhood: neighbourhood.into_iter().collect(),
            });
        }

        let mut weights = vec![None; node_count * node_count];
        for EdgeDescription { from, to, weight } in edges {
            in_range(from)?;
            in_range(to)?;
            if from == to {
                return Err(InstanceError::SelfLoop { node: from });
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(InstanceError::InvalidWeight { from, to, weight });
            }
            if let Some(slot) = weights.get_mut(from * node_count + to) {
                *slot = Some(weight);
            }
        }

        Ok(Self {
            node_count,
            depot,
            vehicles,
            capacity,
            allow_unused_vehicles,
            customers: normalised,
            customer_index,
            weights,
            reverse_neighbourhoods,
        })
    }
}

impl TryFrom<InstanceDescription> for Instance {
    type Error = InstanceError;

    fn try_from(description: InstanceDescription) -> Result<Self, Self::Error> {
        Self::from_description(description)
    }
}

impl From<Instance> for InstanceDescription {
    fn from(instance: Instance) -> Self {
        instance.describe()
    }
}

/// Incremental builder for [`Instance`].
#[derive(Debug, Clone)]
pub struct InstanceBuilder {
    description: InstanceDescription,
}

impl InstanceBuilder {
    /// Start an instance with `node_count` nodes and the given depot.
    ///
    /// The fleet defaults to one vehicle with zero capacity.
    #[must_use]
    pub const fn new(node_count: usize, depot: usize) -> Self {
        Self {
            description: InstanceDescription {
                node_count,
                depot,
                vehicles: 1,
                capacity: 0,
                allow_unused_vehicles: false,
                customers: Vec::new(),
                edges: Vec::new(),
            },
        }
    }

    /// Set the fleet size.
    #[must_use]
    pub fn vehicles(mut self, vehicles: u32) -> Self {
        self.description.vehicles = vehicles;
        self
    }

    /// Set the vehicle capacity.
    #[must_use]
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.description.capacity = capacity;
        self
    }

    /// Allow solutions that leave vehicles idle.
    #[must_use]
    pub fn allow_unused_vehicles(mut self, allow: bool) -> Self {
        self.description.allow_unused_vehicles = allow;
        self
    }

    /// Add a customer at `node` with its demand and neighbourhood.
    #[must_use]
    pub fn customer(
        mut self,
        node: usize,
        demand: u32,
        neighbourhood: impl IntoIterator<Item = usize>,
    ) -> Self {
        self.description.customers.push(Customer {
            node,
            demand,
            neighbourhood: neighbourhood.into_iter().collect(),
        });
        self
    }

    /// Add the directed edge `from -> to`.
    #[must_use]
    pub fn edge(mut self, from: usize, to: usize, weight: f64) -> Self {
        self.description
            .edges
            .push(EdgeDescription { from, to, weight });
        self
    }

    /// Add both `a -> b` and `b -> a` with the same weight.
    #[must_use]
    pub fn symmetric_edge(self, a: usize, b: usize, weight: f64) -> Self {
        self.edge(a, b, weight).edge(b, a, weight)
    }

    /// Validate and build the instance.
    pub fn build(self) -> Result<Instance, InstanceError> {
        Instance::from_description(self.description)
    }
}
