//! Small instances shared by unit, behaviour and property tests.
//!
//! The builders here panic on invalid input because they only ever receive
//! hard-coded or generator-checked data.

use crate::{Instance, InstanceBuilder};

/// Depot `0` with customers at nodes `1` and `2`.
///
/// Both customers demand one unit, capacity is two and two vehicles may be
/// left idle. Edges are symmetric with `d(0,1) = d(0,2) = 2` and `d(1,2) = 1`,
/// so the single route `0 -> 1 -> 2 -> 0` is optimal at cost `5`.
///
/// # Panics
///
/// Never in practice; the instance is hard-coded and valid.
#[must_use]
#[expect(clippy::expect_used, reason = "hard-coded fixture data is valid")]
pub fn two_customer_instance() -> Instance {
    InstanceBuilder::new(3, 0)
        .vehicles(2)
        .capacity(2)
        .allow_unused_vehicles(true)
        .customer(1, 1, [1])
        .customer(2, 1, [2])
        .symmetric_edge(0, 1, 2.0)
        .symmetric_edge(0, 2, 2.0)
        .symmetric_edge(1, 2, 1.0)
        .build()
        .expect("two-customer fixture is valid")
}

/// Like [`two_customer_instance`] but customer `2` demands more than a
/// vehicle can carry.
///
/// # Panics
///
/// Never in practice; the instance is hard-coded and valid.
#[must_use]
#[expect(clippy::expect_used, reason = "hard-coded fixture data is valid")]
pub fn oversized_customer_instance() -> Instance {
    InstanceBuilder::new(3, 0)
        .vehicles(2)
        .capacity(2)
        .allow_unused_vehicles(true)
        .customer(1, 1, [1])
        .customer(2, 3, [2])
        .symmetric_edge(0, 1, 2.0)
        .symmetric_edge(0, 2, 2.0)
        .symmetric_edge(1, 2, 1.0)
        .build()
        .expect("oversized fixture is valid")
}

/// Three unit-demand customers on a triangle around the depot.
///
/// Capacity two forces at least two routes. Depot legs cost `2` and legs
/// between customers cost `1`, so every pair tour costs `5` and every single
/// round trip `4`. The relaxation mixes the three pair tours at `7.5`; the
/// integer optimum is one pair plus one single at `9`.
///
/// # Panics
///
/// Never in practice; the instance is hard-coded and valid.
#[must_use]
#[expect(clippy::expect_used, reason = "hard-coded fixture data is valid")]
pub fn triangle_instance() -> Instance {
    let mut builder = InstanceBuilder::new(4, 0)
        .vehicles(3)
        .capacity(2)
        .allow_unused_vehicles(true);
    for node in 1..=3 {
        builder = builder.customer(node, 1, [node]).symmetric_edge(0, node, 2.0);
    }
    builder
        .symmetric_edge(1, 2, 1.0)
        .symmetric_edge(1, 3, 1.0)
        .symmetric_edge(2, 3, 1.0)
        .build()
        .expect("triangle fixture is valid")
}

/// A star instance where one hub node serves every customer.
///
/// Customers live at nodes `1..=customers`, each demanding one unit and
/// servable from its own node or from the hub at node `customers + 1`.
/// Visiting the hub costs `hub_cost` each way, every customer node costs
/// `10` each way, and customer nodes are not joined to each other.
///
/// # Panics
///
/// Panics if `hub_cost` is negative or not finite.
#[must_use]
#[expect(clippy::expect_used, reason = "fixture parameters are chosen by tests")]
pub fn hub_instance(customers: usize, capacity: u32, hub_cost: f64) -> Instance {
    let hub = customers + 1;
    let mut builder = InstanceBuilder::new(customers + 2, 0)
        .vehicles(u32::try_from(customers).unwrap_or(u32::MAX).max(1))
        .capacity(capacity)
        .allow_unused_vehicles(true)
        .symmetric_edge(0, hub, hub_cost);
    for node in 1..=customers {
        builder = builder
            .customer(node, 1, [node, hub])
            .symmetric_edge(0, node, 10.0);
    }
    builder.build().expect("hub fixture is valid")
}

/// A complete symmetric instance on a line of customers.
///
/// Node `i` sits at coordinate `i`; the depot is node `0`. Every pair of
/// nodes is joined with weight `|i - j|`, each customer demands one unit and
/// is only servable at its own node.
///
/// # Panics
///
/// Panics if `customers` is zero.
#[must_use]
#[expect(clippy::expect_used, reason = "fixture parameters are chosen by tests")]
pub fn line_instance(customers: usize, vehicles: u32, capacity: u32) -> Instance {
    let mut builder = InstanceBuilder::new(customers + 1, 0)
        .vehicles(vehicles)
        .capacity(capacity)
        .allow_unused_vehicles(true);
    for node in 1..=customers {
        builder = builder.customer(node, 1, [node]);
    }
    for a in 0..=customers {
        for b in (a + 1)..=customers {
            let weight = f64::from(u32::try_from(b - a).unwrap_or(u32::MAX));
            builder = builder.symmetric_edge(a, b, weight);
        }
    }
    builder.build().expect("line fixture is valid")
}
