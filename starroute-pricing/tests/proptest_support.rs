//! Proptest strategies for pricing property tests.
//!
//! Instances are small complete graphs with integer weights and integer
//! duals, so reduced costs are exact and different engines can be compared
//! with equality up to a tight tolerance.

use proptest::prelude::*;
use starroute_core::{Instance, InstanceBuilder, RmpLinearSolution};

/// A pricing input: an instance and the customer duals to price against.
#[derive(Debug, Clone)]
pub struct PricingCase {
    /// The routing instance.
    pub instance: Instance,
    /// One dual per customer index.
    pub duals: Vec<f64>,
}

impl PricingCase {
    /// Master solution carrying only the customer duals.
    #[must_use]
    pub fn master_solution(&self) -> RmpLinearSolution {
        RmpLinearSolution {
            feasible: true,
            customer_duals: self.duals.clone(),
            ..RmpLinearSolution::default()
        }
    }
}

fn pair_count(customers: usize) -> usize {
    (0..=customers).map(|a| customers - a).sum()
}

/// Strategy for instances with `2..=max_customers` customers.
///
/// Customer `i` sits at node `i` and may also be served from node `i + 1`
/// (wrapping to `1`). Every pair of nodes is joined both ways.
pub fn pricing_case(max_customers: usize) -> impl Strategy<Value = PricingCase> {
    (2..=max_customers).prop_flat_map(|customers| {
        (
            proptest::collection::vec(1_u32..=3, customers),
            proptest::collection::vec(any::<bool>(), customers),
            proptest::collection::vec(1_u32..=9, pair_count(customers)),
            2_u32..=6,
            proptest::collection::vec(0_u32..=12, customers),
        )
            .prop_filter_map(
                "instance must build",
                move |(demands, shared, weights, capacity, duals)| {
                    build_case(customers, &demands, &shared, &weights, capacity, &duals)
                },
            )
    })
}

fn build_case(
    customers: usize,
    demands: &[u32],
    shared: &[bool],
    weights: &[u32],
    capacity: u32,
    duals: &[u32],
) -> Option<PricingCase> {
    let mut builder = InstanceBuilder::new(customers + 1, 0)
        .vehicles(u32::try_from(customers).ok()?)
        .capacity(capacity)
        .allow_unused_vehicles(true);
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
    Some(PricingCase {
        instance: builder.build().ok()?,
        duals: duals.iter().copied().map(f64::from).collect(),
    })
}
