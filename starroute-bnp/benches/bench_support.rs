//! Deterministic instance generation for the search benchmarks.
//!
//! Nodes are scattered on an integer grid around a central depot. Weights
//! are rounded Euclidean distances, so route costs stay integral, and every
//! customer is servable from its own node and from any node within
//! [`SERVICE_RADIUS`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use starroute_core::{Instance, InstanceBuilder, InstanceError};

/// Seed for deterministic random number generation in benchmarks.
pub const BENCHMARK_SEED: u64 = 42;

/// Side of the square the nodes are drawn from.
const GRID_SIZE: i32 = 100;

/// Depot coordinate on both axes.
const CENTRE: i32 = 50;

/// Distance within which a visit serves a customer.
const SERVICE_RADIUS: f64 = 15.0;

/// Generate an instance with `customers` customers and one extra stop per
/// customer that serves nobody on its own.
///
/// Customers demand one to three units against a capacity of ten, and the
/// fleet may leave vehicles idle.
///
/// # Errors
///
/// Returns [`InstanceError`] if the generated data is rejected.
pub fn generate_instance(customers: usize, seed: u64) -> Result<Instance, InstanceError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let node_count = 2 * customers + 1;
    let points: Vec<(i32, i32)> = (0..node_count)
        .map(|node| {
            if node == 0 {
                (CENTRE, CENTRE)
            } else {
                (rng.gen_range(0..GRID_SIZE), rng.gen_range(0..GRID_SIZE))
            }
        })
        .collect();

    let vehicles = u32::try_from(customers).unwrap_or(u32::MAX);
    let mut builder = InstanceBuilder::new(node_count, 0)
        .vehicles(vehicles)
        .capacity(10)
        .allow_unused_vehicles(true);
    for (a, &from) in points.iter().enumerate() {
        for (b, &to) in points.iter().enumerate().skip(a + 1) {
            builder = builder.symmetric_edge(a, b, distance(from, to).round());
        }
    }
    for (node, &home) in points.iter().enumerate().skip(1).take(customers) {
        let neighbourhood: Vec<usize> = points
            .iter()
            .enumerate()
            .skip(1)
            .filter(|&(other, &at)| other == node || distance(home, at) <= SERVICE_RADIUS)
            .map(|(other, _)| other)
            .collect();
        builder = builder.customer(node, rng.gen_range(1..=3), neighbourhood);
    }
    builder.build()
}

fn distance(a: (i32, i32), b: (i32, i32)) -> f64 {
    f64::from(a.0 - b.0).hypot(f64::from(a.1 - b.1))
}
