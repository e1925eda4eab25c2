//! Greedy construction of the seed columns.

use std::collections::BTreeSet;

use starroute_core::{Instance, Route};

use super::{fits_together, merge_pairwise};

/// A route under construction: interior nodes and served customers.
#[derive(Debug, Clone, Default)]
struct Draft {
    nodes: Vec<usize>,
    customers: BTreeSet<usize>,
}

impl Draft {
    fn push(&mut self, customer: usize) {
        self.nodes.push(customer);
        self.customers.insert(customer);
    }
}

/// Builds a feasible-looking starting pool for the root master.
///
/// Customers are packed in list order into vehicles, each route visiting the
/// customers' own nodes. Surplus routes are merged pairwise when they fit a
/// vehicle together and, unless idle vehicles are allowed, the pool is padded
/// with empty round trips until every vehicle has a route.
#[derive(Debug, Clone, Copy)]
pub struct InitialSolutionHeuristic<'a> {
    instance: &'a Instance,
}

impl<'a> InitialSolutionHeuristic<'a> {
    /// Heuristic over `instance`.
    #[must_use]
    pub const fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// Build the seed columns.
    ///
    /// Drafts that need a missing edge are skipped with a warning, so the
    /// result may leave customers uncovered on sparse graphs.
    #[must_use]
    pub fn run(&self) -> Vec<Route> {
        let mut drafts = self.pack_customers();
        if drafts.len() > self.vehicle_count() {
            drafts = merge_pairwise(drafts, |first, second| self.merge(first, second));
        }
        let mut routes: Vec<Route> = drafts
            .into_iter()
            .filter_map(|draft| self.close(draft))
            .collect();
        if !self.instance.allow_unused_vehicles() {
            if let Some(padding) = self.cheapest_round_trip() {
                while routes.len() < self.vehicle_count() {
                    routes.push(padding.clone());
                }
            } else if routes.len() < self.vehicle_count() {
                log::warn!("no depot round trip exists to pad idle vehicles");
            }
        }
        log::debug!("initial heuristic built {} columns", routes.len());
        routes
    }

    fn vehicle_count(&self) -> usize {
        usize::try_from(self.instance.vehicles()).unwrap_or(usize::MAX)
    }

    fn pack_customers(&self) -> Vec<Draft> {
        let capacity = self.instance.capacity();
        let mut drafts = Vec::new();
        let mut current = Draft::default();
        let mut load = 0_u32;
        for customer in self.instance.customers() {
            if customer.demand > capacity {
                log::debug!("customer {} exceeds vehicle capacity", customer.node);
                continue;
            }
            let next = load.saturating_add(customer.demand);
            if next > capacity && !current.customers.is_empty() {
                drafts.push(std::mem::take(&mut current));
                load = customer.demand;
            } else {
                load = next;
            }
            current.push(customer.node);
        }
        if !current.customers.is_empty() {
            drafts.push(current);
        }
        drafts
    }

    fn merge(&self, first: &Draft, second: &Draft) -> Option<Draft> {
        if !fits_together(self.instance, &first.customers, &second.customers) {
            return None;
        }
        let mut visited = BTreeSet::new();
        let nodes = first
            .nodes
            .iter()
            .chain(&second.nodes)
            .copied()
            .filter(|&node| visited.insert(node))
            .collect();
        Some(Draft {
            nodes,
            customers: first.customers.union(&second.customers).copied().collect(),
        })
    }

    fn close(&self, draft: Draft) -> Option<Route> {
        let depot = self.instance.depot();
        let mut nodes = Vec::with_capacity(draft.nodes.len() + 2);
        nodes.push(depot);
        nodes.extend(draft.nodes);
        nodes.push(depot);
        match Route::through(self.instance, nodes, draft.customers) {
            Ok(route) => Some(route),
            Err(error) => {
                log::warn!("skipping initial column: {error}");
                None
            }
        }
    }

    fn cheapest_round_trip(&self) -> Option<Route> {
        let depot = self.instance.depot();
        self.instance
            .successors(depot)
            .filter(|&(node, _)| node != depot)
            .filter_map(|(node, out)| {
                self.instance
                    .edge_weight(node, depot)
                    .map(|back| (node, out + back))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
            .and_then(|(node, _)| Route::through(self.instance, vec![depot, node, depot], []).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use starroute_core::InstanceBuilder;
    use starroute_core::test_support::{line_instance, oversized_customer_instance};

    fn served(routes: &[Route]) -> BTreeSet<usize> {
        routes
            .iter()
            .flat_map(|r| r.customers().iter().copied())
            .collect()
    }

    #[rstest]
    fn customers_are_packed_in_order() {
        let instance = line_instance(5, 3, 2);
        let routes = InitialSolutionHeuristic::new(&instance).run();
        let nodes: Vec<&[usize]> = routes.iter().map(Route::nodes).collect();
        assert_eq!(
            nodes,
            vec![&[0, 1, 2, 0][..], &[0, 3, 4, 0][..], &[0, 5, 0][..]]
        );
        assert_eq!(served(&routes), (1..=5).collect());
    }

    #[rstest]
    fn surplus_routes_are_merged() {
        // Capacity 4 with demands 3, 3, 1, 1 packs as {1}, {2, 3}, {4}
        // against two vehicles; the first and last fit together.
        let instance = InstanceBuilder::new(5, 0)
            .vehicles(2)
            .capacity(4)
            .allow_unused_vehicles(true)
            .customer(1, 3, [1])
            .customer(2, 3, [2])
            .customer(3, 1, [3])
            .customer(4, 1, [4])
            .symmetric_edge(0, 1, 1.0)
            .symmetric_edge(0, 2, 1.0)
            .symmetric_edge(0, 3, 1.0)
            .symmetric_edge(0, 4, 1.0)
            .symmetric_edge(1, 2, 1.0)
            .symmetric_edge(2, 3, 1.0)
            .symmetric_edge(3, 4, 1.0)
            .symmetric_edge(1, 4, 1.0)
            .build()
            .expect("valid instance");
        let routes = InitialSolutionHeuristic::new(&instance).run();
        assert_eq!(routes.len(), 2);
        assert!(routes.iter().all(|r| r.demand(&instance) <= 4));
        assert_eq!(served(&routes), (1..=4).collect());
    }

    #[rstest]
    fn oversized_customers_are_skipped() {
        let instance = oversized_customer_instance();
        let routes = InitialSolutionHeuristic::new(&instance).run();
        assert_eq!(served(&routes), BTreeSet::from([1]));
    }

    #[rstest]
    fn busy_fleets_are_padded_with_the_cheapest_round_trip() {
        let instance = InstanceBuilder::new(3, 0)
            .vehicles(3)
            .capacity(2)
            .customer(1, 1, [1])
            .customer(2, 1, [2])
            .symmetric_edge(0, 1, 2.0)
            .symmetric_edge(0, 2, 1.5)
            .symmetric_edge(1, 2, 1.0)
            .build()
            .expect("valid instance");
        let routes = InitialSolutionHeuristic::new(&instance).run();
        assert_eq!(routes.len(), 3);
        let padding: Vec<&Route> = routes.iter().filter(|r| r.is_empty()).collect();
        assert_eq!(padding.len(), 2);
        assert!(padding.iter().all(|r| r.nodes() == [0, 2, 0]));
    }

    #[rstest]
    fn drafts_over_missing_edges_are_dropped() {
        let instance = InstanceBuilder::new(3, 0)
            .vehicles(2)
            .capacity(1)
            .allow_unused_vehicles(true)
            .customer(1, 1, [1])
            .customer(2, 1, [2])
            .symmetric_edge(0, 1, 1.0)
            .edge(0, 2, 1.0)
            .build()
            .expect("valid instance");
        let routes = InitialSolutionHeuristic::new(&instance).run();
        assert_eq!(served(&routes), BTreeSet::from([1]));
    }
}
