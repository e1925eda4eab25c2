//! Column diversification by reassigning customers across basic routes.

use std::collections::BTreeSet;

use starroute_core::{Instance, RmpLinearSolution, Route};

use super::{fits_together, merge_pairwise};

/// Primal values above this mark a column as part of the solution.
const BASIS_EPSILON: f64 = 1e-6;

/// Reassigns customers to the paths of the current primal solution.
///
/// Cheapest routes first, each path in the solution is offered every
/// not-yet-assigned customer it can serve, lightest demand first, opening a
/// fresh copy of the path whenever the vehicle fills up. Results already in
/// the pool are dropped, and pairs of results are merged onto a cheaper pool
/// path that can serve both customer sets.
#[derive(Debug, Clone, Copy)]
pub struct RearrangeCustomersHeuristic<'a> {
    instance: &'a Instance,
}

impl<'a> RearrangeCustomersHeuristic<'a> {
    /// Heuristic over `instance`.
    #[must_use]
    pub const fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// Derive columns from `columns` under the primal values of `solution`.
    #[must_use]
    pub fn run(&self, columns: &[Route], solution: &RmpLinearSolution) -> Vec<Route> {
        let mut basis: Vec<&Route> = columns
            .iter()
            .enumerate()
            .filter(|&(index, _)| solution.primal_value(index) > BASIS_EPSILON)
            .map(|(_, route)| route)
            .collect();
        basis.sort_by(|a, b| a.cost().total_cmp(&b.cost()));

        let capacity = self.instance.capacity();
        let mut assigned = BTreeSet::new();
        let mut derived = Vec::new();
        for route in basis {
            if assigned.len() >= self.instance.customer_count() {
                break;
            }
            let mut current = Vec::new();
            let mut load = 0_u32;
            for customer in self.potential_customers(route) {
                let demand = self.instance.demand(customer).unwrap_or(u32::MAX);
                if demand > capacity || assigned.contains(&customer) {
                    continue;
                }
                let next = load.saturating_add(demand);
                if next > capacity && !current.is_empty() {
                    derived.push(route.copy_without_customers().with_customers(current));
                    current = Vec::new();
                    load = demand;
                } else {
                    load = next;
                }
                current.push(customer);
                assigned.insert(customer);
            }
            if !current.is_empty() {
                derived.push(route.copy_without_customers().with_customers(current));
            }
        }
        derived.retain(|route| !columns.iter().any(|c| c.same_column(route)));

        let merged = merge_pairwise(derived, |first, second| {
            self.merge_onto_pool(columns, first, second)
        });
        log::debug!("rearrangement derived {} columns", merged.len());
        merged
    }

    /// Customers servable from any node of `route`, by demand then node.
    fn potential_customers(&self, route: &Route) -> Vec<usize> {
        let mut customers: Vec<usize> = route
            .nodes()
            .iter()
            .flat_map(|&node| self.instance.reverse_neighbourhood(node).iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        customers.sort_by_key(|&c| (self.instance.demand(c).unwrap_or(u32::MAX), c));
        customers
    }

    fn merge_onto_pool(&self, pool: &[Route], first: &Route, second: &Route) -> Option<Route> {
        if !fits_together(self.instance, first.customers(), second.customers()) {
            return None;
        }
        let combined_cost = first.cost() + second.cost();
        pool.iter()
            .filter(|candidate| candidate.cost() < combined_cost)
            .find(|candidate| {
                let servable: BTreeSet<usize> =
                    self.potential_customers(candidate).into_iter().collect();
                first.customers().is_subset(&servable) && second.customers().is_subset(&servable)
            })
            .map(|candidate| {
                candidate
                    .copy_without_customers()
                    .with_customers(first.customers().union(second.customers()).copied())
            })
    }
}
