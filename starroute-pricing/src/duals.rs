//! Dual prices prepared for one pricing call.

use starroute_core::{Branch, Edge, Instance, RmpLinearSolution, Route, VisitRule};

use crate::PricingError;

/// An active visit-flow branch as pricing sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowBranch {
    /// Branch edge, in instance node ids.
    pub edge: Edge,
    /// Dense index of the branch customer.
    pub customer: usize,
    /// Dual of the branch row.
    pub dual: f64,
    /// Per-path restriction, if the bound imposes one.
    pub rule: Option<VisitRule>,
}

/// Duals and branch data shared by every pricing algorithm.
#[derive(Debug, Clone)]
pub struct PricingDuals {
    customer_duals: Vec<f64>,
    initial_cost: f64,
    flow_branches: Vec<FlowBranch>,
    by_customer: Vec<Vec<usize>>,
}

impl PricingDuals {
    /// Collect duals for `instance` from `solution` under the active branches.
    ///
    /// The root cost of every path is the negated vehicle dual minus the
    /// duals of active fleet-size branches.
    pub fn new(
        instance: &Instance,
        solution: &RmpLinearSolution,
        branches: &[Branch],
    ) -> Result<Self, PricingError> {
        let customer_duals = (0..instance.customer_count())
            .map(|index| solution.customer_dual(index))
            .collect();
        let initial_cost = -solution.vehicles_dual - solution.fleet_size_duals().sum::<f64>();
        let mut flow_branches = Vec::new();
        let mut by_customer = vec![Vec::new(); instance.customer_count()];
        for branch in branches {
            let Some(key) = branch.visit_flow_key() else {
                continue;
            };
            let customer = instance
                .customer_index(key.customer)
                .ok_or(PricingError::UnknownCustomer {
                    customer: key.customer,
                })?;
            if let Some(slot) = by_customer.get_mut(customer) {
                slot.push(flow_branches.len());
            }
            flow_branches.push(FlowBranch {
                edge: key.edge,
                customer,
                dual: solution.branch_dual(branch),
                rule: branch.visit_rule(),
            });
        }
        Ok(Self {
            customer_duals,
            initial_cost,
            flow_branches,
            by_customer,
        })
    }

    /// Coverage dual of customer `index`.
    #[must_use]
    pub fn dual(&self, index: usize) -> f64 {
        self.customer_duals.get(index).copied().unwrap_or(0.0)
    }

    /// Reduced cost of the empty path before any edge is taken.
    #[must_use]
    pub const fn initial_cost(&self) -> f64 {
        self.initial_cost
    }

    /// All active visit-flow branches.
    #[must_use]
    pub fn flow_branches(&self) -> &[FlowBranch] {
        &self.flow_branches
    }

    /// Active visit-flow branches on customer `index`.
    pub fn branches_for(&self, index: usize) -> impl Iterator<Item = &FlowBranch> + '_ {
        self.by_customer
            .get(index)
            .into_iter()
            .flatten()
            .filter_map(|&b| self.flow_branches.get(b))
    }

    /// Whether any visit-flow branch is active.
    #[must_use]
    pub fn has_flow_branches(&self) -> bool {
        !self.flow_branches.is_empty()
    }

    /// Largest reduction visit-flow duals can give a single path: the sum of
    /// the positive branch duals.
    #[must_use]
    pub fn flow_gain_bound(&self) -> f64 {
        self.flow_branches.iter().map(|b| b.dual.max(0.0)).sum()
    }

    /// Reduced cost of a complete route under these duals.
    #[must_use]
    pub fn reduced_cost(&self, instance: &Instance, route: &Route) -> f64 {
        let served: Vec<usize> = route
            .customers()
            .iter()
            .filter_map(|&node| instance.customer_index(node))
            .collect();
        let coverage: f64 = served.iter().map(|&index| self.dual(index)).sum();
        let flow: f64 = self
            .flow_branches
            .iter()
            .filter(|b| served.contains(&b.customer) && route.contains_edge(b.edge))
            .map(|b| b.dual)
            .sum();
        route.cost() + self.initial_cost - coverage - flow
    }
}
