//! Contract between the search and a restricted master problem backend.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::{Branch, Route, VisitFlowKey};

/// Artificial totals below this count as zero.
const ARTIFICIAL_TOLERANCE: f64 = 1e-6;

/// Snapshot of a solved linear relaxation.
///
/// Duals follow the sign convention of a minimisation problem. Primal values
/// are indexed like [`MasterProblem::columns`]; columns excluded by an active
/// branch report zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RmpLinearSolution {
    /// Relaxation objective.
    pub objective: f64,
    /// Whether the relaxation has a feasible solution.
    pub feasible: bool,
    /// Coverage dual per customer, by dense customer index.
    pub customer_duals: Vec<f64>,
    /// Dual of the fleet-size row.
    pub vehicles_dual: f64,
    /// Dual of every active branch row.
    pub branch_duals: BTreeMap<Branch, f64>,
    /// Value of every pool column.
    pub primal_values: Vec<f64>,
    /// Whether every primal value is integral within tolerance.
    pub integer: bool,
    /// Positive visit flow per `(edge, customer)` pair.
    pub visit_flow: BTreeMap<VisitFlowKey, f64>,
    /// Total value of the penalised artificial variables that keep the
    /// relaxation feasible; zero for backends without them.
    ///
    /// While this is positive the routes alone do not satisfy the master, and
    /// the objective is not a bound on the routing problem.
    pub artificial_value: f64,
}

impl RmpLinearSolution {
    /// A relaxation with no feasible solution.
    #[must_use]
    pub fn infeasible() -> Self {
        Self {
            objective: f64::INFINITY,
            ..Self::default()
        }
    }

    /// Coverage dual of the customer at dense index `index`; zero if unknown.
    #[must_use]
    pub fn customer_dual(&self, index: usize) -> f64 {
        self.customer_duals.get(index).copied().unwrap_or(0.0)
    }

    /// Primal value of pool column `index`; zero if unknown.
    #[must_use]
    pub fn primal_value(&self, index: usize) -> f64 {
        self.primal_values.get(index).copied().unwrap_or(0.0)
    }

    /// Dual of `branch`; zero when the branch has no row.
    #[must_use]
    pub fn branch_dual(&self, branch: &Branch) -> f64 {
        self.branch_duals.get(branch).copied().unwrap_or(0.0)
    }

    /// Whether the relaxation still leans on artificial variables.
    #[must_use]
    pub fn uses_artificials(&self) -> bool {
        self.artificial_value > ARTIFICIAL_TOLERANCE
    }

    /// Duals of the active fleet-size branches.
    pub fn fleet_size_duals(&self) -> impl Iterator<Item = f64> + '_ {
        self.branch_duals
            .iter()
            .filter(|(branch, _)| matches!(branch, Branch::FleetSize { .. }))
            .map(|(_, &dual)| dual)
    }
}

/// Integer solution of the restricted master problem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RmpIntegerSolution {
    /// Total cost of the chosen routes.
    pub objective: f64,
    /// Whether an integer solution was found.
    pub feasible: bool,
    /// Chosen routes.
    pub routes: Vec<Route>,
}

impl RmpIntegerSolution {
    /// An integer problem with no solution.
    #[must_use]
    pub fn infeasible() -> Self {
        Self {
            objective: f64::INFINITY,
            ..Self::default()
        }
    }
}

/// A restricted master problem over a growing pool of route columns.
///
/// Implementations must accept repeated incremental calls; rebuilding the
/// underlying model internally is fine. Infeasibility is reported through
/// the `feasible` flags, never by panicking. A backend may instead keep the
/// relaxation feasible with penalised artificial variables and report their
/// total in [`RmpLinearSolution::artificial_value`].
pub trait MasterProblem {
    /// Append columns to the pool. Columns are never removed.
    fn add_columns(&mut self, columns: Vec<Route>);

    /// Activate a branching constraint.
    fn add_branch(&mut self, branch: Branch);

    /// Deactivate a previously added branching constraint.
    fn remove_branch(&mut self, branch: &Branch);

    /// Solve the linear relaxation within `time_remaining`.
    fn solve_relaxation(&mut self, time_remaining: Duration) -> RmpLinearSolution;

    /// Solve the integer problem over the current pool within
    /// `time_remaining`.
    fn solve_integer(&mut self, time_remaining: Duration) -> RmpIntegerSolution;

    /// The column pool, in primal-value order.
    fn columns(&self) -> &[Route];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, Edge};
    use rstest::rstest;

    #[rstest]
    fn missing_entries_read_as_zero() {
        let solution = RmpLinearSolution {
            customer_duals: vec![3.0],
            ..RmpLinearSolution::default()
        };
        assert_eq!(solution.customer_dual(0), 3.0);
        assert_eq!(solution.customer_dual(4), 0.0);
        assert_eq!(solution.primal_value(2), 0.0);
    }

    #[rstest]
    fn fleet_size_duals_skip_visit_flow_rows() {
        let fleet = Branch::FleetSize {
            bound: 2,
            direction: Direction::Down,
        };
        let flow = Branch::VisitFlow {
            edge: Edge::new(0, 1),
            customer: 1,
            bound: 1,
            direction: Direction::Up,
        };
        let solution = RmpLinearSolution {
            branch_duals: BTreeMap::from([(fleet, -1.5), (flow, 2.0)]),
            ..RmpLinearSolution::default()
        };
        assert_eq!(solution.fleet_size_duals().collect::<Vec<_>>(), vec![-1.5]);
        assert_eq!(solution.branch_dual(&flow), 2.0);
    }

    #[rstest]
    fn infeasible_snapshots_are_flagged() {
        assert!(!RmpLinearSolution::infeasible().feasible);
        assert!(!RmpIntegerSolution::infeasible().feasible);
    }

    #[rstest]
    #[case(0.0, false)]
    #[case(1e-9, false)]
    #[case(0.5, true)]
    fn artificial_use_ignores_round_off(#[case] value: f64, #[case] expected: bool) {
        let solution = RmpLinearSolution {
            feasible: true,
            artificial_value: value,
            ..RmpLinearSolution::default()
        };
        assert_eq!(solution.uses_artificials(), expected);
    }
}
