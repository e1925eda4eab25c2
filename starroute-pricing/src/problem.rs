//! The pricing contract consumed by column generation.

use starroute_core::{Branch, Deadline, RmpLinearSolution, Route};

use crate::PricingError;

/// Work counters returned by a single pricing call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PricingStats {
    /// Labels popped from the label-setting queue.
    pub labels_processed: u64,
    /// Pulses propagated by the pulse search.
    pub pulses_propagated: u64,
    /// Whether the exact label-setting pass ran after the relaxed one.
    pub exact_fallback: bool,
}

impl PricingStats {
    /// Deterministic work measure: labels plus pulses.
    #[must_use]
    pub const fn work(&self) -> u64 {
        self.labels_processed.saturating_add(self.pulses_propagated)
    }

    /// Add the counters of `other` to `self`.
    pub const fn absorb(&mut self, other: Self) {
        self.labels_processed = self.labels_processed.saturating_add(other.labels_processed);
        self.pulses_propagated = self
            .pulses_propagated
            .saturating_add(other.pulses_propagated);
        self.exact_fallback |= other.exact_fallback;
    }
}

/// A generated column with its reduced cost under the duals it was priced
/// with.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedRoute {
    /// The column.
    pub route: Route,
    /// Reduced cost at generation time.
    pub reduced_cost: f64,
}

/// Result of a pricing call.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingSolution {
    /// Minimum reduced cost among the returned columns, zero if none.
    pub objective: f64,
    /// Columns with negative reduced cost.
    pub columns: Vec<Route>,
    /// Work counters.
    pub stats: PricingStats,
    /// False when the deadline expired before pricing finished.
    pub feasible: bool,
}

impl PricingSolution {
    /// Assemble a solution from priced columns.
    #[must_use]
    pub fn from_priced(priced: Vec<PricedRoute>, stats: PricingStats, feasible: bool) -> Self {
        let objective = priced
            .iter()
            .map(|p| p.reduced_cost)
            .min_by(f64::total_cmp)
            .unwrap_or(0.0);
        Self {
            objective,
            columns: priced.into_iter().map(|p| p.route).collect(),
            stats,
            feasible,
        }
    }
}

/// An ESPPRC pricing engine.
///
/// Branches are mirrored from the master problem so that generated columns
/// respect the active node's constraints.
pub trait PricingProblem {
    /// Price columns against the duals of `solution`.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] only when an internal invariant breaks.
    fn solve(
        &mut self,
        solution: &RmpLinearSolution,
        deadline: &Deadline,
    ) -> Result<PricingSolution, PricingError>;

    /// Activate a branch.
    fn add_branch(&mut self, branch: Branch);

    /// Deactivate a branch added earlier.
    fn remove_branch(&mut self, branch: &Branch);

    /// Make the next call skip any heuristic pass.
    fn force_exact_solution(&mut self);
}

/// Remove the most recent occurrence of `branch` from `branches`.
pub(crate) fn retract(branches: &mut Vec<Branch>, branch: &Branch) {
    if let Some(position) = branches.iter().rposition(|b| b == branch) {
        branches.remove(position);
    } else {
        log::warn!("removing inactive branch {branch}");
        debug_assert!(false, "removing inactive branch {branch}");
    }
}
