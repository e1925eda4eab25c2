//! Status-tagged result reported by the solvers.

use std::fmt;
use std::time::Duration;

use crate::Route;

/// Outcome category of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveStatus {
    /// The reported solution is proven optimal.
    Optimal,
    /// The deadline passed; the report carries the best information found.
    Timeout,
    /// A feasible relaxation bound without an optimality proof.
    Feasible,
    /// The problem has no solution.
    Infeasible,
    /// The deadline passed before any bound was established.
    Unknown,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Optimal => "OPTIMAL",
            Self::Timeout => "TIMEOUT",
            Self::Feasible => "FEASIBLE",
            Self::Infeasible => "INFEASIBLE",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Final report of a column-generation or branch-and-price run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Solution {
    /// Outcome category.
    pub status: SolveStatus,
    /// Objective of the reported solution or bound.
    pub objective: f64,
    /// Proven lower bound, when one is known.
    pub lower_bound: Option<f64>,
    /// Labels and pulses processed, independent of wall-clock noise.
    pub deterministic_time: Option<u64>,
    /// Wall-clock time spent.
    pub elapsed: Duration,
    /// Routes of the reported solution.
    pub routes: Vec<Route>,
}

impl Solution {
    /// A report with the given status and objective and nothing else.
    #[must_use]
    pub fn new(status: SolveStatus, objective: f64) -> Self {
        Self {
            status,
            objective,
            lower_bound: None,
            deterministic_time: None,
            elapsed: Duration::ZERO,
            routes: Vec::new(),
        }
    }

    /// An infeasible report.
    #[must_use]
    pub fn infeasible() -> Self {
        Self::new(SolveStatus::Infeasible, f64::INFINITY)
    }

    /// Attach a lower bound.
    #[must_use]
    pub fn with_lower_bound(mut self, lower_bound: f64) -> Self {
        self.lower_bound = Some(lower_bound);
        self
    }

    /// Attach the deterministic work counter.
    #[must_use]
    pub fn with_deterministic_time(mut self, work: u64) -> Self {
        self.deterministic_time = Some(work);
        self
    }

    /// Attach the elapsed wall-clock time.
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Attach the solution routes.
    #[must_use]
    pub fn with_routes(mut self, routes: Vec<Route>) -> Self {
        self.routes = routes;
        self
    }

    /// Relative gap between objective and lower bound, if both are finite.
    #[must_use]
    pub fn gap(&self) -> Option<f64> {
        let bound = self.lower_bound?;
        if !self.objective.is_finite() || !bound.is_finite() {
            return None;
        }
        let scale = self.objective.abs().max(f64::EPSILON);
        Some(((self.objective - bound) / scale).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn builders_attach_fields() {
        let solution = Solution::new(SolveStatus::Timeout, 10.0)
            .with_lower_bound(8.0)
            .with_deterministic_time(42);
        assert_eq!(solution.lower_bound, Some(8.0));
        assert_eq!(solution.deterministic_time, Some(42));
        assert!(solution.routes.is_empty());
    }

    #[rstest]
    #[case(10.0, Some(8.0), Some(0.2))]
    #[case(10.0, None, None)]
    #[case(f64::INFINITY, Some(8.0), None)]
    fn gap_needs_finite_values(
        #[case] objective: f64,
        #[case] bound: Option<f64>,
        #[case] expected: Option<f64>,
    ) {
        let mut solution = Solution::new(SolveStatus::Timeout, objective);
        solution.lower_bound = bound;
        match (solution.gap(), expected) {
            (Some(gap), Some(want)) => assert!((gap - want).abs() < 1e-12),
            (got, want) => assert_eq!(got, want),
        }
    }

    #[rstest]
    fn statuses_print_in_upper_case() {
        assert_eq!(SolveStatus::Infeasible.to_string(), "INFEASIBLE");
    }
}
