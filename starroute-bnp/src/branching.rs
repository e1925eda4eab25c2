//! Choice of the visit-flow pair to branch on.
//!
//! When every visit flow is integral but the number of vehicles in use is
//! not, the fleet size is split instead.

use starroute_core::{Branch, Direction, RmpLinearSolution, VisitFlowKey};

/// Configuration for [`BranchingRuleManager`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BranchingConfig {
    /// Fractional parts at or below this count as integral.
    pub epsilon: f64,
}

impl Default for BranchingConfig {
    fn default() -> Self {
        Self { epsilon: 0.01 }
    }
}

/// Picks the most fractional visit flow of a relaxation and splits on it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BranchingRuleManager {
    config: BranchingConfig,
}

impl BranchingRuleManager {
    /// Manager using default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager with explicit configuration.
    #[must_use]
    pub const fn with_config(config: BranchingConfig) -> Self {
        Self { config }
    }

    /// Complementary branches on the most fractional visit flow.
    ///
    /// Returns the floor bound going down followed by the ceiling bound going
    /// up. Ties go to the smallest `(edge, customer)` pair. With every flow
    /// integral the total vehicle count is split the same way, and nothing
    /// is returned once that is integral too.
    #[must_use]
    pub fn branches(&self, solution: &RmpLinearSolution) -> Vec<Branch> {
        if let Some((key, flow)) = self.most_fractional(solution) {
            return split(flow, |bound, direction| {
                Branch::visit_flow(key, bound, direction)
            });
        }
        let vehicles: f64 = solution.primal_values.iter().sum();
        if (vehicles - vehicles.round()).abs() <= self.config.epsilon {
            return Vec::new();
        }
        log::debug!("visit flows are integral; splitting {vehicles:.4} vehicles");
        split(vehicles, |bound, direction| Branch::FleetSize { bound, direction })
    }

    fn most_fractional(&self, solution: &RmpLinearSolution) -> Option<(VisitFlowKey, f64)> {
        let mut best: Option<(VisitFlowKey, f64, f64)> = None;
        for (&key, &flow) in &solution.visit_flow {
            let fraction = (flow - flow.round()).abs();
            if fraction <= self.config.epsilon {
                continue;
            }
            if best.is_none_or(|(_, _, top)| fraction > top) {
                best = Some((key, flow, fraction));
            }
        }
        best.map(|(key, flow, _)| (key, flow))
    }
}

/// Down branch at the floor of `value`, then up branch at its ceiling.
fn split(value: f64, make: impl Fn(u32, Direction) -> Branch) -> Vec<Branch> {
    let (Some(floor), Some(ceil)) = (to_bound(value.floor()), to_bound(value.ceil())) else {
        log::warn!("branching value {value} is out of range");
        debug_assert!(false, "branching value {value} is out of range");
        return Vec::new();
    };
    vec![make(floor, Direction::Down), make(ceil, Direction::Up)]
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is a non-negative whole number checked against the u32 range"
)]
fn to_bound(value: f64) -> Option<u32> {
    (value >= 0.0 && value <= f64::from(u32::MAX)).then(|| value as u32)
}
