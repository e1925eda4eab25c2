//! Pricing by the pulse algorithm.

use starroute_core::{Branch, Deadline, Instance, RmpLinearSolution};

use crate::problem::retract;
use crate::{
    EspprcGraph, PricingDuals, PricingError, PricingProblem, PricingSolution, PricingStats, Pulse,
    PulseSettings, order_by_benefit,
};

/// Configuration for [`PulsePricing`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PulseConfig {
    /// Demand units per bound bucket.
    pub bucket_size: u32,
    /// Skip customers with a dual below `epsilon`.
    pub prune_unprofitable_customers: bool,
    /// Return every improving path found rather than only the best.
    pub record_improving_solutions: bool,
    /// Reduced-cost tolerance.
    pub epsilon: f64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            bucket_size: 1,
            prune_unprofitable_customers: false,
            record_improving_solutions: true,
            epsilon: 1e-6,
        }
    }
}

impl PulseConfig {
    const fn settings(&self) -> PulseSettings {
        PulseSettings {
            bucket_size: self.bucket_size,
            prune_unprofitable: self.prune_unprofitable_customers,
            record_improving: self.record_improving_solutions,
            epsilon: self.epsilon,
        }
    }
}

/// Pricing by the pulse algorithm.
///
/// The search is exact on every call, so
/// [`PricingProblem::force_exact_solution`] has nothing to switch.
#[derive(Debug)]
pub struct PulsePricing<'a> {
    instance: &'a Instance,
    graph: EspprcGraph,
    config: PulseConfig,
    branches: Vec<Branch>,
}

impl<'a> PulsePricing<'a> {
    /// Construct a pricer using default configuration.
    #[must_use]
    pub fn new(instance: &'a Instance) -> Self {
        Self::with_config(instance, PulseConfig::default())
    }

    /// Construct a pricer with explicit configuration.
    #[must_use]
    pub fn with_config(instance: &'a Instance, config: PulseConfig) -> Self {
        if config.bucket_size == 0 {
            log::warn!("pulse bucket size 0 treated as 1");
        }
        Self {
            instance,
            graph: EspprcGraph::new(instance),
            config,
            branches: Vec::new(),
        }
    }

    /// Active branches, oldest first.
    #[must_use]
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }
}

impl PricingProblem for PulsePricing<'_> {
    fn solve(
        &mut self,
        solution: &RmpLinearSolution,
        deadline: &Deadline,
    ) -> Result<PricingSolution, PricingError> {
        let duals = PricingDuals::new(self.instance, solution, &self.branches)?;
        let ordered = order_by_benefit(&self.graph, self.instance, &duals);
        let outcome = Pulse::new(
            self.instance,
            &self.graph,
            &duals,
            &ordered,
            self.config.settings(),
            deadline,
        )
        .run()?;

        let stats = PricingStats {
            pulses_propagated: outcome.pulses_propagated,
            ..PricingStats::default()
        };
        if outcome.timed_out {
            log::warn!(
                "pulse pricing hit the deadline after {} pulses",
                stats.pulses_propagated
            );
        }
        log::debug!(
            "pulse pricing: {} columns, {} pulses",
            outcome.columns.len(),
            stats.pulses_propagated
        );
        Ok(PricingSolution::from_priced(
            outcome.columns,
            stats,
            !outcome.timed_out,
        ))
    }

    fn add_branch(&mut self, branch: Branch) {
        self.branches.push(branch);
    }

    fn remove_branch(&mut self, branch: &Branch) {
        retract(&mut self.branches, branch);
    }

    fn force_exact_solution(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use starroute_core::test_support::{hub_instance, two_customer_instance};
    use std::time::Duration;

    fn prices(customer_duals: &[f64]) -> RmpLinearSolution {
        RmpLinearSolution {
            feasible: true,
            customer_duals: customer_duals.to_vec(),
            ..RmpLinearSolution::default()
        }
    }

    #[rstest]
    fn prices_the_two_customer_tour() {
        let instance = two_customer_instance();
        let mut pricing = PulsePricing::new(&instance);
        let solution = pricing
            .solve(&prices(&[3.0, 3.0]), &Deadline::new(Duration::from_secs(60)))
            .expect("pricing");
        assert_eq!(solution.objective, -1.0);
        assert!(solution.stats.pulses_propagated > 0);
        assert_eq!(solution.stats.labels_processed, 0);
        assert!(solution.feasible);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    fn coarser_buckets_keep_the_optimum(#[case] bucket_size: u32) {
        let instance = hub_instance(4, 3, 2.0);
        let config = PulseConfig {
            bucket_size,
            ..PulseConfig::default()
        };
        let mut pricing = PulsePricing::with_config(&instance, config);
        let solution = pricing
            .solve(
                &prices(&[6.0, 4.0, 7.0, 3.0]),
                &Deadline::new(Duration::from_secs(60)),
            )
            .expect("pricing");
        // Hub trip (cost 4) serving the three best customers.
        assert_eq!(solution.objective, -13.0);
    }

    #[rstest]
    fn timeout_marks_the_answer_infeasible() {
        let instance = two_customer_instance();
        let mut pricing = PulsePricing::new(&instance);
        let deadline = Deadline::new(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        let solution = pricing.solve(&prices(&[3.0, 3.0]), &deadline).expect("pricing");
        assert!(!solution.feasible);
        assert!(solution.columns.is_empty());
    }
}
