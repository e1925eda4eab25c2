//! Label-setting pricing: a relaxed pass with an exact fallback.

use starroute_core::{Branch, Deadline, Instance, RmpLinearSolution};

use crate::problem::retract;
use crate::{
    EspprcGraph, ExactLabelContainer, LabelSetting, PricingDuals, PricingError, PricingProblem,
    PricingSolution, PricingStats, RelaxedLabelContainer,
};

/// Configuration for [`LabelSettingPricing`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelSettingConfig {
    /// Never fall back to the exact pass when the relaxed one finds nothing.
    pub solve_heuristically: bool,
    /// Skip customers with a dual below `epsilon` in the relaxed pass.
    pub prune_unprofitable_customers: bool,
    /// Reduced-cost and dominance tolerance.
    pub epsilon: f64,
}

impl Default for LabelSettingConfig {
    fn default() -> Self {
        Self {
            solve_heuristically: false,
            prune_unprofitable_customers: true,
            epsilon: 1e-6,
        }
    }
}

/// Pricing by label setting.
///
/// Each call first runs the relaxed, demand-only dominance. When that finds
/// no column, and heuristic solving is off, the exact elementary dominance
/// runs as well, so an empty answer proves the relaxation optimal.
#[derive(Debug)]
pub struct LabelSettingPricing<'a> {
    instance: &'a Instance,
    graph: EspprcGraph,
    config: LabelSettingConfig,
    branches: Vec<Branch>,
    force_exact: bool,
}

impl<'a> LabelSettingPricing<'a> {
    /// Construct a pricer using default configuration.
    #[must_use]
    pub fn new(instance: &'a Instance) -> Self {
        Self::with_config(instance, LabelSettingConfig::default())
    }

    /// Construct a pricer with explicit configuration.
    #[must_use]
    pub fn with_config(instance: &'a Instance, config: LabelSettingConfig) -> Self {
        Self {
            instance,
            graph: EspprcGraph::new(instance),
            config,
            branches: Vec::new(),
            force_exact: false,
        }
    }

    /// Active branches, oldest first.
    #[must_use]
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }
}

impl PricingProblem for LabelSettingPricing<'_> {
    fn solve(
        &mut self,
        solution: &RmpLinearSolution,
        deadline: &Deadline,
    ) -> Result<PricingSolution, PricingError> {
        let duals = PricingDuals::new(self.instance, solution, &self.branches)?;
        let epsilon = self.config.epsilon;
        let relaxed_first = !self.force_exact;
        self.force_exact = false;

        let mut stats = PricingStats::default();
        let mut outcome = if relaxed_first {
            let container = RelaxedLabelContainer::new(self.graph.size(), self.instance.capacity());
            LabelSetting::new(self.instance, &self.graph, &duals, container, epsilon)
                .prune_unprofitable(self.config.prune_unprofitable_customers)
                .run(deadline)?
        } else {
            let container = ExactLabelContainer::new(self.graph.size(), epsilon);
            LabelSetting::new(self.instance, &self.graph, &duals, container, epsilon).run(deadline)?
        };
        stats.labels_processed = outcome.labels_processed;

        if relaxed_first
            && outcome.columns.is_empty()
            && !outcome.timed_out
            && !self.config.solve_heuristically
        {
            let container = ExactLabelContainer::new(self.graph.size(), epsilon);
            outcome =
                LabelSetting::new(self.instance, &self.graph, &duals, container, epsilon).run(deadline)?;
            stats.labels_processed += outcome.labels_processed;
            stats.exact_fallback = true;
        }

        if outcome.timed_out {
            log::warn!(
                "label-setting pricing hit the deadline after {} labels",
                stats.labels_processed
            );
        }
        log::debug!(
            "label-setting pricing: {} columns, {} labels, exact fallback {}",
            outcome.columns.len(),
            stats.labels_processed,
            stats.exact_fallback
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

    fn force_exact_solution(&mut self) {
        self.force_exact = true;
    }
}
