//! Column generation over a restricted master problem.
//!
//! The [`ColumnGenerator`] alternates between solving the linear relaxation
//! of the master and pricing new columns against its duals until pricing
//! finds nothing with negative reduced cost, the deadline passes or an
//! optional early-stop rule fires.
//!
//! Until pricing supplies columns that satisfy every row, the master may
//! lean on penalised artificial variables. Such relaxations never count as
//! bounds, and a run that converges while still using them is infeasible.

use std::time::Duration;

use starroute_core::{
    Deadline, Instance, MasterProblem, RmpLinearSolution, Route, Solution, SolveStatus,
};
use starroute_pricing::PricingProblem;

use crate::SolveError;
use crate::heuristics::{InitialSolutionHeuristic, RearrangeCustomersHeuristic};

/// Configuration for [`ColumnGenerator`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnGenerationConfig {
    /// Add columns derived by [`RearrangeCustomersHeuristic`] after every
    /// pricing round.
    pub rearrange_customers: bool,
    /// Stop once `|K * pricing objective / bound|` drops below this value.
    ///
    /// Pricing is forced to be exact on every round while this is set.
    pub early_stop_gap: Option<f64>,
}

/// Why a [`ColumnGenerator::generate`] run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Pricing found no column with negative reduced cost.
    Converged,
    /// The estimated gap fell below the early-stop threshold.
    EarlyStop,
    /// The master relaxation has no feasible solution, or pricing converged
    /// while the relaxation still needed artificial variables.
    Infeasible,
    /// The deadline passed in the master or in pricing.
    TimedOut,
}

/// Result of a single [`ColumnGenerator::generate`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Why the loop stopped.
    pub termination: Termination,
    /// Smallest relaxation objective seen without artificial variables;
    /// infinite if none was recorded.
    pub bound: f64,
    /// Last relaxation solved by the master.
    pub relaxation: RmpLinearSolution,
    /// Pricing rounds performed.
    pub iterations: u32,
    /// Labels and pulses processed by pricing.
    pub work: u64,
}

impl Generation {
    /// Whether any relaxation objective was recorded.
    #[must_use]
    pub const fn has_bound(&self) -> bool {
        self.bound.is_finite()
    }
}

/// Drives a master and a pricing engine to a converged relaxation.
///
/// The generator owns both collaborators so that a tree search can keep them
/// alive across nodes and apply branches through [`Self::master_mut`] and
/// [`Self::pricing_mut`].
#[derive(Debug)]
pub struct ColumnGenerator<'a, M, P>
where
    M: MasterProblem,
    P: PricingProblem,
{
    instance: &'a Instance,
    master: M,
    pricing: P,
    config: ColumnGenerationConfig,
    iterations: u32,
}

impl<'a, M, P> ColumnGenerator<'a, M, P>
where
    M: MasterProblem,
    P: PricingProblem,
{
    /// Construct a generator using default configuration.
    #[must_use]
    pub fn new(instance: &'a Instance, master: M, pricing: P) -> Self {
        Self::with_config(instance, master, pricing, ColumnGenerationConfig::default())
    }

    /// Construct a generator with explicit configuration.
    #[must_use]
    pub const fn with_config(
        instance: &'a Instance,
        master: M,
        pricing: P,
        config: ColumnGenerationConfig,
    ) -> Self {
        Self {
            instance,
            master,
            pricing,
            config,
            iterations: 0,
        }
    }

    /// Pricing rounds performed over the generator's lifetime.
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ColumnGenerationConfig {
        &self.config
    }

    /// The master problem.
    #[must_use]
    pub const fn master(&self) -> &M {
        &self.master
    }

    /// Mutable access to the master problem.
    pub const fn master_mut(&mut self) -> &mut M {
        &mut self.master
    }

    /// The pricing engine.
    #[must_use]
    pub const fn pricing(&self) -> &P {
        &self.pricing
    }

    /// Mutable access to the pricing engine.
    pub const fn pricing_mut(&mut self) -> &mut P {
        &mut self.pricing
    }

    /// Release the collaborators.
    #[must_use]
    pub fn into_parts(self) -> (M, P) {
        (self.master, self.pricing)
    }

    /// Add `seed` to the master and generate columns until the relaxation
    /// converges, the early-stop rule fires or `deadline` passes.
    ///
    /// Columns are only ever added, never removed.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Pricing`] when pricing breaks an internal
    /// invariant.
    pub fn generate(
        &mut self,
        seed: Vec<Route>,
        deadline: &Deadline,
    ) -> Result<Generation, SolveError> {
        let mut pending = seed;
        let mut bound = f64::INFINITY;
        let mut iterations = 0_u32;
        let mut work = 0_u64;
        let (termination, relaxation) = loop {
            self.master.add_columns(std::mem::take(&mut pending));
            let relaxation = self.master.solve_relaxation(deadline.remaining());
            if deadline.expired() {
                break (Termination::TimedOut, relaxation);
            }
            if !relaxation.feasible {
                break (Termination::Infeasible, relaxation);
            }
            let penalised = relaxation.uses_artificials();
            if !penalised {
                bound = bound.min(relaxation.objective);
            }

            if self.config.early_stop_gap.is_some() {
                self.pricing.force_exact_solution();
            }
            let priced = self.pricing.solve(&relaxation, deadline)?;
            iterations = iterations.saturating_add(1);
            self.iterations = self.iterations.saturating_add(1);
            work = work.saturating_add(priced.stats.work());
            log::debug!(
                "column generation iteration {iterations}: relaxation {:.4}, pricing {:.4}, {} new columns",
                relaxation.objective,
                priced.objective,
                priced.columns.len()
            );
            if !priced.feasible || deadline.expired() {
                break (Termination::TimedOut, relaxation);
            }
            let stalled = priced.columns.is_empty() || self.all_known(&priced.columns);
            if stalled && penalised {
                log::debug!(
                    "pricing converged with artificials worth {:.6} in the master",
                    relaxation.artificial_value
                );
                break (Termination::Infeasible, relaxation);
            }
            if priced.columns.is_empty() {
                break (Termination::Converged, relaxation);
            }
            if self.all_known(&priced.columns) {
                log::warn!("pricing only returned columns already in the pool");
                break (Termination::Converged, relaxation);
            }
            if let Some(threshold) = self.config.early_stop_gap.filter(|_| !penalised) {
                let gap = self.estimated_gap(priced.objective, bound);
                if gap < threshold {
                    log::debug!("column generation stopped early at gap {gap:.6}");
                    break (Termination::EarlyStop, relaxation);
                }
            }
            pending = priced.columns;
            if self.config.rearrange_customers {
                let derived = RearrangeCustomersHeuristic::new(self.instance)
                    .run(self.master.columns(), &relaxation);
                pending.extend(derived);
            }
        };
        Ok(Generation {
            termination,
            bound,
            relaxation,
            iterations,
            work,
        })
    }

    /// Generate columns from the initial heuristic and solve the integer
    /// master over the final pool.
    ///
    /// Reports [`SolveStatus::Optimal`] with the relaxation bound attached
    /// when the integer master is feasible. The pool is not re-priced, so the
    /// routes are optimal over the generated columns only.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Pricing`] when pricing breaks an internal
    /// invariant.
    pub fn solve(&mut self, timeout: Duration) -> Result<Solution, SolveError> {
        self.run(timeout, true)
    }

    /// Generate columns from the initial heuristic and report the relaxation
    /// bound as [`SolveStatus::Feasible`].
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Pricing`] when pricing breaks an internal
    /// invariant.
    pub fn solve_relaxation(&mut self, timeout: Duration) -> Result<Solution, SolveError> {
        self.run(timeout, false)
    }

    fn run(&mut self, timeout: Duration, integral: bool) -> Result<Solution, SolveError> {
        let deadline = Deadline::new(timeout);
        let seed = InitialSolutionHeuristic::new(self.instance).run();
        let generation = self.generate(seed, &deadline)?;
        let solution = self.report(&generation, &deadline, integral);
        Ok(solution
            .with_deterministic_time(generation.work)
            .with_elapsed(deadline.elapsed()))
    }

    fn report(&mut self, generation: &Generation, deadline: &Deadline, integral: bool) -> Solution {
        let bound = generation.bound;
        match generation.termination {
            Termination::TimedOut if generation.has_bound() => {
                Solution::new(SolveStatus::Timeout, bound).with_lower_bound(bound)
            }
            Termination::TimedOut => Solution::new(SolveStatus::Unknown, f64::INFINITY),
            Termination::Infeasible => Solution::infeasible(),
            Termination::Converged | Termination::EarlyStop if integral => {
                let integer = self.master.solve_integer(deadline.remaining());
                if integer.feasible {
                    Solution::new(SolveStatus::Optimal, integer.objective)
                        .with_lower_bound(bound)
                        .with_routes(integer.routes)
                } else if deadline.expired() {
                    Solution::new(SolveStatus::Timeout, bound).with_lower_bound(bound)
                } else {
                    Solution::infeasible().with_lower_bound(bound)
                }
            }
            Termination::Converged | Termination::EarlyStop => {
                Solution::new(SolveStatus::Feasible, bound).with_lower_bound(bound)
            }
        }
    }

    fn all_known(&self, columns: &[Route]) -> bool {
        let pool = self.master.columns();
        columns
            .iter()
            .all(|column| pool.iter().any(|known| known.same_column(column)))
    }

    fn estimated_gap(&self, pricing_objective: f64, bound: f64) -> f64 {
        (f64::from(self.instance.vehicles()) * pricing_objective / bound).abs()
    }
}
