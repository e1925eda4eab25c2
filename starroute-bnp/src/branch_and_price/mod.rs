//! Depth-first branch-and-price over visit-flow branches, falling back to
//! fleet-size branches when every visit flow is integral.
//!
//! Every tree node is solved by column generation on a master and a pricing
//! engine shared by the whole search. Moving between nodes retracts and
//! applies only the branches that differ between the two root paths, so
//! both collaborators always hold exactly the active node's constraints.

mod tree;

pub use tree::{ROOT, SearchNode, SearchTree, Transition};

use std::time::Duration;

use starroute_core::{Branch, Deadline, Instance, MasterProblem, Route, Solution, SolveStatus};
use starroute_pricing::PricingProblem;

use crate::column_generation::{ColumnGenerationConfig, ColumnGenerator, Termination};
use crate::heuristics::InitialSolutionHeuristic;
use crate::{BranchingConfig, BranchingRuleManager, SolveError};

/// Slack applied before rounding a relaxation bound up to an integer cost.
const BOUND_TOLERANCE: f64 = 1e-6;

/// Configuration for [`BranchAndPrice`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BranchAndPriceConfig {
    /// Column generation at every node.
    pub column_generation: ColumnGenerationConfig,
    /// Choice of the branching pair.
    pub branching: BranchingConfig,
}

#[derive(Debug, Clone, PartialEq)]
struct Incumbent {
    objective: f64,
    routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeOutcome {
    /// The deadline passed while the node was being solved.
    TimedOut,
    /// Infeasible, dominated by the incumbent or integral.
    Fathomed,
    /// Fractional with nothing left to branch on; its bound stays open.
    Unresolved,
    /// Children to explore, pushed in order.
    Branch(Vec<Branch>),
}

/// Branch-and-price search for star-routing instances.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use starroute_bnp::BranchAndPrice;
/// use starroute_core::{InstanceBuilder, SolveStatus};
/// use starroute_pricing::LabelSettingPricing;
/// use starroute_simplex::SimplexMaster;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let instance = InstanceBuilder::new(3, 0)
///     .vehicles(2)
///     .capacity(2)
///     .allow_unused_vehicles(true)
///     .customer(1, 1, [1])
///     .customer(2, 1, [2])
///     .symmetric_edge(0, 1, 2.0)
///     .symmetric_edge(0, 2, 2.0)
///     .symmetric_edge(1, 2, 1.0)
///     .build()?;
/// let master = SimplexMaster::new(&instance);
/// let pricing = LabelSettingPricing::new(&instance);
/// let mut search = BranchAndPrice::new(&instance, master, pricing);
/// let solution = search.solve(Duration::from_secs(5))?;
/// assert_eq!(solution.status, SolveStatus::Optimal);
/// assert_eq!(solution.objective, 5.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BranchAndPrice<'a, M, P>
where
    M: MasterProblem,
    P: PricingProblem,
{
    instance: &'a Instance,
    generator: ColumnGenerator<'a, M, P>,
    branching: BranchingRuleManager,
    tree: SearchTree,
    integral_costs: bool,
    nodes_explored: u64,
    work: u64,
}

impl<'a, M, P> BranchAndPrice<'a, M, P>
where
    M: MasterProblem,
    P: PricingProblem,
{
    /// Construct a search using default configuration.
    #[must_use]
    pub fn new(instance: &'a Instance, master: M, pricing: P) -> Self {
        Self::with_config(instance, master, pricing, BranchAndPriceConfig::default())
    }

    /// Construct a search with explicit configuration.
    #[must_use]
    pub fn with_config(
        instance: &'a Instance,
        master: M,
        pricing: P,
        config: BranchAndPriceConfig,
    ) -> Self {
        Self {
            instance,
            generator: ColumnGenerator::with_config(
                instance,
                master,
                pricing,
                config.column_generation,
            ),
            branching: BranchingRuleManager::with_config(config.branching),
            tree: SearchTree::new(),
            integral_costs: has_integral_costs(instance),
            nodes_explored: 0,
            work: 0,
        }
    }

    /// Tree of the last search.
    #[must_use]
    pub const fn tree(&self) -> &SearchTree {
        &self.tree
    }

    /// Nodes solved during the last search.
    #[must_use]
    pub const fn nodes_explored(&self) -> u64 {
        self.nodes_explored
    }

    /// Column-generation rounds performed over the search's lifetime.
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.generator.iterations()
    }

    /// The master problem.
    #[must_use]
    pub const fn master(&self) -> &M {
        self.generator.master()
    }

    /// The pricing engine.
    #[must_use]
    pub const fn pricing(&self) -> &P {
        self.generator.pricing()
    }

    /// Search for an optimal integer solution within `timeout`.
    ///
    /// Finished searches report [`SolveStatus::Optimal`] with the incumbent or
    /// [`SolveStatus::Infeasible`] when none exists. When some node stayed
    /// fractional without a branch to split it, optimality is unproven and
    /// the incumbent is reported as [`SolveStatus::Feasible`], or
    /// [`SolveStatus::Unknown`] without one. Expired searches report
    /// [`SolveStatus::Timeout`] once any relaxation has been solved and
    /// [`SolveStatus::Unknown`] otherwise. The lower bound is the root's
    /// propagated bound.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError`] when pricing or the tree bookkeeping breaks an
    /// internal invariant.
    pub fn solve(&mut self, timeout: Duration) -> Result<Solution, SolveError> {
        let deadline = Deadline::new(timeout);
        self.tree = SearchTree::new();
        self.nodes_explored = 0;
        self.work = 0;

        let mut seed = InitialSolutionHeuristic::new(self.instance).run();
        let mut incumbent: Option<Incumbent> = None;
        let mut stack = vec![ROOT];
        let mut active = ROOT;
        let mut timed_out = false;
        let mut unresolved = false;
        while let Some(node) = stack.pop() {
            if deadline.expired() {
                timed_out = true;
                break;
            }
            self.switch_to(active, node)?;
            active = node;
            log::info!(
                "exploring node {node} at depth {} ({} open)",
                self.tree.node(node)?.depth(),
                stack.len()
            );
            let outcome =
                self.solve_node(node, std::mem::take(&mut seed), &deadline, &mut incumbent)?;
            match outcome {
                NodeOutcome::TimedOut => {
                    timed_out = true;
                    break;
                }
                NodeOutcome::Fathomed => {}
                NodeOutcome::Unresolved => unresolved = true,
                NodeOutcome::Branch(branches) => {
                    for branch in branches {
                        stack.push(self.tree.add_child(node, branch)?);
                    }
                }
            }
        }
        self.switch_to(active, ROOT)?;

        let solution = self.report(incumbent, timed_out, unresolved)?;
        log::info!(
            "branch-and-price finished with {} after {} nodes",
            solution.status,
            self.nodes_explored
        );
        Ok(solution
            .with_deterministic_time(self.work)
            .with_elapsed(deadline.elapsed()))
    }

    /// Run column generation at `node`, update the incumbent and decide
    /// whether the node needs children.
    fn solve_node(
        &mut self,
        node: usize,
        seed: Vec<Route>,
        deadline: &Deadline,
        incumbent: &mut Option<Incumbent>,
    ) -> Result<NodeOutcome, SolveError> {
        self.nodes_explored = self.nodes_explored.saturating_add(1);
        let generation = self.generator.generate(seed, deadline)?;
        self.work = self.work.saturating_add(generation.work);
        match generation.termination {
            Termination::TimedOut => {
                if generation.has_bound() {
                    self.tree.set_bound(node, generation.bound)?;
                }
                return Ok(NodeOutcome::TimedOut);
            }
            Termination::Infeasible => {
                log::info!("node {node} is infeasible");
                self.tree.set_bound(node, f64::INFINITY)?;
                return Ok(NodeOutcome::Fathomed);
            }
            Termination::Converged | Termination::EarlyStop => {}
        }

        let bound = generation.bound;
        self.tree.set_bound(node, bound)?;
        let cutoff = incumbent_cost(incumbent.as_ref());
        if self.reachable_cost(bound) >= cutoff {
            log::debug!("pruning node {node}: bound {bound:.4} against incumbent {cutoff}");
            return Ok(NodeOutcome::Fathomed);
        }

        let integer = self.generator.master_mut().solve_integer(deadline.remaining());
        if integer.feasible && integer.objective < cutoff {
            log::info!(
                "node {node} improves the incumbent to {:.4} with {} routes",
                integer.objective,
                integer.routes.len()
            );
            *incumbent = Some(Incumbent {
                objective: integer.objective,
                routes: integer.routes,
            });
        }
        if generation.relaxation.integer
            || self.reachable_cost(bound) >= incumbent_cost(incumbent.as_ref())
        {
            return Ok(NodeOutcome::Fathomed);
        }
        let branches = self.branching.branches(&generation.relaxation);
        if branches.is_empty() {
            log::warn!(
                "node {node} is fractional with nothing to branch on; bound {bound:.4} stays open"
            );
            return Ok(NodeOutcome::Unresolved);
        }
        Ok(NodeOutcome::Branch(branches))
    }

    fn report(
        &self,
        incumbent: Option<Incumbent>,
        timed_out: bool,
        unresolved: bool,
    ) -> Result<Solution, SolveError> {
        let lower_bound = self.tree.lower_bound(ROOT)?;
        let mut solution = match (incumbent, timed_out) {
            (Some(best), false) if unresolved => {
                Solution::new(SolveStatus::Feasible, best.objective).with_routes(best.routes)
            }
            (Some(best), false) => {
                Solution::new(SolveStatus::Optimal, best.objective).with_routes(best.routes)
            }
            (None, false) if unresolved => Solution::new(SolveStatus::Unknown, f64::INFINITY),
            (None, false) => return Ok(Solution::infeasible()),
            (Some(best), true) => {
                Solution::new(SolveStatus::Timeout, best.objective).with_routes(best.routes)
            }
            (None, true) if lower_bound.is_some() => {
                Solution::new(SolveStatus::Timeout, f64::INFINITY)
            }
            (None, true) => Solution::new(SolveStatus::Unknown, f64::INFINITY),
        };
        solution.lower_bound = lower_bound;
        Ok(solution)
    }

    /// Retract the branches of `from` and apply those of `to` on both
    /// collaborators.
    fn switch_to(&mut self, from: usize, to: usize) -> Result<(), SolveError> {
        if from == to {
            return Ok(());
        }
        let transition = self.tree.transition(from, to)?;
        log::info!(
            "moving from node {from} to node {to}: -{} +{} branches",
            transition.remove.len(),
            transition.add.len()
        );
        for branch in &transition.remove {
            self.generator.master_mut().remove_branch(branch);
            self.generator.pricing_mut().remove_branch(branch);
        }
        for branch in transition.add {
            self.generator.master_mut().add_branch(branch);
            self.generator.pricing_mut().add_branch(branch);
        }
        Ok(())
    }

    /// Smallest cost an integer solution below a node with relaxation
    /// `bound` can have.
    fn reachable_cost(&self, bound: f64) -> f64 {
        if self.integral_costs {
            rounded_up(bound)
        } else {
            bound - BOUND_TOLERANCE
        }
    }
}

fn has_integral_costs(instance: &Instance) -> bool {
    instance.nodes().all(|node| {
        instance
            .successors(node)
            .all(|(_, weight)| (weight - weight.round()).abs() <= BOUND_TOLERANCE)
    })
}

fn incumbent_cost(incumbent: Option<&Incumbent>) -> f64 {
    incumbent.map_or(f64::INFINITY, |best| best.objective)
}

/// Smallest integer cost a node with relaxation `bound` can reach.
fn rounded_up(bound: f64) -> f64 {
    (bound - BOUND_TOLERANCE).ceil()
}
