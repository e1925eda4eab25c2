//! Column generation and branch-and-price for star-routing problems.
//!
//! The crate drives a [`MasterProblem`](starroute_core::MasterProblem)
//! backend and a [`PricingProblem`](starroute_pricing::PricingProblem)
//! engine:
//!
//! - [`ColumnGenerator`] solves a single node to a converged relaxation,
//!   optionally solving the integer master over the final pool.
//! - [`BranchAndPrice`] wraps the generator in a depth-first tree search
//!   that branches on fractional visit flows chosen by
//!   [`BranchingRuleManager`].
//! - [`InitialSolutionHeuristic`] and [`RearrangeCustomersHeuristic`]
//!   supply columns without pricing.
//!
//! Timeouts and infeasibility are reported through
//! [`SolveStatus`](starroute_core::SolveStatus); [`SolveError`] is reserved
//! for broken internal invariants.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod branch_and_price;
mod branching;
mod column_generation;
mod error;
mod heuristics;

pub use branch_and_price::{
    BranchAndPrice, BranchAndPriceConfig, ROOT, SearchNode, SearchTree, Transition,
};
pub use branching::{BranchingConfig, BranchingRuleManager};
pub use column_generation::{ColumnGenerationConfig, ColumnGenerator, Generation, Termination};
pub use error::SolveError;
pub use heuristics::{InitialSolutionHeuristic, RearrangeCustomersHeuristic};
