//! Facade crate for the star-routing branch-and-price engine.
//!
//! This crate re-exports the core domain types, the pricing engines and the
//! tree search, and exposes the reference simplex master behind the
//! `simplex` feature.

#![forbid(unsafe_code)]

pub use starroute_core::{
    Branch, Customer, Deadline, Direction, Edge, EdgeDescription, Instance, InstanceBuilder,
    InstanceDescription, InstanceError, MasterProblem, RmpIntegerSolution, RmpLinearSolution,
    Route, RouteError, Solution, SolveStatus, VisitFlowKey, VisitRule,
};

pub use starroute_pricing::{
    LabelSettingConfig, LabelSettingPricing, PricingError, PricingProblem, PricingSolution,
    PricingStats, PulseConfig, PulsePricing,
};

pub use starroute_bnp::{
    BranchAndPrice, BranchAndPriceConfig, BranchingConfig, BranchingRuleManager,
    ColumnGenerationConfig, ColumnGenerator, Generation, InitialSolutionHeuristic,
    RearrangeCustomersHeuristic, SearchNode, SearchTree, SolveError, Termination,
};

#[cfg(feature = "simplex")]
pub use starroute_simplex::{Coverage, SimplexMaster, SimplexMasterConfig};

#[cfg(feature = "test-support")]
pub use starroute_core::test_support;
