//! Core domain types for the star-routing engine.
//!
//! The crate holds the read-only [`Instance`], the [`Route`] columns shared by
//! pricing and the master problem, the [`Branch`] constraints applied by the
//! tree search, and the [`MasterProblem`] contract a linear-programming
//! backend implements. Constructors validate their input and return `Result`
//! so malformed data is rejected before any solver runs.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod branch;
mod deadline;
mod instance;
mod master;
mod route;
mod solution;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use branch::{Branch, Direction, Edge, VisitFlowKey, VisitRule};
pub use deadline::Deadline;
pub use instance::{
    Customer, EdgeDescription, Instance, InstanceBuilder, InstanceDescription, InstanceError,
};
pub use master::{MasterProblem, RmpIntegerSolution, RmpLinearSolution};
pub use route::{Route, RouteError};
pub use solution::{Solution, SolveStatus};
