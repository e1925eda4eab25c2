//! Errors surfaced by column generation and branch-and-price.

use starroute_pricing::PricingError;
use thiserror::Error;

/// Fatal failures of a solve.
///
/// Infeasibility and timeouts are not errors; they are reported through
/// [`starroute_core::SolveStatus`]. Only broken internal invariants end up
/// here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    /// Pricing detected an internal invariant violation.
    #[error("pricing failed")]
    Pricing {
        /// The pricing failure.
        #[from]
        source: PricingError,
    },
    /// The search tree refers to a node it does not own.
    #[error("search tree has no node {node}")]
    BrokenTree {
        /// Missing node index.
        node: usize,
    },
}
