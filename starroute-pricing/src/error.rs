//! Errors raised by the pricing engine.
//!
//! Every variant signals a broken internal invariant: a label chain or pulse
//! path that does not correspond to the graph it was built on. None is
//! expected in normal operation.

use starroute_core::RouteError;
use thiserror::Error;

/// Internal invariant violations detected while pricing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// A reconstructed path could not be turned into a route.
    #[error("reconstructed path is not a valid route")]
    InvalidColumn {
        /// Why the route was rejected.
        #[source]
        source: RouteError,
    },
    /// A label refers to a parent that is not in the arena.
    #[error("label {label} has a dangling parent link")]
    BrokenParentChain {
        /// Arena index of the label whose parent is missing.
        label: usize,
    },
    /// A dense customer index or branch customer does not exist.
    #[error("customer {customer} is not part of the instance")]
    UnknownCustomer {
        /// Offending customer index or node.
        customer: usize,
    },
}

impl From<RouteError> for PricingError {
    fn from(source: RouteError) -> Self {
        Self::InvalidColumn { source }
    }
}
