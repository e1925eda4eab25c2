//! Column pricing for star-routing column generation.
//!
//! Pricing searches for depot-to-depot routes with negative reduced cost
//! under the duals of the restricted master problem. It is an elementary
//! shortest path problem with a capacity resource, run on an
//! [`EspprcGraph`] where a separate sink stands in for the return to the
//! depot. Customers are served from nodes in their reverse neighbourhood, so
//! a path alternates between moving along edges and serving customers in
//! place.
//!
//! Two engines implement [`PricingProblem`]:
//!
//! - [`LabelSettingPricing`] runs a [`LabelSetting`] search with a relaxed
//!   dominance first and the exact one as fallback.
//! - [`PulsePricing`] runs the bounded depth-first [`Pulse`] search.

#![forbid(unsafe_code)]

mod bitset;
mod container;
mod duals;
mod error;
mod graph;
mod label;
mod label_setting_pricing;
mod labeling;
mod problem;
mod pulse;
mod pulse_pricing;
mod segment_tree;

pub use bitset::BitSet;
pub use container::{ExactLabelContainer, LabelContainer, RelaxedLabelContainer};
pub use duals::{FlowBranch, PricingDuals};
pub use error::PricingError;
pub use graph::EspprcGraph;
pub use label::{Label, LabelArena, LabelId};
pub use label_setting_pricing::{LabelSettingConfig, LabelSettingPricing};
pub use labeling::{LabelSetting, LabelingOutcome};
pub use problem::{PricedRoute, PricingProblem, PricingSolution, PricingStats};
pub use pulse::{PartialPath, PathGuard, Pulse, PulseOutcome, PulseSettings, order_by_benefit};
pub use pulse_pricing::{PulseConfig, PulsePricing};
pub use segment_tree::MinSegmentTree;
