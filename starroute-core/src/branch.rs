//! Branching constraints applied by the tree search.
//!
//! A [`Branch`] is added to both the master problem and the pricing engine
//! when the search descends into a node and removed when it leaves. Every
//! branch can decide whether an existing column is still usable under it.

use std::fmt;

use crate::Route;

/// Bound direction of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// The constrained quantity must be at least the bound.
    Up,
    /// The constrained quantity must be at most the bound.
    Down,
}

/// A directed edge between two instance nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    /// Tail node.
    pub start: usize,
    /// Head node.
    pub end: usize,
}

impl Edge {
    /// Create the edge `start -> end`.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// An `(edge, customer)` pair whose visit flow the search branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisitFlowKey {
    /// Traversed edge.
    pub edge: Edge,
    /// Served customer node.
    pub customer: usize,
}

/// What a visit-flow branch demands of a single path.
///
/// Only bounds of `0` (down) and at least `1` (up) restrict an individual
/// path; other bounds only bind in the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitRule {
    /// The path may not serve the customer while using the edge.
    Forbid,
    /// A path serving the customer must take the edge whenever it touches
    /// the edge's start or end.
    Require,
}

/// A branching constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Branch {
    /// Bounds the number of vehicles in use.
    FleetSize {
        /// Vehicle bound.
        bound: u32,
        /// Whether the bound is a floor or a ceiling.
        direction: Direction,
    },
    /// Bounds the flow of vehicles traversing `edge` while serving
    /// `customer`.
    VisitFlow {
        /// Constrained edge.
        edge: Edge,
        /// Constrained customer node.
        customer: usize,
        /// Flow bound.
        bound: u32,
        /// Whether the bound is a floor or a ceiling.
        direction: Direction,
    },
}

impl Branch {
    /// Visit-flow branch on `key`.
    #[must_use]
    pub const fn visit_flow(key: VisitFlowKey, bound: u32, direction: Direction) -> Self {
        Self::VisitFlow {
            edge: key.edge,
            customer: key.customer,
            bound,
            direction,
        }
    }

    /// The branch bound.
    #[must_use]
    pub const fn bound(&self) -> u32 {
        match *self {
            Self::FleetSize { bound, .. } | Self::VisitFlow { bound, .. } => bound,
        }
    }

    /// The branch direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        match *self {
            Self::FleetSize { direction, .. } | Self::VisitFlow { direction, .. } => direction,
        }
    }

    /// Whether the branch is a `>=` constraint in the master.
    #[must_use]
    pub const fn is_lower_bound(&self) -> bool {
        matches!(self.direction(), Direction::Up)
    }

    /// The `(edge, customer)` pair of a visit-flow branch.
    #[must_use]
    pub const fn visit_flow_key(&self) -> Option<VisitFlowKey> {
        match *self {
            Self::VisitFlow { edge, customer, .. } => Some(VisitFlowKey { edge, customer }),
            Self::FleetSize { .. } => None,
        }
    }

    /// The per-path rule a visit-flow branch imposes on pricing.
    #[must_use]
    pub const fn visit_rule(&self) -> Option<VisitRule> {
        match *self {
            Self::VisitFlow {
                bound: 0,
                direction: Direction::Down,
                ..
            } => Some(VisitRule::Forbid),
            Self::VisitFlow {
                bound,
                direction: Direction::Up,
                ..
            } if bound >= 1 => Some(VisitRule::Require),
            _ => None,
        }
    }

    /// Whether `route` may stay in the master while this branch is active.
    ///
    /// Only a down branch with bound zero excludes columns outright: those
    /// that traverse the edge while serving the customer.
    #[must_use]
    pub fn is_compatible(&self, route: &Route) -> bool {
        match *self {
            Self::FleetSize { .. } => true,
            Self::VisitFlow {
                edge,
                customer,
                bound,
                direction,
            } => {
                direction == Direction::Up
                    || bound > 0
                    || !(route.serves(customer) && route.contains_edge(edge))
            }
        }
    }

    /// Whether `route` counts towards the left-hand side of the branch row.
    #[must_use]
    pub fn covers(&self, route: &Route) -> bool {
        match *self {
            Self::FleetSize { .. } => true,
            Self::VisitFlow { edge, customer, .. } => {
                route.serves(customer) && route.contains_edge(edge)
            }
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = |direction: Direction| match direction {
            Direction::Up => ">=",
            Direction::Down => "<=",
        };
        match *self {
            Self::FleetSize { bound, direction } => {
                write!(f, "vehicles {} {bound}", op(direction))
            }
            Self::VisitFlow {
                edge,
                customer,
                bound,
                direction,
            } => write!(
                f,
                "flow({}->{}, customer {customer}) {} {bound}",
                edge.start,
                edge.end,
                op(direction)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn route() -> Route {
        Route::new(vec![0, 1, 2, 0], vec![2.0, 1.0, 2.0], [1, 2]).expect("valid route")
    }

    fn flow(customer: usize, bound: u32, direction: Direction) -> Branch {
        Branch::VisitFlow {
            edge: Edge::new(1, 2),
            customer,
            bound,
            direction,
        }
    }

    #[rstest]
    #[case(flow(1, 0, Direction::Down), false)]
    #[case(flow(3, 0, Direction::Down), true)]
    #[case(flow(1, 1, Direction::Down), true)]
    #[case(flow(1, 1, Direction::Up), true)]
    #[case(Branch::FleetSize { bound: 1, direction: Direction::Down }, true)]
    fn compatibility_only_excludes_forbidden_pairs(
        route: Route,
        #[case] branch: Branch,
        #[case] expected: bool,
    ) {
        assert_eq!(branch.is_compatible(&route), expected);
    }

    #[rstest]
    #[case(flow(1, 0, Direction::Down), Some(VisitRule::Forbid))]
    #[case(flow(1, 1, Direction::Down), None)]
    #[case(flow(1, 1, Direction::Up), Some(VisitRule::Require))]
    #[case(flow(1, 0, Direction::Up), None)]
    #[case(Branch::FleetSize { bound: 0, direction: Direction::Down }, None)]
    fn visit_rules_follow_bounds(#[case] branch: Branch, #[case] expected: Option<VisitRule>) {
        assert_eq!(branch.visit_rule(), expected);
    }

    #[rstest]
    fn covers_requires_edge_and_customer(route: Route) {
        assert!(flow(2, 1, Direction::Up).covers(&route));
        assert!(!flow(4, 1, Direction::Up).covers(&route));
    }

    #[rstest]
    fn display_is_readable() {
        assert_eq!(
            flow(1, 0, Direction::Down).to_string(),
            "flow(1->2, customer 1) <= 0"
        );
    }
}
