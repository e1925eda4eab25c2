//! Arena of explored search nodes.

use starroute_core::Branch;

use crate::SolveError;

/// Index of the root node in every [`SearchTree`].
pub const ROOT: usize = 0;

/// A node of the branch-and-price tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchNode {
    parent: Option<usize>,
    branch: Option<Branch>,
    depth: usize,
    children: Vec<usize>,
    bound: Option<f64>,
}

impl SearchNode {
    /// Parent node; `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Branch introduced at this node; `None` for the root.
    #[must_use]
    pub const fn branch(&self) -> Option<Branch> {
        self.branch
    }

    /// Number of branches between the root and this node.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Child nodes in creation order.
    #[must_use]
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Relaxation objective once solved. Infeasible nodes hold infinity.
    #[must_use]
    pub const fn bound(&self) -> Option<f64> {
        self.bound
    }
}

/// Branches to retract and apply when moving between two nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    /// Branches only on the old path, deepest first.
    pub remove: Vec<Branch>,
    /// Branches only on the new path, shallowest first.
    pub add: Vec<Branch>,
}

/// Nodes are never freed; the depth-first order keeps the arena small.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
}

impl Default for SearchTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTree {
    /// A tree holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![SearchNode {
                parent: None,
                branch: None,
                depth: 0,
                children: Vec::new(),
                bound: None,
            }],
        }
    }

    /// Every node, indexed by id.
    #[must_use]
    pub fn nodes(&self) -> &[SearchNode] {
        &self.nodes
    }

    /// Node `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::BrokenTree`] when the node does not exist.
    pub fn node(&self, id: usize) -> Result<&SearchNode, SolveError> {
        self.nodes.get(id).ok_or(SolveError::BrokenTree { node: id })
    }

    pub(crate) fn add_child(&mut self, parent: usize, branch: Branch) -> Result<usize, SolveError> {
        let depth = self.node(parent)?.depth.saturating_add(1);
        let id = self.nodes.len();
        self.nodes.push(SearchNode {
            parent: Some(parent),
            branch: Some(branch),
            depth,
            children: Vec::new(),
            bound: None,
        });
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(id);
        }
        Ok(id)
    }

    pub(crate) fn set_bound(&mut self, id: usize, bound: f64) -> Result<(), SolveError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(SolveError::BrokenTree { node: id })?;
        node.bound = Some(bound);
        Ok(())
    }

    /// Node ids from the root down to `id`.
    fn lineage(&self, id: usize) -> Result<Vec<usize>, SolveError> {
        let mut lineage = vec![id];
        let mut cursor = self.node(id)?.parent;
        while let Some(parent) = cursor {
            lineage.push(parent);
            cursor = self.node(parent)?.parent;
        }
        lineage.reverse();
        Ok(lineage)
    }

    /// Branch changes that turn the constraint set of `from` into that of
    /// `to`.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::BrokenTree`] when either node does not exist.
    pub fn transition(&self, from: usize, to: usize) -> Result<Transition, SolveError> {
        let old = self.lineage(from)?;
        let new = self.lineage(to)?;
        let shared = old
            .iter()
            .zip(&new)
            .take_while(|(a, b)| a == b)
            .count();
        let branches = |ids: &[usize]| -> Result<Vec<Branch>, SolveError> {
            let mut collected = Vec::with_capacity(ids.len());
            for &id in ids {
                collected.extend(self.node(id)?.branch);
            }
            Ok(collected)
        };
        let mut remove = branches(old.get(shared..).unwrap_or_default())?;
        remove.reverse();
        let add = branches(new.get(shared..).unwrap_or_default())?;
        Ok(Transition { remove, add })
    }

    /// Lower bound of the subtree rooted at `id`: the minimum of the node's
    /// own bound and the bounds of its solved descendants.
    ///
    /// Returns `None` while the node itself is unsolved.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::BrokenTree`] when the node does not exist.
    pub fn lower_bound(&self, id: usize) -> Result<Option<f64>, SolveError> {
        let Some(mut bound) = self.node(id)?.bound else {
            return Ok(None);
        };
        let mut stack = self.node(id)?.children.clone();
        while let Some(child) = stack.pop() {
            let node = self.node(child)?;
            if let Some(child_bound) = node.bound {
                bound = bound.min(child_bound);
            }
            stack.extend(&node.children);
        }
        Ok(Some(bound))
    }
}
