//! Depth, path and ordering computations over the category forest.
//!
//! Parent links are weak: a dangling parent id makes the node a root, and
//! every walk carries a visited set so a corrupted cycle cannot loop forever.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::entity::category;
use crate::error::AppError;

/// Deepest level a category may sit at (roots are level 1).
pub const MAX_DEPTH: u32 = 5;

/// Separator between ancestor names in a category path.
pub const PATH_SEPARATOR: &str = " / ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Category {0} not found")]
    NotFound(i32),
    #[error("A category cannot be its own parent")]
    SelfParent,
    #[error("Cannot move a category under one of its descendants")]
    Cycle,
    #[error("Maximum category depth is 5")]
    DepthExceeded,
}

impl From<TreeError> for AppError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::NotFound(_) => AppError::NotFound("Category not found".into()),
            other => AppError::Validation(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: i32,
    pub parent_id: Option<i32>,
    pub position: i32,
    pub name: String,
}

impl From<&category::Model> for TreeNode {
    fn from(m: &category::Model) -> Self {
        Self {
            id: m.id,
            parent_id: m.parent_id,
            position: m.position,
            name: m.name.clone(),
        }
    }
}

pub struct Forest {
    nodes: HashMap<i32, TreeNode>,
    /// Children per parent, sorted by (position, name, id).
    children: HashMap<i32, Vec<i32>>,
    /// Nodes without a live parent, same ordering.
    roots: Vec<i32>,
}

impl Forest {
    pub fn new(nodes: impl IntoIterator<Item = TreeNode>) -> Self {
        let nodes: HashMap<i32, TreeNode> = nodes.into_iter().map(|n| (n.id, n)).collect();

        let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
        let mut roots = Vec::new();
        for node in nodes.values() {
            match node.parent_id {
                Some(parent) if nodes.contains_key(&parent) => {
                    children.entry(parent).or_default().push(node.id)
                }
                _ => roots.push(node.id),
            }
        }

        let sort_key = |id: &i32| {
            let n = &nodes[id];
            (n.position, n.name.clone(), n.id)
        };
        roots.sort_by_key(sort_key);
        for list in children.values_mut() {
            list.sort_by_key(sort_key);
        }

        Self {
            nodes,
            children,
            roots,
        }
    }

    pub fn get(&self, id: i32) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    fn parent_of(&self, id: i32) -> Option<i32> {
        self.nodes
            .get(&id)
            .and_then(|n| n.parent_id)
            .filter(|p| self.nodes.contains_key(p))
    }

    /// Ids from the top-most reachable ancestor down to `id`.
    fn lineage(&self, id: i32) -> Vec<i32> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if !seen.insert(node) {
                break;
            }
            chain.push(node);
            current = self.parent_of(node);
        }
        chain.reverse();
        chain
    }

    /// Level of `id`, 1 at the root.
    pub fn depth(&self, id: i32) -> Result<u32, TreeError> {
        if !self.nodes.contains_key(&id) {
            return Err(TreeError::NotFound(id));
        }
        Ok(self.lineage(id).len() as u32)
    }

    /// Ancestor names joined by [`PATH_SEPARATOR`], ending with the node itself.
    pub fn path(&self, id: i32) -> Result<String, TreeError> {
        if !self.nodes.contains_key(&id) {
            return Err(TreeError::NotFound(id));
        }
        Ok(self
            .lineage(id)
            .iter()
            .map(|n| self.nodes[n].name.as_str())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR))
    }

    fn children_of(&self, id: i32) -> &[i32] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every node strictly below `id`, walking down.
    fn descendants(&self, id: i32) -> Vec<i32> {
        let mut seen = HashSet::from([id]);
        let mut out = Vec::new();
        let mut stack: Vec<i32> = self.children_of(id).to_vec();
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            out.push(node);
            stack.extend_from_slice(self.children_of(node));
        }
        out
    }

    pub fn is_descendant(&self, ancestor: i32, candidate: i32) -> bool {
        self.descendants(ancestor).contains(&candidate)
    }

    pub fn descendant_count(&self, id: i32) -> usize {
        self.descendants(id).len()
    }

    /// Levels in the subtree rooted at `id`, counting `id` itself as 1.
    pub fn subtree_height(&self, id: i32) -> u32 {
        let mut seen = HashSet::new();
        self.height_from(id, &mut seen)
    }

    fn height_from(&self, id: i32, seen: &mut HashSet<i32>) -> u32 {
        if !seen.insert(id) {
            return 0;
        }
        let below = self
            .children_of(id)
            .iter()
            .map(|&c| self.height_from(c, seen))
            .max()
            .unwrap_or(0);
        below + 1
    }

    /// Pre-order listing: parents before descendants, siblings by position.
    /// Nodes unreachable from any root (only possible with a corrupted
    /// cycle) are appended afterwards.
    pub fn listing_order(&self) -> Vec<i32> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.visit(root, &mut seen, &mut out);
        }
        if out.len() < self.nodes.len() {
            let mut rest: Vec<i32> = self
                .nodes
                .keys()
                .copied()
                .filter(|id| !seen.contains(id))
                .collect();
            rest.sort_unstable();
            for id in rest {
                self.visit(id, &mut seen, &mut out);
            }
        }
        out
    }

    fn visit(&self, id: i32, seen: &mut HashSet<i32>, out: &mut Vec<i32>) {
        if !seen.insert(id) {
            return;
        }
        out.push(id);
        for &child in self.children_of(id) {
            self.visit(child, seen, out);
        }
    }

    /// Depth a new child of `parent` would get.
    pub fn depth_for_new_child(&self, parent: Option<i32>) -> Result<u32, TreeError> {
        let Some(parent) = parent else {
            return Ok(1);
        };
        let parent_depth = self.depth(parent)?;
        if parent_depth >= MAX_DEPTH {
            return Err(TreeError::DepthExceeded);
        }
        Ok(parent_depth + 1)
    }

    /// Validate moving `id` (with its subtree) under `target`.
    pub fn check_move(&self, id: i32, target: Option<i32>) -> Result<(), TreeError> {
        if !self.nodes.contains_key(&id) {
            return Err(TreeError::NotFound(id));
        }
        let Some(target) = target else {
            return if self.subtree_height(id) > MAX_DEPTH {
                Err(TreeError::DepthExceeded)
            } else {
                Ok(())
            };
        };
        if target == id {
            return Err(TreeError::SelfParent);
        }
        let target_depth = self.depth(target)?;
        if self.is_descendant(id, target) {
            return Err(TreeError::Cycle);
        }
        if target_depth + self.subtree_height(id) > MAX_DEPTH {
            return Err(TreeError::DepthExceeded);
        }
        Ok(())
    }
}
