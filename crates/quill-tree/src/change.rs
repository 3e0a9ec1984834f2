//! Structural mutation layer: localized [`Change`]s applied copy-on-write.
//!
//! A [`Change`] is a pure old-node → new-node replacement, inspectable without
//! re-parsing. [`apply`] derives a new [`Tree`] whose untouched arena slots
//! are the same `Arc`s as the input tree's.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::{NodeData, NodeId, Tree};

/// A localized replacement of one node. Scoped to a single recipe run; a
/// change computed against one tree must be applied to that tree (applying it
/// to a diverged tree is a conflict).
#[derive(Clone, Debug)]
pub struct Change {
    target: NodeId,
    old: Arc<NodeData>,
    new: Arc<NodeData>,
}

impl Change {
    /// Replace the node's payload text, keeping its formatting prefix and
    /// children untouched.
    pub fn retext(tree: &Tree, target: NodeId, new_text: impl Into<String>) -> Self {
        let old = Arc::clone(tree.node_arc(target));
        let new = NodeData {
            text: new_text.into(),
            ..(*old).clone()
        };
        Self {
            target,
            old,
            new: Arc::new(new),
        }
    }

    /// Replace the node's formatting prefix, keeping payload and children.
    pub fn reprefix(tree: &Tree, target: NodeId, new_prefix: impl Into<String>) -> Self {
        let old = Arc::clone(tree.node_arc(target));
        let new = NodeData {
            prefix: new_prefix.into(),
            ..(*old).clone()
        };
        Self {
            target,
            old,
            new: Arc::new(new),
        }
    }

    /// Replace the node wholesale. The caller supplies everything, including
    /// the prefix and child list.
    pub fn replace(tree: &Tree, target: NodeId, new: NodeData) -> Self {
        Self {
            target,
            old: Arc::clone(tree.node_arc(target)),
            new: Arc::new(new),
        }
    }

    /// Drop `child` from the target container's child list. The orphaned
    /// subtree stays in the arena but is no longer reachable from the root.
    pub fn remove_child(tree: &Tree, target: NodeId, child: NodeId) -> Self {
        Self::remove_children(tree, target, &[child])
    }

    /// Drop several children of one container in a single change, so the
    /// removals cannot conflict with each other.
    pub fn remove_children(tree: &Tree, target: NodeId, victims: &[NodeId]) -> Self {
        let old = Arc::clone(tree.node_arc(target));
        let mut new = (*old).clone();
        new.children.retain(|c| !victims.contains(c));
        Self {
            target,
            old,
            new: Arc::new(new),
        }
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn old_node(&self) -> &NodeData {
        &self.old
    }

    pub fn new_node(&self) -> &NodeData {
        &self.new
    }

    pub fn old_text(&self) -> &str {
        &self.old.text
    }

    pub fn new_text(&self) -> &str {
        &self.new.text
    }

    fn is_noop(&self) -> bool {
        *self.old == *self.new
    }
}

/// Two changes fought over one node, or a change was computed against a tree
/// that has since diverged. Fatal for the recipe run that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("conflicting changes both target node {0:?}")]
    Overlap(NodeId),
    #[error("stale change for node {0:?}: the tree diverged since it was computed")]
    Stale(NodeId),
    #[error("change targets node {0:?} which is not in this tree")]
    UnknownNode(NodeId),
}

/// Apply a set of changes, producing a derived tree.
///
/// Untouched nodes are shared by identity with the input tree. An empty
/// change set yields a tree that renders identically. Each change's recorded
/// `old` node must still be the live arena slot, otherwise the change is
/// stale and rejected.
pub fn apply(tree: &Tree, changes: &[Change]) -> Result<Tree, ConflictError> {
    let mut arena = tree.arena_clone();

    let mut touched = HashSet::new();
    for change in changes {
        if change.is_noop() {
            continue;
        }
        let index = change.target.index();
        if index >= arena.len() {
            return Err(ConflictError::UnknownNode(change.target));
        }
        if !touched.insert(change.target) {
            return Err(ConflictError::Overlap(change.target));
        }
        if !Arc::ptr_eq(&arena[index], &change.old) {
            return Err(ConflictError::Stale(change.target));
        }
        arena[index] = Arc::clone(&change.new);
    }

    Ok(tree.derive(arena))
}
