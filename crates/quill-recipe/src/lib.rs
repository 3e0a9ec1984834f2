//! Recipe framework: validated transformation definitions, the forest they
//! run over, and the pipeline that chains them.
//!
//! A recipe moves through `Configured → Validated → {Matched → Applied} |
//! Skipped → Done`. Validation is evaluated against the configuration alone
//! and a failure is terminal before any tree is touched. Running a recipe
//! never mutates a tree in place: it plans localized changes which the
//! pipeline applies copy-on-write via [`quill_tree::apply`].

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use quill_tree::{Change, ConflictError, NodeId, ParseError, SourceId, Tree};

pub mod batch;
pub mod pipeline;

pub use batch::{run_batch, BatchOutcome, BatchReport, SourceFile, SourceParser};
pub use pipeline::{ChangeSummary, FileOutcome, Pipeline, PipelineResult, RecipeReport, RunStatus};

/// A located node selected for modification, together with the resolved
/// signature that matched it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditTarget {
    /// Index of the owning tree within the forest.
    pub tree: usize,
    pub node: NodeId,
    /// Human-readable identity of what matched, e.g. `B singleArg(String)`.
    pub signature: String,
}

/// One field-level configuration failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    pub property: String,
    pub message: String,
}

/// Outcome of validating a recipe's configuration. Failures keep the order
/// in which the checks ran, so callers can assert on them deterministically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Validated {
    failures: Vec<ValidationFailure>,
}

impl Validated {
    pub fn valid() -> Self {
        Self::default()
    }

    /// Record a failure when `value` is absent.
    pub fn required(mut self, property: &str, value: &Option<String>) -> Self {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            self.failures.push(ValidationFailure {
                property: property.to_string(),
                message: format!("{property} is required"),
            });
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<ValidationFailure> {
        self.failures
    }
}

/// An ordered set of parsed trees plus their parent links. Read-only while
/// recipes match; all cross-tree resolution finishes before any change is
/// applied.
#[derive(Clone, Debug, Default)]
pub struct Forest {
    trees: Vec<Tree>,
}

impl Forest {
    pub fn new(trees: Vec<Tree>) -> Self {
        Self { trees }
    }

    pub fn single(tree: Tree) -> Self {
        Self { trees: vec![tree] }
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn tree(&self, index: usize) -> &Tree {
        &self.trees[index]
    }

    pub fn trees(&self) -> impl Iterator<Item = (usize, &Tree)> {
        self.trees.iter().enumerate()
    }

    pub fn by_source(&self, source: &SourceId) -> Option<(usize, &Tree)> {
        self.trees
            .iter()
            .enumerate()
            .find(|(_, t)| t.source() == source)
    }

    /// Resolve a tree's parent back-link against this forest.
    pub fn parent_of(&self, index: usize) -> Option<(usize, &Tree)> {
        let parent = self.tree(index).parent()?;
        self.by_source(parent)
    }

    /// Apply a plan, deriving a new forest. Trees without planned changes
    /// are carried over untouched (same arena, shared by identity).
    pub fn apply(&self, plan: &Plan) -> Result<Forest, ConflictError> {
        let mut trees = Vec::with_capacity(self.trees.len());
        for (index, tree) in self.trees.iter().enumerate() {
            match plan.changes_for(index) {
                Some(changes) => trees.push(quill_tree::apply(tree, changes)?),
                None => trees.push(tree.clone()),
            }
        }
        Ok(Forest { trees })
    }
}

/// The changes one recipe wants to make, grouped per tree. Transient: a plan
/// is only valid against the exact forest it was computed from.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    by_tree: BTreeMap<usize, Vec<Change>>,
}

impl Plan {
    pub fn push(&mut self, tree: usize, change: Change) {
        self.by_tree.entry(tree).or_default().push(change);
    }

    pub fn is_empty(&self) -> bool {
        self.by_tree.values().all(Vec::is_empty)
    }

    pub fn change_count(&self) -> usize {
        self.by_tree.values().map(Vec::len).sum()
    }

    pub fn changes_for(&self, tree: usize) -> Option<&[Change]> {
        self.by_tree.get(&tree).map(Vec::as_slice)
    }

    pub fn touched_trees(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_tree
            .iter()
            .filter(|(_, c)| !c.is_empty())
            .map(|(t, _)| *t)
    }
}

/// A named, validated transformation definition.
pub trait Recipe {
    fn name(&self) -> &str;

    /// Check required configuration. Independent of any tree.
    fn validate(&self) -> Validated;

    /// Locate targets and plan changes against a read-only forest. Zero
    /// planned changes is a legitimate outcome (`NoMatch`), not an error.
    fn plan(&self, forest: &Forest) -> Result<Plan, RecipeError>;
}

/// Recipe misconfiguration: ordered field-level failures. Execution never
/// started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub recipe: String,
    pub failures: Vec<ValidationFailure>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recipe {} is misconfigured:", self.recipe)?;
        for failure in &self.failures {
            write!(f, " [{}: {}]", failure.property, failure.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn required_checks_keep_declaration_order() {
        let validated = Validated::valid()
            .required("groupId", &None)
            .required("newVersion", &None);
        assert!(!validated.is_valid());
        let properties: Vec<_> = validated
            .failures()
            .iter()
            .map(|f| f.property.as_str())
            .collect();
        assert_eq!(properties, vec!["groupId", "newVersion"]);
    }

    #[test]
    fn present_values_pass_validation() {
        let validated = Validated::valid()
            .required("groupId", &Some("com.google.guava".to_string()))
            .required("newVersion", &Some("latest.release".to_string()));
        assert!(validated.is_valid());
    }

    #[test]
    fn blank_counts_as_missing() {
        let validated = Validated::valid().required("groupId", &Some("  ".to_string()));
        assert!(!validated.is_valid());
    }
}
