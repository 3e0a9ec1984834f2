//! Chained recipe execution over a forest.

use tracing::debug;

use quill_tree::SourceId;

use crate::{Forest, Recipe, RecipeError, ValidationError};

/// Outcome of one recipe within a pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// The recipe found no targets; the forest passed through untouched.
    Skipped,
    /// The recipe applied this many changes.
    Changed(usize),
}

/// One localized before/after pair, inspectable without re-parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeSummary {
    pub file: SourceId,
    pub before: String,
    pub after: String,
}

#[derive(Clone, Debug)]
pub struct RecipeReport {
    pub recipe: String,
    pub status: RunStatus,
    pub changes: Vec<ChangeSummary>,
}

/// Per-file result of a whole pipeline run. Unmodified files are reported
/// unchanged and their text is not re-emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Unchanged { file: SourceId },
    Rewritten { file: SourceId, text: String },
}

impl FileOutcome {
    pub fn file(&self) -> &SourceId {
        match self {
            FileOutcome::Unchanged { file } | FileOutcome::Rewritten { file, .. } => file,
        }
    }
}

#[derive(Debug)]
pub struct PipelineResult {
    pub forest: Forest,
    pub reports: Vec<RecipeReport>,
    pub files: Vec<FileOutcome>,
}

impl PipelineResult {
    pub fn changed(&self) -> bool {
        self.files
            .iter()
            .any(|f| matches!(f, FileOutcome::Rewritten { .. }))
    }

    /// Unified diff of every rewritten file against `original`, for
    /// reporting. Unchanged files contribute nothing.
    pub fn diff(&self, original: &Forest) -> String {
        let mut out = String::new();
        for outcome in &self.files {
            let FileOutcome::Rewritten { file, text } = outcome else {
                continue;
            };
            let Some((_, before)) = original.by_source(file) else {
                continue;
            };
            let before_text = before.render();
            let diff = similar::TextDiff::from_lines(before_text.as_str(), text.as_str());
            out.push_str(
                &diff
                    .unified_diff()
                    .header(file.as_str(), file.as_str())
                    .to_string(),
            );
        }
        out
    }
}

/// An ordered chain of recipes. Each recipe sees the output forest of the
/// previous one, never the original.
#[derive(Default)]
pub struct Pipeline {
    recipes: Vec<Box<dyn Recipe>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, recipe: impl Recipe + 'static) -> Self {
        self.recipes.push(Box::new(recipe));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Validate every recipe, then run them in order. A validation failure
    /// is terminal before any tree is touched.
    pub fn run(&self, forest: Forest) -> Result<PipelineResult, RecipeError> {
        for recipe in &self.recipes {
            let validated = recipe.validate();
            if !validated.is_valid() {
                return Err(ValidationError {
                    recipe: recipe.name().to_string(),
                    failures: validated.into_failures(),
                }
                .into());
            }
        }

        let original = forest.clone();
        let mut current = forest;
        let mut reports = Vec::with_capacity(self.recipes.len());

        for recipe in &self.recipes {
            let plan = recipe.plan(&current)?;
            if plan.is_empty() {
                debug!(recipe = recipe.name(), "no targets matched; skipping");
                reports.push(RecipeReport {
                    recipe: recipe.name().to_string(),
                    status: RunStatus::Skipped,
                    changes: Vec::new(),
                });
                continue;
            }

            let mut changes = Vec::new();
            for tree_index in plan.touched_trees() {
                let tree = current.tree(tree_index);
                for change in plan.changes_for(tree_index).unwrap_or_default() {
                    changes.push(ChangeSummary {
                        file: tree.source().clone(),
                        before: change.old_text().to_string(),
                        after: change.new_text().to_string(),
                    });
                }
            }

            let count = plan.change_count();
            debug!(recipe = recipe.name(), changes = count, "applying plan");
            current = current.apply(&plan)?;
            reports.push(RecipeReport {
                recipe: recipe.name().to_string(),
                status: RunStatus::Changed(count),
                changes,
            });
        }

        let files = original
            .trees()
            .map(|(index, before)| {
                let after = current.tree(index);
                let after_text = after.render();
                if after_text == before.render() {
                    FileOutcome::Unchanged {
                        file: before.source().clone(),
                    }
                } else {
                    FileOutcome::Rewritten {
                        file: before.source().clone(),
                        text: after_text,
                    }
                }
            })
            .collect();

        Ok(PipelineResult {
            forest: current,
            reports,
            files,
        })
    }
}
