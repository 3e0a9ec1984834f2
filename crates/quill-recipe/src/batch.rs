//! Batch driver: run one pipeline over many independent inputs.
//!
//! Each input parses and runs in isolation, so a malformed file never
//! prevents rewriting its siblings.

use tracing::{debug, warn};

use quill_tree::{ParseError, SourceId, Tree};

use crate::{Forest, Pipeline, RecipeError};

/// Raw input: source text plus the identity it should carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub path: SourceId,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: SourceId::new(path),
            text: text.into(),
        }
    }
}

/// Pluggable parser capability. Implemented by the Java and XML/POM parsers;
/// the batch driver and test harness only see this seam.
pub trait SourceParser {
    fn parse(&self, file: &SourceFile) -> Result<Tree, ParseError>;
}

#[derive(Debug)]
pub enum BatchOutcome {
    Unchanged {
        file: SourceId,
    },
    Rewritten {
        file: SourceId,
        text: String,
    },
    /// Parse or recipe failure scoped to this input alone.
    Failed {
        file: SourceId,
        error: RecipeError,
    },
}

impl BatchOutcome {
    pub fn file(&self) -> &SourceId {
        match self {
            BatchOutcome::Unchanged { file }
            | BatchOutcome::Rewritten { file, .. }
            | BatchOutcome::Failed { file, .. } => file,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, BatchOutcome::Failed { .. })
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn rewritten(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BatchOutcome::Rewritten { .. }))
    }
}

/// Parse and transform each input independently, reporting success or
/// failure per input.
pub fn run_batch(
    parser: &dyn SourceParser,
    pipeline: &Pipeline,
    inputs: &[SourceFile],
) -> BatchReport {
    let mut report = BatchReport::default();
    for input in inputs {
        let outcome = run_one(parser, pipeline, input);
        if let BatchOutcome::Failed { file, error } = &outcome {
            warn!(%file, %error, "batch input failed");
        } else {
            debug!(file = %outcome.file(), "batch input processed");
        }
        report.outcomes.push(outcome);
    }
    report
}

fn run_one(parser: &dyn SourceParser, pipeline: &Pipeline, input: &SourceFile) -> BatchOutcome {
    let tree = match parser.parse(input) {
        Ok(tree) => tree,
        Err(error) => {
            return BatchOutcome::Failed {
                file: input.path.clone(),
                error: error.into(),
            }
        }
    };
    match pipeline.run(Forest::single(tree)) {
        Ok(result) => {
            let mut rewritten = None;
            for file in result.files {
                if let crate::FileOutcome::Rewritten { text, .. } = file {
                    rewritten = Some(text);
                }
            }
            match rewritten {
                Some(text) => BatchOutcome::Rewritten {
                    file: input.path.clone(),
                    text,
                },
                None => BatchOutcome::Unchanged {
                    file: input.path.clone(),
                },
            }
        }
        Err(error) => BatchOutcome::Failed {
            file: input.path.clone(),
            error,
        },
    }
}
