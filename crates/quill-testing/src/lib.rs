//! Test support for recipe crates: parse a fixture forest with a pluggable
//! parser, run one recipe, and assert on the rewritten text.
//!
//! Fixtures are plain data (name, input, expected output), so per-scenario
//! coverage is a table rather than a test-class hierarchy.

use pretty_assertions::assert_eq;

use quill_recipe::{FileOutcome, Forest, Pipeline, Recipe, SourceFile, SourceParser};
use quill_tree::Tree;

/// Drives a recipe against a primary source plus its dependent sources.
/// The primary source is always tree 0 of the forest.
pub struct RecipeHarness<'p> {
    parser: &'p dyn SourceParser,
}

impl<'p> RecipeHarness<'p> {
    pub fn new(parser: &'p dyn SourceParser) -> Self {
        Self { parser }
    }

    fn parse_forest(&self, before: &SourceFile, depends_on: &[SourceFile]) -> Forest {
        let mut trees: Vec<Tree> = Vec::with_capacity(1 + depends_on.len());
        trees.push(self.parse_one(before));
        for dep in depends_on {
            trees.push(self.parse_one(dep));
        }
        Forest::new(trees)
    }

    fn parse_one(&self, file: &SourceFile) -> Tree {
        match self.parser.parse(file) {
            Ok(tree) => {
                let rendered = tree.render();
                assert_eq!(rendered, file.text, "parse of {} did not round-trip", file.path);
                tree
            }
            Err(err) => panic!("fixture {} failed to parse: {err}", file.path),
        }
    }

    /// Run `recipe` and assert the primary source is rewritten to `after`.
    /// Also asserts idempotence: re-running the recipe on its own output
    /// must change nothing.
    pub fn assert_changed(
        &self,
        recipe: impl Recipe + Clone + 'static,
        before: &SourceFile,
        depends_on: &[SourceFile],
        after: &str,
    ) {
        let forest = self.parse_forest(before, depends_on);
        let pipeline = Pipeline::new().with(recipe.clone());
        let result = pipeline.run(forest).expect("recipe run failed");

        match &result.files[0] {
            FileOutcome::Rewritten { text, .. } => assert_eq!(text.as_str(), after),
            FileOutcome::Unchanged { file } => panic!(
                "expected {file} to change:\n{}",
                similar::TextDiff::from_lines(before.text.as_str(), after).unified_diff()
            ),
        }

        let rerun = Pipeline::new()
            .with(recipe)
            .run(result.forest)
            .expect("second recipe run failed");
        assert!(
            !rerun.changed(),
            "recipe is not idempotent; it changed its own output again"
        );
    }

    /// Run `recipe` and assert the primary source comes back unchanged.
    pub fn assert_unchanged(
        &self,
        recipe: impl Recipe + 'static,
        before: &SourceFile,
        depends_on: &[SourceFile],
    ) {
        let forest = self.parse_forest(before, depends_on);
        let result = Pipeline::new()
            .with(recipe)
            .run(forest)
            .expect("recipe run failed");
        if let FileOutcome::Rewritten { file, text } = &result.files[0] {
            panic!(
                "expected {file} to stay unchanged, got:\n{}",
                similar::TextDiff::from_lines(before.text.as_str(), text.as_str()).unified_diff()
            );
        }
    }
}

/// One table-driven scenario: `expected = None` asserts a no-op.
pub struct Scenario {
    pub name: &'static str,
    pub before: &'static str,
    pub expected: Option<&'static str>,
}

/// Run a table of scenarios over single-file fixtures named `scenario.name`.
pub fn run_scenarios<R, F>(parser: &dyn SourceParser, make_recipe: F, scenarios: &[Scenario])
where
    R: Recipe + Clone + 'static,
    F: Fn() -> R,
{
    let harness = RecipeHarness::new(parser);
    for scenario in scenarios {
        let before = SourceFile::new(scenario.name, scenario.before);
        match scenario.expected {
            Some(after) => harness.assert_changed(make_recipe(), &before, &[], after),
            None => harness.assert_unchanged(make_recipe(), &before, &[]),
        }
    }
}
