//! Maven recipes.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use quill_recipe::{Forest, Plan, Recipe, RecipeError, Validated};
use quill_semver::{Version, VersionRange};
use quill_tree::Change;

use crate::metadata::{InMemoryMetadata, MavenMetadata};
use crate::pom::MavenProject;

/// Upgrade the declared version of one `groupId:artifactId` across every POM
/// in the forest. `new_version` is a range expression (`"28.0"`, `"25-28"`,
/// `"~1.5"`, `"latest.release"`, `"latest.integration"`) and
/// `version_pattern` optionally narrows candidates to a qualifier suffix
/// such as `-jre`.
///
/// When the declared version is a `${property}` reference, the edit lands on
/// the POM that declares the property, which may be a parent rather than the
/// POM that declares the dependency.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpgradeDependencyVersion {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub new_version: Option<String>,
    pub version_pattern: Option<String>,
    #[serde(skip, default = "default_metadata")]
    pub metadata: Arc<dyn MavenMetadata>,
}

fn default_metadata() -> Arc<dyn MavenMetadata> {
    Arc::new(InMemoryMetadata::new())
}

impl Default for UpgradeDependencyVersion {
    fn default() -> Self {
        Self {
            group_id: None,
            artifact_id: None,
            new_version: None,
            version_pattern: None,
            metadata: default_metadata(),
        }
    }
}

impl std::fmt::Debug for UpgradeDependencyVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeDependencyVersion")
            .field("group_id", &self.group_id)
            .field("artifact_id", &self.artifact_id)
            .field("new_version", &self.new_version)
            .field("version_pattern", &self.version_pattern)
            .finish_non_exhaustive()
    }
}

impl UpgradeDependencyVersion {
    pub fn new(
        group_id: &str,
        artifact_id: &str,
        new_version: &str,
        version_pattern: Option<&str>,
        metadata: Arc<dyn MavenMetadata>,
    ) -> Self {
        Self {
            group_id: Some(group_id.to_string()),
            artifact_id: Some(artifact_id.to_string()),
            new_version: Some(new_version.to_string()),
            version_pattern: version_pattern.map(str::to_string),
            metadata,
        }
    }
}

impl Recipe for UpgradeDependencyVersion {
    fn name(&self) -> &str {
        "maven.UpgradeDependencyVersion"
    }

    fn validate(&self) -> Validated {
        Validated::valid()
            .required("groupId", &self.group_id)
            .required("newVersion", &self.new_version)
    }

    fn plan(&self, forest: &Forest) -> Result<Plan, RecipeError> {
        let group_id = self.group_id.as_deref().unwrap_or_default();
        let range = VersionRange::parse(
            self.new_version.as_deref().unwrap_or_default(),
            self.version_pattern.as_deref(),
        );

        let project = MavenProject::from_forest(forest);
        let mut plan = Plan::default();
        // One property can back many dependency declarations; plan its edit
        // at most once.
        let mut planned: HashSet<(usize, quill_tree::NodeId)> = HashSet::new();

        for (index, pom) in project.poms() {
            for dep in &pom.dependencies {
                if dep.group_id.as_deref() != Some(group_id) {
                    continue;
                }
                if let Some(artifact_id) = self.artifact_id.as_deref() {
                    if dep.artifact_id.as_deref() != Some(artifact_id) {
                        continue;
                    }
                }
                let Some(raw) = dep.version_text.as_deref() else {
                    continue;
                };
                let artifact = dep.artifact_id.as_deref().unwrap_or_default();
                let Some(resolved) =
                    project.resolve_version(forest, index, raw, dep.version_node)
                else {
                    debug!(
                        source = %forest.tree(index).source(),
                        version = raw,
                        "version reference does not resolve; skipping"
                    );
                    continue;
                };

                let candidates = self.metadata.available_versions(group_id, artifact);
                let Some(selected) = range.select(&candidates) else {
                    debug!(
                        group_id,
                        artifact, "no published version satisfies the requested range"
                    );
                    continue;
                };
                // Upgrades only: never step down to satisfy the range.
                if *selected <= Version::parse(&resolved.value) {
                    continue;
                }
                if planned.insert((resolved.tree, resolved.node)) {
                    plan.push(
                        resolved.tree,
                        Change::retext(forest.tree(resolved.tree), resolved.node, selected.raw()),
                    );
                }
            }
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_tree::SourceId;

    fn guava_pom(version: &str) -> quill_tree::Tree {
        let text = format!(
            "\
<project>
  <dependencies>
    <dependency>
      <groupId>com.google.guava</groupId>
      <artifactId>guava</artifactId>
      <version>{version}</version>
    </dependency>
  </dependencies>
</project>"
        );
        quill_xml::parse(&text, SourceId::new("pom.xml")).expect("parse")
    }

    fn guava_metadata() -> Arc<dyn MavenMetadata> {
        Arc::new(InMemoryMetadata::new().with_versions(
            "com.google.guava",
            "guava",
            &[
                "25.0-android",
                "25.0-jre",
                "27.1-android",
                "27.1-jre",
                "28.0-android",
                "28.0-jre",
                "29.0-rc1",
            ],
        ))
    }

    #[test]
    fn missing_configuration_reports_fields_in_order() {
        let recipe = UpgradeDependencyVersion::default();
        let validated = recipe.validate();
        let properties: Vec<_> = validated
            .failures()
            .iter()
            .map(|f| f.property.as_str())
            .collect();
        assert_eq!(properties, vec!["groupId", "newVersion"]);
    }

    #[test]
    fn major_range_with_suffix_picks_highest_matching_release() {
        let forest = Forest::single(guava_pom("25.0-android"));
        let recipe = UpgradeDependencyVersion::new(
            "com.google.guava",
            "guava",
            "25-28",
            Some("-jre"),
            guava_metadata(),
        );
        let plan = recipe.plan(&forest).unwrap();
        assert_eq!(plan.change_count(), 1);
        let rewritten = forest.apply(&plan).unwrap();
        assert!(rewritten.tree(0).render().contains("<version>28.0-jre</version>"));
    }

    #[test]
    fn already_current_version_plans_nothing() {
        let forest = Forest::single(guava_pom("28.0-jre"));
        let recipe = UpgradeDependencyVersion::new(
            "com.google.guava",
            "guava",
            "25-28",
            Some("-jre"),
            guava_metadata(),
        );
        assert!(recipe.plan(&forest).unwrap().is_empty());
    }

    #[test]
    fn unrelated_dependency_plans_nothing() {
        let forest = Forest::single(guava_pom("25.0-jre"));
        let recipe = UpgradeDependencyVersion::new(
            "junit",
            "junit",
            "latest.release",
            None,
            guava_metadata(),
        );
        assert!(recipe.plan(&forest).unwrap().is_empty());
    }

    #[test]
    fn deserializes_from_json_configuration() {
        let recipe: UpgradeDependencyVersion = serde_json::from_str(
            r#"{"groupId": "com.google.guava", "artifactId": "guava",
                "newVersion": "25-28", "versionPattern": "-jre"}"#,
        )
        .unwrap();
        assert_eq!(recipe.group_id.as_deref(), Some("com.google.guava"));
        assert_eq!(recipe.version_pattern.as_deref(), Some("-jre"));
        assert!(recipe.validate().is_valid());
    }
}
