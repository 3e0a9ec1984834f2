//! Version metadata lookup for dependency upgrades.

use quill_semver::Version;

/// Source of published versions for an artifact. Implementations are queried
/// once per upgraded dependency; the planner never writes through this trait.
pub trait MavenMetadata {
    /// All known versions of `group_id:artifact_id`, any order.
    fn available_versions(&self, group_id: &str, artifact_id: &str) -> Vec<Version>;
}

/// Fixed metadata table, used by tests and offline runs.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMetadata {
    entries: Vec<(String, String, Vec<Version>)>,
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the published versions of one artifact.
    pub fn with_versions(
        mut self,
        group_id: &str,
        artifact_id: &str,
        versions: &[&str],
    ) -> Self {
        let parsed = versions.iter().map(|v| Version::parse(v)).collect();
        self.entries
            .push((group_id.to_string(), artifact_id.to_string(), parsed));
        self
    }
}

impl MavenMetadata for InMemoryMetadata {
    fn available_versions(&self, group_id: &str, artifact_id: &str) -> Vec<Version> {
        self.entries
            .iter()
            .find(|(g, a, _)| g == group_id && a == artifact_id)
            .map(|(_, _, versions)| versions.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_artifact_has_no_versions() {
        let metadata = InMemoryMetadata::new()
            .with_versions("com.google.guava", "guava", &["25.0-jre", "28.0-jre"]);
        assert!(metadata
            .available_versions("com.google.guava", "failureaccess")
            .is_empty());
        assert_eq!(
            metadata.available_versions("com.google.guava", "guava").len(),
            2
        );
    }
}
