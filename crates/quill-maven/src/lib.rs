//! Maven build-file support: POM parsing into lossless trees, a read-only
//! project model with parent-chain `${property}` resolution, and the
//! dependency upgrade recipe.

pub mod metadata;
pub mod pom;
pub mod recipes;

pub use metadata::{InMemoryMetadata, MavenMetadata};
pub use pom::{Gav, MavenProject, Pom, PomDependency, PomProperty, ResolvedValue};
pub use recipes::UpgradeDependencyVersion;

use quill_recipe::{SourceFile, SourceParser};
use quill_tree::{ParseError, Tree};
use quill_xml::{element_name, root_element};

/// Parses POM files. Rejects well-formed XML whose root element is not
/// `<project>`, so stray XML in a batch fails that file alone rather than
/// producing a tree no maven recipe can use.
#[derive(Clone, Copy, Debug, Default)]
pub struct MavenParser;

impl SourceParser for MavenParser {
    fn parse(&self, file: &SourceFile) -> Result<Tree, ParseError> {
        let tree = quill_xml::parse(&file.text, file.path.clone())?;
        match root_element(&tree).and_then(|e| element_name(&tree, e)) {
            Some("project") => Ok(tree),
            _ => Err(ParseError::new(
                file.path.clone(),
                1,
                1,
                "root element is not <project>",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_pom_and_rejects_other_xml() {
        let parser = MavenParser;
        let pom = SourceFile::new("pom.xml", "<project></project>");
        assert!(parser.parse(&pom).is_ok());

        let other = SourceFile::new("beans.xml", "<beans></beans>");
        let err = parser.parse(&other).unwrap_err();
        assert!(err.to_string().contains("root element"));
    }
}
