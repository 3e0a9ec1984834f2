//! POM document model: a read-only view over a lossless XML tree, plus
//! forest-wide parent and `${property}` resolution.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use quill_recipe::Forest;
use quill_tree::{NodeId, Tree};
use quill_xml::{child_element, child_elements, element_name, root_element, text_node, text_of};

/// Maven coordinates; any part may be absent in a raw POM.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Gav {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
}

impl Gav {
    fn read(tree: &Tree, element: NodeId) -> Self {
        let value = |name: &str| {
            child_element(tree, element, name).and_then(|e| text_of(tree, e).map(str::to_string))
        };
        Self {
            group_id: value("groupId"),
            artifact_id: value("artifactId"),
            version: value("version"),
        }
    }
}

/// One `<dependency>` entry, from `<dependencies>` or
/// `<dependencyManagement>`.
#[derive(Clone, Debug)]
pub struct PomDependency {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    /// Raw `<version>` text (may be a `${property}` reference) and the text
    /// node carrying it. Absent when the version is managed elsewhere.
    pub version_text: Option<String>,
    pub version_node: Option<NodeId>,
    pub managed: bool,
}

/// One `<properties>` entry with the text node that declares its value.
#[derive(Clone, Debug)]
pub struct PomProperty {
    pub name: String,
    pub value: String,
    pub value_node: NodeId,
}

/// Read-only model of one POM.
#[derive(Clone, Debug)]
pub struct Pom {
    pub coordinates: Gav,
    pub parent: Option<Gav>,
    pub packaging: Option<String>,
    pub modules: Vec<String>,
    pub properties: Vec<PomProperty>,
    pub dependencies: Vec<PomDependency>,
}

impl Pom {
    /// Build the model from a parsed XML tree. `None` when the document is
    /// not a POM (root element is not `<project>`).
    pub fn from_tree(tree: &Tree) -> Option<Self> {
        let project = root_element(tree)?;
        if element_name(tree, project) != Some("project") {
            return None;
        }

        let parent = child_element(tree, project, "parent").map(|p| Gav::read(tree, p));
        let packaging = child_element(tree, project, "packaging")
            .and_then(|e| text_of(tree, e).map(str::to_string));

        let modules = child_element(tree, project, "modules")
            .map(|m| {
                child_elements(tree, m)
                    .filter(|e| element_name(tree, *e) == Some("module"))
                    .filter_map(|e| text_of(tree, e).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut properties = Vec::new();
        if let Some(props) = child_element(tree, project, "properties") {
            for prop in child_elements(tree, props) {
                let Some(name) = element_name(tree, prop) else {
                    continue;
                };
                let Some(value_node) = text_node(tree, prop) else {
                    continue;
                };
                properties.push(PomProperty {
                    name: name.to_string(),
                    value: tree.text(value_node).to_string(),
                    value_node,
                });
            }
        }

        let mut dependencies = Vec::new();
        if let Some(deps) = child_element(tree, project, "dependencies") {
            collect_dependencies(tree, deps, false, &mut dependencies);
        }
        if let Some(mgmt) = child_element(tree, project, "dependencyManagement") {
            if let Some(deps) = child_element(tree, mgmt, "dependencies") {
                collect_dependencies(tree, deps, true, &mut dependencies);
            }
        }

        Some(Self {
            coordinates: Gav::read(tree, project),
            parent,
            packaging,
            modules,
            properties,
            dependencies,
        })
    }

    pub fn property(&self, name: &str) -> Option<&PomProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

fn collect_dependencies(tree: &Tree, deps: NodeId, managed: bool, out: &mut Vec<PomDependency>) {
    for dep in child_elements(tree, deps) {
        if element_name(tree, dep) != Some("dependency") {
            continue;
        }
        let gav = Gav::read(tree, dep);
        let version_node =
            child_element(tree, dep, "version").and_then(|v| text_node(tree, v));
        out.push(PomDependency {
            group_id: gav.group_id,
            artifact_id: gav.artifact_id,
            version_text: gav.version,
            version_node,
            managed,
        });
    }
}

/// Where a version string's value physically lives: the declaring tree and
/// text node, which may differ from the referencing POM when the value comes
/// from an inherited `${property}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedValue {
    pub tree: usize,
    pub node: NodeId,
    pub value: String,
}

/// All POMs of a forest, indexed by tree, with the parent chain resolved.
#[derive(Clone, Debug)]
pub struct MavenProject {
    poms: Vec<Option<Pom>>,
}

impl MavenProject {
    /// Model every POM in the forest. Trees that are not POMs are skipped.
    pub fn from_forest(forest: &Forest) -> Self {
        let poms = forest
            .trees()
            .map(|(index, tree)| {
                let pom = Pom::from_tree(tree);
                if pom.is_none() {
                    debug!(source = %tree.source(), index, "tree is not a maven pom; skipping");
                }
                pom
            })
            .collect();
        Self { poms }
    }

    pub fn poms(&self) -> impl Iterator<Item = (usize, &Pom)> {
        self.poms
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (i, p)))
    }

    pub fn pom(&self, index: usize) -> Option<&Pom> {
        self.poms.get(index).and_then(Option::as_ref)
    }

    /// Parent POM of `index`: the explicit tree back-link when present,
    /// otherwise the forest member whose coordinates match the `<parent>`
    /// declaration.
    pub fn parent_index(&self, forest: &Forest, index: usize) -> Option<usize> {
        if let Some((parent_index, _)) = forest.parent_of(index) {
            return Some(parent_index);
        }
        let declared = self.pom(index)?.parent.as_ref()?;
        self.poms().find_map(|(i, candidate)| {
            (i != index && candidate.coordinates == *declared).then_some(i)
        })
    }

    /// Resolve a raw version string to the tree/node/value that declares it,
    /// following `${property}` references up the parent chain. All lookups
    /// are read-only; the caller computes changes only after resolution is
    /// complete across the whole forest.
    pub fn resolve_version(
        &self,
        forest: &Forest,
        index: usize,
        raw: &str,
        literal_node: Option<NodeId>,
    ) -> Option<ResolvedValue> {
        match property_reference(raw) {
            None => literal_node.map(|node| ResolvedValue {
                tree: index,
                node,
                value: raw.to_string(),
            }),
            Some(name) => {
                let mut current = Some(index);
                // Bounded walk in case of a parent cycle.
                for _ in 0..self.poms.len() + 1 {
                    let i = current?;
                    if let Some(prop) = self.pom(i).and_then(|p| p.property(name)) {
                        return Some(ResolvedValue {
                            tree: i,
                            node: prop.value_node,
                            value: prop.value.clone(),
                        });
                    }
                    current = self.parent_index(forest, i);
                }
                None
            }
        }
    }
}

/// `${guava.version}` → `guava.version`.
fn property_reference(raw: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\s*\$\{([^}]+)\}\s*$").expect("valid regex"));
    re.captures(raw).map(|c| c.get(1).expect("group 1").as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_tree::SourceId;

    fn parse(path: &str, text: &str) -> quill_tree::Tree {
        quill_xml::parse(text, SourceId::new(path)).expect("parse")
    }

    const PARENT: &str = "\
<project>
  <modelVersion>4.0.0</modelVersion>

  <packaging>pom</packaging>
  <groupId>com.mycompany.app</groupId>
  <artifactId>my-app</artifactId>
  <version>1</version>

  <modules>
    <module>server</module>
  </modules>

  <properties>
    <guava.version>25.0-jre</guava.version>
  </properties>
</project>";

    const CHILD: &str = "\
<project>
  <modelVersion>4.0.0</modelVersion>

  <parent>
    <groupId>com.mycompany.app</groupId>
    <artifactId>my-app</artifactId>
    <version>1</version>
  </parent>

  <groupId>com.mycompany.app</groupId>
  <artifactId>my-app-server</artifactId>
  <version>1</version>

  <dependencies>
    <dependency>
      <groupId>com.google.guava</groupId>
      <artifactId>guava</artifactId>
      <version>${guava.version}</version>
    </dependency>
  </dependencies>
</project>";

    #[test]
    fn models_coordinates_properties_and_dependencies() {
        let tree = parse("pom.xml", PARENT);
        let pom = Pom::from_tree(&tree).unwrap();
        assert_eq!(pom.packaging.as_deref(), Some("pom"));
        assert_eq!(pom.coordinates.artifact_id.as_deref(), Some("my-app"));
        assert_eq!(pom.modules, vec!["server"]);
        assert_eq!(pom.property("guava.version").unwrap().value, "25.0-jre");

        let tree = parse("server/pom.xml", CHILD);
        let pom = Pom::from_tree(&tree).unwrap();
        assert_eq!(pom.dependencies.len(), 1);
        assert_eq!(
            pom.dependencies[0].version_text.as_deref(),
            Some("${guava.version}")
        );
        assert_eq!(
            pom.parent.as_ref().unwrap().artifact_id.as_deref(),
            Some("my-app")
        );
    }

    #[test]
    fn managed_dependencies_are_flagged() {
        let text = "\
<project>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>com.fasterxml.jackson.core</groupId>
        <artifactId>jackson-databind</artifactId>
        <version>latest.release</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>";
        let tree = parse("pom.xml", text);
        let pom = Pom::from_tree(&tree).unwrap();
        assert_eq!(pom.dependencies.len(), 1);
        assert!(pom.dependencies[0].managed);
    }

    #[test]
    fn resolves_property_through_the_parent_chain() {
        let forest = Forest::new(vec![
            parse("pom.xml", PARENT),
            parse("server/pom.xml", CHILD),
        ]);
        let project = MavenProject::from_forest(&forest);

        assert_eq!(project.parent_index(&forest, 1), Some(0));

        let resolved = project
            .resolve_version(&forest, 1, "${guava.version}", None)
            .unwrap();
        assert_eq!(resolved.tree, 0);
        assert_eq!(resolved.value, "25.0-jre");
    }

    #[test]
    fn explicit_parent_link_wins_over_gav_matching() {
        let parent = parse("pom.xml", PARENT);
        let child =
            parse("server/pom.xml", CHILD).with_parent(SourceId::new("pom.xml"));
        let forest = Forest::new(vec![parent, child]);
        let project = MavenProject::from_forest(&forest);
        assert_eq!(project.parent_index(&forest, 1), Some(0));
        let resolved = project
            .resolve_version(&forest, 1, "${guava.version}", None)
            .unwrap();
        assert_eq!(resolved.value, "25.0-jre");
    }

    #[test]
    fn unresolvable_property_is_none() {
        let forest = Forest::new(vec![parse("server/pom.xml", CHILD)]);
        let project = MavenProject::from_forest(&forest);
        assert_eq!(
            project.resolve_version(&forest, 0, "${guava.version}", None),
            None
        );
    }

    #[test]
    fn non_pom_documents_are_skipped() {
        let forest = Forest::new(vec![parse("beans.xml", "<beans></beans>")]);
        let project = MavenProject::from_forest(&forest);
        assert_eq!(project.poms().count(), 0);
    }
}
