//! Java refactoring recipes: method rename, type change, import removal,
//! boolean-return simplification, utility-class constructor hiding.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use quill_recipe::{Forest, Plan, Recipe, RecipeError, Validated, ValidationError};
use quill_tree::{Change, NodeData, NodeId, NodeKind, Tree};

use crate::matcher::{find_method_calls, find_method_decls, MethodPattern};
use crate::semantic::{invocation_name, referenced_simple_names, SymbolTable};

/// Rename every call site (and in-forest declaration) selected by a declared
/// method signature pattern. Call-argument syntax is untouched: an explicit
/// array stays an array, an inline vararg list stays a list.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeMethodName {
    pub method_pattern: Option<String>,
    pub new_name: Option<String>,
}

impl ChangeMethodName {
    pub fn new(method_pattern: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            method_pattern: Some(method_pattern.into()),
            new_name: Some(new_name.into()),
        }
    }
}

impl Recipe for ChangeMethodName {
    fn name(&self) -> &str {
        "java.ChangeMethodName"
    }

    fn validate(&self) -> Validated {
        Validated::valid()
            .required("methodPattern", &self.method_pattern)
            .required("newName", &self.new_name)
    }

    fn plan(&self, forest: &Forest) -> Result<Plan, RecipeError> {
        let pattern = parse_pattern(self.name(), self.method_pattern.as_deref())?;
        let new_name = self.new_name.as_deref().unwrap_or_default();

        let mut plan = Plan::default();
        for target in find_method_calls(forest, &pattern) {
            let tree = forest.tree(target.tree);
            if let Some(name_node) = invocation_name(tree, target.node) {
                push_rename(&mut plan, tree, target.tree, name_node, new_name);
            }
        }
        for target in find_method_decls(forest, &pattern) {
            let tree = forest.tree(target.tree);
            if let Some(name_node) = tree.child_of_kind(target.node, NodeKind::Identifier) {
                push_rename(&mut plan, tree, target.tree, name_node, new_name);
            }
        }
        debug!(recipe = self.name(), changes = plan.change_count(), "planned");
        Ok(plan)
    }
}

fn push_rename(plan: &mut Plan, tree: &Tree, tree_index: usize, name_node: NodeId, new_name: &str) {
    if tree.text(name_node) != new_name {
        plan.push(tree_index, Change::retext(tree, name_node, new_name));
    }
}

/// Rewrite references to one type into another: named imports, type
/// references (generic arguments included), and class-name receivers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeType {
    pub old_type: Option<String>,
    pub new_type: Option<String>,
}

impl ChangeType {
    pub fn new(old_type: impl Into<String>, new_type: impl Into<String>) -> Self {
        Self {
            old_type: Some(old_type.into()),
            new_type: Some(new_type.into()),
        }
    }
}

impl Recipe for ChangeType {
    fn name(&self) -> &str {
        "java.ChangeType"
    }

    fn validate(&self) -> Validated {
        Validated::valid()
            .required("oldType", &self.old_type)
            .required("newType", &self.new_type)
    }

    fn plan(&self, forest: &Forest) -> Result<Plan, RecipeError> {
        let old = self.old_type.as_deref().unwrap_or_default();
        let new = self.new_type.as_deref().unwrap_or_default();
        let old_simple = simple_of(old);
        let new_simple = simple_of(new);

        let mut plan = Plan::default();
        for (index, tree) in forest.trees() {
            for import in tree.nodes_of_kind(NodeKind::Import) {
                let Some(name) = tree.child_of_kind(import, NodeKind::Identifier) else {
                    continue;
                };
                if tree.text(name) == old {
                    plan.push(index, Change::retext(tree, name, new));
                }
            }

            for ty in tree.nodes_of_kind(NodeKind::TypeRef) {
                let text = tree.text(ty);
                let replaced = replace_identifier(&replace_identifier(text, old, new), old_simple, new_simple);
                if replaced != text {
                    plan.push(index, Change::retext(tree, ty, replaced));
                }
            }

            for kind in [NodeKind::MethodInvocation, NodeKind::FieldAccess] {
                for node in tree.nodes_of_kind(kind) {
                    let children = tree.children(node);
                    if children.len() <= 2 || tree.kind(children[0]) != NodeKind::Identifier {
                        continue;
                    }
                    let receiver = children[0];
                    let text = tree.text(receiver);
                    if text == old_simple {
                        plan.push(index, Change::retext(tree, receiver, new_simple));
                    } else if text == old {
                        plan.push(index, Change::retext(tree, receiver, new));
                    }
                }
            }
        }
        Ok(plan)
    }
}

/// Remove an import that is no longer needed:
/// - a named import of the type goes away when the type is unreferenced;
/// - a star import of the type's package goes away when nothing else from
///   that package is referenced, narrows to a named import when exactly one
///   referenced type remains, and stays put otherwise.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoveImport {
    pub type_name: Option<String>,
}

impl RemoveImport {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
        }
    }
}

impl Recipe for RemoveImport {
    fn name(&self) -> &str {
        "java.RemoveImport"
    }

    fn validate(&self) -> Validated {
        Validated::valid().required("type", &self.type_name)
    }

    fn plan(&self, forest: &Forest) -> Result<Plan, RecipeError> {
        let qualified = self.type_name.as_deref().unwrap_or_default();
        let simple = simple_of(qualified);
        let package = qualified
            .rsplit_once('.')
            .map(|(pkg, _)| pkg.to_string())
            .unwrap_or_default();

        let symbols = SymbolTable::build(forest);
        let mut plan = Plan::default();

        for (index, tree) in forest.trees() {
            let referenced = referenced_simple_names(tree);
            let mut named_imports = HashSet::new();
            let mut victims = Vec::new();

            for import in tree.nodes_of_kind(NodeKind::Import) {
                if let Some((_, name)) = plain_import(tree, import) {
                    if let Some(s) = name.rsplit('.').next() {
                        if s != "*" {
                            named_imports.insert(s.to_string());
                        }
                    }
                }
            }

            for import in tree.nodes_of_kind(NodeKind::Import) {
                let Some((name_node, name)) = plain_import(tree, import) else {
                    continue;
                };

                if name == qualified {
                    if !referenced.contains(simple) {
                        victims.push(import);
                    }
                    continue;
                }

                if !package.is_empty() && name == format!("{package}.*") {
                    // Referenced names that only this star import can supply.
                    let mut remaining: Vec<&String> = referenced
                        .iter()
                        .filter(|n| {
                            n.as_str() != simple
                                && !symbols.declares(n)
                                && !named_imports.contains(n.as_str())
                        })
                        .collect();
                    remaining.sort();
                    match remaining.as_slice() {
                        [] => victims.push(import),
                        [only] => plan.push(
                            index,
                            Change::retext(tree, name_node, format!("{package}.{only}")),
                        ),
                        _ => {}
                    }
                }
            }

            if !victims.is_empty() {
                for (leaf, prefix) in reprefix_after_removal(tree, &victims) {
                    plan.push(index, Change::reprefix(tree, leaf, prefix));
                }
                plan.push(index, Change::remove_children(tree, tree.root(), &victims));
            }
        }
        Ok(plan)
    }
}

/// Prefix adjustments pairing an import removal: the next kept sibling
/// inherits the leading trivia of the first import removed before it, so
/// removal does not leave orphaned blank lines behind.
fn reprefix_after_removal(tree: &Tree, victims: &[NodeId]) -> Vec<(NodeId, String)> {
    let mut out = Vec::new();
    let mut carried: Option<String> = None;
    for child in tree.children(tree.root()).iter().copied() {
        if victims.contains(&child) {
            if carried.is_none() {
                carried = Some(tree.prefix(leading_leaf(tree, child)).to_string());
            }
        } else if let Some(prefix) = carried.take() {
            let leaf = leading_leaf(tree, child);
            if tree.prefix(leaf) != prefix {
                out.push((leaf, prefix));
            }
        }
    }
    out
}

/// First leaf of a subtree in render order; its prefix is the subtree's
/// leading trivia (containers carry none).
fn leading_leaf(tree: &Tree, node: NodeId) -> NodeId {
    let mut current = node;
    while let Some(first) = tree.children(current).first() {
        current = *first;
    }
    current
}

/// Collapse `if (cond) return true; else return false;` (branches may be
/// block-wrapped) into `return cond;`. The negated shape returning `false`
/// first would need a synthesized `!` token and is left untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimplifyBooleanReturn {}

impl Recipe for SimplifyBooleanReturn {
    fn name(&self) -> &str {
        "java.SimplifyBooleanReturn"
    }

    fn validate(&self) -> Validated {
        Validated::valid()
    }

    fn plan(&self, forest: &Forest) -> Result<Plan, RecipeError> {
        let mut plan = Plan::default();
        for (index, tree) in forest.trees() {
            for stmt in tree.nodes_of_kind(NodeKind::IfStmt) {
                let Some(found) = boolean_return(tree, stmt) else {
                    continue;
                };
                let lead = tree.prefix(leading_leaf(tree, stmt)).to_string();
                if tree.prefix(found.ret_kw) != lead {
                    plan.push(index, Change::reprefix(tree, found.ret_kw, lead));
                }
                let cond_lead = leading_leaf(tree, found.condition);
                if tree.prefix(cond_lead) != " " {
                    plan.push(index, Change::reprefix(tree, cond_lead, " "));
                }
                plan.push(
                    index,
                    Change::replace(
                        tree,
                        stmt,
                        NodeData {
                            kind: NodeKind::ReturnStmt,
                            prefix: String::new(),
                            text: String::new(),
                            children: vec![found.ret_kw, found.condition, found.semi],
                        },
                    ),
                );
            }
        }
        debug!(recipe = self.name(), changes = plan.change_count(), "planned");
        Ok(plan)
    }
}

/// The reusable pieces of a matched boolean-return `if`: the condition, plus
/// the `return` keyword and `;` from the then-branch.
struct BooleanReturn {
    condition: NodeId,
    ret_kw: NodeId,
    semi: NodeId,
}

fn boolean_return(tree: &Tree, stmt: NodeId) -> Option<BooleanReturn> {
    let children = tree.children(stmt);
    // [if, (, cond, ), then, else, otherwise]
    if children.len() != 7 || tree.text(children[5]) != "else" {
        return None;
    }
    let (ret_kw, then_value, semi) = branch_return(tree, children[4])?;
    let (_, else_value, _) = branch_return(tree, children[6])?;
    (tree.text(then_value) == "true" && tree.text(else_value) == "false").then_some(
        BooleanReturn {
            condition: children[2],
            ret_kw,
            semi,
        },
    )
}

/// `(return, value, ;)` of a branch that is a single return statement,
/// block-wrapped or bare.
fn branch_return(tree: &Tree, branch: NodeId) -> Option<(NodeId, NodeId, NodeId)> {
    match tree.kind(branch) {
        NodeKind::ReturnStmt => {
            let children = tree.children(branch);
            (children.len() == 3).then(|| (children[0], children[1], children[2]))
        }
        NodeKind::Block => {
            let inner: Vec<NodeId> = tree
                .children(branch)
                .iter()
                .copied()
                .filter(|c| tree.kind(*c) != NodeKind::Token)
                .collect();
            match inner.as_slice() {
                [only] => branch_return(tree, *only),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Make the constructor of a utility class private. A class counts as a
/// utility class when it has at least one method and every method and field
/// is static. Only an explicit `public` modifier is rewritten; adding a
/// modifier where none exists would need a synthesized token.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HideUtilityClassConstructor {}

impl Recipe for HideUtilityClassConstructor {
    fn name(&self) -> &str {
        "java.HideUtilityClassConstructor"
    }

    fn validate(&self) -> Validated {
        Validated::valid()
    }

    fn plan(&self, forest: &Forest) -> Result<Plan, RecipeError> {
        let mut plan = Plan::default();
        for (index, tree) in forest.trees() {
            for class in tree.nodes_of_kind(NodeKind::ClassDecl) {
                if !is_utility_class(tree, class) {
                    continue;
                }
                for ctor in tree.children_of_kind(class, NodeKind::ConstructorDecl) {
                    if let Some(visibility) = modifier_named(tree, ctor, "public") {
                        plan.push(index, Change::retext(tree, visibility, "private"));
                    }
                }
            }
        }
        debug!(recipe = self.name(), changes = plan.change_count(), "planned");
        Ok(plan)
    }
}

fn is_utility_class(tree: &Tree, class: NodeId) -> bool {
    let mut methods = tree.children_of_kind(class, NodeKind::MethodDecl).peekable();
    if methods.peek().is_none() {
        return false;
    }
    let methods_static = methods.all(|m| modifier_named(tree, m, "static").is_some());
    let fields_static = tree
        .children_of_kind(class, NodeKind::FieldDecl)
        .all(|f| modifier_named(tree, f, "static").is_some());
    methods_static && fields_static
}

fn modifier_named(tree: &Tree, decl: NodeId, name: &str) -> Option<NodeId> {
    tree.children_of_kind(decl, NodeKind::Modifier)
        .find(|m| tree.text(*m) == name)
}

/// Non-static import's name leaf and text.
fn plain_import<'t>(tree: &'t Tree, import: NodeId) -> Option<(NodeId, &'t str)> {
    let is_static = tree
        .children(import)
        .iter()
        .any(|c| tree.kind(*c) == NodeKind::Token && tree.text(*c) == "static");
    if is_static {
        return None;
    }
    let name = tree.child_of_kind(import, NodeKind::Identifier)?;
    Some((name, tree.text(name)))
}

fn simple_of(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Replace whole-identifier occurrences of `from` within a raw type slice.
/// An occurrence preceded by `.` is a qualified tail and is left alone.
fn replace_identifier(text: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return text.to_string();
    }
    let mut out = String::new();
    let mut rest = text;
    while let Some(pos) = rest.find(from) {
        let before = rest[..pos].chars().next_back();
        let after = rest[pos + from.len()..].chars().next();
        let bounded = !matches!(before, Some(c) if c.is_alphanumeric() || c == '_' || c == '$' || c == '.')
            && !matches!(after, Some(c) if c.is_alphanumeric() || c == '_' || c == '$');
        out.push_str(&rest[..pos]);
        if bounded {
            out.push_str(to);
        } else {
            out.push_str(from);
        }
        rest = &rest[pos + from.len()..];
    }
    out.push_str(rest);
    out
}

fn parse_pattern(recipe: &str, pattern: Option<&str>) -> Result<MethodPattern, RecipeError> {
    MethodPattern::parse(pattern.unwrap_or_default()).map_err(|e| {
        ValidationError {
            recipe: recipe.to_string(),
            failures: vec![quill_recipe::ValidationFailure {
                property: "methodPattern".to_string(),
                message: e.to_string(),
            }],
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;
    use quill_tree::SourceId;

    fn forest(sources: &[(&str, &str)]) -> Forest {
        Forest::new(
            sources
                .iter()
                .map(|(path, text)| parse(text, SourceId::new(*path)).expect("parse"))
                .collect(),
        )
    }

    #[test]
    fn identifier_replacement_respects_boundaries() {
        assert_eq!(replace_identifier("List<A1>", "A1", "A2"), "List<A2>");
        assert_eq!(replace_identifier("A1[]", "A1", "A2"), "A2[]");
        assert_eq!(replace_identifier("A10", "A1", "A2"), "A10");
        assert_eq!(replace_identifier("a.A1", "A1", "A2"), "a.A1");
        assert_eq!(replace_identifier("a.A1", "a.A1", "a.A2"), "a.A2");
    }

    #[test]
    fn missing_fields_fail_validation_in_order() {
        let recipe = ChangeMethodName::default();
        let validated = recipe.validate();
        let props: Vec<_> = validated
            .failures()
            .iter()
            .map(|f| f.property.as_str())
            .collect();
        assert_eq!(props, vec!["methodPattern", "newName"]);
    }

    #[test]
    fn recipes_deserialize_from_json_configuration() {
        let recipe: ChangeMethodName = serde_json::from_str(
            r#"{"methodPattern": "B singleArg(String)", "newName": "bar"}"#,
        )
        .unwrap();
        assert!(recipe.validate().is_valid());
        assert_eq!(recipe.method_pattern.as_deref(), Some("B singleArg(String)"));
    }

    #[test]
    fn boolean_return_requires_literal_branches_in_order() {
        let skipped = [
            "class A {\n   boolean f(boolean a) {\n       if (a) return false;\n       else return true;\n   }\n}",
            "class A {\n   boolean f(boolean a) {\n       if (a) return true;\n       return false;\n   }\n}",
            "class A {\n   boolean f(boolean a) {\n       if (a) return g();\n       else return false;\n   }\n}",
        ];
        for src in skipped {
            let plan = SimplifyBooleanReturn::default()
                .plan(&forest(&[("A.java", src)]))
                .unwrap();
            assert!(plan.is_empty(), "should skip: {src}");
        }
    }

    #[test]
    fn utility_class_requires_every_member_static() {
        let skipped = [
            "public class A {\n   public A() {\n   }\n\n   public void instance() {\n   }\n}",
            "public class A {\n   public A() {\n   }\n\n   int state;\n\n   public static void utility() {\n   }\n}",
            "public class A {\n   public A() {\n   }\n}",
        ];
        for src in skipped {
            let plan = HideUtilityClassConstructor::default()
                .plan(&forest(&[("A.java", src)]))
                .unwrap();
            assert!(plan.is_empty(), "should skip: {src}");
        }
    }

    #[test]
    fn malformed_pattern_surfaces_as_field_failure() {
        let recipe = ChangeMethodName::new("not a pattern", "bar");
        let err = recipe.plan(&Forest::default()).unwrap_err();
        match err {
            RecipeError::Validation(v) => {
                assert_eq!(v.failures[0].property, "methodPattern");
            }
            other => panic!("expected validation error, got {other}"),
        }
    }
}
