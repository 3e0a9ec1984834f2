//! Forest-wide symbol table and static call-site resolution.
//!
//! Resolution is deliberately shallow: declared classes and their method
//! signatures, plus the static type of a call receiver when it is a `new`
//! expression, a class name, or the enclosing class. That is exactly what
//! declared-signature matching needs; no flow or return-type inference.

use std::collections::HashSet;

use quill_recipe::Forest;
use quill_tree::{NodeId, NodeKind, Tree};

/// One declared parameter, normalized for signature comparison
/// (whitespace stripped, `[]`/`...` kept).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSig {
    pub ty: String,
    pub vararg: bool,
}

impl ParamSig {
    /// `String` for `java.lang.String`, `String[]` for `String []`, etc.
    pub fn simple(&self) -> String {
        simple_type_name(&self.ty)
    }
}

#[derive(Clone, Debug)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<ParamSig>,
    /// Owning tree index and the `MethodDecl` node.
    pub tree: usize,
    pub decl: NodeId,
}

impl MethodSig {
    pub fn is_vararg(&self) -> bool {
        self.params.last().map_or(false, |p| p.vararg)
    }

    /// Does a call with `arg_count` arguments bind to this declaration?
    /// A vararg method accepts any count from `params - 1` upward, which is
    /// also how an explicit-array call site binds.
    pub fn accepts_arg_count(&self, arg_count: usize) -> bool {
        if self.is_vararg() {
            arg_count + 1 >= self.params.len()
        } else {
            arg_count == self.params.len()
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClassSym {
    pub simple_name: String,
    pub qualified_name: String,
    pub tree: usize,
    pub decl: NodeId,
    pub methods: Vec<MethodSig>,
}

impl ClassSym {
    pub fn is_named(&self, name: &str) -> bool {
        self.simple_name == name || self.qualified_name == name
    }
}

/// Declared classes across a whole forest.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    classes: Vec<ClassSym>,
}

impl SymbolTable {
    pub fn build(forest: &Forest) -> Self {
        let mut classes = Vec::new();
        for (index, tree) in forest.trees() {
            let package = package_name(tree);
            for decl in tree.nodes_of_kind(NodeKind::ClassDecl) {
                let Some(name_node) = tree.child_of_kind(decl, NodeKind::Identifier) else {
                    continue;
                };
                let simple_name = tree.text(name_node).to_string();
                let qualified_name = match &package {
                    Some(pkg) => format!("{pkg}.{simple_name}"),
                    None => simple_name.clone(),
                };
                let methods = tree
                    .children_of_kind(decl, NodeKind::MethodDecl)
                    .map(|m| method_sig(tree, index, m))
                    .collect();
                classes.push(ClassSym {
                    simple_name,
                    qualified_name,
                    tree: index,
                    decl,
                    methods,
                });
            }
        }
        Self { classes }
    }

    pub fn classes(&self) -> &[ClassSym] {
        &self.classes
    }

    /// Look up by simple or fully-qualified name.
    pub fn class_named(&self, name: &str) -> Option<&ClassSym> {
        self.classes.iter().find(|c| c.is_named(name))
    }

    pub fn declares(&self, simple_name: &str) -> bool {
        self.classes.iter().any(|c| c.simple_name == simple_name)
    }

    /// Static type of a call's receiver, when it can be determined.
    pub fn receiver_class(&self, tree: &Tree, call: NodeId) -> Option<&ClassSym> {
        let children = tree.children(call);
        if children.len() == 2 {
            // Unqualified call: the enclosing class.
            let enclosing = enclosing_class(tree, call)?;
            let name_node = tree.child_of_kind(enclosing, NodeKind::Identifier)?;
            return self.class_named(tree.text(name_node));
        }
        let receiver = children[0];
        match tree.kind(receiver) {
            NodeKind::NewClass => {
                let ty = tree.child_of_kind(receiver, NodeKind::TypeRef)?;
                self.class_named(&base_type_name(tree.text(ty)))
            }
            NodeKind::Identifier => self.class_named(tree.text(receiver)),
            _ => None,
        }
    }
}

fn method_sig(tree: &Tree, tree_index: usize, decl: NodeId) -> MethodSig {
    let name = tree
        .child_of_kind(decl, NodeKind::Identifier)
        .map(|n| tree.text(n).to_string())
        .unwrap_or_default();
    let params = tree
        .child_of_kind(decl, NodeKind::ParamList)
        .map(|list| {
            tree.children_of_kind(list, NodeKind::Param)
                .map(|p| param_sig(tree, p))
                .collect()
        })
        .unwrap_or_default();
    MethodSig {
        name,
        params,
        tree: tree_index,
        decl,
    }
}

fn param_sig(tree: &Tree, param: NodeId) -> ParamSig {
    let ty = tree
        .child_of_kind(param, NodeKind::TypeRef)
        .map(|t| normalize_type(tree.text(t)))
        .unwrap_or_default();
    let vararg = tree
        .children(param)
        .iter()
        .any(|c| tree.kind(*c) == NodeKind::Token && tree.text(*c) == "...");
    ParamSig { ty, vararg }
}

/// Declared package of a compilation unit, if any.
pub fn package_name(tree: &Tree) -> Option<String> {
    let pkg = tree.child_of_kind(tree.root(), NodeKind::PackageDecl)?;
    let name = tree.child_of_kind(pkg, NodeKind::Identifier)?;
    Some(normalize_type(tree.text(name)))
}

/// Innermost `ClassDecl` ancestor of a node.
pub fn enclosing_class(tree: &Tree, mut node: NodeId) -> Option<NodeId> {
    loop {
        node = tree.parent_of(node)?;
        if tree.kind(node) == NodeKind::ClassDecl {
            return Some(node);
        }
    }
}

/// The name leaf of a method invocation (last `Identifier` child).
pub fn invocation_name(tree: &Tree, call: NodeId) -> Option<NodeId> {
    tree.children(call)
        .iter()
        .rev()
        .copied()
        .find(|c| tree.kind(*c) == NodeKind::Identifier)
}

/// Number of argument expressions at a call site.
pub fn invocation_arg_count(tree: &Tree, call: NodeId) -> usize {
    tree.child_of_kind(call, NodeKind::ArgList)
        .map(|args| {
            tree.children(args)
                .iter()
                .filter(|c| tree.kind(**c) != NodeKind::Token)
                .count()
        })
        .unwrap_or(0)
}

/// Strip whitespace from a raw type slice: `String [ ]` → `String[]`.
pub fn normalize_type(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Drop generic arguments and array brackets: `java.util.List<A1>[]` →
/// `java.util.List`.
pub fn base_type_name(raw: &str) -> String {
    let normalized = normalize_type(raw);
    let end = normalized
        .find(['<', '['])
        .unwrap_or(normalized.len());
    normalized[..end].to_string()
}

/// Simple name plus any array/vararg suffix: `java.lang.String[]` →
/// `String[]`.
pub fn simple_type_name(normalized: &str) -> String {
    let base_end = normalized.find(['<', '[']).unwrap_or(normalized.len());
    let (base, suffix) = normalized.split_at(base_end);
    let simple = base.rsplit('.').next().unwrap_or(base);
    format!("{simple}{suffix}")
}

const PRIMITIVE_TYPES: &[&str] = &[
    "boolean", "byte", "char", "double", "float", "int", "long", "short", "void",
];

/// Simple names referenced anywhere in a compilation unit: type references
/// (generic arguments included) and class-name receivers. Used to decide
/// whether an import is still needed. Primitives never need an import, and a
/// receiver spelled like a declared variable is a value, not a type.
pub fn referenced_simple_names(tree: &Tree) -> HashSet<String> {
    let variables = declared_variable_names(tree);
    let mut names = HashSet::new();
    for id in tree.nodes_of_kind(NodeKind::TypeRef) {
        for word in identifier_words(tree.text(id)) {
            if !PRIMITIVE_TYPES.contains(&word.as_str()) {
                names.insert(word);
            }
        }
    }
    for kind in [NodeKind::MethodInvocation, NodeKind::FieldAccess] {
        for node in tree.nodes_of_kind(kind) {
            let children = tree.children(node);
            if children.len() > 2 && tree.kind(children[0]) == NodeKind::Identifier {
                let text = tree.text(children[0]);
                if !text.contains('.') && !variables.contains(text) {
                    names.insert(text.to_string());
                }
            }
        }
    }
    names
}

/// Names bound by parameters, locals, and fields in this compilation unit.
fn declared_variable_names(tree: &Tree) -> HashSet<String> {
    let mut names = HashSet::new();
    for kind in [NodeKind::Param, NodeKind::LocalVarDecl, NodeKind::FieldDecl] {
        for decl in tree.nodes_of_kind(kind) {
            if let Some(name) = tree.child_of_kind(decl, NodeKind::Identifier) {
                names.insert(tree.text(name).to_string());
            }
        }
    }
    names
}

/// Identifier-shaped words inside a raw type slice, qualified prefixes
/// dropped (`java.util.List<A1>` → `List`, `A1`).
fn identifier_words(raw: &str) -> Vec<String> {
    fn is_word_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '$'
    }

    let chars: Vec<char> = raw.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if !is_word_char(chars[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && is_word_char(chars[i]) {
            i += 1;
        }
        let mut j = i;
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
        // A segment followed by `.` is a package/outer prefix, not the name.
        if j < chars.len() && chars[j] == '.' {
            continue;
        }
        out.push(chars[start..i].iter().collect());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;
    use quill_recipe::Forest;
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
    fn collects_classes_and_method_signatures() {
        let forest = forest(&[(
            "B.java",
            "class B {\n   public void singleArg(String s) {}\n   public void varargArg(String... s) {}\n}",
        )]);
        let symbols = SymbolTable::build(&forest);
        let b = symbols.class_named("B").unwrap();
        assert_eq!(b.methods.len(), 2);
        assert_eq!(b.methods[0].name, "singleArg");
        assert_eq!(b.methods[0].params[0].ty, "String");
        assert!(!b.methods[0].is_vararg());
        assert!(b.methods[1].is_vararg());
    }

    #[test]
    fn qualified_names_include_the_package() {
        let forest = forest(&[("A1.java", "package a;\npublic class A1 {}")]);
        let symbols = SymbolTable::build(&forest);
        let a1 = symbols.class_named("a.A1").unwrap();
        assert_eq!(a1.simple_name, "A1");
    }

    #[test]
    fn resolves_new_expression_receivers() {
        let forest = forest(&[
            (
                "A.java",
                "class A {\n   public void test() {\n       new B().singleArg(\"boo\");\n   }\n}",
            ),
            ("B.java", "class B {\n   public void singleArg(String s) {}\n}"),
        ]);
        let symbols = SymbolTable::build(&forest);
        let tree = forest.tree(0);
        let call = tree
            .nodes_of_kind(quill_tree::NodeKind::MethodInvocation)
            .next()
            .unwrap();
        let class = symbols.receiver_class(tree, call).unwrap();
        assert_eq!(class.simple_name, "B");
    }

    #[test]
    fn resolves_static_receivers_and_enclosing_class() {
        let forest = forest(&[
            ("A.java", "class A {{ B.foo(0); }}"),
            ("B.java", "class B { static void foo(int n) {} }"),
        ]);
        let symbols = SymbolTable::build(&forest);
        let tree = forest.tree(0);
        let call = tree
            .nodes_of_kind(quill_tree::NodeKind::MethodInvocation)
            .next()
            .unwrap();
        assert_eq!(
            symbols.receiver_class(tree, call).unwrap().simple_name,
            "B"
        );
    }

    #[test]
    fn vararg_signatures_accept_flexible_arity() {
        let sig = MethodSig {
            name: "varargArg".into(),
            params: vec![ParamSig {
                ty: "String".into(),
                vararg: true,
            }],
            tree: 0,
            decl: quill_tree::NodeId::default(),
        };
        assert!(sig.accepts_arg_count(0));
        assert!(sig.accepts_arg_count(1));
        assert!(sig.accepts_arg_count(2));
    }

    #[test]
    fn referenced_names_cover_generics_and_receivers() {
        let forest = forest(&[(
            "A.java",
            "import java.util.*;\nclass A {\n   List<Collection> c;\n   { Set.of(); }\n}",
        )]);
        let names = referenced_simple_names(forest.tree(0));
        assert!(names.contains("List"));
        assert!(names.contains("Collection"));
        assert!(names.contains("Set"));
    }

    #[test]
    fn variable_receivers_and_primitives_are_not_type_references() {
        let forest = forest(&[(
            "A.java",
            "import java.util.*;\nclass A {\n   Collection c;\n   void test(int n) {\n       c.size();\n   }\n}",
        )]);
        let names = referenced_simple_names(forest.tree(0));
        assert!(names.contains("Collection"));
        assert!(!names.contains("c"));
        assert!(!names.contains("void"));
        assert!(!names.contains("int"));
    }
}
