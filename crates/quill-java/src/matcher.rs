//! Declared-signature pattern matching.
//!
//! A pattern like `B singleArg(String)` names a declaring type, a method
//! name, and positional parameter types. Matching is purely against declared
//! signatures and statically resolved receiver types; the method name's
//! lexical meaning elsewhere (keywords, tool tokens like `error`) is
//! irrelevant.

use thiserror::Error;
use tracing::debug;

use quill_recipe::{EditTarget, Forest};
use quill_tree::NodeKind;

use crate::semantic::{
    invocation_arg_count, invocation_name, simple_type_name, ClassSym, MethodSig, SymbolTable,
};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("malformed method pattern `{0}`; expected `Owner name(Type, …)`")]
pub struct PatternError(pub String);

/// Parsed `<OwnerType> <methodName>(<ParamType>,…)` signature pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodPattern {
    owner: String,
    name: String,
    params: Vec<String>,
}

impl MethodPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let malformed = || PatternError(pattern.to_string());
        let open = pattern.find('(').ok_or_else(malformed)?;
        let close = pattern.rfind(')').ok_or_else(malformed)?;
        if close < open {
            return Err(malformed());
        }

        let head: Vec<&str> = pattern[..open].split_whitespace().collect();
        let [owner, name] = head.as_slice() else {
            return Err(malformed());
        };

        let params: Vec<String> = pattern[open + 1..close]
            .split(',')
            .map(|p| p.split_whitespace().collect::<String>())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            params,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Does this pattern select the given declared method of `class`?
    /// Parameter types compare positionally by simple name; `T...` matches
    /// only a declared vararg, `T[]` only a declared array.
    pub fn matches_decl(&self, class: &ClassSym, method: &MethodSig) -> bool {
        if !class.is_named(&self.owner) || method.name != self.name {
            return false;
        }
        if self.params.len() != method.params.len() {
            return false;
        }
        self.params.iter().zip(&method.params).all(|(want, have)| {
            let (want_base, want_vararg) = match want.strip_suffix("...") {
                Some(base) => (base, true),
                None => (want.as_str(), false),
            };
            want_vararg == have.vararg && simple_type_name(want_base) == have.simple()
        })
    }

    fn signature_of(&self, class: &ClassSym, method: &MethodSig) -> String {
        let params: Vec<String> = method
            .params
            .iter()
            .map(|p| {
                if p.vararg {
                    format!("{}...", p.simple())
                } else {
                    p.simple()
                }
            })
            .collect();
        format!(
            "{} {}({})",
            class.simple_name,
            method.name,
            params.join(", ")
        )
    }
}

/// Call sites across the forest whose statically resolved declaration the
/// pattern selects. The target node is the `MethodInvocation`; zero matches
/// is an empty vec, never an error.
pub fn find_method_calls(forest: &Forest, pattern: &MethodPattern) -> Vec<EditTarget> {
    let symbols = SymbolTable::build(forest);
    let mut declared = Vec::new();
    for class in symbols.classes() {
        for method in &class.methods {
            if pattern.matches_decl(class, method) {
                declared.push((class, method));
            }
        }
    }
    if declared.is_empty() {
        debug!(pattern = %pattern.name, "no declaration matches the pattern");
        return Vec::new();
    }

    let mut targets = Vec::new();
    for (index, tree) in forest.trees() {
        for call in tree.nodes_of_kind(NodeKind::MethodInvocation) {
            let Some(name_node) = invocation_name(tree, call) else {
                continue;
            };
            if tree.text(name_node) != pattern.name {
                continue;
            }
            let Some(receiver) = symbols.receiver_class(tree, call) else {
                continue;
            };
            let arg_count = invocation_arg_count(tree, call);
            let matched = declared.iter().find(|(class, method)| {
                class.qualified_name == receiver.qualified_name
                    && method.accepts_arg_count(arg_count)
            });
            if let Some((class, method)) = matched {
                targets.push(EditTarget {
                    tree: index,
                    node: call,
                    signature: pattern.signature_of(class, method),
                });
            }
        }
    }
    targets
}

/// Declarations selected by the pattern. The target node is the `MethodDecl`.
pub fn find_method_decls(forest: &Forest, pattern: &MethodPattern) -> Vec<EditTarget> {
    let symbols = SymbolTable::build(forest);
    let mut targets = Vec::new();
    for class in symbols.classes() {
        for method in &class.methods {
            if pattern.matches_decl(class, method) {
                targets.push(EditTarget {
                    tree: method.tree,
                    node: method.decl,
                    signature: pattern.signature_of(class, method),
                });
            }
        }
    }
    targets
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

    const B: &str = "class B {\n   public void singleArg(String s) {}\n   public void arrArg(String[] s) {}\n   public void varargArg(String... s) {}\n}";

    #[test]
    fn parses_owner_name_and_params() {
        let p = MethodPattern::parse("B singleArg(String)").unwrap();
        assert_eq!(p.owner(), "B");
        assert_eq!(p.name(), "singleArg");

        assert!(MethodPattern::parse("no parens").is_err());
        assert!(MethodPattern::parse("toomany words here()").is_err());
    }

    #[test]
    fn matches_single_arg_call_site() {
        let f = forest(&[
            (
                "A.java",
                "class A {\n   public void test() {\n       new B().singleArg(\"boo\");\n   }\n}",
            ),
            ("B.java", B),
        ]);
        let pattern = MethodPattern::parse("B singleArg(String)").unwrap();
        let targets = find_method_calls(&f, &pattern);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].tree, 0);
        assert_eq!(targets[0].signature, "B singleArg(String)");
    }

    #[test]
    fn array_pattern_does_not_match_scalar_declaration() {
        let f = forest(&[
            (
                "A.java",
                "class A {\n   public void test() {\n       new B().singleArg(\"boo\");\n   }\n}",
            ),
            ("B.java", B),
        ]);
        let pattern = MethodPattern::parse("B singleArg(String[])").unwrap();
        assert!(find_method_calls(&f, &pattern).is_empty());
    }

    #[test]
    fn vararg_pattern_matches_both_call_styles() {
        let f = forest(&[
            (
                "A.java",
                "class A {\n   public void test() {\n       new B().varargArg(\"boo\", \"again\");\n       new B().varargArg(new String[] {\"boo\"});\n   }\n}",
            ),
            ("B.java", B),
        ]);
        let pattern = MethodPattern::parse("B varargArg(String...)").unwrap();
        assert_eq!(find_method_calls(&f, &pattern).len(), 2);
    }

    #[test]
    fn unrelated_receivers_do_not_match() {
        let f = forest(&[
            (
                "A.java",
                "class A {\n   public void test() {\n       new C().singleArg(\"boo\");\n   }\n}",
            ),
            ("B.java", B),
            ("C.java", "class C {\n   public void singleArg(String s) {}\n}"),
        ]);
        let pattern = MethodPattern::parse("B singleArg(String)").unwrap();
        assert!(find_method_calls(&f, &pattern).is_empty());
    }

    #[test]
    fn zero_matches_is_an_empty_set_not_an_error() {
        let f = forest(&[("B.java", B)]);
        let pattern = MethodPattern::parse("B nope(String)").unwrap();
        assert!(find_method_calls(&f, &pattern).is_empty());
    }

    #[test]
    fn fully_qualified_owner_matches_too() {
        let f = forest(&[
            ("B.java", "package com.example;\nclass B {\n   public void go() {}\n}"),
            (
                "A.java",
                "package com.example;\nclass A {{ new B().go(); }}",
            ),
        ]);
        let pattern = MethodPattern::parse("com.example.B go()").unwrap();
        assert_eq!(find_method_calls(&f, &pattern).len(), 1);
    }
}
