//! Lossless document model shared by every Quill parser.
//!
//! A [`Tree`] is an arena of immutable nodes addressed by stable [`NodeId`]s.
//! Each node carries the raw whitespace/comments that preceded it (its
//! `prefix`) plus its own token text, so rendering a tree in pre-order
//! reproduces the original source byte-for-byte. Derived trees produced by
//! [`change::apply`] share every untouched arena slot with their ancestor.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod change;

pub use change::{apply, Change, ConflictError};

/// Identifier for a source file. Quill never touches the file system; the id
/// is whatever path or label the caller handed to the parser.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable handle to a node within one tree family.
///
/// Ids survive payload edits: renaming a method leaves the name node's id
/// unchanged in the derived tree, so targets located before an `apply` remain
/// valid afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("arena larger than u32::MAX nodes"))
    }
}

/// Syntactic kind tag. One enum covers every language Quill parses; parsers
/// only ever produce the subset that applies to them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    /// Keyword or punctuation leaf with no semantic payload of its own.
    Token,
    Identifier,
    Literal,

    // Java
    PackageDecl,
    Import,
    ClassDecl,
    Modifier,
    MethodDecl,
    ConstructorDecl,
    InitializerBlock,
    FieldDecl,
    ParamList,
    Param,
    TypeRef,
    Block,
    ExprStatement,
    LocalVarDecl,
    IfStmt,
    ReturnStmt,
    MethodInvocation,
    FieldAccess,
    NewClass,
    ArrayLiteral,
    ArgList,

    // XML
    XmlProlog,
    XmlElement,
    XmlText,
    XmlComment,
}

/// One immutable node. Leaves carry `text`; containers carry `children`.
/// Either way the `prefix` holds the raw trivia that preceded the node in the
/// original source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeData {
    pub kind: NodeKind,
    pub prefix: String,
    pub text: String,
    pub children: Vec<NodeId>,
}

impl NodeData {
    pub fn leaf(kind: NodeKind, prefix: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            prefix: prefix.into(),
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Immutable parsed representation of one source file.
#[derive(Clone, Debug)]
pub struct Tree {
    source: SourceId,
    /// Back-reference to a related tree (e.g. a child POM's parent POM), used
    /// for metadata lookup only. Resolution happens through whatever forest
    /// holds both trees; this is never an ownership edge.
    parent: Option<SourceId>,
    arena: Vec<Arc<NodeData>>,
    root: NodeId,
}

impl Tree {
    pub fn source(&self) -> &SourceId {
        &self.source
    }

    pub fn parent(&self) -> Option<&SourceId> {
        self.parent.as_ref()
    }

    pub fn with_parent(mut self, parent: SourceId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.arena[id.index()]
    }

    /// The arena slot itself, exposed so callers can test structural sharing
    /// between a tree and its derived trees with `Arc::ptr_eq`.
    pub fn node_arc(&self, id: NodeId) -> &Arc<NodeData> {
        &self.arena[id.index()]
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.arena.len()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn text(&self, id: NodeId) -> &str {
        &self.node(id).text
    }

    pub fn prefix(&self, id: NodeId) -> &str {
        &self.node(id).prefix
    }

    /// Pre-order traversal of the whole tree.
    pub fn preorder(&self) -> Preorder<'_> {
        self.preorder_from(self.root)
    }

    /// Pre-order traversal of the subtree rooted at `id`.
    pub fn preorder_from(&self, id: NodeId) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![id],
        }
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.preorder().filter(move |id| self.kind(*id) == kind)
    }

    /// First direct child of `id` with the given kind.
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.kind(*c) == kind)
    }

    pub fn children_of_kind<'t>(
        &'t self,
        id: NodeId,
        kind: NodeKind,
    ) -> impl Iterator<Item = NodeId> + 't {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.kind(*c) == kind)
    }

    /// Parent of `id` in the render tree, by linear scan over reachable nodes.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.preorder()
            .find(|candidate| self.children(*candidate).contains(&id))
    }

    /// Render the whole tree back to text. For an un-mutated tree this is the
    /// exact original input.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for node_id in self.preorder() {
            let node = self.node(node_id);
            out.push_str(&node.prefix);
            out.push_str(&node.text);
        }
        out
    }

    /// Render the subtree rooted at `id` without its leading trivia. Used for
    /// before/after snippets in change reports.
    pub fn render_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node_id in self.preorder_from(id) {
            let node = self.node(node_id);
            if !out.is_empty() {
                out.push_str(&node.prefix);
            }
            out.push_str(&node.text);
        }
        out
    }

    pub(crate) fn arena_clone(&self) -> Vec<Arc<NodeData>> {
        self.arena.clone()
    }

    pub(crate) fn derive(&self, arena: Vec<Arc<NodeData>>) -> Tree {
        Tree {
            source: self.source.clone(),
            parent: self.parent.clone(),
            arena,
            root: self.root,
        }
    }
}

pub struct Preorder<'t> {
    tree: &'t Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let children = self.tree.children(id);
        self.stack.extend(children.iter().rev().copied());
        Some(id)
    }
}

/// Append-only construction surface used by the parsers. Nodes become
/// immutable the moment they enter the arena.
pub struct TreeBuilder {
    source: SourceId,
    arena: Vec<Arc<NodeData>>,
}

impl TreeBuilder {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            arena: Vec::new(),
        }
    }

    pub fn leaf(
        &mut self,
        kind: NodeKind,
        prefix: impl Into<String>,
        text: impl Into<String>,
    ) -> NodeId {
        self.push(NodeData::leaf(kind, prefix, text))
    }

    pub fn node(&mut self, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        self.push(NodeData {
            kind,
            prefix: String::new(),
            text: String::new(),
            children,
        })
    }

    pub fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::from_index(self.arena.len());
        self.arena.push(Arc::new(data));
        id
    }

    /// Inspect an already-built node, e.g. to branch on what was just parsed.
    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.arena[id.index()]
    }

    pub fn finish(self, root: NodeId) -> Tree {
        Tree {
            source: self.source,
            parent: None,
            arena: self.arena,
            root,
        }
    }
}

/// Malformed input. Fatal for the offending tree only; batch drivers keep
/// going on sibling inputs.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{file}:{line}:{column}: {message}")]
pub struct ParseError {
    pub file: SourceId,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl ParseError {
    pub fn new(file: SourceId, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            file,
            line,
            column,
            message: message.into(),
        }
    }

    /// Build an error from a byte offset into `text`, computing line/column
    /// (both 1-based).
    pub fn at_offset(file: SourceId, text: &str, offset: usize, message: impl Into<String>) -> Self {
        let clamped = offset.min(text.len());
        let mut line = 1u32;
        let mut column = 1u32;
        for ch in text[..clamped].chars() {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self::new(file, line, column, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_tree() -> Tree {
        // Models `foo (a)` with the space attached to `(` as prefix.
        let mut b = TreeBuilder::new(SourceId::new("sample"));
        let name = b.leaf(NodeKind::Identifier, "", "foo");
        let open = b.leaf(NodeKind::Token, " ", "(");
        let arg = b.leaf(NodeKind::Identifier, "", "a");
        let close = b.leaf(NodeKind::Token, "", ")");
        let args = b.node(NodeKind::ArgList, vec![open, arg, close]);
        let call = b.node(NodeKind::MethodInvocation, vec![name, args]);
        let root = b.node(NodeKind::Document, vec![call]);
        b.finish(root)
    }

    #[test]
    fn render_concatenates_prefixes_and_text_in_order() {
        assert_eq!(sample_tree().render(), "foo (a)");
    }

    #[test]
    fn render_node_skips_leading_prefix() {
        let tree = sample_tree();
        let args = tree
            .nodes_of_kind(NodeKind::ArgList)
            .next()
            .expect("arg list");
        assert_eq!(tree.render_node(args), "(a)");
    }

    #[test]
    fn parent_of_walks_back_to_container() {
        let tree = sample_tree();
        let name = tree.nodes_of_kind(NodeKind::Identifier).next().unwrap();
        let parent = tree.parent_of(name).unwrap();
        assert_eq!(tree.kind(parent), NodeKind::MethodInvocation);
    }

    #[test]
    fn parse_error_reports_line_and_column() {
        let err = ParseError::at_offset(SourceId::new("x"), "ab\ncde", 4, "boom");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 2);
        assert_eq!(err.to_string(), "x:2:2: boom");
    }
}
