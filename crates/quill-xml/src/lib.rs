//! Range-preserving parser for the XML subset Maven POMs use.
//!
//! Prologs, elements, attributes, text, and comments are supported; DTDs and
//! CDATA are not (full POM schema coverage is a non-goal). Tag markup is kept
//! verbatim inside leaf tokens and inter-tag whitespace rides along as the
//! following node's prefix, so an un-mutated tree renders byte-identical to
//! its input.

use tracing::trace;

use quill_recipe::{SourceFile, SourceParser};
use quill_tree::{NodeId, NodeKind, ParseError, SourceId, Tree, TreeBuilder};

/// Parser entry point, usable wherever a pluggable parser is expected.
#[derive(Clone, Copy, Debug, Default)]
pub struct XmlParser;

impl SourceParser for XmlParser {
    fn parse(&self, file: &SourceFile) -> Result<Tree, ParseError> {
        parse(&file.text, file.path.clone())
    }
}

pub fn parse(text: &str, source: SourceId) -> Result<Tree, ParseError> {
    trace!(%source, bytes = text.len(), "parsing xml");
    let builder = TreeBuilder::new(source.clone());
    Parser {
        text,
        offset: 0,
        source,
        builder,
    }
    .document()
}

struct Parser<'s> {
    text: &'s str,
    offset: usize,
    source: SourceId,
    builder: TreeBuilder,
}

impl Parser<'_> {
    fn document(mut self) -> Result<Tree, ParseError> {
        let mut children = Vec::new();
        let mut prefix = self.take_whitespace();

        if self.rest().starts_with("<?") {
            let prolog = self.take_through("?>", "unterminated prolog")?;
            children.push(self.builder.leaf(NodeKind::XmlProlog, prefix, prolog));
            prefix = self.take_whitespace();
        }

        while !self.at_end() {
            if self.rest().starts_with("<!--") {
                let comment = self.take_through("-->", "unterminated comment")?;
                children.push(self.builder.leaf(NodeKind::XmlComment, prefix, comment));
            } else if self.rest().starts_with('<') {
                children.push(self.element(prefix)?);
            } else {
                return Err(self.error("expected an element"));
            }
            prefix = self.take_whitespace();
        }

        // Trailing trivia after the last tag hangs off a zero-width leaf.
        if !prefix.is_empty() {
            children.push(self.builder.leaf(NodeKind::Token, prefix, ""));
        }

        let root = self.builder.node(NodeKind::Document, children);
        Ok(self.builder.finish(root))
    }

    fn element(&mut self, prefix: String) -> Result<NodeId, ParseError> {
        let tag_start = self.offset;
        let tag = self.take_through(">", "unterminated tag")?;
        let name = tag_name(&tag)
            .ok_or_else(|| self.error_at(tag_start, "malformed opening tag"))?
            .to_string();

        let open = self.builder.leaf(NodeKind::Token, prefix, tag.clone());
        let mut children = vec![open];

        if tag.ends_with("/>") {
            return Ok(self.builder.node(NodeKind::XmlElement, children));
        }

        loop {
            let pending = self.take_whitespace();
            if self.at_end() {
                return Err(self.error(format!("unclosed element <{name}>")));
            }
            if self.rest().starts_with("</") {
                let close_start = self.offset;
                let close = self.take_through(">", "unterminated closing tag")?;
                let close_name = close
                    .strip_prefix("</")
                    .and_then(|c| c.strip_suffix('>'))
                    .map(str::trim)
                    .unwrap_or_default();
                if close_name != name {
                    return Err(self.error_at(
                        close_start,
                        format!("expected </{name}>, found {close}"),
                    ));
                }
                children.push(self.builder.leaf(NodeKind::Token, pending, close));
                return Ok(self.builder.node(NodeKind::XmlElement, children));
            }
            if self.rest().starts_with("<!--") {
                let comment = self.take_through("-->", "unterminated comment")?;
                children.push(self.builder.leaf(NodeKind::XmlComment, pending, comment));
                continue;
            }
            if self.rest().starts_with('<') {
                children.push(self.element(pending)?);
                continue;
            }

            // Character data: runs up to the next tag. Trailing whitespace is
            // handed to the next node's prefix so value edits stay tight.
            let run_end = self.rest().find('<').map(|i| self.offset + i);
            let run_end = run_end.unwrap_or(self.text.len());
            let run = &self.text[self.offset..run_end];
            let trimmed = run.trim_end();
            children
                .push(self.builder.leaf(NodeKind::XmlText, pending, trimmed));
            self.offset += trimmed.len();
        }
    }

    fn rest(&self) -> &str {
        &self.text[self.offset..]
    }

    fn at_end(&self) -> bool {
        self.offset >= self.text.len()
    }

    fn take_whitespace(&mut self) -> String {
        let rest = self.rest();
        let len = rest.len() - rest.trim_start().len();
        let ws = &self.text[self.offset..self.offset + len];
        self.offset += len;
        ws.to_string()
    }

    /// Consume up to and including `terminator`, returning the whole span.
    fn take_through(&mut self, terminator: &str, message: &str) -> Result<String, ParseError> {
        match self.rest().find(terminator) {
            Some(i) => {
                let end = self.offset + i + terminator.len();
                let span = self.text[self.offset..end].to_string();
                self.offset = end;
                Ok(span)
            }
            None => Err(self.error(message)),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.offset, message)
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::at_offset(self.source.clone(), self.text, offset, message)
    }
}

/// Element name out of raw tag markup: `<project xmlns="…">` → `project`.
fn tag_name(tag: &str) -> Option<&str> {
    let body = tag.strip_prefix('<')?;
    let end = body
        .find(|c: char| !is_name_char(c))
        .unwrap_or(body.len());
    (end > 0).then(|| &body[..end])
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ':')
}

/// The document's root element, skipping any prolog and comments.
pub fn root_element(tree: &Tree) -> Option<NodeId> {
    tree.child_of_kind(tree.root(), NodeKind::XmlElement)
}

/// Name of an element, read off its opening tag token.
pub fn element_name(tree: &Tree, element: NodeId) -> Option<&str> {
    let open = tree.child_of_kind(element, NodeKind::Token)?;
    tag_name(tree.text(open))
}

pub fn child_elements<'t>(
    tree: &'t Tree,
    element: NodeId,
) -> impl Iterator<Item = NodeId> + 't {
    tree.children_of_kind(element, NodeKind::XmlElement)
}

/// First direct child element with the given name.
pub fn child_element(tree: &Tree, element: NodeId, name: &str) -> Option<NodeId> {
    child_elements(tree, element).find(|e| element_name(tree, *e) == Some(name))
}

/// The text node directly inside an element, if any.
pub fn text_node(tree: &Tree, element: NodeId) -> Option<NodeId> {
    tree.child_of_kind(element, NodeKind::XmlText)
}

/// Trimmed character data of an element.
pub fn text_of<'t>(tree: &'t Tree, element: NodeId) -> Option<&'t str> {
    text_node(tree, element).map(|n| tree.text(n))
}
