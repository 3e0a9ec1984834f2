//! Recursive-descent parser for the supported Java subset.
//!
//! Shapes produced (children in source order, every consumed token a leaf):
//!
//! - `Document`: package decl, imports, class decls, trailing-trivia leaf.
//! - `Import`: `import` token, optional `static` token, one `Identifier`
//!   leaf spanning the whole dotted name (verbatim, `.*` included), `;`.
//! - `ClassDecl`: modifiers, `class` token, name `Identifier`,
//!   extends/implements tokens and `TypeRef`s, `{`, members, `}`.
//! - `MethodDecl`: modifiers, return `TypeRef`, name `Identifier`,
//!   `ParamList`, body `Block` or `;`.
//! - `Param`: `TypeRef`, optional `...` token, name `Identifier`.
//! - `IfStmt`: `if` token, `(`, condition, `)`, then-branch statement, then
//!   optionally `else` token and else-branch statement.
//! - `MethodInvocation`: `[receiver, ".", name, ArgList]` when qualified,
//!   `[name, ArgList]` when not.
//! - `NewClass`: `new` token, `TypeRef`, `ArgList`.
//! - `ArrayLiteral`: `new` token, `TypeRef`, then either `{ … }` elements
//!   or `[ dim ]`.
//!
//! Qualified names and full type references (generics and array brackets
//! included) are single leaves whose text is the raw source slice, so odd
//! interior formatting survives rendering untouched.

use tracing::trace;

use quill_tree::{NodeData, NodeId, NodeKind, ParseError, SourceId, Tree, TreeBuilder};

use crate::lexer::{lex, Token, TokenKind};

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "static",
    "final",
    "abstract",
    "native",
    "synchronized",
    "transient",
    "volatile",
    "strictfp",
    "default",
];

pub fn parse(text: &str, source: SourceId) -> Result<Tree, ParseError> {
    trace!(%source, bytes = text.len(), "parsing java");
    let tokens = lex(text, &source)?;
    let builder = TreeBuilder::new(source.clone());
    Parser {
        text,
        tokens,
        pos: 0,
        source,
        builder,
    }
    .compilation_unit()
}

struct Parser<'s> {
    text: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    source: SourceId,
    builder: TreeBuilder,
}

impl Parser<'_> {
    fn compilation_unit(mut self) -> Result<Tree, ParseError> {
        let mut children = Vec::new();

        if self.peek().is("package") {
            let kw = self.bump(NodeKind::Token);
            let name = self.qualified_name(false)?;
            let semi = self.expect(";")?;
            children.push(self.builder.node(NodeKind::PackageDecl, vec![kw, name, semi]));
        }

        while self.peek().is("import") {
            children.push(self.import_decl()?);
        }

        while self.peek().kind != TokenKind::Eof {
            children.push(self.class_decl()?);
        }

        let eof_prefix = self.peek().prefix.clone();
        if !eof_prefix.is_empty() {
            children
                .push(self.builder.push(NodeData::leaf(NodeKind::Token, eof_prefix, "")));
        }

        let root = self.builder.node(NodeKind::Document, children);
        Ok(self.builder.finish(root))
    }

    fn import_decl(&mut self) -> Result<NodeId, ParseError> {
        let kw = self.bump(NodeKind::Token);
        let mut children = vec![kw];
        if self.peek().is("static") {
            children.push(self.bump(NodeKind::Token));
        }
        children.push(self.qualified_name(true)?);
        children.push(self.expect(";")?);
        Ok(self.builder.node(NodeKind::Import, children))
    }

    fn class_decl(&mut self) -> Result<NodeId, ParseError> {
        let mut children = self.modifiers();
        if !self.peek().is("class") && !self.peek().is("interface") {
            return Err(self.error("expected a class declaration"));
        }
        children.push(self.bump(NodeKind::Token));
        let name = self.expect_ident()?;
        children.push(name);

        while self.peek().is("extends") || self.peek().is("implements") {
            children.push(self.bump(NodeKind::Token));
            children.push(self.type_ref()?);
            while self.peek().is(",") {
                children.push(self.bump(NodeKind::Token));
                children.push(self.type_ref()?);
            }
        }

        let class_name = self.builder.data(name).text.clone();
        children.push(self.expect("{")?);
        while !self.peek().is("}") {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.error("unexpected end of file in class body"));
            }
            children.push(self.member(&class_name)?);
        }
        children.push(self.expect("}")?);
        Ok(self.builder.node(NodeKind::ClassDecl, children))
    }

    fn member(&mut self, class_name: &str) -> Result<NodeId, ParseError> {
        let mods = self.modifiers();

        if self.peek().is("{") {
            let mut children = mods;
            children.push(self.block()?);
            return Ok(self.builder.node(NodeKind::InitializerBlock, children));
        }

        if self.peek().is(class_name) && self.peek_at(1).is("(") {
            let mut children = mods;
            children.push(self.bump(NodeKind::Identifier));
            children.push(self.param_list()?);
            children.push(self.block()?);
            return Ok(self.builder.node(NodeKind::ConstructorDecl, children));
        }

        let mut children = mods;
        children.push(self.type_ref()?);
        children.push(self.expect_ident()?);

        if self.peek().is("(") {
            children.push(self.param_list()?);
            if self.peek().is(";") {
                children.push(self.bump(NodeKind::Token));
            } else {
                children.push(self.block()?);
            }
            return Ok(self.builder.node(NodeKind::MethodDecl, children));
        }

        if self.peek().is("=") {
            children.push(self.bump(NodeKind::Token));
            children.push(self.expression()?);
        }
        children.push(self.expect(";")?);
        Ok(self.builder.node(NodeKind::FieldDecl, children))
    }

    fn modifiers(&mut self) -> Vec<NodeId> {
        let mut out = Vec::new();
        while self.peek().kind == TokenKind::Ident && MODIFIERS.contains(&self.peek().text.as_str())
        {
            out.push(self.bump(NodeKind::Modifier));
        }
        out
    }

    fn param_list(&mut self) -> Result<NodeId, ParseError> {
        let mut children = vec![self.expect("(")?];
        if !self.peek().is(")") {
            loop {
                children.push(self.param()?);
                if self.peek().is(",") {
                    children.push(self.bump(NodeKind::Token));
                } else {
                    break;
                }
            }
        }
        children.push(self.expect(")")?);
        Ok(self.builder.node(NodeKind::ParamList, children))
    }

    fn param(&mut self) -> Result<NodeId, ParseError> {
        let mut children = vec![self.type_ref()?];
        if self.peek().is("...") {
            children.push(self.bump(NodeKind::Token));
        }
        children.push(self.expect_ident()?);
        Ok(self.builder.node(NodeKind::Param, children))
    }

    fn block(&mut self) -> Result<NodeId, ParseError> {
        let mut children = vec![self.expect("{")?];
        while !self.peek().is("}") {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.error("unexpected end of file in block"));
            }
            children.push(self.statement()?);
        }
        children.push(self.expect("}")?);
        Ok(self.builder.node(NodeKind::Block, children))
    }

    fn statement(&mut self) -> Result<NodeId, ParseError> {
        if self.peek().is("{") {
            return self.block();
        }

        if self.peek().is("if") {
            return self.if_stmt();
        }

        if self.peek().is("return") {
            let mut children = vec![self.bump(NodeKind::Token)];
            if !self.peek().is(";") {
                children.push(self.expression()?);
            }
            children.push(self.expect(";")?);
            return Ok(self.builder.node(NodeKind::ReturnStmt, children));
        }

        if self.looks_like_local_var() {
            let mut children = vec![self.type_ref()?, self.expect_ident()?];
            if self.peek().is("=") {
                children.push(self.bump(NodeKind::Token));
                children.push(self.expression()?);
            }
            children.push(self.expect(";")?);
            return Ok(self.builder.node(NodeKind::LocalVarDecl, children));
        }

        let expr = self.expression()?;
        let semi = self.expect(";")?;
        Ok(self.builder.node(NodeKind::ExprStatement, vec![expr, semi]))
    }

    fn if_stmt(&mut self) -> Result<NodeId, ParseError> {
        let mut children = vec![self.bump(NodeKind::Token)];
        children.push(self.expect("(")?);
        children.push(self.expression()?);
        children.push(self.expect(")")?);
        children.push(self.statement()?);
        if self.peek().is("else") {
            children.push(self.bump(NodeKind::Token));
            children.push(self.statement()?);
        }
        Ok(self.builder.node(NodeKind::IfStmt, children))
    }

    /// Lookahead-only disambiguation of `B b = …;` from `B.foo(…);`.
    fn looks_like_local_var(&self) -> bool {
        let first = self.peek();
        if first.kind != TokenKind::Ident || first.is("new") || first.is("this") {
            return false;
        }
        let mut i = self.pos + 1;
        // Qualified name tail.
        while self.token_at(i).is(".") && self.token_at(i + 1).kind == TokenKind::Ident {
            i += 2;
        }
        // Generic argument group.
        if self.token_at(i).is("<") {
            let mut depth = 0usize;
            loop {
                let tok = self.token_at(i);
                if tok.kind == TokenKind::Eof {
                    return false;
                }
                if tok.is("<") {
                    depth += 1;
                } else if tok.is(">") {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                }
                i += 1;
            }
        }
        // Array brackets.
        while self.token_at(i).is("[") && self.token_at(i + 1).is("]") {
            i += 2;
        }
        self.token_at(i).kind == TokenKind::Ident
    }

    fn expression(&mut self) -> Result<NodeId, ParseError> {
        let mut node = self.primary()?;

        if self.builder.data(node).kind == NodeKind::Identifier && self.peek().is("(") {
            let args = self.arg_list()?;
            node = self.builder.node(NodeKind::MethodInvocation, vec![node, args]);
        }

        while self.peek().is(".") {
            let dot = self.bump(NodeKind::Token);
            let name = self.expect_ident()?;
            if self.peek().is("(") {
                let args = self.arg_list()?;
                node = self
                    .builder
                    .node(NodeKind::MethodInvocation, vec![node, dot, name, args]);
            } else {
                node = self
                    .builder
                    .node(NodeKind::FieldAccess, vec![node, dot, name]);
            }
        }
        Ok(node)
    }

    fn primary(&mut self) -> Result<NodeId, ParseError> {
        if self.peek().is("new") {
            let kw = self.bump(NodeKind::Token);
            let ty = self.type_ref()?;
            if self.peek().is("(") {
                let args = self.arg_list()?;
                return Ok(self.builder.node(NodeKind::NewClass, vec![kw, ty, args]));
            }
            if self.peek().is("{") {
                let mut children = vec![kw, ty, self.bump(NodeKind::Token)];
                if !self.peek().is("}") {
                    loop {
                        children.push(self.expression()?);
                        if self.peek().is(",") {
                            children.push(self.bump(NodeKind::Token));
                        } else {
                            break;
                        }
                    }
                }
                children.push(self.expect("}")?);
                return Ok(self.builder.node(NodeKind::ArrayLiteral, children));
            }
            if self.peek().is("[") {
                let open = self.bump(NodeKind::Token);
                let dim = self.expression()?;
                let close = self.expect("]")?;
                return Ok(self
                    .builder
                    .node(NodeKind::ArrayLiteral, vec![kw, ty, open, dim, close]));
            }
            return Err(self.error("expected constructor arguments or an array initializer"));
        }

        match self.peek().kind {
            TokenKind::Literal => Ok(self.bump(NodeKind::Literal)),
            TokenKind::Ident => Ok(self.bump(NodeKind::Identifier)),
            _ => Err(self.error("unexpected token in expression")),
        }
    }

    fn arg_list(&mut self) -> Result<NodeId, ParseError> {
        let mut children = vec![self.expect("(")?];
        if !self.peek().is(")") {
            loop {
                children.push(self.expression()?);
                if self.peek().is(",") {
                    children.push(self.bump(NodeKind::Token));
                } else {
                    break;
                }
            }
        }
        children.push(self.expect(")")?);
        Ok(self.builder.node(NodeKind::ArgList, children))
    }

    /// A full type reference as one leaf: dotted name, generic arguments,
    /// array brackets, all verbatim from the source.
    fn type_ref(&mut self) -> Result<NodeId, ParseError> {
        if self.peek().kind != TokenKind::Ident {
            return Err(self.error("expected a type name"));
        }
        let prefix = self.peek().prefix.clone();
        let start = self.peek().offset;
        let mut end = self.peek().end();
        self.pos += 1;

        while self.peek().is(".") && self.peek_at(1).kind == TokenKind::Ident {
            self.pos += 1;
            end = self.peek().end();
            self.pos += 1;
        }

        if self.peek().is("<") {
            let mut depth = 0usize;
            loop {
                let tok = self.peek();
                if tok.kind == TokenKind::Eof {
                    return Err(self.error("unterminated type arguments"));
                }
                if tok.is("<") {
                    depth += 1;
                } else if tok.is(">") {
                    depth -= 1;
                }
                end = tok.end();
                self.pos += 1;
                if depth == 0 {
                    break;
                }
            }
        }

        while self.peek().is("[") && self.peek_at(1).is("]") {
            self.pos += 1;
            end = self.peek().end();
            self.pos += 1;
        }

        let text = self.text[start..end].to_string();
        Ok(self
            .builder
            .push(NodeData::leaf(NodeKind::TypeRef, prefix, text)))
    }

    /// Dotted name as one leaf; `allow_star` admits a trailing `.*`.
    fn qualified_name(&mut self, allow_star: bool) -> Result<NodeId, ParseError> {
        if self.peek().kind != TokenKind::Ident {
            return Err(self.error("expected a name"));
        }
        let prefix = self.peek().prefix.clone();
        let start = self.peek().offset;
        let mut end = self.peek().end();
        self.pos += 1;

        while self.peek().is(".") {
            let next = self.peek_at(1);
            let take = next.kind == TokenKind::Ident || (allow_star && next.is("*"));
            if !take {
                break;
            }
            self.pos += 1;
            end = self.peek().end();
            self.pos += 1;
        }

        let text = self.text[start..end].to_string();
        Ok(self
            .builder
            .push(NodeData::leaf(NodeKind::Identifier, prefix, text)))
    }

    fn peek(&self) -> &Token {
        self.token_at(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        self.token_at(self.pos + ahead)
    }

    fn token_at(&self, index: usize) -> &Token {
        let clamped = index.min(self.tokens.len() - 1);
        &self.tokens[clamped]
    }

    fn bump(&mut self, kind: NodeKind) -> NodeId {
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        self.builder
            .push(NodeData::leaf(kind, token.prefix, token.text))
    }

    fn expect(&mut self, text: &str) -> Result<NodeId, ParseError> {
        if !self.peek().is(text) {
            return Err(self.error(format!("expected `{text}`")));
        }
        Ok(self.bump(NodeKind::Token))
    }

    fn expect_ident(&mut self) -> Result<NodeId, ParseError> {
        if self.peek().kind != TokenKind::Ident {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.bump(NodeKind::Identifier))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::at_offset(
            self.source.clone(),
            self.text,
            self.peek().offset,
            message,
        )
    }
}
