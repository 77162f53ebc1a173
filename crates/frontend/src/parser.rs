// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recursive-descent parser for the demo language.
//!
//! Statements carry their terminating `;`; every node span is token-tight
//! (first byte of its first token to last byte of its last token), which the
//! engine's span-alignment checks rely on. The file node alone spans the
//! whole text, trivia included.

use std::path::PathBuf;

use quarry_engine::token::{Token, TokenKind, tokenize};
use quarry_engine::tree::{SourceUnit, SyntaxTree, TreeBuilder};
use thiserror::Error;

const KEYWORDS: &[&str] = &["var", "return", "if", "else", "while", "true", "false"];

#[derive(Debug, Error)]
#[error("parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

/// Parse one file into the engine's unit bundle.
pub fn parse_source(path: impl Into<PathBuf>, text: &str) -> Result<SourceUnit, ParseError> {
    let tokens = tokenize(text);
    let tree = Parser::new(&tokens, text.len()).file()?;
    Ok(SourceUnit::new(path.into(), text.to_string(), tree, tokens))
}

struct Parser<'a> {
    toks: &'a [Token],
    pos: usize,
    text_len: usize,
    builder: TreeBuilder,
}

impl<'a> Parser<'a> {
    fn new(toks: &'a [Token], text_len: usize) -> Self {
        Self {
            toks,
            pos: 0,
            text_len,
            builder: SyntaxTree::builder(),
        }
    }

    fn file(mut self) -> Result<SyntaxTree, ParseError> {
        self.builder.start_node("file", 0);
        while self.pos < self.toks.len() {
            self.statement()?;
        }
        self.builder.finish_node(self.text_len);
        Ok(self.builder.finish())
    }

    // ---- token helpers ----

    fn peek(&self) -> Option<&Token> {
        self.toks.get(self.pos)
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.text == text)
    }

    fn at_ident(&self) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Word && !KEYWORDS.contains(&t.text.as_str()))
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, text: &str) -> Result<(), ParseError> {
        if self.at(text) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected `{text}`")))
        }
    }

    fn unexpected(&self, message: &str) -> ParseError {
        let (offset, found) = self.peek().map_or((self.text_len, "end of input"), |t| {
            (t.span.start, t.text.as_str())
        });
        ParseError {
            offset,
            message: format!("{message}, found {found}"),
        }
    }

    /// Start a node at the current token. Errors at end of input.
    fn start(&mut self, label: &str) -> Result<(), ParseError> {
        match self.peek().map(|t| t.span.start) {
            Some(start) => {
                self.builder.start_node(label, start);
                Ok(())
            }
            None => Err(self.unexpected("unexpected end of input")),
        }
    }

    /// Close the current node at the end of the previous token.
    fn finish(&mut self) {
        let end = self.toks[self.pos - 1].span.end;
        self.builder.finish_node(end);
    }

    // ---- statements ----

    fn statement(&mut self) -> Result<(), ParseError> {
        if self.at("var") {
            return self.var_decl();
        }
        if self.at("return") {
            return self.return_stmt();
        }
        if self.at("if") {
            return self.if_stmt();
        }
        if self.at("while") {
            return self.while_stmt();
        }
        if self.at("{") {
            return self.block();
        }
        if self.typed_decl_ahead() {
            return self.typed_decl();
        }
        self.start("expr_stmt")?;
        self.expr()?;
        self.expect(";")?;
        self.finish();
        Ok(())
    }

    /// `TypeName name = ...;` or `TypeName name;` - two words followed by
    /// `=` or `;` can only be a typed declaration.
    fn typed_decl_ahead(&self) -> bool {
        let two_idents = self.at_ident()
            && self
                .toks
                .get(self.pos + 1)
                .is_some_and(|t| t.kind == TokenKind::Word && !KEYWORDS.contains(&t.text.as_str()));
        two_idents
            && self
                .toks
                .get(self.pos + 2)
                .is_some_and(|t| t.text == "=" || t.text == ";")
    }

    fn var_decl(&mut self) -> Result<(), ParseError> {
        self.start("var_decl")?;
        self.bump(); // var
        self.declarator()?;
        self.expect(";")?;
        self.finish();
        Ok(())
    }

    fn typed_decl(&mut self) -> Result<(), ParseError> {
        self.start("var_decl")?;
        self.start("type_ref")?;
        self.bump();
        self.finish();
        self.declarator()?;
        self.expect(";")?;
        self.finish();
        Ok(())
    }

    fn declarator(&mut self) -> Result<(), ParseError> {
        self.start("declarator")?;
        self.ident()?;
        if self.at("=") {
            self.bump();
            self.expr()?;
        }
        self.finish();
        Ok(())
    }

    fn return_stmt(&mut self) -> Result<(), ParseError> {
        self.start("return_stmt")?;
        self.bump(); // return
        if !self.at(";") {
            self.expr()?;
        }
        self.expect(";")?;
        self.finish();
        Ok(())
    }

    fn if_stmt(&mut self) -> Result<(), ParseError> {
        self.start("if_stmt")?;
        self.bump(); // if
        self.expect("(")?;
        self.expr()?;
        self.expect(")")?;
        self.statement()?;
        if self.at("else") {
            self.bump();
            self.statement()?;
        }
        self.finish();
        Ok(())
    }

    fn while_stmt(&mut self) -> Result<(), ParseError> {
        self.start("while_stmt")?;
        self.bump(); // while
        self.expect("(")?;
        self.expr()?;
        self.expect(")")?;
        self.statement()?;
        self.finish();
        Ok(())
    }

    fn block(&mut self) -> Result<(), ParseError> {
        self.start("block")?;
        self.bump(); // {
        while !self.at("}") {
            if self.peek().is_none() {
                return Err(self.unexpected("expected `}`"));
            }
            self.statement()?;
        }
        self.bump(); // }
        self.finish();
        Ok(())
    }

    // ---- expressions, C precedence ----

    fn expr(&mut self) -> Result<(), ParseError> {
        self.assign()
    }

    fn assign(&mut self) -> Result<(), ParseError> {
        let cp = self.builder.checkpoint();
        self.binary(0)?;
        if self.at("=") {
            self.builder.start_node_at(cp, "assign");
            self.bump();
            self.assign()?; // right-associative
            self.finish();
        }
        Ok(())
    }

    fn binary(&mut self, level: usize) -> Result<(), ParseError> {
        const LEVELS: &[&[&str]] = &[
            &["||"],
            &["&&"],
            &["==", "!="],
            &["<", "<=", ">", ">="],
            &["+", "-"],
            &["*", "/", "%"],
        ];
        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };
        let cp = self.builder.checkpoint();
        self.binary(level + 1)?;
        while self.peek().is_some_and(|t| ops.contains(&t.text.as_str())) {
            self.builder.start_node_at(cp, "binary");
            self.bump();
            self.binary(level + 1)?;
            self.finish();
        }
        Ok(())
    }

    fn unary(&mut self) -> Result<(), ParseError> {
        if self.at("!") || self.at("-") {
            self.start("unary")?;
            self.bump();
            self.unary()?;
            self.finish();
            Ok(())
        } else {
            self.postfix()
        }
    }

    fn postfix(&mut self) -> Result<(), ParseError> {
        let cp = self.builder.checkpoint();
        self.primary()?;
        loop {
            if self.at("(") {
                self.builder.start_node_at(cp, "call");
                self.arg_list()?;
                self.finish();
            } else if self.at(".") {
                self.builder.start_node_at(cp, "member");
                self.bump();
                self.ident()?;
                self.finish();
            } else {
                return Ok(());
            }
        }
    }

    fn arg_list(&mut self) -> Result<(), ParseError> {
        self.start("arg_list")?;
        self.bump(); // (
        while !self.at(")") {
            if self.peek().is_none() {
                return Err(self.unexpected("expected `)`"));
            }
            self.expr()?;
            if self.at(",") {
                self.bump(); // also permits a trailing comma
            } else {
                break;
            }
        }
        self.expect(")")?;
        self.finish();
        Ok(())
    }

    fn primary(&mut self) -> Result<(), ParseError> {
        let Some(tok) = self.peek() else {
            return Err(self.unexpected("expected an expression"));
        };
        let kind = tok.kind;
        let is_bool = tok.text == "true" || tok.text == "false";
        let is_open_paren = tok.text == "(";
        match kind {
            TokenKind::Number => {
                self.start("number")?;
                self.bump();
                self.finish();
                Ok(())
            }
            TokenKind::Str => {
                self.start("string")?;
                self.bump();
                self.finish();
                Ok(())
            }
            TokenKind::Word if is_bool => {
                self.start("bool")?;
                self.bump();
                self.finish();
                Ok(())
            }
            TokenKind::Word if self.at_ident() => self.ident(),
            TokenKind::Punct if is_open_paren => {
                self.start("paren")?;
                self.bump();
                self.expr()?;
                self.expect(")")?;
                self.finish();
                Ok(())
            }
            _ => Err(self.unexpected("expected an expression")),
        }
    }

    fn ident(&mut self) -> Result<(), ParseError> {
        if !self.at_ident() {
            return Err(self.unexpected("expected an identifier"));
        }
        self.start("ident")?;
        self.bump();
        self.finish();
        Ok(())
    }
}
