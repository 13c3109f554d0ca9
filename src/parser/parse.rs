//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure:
//! token helpers, diagnostic collection and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `statements`: declarations and statements (var, function, rule, if, ...)
//! - `expressions`: expressions from comparison down to primary
//!
//! # Error recovery
//!
//! The parser never aborts. [`Parser::consume`] records an error diagnostic,
//! skips ahead to the next statement boundary (`;`, `}`, a statement keyword
//! or end of file), and hands back a placeholder token so the caller can keep
//! building the tree. While the
//! parser is in panic mode further errors are suppressed until the next
//! statement starts, so one mistake yields one diagnostic.

use crate::compile::Diagnostic;
use crate::parser::ast::*;
use crate::parser::lexer::{Lexer, Token};

/// Recursive descent parser for MPL
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) panic_mode: bool,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        let tokens = Lexer::new(source).tokenize();
        Self::from_tokens(tokens)
    }

    /// Build a parser over an existing token stream. The stream must end in
    /// [`Token::Eof`]; one is appended when missing.
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(Token::Eof(_))) {
            let loc = tokens
                .last()
                .map(|t| t.location())
                .unwrap_or_else(|| SourceLocation::new(1, 1));
            tokens.push(Token::Eof(loc));
        }
        Self {
            tokens,
            position: 0,
            diagnostics: Vec::new(),
            panic_mode: false,
        }
    }

    /// Parse the entire program, returning the tree and every syntax
    /// diagnostic collected on the way.
    pub fn parse_program(mut self) -> (Program, Vec<Diagnostic>) {
        let mut program = Program::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.parse_statement_or_recover() {
                program.statements.push(stmt);
            }
        }

        (program, self.diagnostics)
    }

    /// Parse one statement; on a token that cannot start a statement,
    /// record "Unexpected token" and skip it.
    pub(crate) fn parse_statement_or_recover(&mut self) -> Option<AstNode> {
        self.panic_mode = false;
        // Stray semicolons are empty statements
        if self.match_token(&Token::Semicolon(self.current_location())) {
            return None;
        }
        let start = self.position;
        let stmt = self.parse_statement();
        if stmt.is_none() {
            let token = self.peek().clone();
            self.error_at(
                format!("Unexpected token {}", token),
                token.location(),
            );
            self.advance();
        } else if self.position == start {
            // Guarantee forward progress on degenerate input
            self.advance();
        }
        stmt
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    pub(crate) fn check_ahead(&self, n: usize, token: &Token) -> bool {
        self.peek_ahead(n)
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    /// Consume the expected token or record `message`, skip to a statement
    /// boundary and return a placeholder of the expected kind located at the
    /// offending token.
    ///
    /// Only the first failure in a statement is recorded: later `consume`
    /// failures before the next statement starts are dropped by
    /// [`Parser::error_at`], so one mistake yields one diagnostic.
    pub(crate) fn consume(&mut self, expected: Token, message: &str) -> Token {
        if self.check(&expected) {
            return self.advance().clone();
        }

        let loc = self.current_location();
        self.error_at(message, loc);
        self.synchronize();
        relocate(expected, loc)
    }

    /// Consume an identifier, returning its name (empty on recovery).
    pub(crate) fn consume_ident(&mut self, message: &str) -> (String, SourceLocation) {
        match self.consume(Token::Ident(String::new(), self.current_location()), message) {
            Token::Ident(name, loc) => (name, loc),
            other => (String::new(), other.location()),
        }
    }

    pub(crate) fn consume_semicolon(&mut self, ctx: &str) {
        self.consume(
            Token::Semicolon(self.current_location()),
            &format!("Expected ';' {ctx}"),
        );
    }

    pub(crate) fn consume_lparen(&mut self, ctx: &str) {
        self.consume(
            Token::LParen(self.current_location()),
            &format!("Expected '(' {ctx}"),
        );
    }

    pub(crate) fn consume_rparen(&mut self, ctx: &str) {
        self.consume(
            Token::RParen(self.current_location()),
            &format!("Expected ')' {ctx}"),
        );
    }

    /// Skip forward to a statement boundary without consuming it.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_statement_boundary() {
            self.advance();
        }
    }

    /// `;`, `}`, end of file, or a keyword that can only begin a statement.
    pub(crate) fn at_statement_boundary(&self) -> bool {
        matches!(
            self.peek(),
            Token::Semicolon(_)
                | Token::RBrace(_)
                | Token::Eof(_)
                | Token::Var(_)
                | Token::Function(_)
                | Token::Rule(_)
                | Token::If(_)
                | Token::While(_)
                | Token::For(_)
                | Token::Return(_)
        )
    }

    /// Record a syntax error unless already recovering from one.
    pub(crate) fn error_at(&mut self, message: impl Into<String>, location: SourceLocation) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.diagnostics.push(Diagnostic::syntax(message, location));
    }
}

/// Re-stamp a placeholder token with the location of the error.
fn relocate(token: Token, loc: SourceLocation) -> Token {
    match token {
        Token::Ident(name, _) => Token::Ident(name, loc),
        Token::Semicolon(_) => Token::Semicolon(loc),
        Token::LParen(_) => Token::LParen(loc),
        Token::RParen(_) => Token::RParen(loc),
        Token::LBrace(_) => Token::LBrace(loc),
        Token::RBrace(_) => Token::RBrace(loc),
        Token::RBracket(_) => Token::RBracket(loc),
        Token::Colon(_) => Token::Colon(loc),
        other => other,
    }
}

/// Parse a source string into a [`Program`] plus syntax diagnostics.
pub fn parse(source: &str) -> (Program, Vec<Diagnostic>) {
    Parser::new(source).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_parses_to_empty_program() {
        let (program, diagnostics) = parse("");
        assert!(program.statements.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_missing_semicolon_is_reported_once() {
        let (program, diagnostics) = parse("var x = 1\nvar y = 2;");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("';'"));
        // Recovery keeps the second declaration
        assert!(program
            .statements
            .iter()
            .any(|s| matches!(s, AstNode::VarDecl { name, .. } if name == "y")));
    }

    #[test]
    fn test_second_failure_in_a_statement_is_suppressed() {
        // Bad name and missing ';' in the same declaration
        let (_, diagnostics) = parse("var 5 = 1");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Expected variable name");

        let (_, diagnostics) = parse("var 5 = 1\nvar = 2;");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[1].line, 2);
    }

    #[test]
    fn test_unexpected_token_at_top_level() {
        let (_, diagnostics) = parse(") var x = 1;");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with("Unexpected token"));
        assert_eq!(diagnostics[0].line, 1);
        assert_eq!(diagnostics[0].column, 1);
    }

    #[test]
    fn test_parser_never_loops_on_garbage() {
        let (_, diagnostics) = parse("} } ; ] , . : = ==");
        assert!(!diagnostics.is_empty());
    }
}
