//! Expression parsing implementation
//!
//! # Supported Expressions
//!
//! - Literals: numbers, strings, arrays `[a, b]`, objects `{key: value}`
//! - Identifiers and variables
//! - Binary operators: comparison, additive, multiplicative
//! - Unary minus (parsed as `0 - x`)
//! - Postfix: `()`, `[]`, `.` (chainable)
//!
//! # Precedence
//!
//! Tightest first: primary, postfix, unary, multiplicative, additive,
//! comparison. All binary levels are left-associative.
//!
//! Calls are resolved by name: a variable callee uses its name and a dotted
//! chain of identifiers uses the dotted path (`math.sqrt`). Any other callee
//! is a syntax error.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::Parser;

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> AstNode {
        self.parse_comparison()
    }

    /// True when the current token can begin an expression.
    pub(crate) fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            Token::Number(..)
                | Token::StringLiteral(..)
                | Token::Ident(..)
                | Token::LParen(_)
                | Token::LBracket(_)
                | Token::LBrace(_)
                | Token::Minus(_)
        )
    }

    /// Parse comparison (== != < <= > >=)
    fn parse_comparison(&mut self) -> AstNode {
        let mut left = self.parse_additive();

        loop {
            let loc = self.current_location();
            let op = match self.peek() {
                Token::EqEq(_) => BinOp::Eq,
                Token::NotEq(_) => BinOp::Ne,
                Token::Lt(_) => BinOp::Lt,
                Token::Le(_) => BinOp::Le,
                Token::Gt(_) => BinOp::Gt,
                Token::Ge(_) => BinOp::Ge,
                _ => break,
            };
            self.advance();

            let right = Box::new(self.parse_additive());
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        left
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> AstNode {
        let mut left = self.parse_multiplicative();

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Plus(loc)) {
                BinOp::Add
            } else if self.match_token(&Token::Minus(loc)) {
                BinOp::Sub
            } else {
                break;
            };

            let right = Box::new(self.parse_multiplicative());
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        left
    }

    /// Parse multiplicative (* / %)
    fn parse_multiplicative(&mut self) -> AstNode {
        let mut left = self.parse_unary();

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Star(loc)) {
                BinOp::Mul
            } else if self.match_token(&Token::Slash(loc)) {
                BinOp::Div
            } else if self.match_token(&Token::Percent(loc)) {
                BinOp::Mod
            } else {
                break;
            };

            let right = Box::new(self.parse_unary());
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        left
    }

    /// Parse unary minus
    fn parse_unary(&mut self) -> AstNode {
        let loc = self.current_location();
        if self.match_token(&Token::Minus(loc)) {
            let operand = self.parse_unary();
            return AstNode::BinaryOp {
                op: BinOp::Sub,
                left: Box::new(AstNode::NumberLiteral(0.0, loc)),
                right: Box::new(operand),
                location: loc,
            };
        }
        self.parse_postfix()
    }

    /// Parse postfix chains: calls, indexing and property access
    fn parse_postfix(&mut self) -> AstNode {
        let mut expr = self.parse_primary();

        loop {
            let loc = self.current_location();

            if self.match_token(&Token::LParen(loc)) {
                let args = self.parse_argument_list();
                self.consume_rparen("after function arguments");

                let callee_loc = *expr.location();
                expr = match expr.qualified_name() {
                    Some(name) => AstNode::Call {
                        name,
                        args,
                        location: callee_loc,
                    },
                    None => {
                        self.error_at(
                            "Function call must be on a name",
                            callee_loc,
                        );
                        AstNode::NumberLiteral(0.0, callee_loc)
                    }
                };
            } else if self.match_token(&Token::LBracket(loc)) {
                let index = Box::new(self.parse_expression());
                self.consume(
                    Token::RBracket(self.current_location()),
                    "Expected ']' after array index",
                );
                expr = AstNode::Index {
                    target: Box::new(expr),
                    index,
                    location: loc,
                };
            } else if self.match_token(&Token::Dot(loc)) {
                let (property, _) = self.consume_ident("Expected property name");
                expr = AstNode::PropertyAccess {
                    object: Box::new(expr),
                    property,
                    location: loc,
                };
            } else {
                break;
            }
        }

        expr
    }

    /// Parse argument list up to (not including) the closing `)`
    fn parse_argument_list(&mut self) -> Vec<AstNode> {
        let mut args = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return args;
        }

        loop {
            args.push(self.parse_expression());

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        args
    }

    /// Parse primary (literals, variables, parenthesized expressions,
    /// array and object literals)
    fn parse_primary(&mut self) -> AstNode {
        let token = self.peek().clone();
        let loc = token.location();

        match token {
            Token::Number(value, _) => {
                self.advance();
                AstNode::NumberLiteral(value, loc)
            }
            Token::StringLiteral(value, _) => {
                self.advance();
                AstNode::StringLiteral(value, loc)
            }
            Token::Ident(name, _) => {
                self.advance();
                AstNode::Variable(name, loc)
            }
            Token::LParen(_) => {
                self.advance();
                let expr = self.parse_expression();
                self.consume_rparen("after expression");
                AstNode::Parenthesized {
                    expr: Box::new(expr),
                    location: loc,
                }
            }
            Token::LBracket(_) => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&Token::RBracket(loc)) {
                    loop {
                        elements.push(self.parse_expression());
                        if !self.match_token(&Token::Comma(self.current_location())) {
                            break;
                        }
                    }
                }
                self.consume(
                    Token::RBracket(self.current_location()),
                    "Expected ']' after array elements",
                );
                AstNode::ArrayLiteral {
                    elements,
                    location: loc,
                }
            }
            Token::LBrace(_) => {
                self.advance();
                self.parse_object_literal(loc)
            }
            _ => {
                self.error_at("Expected expression", loc);
                if !self.at_statement_boundary() {
                    self.advance();
                }
                AstNode::NumberLiteral(0.0, loc)
            }
        }
    }

    /// Parse `{key: value, ...}`; the opening brace is already consumed.
    fn parse_object_literal(&mut self, loc: SourceLocation) -> AstNode {
        let mut entries = Vec::new();

        if !self.check(&Token::RBrace(loc)) {
            loop {
                let (key, _) = self.consume_ident("Expected property name");
                self.consume(
                    Token::Colon(self.current_location()),
                    "Expected ':' after property name",
                );
                let value = self.parse_expression();
                entries.push((key, value));

                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
        }

        self.consume(
            Token::RBrace(self.current_location()),
            "Expected '}' after object properties",
        );
        AstNode::ObjectLiteral {
            entries,
            location: loc,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::parse;

    fn expr_of(source: &str) -> AstNode {
        let (program, diagnostics) = parse(source);
        assert!(diagnostics.is_empty(), "unexpected: {:?}", diagnostics);
        match program.statements.into_iter().next() {
            Some(AstNode::ExpressionStatement { expr, .. }) => *expr,
            Some(AstNode::VarDecl { init: Some(init), .. }) => *init,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        match expr_of("1 + 2 * 3;") {
            AstNode::BinaryOp { op, right, .. } => {
                assert_eq!(op, BinOp::Add);
                assert!(matches!(*right, AstNode::BinaryOp { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        match expr_of("10 - 3 - 2;") {
            AstNode::BinaryOp { op, left, .. } => {
                assert_eq!(op, BinOp::Sub);
                assert!(matches!(*left, AstNode::BinaryOp { op: BinOp::Sub, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dotted_call_uses_qualified_name() {
        match expr_of("math.sqrt(16);") {
            AstNode::Call { name, args, .. } => {
                assert_eq!(name, "math.sqrt");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_object_and_array_literals() {
        match expr_of("var o = {a: 1, b: [2, 3]};") {
            AstNode::ObjectLiteral { entries, .. } => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].0, "a");
                assert!(matches!(entries[1].1, AstNode::ArrayLiteral { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_postfix_chain() {
        match expr_of("grid.rows[1][2];") {
            AstNode::Index { target, .. } => {
                assert!(matches!(*target, AstNode::Index { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_expression_yields_placeholder() {
        let (program, diagnostics) = parse("var x = ;");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Expected expression");
        match &program.statements[0] {
            AstNode::VarDecl { init: Some(init), .. } => {
                assert!(matches!(**init, AstNode::NumberLiteral(v, _) if v == 0.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
