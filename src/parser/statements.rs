//! Statement parsing implementation
//!
//! Handles declarations (`var`, `function`, `rule`), control flow (`if`,
//! `while`, the three `for` forms, `return`), blocks, assignments, the grid
//! primitives `set`/`toggle`/`clear`/`step` and expression statements.
//!
//! `for` headers are disambiguated by lookahead: `for (var NAME in ...)` and
//! `for (var NAME of ...)` iterate a collection, anything else is the classic
//! three-clause loop. Classic init and update clauses may be a declaration,
//! an assignment or a bare expression; the update clause takes no `;`.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::Parser;

impl Parser {
    /// Parse a single statement, or `None` when the current token cannot
    /// begin one.
    pub(crate) fn parse_statement(&mut self) -> Option<AstNode> {
        let stmt = match self.peek() {
            Token::Var(_) => {
                let decl = self.parse_var_clause();
                self.consume_semicolon("after variable declaration");
                decl
            }
            Token::Function(_) => self.parse_function_decl(),
            Token::Rule(_) => self.parse_rule_decl(),
            Token::Return(_) => self.parse_return(),
            Token::If(_) => self.parse_if(),
            Token::While(_) => self.parse_while(),
            Token::For(_) => self.parse_for(),
            Token::LBrace(_) => self.parse_block(),
            Token::Ident(name, _) => {
                let grid_command = GridCommand::from_ident(name);
                match grid_command {
                    Some(command) if self.check_ahead(1, &Token::LParen(self.current_location())) => {
                        self.parse_grid_statement(command)
                    }
                    _ if self.check_ahead(1, &Token::Eq(self.current_location())) => {
                        let assign = self.parse_assignment_clause();
                        self.consume_semicolon("after assignment");
                        assign
                    }
                    _ => self.parse_expression_statement(),
                }
            }
            _ if self.starts_expression() => self.parse_expression_statement(),
            _ => return None,
        };
        Some(stmt)
    }

    /// `var NAME` with an optional `= expr`, without the trailing `;`.
    fn parse_var_clause(&mut self) -> AstNode {
        let loc = self.current_location();
        self.advance(); // consume 'var'
        let (name, _) = self.consume_ident("Expected variable name");

        let init = if self.match_token(&Token::Eq(self.current_location())) {
            Some(Box::new(self.parse_expression()))
        } else {
            None
        };

        AstNode::VarDecl {
            name,
            init,
            location: loc,
        }
    }

    /// `NAME = expr`, without the trailing `;`.
    fn parse_assignment_clause(&mut self) -> AstNode {
        let (name, loc) = self.consume_ident("Expected variable name");
        self.consume(
            Token::Eq(self.current_location()),
            "Expected '=' in assignment",
        );
        let value = Box::new(self.parse_expression());
        AstNode::Assignment {
            name,
            value,
            location: loc,
        }
    }

    /// Parse a function declaration: `function name(a, b) { ... }`
    fn parse_function_decl(&mut self) -> AstNode {
        let loc = self.current_location();
        self.advance(); // consume 'function'
        let (name, _) = self.consume_ident("Expected function name");
        self.consume_lparen("after function name");

        let mut params = Vec::new();
        if !self.check(&Token::RParen(self.current_location())) {
            loop {
                let (param, _) = self.consume_ident("Expected parameter name");
                params.push(param);
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
        }
        self.consume_rparen("after parameters");

        let body = self.parse_block_body();
        AstNode::FunctionDecl {
            name,
            params,
            body,
            location: loc,
        }
    }

    /// Parse a rule declaration: `rule name { ... }`
    fn parse_rule_decl(&mut self) -> AstNode {
        let loc = self.current_location();
        self.advance(); // consume 'rule'
        let (name, _) = self.consume_ident("Expected rule name");
        let body = self.parse_block_body();
        AstNode::RuleDecl {
            name,
            body,
            location: loc,
        }
    }

    /// Parse return statement
    fn parse_return(&mut self) -> AstNode {
        let loc = self.current_location();
        self.advance(); // consume 'return'

        let expr = if self.check(&Token::Semicolon(loc)) {
            None
        } else {
            Some(Box::new(self.parse_expression()))
        };
        self.consume_semicolon("after return statement");

        AstNode::Return {
            expr,
            location: loc,
        }
    }

    /// Parse if statement; `else if` chains are nested ifs
    fn parse_if(&mut self) -> AstNode {
        let loc = self.current_location();
        self.advance(); // consume 'if'
        self.consume_lparen("after 'if'");
        let condition = Box::new(self.parse_expression());
        self.consume_rparen("after if condition");

        let then_branch = Box::new(self.parse_body());
        let else_branch = if self.match_token(&Token::Else(self.current_location())) {
            Some(Box::new(self.parse_body()))
        } else {
            None
        };

        AstNode::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        }
    }

    /// Parse while loop
    fn parse_while(&mut self) -> AstNode {
        let loc = self.current_location();
        self.advance(); // consume 'while'
        self.consume_lparen("after 'while'");
        let condition = Box::new(self.parse_expression());
        self.consume_rparen("after while condition");
        let body = Box::new(self.parse_body());

        AstNode::While {
            condition,
            body,
            location: loc,
        }
    }

    /// Parse any of the three `for` forms
    fn parse_for(&mut self) -> AstNode {
        let loc = self.current_location();
        self.advance(); // consume 'for'
        self.consume_lparen("after 'for'");

        if let Some(kind) = self.for_each_kind() {
            self.advance(); // consume 'var'
            let (variable, _) = self.consume_ident("Expected loop variable");
            self.advance(); // consume 'in' / 'of'
            let iterable = Box::new(self.parse_expression());
            self.consume_rparen("after iterable");
            let body = Box::new(self.parse_body());
            return AstNode::ForEach {
                kind,
                variable,
                iterable,
                body,
                location: loc,
            };
        }

        let init = if self.check(&Token::Semicolon(loc)) {
            None
        } else {
            Some(Box::new(self.parse_for_clause()))
        };
        self.consume_semicolon("after for initializer");

        let condition = if self.check(&Token::Semicolon(loc)) {
            None
        } else {
            Some(Box::new(self.parse_expression()))
        };
        self.consume_semicolon("after for condition");

        let update = if self.check(&Token::RParen(loc)) {
            None
        } else {
            Some(Box::new(self.parse_for_clause()))
        };
        self.consume_rparen("after for clauses");

        let body = Box::new(self.parse_body());
        AstNode::For {
            init,
            condition,
            update,
            body,
            location: loc,
        }
    }

    /// Lookahead for `var NAME in` / `var NAME of`.
    fn for_each_kind(&self) -> Option<ForEachKind> {
        if !matches!(self.peek(), Token::Var(_)) {
            return None;
        }
        if !matches!(self.peek_ahead(1), Some(Token::Ident(..))) {
            return None;
        }
        match self.peek_ahead(2) {
            Some(Token::In(_)) => Some(ForEachKind::In),
            Some(Token::Of(_)) => Some(ForEachKind::Of),
            _ => None,
        }
    }

    /// Init or update clause of a classic `for`
    fn parse_for_clause(&mut self) -> AstNode {
        match self.peek() {
            Token::Var(_) => self.parse_var_clause(),
            Token::Ident(..) if self.check_ahead(1, &Token::Eq(self.current_location())) => {
                self.parse_assignment_clause()
            }
            _ => {
                let expr = self.parse_expression();
                let location = *expr.location();
                AstNode::ExpressionStatement {
                    expr: Box::new(expr),
                    location,
                }
            }
        }
    }

    /// Body of `if`/`while`/`for`: a block or a single statement.
    fn parse_body(&mut self) -> AstNode {
        if self.check(&Token::LBrace(self.current_location())) {
            return self.parse_block();
        }
        let loc = self.current_location();
        match self.parse_statement() {
            Some(stmt) => stmt,
            None => {
                self.error_at("Expected statement", loc);
                self.synchronize();
                AstNode::Block {
                    statements: Vec::new(),
                    location: loc,
                }
            }
        }
    }

    /// Parse `{ ... }` into a block node
    pub(crate) fn parse_block(&mut self) -> AstNode {
        let loc = self.current_location();
        let statements = self.parse_block_body();
        AstNode::Block {
            statements,
            location: loc,
        }
    }

    /// Parse `{ ... }` and return the statements inside
    fn parse_block_body(&mut self) -> Vec<AstNode> {
        self.consume(Token::LBrace(self.current_location()), "Expected '{'");

        let mut statements = Vec::new();
        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            if let Some(stmt) = self.parse_statement_or_recover() {
                statements.push(stmt);
            }
        }

        self.consume(Token::RBrace(self.current_location()), "Expected '}'");
        statements
    }

    /// Parse `set(x, y);`, `toggle(x, y);`, `clear();` or `step();`
    fn parse_grid_statement(&mut self, command: GridCommand) -> AstNode {
        let loc = self.current_location();
        self.advance(); // consume command name
        self.advance(); // consume '('

        let mut args = Vec::new();
        if !self.check(&Token::RParen(loc)) {
            loop {
                args.push(self.parse_expression());
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
        }
        self.consume_rparen(&format!("after {} arguments", command.name()));
        if args.len() != command.arity() {
            self.error_at(
                format!(
                    "{}() expects {} argument(s), got {}",
                    command.name(),
                    command.arity(),
                    args.len()
                ),
                loc,
            );
        }
        self.consume_semicolon(&format!("after {}()", command.name()));

        AstNode::GridStatement {
            command,
            args,
            location: loc,
        }
    }

    /// Parse `expr;`
    fn parse_expression_statement(&mut self) -> AstNode {
        let loc = self.current_location();
        let expr = Box::new(self.parse_expression());
        self.consume_semicolon("after expression");
        AstNode::ExpressionStatement {
            expr,
            location: loc,
        }
    }
}
