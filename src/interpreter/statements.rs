//! Statement execution implementation
//!
//! This module handles the execution of every MPL statement type:
//!
//! - Variable declarations and assignments
//! - Function and rule declarations
//! - `if`/`else` and blocks
//! - `return`
//! - Grid primitives (`set`, `toggle`, `clear`, `step`)
//!
//! Loops live in [`super::loops`].
//!
//! # Control Flow
//!
//! `return` marks the innermost call frame as returned. Every statement
//! sequence checks that flag after each statement and stops early, which
//! unwinds nested blocks and loops back to the function call. At top level
//! there is no frame and `return` does nothing.

use crate::interpreter::engine::{FunctionDef, Interpreter, RuleDef};
use crate::interpreter::errors::RuntimeError;
use crate::memory::Value;
use crate::parser::ast::*;
use std::rc::Rc;

impl Interpreter {
    pub(crate) fn execute_statement(&mut self, stmt: &AstNode) -> Result<(), RuntimeError> {
        match stmt {
            AstNode::VarDecl { name, init, .. } => {
                let value = match init {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::default(),
                };
                self.declare(name, value);
                Ok(())
            }

            AstNode::Assignment {
                name,
                value,
                location,
            } => {
                let value = self.evaluate(value)?;
                self.assign(name, value, *location)
            }

            AstNode::FunctionDecl {
                name,
                params,
                body,
                location,
            } => {
                self.state.functions.insert(
                    name.clone(),
                    Rc::new(FunctionDef {
                        name: name.clone(),
                        params: params.clone(),
                        body: body.clone(),
                        location: *location,
                    }),
                );
                Ok(())
            }

            AstNode::RuleDecl {
                name,
                body,
                location,
            } => {
                self.state.rules.insert(
                    name.clone(),
                    Rc::new(RuleDef {
                        name: name.clone(),
                        body: body.clone(),
                        location: *location,
                    }),
                );
                Ok(())
            }

            AstNode::Return { expr, .. } => self.execute_return(expr.as_deref()),

            AstNode::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute_statement(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch)
                } else {
                    Ok(())
                }
            }

            AstNode::While {
                condition,
                body,
                location,
            } => self.execute_while(condition, body, *location),

            AstNode::For {
                init,
                condition,
                update,
                body,
                location,
            } => self.execute_for(
                init.as_deref(),
                condition.as_deref(),
                update.as_deref(),
                body,
                *location,
            ),

            AstNode::ForEach {
                kind,
                variable,
                iterable,
                body,
                location,
            } => self.execute_for_each(*kind, variable, iterable, body, *location),

            AstNode::Block { statements, .. } => self.execute_block(statements),

            AstNode::GridStatement {
                command,
                args,
                location,
            } => {
                let args = self.evaluate_args(args)?;
                self.call_builtin(command.name(), &args, *location)
                    .unwrap_or_else(|| {
                        Err(RuntimeError::UnknownFunction {
                            name: command.name().to_string(),
                            location: *location,
                        })
                    })
                    .map(|_| ())
            }

            AstNode::ExpressionStatement { expr, .. } => self.evaluate(expr).map(|_| ()),

            // A bare expression in statement position
            expr => self.evaluate(expr).map(|_| ()),
        }
    }

    /// Run statements in order, stopping early after a `return`.
    pub(crate) fn execute_block(&mut self, statements: &[AstNode]) -> Result<(), RuntimeError> {
        for stmt in statements {
            self.execute_statement(stmt)?;
            if self.returning() {
                break;
            }
        }
        Ok(())
    }

    fn execute_return(&mut self, expr: Option<&AstNode>) -> Result<(), RuntimeError> {
        if self.call_stack.is_empty() {
            return Ok(());
        }
        let value = match expr {
            Some(expr) => self.evaluate(expr)?,
            None => Value::default(),
        };
        if let Some(frame) = self.call_stack.current_mut() {
            frame.set_return(value);
        }
        Ok(())
    }
}
