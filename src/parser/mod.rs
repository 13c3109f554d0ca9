//! MPL source code parser
//!
//! This module transforms MPL source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parser struct, helpers and error recovery
//! - `statements` / `expressions`: the recursive descent rules
//! - [`ast`]: AST node definitions
//!
//! # Language
//!
//! - Declarations: `var`, `function name(params) { ... }`, `rule name { ... }`
//! - Statements: assignment, `if/else`, `while`, `for` (classic, `in`, `of`),
//!   `return`, blocks, grid primitives `set/toggle/clear/step`
//! - Expressions: numbers, strings, arrays, objects, arithmetic, comparison,
//!   calls (including namespaced `math.sqrt(x)`), indexing, property access
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser. Neither the lexer nor the parser
//! fails: syntax problems come back as diagnostics next to a best-effort tree.

pub mod ast;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{parse, Parser};
