//! MPL interpreter execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: [`Interpreter`], its configuration and the `VmState`
//! - [`errors`]: Runtime error types
//! - `statements`, `loops`, `expressions`: AST walking, split by node kind
//! - `builtins`: `print`, `len`, grid primitives and `grid.*`
//! - [`stdlib`]: `math.*`, `string.*`, `array.*`, `io.*`
//! - [`constants`]: defaults and the standard constants
//!
//! # Execution Model
//!
//! The interpreter walks the AST one top-level statement at a time. A
//! statement that fails is reported and skipped; the program carries on.
//! Each `step()` advances the grid, records a timeline frame and announces
//! `tick` and `performance` on the interpreter's event bus.

mod builtins;
pub mod constants;
pub mod engine;
pub mod errors;
mod expressions;
mod loops;
mod statements;
pub mod stdlib;

pub use engine::{Interpreter, InterpreterConfig, StepBackend, VmState};
pub use errors::RuntimeError;
pub use expressions::binary_op;
