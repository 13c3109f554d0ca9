//! # Introduction
//!
//! MPL is a small scripting language for driving cellular automata. A
//! program draws on a grid, defines `rule`s and `function`s, and calls
//! `step()` to advance the automaton. Every generation is recorded into a
//! delta-compressed timeline that can be exported or scrubbed through in a
//! terminal UI built with [ratatui](https://docs.rs/ratatui).
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST ─┬→ Interpreter → Grid stepper → Timeline → TUI / JSON
//!                     Linter ────┘        │
//!                                         └→ Event bus
//! ```
//!
//! 1. [`parser`]: tokenises the source and builds an AST, collecting every
//!    syntax error instead of stopping at the first.
//! 2. [`compile`]: parse plus lint, producing [`compile::Diagnostic`]s.
//! 3. [`interpreter`]: walks the AST with globals, a call stack and the
//!    standard library (`math`, `string`, `array`, `io`, `grid`).
//! 4. [`memory`]: runtime [`memory::Value`]s and the [`memory::CallStack`].
//! 5. [`grid`]: the B/S rule stepper, on the calling thread or spread over
//!    rayon workers.
//! 6. [`snapshot`]: snapshots and the [`snapshot::TimelineDelta`] store.
//! 7. [`events`]: typed publish/subscribe bus with bounded history.
//! 8. [`ui`]: ratatui timeline viewer; not part of the stable library API.
//!
//! ## Example
//!
//! ```
//! use mpl::compile::{compile, execute};
//! use mpl::interpreter::Interpreter;
//!
//! let result = compile("set(1, 0); set(1, 1); set(1, 2); step();");
//! let mut interpreter = Interpreter::default();
//! assert!(execute(&result, &mut interpreter).is_empty());
//! assert_eq!(interpreter.grid().population(), 3);
//! assert_eq!(interpreter.grid().get(0, 1), 1);
//! ```

pub mod compile;
pub mod events;
pub mod grid;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod snapshot;
pub mod ui;
