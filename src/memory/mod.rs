//! Memory model for the MPL interpreter
//!
//! - [`value`]: Runtime value representation (Number, Str, Array, Object)
//! - [`stack`]: Call stack with frames and frame-local variables
//!
//! Global variables live in the interpreter's `VmState`; a function call
//! gets a fresh [`stack::CallFrame`] whose variables shadow the globals for
//! the duration of the call.

pub mod stack;
pub mod value;

pub use stack::{CallFrame, CallStack};
pub use value::Value;
