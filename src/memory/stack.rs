//! Call stack implementation
//!
//! This module provides the call stack for function execution:
//! - [`CallStack`]: LIFO stack of frames
//! - [`CallFrame`]: a single function's activation record
//!
//! A frame is created on function entry and dropped on exit, on the normal
//! path and on the error path alike. Frames are never shared between calls.

use super::value::Value;
use rustc_hash::FxHashMap;

/// Activation record of one user-function call
#[derive(Debug, Clone, Default)]
pub struct CallFrame {
    pub function_name: String,
    pub variables: FxHashMap<String, Value>,
    pub return_value: Value,
    pub has_returned: bool,
}

impl CallFrame {
    pub fn new(function_name: impl Into<String>) -> Self {
        CallFrame {
            function_name: function_name.into(),
            ..Default::default()
        }
    }

    /// Record a `return` and stop the rest of the body.
    pub fn set_return(&mut self, value: Value) {
        self.return_value = value;
        self.has_returned = true;
    }
}

/// The interpreter's call stack
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Frames from outermost to innermost
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    /// True once the innermost frame has executed `return`.
    pub fn has_returned(&self) -> bool {
        self.current().is_some_and(|f| f.has_returned)
    }
}
