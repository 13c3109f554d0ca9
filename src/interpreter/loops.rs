//! Loop statement execution (`while`, `for`, `for-of`, `for-in`).
//!
//! Adds `impl Interpreter` methods for the loop forms. A `return` inside the
//! body ends the loop immediately; the flag stays set on the call frame so
//! the enclosing function stops too.
//!
//! Every loop counts its iterations and fails with
//! [`RuntimeError::LoopLimitExceeded`] past `max_loop_iterations`.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::Value;
use crate::parser::ast::{AstNode, ForEachKind, SourceLocation};

/// Whether the loop driver should go round again
enum LoopBodyResult {
    Continue,
    Exit,
}

impl Interpreter {
    fn execute_loop_body(&mut self, body: &AstNode) -> Result<LoopBodyResult, RuntimeError> {
        self.execute_statement(body)?;
        if self.returning() {
            Ok(LoopBodyResult::Exit)
        } else {
            Ok(LoopBodyResult::Continue)
        }
    }

    fn count_iteration(
        &self,
        iterations: &mut usize,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        *iterations += 1;
        if *iterations > self.config.max_loop_iterations {
            return Err(RuntimeError::LoopLimitExceeded {
                limit: self.config.max_loop_iterations,
                location,
            });
        }
        Ok(())
    }

    /// Executes a `while (condition) body` loop.
    pub(crate) fn execute_while(
        &mut self,
        condition: &AstNode,
        body: &AstNode,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let mut iterations = 0;
        while self.evaluate(condition)?.is_truthy() {
            self.count_iteration(&mut iterations, location)?;
            if let LoopBodyResult::Exit = self.execute_loop_body(body)? {
                break;
            }
        }
        Ok(())
    }

    /// Executes a `for (init; condition; update) body` loop.
    ///
    /// A missing condition counts as true.
    pub(crate) fn execute_for(
        &mut self,
        init: Option<&AstNode>,
        condition: Option<&AstNode>,
        update: Option<&AstNode>,
        body: &AstNode,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        if let Some(init) = init {
            self.execute_statement(init)?;
        }

        let mut iterations = 0;
        loop {
            if let Some(condition) = condition {
                if !self.evaluate(condition)?.is_truthy() {
                    break;
                }
            }
            self.count_iteration(&mut iterations, location)?;
            if let LoopBodyResult::Exit = self.execute_loop_body(body)? {
                break;
            }
            if let Some(update) = update {
                self.execute_statement(update)?;
            }
        }
        Ok(())
    }

    /// Executes `for (var v of xs)` over array elements, or
    /// `for (var k in xs)` over object keys or array indices.
    pub(crate) fn execute_for_each(
        &mut self,
        kind: ForEachKind,
        variable: &str,
        iterable: &AstNode,
        body: &AstNode,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let iterable = self.evaluate(iterable)?;
        let items: Vec<Value> = match (kind, iterable) {
            (ForEachKind::Of, Value::Array(items)) => items,
            (ForEachKind::In, Value::Object(fields)) => {
                fields.into_keys().map(Value::Str).collect()
            }
            (ForEachKind::In, Value::Array(items)) => {
                (0..items.len()).map(|i| Value::Number(i as f64)).collect()
            }
            (ForEachKind::Of, other) => {
                return Err(RuntimeError::type_error(
                    format!("Cannot iterate over non-array value: {other}"),
                    location,
                ));
            }
            (ForEachKind::In, other) => {
                return Err(RuntimeError::type_error(
                    format!("Cannot iterate over non-object value: {other}"),
                    location,
                ));
            }
        };

        let mut iterations = 0;
        for item in items {
            self.count_iteration(&mut iterations, location)?;
            self.declare(variable, item);
            if let LoopBodyResult::Exit = self.execute_loop_body(body)? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::{Interpreter, InterpreterConfig};
    use crate::memory::Value;
    use crate::parser::parse;

    fn run_with(config: InterpreterConfig, source: &str) -> (Interpreter, Vec<String>) {
        let (program, syntax) = parse(source);
        assert!(syntax.is_empty(), "{syntax:?}");
        let mut interpreter = Interpreter::new(config);
        let messages = interpreter
            .execute_program(&program)
            .into_iter()
            .map(|d| d.message)
            .collect();
        (interpreter, messages)
    }

    fn run(source: &str) -> Interpreter {
        let (interpreter, messages) = run_with(InterpreterConfig::default(), source);
        assert!(messages.is_empty(), "{messages:?}");
        interpreter
    }

    #[test]
    fn test_while_loop() {
        let interpreter = run("var i = 0; var sum = 0; while (i < 5) { sum = sum + i; i = i + 1; }");
        assert_eq!(interpreter.variable("sum"), Some(&Value::Number(10.0)));
    }

    #[test]
    fn test_classic_for_draws_row() {
        let interpreter = run("for (var x = 0; x < 4; x = x + 1) { set(x, 2); }");
        assert_eq!(interpreter.grid().population(), 4);
        assert_eq!(interpreter.grid().get(3, 2), 1);
    }

    #[test]
    fn test_for_of_and_for_in() {
        let interpreter = run(
            "var total = 0; for (var v of [1, 2, 3]) { total = total + v; }
             var keys = \"\"; for (var k in {a: 1, b: 2}) { keys = keys + k; }
             var idx = 0; for (var i in [7, 8, 9]) { idx = idx + i; }",
        );
        assert_eq!(interpreter.variable("total"), Some(&Value::Number(6.0)));
        assert_eq!(interpreter.variable("keys"), Some(&Value::from("ab")));
        assert_eq!(interpreter.variable("idx"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn test_for_each_type_errors() {
        let (_, messages) = run_with(InterpreterConfig::default(), "for (var v of 5) { }");
        assert_eq!(messages, vec!["Cannot iterate over non-array value: 5".to_string()]);
        let (_, messages) = run_with(InterpreterConfig::default(), "for (var k in \"s\") { }");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_runaway_loop_is_stopped() {
        let config = InterpreterConfig {
            max_loop_iterations: 100,
            ..InterpreterConfig::default()
        };
        let (interpreter, messages) = run_with(config, "var n = 0; while (1) { n = n + 1; } var after = 1;");
        assert_eq!(messages, vec!["Loop exceeded 100 iterations".to_string()]);
        assert_eq!(interpreter.variable("n"), Some(&Value::Number(100.0)));
        assert_eq!(interpreter.variable("after"), Some(&Value::Number(1.0)));
    }
}
