//! Built-in function implementations
//!
//! Functions handled by the interpreter itself rather than defined in user
//! code. Builtins take precedence over user functions of the same name.
//!
//! # Supported Built-ins
//!
//! - `print(v)`: append `v` to the log buffer
//! - `len(v)`: length of a string, array or object
//! - `set(x, y)`, `toggle(x, y)`, `clear()`, `step()`: grid primitives
//! - `grid.get(x, y)`, `grid.width()`, `grid.height()`, `grid.population()`,
//!   plus `grid.set`/`grid.toggle`/`grid.clear` aliases
//! - `math.*`, `string.*`, `array.*`, `io.*`: see [`super::stdlib`]
//!
//! Coordinates are coerced to numbers and floored. Writes outside the grid
//! are ignored; reads outside it return 0.

use crate::events::EngineEvent;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::stdlib;
use crate::memory::Value;
use crate::parser::ast::SourceLocation;
use tracing::info;

type BuiltinResult = Option<Result<Value, RuntimeError>>;

impl Interpreter {
    /// Run builtin `name`, or return `None` when no builtin has that name.
    pub(crate) fn call_builtin(
        &mut self,
        name: &str,
        args: &[Value],
        location: SourceLocation,
    ) -> BuiltinResult {
        if let Some((namespace, function)) = name.split_once('.') {
            return match namespace {
                "grid" => self.builtin_grid(function, name, args, location),
                "math" => stdlib::math(function, name, args, &mut self.rng, location),
                "string" => stdlib::string(function, name, args, location),
                "array" => stdlib::array(function, name, args, location),
                "io" => stdlib::io(function, name, args, location),
                _ => None,
            };
        }

        let result = match name {
            "print" => expect_args(name, args, 1, location).map(|_| self.builtin_print(&args[0])),
            "len" => expect_args(name, args, 1, location).and_then(|_| builtin_len(&args[0], location)),
            "set" => expect_args(name, args, 2, location).map(|_| self.builtin_set(&args[0], &args[1])),
            "toggle" => {
                expect_args(name, args, 2, location).map(|_| self.builtin_toggle(&args[0], &args[1]))
            }
            "clear" => expect_args(name, args, 0, location).map(|_| self.builtin_clear()),
            "step" => expect_args(name, args, 0, location).map(|_| {
                self.step();
                Value::default()
            }),
            _ => return None,
        };
        Some(result)
    }

    fn builtin_print(&mut self, value: &Value) -> Value {
        let output = value.to_string();
        info!(target: "mpl::print", "{output}");
        self.state.log.push(output);
        Value::default()
    }

    fn builtin_set(&mut self, x: &Value, y: &Value) -> Value {
        if let Some((x, y)) = coordinates(x, y) {
            let previous = self.state.grid.get(x, y);
            if self.state.grid.set(x, y, 1) {
                self.announce_cell(x, y, previous);
            }
        }
        Value::default()
    }

    fn builtin_toggle(&mut self, x: &Value, y: &Value) -> Value {
        if let Some((x, y)) = coordinates(x, y) {
            let previous = self.state.grid.get(x, y);
            if self.state.grid.toggle(x, y) {
                self.announce_cell(x, y, previous);
            }
        }
        Value::default()
    }

    fn announce_cell(&self, x: i64, y: i64, previous: u8) {
        self.emit(EngineEvent::GridUpdate {
            x: x as usize,
            y: y as usize,
            previous,
            value: self.state.grid.get(x, y),
            step: self.step_counter,
        });
    }

    fn builtin_clear(&mut self) -> Value {
        self.state.grid.clear();
        self.emit(EngineEvent::StateChange {
            from: "populated".to_string(),
            to: "empty".to_string(),
            step: self.step_counter,
        });
        Value::default()
    }

    fn builtin_grid(
        &mut self,
        function: &str,
        name: &str,
        args: &[Value],
        location: SourceLocation,
    ) -> BuiltinResult {
        if matches!(function, "set" | "toggle" | "clear") {
            return self.call_builtin(function, args, location);
        }
        let grid = &self.state.grid;
        let result = match function {
            "get" => expect_args(name, args, 2, location).map(|_| {
                let value = coordinates(&args[0], &args[1]).map_or(0, |(x, y)| grid.get(x, y));
                Value::Number(f64::from(value))
            }),
            "width" => expect_args(name, args, 0, location).map(|_| Value::Number(grid.width() as f64)),
            "height" => {
                expect_args(name, args, 0, location).map(|_| Value::Number(grid.height() as f64))
            }
            "population" => {
                expect_args(name, args, 0, location).map(|_| Value::Number(grid.population() as f64))
            }
            _ => return None,
        };
        Some(result)
    }
}

/// Fail unless exactly `expected` arguments were passed.
pub(crate) fn expect_args(
    name: &str,
    args: &[Value],
    expected: usize,
    location: SourceLocation,
) -> Result<(), RuntimeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeError::arity(name, expected, args.len(), location))
    }
}

fn builtin_len(value: &Value, location: SourceLocation) -> Result<Value, RuntimeError> {
    let len = match value {
        Value::Str(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(fields) => fields.len(),
        Value::Number(_) => {
            return Err(RuntimeError::type_error(
                format!("Cannot get length of {} value: {value}", value.type_name()),
                location,
            ))
        }
    };
    Ok(Value::Number(len as f64))
}

/// Grid coordinates of two values, floored; `None` for non-finite input.
fn coordinates(x: &Value, y: &Value) -> Option<(i64, i64)> {
    let (x, y) = (x.to_number(), y.to_number());
    (x.is_finite() && y.is_finite()).then(|| (x.floor() as i64, y.floor() as i64))
}

#[cfg(test)]
mod tests {
    use crate::events::{EngineEvent, EventKind};
    use crate::interpreter::Interpreter;
    use crate::memory::Value;
    use crate::parser::parse;

    fn run(source: &str) -> (Interpreter, Vec<String>) {
        let (program, syntax) = parse(source);
        assert!(syntax.is_empty(), "{syntax:?}");
        let mut interpreter = Interpreter::default();
        let messages = interpreter
            .execute_program(&program)
            .into_iter()
            .map(|d| d.message)
            .collect();
        (interpreter, messages)
    }

    #[test]
    fn test_print_appends_to_log() {
        let (interpreter, _) = run("print(\"hi\"); print(1 + 1); print([1, 2]); print({a: \"b\"});");
        assert_eq!(interpreter.log(), ["hi", "2", "1,2", "{a: \"b\"}"]);
    }

    #[test]
    fn test_len() {
        let (interpreter, messages) =
            run("var a = len(\"héllo\"); var b = len([1, 2]); var c = len({x: 1}); var d = len(4);");
        assert_eq!(interpreter.variable("a"), Some(&Value::Number(5.0)));
        assert_eq!(interpreter.variable("b"), Some(&Value::Number(2.0)));
        assert_eq!(interpreter.variable("c"), Some(&Value::Number(1.0)));
        assert_eq!(messages, vec!["Cannot get length of number value: 4".to_string()]);
    }

    #[test]
    fn test_grid_primitives_and_queries() {
        let (interpreter, messages) = run(
            "set(2, 3); toggle(2, 3); toggle(1, 1); set(\"4\", 0); set(0 - 1, 0); set(99, 99);
             var here = grid.get(1, 1); var away = grid.get(0 - 5, 2);
             var w = grid.width(); var pop = grid.population();",
        );
        assert!(messages.is_empty(), "{messages:?}");
        let grid = interpreter.grid();
        assert_eq!(grid.live_cells().collect::<Vec<_>>(), vec![(4, 0), (1, 1)]);
        assert_eq!(interpreter.variable("here"), Some(&Value::Number(1.0)));
        assert_eq!(interpreter.variable("away"), Some(&Value::Number(0.0)));
        assert_eq!(interpreter.variable("w"), Some(&Value::Number(50.0)));
        assert_eq!(interpreter.variable("pop"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_grid_events() {
        let (interpreter, _) = run("set(1, 1); toggle(1, 1); set(500, 1); clear();");
        let events = interpreter.events();
        assert_eq!(events.event_count(Some(EventKind::GridUpdate)), 2);
        let last = events.last_event(Some(EventKind::GridUpdate)).expect("update");
        assert_eq!(
            last.event,
            EngineEvent::GridUpdate {
                x: 1,
                y: 1,
                previous: 1,
                value: 0,
                step: 0
            }
        );
        assert_eq!(events.event_count(Some(EventKind::StateChange)), 1);
    }

    #[test]
    fn test_builtin_arity_is_checked() {
        let (_, messages) = run("print(1, 2);");
        assert_eq!(messages, vec!["Function print expects 1 arguments, got 2".to_string()]);
    }

    #[test]
    fn test_step_builtin_in_expression_position() {
        let (interpreter, _) = run("set(0, 1); set(1, 1); set(2, 1); var r = step();");
        assert_eq!(interpreter.current_step(), 1);
        assert_eq!(interpreter.grid().get(1, 0), 1);
        assert_eq!(interpreter.events().event_count(Some(EventKind::Tick)), 1);
    }
}
