//! Expression evaluation
//!
//! Binary operators follow a small set of coercion rules:
//!
//! - `+` concatenates when either side is a string
//! - when either side is an array or object both sides become numbers
//! - two strings compare lexicographically
//! - anything else is coerced with [`Value::to_number`]
//!
//! Comparisons yield `1` or `0`. `/` is floored division and `%` is the
//! floating-point remainder.
//!
//! Calls resolve builtins first, then user functions, then rules.

use crate::events::EngineEvent;
use crate::interpreter::engine::{FunctionDef, Interpreter, RuleDef};
use crate::interpreter::errors::RuntimeError;
use crate::memory::{CallFrame, Value};
use crate::parser::ast::*;
use indexmap::IndexMap;
use std::rc::Rc;
use std::time::Instant;

impl Interpreter {
    pub(crate) fn evaluate(&mut self, expr: &AstNode) -> Result<Value, RuntimeError> {
        match expr {
            AstNode::NumberLiteral(n, _) => Ok(Value::Number(*n)),
            AstNode::StringLiteral(s, _) => Ok(Value::Str(s.clone())),
            AstNode::Variable(name, location) => self.lookup(name, *location),
            AstNode::Parenthesized { expr, .. } => self.evaluate(expr),

            AstNode::BinaryOp {
                op, left, right, ..
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(binary_op(*op, &left, &right))
            }

            AstNode::ArrayLiteral { elements, .. } => {
                Ok(Value::Array(self.evaluate_args(elements)?))
            }

            AstNode::ObjectLiteral { entries, .. } => {
                let mut fields = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let value = self.evaluate(value)?;
                    fields.insert(key.clone(), value);
                }
                Ok(Value::Object(fields))
            }

            AstNode::Index {
                target,
                index,
                location,
            } => {
                let target = self.evaluate(target)?;
                let index = self.evaluate(index)?;
                index_value(target, &index, *location)
            }

            AstNode::PropertyAccess {
                object,
                property,
                location,
            } => {
                let object = self.evaluate(object)?;
                property_value(object, property, *location)
            }

            AstNode::Call {
                name,
                args,
                location,
            } => self.call(name, args, *location),

            other => Err(RuntimeError::type_error(
                "Statement used where an expression was expected",
                *other.location(),
            )),
        }
    }

    pub(crate) fn evaluate_args(&mut self, args: &[AstNode]) -> Result<Vec<Value>, RuntimeError> {
        args.iter().map(|arg| self.evaluate(arg)).collect()
    }

    fn call(
        &mut self,
        name: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let args = self.evaluate_args(args)?;

        if let Some(result) = self.call_builtin(name, &args, location) {
            return result;
        }
        if let Some(function) = self.state.functions.get(name).map(Rc::clone) {
            return self.call_function(&function, args, location);
        }
        if let Some(rule) = self.state.rules.get(name).map(Rc::clone) {
            self.apply_rule(&rule, location)?;
            return Ok(Value::default());
        }
        Err(RuntimeError::UnknownFunction {
            name: name.to_string(),
            location,
        })
    }

    fn check_call_depth(&self, name: &str, location: SourceLocation) -> Result<(), RuntimeError> {
        if self.call_depth() >= self.config.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                function: name.to_string(),
                limit: self.config.max_call_depth,
                location,
            });
        }
        Ok(())
    }

    /// Invoke a user function with already-evaluated arguments.
    ///
    /// The frame is popped whether or not the body succeeds.
    pub(crate) fn call_function(
        &mut self,
        function: &FunctionDef,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if args.len() != function.params.len() {
            return Err(RuntimeError::arity(
                &function.name,
                function.params.len(),
                args.len(),
                location,
            ));
        }
        self.check_call_depth(&function.name, location)?;

        let started = Instant::now();
        self.emit(EngineEvent::FunctionCall {
            name: function.name.clone(),
            args: args.clone(),
            step: self.step_counter,
        });

        let mut frame = CallFrame::new(&function.name);
        frame.variables.extend(function.params.iter().cloned().zip(args));
        self.call_stack.push(frame);
        let outcome = self.execute_block(&function.body);
        let frame = self.call_stack.pop();
        outcome?;

        self.emit(EngineEvent::Performance {
            operation: format!("function:{}", function.name),
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            step: self.step_counter,
        });
        Ok(frame.map(|f| f.return_value).unwrap_or_default())
    }

    /// Run a rule body in the current scope. Rules nest against the same
    /// limit as function calls.
    pub(crate) fn apply_rule(
        &mut self,
        rule: &RuleDef,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.check_call_depth(&rule.name, location)?;

        let started = Instant::now();
        self.rule_depth += 1;
        let outcome = self.execute_block(&rule.body);
        self.rule_depth -= 1;
        outcome?;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.monitor.record_rule(&rule.name, self.step_counter);
        self.emit(EngineEvent::RuleApplied {
            rule: rule.name.clone(),
            step: self.step_counter,
        });
        self.emit(EngineEvent::Performance {
            operation: format!("rule:{}", rule.name),
            duration_ms,
            step: self.step_counter,
        });
        Ok(())
    }
}

/// Apply a binary operator.
pub fn binary_op(op: BinOp, left: &Value, right: &Value) -> Value {
    if op == BinOp::Add && (matches!(left, Value::Str(_)) || matches!(right, Value::Str(_))) {
        return Value::Str(format!("{left}{right}"));
    }
    if let (Value::Str(l), Value::Str(r)) = (left, right) {
        if op.is_comparison() {
            return Value::from(compare(op, l.as_str().cmp(r.as_str())));
        }
    }
    numeric_op(op, left.to_number(), right.to_number())
}

fn numeric_op(op: BinOp, l: f64, r: f64) -> Value {
    let n = match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => (l / r).floor(),
        BinOp::Mod => l % r,
        BinOp::Eq => return Value::from(l == r),
        BinOp::Ne => return Value::from(l != r),
        BinOp::Lt => return Value::from(l < r),
        BinOp::Le => return Value::from(l <= r),
        BinOp::Gt => return Value::from(l > r),
        BinOp::Ge => return Value::from(l >= r),
    };
    Value::Number(n)
}

fn compare(op: BinOp, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        BinOp::Eq => ordering == Equal,
        BinOp::Ne => ordering != Equal,
        BinOp::Lt => ordering == Less,
        BinOp::Le => ordering != Greater,
        BinOp::Gt => ordering == Greater,
        BinOp::Ge => ordering != Less,
        _ => false,
    }
}

fn index_value(target: Value, index: &Value, location: SourceLocation) -> Result<Value, RuntimeError> {
    let Value::Array(mut items) = target else {
        return Err(RuntimeError::type_error(
            format!("Cannot index non-array value: {target}"),
            location,
        ));
    };
    let i = index.to_number();
    if i.fract() != 0.0 || i < 0.0 || i >= items.len() as f64 {
        return Err(RuntimeError::IndexOutOfBounds {
            index: crate::memory::value::format_number(i),
            len: items.len(),
            location,
        });
    }
    Ok(items.swap_remove(i as usize))
}

fn property_value(
    object: Value,
    property: &str,
    location: SourceLocation,
) -> Result<Value, RuntimeError> {
    let Value::Object(mut fields) = object else {
        return Err(RuntimeError::type_error(
            format!("Cannot access property of non-object value: {object}"),
            location,
        ));
    };
    fields
        .swap_remove(property)
        .ok_or_else(|| RuntimeError::MissingProperty {
            property: property.to_string(),
            location,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::parser::parse;
    use crate::interpreter::constants::DEFAULT_MAX_CALL_DEPTH;

    fn eval(source: &str) -> Value {
        let (program, syntax) = parse(&format!("var result = {source};"));
        assert!(syntax.is_empty(), "{syntax:?}");
        let mut interpreter = Interpreter::default();
        let diagnostics = interpreter.execute_program(&program);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        interpreter.variable("result").cloned().unwrap_or_default()
    }

    fn eval_err(source: &str) -> String {
        let (program, _) = parse(source);
        let mut interpreter = Interpreter::default();
        let diagnostics = interpreter.execute_program(&program);
        assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
        diagnostics[0].message.clone()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3"), Value::Number(9.0));
        assert_eq!(eval("7 / 2"), Value::Number(3.0));
        assert_eq!(eval("(0 - 7) / 2"), Value::Number(-4.0));
        assert_eq!(eval("7 % 3"), Value::Number(1.0));
        assert_eq!(eval("-7 % 3"), Value::Number(-1.0));
    }

    #[test]
    fn test_string_rules() {
        assert_eq!(eval("\"n=\" + 4"), Value::from("n=4"));
        assert_eq!(eval("1 + \"2\""), Value::from("12"));
        assert_eq!(eval("\"apple\" < \"banana\""), Value::Number(1.0));
        assert_eq!(eval("\"abc\" == \"abc\""), Value::Number(1.0));
        assert_eq!(eval("\"10\" * 2"), Value::Number(20.0));
    }

    #[test]
    fn test_aggregates_coerce_to_numbers() {
        assert_eq!(eval("[4, 5] + 1"), Value::Number(5.0));
        assert_eq!(eval("{a: 2, b: 9} * 3"), Value::Number(6.0));
        assert_eq!(eval("[] == 0"), Value::Number(1.0));
    }

    #[test]
    fn test_index_and_property() {
        assert_eq!(eval("[10, 20, 30][1]"), Value::Number(20.0));
        assert_eq!(eval("{pos: {x: 3}}.pos.x"), Value::Number(3.0));
        assert!(eval_err("var a = [1, 2, 3]; var b = a[5];").contains("out of bounds"));
        assert!(eval_err("var b = [1][math.sqrt(2)];").contains("out of bounds"));
        assert!(eval_err("var b = 5[0];").contains("non-array"));
        assert!(eval_err("var b = {a: 1}.z;").contains("'z'"));
        assert!(eval_err("var b = 3 .z;").contains("non-object"));
    }

    #[test]
    fn test_unknown_function_and_arity() {
        assert_eq!(eval_err("nothing();"), "Unknown function: nothing");
        assert_eq!(
            eval_err("function f(a, b) { return a; } f(1);"),
            "Function f expects 2 arguments, got 1"
        );
    }

    #[test]
    fn test_call_stack_is_clean_after_error() {
        let (program, _) = parse("function bad() { return missing; } var x = bad();");
        let mut interpreter = Interpreter::default();
        assert_eq!(interpreter.execute_program(&program).len(), 1);
        assert_eq!(interpreter.call_depth(), 0);
    }

    #[test]
    fn test_recursion_is_bounded() {
        let (program, _) = parse("function down(n) { return down(n + 1); } down(0);");
        let mut interpreter = Interpreter::new(crate::interpreter::InterpreterConfig {
            max_call_depth: 24,
            ..Default::default()
        });
        let diagnostics = interpreter.execute_program(&program);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .message
            .starts_with("Maximum call depth of 24 exceeded calling down"));
        assert_eq!(interpreter.call_depth(), 0);
    }

    #[test]
    fn test_default_depth_limit_is_reported() {
        let (program, _) = parse("function down(n) { return down(n + 1); } down(0); var after = 1;");
        let mut interpreter = Interpreter::default();
        let diagnostics = interpreter.execute_program(&program);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with(&format!(
            "Maximum call depth of {DEFAULT_MAX_CALL_DEPTH} exceeded calling down"
        )));
        assert_eq!(interpreter.variable("after"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_rule_recursion_is_bounded() {
        let (program, _) = parse("rule spin { spin(); }\nspin();\nvar after = 1;");
        let mut interpreter = Interpreter::default();
        let diagnostics = interpreter.execute_program(&program);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("exceeded calling spin"));
        assert_eq!(diagnostics[0].line, 1);
        assert_eq!(interpreter.call_depth(), 0);
        assert_eq!(interpreter.variable("after"), Some(&Value::Number(1.0)));
        assert_eq!(interpreter.events().event_count(Some(EventKind::RuleApplied)), 0);
    }

    #[test]
    fn test_rules_and_functions_share_the_limit() {
        let source = "rule ping { pong(); } function pong() { ping(); return 0; } ping();";
        let (program, _) = parse(source);
        let mut interpreter = Interpreter::new(crate::interpreter::InterpreterConfig {
            max_call_depth: 10,
            ..Default::default()
        });
        let diagnostics = interpreter.execute_program(&program);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with("Maximum call depth of 10 exceeded"));
        assert_eq!(interpreter.call_depth(), 0);
    }

    #[test]
    fn test_function_call_events_carry_evaluated_args() {
        let (program, _) = parse("var calls = 0; function f(a) { return a * 2; } var r = f(2 + 3);");
        let mut interpreter = Interpreter::default();
        interpreter.execute_program(&program);
        let record = interpreter
            .events()
            .last_event(Some(EventKind::FunctionCall))
            .expect("announced");
        assert_eq!(
            record.event,
            EngineEvent::FunctionCall {
                name: "f".into(),
                args: vec![Value::Number(5.0)],
                step: 0
            }
        );
        assert_eq!(interpreter.variable("r"), Some(&Value::Number(10.0)));
    }

    #[test]
    fn test_rules_run_in_caller_scope() {
        let (program, _) = parse("var hits = 0; rule bump { hits = hits + 1; } bump(); bump();");
        let mut interpreter = Interpreter::default();
        assert!(interpreter.execute_program(&program).is_empty());
        assert_eq!(interpreter.variable("hits"), Some(&Value::Number(2.0)));
        assert_eq!(
            interpreter.events().event_count(Some(EventKind::RuleApplied)),
            2
        );
    }
}
