//! Standard library: `math.*`, `string.*`, `array.*` and `io.*`
//!
//! Each namespace is a free function that returns `None` for names it does
//! not define, so the caller can fall through to user functions. Arguments
//! arrive already evaluated. Array functions never mutate their input; they
//! return a new array.

use crate::interpreter::builtins::expect_args;
use crate::interpreter::errors::RuntimeError;
use crate::memory::Value;
use crate::parser::ast::SourceLocation;
use tracing::{error, info, warn};

type StdlibResult = Option<Result<Value, RuntimeError>>;

/// Deterministic generator behind `math.random`
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        SplitMix64 { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

pub(crate) fn math(
    function: &str,
    name: &str,
    args: &[Value],
    rng: &mut SplitMix64,
    location: SourceLocation,
) -> StdlibResult {
    let unary: fn(f64) -> f64 = match function {
        "abs" => f64::abs,
        "floor" => f64::floor,
        "ceil" => f64::ceil,
        // Halves round towards positive infinity
        "round" => |n: f64| (n + 0.5).floor(),
        "sqrt" => f64::sqrt,
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "asin" => f64::asin,
        "acos" => f64::acos,
        "atan" => f64::atan,
        "log" => f64::ln,
        "exp" => f64::exp,
        "pow" => {
            return Some(expect_args(name, args, 2, location).map(|_| {
                Value::Number(args[0].to_number().powf(args[1].to_number()))
            }))
        }
        "min" => return Some(Ok(Value::Number(fold_extreme(args, f64::INFINITY, f64::min)))),
        "max" => {
            return Some(Ok(Value::Number(fold_extreme(args, f64::NEG_INFINITY, f64::max))))
        }
        "random" => {
            return Some(expect_args(name, args, 0, location).map(|_| Value::Number(rng.next_f64())))
        }
        _ => return None,
    };
    Some(expect_args(name, args, 1, location).map(|_| Value::Number(unary(args[0].to_number()))))
}

/// `min`/`max` over every argument; any NaN makes the result NaN.
fn fold_extreme(args: &[Value], empty: f64, pick: fn(f64, f64) -> f64) -> f64 {
    args.iter().map(Value::to_number).try_fold(empty, |acc, n| {
        if n.is_nan() {
            None
        } else {
            Some(pick(acc, n))
        }
    })
    .unwrap_or(f64::NAN)
}

pub(crate) fn string(
    function: &str,
    name: &str,
    args: &[Value],
    location: SourceLocation,
) -> StdlibResult {
    let result = match function {
        "length" => expect_args(name, args, 1, location)
            .map(|_| Value::Number(args[0].to_string().chars().count() as f64)),
        "toUpperCase" => {
            expect_args(name, args, 1, location).map(|_| Value::Str(args[0].to_string().to_uppercase()))
        }
        "toLowerCase" => {
            expect_args(name, args, 1, location).map(|_| Value::Str(args[0].to_string().to_lowercase()))
        }
        "trim" => {
            expect_args(name, args, 1, location).map(|_| Value::Str(args[0].to_string().trim().to_string()))
        }
        "substring" => expect_range(name, args, location).map(|_| {
            let chars: Vec<char> = args[0].to_string().chars().collect();
            let clamp = |v: &Value| clamp_index(v.to_number(), chars.len());
            let start = clamp(&args[1]);
            let end = args.get(2).map_or(chars.len(), clamp);
            let (from, to) = if start <= end { (start, end) } else { (end, start) };
            Value::Str(chars[from..to].iter().collect())
        }),
        _ => return None,
    };
    Some(result)
}

pub(crate) fn array(
    function: &str,
    name: &str,
    args: &[Value],
    location: SourceLocation,
) -> StdlibResult {
    let arity = match function {
        "length" | "pop" => expect_args(name, args, 1, location),
        "push" => expect_args(name, args, 2, location),
        "slice" => expect_range(name, args, location),
        _ => return None,
    };
    let result = arity.and_then(|_| {
        let Value::Array(items) = &args[0] else {
            return Err(RuntimeError::type_error(
                format!("{name} expects an array, got {}", args[0].type_name()),
                location,
            ));
        };
        Ok(match function {
            "length" => Value::Number(items.len() as f64),
            "push" => {
                let mut items = items.clone();
                items.push(args[1].clone());
                Value::Array(items)
            }
            "pop" => Value::Array(items[..items.len().saturating_sub(1)].to_vec()),
            _ => {
                let start = relative_index(args[1].to_number(), items.len());
                let end = args
                    .get(2)
                    .map_or(items.len(), |v| relative_index(v.to_number(), items.len()));
                Value::Array(items.get(start..end.max(start)).unwrap_or_default().to_vec())
            }
        })
    });
    Some(result)
}

pub(crate) fn io(
    function: &str,
    _name: &str,
    args: &[Value],
    _location: SourceLocation,
) -> StdlibResult {
    let message = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    match function {
        "log" => info!(target: "mpl::io", "{message}"),
        "warn" => warn!(target: "mpl::io", "{message}"),
        "error" => error!(target: "mpl::io", "{message}"),
        _ => return None,
    }
    Some(Ok(Value::default()))
}

/// `(value, start)` or `(value, start, end)`
fn expect_range(name: &str, args: &[Value], location: SourceLocation) -> Result<(), RuntimeError> {
    if (2..=3).contains(&args.len()) {
        Ok(())
    } else {
        Err(RuntimeError::arity(name, "2 or 3", args.len(), location))
    }
}

/// Clamp to `[0, len]`; NaN counts as 0.
fn clamp_index(n: f64, len: usize) -> usize {
    if n.is_nan() || n <= 0.0 {
        0
    } else {
        (n.floor() as usize).min(len)
    }
}

/// Like [`clamp_index`] but negative values count back from `len`.
fn relative_index(n: f64, len: usize) -> usize {
    if n < 0.0 {
        let back = (-n).ceil() as usize;
        len.saturating_sub(back)
    } else {
        clamp_index(n, len)
    }
}
