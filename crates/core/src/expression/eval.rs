//! Expression evaluation. `Ok(None)` is the undefined result.

use std::cmp::Ordering;

use serde_json::Value;

use super::parse::{BinaryOp, Function, Node};
use super::Scope;
use crate::descriptor::ContextScope;
use crate::error::ResolveError;
use crate::path::PropertyPath;
use crate::types::{number_value, to_number};

type EvalResult = Result<Option<Value>, ResolveError>;

pub(crate) fn evaluate(node: &Node, input: &Value, scope: &dyn Scope) -> EvalResult {
    match node {
        Node::Literal(value) => Ok(Some(value.clone())),
        Node::Root => Ok(Some(input.clone())),
        Node::Variable(_) => Ok(None),
        Node::Field { target, name } => {
            Ok(evaluate(target, input, scope)?.and_then(|value| field(value, name)))
        }
        Node::Index { target, index } => {
            Ok(evaluate(target, input, scope)?.and_then(|value| element(value, *index)))
        }
        Node::Negate(operand) => match evaluate(operand, input, scope)? {
            None => Ok(None),
            Some(value) => {
                let n = expect_number(&value, "The operand of the unary \"-\" operator")?;
                finite(-n).map(Some)
            }
        },
        Node::Binary { op, lhs, rhs } => binary(*op, lhs, rhs, input, scope),
        Node::Condition {
            test,
            then,
            otherwise,
        } => {
            if truthy(evaluate(test, input, scope)?.as_ref()) {
                evaluate(then, input, scope)
            } else {
                match otherwise {
                    Some(otherwise) => evaluate(otherwise, input, scope),
                    None => Ok(None),
                }
            }
        }
        Node::Call { function, arg } => {
            let arg = evaluate(arg, input, scope)?;
            call(*function, arg, scope)
        }
    }
}

/// Field access. Arrays are mapped over, collecting the field from each
/// element.
fn field(value: Value, name: &str) -> Option<Value> {
    match value {
        Value::Object(mut map) => map.remove(name),
        Value::Array(items) => {
            let mut found: Vec<Value> = items
                .into_iter()
                .filter_map(|item| field(item, name))
                .collect();
            match found.len() {
                0 => None,
                1 => found.pop(),
                _ => Some(Value::Array(found)),
            }
        }
        _ => None,
    }
}

/// Array indexing; negative indices count from the end.
fn element(value: Value, index: i64) -> Option<Value> {
    match value {
        Value::Array(mut items) => {
            let len = items.len() as i64;
            let i = if index < 0 { len + index } else { index };
            if (0..len).contains(&i) {
                Some(items.swap_remove(i as usize))
            } else {
                None
            }
        }
        // A single value behaves like a one-element array.
        other if index == 0 || index == -1 => Some(other),
        _ => None,
    }
}

fn binary(op: BinaryOp, lhs: &Node, rhs: &Node, input: &Value, scope: &dyn Scope) -> EvalResult {
    match op {
        BinaryOp::And => {
            if !truthy(evaluate(lhs, input, scope)?.as_ref()) {
                return Ok(Some(Value::Bool(false)));
            }
            Ok(Some(Value::Bool(truthy(evaluate(rhs, input, scope)?.as_ref()))))
        }
        BinaryOp::Or => {
            if truthy(evaluate(lhs, input, scope)?.as_ref()) {
                return Ok(Some(Value::Bool(true)));
            }
            Ok(Some(Value::Bool(truthy(evaluate(rhs, input, scope)?.as_ref()))))
        }
        _ => {
            let left = evaluate(lhs, input, scope)?;
            let right = evaluate(rhs, input, scope)?;
            match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                    arithmetic(op, left, right)
                }
                BinaryOp::Concat => {
                    let mut text = left.as_ref().map(stringify).unwrap_or_default();
                    text.push_str(&right.as_ref().map(stringify).unwrap_or_default());
                    Ok(Some(Value::String(text)))
                }
                BinaryOp::Eq | BinaryOp::NotEq => {
                    let (Some(left), Some(right)) = (left, right) else {
                        return Ok(Some(Value::Bool(false)));
                    };
                    let equal = values_equal(&left, &right);
                    Ok(Some(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal })))
                }
                _ => compare(op, left, right),
            }
        }
    }
}

fn arithmetic(op: BinaryOp, left: Option<Value>, right: Option<Value>) -> EvalResult {
    let (Some(left), Some(right)) = (left, right) else {
        return Ok(None);
    };
    let side = |which: &str| format!("The {which} side of the \"{}\" operator", op.symbol());
    let a = expect_number(&left, &side("left"))?;
    let b = expect_number(&right, &side("right"))?;
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
    };
    finite(result).map(Some)
}

fn compare(op: BinaryOp, left: Option<Value>, right: Option<Value>) -> EvalResult {
    let (Some(left), Some(right)) = (left, right) else {
        return Ok(Some(Value::Bool(false)));
    };
    let ordering = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => {
            a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => {
            return Err(ResolveError::Expression(format!(
                "The values {left} and {right} either side of operator \"{}\" must be of the same data type",
                op.symbol()
            )))
        }
    };
    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Some(Value::Bool(result)))
}

fn call(function: Function, arg: Option<Value>, scope: &dyn Scope) -> EvalResult {
    if function == Function::Exists {
        return Ok(Some(Value::Bool(arg.is_some())));
    }
    let Some(arg) = arg else {
        return Ok(None);
    };

    match function {
        Function::FlowContext => context(scope, ContextScope::Flow, &arg),
        Function::GlobalContext => context(scope, ContextScope::Global, &arg),
        Function::Env => match &arg {
            Value::String(name) => Ok(scope.env(name)),
            other => Err(ResolveError::Expression(format!(
                "Argument of $env must be a string, got {other}"
            ))),
        },
        Function::Number => match to_number(&arg) {
            Some(n) => finite(n).map(Some),
            None => Err(ResolveError::Expression(format!(
                "Unable to cast value to a number: {arg}"
            ))),
        },
        Function::String => Ok(Some(Value::String(stringify(&arg)))),
        Function::Boolean => Ok(Some(Value::Bool(truthy(Some(&arg))))),
        Function::Not => Ok(Some(Value::Bool(!truthy(Some(&arg))))),
        Function::Abs => unary_math(&arg, "$abs", f64::abs),
        Function::Round => unary_math(&arg, "$round", f64::round_ties_even),
        Function::Floor => unary_math(&arg, "$floor", f64::floor),
        Function::Ceil => unary_math(&arg, "$ceil", f64::ceil),
        Function::Exists => Ok(Some(Value::Bool(true))),
    }
}

fn context(scope: &dyn Scope, which: ContextScope, key: &Value) -> EvalResult {
    let Value::String(key) = key else {
        return Err(ResolveError::Expression(format!(
            "Context key must be a string, got {key}"
        )));
    };
    let path = PropertyPath::parse(key).map_err(|e| ResolveError::Expression(e.to_string()))?;
    Ok(scope.context(which, &path))
}

fn unary_math(arg: &Value, name: &str, f: fn(f64) -> f64) -> EvalResult {
    let n = expect_number(arg, &format!("Argument of {name}"))?;
    finite(f(n)).map(Some)
}

fn expect_number(value: &Value, what: &str) -> Result<f64, ResolveError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ResolveError::Expression(format!("{what} is out of range"))),
        _ => Err(ResolveError::Expression(format!(
            "{what} must evaluate to a number, got {value}"
        ))),
    }
}

fn finite(n: f64) -> Result<Value, ResolveError> {
    number_value(n).ok_or_else(|| ResolveError::Expression("Number out of range".to_string()))
}

/// Truthiness used by `and`, `or`, `?:` and `$boolean`.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => items.iter().any(|item| truthy(Some(item))),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}
