use std::cmp::Ordering;

use crate::{context::Bindings, value::Value};

use super::{
    ExpressionError, truthy,
    ast::{BinaryOp, Expr},
};

pub(crate) fn evaluate(expr: &Expr, bindings: &Bindings) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => variable(name, bindings),
        Expr::Property(target, name) => {
            let target = evaluate(target, bindings)?;
            property(&target, name)
        }
        Expr::Index(target, key) => {
            let target = evaluate(target, bindings)?;
            let key = evaluate(key, bindings)?;
            index(&target, &key)
        }
        Expr::Method(target, name) => {
            let target = evaluate(target, bindings)?;
            method(target, name)
        }
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&evaluate(inner, bindings)?))),
        Expr::Negate(inner) => match evaluate(inner, bindings)? {
            Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(mismatch("-", &Value::Null, &other)),
        },
        Expr::Binary(lhs, BinaryOp::And, rhs) => {
            if !truthy(&evaluate(lhs, bindings)?) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(&evaluate(rhs, bindings)?)))
        }
        Expr::Binary(lhs, BinaryOp::Or, rhs) => {
            if truthy(&evaluate(lhs, bindings)?) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truthy(&evaluate(rhs, bindings)?)))
        }
        Expr::Binary(lhs, op, rhs) => {
            let lhs = evaluate(lhs, bindings)?;
            let rhs = evaluate(rhs, bindings)?;
            binary(*op, &lhs, &rhs)
        }
    }
}

// explicit bindings first, then a property of the argument itself
fn variable(name: &str, bindings: &Bindings) -> Result<Value, ExpressionError> {
    if let Some(value) = bindings.explicit(name) {
        return Ok(value.clone());
    }
    match bindings.parameter() {
        Value::Record(record) => {
            record
                .get(name)
                .cloned()
                .ok_or_else(|| ExpressionError::UnknownProperty {
                    property: name.to_string(),
                    on: record.type_name().to_string(),
                })
        }
        Value::Map(map) => Ok(map.get(name).cloned().unwrap_or_default()),
        // a lone scalar answers to any name
        other if other.is_simple() => Ok(other.clone()),
        _ => Ok(Value::Null),
    }
}

fn property(target: &Value, name: &str) -> Result<Value, ExpressionError> {
    match target {
        Value::Null => Err(ExpressionError::NullSource(name.to_string())),
        Value::Map(map) => Ok(map.get(name).cloned().unwrap_or_default()),
        Value::Record(record) => {
            record
                .get(name)
                .cloned()
                .ok_or_else(|| ExpressionError::UnknownProperty {
                    property: name.to_string(),
                    on: record.type_name().to_string(),
                })
        }
        other => Err(ExpressionError::UnknownProperty {
            property: name.to_string(),
            on: other.value_type().to_string(),
        }),
    }
}

fn index(target: &Value, key: &Value) -> Result<Value, ExpressionError> {
    match (target, key) {
        (Value::Null, key) => Err(ExpressionError::NullSource(format!("[{key}]"))),
        (Value::List(items), Value::Int(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or_default()),
        (Value::Map(_) | Value::Record(_), Value::String(name)) => property(target, name),
        (target, key) => Err(mismatch("[]", target, key)),
    }
}

fn method(target: Value, name: &str) -> Result<Value, ExpressionError> {
    let unknown = |target: &Value| ExpressionError::UnknownMethod {
        method: name.to_string(),
        on: target.value_type().to_string(),
    };
    match name {
        "size" | "length" => target
            .len()
            .map(|len| Value::Int(len as i64))
            .ok_or_else(|| unknown(&target)),
        "isEmpty" => target
            .len()
            .map(|len| Value::Bool(len == 0))
            .ok_or_else(|| unknown(&target)),
        "trim" => match &target {
            Value::String(s) => Ok(Value::String(s.trim().into())),
            other => Err(unknown(other)),
        },
        "toString" => Ok(Value::String(target.to_string().into())),
        _ => Err(unknown(&target)),
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExpressionError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(lhs, rhs))),
        BinaryOp::NotEq => Ok(Value::Bool(!equals(lhs, rhs))),
        BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
            let ordering = compare(lhs, rhs).ok_or_else(|| mismatch(op.symbol(), lhs, rhs))?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Lte => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) => {
            Ok(Value::String(smol_str::format_smolstr!("{lhs}{rhs}")))
        }
        _ => arithmetic(op, lhs, rhs),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExpressionError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div | BinaryOp::Rem if b == 0 => {
                    return Err(ExpressionError::DivisionByZero);
                }
                BinaryOp::Div => a.wrapping_div(b),
                BinaryOp::Rem => a.wrapping_rem(b),
                _ => return Err(mismatch(op.symbol(), lhs, rhs)),
            };
            Ok(Value::Int(result))
        }
        _ => {
            let (Some(a), Some(b)) = (as_float(lhs), as_float(rhs)) else {
                return Err(mismatch(op.symbol(), lhs, rhs));
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => return Err(mismatch(op.symbol(), lhs, rhs)),
            };
            Ok(Value::Float(result))
        }
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        _ => lhs == rhs,
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => as_float(lhs)?.partial_cmp(&as_float(rhs)?),
    }
}

fn mismatch(operator: &'static str, lhs: &Value, rhs: &Value) -> ExpressionError {
    ExpressionError::TypeMismatch {
        operator,
        lhs: lhs.value_type().to_string(),
        rhs: rhs.value_type().to_string(),
    }
}
