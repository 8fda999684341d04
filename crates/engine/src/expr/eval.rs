// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tree-walk evaluation over run variables.
//!
//! Semantics follow the source language the flows were authored against:
//! `/` is true division (always a float), `//` floors to an integer, `and`
//! / `or` return an operand rather than a bare boolean, and comparison
//! chains are not supported (the grammar allows a single comparison).

use super::parser::{BinOp, Expr};
use armada_core::{value_truthy, Value};
use serde_json::Number;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("undefined variable '{0}'")]
    Undefined(String),
    #[error("unsupported operand types for {op}: {left} and {right}")]
    BadOperands { op: &'static str, left: &'static str, right: &'static str },
    #[error("division by zero")]
    DivisionByZero,
    #[error("numeric overflow")]
    Overflow,
}

/// Evaluate a parsed expression against the variable map.
pub fn evaluate(expr: &Expr, vars: &HashMap<String, Value>) -> Result<Value, EvalError> {
    match expr {
        Expr::Int(n) => Ok(Value::from(*n)),
        Expr::Float(f) => Ok(float_value(*f)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Ident(name) => {
            vars.get(name).cloned().ok_or_else(|| EvalError::Undefined(name.clone()))
        }
        Expr::Not(inner) => Ok(Value::Bool(!value_truthy(&evaluate(inner, vars)?))),
        Expr::Unary { negate, operand } => {
            let v = evaluate(operand, vars)?;
            match (negate, Num::of(&v)) {
                (false, Some(_)) => Ok(v),
                (true, Some(Num::Int(n))) => {
                    n.checked_neg().map(Value::from).ok_or(EvalError::Overflow)
                }
                (true, Some(Num::Float(f))) => Ok(float_value(-f)),
                (_, None) => Err(EvalError::BadOperands {
                    op: "unary",
                    left: armada_core::value_kind(&v),
                    right: "-",
                }),
            }
        }
        Expr::Binary { op, left, right } => {
            // Short-circuit forms first; they return an operand.
            match op {
                BinOp::And => {
                    let l = evaluate(left, vars)?;
                    if !value_truthy(&l) {
                        return Ok(l);
                    }
                    return evaluate(right, vars);
                }
                BinOp::Or => {
                    let l = evaluate(left, vars)?;
                    if value_truthy(&l) {
                        return Ok(l);
                    }
                    return evaluate(right, vars);
                }
                _ => {}
            }
            let l = evaluate(left, vars)?;
            let r = evaluate(right, vars)?;
            apply(*op, &l, &r)
        }
    }
}

/// Numeric view over a value.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(v: &Value) -> Option<Num> {
        match v {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Num::Int(i))
                } else {
                    n.as_f64().map(Num::Float)
                }
            }
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn bad(op: &'static str, l: &Value, r: &Value) -> EvalError {
    EvalError::BadOperands {
        op,
        left: armada_core::value_kind(l),
        right: armada_core::value_kind(r),
    }
}

fn apply(op: BinOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add => {
            // String concatenation mirrors the source flows' `+`.
            if let (Value::String(a), Value::String(b)) = (l, r) {
                return Ok(Value::String(format!("{a}{b}")));
            }
            arith("+", l, r, |a, b| a.checked_add(b), |a, b| a + b)
        }
        BinOp::Sub => arith("-", l, r, |a, b| a.checked_sub(b), |a, b| a - b),
        BinOp::Mul => arith("*", l, r, |a, b| a.checked_mul(b), |a, b| a * b),
        BinOp::Div => {
            let (a, b) = nums("/", l, r)?;
            let denom = b.as_f64();
            if denom == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(float_value(a.as_f64() / denom))
        }
        BinOp::FloorDiv => {
            let (a, b) = nums("//", l, r)?;
            match (a, b) {
                (Num::Int(x), Num::Int(y)) => {
                    if y == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    Ok(Value::from(x.div_euclid(y)))
                }
                _ => {
                    let denom = b.as_f64();
                    if denom == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    Ok(float_value((a.as_f64() / denom).floor()))
                }
            }
        }
        BinOp::Rem => {
            let (a, b) = nums("%", l, r)?;
            match (a, b) {
                (Num::Int(x), Num::Int(y)) => {
                    if y == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    Ok(Value::from(x.rem_euclid(y)))
                }
                _ => {
                    let denom = b.as_f64();
                    if denom == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    Ok(float_value(a.as_f64().rem_euclid(denom)))
                }
            }
        }
        BinOp::Pow => {
            let (a, b) = nums("**", l, r)?;
            match (a, b) {
                (Num::Int(x), Num::Int(y)) if (0..=u32::MAX as i64).contains(&y) => x
                    .checked_pow(y as u32)
                    .map(Value::from)
                    .ok_or(EvalError::Overflow),
                _ => Ok(float_value(a.as_f64().powf(b.as_f64()))),
            }
        }
        BinOp::Eq => Ok(Value::Bool(loose_eq(l, r))),
        BinOp::Ne => Ok(Value::Bool(!loose_eq(l, r))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = compare(l, r).ok_or_else(|| bad(op_name(op), l, r))?;
            let result = match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        // Short-circuit ops handled by the caller.
        BinOp::And | BinOp::Or => Ok(Value::Null),
    }
}

fn op_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        _ => "?",
    }
}

fn arith(
    op: &'static str,
    l: &Value,
    r: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    let (a, b) = nums(op, l, r)?;
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => int_op(x, y).map(Value::from).ok_or(EvalError::Overflow),
        _ => Ok(float_value(float_op(a.as_f64(), b.as_f64()))),
    }
}

fn nums(op: &'static str, l: &Value, r: &Value) -> Result<(Num, Num), EvalError> {
    match (Num::of(l), Num::of(r)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(bad(op, l, r)),
    }
}

/// Equality across integer/float representations of the same number.
fn loose_eq(l: &Value, r: &Value) -> bool {
    if let (Some(a), Some(b)) = (Num::of(l), Num::of(r)) {
        if !matches!((l, r), (Value::Bool(_), _) | (_, Value::Bool(_))) {
            return a.as_f64() == b.as_f64();
        }
    }
    l == r
}

fn compare(l: &Value, r: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(a), Some(b)) = (Num::of(l), Num::of(r)) {
        return a.as_f64().partial_cmp(&b.as_f64());
    }
    if let (Value::String(a), Value::String(b)) = (l, r) {
        return Some(a.cmp(b));
    }
    None
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod tests;
