//! Native operator semantics for the dynamic operator sites.
//!
//! These mirror the host language's primitive operator behavior: integer
//! arithmetic stays integral (with truncating division), mixed
//! integer/double operands promote to double, comparisons work on numbers,
//! equality additionally works on booleans and strings (by content) and
//! falls back to identity for reference values.

use crate::error::RuntimeError;
use crate::types::{classes, Shape};
use crate::value::Value;
use rispl_ast::expr::{BinaryOp, UnaryOp};
use std::cmp::Ordering;

fn is_numeric(shape: Shape) -> bool {
    shape.class == classes::INT || shape.class == classes::DOUBLE
}

fn is_reference(shape: Shape) -> bool {
    !matches!(
        shape.class,
        classes::BOOL | classes::INT | classes::DOUBLE
    )
}

/// Whether the operator is defined for operands of the given shapes. The
/// resolver consults this once per observed shape pair; the resulting rule
/// is guarded on exactly these shapes.
pub fn supports_binary(op: BinaryOp, left: Shape, right: Shape) -> bool {
    match op {
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => {
            is_numeric(left) && is_numeric(right)
        }
        BinaryOp::GreaterThan | BinaryOp::LessThan => is_numeric(left) && is_numeric(right),
        BinaryOp::Equal | BinaryOp::NotEqual => {
            (is_numeric(left) && is_numeric(right))
                || (left.class == classes::BOOL && right.class == classes::BOOL)
                || (left.class == classes::STR && right.class == classes::STR)
                || (is_reference(left) && is_reference(right))
        }
        // `and`/`or` are desugared before reaching the engine.
        BinaryOp::And | BinaryOp::Or => false,
    }
}

/// Apply a binary operator to concrete operand values. Callers have
/// established support via [`supports_binary`]; value-dependent failures
/// (division by zero) still surface here.
pub fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => arith(op, left, right),
        BinaryOp::Subtract => arith(op, left, right),
        BinaryOp::Multiply => arith(op, left, right),
        BinaryOp::Divide => arith(op, left, right),
        BinaryOp::GreaterThan => compare(left, right).map(|ord| Value::Bool(ord == Ordering::Greater)),
        BinaryOp::LessThan => compare(left, right).map(|ord| Value::Bool(ord == Ordering::Less)),
        BinaryOp::Equal => Ok(Value::Bool(equal(left, right))),
        BinaryOp::NotEqual => Ok(Value::Bool(!equal(left, right))),
        BinaryOp::And | BinaryOp::Or => Err(RuntimeError::bind(
            crate::error::BindErrorKind::NoSuchOperator,
            format!("operator '{}' reaches the engine only desugared", op.as_str()),
        )),
    }
}

fn arith(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => match op {
            BinaryOp::Add => Ok(Value::Int(a.wrapping_add(*b))),
            BinaryOp::Subtract => Ok(Value::Int(a.wrapping_sub(*b))),
            BinaryOp::Multiply => Ok(Value::Int(a.wrapping_mul(*b))),
            BinaryOp::Divide => {
                if *b == 0 {
                    Err(RuntimeError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.wrapping_div(*b)))
                }
            }
            _ => unreachable!("arith on non-arithmetic operator"),
        },
        _ => {
            let (a, b) = (as_double(left)?, as_double(right)?);
            Ok(Value::Double(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                BinaryOp::Divide => a / b,
                _ => unreachable!("arith on non-arithmetic operator"),
            }))
        }
    }
}

fn as_double(value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Double(n) => Ok(*n),
        other => Err(RuntimeError::bind(
            crate::error::BindErrorKind::NoSuchOperator,
            format!("expected a number, got {}", other),
        )),
    }
}

fn compare(left: &Value, right: &Value) -> Result<Ordering, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        _ => {
            let (a, b) = (as_double(left)?, as_double(right)?);
            Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
        }
    }
}

/// `=` semantics: numeric comparison with promotion, content equality for
/// strings and booleans, identity for reference values.
fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(_), Value::Double(_))
        | (Value::Double(_), Value::Int(_))
        | (Value::Double(_), Value::Double(_)) => match (as_double(left), as_double(right)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        },
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => left.eq_value(right),
    }
}

/// Whether the unary operator is defined for the operand shape.
pub fn supports_unary(op: UnaryOp, operand: Shape) -> bool {
    match op {
        UnaryOp::Not => operand.class == classes::BOOL,
    }
}

/// Apply a unary operator to a concrete operand value.
pub fn apply_unary(op: UnaryOp, operand: &Value) -> Result<Value, RuntimeError> {
    match (op, operand) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, other) => Err(RuntimeError::bind(
            crate::error::BindErrorKind::NoSuchOperator,
            format!("'not' expects a boolean, got {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(apply_binary(BinaryOp::Add, &Value::Int(2), &Value::Int(3)).unwrap(), Value::Int(5));
        assert_eq!(apply_binary(BinaryOp::Subtract, &Value::Int(5), &Value::Int(2)).unwrap(), Value::Int(3));
        assert_eq!(apply_binary(BinaryOp::Multiply, &Value::Int(5), &Value::Int(2)).unwrap(), Value::Int(10));
        // Integer division truncates.
        assert_eq!(apply_binary(BinaryOp::Divide, &Value::Int(5), &Value::Int(2)).unwrap(), Value::Int(2));
        assert_eq!(apply_binary(BinaryOp::Divide, &Value::Int(-190), &Value::Int(5)).unwrap(), Value::Int(-38));
    }

    #[test]
    fn test_mixed_arithmetic_promotes() {
        assert_eq!(
            apply_binary(BinaryOp::Add, &Value::Int(1), &Value::Double(0.5)).unwrap(),
            Value::Double(1.5)
        );
    }

    #[test]
    fn test_division_by_zero() {
        let err = apply_binary(BinaryOp::Divide, &Value::Int(1), &Value::Int(0)).unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(apply_binary(BinaryOp::GreaterThan, &Value::Int(3), &Value::Int(2)).unwrap(), Value::Bool(true));
        assert_eq!(apply_binary(BinaryOp::LessThan, &Value::Int(3), &Value::Int(2)).unwrap(), Value::Bool(false));
        assert_eq!(
            apply_binary(BinaryOp::GreaterThan, &Value::Double(2.5), &Value::Int(2)).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_equality() {
        assert_eq!(apply_binary(BinaryOp::Equal, &Value::Int(5), &Value::Int(5)).unwrap(), Value::Bool(true));
        // Numeric promotion applies to `=`, unlike `eq`.
        assert_eq!(apply_binary(BinaryOp::Equal, &Value::Int(5), &Value::Double(5.0)).unwrap(), Value::Bool(true));
        assert_eq!(
            apply_binary(BinaryOp::Equal, &Value::str("a"), &Value::str("a")).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(apply_binary(BinaryOp::NotEqual, &Value::Int(5), &Value::Int(2)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_supports_binary() {
        let int = Shape::of_class(classes::INT);
        let string = Shape::of_class(classes::STR);
        assert!(supports_binary(BinaryOp::Add, int, int));
        assert!(!supports_binary(BinaryOp::Add, int, string));
        assert!(supports_binary(BinaryOp::Equal, string, string));
        assert!(!supports_binary(BinaryOp::GreaterThan, string, string));
    }

    #[test]
    fn test_unary_not() {
        assert_eq!(apply_unary(UnaryOp::Not, &Value::Bool(true)).unwrap(), Value::Bool(false));
        assert!(apply_unary(UnaryOp::Not, &Value::Int(1)).is_err());
    }
}
