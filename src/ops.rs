//! Binary and unary operator semantics over nullable [Value]s.
//!
//! These functions know nothing about positions; the evaluator attaches the
//! position of the offending expression to any [EvalErrorKind] they return.

use std::cmp::Ordering;

use crate::error::EvalErrorKind;
use crate::token::Kind;
use crate::value::{Value, describe};

pub fn is_comparison(op: Kind) -> bool {
    matches!(
        op,
        Kind::Equal
            | Kind::NotEqual
            | Kind::LessThan
            | Kind::LessThanOrEqualTo
            | Kind::GreaterThan
            | Kind::GreaterThanOrEqualTo
    )
}

pub fn is_arithmetic(op: Kind) -> bool {
    matches!(op, Kind::Plus | Kind::Minus | Kind::Mul | Kind::Div)
}

/// Compares two values with a comparison operator.
///
/// A null on either side makes every comparison false. Strings compared with
/// a number or a timestamp are parsed as the other side's type first.
///
/// # Errors
/// Returns [EvalErrorKind::InvalidComparison] for pairs with no ordering
/// (e.g. a boolean against an integer), or a cast error when a string cannot
/// be parsed as the other side's type.
pub fn compare(op: Kind, lhs: Option<&Value>, rhs: Option<&Value>) -> Result<bool, EvalErrorKind> {
    let (Some(l), Some(r)) = (lhs, rhs) else {
        return Ok(false);
    };

    let ordering = match (l, r) {
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Integer(_) | Value::Number(_), Value::Integer(_) | Value::Number(_)) => {
            l.to_number()?.partial_cmp(&r.to_number()?)
        }
        (Value::String(_), Value::Integer(b)) => Some(l.to_integer()?.cmp(b)),
        (Value::Integer(a), Value::String(_)) => Some(a.cmp(&r.to_integer()?)),
        (Value::String(_), Value::Number(b)) => l.to_number()?.partial_cmp(b),
        (Value::Number(a), Value::String(_)) => a.partial_cmp(&r.to_number()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::String(_), Value::Timestamp(b)) => Some(l.to_timestamp()?.cmp(b)),
        (Value::Timestamp(a), Value::String(_)) => Some(a.cmp(&r.to_timestamp()?)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        _ => {
            return Err(EvalErrorKind::InvalidComparison {
                lhs: l.to_string(),
                op,
                rhs: r.to_string(),
            });
        }
    };

    matches_ordering(op, ordering).ok_or_else(|| {
        EvalErrorKind::Internal(format!("{op} is not a comparison operator"))
    })
}

/// `None` ordering means unordered (a NaN operand): only `!=` holds.
fn matches_ordering(op: Kind, ordering: Option<Ordering>) -> Option<bool> {
    let result = match op {
        Kind::Equal => ordering == Some(Ordering::Equal),
        Kind::NotEqual => ordering != Some(Ordering::Equal),
        Kind::LessThan => ordering == Some(Ordering::Less),
        Kind::LessThanOrEqualTo => {
            matches!(ordering, Some(Ordering::Less | Ordering::Equal))
        }
        Kind::GreaterThan => ordering == Some(Ordering::Greater),
        Kind::GreaterThanOrEqualTo => {
            matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
        }
        _ => return None,
    };
    Some(result)
}

/// Applies `+ - * /` to two values.
///
/// Two integers stay integral with checked arithmetic; a floating operand
/// promotes both sides. A string operand is parsed as the other side's
/// numeric type. Null on either side yields null.
///
/// # Errors
/// [EvalErrorKind::DivideByZero] for a zero divisor, integral or not, and
/// [EvalErrorKind::IntegerOverflow] when an integer result does not fit.
pub fn arithmetic(
    op: Kind,
    lhs: Option<&Value>,
    rhs: Option<&Value>,
) -> Result<Option<Value>, EvalErrorKind> {
    let (Some(l), Some(r)) = (lhs, rhs) else {
        return Ok(None);
    };

    let value = match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => Value::Integer(integer_op(op, *a, *b)?),
        (Value::String(_), Value::Integer(b)) => Value::Integer(integer_op(op, l.to_integer()?, *b)?),
        (Value::Integer(a), Value::String(_)) => Value::Integer(integer_op(op, *a, r.to_integer()?)?),
        (Value::Integer(_) | Value::Number(_) | Value::String(_), Value::Number(_))
        | (Value::Number(_), Value::Integer(_) | Value::String(_)) => {
            Value::Number(float_op(op, l.to_number()?, r.to_number()?)?)
        }
        _ => {
            return Err(EvalErrorKind::InvalidArithmetic {
                lhs: l.to_string(),
                op,
                rhs: r.to_string(),
            });
        }
    };
    Ok(Some(value))
}

fn integer_op(op: Kind, a: i64, b: i64) -> Result<i64, EvalErrorKind> {
    let result = match op {
        Kind::Plus => a.checked_add(b),
        Kind::Minus => a.checked_sub(b),
        Kind::Mul => a.checked_mul(b),
        Kind::Div => {
            if b == 0 {
                return Err(EvalErrorKind::DivideByZero);
            }
            a.checked_div(b)
        }
        _ => return Err(not_arithmetic(op)),
    };
    result.ok_or(EvalErrorKind::IntegerOverflow)
}

fn float_op(op: Kind, a: f64, b: f64) -> Result<f64, EvalErrorKind> {
    match op {
        Kind::Plus => Ok(a + b),
        Kind::Minus => Ok(a - b),
        Kind::Mul => Ok(a * b),
        Kind::Div if b == 0.0 => Err(EvalErrorKind::DivideByZero),
        Kind::Div => Ok(a / b),
        _ => Err(not_arithmetic(op)),
    }
}

fn not_arithmetic(op: Kind) -> EvalErrorKind {
    EvalErrorKind::Internal(format!("{op} is not an arithmetic operator"))
}

/// String concatenation `||`. Null on either side yields null.
pub fn concat(lhs: Option<&Value>, rhs: Option<&Value>) -> Result<Option<Value>, EvalErrorKind> {
    let (Some(l), Some(r)) = (lhs, rhs) else {
        return Ok(None);
    };
    let text = format!("{}{}", l.to_text()?, r.to_text()?);
    Ok(Some(Value::String(text.into())))
}

/// `AND` / `OR`. Both operands have already been evaluated; neither may be
/// null.
pub fn logical(op: Kind, lhs: Option<&Value>, rhs: Option<&Value>) -> Result<bool, EvalErrorKind> {
    let (Some(l), Some(r)) = (lhs, rhs) else {
        return Err(EvalErrorKind::NullOperand(op));
    };
    let (l, r) = (l.to_boolean()?, r.to_boolean()?);
    match op {
        Kind::And => Ok(l && r),
        Kind::Or => Ok(l || r),
        _ => Err(EvalErrorKind::Internal(format!(
            "{op} is not a logical operator"
        ))),
    }
}

/// Unary `+` / `-` over numbers. Null yields null.
pub fn unary(op: Kind, operand: Option<Value>) -> Result<Option<Value>, EvalErrorKind> {
    let Some(value) = operand else {
        return Ok(None);
    };
    let result = match (op, &value) {
        (Kind::Plus, Value::Integer(_) | Value::Number(_)) => value,
        (Kind::Minus, Value::Integer(i)) => {
            Value::Integer(i.checked_neg().ok_or(EvalErrorKind::IntegerOverflow)?)
        }
        (Kind::Minus, Value::Number(n)) => Value::Number(-n),
        _ => {
            return Err(EvalErrorKind::InvalidUnary {
                op,
                value: describe(Some(&value)),
            });
        }
    };
    Ok(Some(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CastError;
    use crate::value::parse_timestamp;

    fn int(i: i64) -> Value {
        Value::Integer(i)
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn text(s: &str) -> Value {
        Value::String(s.into())
    }

    #[test]
    fn test_compare_integers() {
        assert!(compare(Kind::LessThan, Some(&int(1)), Some(&int(2))).unwrap());
        assert!(compare(Kind::GreaterThanOrEqualTo, Some(&int(2)), Some(&int(2))).unwrap());
        assert!(!compare(Kind::NotEqual, Some(&int(2)), Some(&int(2))).unwrap());
    }

    #[test]
    fn test_compare_mixed_numeric() {
        assert!(compare(Kind::Equal, Some(&int(3)), Some(&num(3.0))).unwrap());
        assert!(compare(Kind::LessThan, Some(&num(2.5)), Some(&int(3))).unwrap());
        assert!(compare(Kind::Equal, Some(&text("10")), Some(&int(10))).unwrap());
        assert!(compare(Kind::GreaterThan, Some(&int(11)), Some(&text("10"))).unwrap());
        assert!(compare(Kind::LessThan, Some(&text("1.5")), Some(&num(2.0))).unwrap());
    }

    #[test]
    fn test_compare_string_parsed_as_left_operand() {
        let err = compare(Kind::Equal, Some(&text("abc")), Some(&int(1))).unwrap_err();
        assert_eq!(
            err,
            EvalErrorKind::Cast(CastError::Parse {
                text: "abc".into(),
                to: crate::DataType::Integer
            })
        );
    }

    #[test]
    fn test_compare_strings_and_timestamps() {
        assert!(compare(Kind::LessThan, Some(&text("apple")), Some(&text("banana"))).unwrap());
        let ts = Value::Timestamp(parse_timestamp("2020-01-01").unwrap());
        assert!(compare(Kind::Equal, Some(&text("2020-01-01 00:00:00")), Some(&ts)).unwrap());
        assert!(compare(Kind::GreaterThan, Some(&ts), Some(&text("2019-12-31"))).unwrap());
    }

    #[test]
    fn test_compare_null_is_false() {
        for op in [Kind::Equal, Kind::NotEqual, Kind::LessThan] {
            assert!(!compare(op, None, Some(&int(1))).unwrap());
            assert!(!compare(op, Some(&int(1)), None).unwrap());
            assert!(!compare(op, None, None).unwrap());
        }
    }

    #[test]
    fn test_compare_incompatible_types() {
        let err = compare(Kind::Equal, Some(&Value::Boolean(true)), Some(&int(1))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid comparison: true = 1"
        );
    }

    #[test]
    fn test_compare_nan_is_unordered() {
        let nan = num(f64::NAN);
        assert!(!compare(Kind::Equal, Some(&nan), Some(&nan)).unwrap());
        assert!(compare(Kind::NotEqual, Some(&nan), Some(&nan)).unwrap());
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(arithmetic(Kind::Plus, Some(&int(2)), Some(&int(3))), Ok(Some(int(5))));
        assert_eq!(arithmetic(Kind::Div, Some(&int(7)), Some(&int(2))), Ok(Some(int(3))));
        assert_eq!(
            arithmetic(Kind::Mul, Some(&int(i64::MAX)), Some(&int(2))),
            Err(EvalErrorKind::IntegerOverflow)
        );
        assert_eq!(
            arithmetic(Kind::Div, Some(&int(1)), Some(&int(0))),
            Err(EvalErrorKind::DivideByZero)
        );
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(arithmetic(Kind::Plus, Some(&int(1)), Some(&num(0.5))), Ok(Some(num(1.5))));
        assert_eq!(arithmetic(Kind::Minus, Some(&num(1.0)), Some(&text("0.25"))), Ok(Some(num(0.75))));
        assert_eq!(
            arithmetic(Kind::Div, Some(&num(1.0)), Some(&num(0.0))),
            Err(EvalErrorKind::DivideByZero)
        );
    }

    #[test]
    fn test_string_operand_takes_other_side_type() {
        assert_eq!(arithmetic(Kind::Plus, Some(&text("4")), Some(&int(1))), Ok(Some(int(5))));
        assert!(arithmetic(Kind::Plus, Some(&text("x")), Some(&int(1))).is_err());
        assert!(arithmetic(Kind::Plus, Some(&text("1")), Some(&text("2"))).is_err());
    }

    #[test]
    fn test_arithmetic_null_propagates() {
        assert_eq!(arithmetic(Kind::Plus, None, Some(&int(1))), Ok(None));
        assert_eq!(arithmetic(Kind::Div, Some(&int(1)), None), Ok(None));
    }

    #[test]
    fn test_concat() {
        assert_eq!(concat(Some(&text("a")), Some(&int(1))), Ok(Some(text("a1"))));
        assert_eq!(concat(Some(&num(1.5)), Some(&text("x"))), Ok(Some(text("1.5x"))));
        assert_eq!(concat(None, Some(&text("x"))), Ok(None));
        assert!(concat(Some(&Value::Boolean(true)), Some(&text("x"))).is_err());
    }

    #[test]
    fn test_logical_truth_table() {
        let t = Value::Boolean(true);
        let f = Value::Boolean(false);
        assert_eq!(logical(Kind::Or, Some(&t), Some(&f)), Ok(true));
        assert_eq!(logical(Kind::Or, Some(&f), Some(&f)), Ok(false));
        assert_eq!(logical(Kind::And, Some(&t), Some(&f)), Ok(false));
        assert_eq!(logical(Kind::And, Some(&t), Some(&t)), Ok(true));
        assert_eq!(
            logical(Kind::And, None, Some(&t)),
            Err(EvalErrorKind::NullOperand(Kind::And))
        );
        assert!(logical(Kind::Or, Some(&int(1)), Some(&t)).is_err());
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(Kind::Minus, Some(int(3))), Ok(Some(int(-3))));
        assert_eq!(unary(Kind::Plus, Some(num(1.5))), Ok(Some(num(1.5))));
        assert_eq!(unary(Kind::Minus, None), Ok(None));
        assert_eq!(
            unary(Kind::Minus, Some(int(i64::MIN))),
            Err(EvalErrorKind::IntegerOverflow)
        );
        assert!(unary(Kind::Minus, Some(text("1"))).is_err());
    }
}
