use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Domain tag of a value. Operators declare their parameters and results in
/// terms of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ty {
    Number,
    Text,
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Number => write!(f, "Number"),
            Ty::Text => write!(f, "Text"),
        }
    }
}

/// A concrete datum observed on one example.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(i64),
    Text(String),
}

impl Value {
    pub fn text<S: Into<String>>(s: S) -> Self {
        Value::Text(s.into())
    }

    pub fn ty(&self) -> Ty {
        match self {
            Value::Number(_) => Ty::Number,
            Value::Text(_) => Ty::Text,
        }
    }

    pub fn checked_add(&self, rhs: &Value) -> Result<Value, DeadEnd> {
        let (lhs, rhs) = (self.expect_number("add")?, rhs.expect_number("add")?);
        lhs.checked_add(rhs)
            .map(Value::Number)
            .ok_or(DeadEnd::Overflow { op: "add" })
    }

    pub fn checked_sub(&self, rhs: &Value) -> Result<Value, DeadEnd> {
        let (lhs, rhs) = (
            self.expect_number("subtract")?,
            rhs.expect_number("subtract")?,
        );
        lhs.checked_sub(rhs)
            .map(Value::Number)
            .ok_or(DeadEnd::Overflow { op: "subtract" })
    }

    pub fn checked_mul(&self, rhs: &Value) -> Result<Value, DeadEnd> {
        let (lhs, rhs) = (
            self.expect_number("multiply")?,
            rhs.expect_number("multiply")?,
        );
        lhs.checked_mul(rhs)
            .map(Value::Number)
            .ok_or(DeadEnd::Overflow { op: "multiply" })
    }

    /// Integer division rounding toward negative infinity.
    pub fn floor_div(&self, rhs: &Value) -> Result<Value, DeadEnd> {
        let (lhs, rhs) = (self.expect_number("divide")?, rhs.expect_number("divide")?);
        if rhs == 0 {
            return Err(DeadEnd::DivisionByZero);
        }
        let quotient = lhs
            .checked_div(rhs)
            .ok_or(DeadEnd::Overflow { op: "divide" })?;
        if lhs % rhs != 0 && ((lhs < 0) != (rhs < 0)) {
            Ok(Value::Number(quotient - 1))
        } else {
            Ok(Value::Number(quotient))
        }
    }

    pub fn concat(&self, rhs: &Value) -> Result<Value, DeadEnd> {
        let (lhs, rhs) = (self.expect_text("concat")?, rhs.expect_text("concat")?);
        let mut joined = String::with_capacity(lhs.len() + rhs.len());
        joined.push_str(lhs);
        joined.push_str(rhs);
        Ok(Value::Text(joined))
    }

    /// The leading `n` characters.
    pub fn left(&self, n: &Value) -> Result<Value, DeadEnd> {
        let s = self.expect_text("left")?;
        let n = slice_len(s, n.expect_number("left")?)?;
        Ok(Value::Text(s.chars().take(n).collect()))
    }

    /// The trailing `n` characters.
    pub fn right(&self, n: &Value) -> Result<Value, DeadEnd> {
        let s = self.expect_text("right")?;
        let n = slice_len(s, n.expect_number("right")?)?;
        let skip = s.chars().count() - n;
        Ok(Value::Text(s.chars().skip(skip).collect()))
    }

    fn expect_number(&self, op: &'static str) -> Result<i64, DeadEnd> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(DeadEnd::type_mismatch(op, Ty::Number, other)),
        }
    }

    fn expect_text(&self, op: &'static str) -> Result<&str, DeadEnd> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(DeadEnd::type_mismatch(op, Ty::Text, other)),
        }
    }
}

fn slice_len(s: &str, n: i64) -> Result<usize, DeadEnd> {
    let available = s.chars().count();
    match usize::try_from(n) {
        Ok(len) if len <= available => Ok(len),
        _ => Err(DeadEnd::SliceOutOfRange { len: n, available }),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

/// Recoverable failure of a single evaluation. The candidate being built is
/// dropped and the search carries on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeadEnd {
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in {op}")]
    Overflow { op: &'static str },
    #[error("cannot take {len} characters from a string of {available}")]
    SliceOutOfRange { len: i64, available: usize },
    #[error("{op} takes {expected} arguments, got {found}")]
    Arity {
        op: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("expected {expected} in {op}, got {found}")]
    TypeMismatch {
        op: &'static str,
        expected: Ty,
        found: Ty,
    },
}

impl DeadEnd {
    fn type_mismatch(op: &'static str, expected: Ty, value: &Value) -> Self {
        DeadEnd::TypeMismatch {
            op,
            expected,
            found: value.ty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: i64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn floor_division_rounds_down() {
        assert_eq!(num(7).floor_div(&num(2)), Ok(num(3)));
        assert_eq!(num(-7).floor_div(&num(2)), Ok(num(-4)));
        assert_eq!(num(7).floor_div(&num(-2)), Ok(num(-4)));
        assert_eq!(num(-7).floor_div(&num(-2)), Ok(num(3)));
        assert_eq!(num(-8).floor_div(&num(2)), Ok(num(-4)));
    }

    #[test]
    fn division_by_zero_is_a_dead_end() {
        assert_eq!(num(4).floor_div(&num(0)), Err(DeadEnd::DivisionByZero));
        assert_eq!(num(0).floor_div(&num(0)), Err(DeadEnd::DivisionByZero));
    }

    #[test]
    fn overflow_is_a_dead_end() {
        assert_eq!(
            num(i64::MAX).checked_add(&num(1)),
            Err(DeadEnd::Overflow { op: "add" })
        );
        assert_eq!(
            num(i64::MIN).floor_div(&num(-1)),
            Err(DeadEnd::Overflow { op: "divide" })
        );
        assert_eq!(
            num(i64::MIN).checked_mul(&num(2)),
            Err(DeadEnd::Overflow { op: "multiply" })
        );
    }

    #[test]
    fn slicing_counts_characters() {
        let s = Value::text("héllo");
        assert_eq!(s.left(&num(2)), Ok(Value::text("hé")));
        assert_eq!(s.right(&num(3)), Ok(Value::text("llo")));
        assert_eq!(s.left(&num(0)), Ok(Value::text("")));
        assert_eq!(s.right(&num(5)), Ok(s.clone()));
    }

    #[test]
    fn slicing_out_of_range_is_a_dead_end() {
        let s = Value::text("abc");
        assert_eq!(
            s.left(&num(4)),
            Err(DeadEnd::SliceOutOfRange {
                len: 4,
                available: 3
            })
        );
        assert_eq!(
            s.right(&num(-1)),
            Err(DeadEnd::SliceOutOfRange {
                len: -1,
                available: 3
            })
        );
    }

    #[test]
    fn mixed_types_do_not_panic() {
        let err = Value::text("a").checked_add(&num(1)).unwrap_err();
        assert_eq!(
            err,
            DeadEnd::TypeMismatch {
                op: "add",
                expected: Ty::Number,
                found: Ty::Text
            }
        );
        assert!(num(1).concat(&Value::text("a")).is_err());
    }

    #[test]
    fn values_deserialize_from_json_scalars() {
        let parsed: Vec<Value> = serde_json::from_str(r#"[3, "ab", -2]"#).unwrap();
        assert_eq!(parsed, vec![num(3), Value::text("ab"), num(-2)]);
        assert!(serde_json::from_str::<Value>("1.5").is_err());
        assert!(serde_json::from_str::<Value>("true").is_err());
    }

    #[test]
    fn display_quotes_text() {
        assert_eq!(num(-3).to_string(), "-3");
        assert_eq!(Value::text(" ").to_string(), "\" \"");
        assert_eq!(Ty::Text.to_string(), "Text");
    }
}
