//! # Scalar Values
//!
//! Constant values that appear in SQL statements (`WHERE id = 42`), bound
//! parameter values, generated keys and encrypted column values all share the
//! `ScalarValue` representation defined here.
//!
//! ## Two Notions of Equality
//!
//! - **Structural** (`PartialEq` / `Eq` / `Hash`): `Int64(1)` and `Float64(1.0)` are
//!   different values. This is what trees are compared with in tests and what the
//!   optimizer relies on for determinism.
//! - **SQL comparison** (`ScalarValue::compare`): numeric values compare across
//!   `Int64` / `Float64`, NULL compares to nothing, and unrelated types have no
//!   ordering. Predicate evaluation and bound merging use this one.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Scalar value for literals, parameters and generated keys.
///
/// Uses `OrderedFloat` for `f64` so that floating-point values can be used in
/// Eq/Hash comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    /// SQL NULL value.
    Null,
    /// Boolean true/false.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point, wrapped in OrderedFloat for Eq/Hash support.
    Float64(OrderedFloat<f64>),
    /// UTF-8 string.
    Utf8(String),
    /// Date as days since Unix epoch (1970-01-01).
    Date(i32),
    /// Timestamp as milliseconds since Unix epoch.
    Timestamp(i64),
}

/// Comparison family of a non-null value.
///
/// Two values of the same family always have an ordering; values of different
/// families never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueFamily {
    Bool,
    Numeric,
    Text,
    Date,
    Timestamp,
}

impl ScalarValue {
    pub fn float(v: f64) -> Self {
        ScalarValue::Float64(OrderedFloat(v))
    }

    pub fn utf8(v: impl Into<String>) -> Self {
        ScalarValue::Utf8(v.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// The comparison family, or `None` for NULL.
    pub fn family(&self) -> Option<ValueFamily> {
        match self {
            ScalarValue::Null => None,
            ScalarValue::Bool(_) => Some(ValueFamily::Bool),
            ScalarValue::Int64(_) | ScalarValue::Float64(_) => Some(ValueFamily::Numeric),
            ScalarValue::Utf8(_) => Some(ValueFamily::Text),
            ScalarValue::Date(_) => Some(ValueFamily::Date),
            ScalarValue::Timestamp(_) => Some(ValueFamily::Timestamp),
        }
    }

    /// SQL comparison. Returns `None` when either side is NULL or the values
    /// belong to different families.
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int64(a), Self::Int64(b)) => Some(a.cmp(b)),
            (Self::Float64(a), Self::Float64(b)) => Some(a.cmp(b)),
            (Self::Int64(a), Self::Float64(b)) => Some(compare_int_float(*a, b.0)),
            (Self::Float64(a), Self::Int64(b)) => Some(compare_int_float(*b, a.0).reverse()),
            (Self::Utf8(a), Self::Utf8(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// SQL equality: true only when `compare` yields `Equal`.
    pub fn sql_eq(&self, other: &ScalarValue) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

/// Exact ordering of an integer against a float.
///
/// Casting the integer to `f64` rounds above 2^53 and would make the ordering
/// intransitive. NaN sorts above every integer, as it does in `OrderedFloat`.
fn compare_int_float(int: i64, float: f64) -> Ordering {
    // 2^63 is exactly representable; every i64 lies in [-2^63, 2^63).
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() || float >= TWO_POW_63 {
        return Ordering::Less;
    }
    if float < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => whole.partial_cmp(&float).unwrap_or(Ordering::Equal),
        other => other,
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::Float64(v) => v.hash(state),
            Self::Utf8(v) => v.hash(state),
            Self::Date(v) => v.hash(state),
            Self::Timestamp(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::Float64(v) => write!(f, "{}", v),
            Self::Utf8(v) => write!(f, "'{}'", v),
            Self::Date(v) => write!(f, "DATE({})", v),
            Self::Timestamp(v) => write!(f, "TIMESTAMP({})", v),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int64(v)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::Int64(v as i64)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Utf8(v.to_string())
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Bool(v)
    }
}
