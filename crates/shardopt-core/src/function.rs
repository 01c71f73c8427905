//! # SQL Function Evaluation
//!
//! Insert rows may carry SQL functions instead of literals, e.g.
//! `INSERT INTO t_order (order_id, created_at) VALUES (?, NOW())`. Engines evaluate a
//! function through a `FunctionExecutor` only when they need its value: in a sharding
//! column, a key column or an encrypted column. Other functions reach the rewriter as
//! written.

use crate::error::{OptimizeError, Result};
use crate::value::ScalarValue;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// A SQL function call with literal arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlFunction {
    pub name: String,
    #[serde(default)]
    pub args: Vec<ScalarValue>,
}

impl SqlFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

/// Evaluates SQL functions found in insert values.
pub trait FunctionExecutor: Send + Sync {
    fn execute(&self, function: &SqlFunction) -> Result<ScalarValue>;
}

/// Evaluates the niladic functions commonly found in insert statements.
///
/// - `NOW`, `CURRENT_TIMESTAMP`, `SYSDATE` → `Timestamp` (ms since epoch)
/// - `CURRENT_DATE` → `Date` (days since epoch)
/// - `UUID` → `Utf8`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFunctionExecutor;

impl FunctionExecutor for DefaultFunctionExecutor {
    fn execute(&self, function: &SqlFunction) -> Result<ScalarValue> {
        match function.name.to_ascii_uppercase().as_str() {
            "NOW" | "CURRENT_TIMESTAMP" | "SYSDATE" => Ok(ScalarValue::Timestamp(now_millis())),
            "CURRENT_DATE" => Ok(ScalarValue::Date((now_millis() / MILLIS_PER_DAY) as i32)),
            "UUID" => Ok(ScalarValue::Utf8(uuid::Uuid::new_v4().to_string())),
            _ => Err(OptimizeError::UnsupportedFunction(function.name.clone())),
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
