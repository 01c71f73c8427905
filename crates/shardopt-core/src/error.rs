//! # Optimize Errors
//!
//! Every failure in the optimize layer is reported synchronously as an
//! `OptimizeError`. Nothing is retried and no partially built engine or result is
//! returned: a failed optimization aborts only the routing attempt of the one
//! statement being optimized.

use crate::condition::Column;

/// Errors that can occur while building or running an optimize engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimizeError {
    /// The statement (or part of it) has a shape no engine can handle.
    #[error("Unsupported statement shape: {0}")]
    UnsupportedStatementShape(String),
    /// Two literal equalities on the same column under AND disagree.
    #[error("Unsatisfiable condition on column {column}")]
    UnsatisfiableCondition { column: Column },
    /// The insert omits the key column and the table has no key generator.
    #[error("No key generator configured for {table}.{column}")]
    KeyGenerationUnavailable { table: String, column: String },
    /// An insert row supplies a different number of values than declared columns.
    #[error("Malformed insert row {row}: expected {expected} values, found {actual}")]
    MalformedInsertRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    /// A placeholder refers to a parameter that was not bound.
    #[error("Parameter index {index} out of range ({count} parameters bound)")]
    ParameterOutOfRange { index: usize, count: usize },
    /// The generated key does not carry one value per inserted row.
    #[error("Generated key has {actual} values for {expected} rows")]
    GeneratedKeyMismatch { expected: usize, actual: usize },
    /// A SQL function in an insert row cannot be evaluated.
    #[error("Unsupported SQL function: {0}")]
    UnsupportedFunction(String),
    /// The encryptor rejected a plaintext value.
    #[error("Failed to encrypt column {column}: {reason}")]
    EncryptFailed { column: String, reason: String },
}

pub type Result<T, E = OptimizeError> = std::result::Result<T, E>;
