//! # Statement Model
//!
//! The optimize layer does not parse SQL. It receives statements that an external
//! parser has already turned into the closed `Statement` union below, with each
//! statement's routing condition tree extracted up front.
//!
//! ## Ownership
//!
//! A `MergeStatement` exclusively owns its `USING` sub-select; the sub-select holds no
//! reference back to the merge. Combining the two condition trees (see the engine
//! factory) reads both and produces an independent third tree.

use crate::condition::ConditionTree;
use crate::function::SqlFunction;
use crate::value::ScalarValue;
use serde::{Deserialize, Serialize};

/// A parsed SQL statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Insert(InsertStatement),
    Select(SelectStatement),
    /// UPDATE / DELETE.
    Dml(DmlStatement),
    /// MERGE INTO ... USING (SELECT ...).
    Merge(MergeStatement),
    /// DDL, DAL, DCL and TCL statements.
    Other(OtherStatement),
}

impl Statement {
    /// The statement's own condition tree. Inserts and `Other` statements have none.
    pub fn condition(&self) -> Option<&ConditionTree> {
        match self {
            Statement::Select(s) => Some(&s.condition),
            Statement::Dml(s) => Some(&s.condition),
            Statement::Merge(s) => Some(&s.condition),
            Statement::Insert(_) | Statement::Other(_) => None,
        }
    }

    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Select(_) => StatementKind::Select,
            Statement::Dml(_) => StatementKind::Dml,
            Statement::Merge(_) => StatementKind::Merge,
            Statement::Other(_) => StatementKind::Other,
        }
    }
}

/// Discriminant of [`Statement`], used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    Insert,
    Select,
    Dml,
    Merge,
    Other,
}

/// A value in an `INSERT ... VALUES` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertValue {
    Literal(ScalarValue),
    /// Zero-based index into the statement's bound parameters.
    Parameter(usize),
    /// A SQL function evaluated at optimize time (e.g. `NOW()`).
    Function(SqlFunction),
}

impl InsertValue {
    /// The value if it is a literal. Parameters and functions have none until resolved.
    pub fn literal(&self) -> Option<&ScalarValue> {
        match self {
            InsertValue::Literal(v) => Some(v),
            InsertValue::Parameter(_) | InsertValue::Function(_) => None,
        }
    }
}

impl From<ScalarValue> for InsertValue {
    fn from(v: ScalarValue) -> Self {
        InsertValue::Literal(v)
    }
}

/// One `VALUES (...)` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertRow {
    pub values: Vec<InsertValue>,
}

impl InsertRow {
    pub fn new(values: Vec<InsertValue>) -> Self {
        Self { values }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    /// Target logical table.
    pub table: String,
    /// Declared insert columns, in statement order.
    pub columns: Vec<String>,
    /// `VALUES` rows, each with one value per declared column.
    pub rows: Vec<InsertRow>,
}

impl InsertStatement {
    /// Position of `column` among the declared columns (case-insensitive).
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    /// Logical tables in the `FROM` clause, joins included.
    pub tables: Vec<String>,
    /// The `WHERE` condition; empty when the query has none.
    #[serde(default)]
    pub condition: ConditionTree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DmlKind {
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmlStatement {
    pub kind: DmlKind,
    /// Target logical table.
    pub table: String,
    /// The `WHERE` condition; empty for an unconditional update or delete.
    #[serde(default)]
    pub condition: ConditionTree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeStatement {
    pub table: String,
    /// Condition of the `ON` / `WHERE` clauses of the merge itself.
    #[serde(default)]
    pub condition: ConditionTree,
    /// The `USING` sub-select, when the source is a query rather than a table.
    #[serde(default)]
    pub using: Option<Box<SelectStatement>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtherKind {
    Ddl,
    Dal,
    Dcl,
    Tcl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherStatement {
    pub kind: OtherKind,
    #[serde(default)]
    pub tables: Vec<String>,
}
