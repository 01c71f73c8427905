//! Resolution of `INSERT ... VALUES` rows.
//!
//! Every row is checked against the declared column count before any value is
//! resolved, so a malformed statement fails before functions run or keys are drawn.
//!
//! Parameters are substituted eagerly. SQL functions stay unresolved until an engine
//! needs the concrete value of that column (`ResolvedRow::evaluate`), so a function
//! the executor does not know only fails the statement when it sits in a sharding,
//! key or encrypted column. Anywhere else it is passed through to the rewriter.

use shardopt_core::function::FunctionExecutor;
use shardopt_core::statement::{InsertStatement, InsertValue};
use shardopt_core::value::ScalarValue;
use shardopt_core::{OptimizeError, Result};

/// A row with parameters substituted. Values are `Literal` or `Function`.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedRow {
    pub values: Vec<InsertValue>,
    /// Column positions whose value came from a parameter placeholder, in order.
    pub placeholders: Vec<usize>,
}

impl ResolvedRow {
    /// The concrete value at `index`, evaluating (and keeping) a SQL function result.
    pub fn evaluate(
        &mut self,
        index: usize,
        functions: &dyn FunctionExecutor,
    ) -> Result<ScalarValue> {
        let value = match &self.values[index] {
            InsertValue::Literal(v) => return Ok(v.clone()),
            InsertValue::Function(f) => functions.execute(f)?,
            InsertValue::Parameter(i) => {
                return Err(OptimizeError::UnsupportedStatementShape(format!(
                    "unbound parameter ?{} in resolved row",
                    i
                )))
            }
        };
        self.values[index] = InsertValue::Literal(value.clone());
        Ok(value)
    }

    /// The row's values at its placeholder positions.
    pub fn placeholder_values(&self) -> Vec<ScalarValue> {
        self.placeholders
            .iter()
            .filter_map(|&i| self.values[i].literal().cloned())
            .collect()
    }
}

pub(crate) fn check_arity(insert: &InsertStatement) -> Result<()> {
    let expected = insert.columns.len();
    for (row, values) in insert.rows.iter().enumerate() {
        if values.values.len() != expected {
            return Err(OptimizeError::MalformedInsertRow {
                row,
                expected,
                actual: values.values.len(),
            });
        }
    }
    Ok(())
}

/// Fully evaluate one statement value.
pub(crate) fn resolve_value(
    value: &InsertValue,
    parameters: &[ScalarValue],
    functions: &dyn FunctionExecutor,
) -> Result<ScalarValue> {
    match value {
        InsertValue::Literal(v) => Ok(v.clone()),
        InsertValue::Parameter(index) => parameter(*index, parameters),
        InsertValue::Function(f) => functions.execute(f),
    }
}

fn parameter(index: usize, parameters: &[ScalarValue]) -> Result<ScalarValue> {
    parameters
        .get(index)
        .cloned()
        .ok_or(OptimizeError::ParameterOutOfRange {
            index,
            count: parameters.len(),
        })
}

pub(crate) fn resolve_rows(
    insert: &InsertStatement,
    parameters: &[ScalarValue],
) -> Result<Vec<ResolvedRow>> {
    if insert.rows.is_empty() {
        return Err(OptimizeError::UnsupportedStatementShape(format!(
            "INSERT INTO {} without VALUES rows",
            insert.table
        )));
    }
    check_arity(insert)?;
    insert
        .rows
        .iter()
        .map(|row| {
            let mut values = Vec::with_capacity(row.values.len());
            let mut placeholders = Vec::new();
            for (i, value) in row.values.iter().enumerate() {
                values.push(match value {
                    InsertValue::Parameter(index) => {
                        placeholders.push(i);
                        InsertValue::Literal(parameter(*index, parameters)?)
                    }
                    other => other.clone(),
                });
            }
            Ok(ResolvedRow {
                values,
                placeholders,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardopt_core::function::{DefaultFunctionExecutor, SqlFunction};
    use shardopt_core::statement::InsertRow;

    fn insert(rows: Vec<Vec<InsertValue>>) -> InsertStatement {
        InsertStatement {
            table: "t_order".into(),
            columns: vec!["user_id".into(), "status".into()],
            rows: rows.into_iter().map(InsertRow::new).collect(),
        }
    }

    #[test]
    fn test_resolves_parameters_and_keeps_functions() {
        let rand = InsertValue::Function(SqlFunction::new("RAND"));
        let stmt = insert(vec![vec![InsertValue::Parameter(0), rand.clone()]]);
        let rows = resolve_rows(&stmt, &[ScalarValue::Int64(9)]).unwrap();
        assert_eq!(
            rows[0].values,
            vec![InsertValue::Literal(ScalarValue::Int64(9)), rand]
        );
        assert_eq!(rows[0].placeholders, vec![0]);
        assert_eq!(rows[0].placeholder_values(), vec![ScalarValue::Int64(9)]);
    }

    #[test]
    fn test_evaluate_replaces_function_with_result() {
        let stmt = insert(vec![vec![
            InsertValue::Literal(ScalarValue::Int64(1)),
            InsertValue::Function(SqlFunction::new("NOW")),
        ]]);
        let mut rows = resolve_rows(&stmt, &[]).unwrap();
        let now = rows[0].evaluate(1, &DefaultFunctionExecutor).unwrap();
        assert!(matches!(now, ScalarValue::Timestamp(_)));
        assert_eq!(rows[0].values[1], InsertValue::Literal(now));
    }

    #[test]
    fn test_arity_checked_before_parameters() {
        let stmt = insert(vec![
            vec![InsertValue::Parameter(5), InsertValue::Literal(ScalarValue::Null)],
            vec![InsertValue::Literal(ScalarValue::Int64(1))],
        ]);
        assert_eq!(
            resolve_rows(&stmt, &[]).unwrap_err(),
            OptimizeError::MalformedInsertRow {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_insert_without_rows_is_unsupported() {
        assert!(matches!(
            resolve_rows(&insert(vec![]), &[]),
            Err(OptimizeError::UnsupportedStatementShape(_))
        ));
    }
}
