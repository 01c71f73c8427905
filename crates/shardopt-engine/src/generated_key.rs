//! # Generated-Key Resolution
//!
//! Tables whose sharding rule names a generate-key column get a key value for every
//! inserted row:
//!
//! - **Column omitted**: the table's key generator draws one value per row, in row
//!   order, and the key is flagged *generated* so that the insert engine appends the
//!   column to the statement.
//! - **Column listed**: each row's value is passed through as *client-supplied*. A
//!   row whose key evaluates to NULL counts as omitted for that row and gets a
//!   generator value instead; the insert engine writes it into the listed column.
//!
//! A NULL key is never inserted: if a row needs a generated value and the table has
//! no generator, resolution fails with `KeyGenerationUnavailable`.

use serde::{Deserialize, Serialize};
use shardopt_core::function::{DefaultFunctionExecutor, FunctionExecutor};
use shardopt_core::keygen::KeyGenerator;
use shardopt_core::rule::ShardingRule;
use shardopt_core::statement::InsertStatement;
use shardopt_core::value::ScalarValue;
use shardopt_core::{OptimizeError, Result};
use tracing::debug;

use crate::rows;

/// Key values for the rows of one insert statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedKey {
    /// The key column.
    pub column: String,
    /// One non-null value per inserted row, in statement row order.
    pub values: Vec<ScalarValue>,
    /// `true` when the statement omits the key column and every value was drawn from
    /// the key generator. The insert engine appends the column only in that case.
    pub generated: bool,
}

impl GeneratedKey {
    /// Resolve the key for `insert`, evaluating SQL functions with the default executor.
    ///
    /// Returns `None` when the table has no generate-key column.
    pub fn resolve(
        rule: &dyn ShardingRule,
        insert: &InsertStatement,
        parameters: &[ScalarValue],
    ) -> Result<Option<Self>> {
        Self::resolve_with(rule, insert, parameters, &DefaultFunctionExecutor)
    }

    pub fn resolve_with(
        rule: &dyn ShardingRule,
        insert: &InsertStatement,
        parameters: &[ScalarValue],
        functions: &dyn FunctionExecutor,
    ) -> Result<Option<Self>> {
        let Some(column) = rule.generate_key_column(&insert.table) else {
            return Ok(None);
        };
        rows::check_arity(insert)?;

        if let Some(index) = insert.column_index(column) {
            let mut values = Vec::with_capacity(insert.rows.len());
            let mut filled = 0;
            for row in &insert.rows {
                let value = rows::resolve_value(&row.values[index], parameters, functions)?;
                if value.is_null() {
                    values.push(require_generator(rule, &insert.table, column)?.next_key());
                    filled += 1;
                } else {
                    values.push(value);
                }
            }
            debug!(
                "Key column {}.{} supplied by statement for {} rows, {} NULL keys generated",
                insert.table,
                column,
                values.len(),
                filled
            );
            return Ok(Some(Self {
                column: insert.columns[index].clone(),
                values,
                generated: false,
            }));
        }

        let generator = require_generator(rule, &insert.table, column)?;
        let values: Vec<ScalarValue> = insert.rows.iter().map(|_| generator.next_key()).collect();
        debug!(
            "Generated {} keys for {}.{}",
            values.len(),
            insert.table,
            column
        );
        Ok(Some(Self {
            column: column.to_string(),
            values,
            generated: true,
        }))
    }
}

fn require_generator<'a>(
    rule: &'a dyn ShardingRule,
    table: &str,
    column: &str,
) -> Result<&'a dyn KeyGenerator> {
    rule.key_generator(table)
        .ok_or_else(|| OptimizeError::KeyGenerationUnavailable {
            table: table.to_string(),
            column: column.to_string(),
        })
}
