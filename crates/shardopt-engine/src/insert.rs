//! # Insert Optimize Engine
//!
//! Turns each `VALUES` row of a sharded insert into an [`InsertOptimizeUnit`]:
//!
//! 1. Substitute the row's bound parameters.
//! 2. Apply the generated key. A system-generated key appends the key column once to
//!    the column list and the row's key value to every row. A client-supplied key
//!    overwrites the listed key column with the resolved value, which is how NULL
//!    keys get their generated replacement.
//! 3. Build the row's routing condition: `table.col = value` for every sharding
//!    column of the table that the (extended) row carries, joined by AND. A row that
//!    carries no sharding column routes with the empty condition.
//!
//! SQL functions are evaluated only in sharding columns; elsewhere they reach the
//! rewriter unevaluated.
//!
//! Units come out in statement row order. The whole statement resolves or nothing
//! does: the first failing row aborts construction.

use shardopt_core::condition::{Column, ConditionTree, Predicate};
use shardopt_core::function::FunctionExecutor;
use shardopt_core::rule::ShardingRule;
use shardopt_core::statement::{InsertStatement, InsertValue};
use shardopt_core::value::ScalarValue;
use shardopt_core::{OptimizeError, Result};
use tracing::{debug, trace};

use crate::generated_key::GeneratedKey;
use crate::result::{InsertOptimizeResult, InsertOptimizeUnit, RoutingInput};
use crate::rows;

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOptimizeEngine {
    result: InsertOptimizeResult,
}

impl InsertOptimizeEngine {
    pub fn new(
        rule: &dyn ShardingRule,
        insert: &InsertStatement,
        parameters: &[ScalarValue],
        generated_key: Option<&GeneratedKey>,
        functions: &dyn FunctionExecutor,
    ) -> Result<Self> {
        let resolved = rows::resolve_rows(insert, parameters)?;

        let mut columns = insert.columns.clone();
        // Where the key lands in each row, and whether it is appended there.
        let mut key_slot: Option<(usize, bool)> = None;
        if let Some(key) = generated_key {
            if key.values.len() != resolved.len() {
                return Err(OptimizeError::GeneratedKeyMismatch {
                    expected: resolved.len(),
                    actual: key.values.len(),
                });
            }
            key_slot = match (insert.column_index(&key.column), key.generated) {
                (Some(_), true) => {
                    return Err(OptimizeError::UnsupportedStatementShape(format!(
                        "generated key column {} is already listed by INSERT INTO {}",
                        key.column, insert.table
                    )))
                }
                (Some(index), false) => Some((index, false)),
                (None, true) => {
                    columns.push(key.column.clone());
                    Some((columns.len() - 1, true))
                }
                (None, false) => {
                    return Err(OptimizeError::UnsupportedStatementShape(format!(
                        "client-supplied key column {} is not listed by INSERT INTO {}",
                        key.column, insert.table
                    )))
                }
            };
        }

        // Positions of the table's sharding columns within the final column list.
        let sharding: Vec<(Column, usize)> = rule
            .sharding_columns(&insert.table)
            .iter()
            .filter_map(|name| {
                columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(name))
                    .map(|i| (Column::qualified(insert.table.as_str(), name.as_str()), i))
            })
            .collect();

        let mut units = Vec::with_capacity(resolved.len());
        for (row, mut values) in resolved.into_iter().enumerate() {
            let mut appended = None;
            if let (Some(key), Some((index, append))) = (generated_key, key_slot) {
                let value = InsertValue::Literal(key.values[row].clone());
                if append {
                    values.values.push(value);
                    appended = Some(key.values[row].clone());
                } else {
                    values.values[index] = value;
                }
            }

            let mut predicates = Vec::with_capacity(sharding.len());
            for (column, index) in &sharding {
                let value = values.evaluate(*index, functions)?;
                predicates.push(Predicate::eq(column.clone(), value));
            }
            let condition = ConditionTree::conjunction(predicates);
            trace!("Insert row {} routes on {}", row, condition);

            let mut unit_parameters = values.placeholder_values();
            if let Some(value) = appended {
                if !parameters.is_empty() {
                    unit_parameters.push(value);
                }
            }
            units.push(InsertOptimizeUnit {
                values: values.values,
                parameters: unit_parameters,
                routing: RoutingInput::new(condition),
            });
        }

        debug!(
            "Optimized insert into {}: {} rows, {} sharding columns present",
            insert.table,
            units.len(),
            sharding.len()
        );
        Ok(Self {
            result: InsertOptimizeResult {
                table: insert.table.clone(),
                columns,
                units,
            },
        })
    }

    pub fn result(&self) -> &InsertOptimizeResult {
        &self.result
    }

    pub fn optimize(self) -> InsertOptimizeResult {
        self.result
    }
}
