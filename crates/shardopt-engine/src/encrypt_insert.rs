//! # Encrypt-Insert Optimize Engine
//!
//! Rewrites the plaintext of encrypted columns in every `VALUES` row. For each
//! declared column that the encrypt rule covers, the row value is replaced by the
//! encryptor's cipher value. When the column also has an assisted-query column, that
//! column is appended to the column list and each row receives the encryptor's
//! assisted value (NULL if the encryptor has none).
//!
//! SQL functions are evaluated only in encrypted columns; other columns keep them
//! for the rewriter.
//!
//! Encryption does not take part in sharding, so every unit routes with the empty
//! condition.

use shardopt_core::function::FunctionExecutor;
use shardopt_core::rule::EncryptRule;
use shardopt_core::statement::{InsertStatement, InsertValue};
use shardopt_core::value::ScalarValue;
use shardopt_core::Result;
use tracing::debug;

use crate::result::{InsertOptimizeResult, InsertOptimizeUnit, RoutingInput};
use crate::rows;

#[derive(Debug, Clone, PartialEq)]
pub struct EncryptInsertOptimizeEngine {
    result: InsertOptimizeResult,
}

impl EncryptInsertOptimizeEngine {
    pub fn new(
        rule: &dyn EncryptRule,
        insert: &InsertStatement,
        parameters: &[ScalarValue],
        functions: &dyn FunctionExecutor,
    ) -> Result<Self> {
        let resolved = rows::resolve_rows(insert, parameters)?;

        let encrypted: Vec<usize> = insert
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| rule.encryptor(&insert.table, column).is_some())
            .map(|(i, _)| i)
            .collect();
        let assisted: Vec<(usize, &str)> = encrypted
            .iter()
            .filter_map(|&i| {
                rule.assisted_query_column(&insert.table, &insert.columns[i])
                    .map(|assisted| (i, assisted))
            })
            .collect();

        let mut columns = insert.columns.clone();
        columns.extend(assisted.iter().map(|(_, name)| name.to_string()));

        let mut units = Vec::with_capacity(resolved.len());
        for mut row in resolved {
            let mut plain = Vec::with_capacity(encrypted.len());
            for &i in &encrypted {
                let value = row.evaluate(i, functions)?;
                if let Some(encryptor) = rule.encryptor(&insert.table, &insert.columns[i]) {
                    row.values[i] = InsertValue::Literal(encryptor.encrypt(&value)?);
                }
                plain.push((i, value));
            }
            let mut unit_parameters = row.placeholder_values();
            let mut values = row.values;
            for &(i, _) in &assisted {
                let value = plain
                    .iter()
                    .find(|(column, _)| *column == i)
                    .and_then(|(_, value)| {
                        rule.encryptor(&insert.table, &insert.columns[i])
                            .and_then(|encryptor| encryptor.query_assisted_encrypt(value))
                    })
                    .unwrap_or(ScalarValue::Null);
                if !parameters.is_empty() {
                    unit_parameters.push(value.clone());
                }
                values.push(InsertValue::Literal(value));
            }
            units.push(InsertOptimizeUnit {
                values,
                parameters: unit_parameters,
                routing: RoutingInput::default(),
            });
        }

        debug!(
            "Encrypted {} columns ({} assisted) of {} rows for {}",
            encrypted.len(),
            assisted.len(),
            units.len(),
            insert.table
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

#[cfg(test)]
mod tests {
    use super::*;
    use shardopt_core::encrypt::{Encryptor, Md5Encryptor};
    use shardopt_core::function::{DefaultFunctionExecutor, SqlFunction};
    use shardopt_core::rule::{EncryptColumn, InMemoryEncryptRule};
    use shardopt_core::statement::InsertRow;
    use shardopt_core::OptimizeError;
    use std::sync::Arc;

    /// Reverses text; has no assisted value.
    struct ReverseEncryptor;

    impl Encryptor for ReverseEncryptor {
        fn encrypt(&self, plain: &ScalarValue) -> Result<ScalarValue> {
            match plain {
                ScalarValue::Utf8(s) => Ok(ScalarValue::Utf8(s.chars().rev().collect())),
                other => Err(OptimizeError::EncryptFailed {
                    column: "name".into(),
                    reason: format!("cannot reverse {}", other),
                }),
            }
        }
    }

    fn rule() -> InMemoryEncryptRule {
        let mut rule = InMemoryEncryptRule::new();
        rule.add_column(
            "t_user",
            "pwd",
            EncryptColumn {
                encryptor: Arc::new(Md5Encryptor),
                assisted_query_column: Some("pwd_assisted".into()),
            },
        );
        rule.add_column(
            "t_user",
            "name",
            EncryptColumn {
                encryptor: Arc::new(ReverseEncryptor),
                assisted_query_column: Some("name_assisted".into()),
            },
        );
        rule
    }

    fn insert(rows: Vec<Vec<InsertValue>>) -> InsertStatement {
        InsertStatement {
            table: "t_user".into(),
            columns: vec!["id".into(), "name".into(), "pwd".into()],
            rows: rows.into_iter().map(InsertRow::new).collect(),
        }
    }

    #[test]
    fn test_encrypted_columns_are_rewritten() {
        let stmt = insert(vec![vec![
            InsertValue::Literal(ScalarValue::Int64(1)),
            InsertValue::Parameter(0),
            InsertValue::Literal(ScalarValue::utf8("abc")),
        ]]);
        let result = EncryptInsertOptimizeEngine::new(
            &rule(),
            &stmt,
            &[ScalarValue::utf8("bobby")],
            &DefaultFunctionExecutor,
        )
        .unwrap()
        .optimize();

        assert_eq!(
            result.columns,
            vec!["id", "name", "pwd", "name_assisted", "pwd_assisted"]
        );
        let digest = ScalarValue::utf8("900150983cd24fb0d6963f7d28e17f72");
        let unit = &result.units[0];
        assert_eq!(
            unit.values,
            vec![
                ScalarValue::Int64(1),
                ScalarValue::utf8("ybbob"),
                digest.clone(),
                ScalarValue::Null,
                digest.clone(),
            ]
            .into_iter()
            .map(InsertValue::Literal)
            .collect::<Vec<_>>()
        );
        assert_eq!(
            unit.parameters,
            vec![ScalarValue::utf8("ybbob"), ScalarValue::Null, digest]
        );
        assert!(unit.routing.condition.is_empty());
    }

    #[test]
    fn test_encryptor_failure_aborts() {
        let stmt = insert(vec![vec![
            InsertValue::Literal(ScalarValue::Int64(1)),
            InsertValue::Literal(ScalarValue::Int64(5)),
            InsertValue::Literal(ScalarValue::utf8("x")),
        ]]);
        assert!(matches!(
            EncryptInsertOptimizeEngine::new(&rule(), &stmt, &[], &DefaultFunctionExecutor),
            Err(OptimizeError::EncryptFailed { .. })
        ));
    }

    #[test]
    fn test_table_without_encrypted_columns_is_unchanged() {
        let stmt = InsertStatement {
            table: "t_order".into(),
            columns: vec!["id".into()],
            rows: vec![InsertRow::new(vec![InsertValue::Literal(ScalarValue::Int64(9))])],
        };
        let result =
            EncryptInsertOptimizeEngine::new(&rule(), &stmt, &[], &DefaultFunctionExecutor)
                .unwrap()
                .optimize();
        assert_eq!(result.columns, vec!["id"]);
        assert_eq!(
            result.units[0].values,
            vec![InsertValue::Literal(ScalarValue::Int64(9))]
        );
    }

    #[test]
    fn test_function_outside_encrypted_columns_passes_through() {
        let rand = InsertValue::Function(SqlFunction::new("RAND"));
        let stmt = insert(vec![vec![
            rand.clone(),
            InsertValue::Literal(ScalarValue::utf8("bobby")),
            InsertValue::Literal(ScalarValue::utf8("abc")),
        ]]);
        let result =
            EncryptInsertOptimizeEngine::new(&rule(), &stmt, &[], &DefaultFunctionExecutor)
                .unwrap()
                .optimize();
        let unit = &result.units[0];
        assert_eq!(unit.values[0], rand);
        assert_eq!(
            unit.values[1],
            InsertValue::Literal(ScalarValue::utf8("ybbob"))
        );
        assert!(unit.parameters.is_empty());
    }

    #[test]
    fn test_function_in_encrypted_column_is_evaluated_first() {
        let stmt = insert(vec![vec![
            InsertValue::Literal(ScalarValue::Int64(1)),
            InsertValue::Function(SqlFunction::new("UUID")),
            InsertValue::Function(SqlFunction::new("RAND")),
        ]]);
        assert_eq!(
            EncryptInsertOptimizeEngine::new(&rule(), &stmt, &[], &DefaultFunctionExecutor),
            Err(OptimizeError::UnsupportedFunction("RAND".into()))
        );
    }
}
