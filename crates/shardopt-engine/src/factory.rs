//! # Optimize Engine Factory
//!
//! Two entry points pick an engine for a statement, one per rule family. They keep
//! no state between calls.
//!
//! ## Sharding
//!
//! | Statement | Engine |
//! |-----------|--------|
//! | Insert | Insert |
//! | Select, Update, Delete | Query over the statement's condition |
//! | Merge | Query over the merged condition (see below) |
//! | DDL, DAL, DCL, TCL | Query over the empty condition |
//!
//! A MERGE whose `USING` sub-select has a non-empty condition is routed on
//! `optimize(outer AND using)`. Without a sub-select, or with an empty one, the outer
//! condition is used as is. Engines never see the compound structure.
//!
//! ## Encryption
//!
//! Inserts get the Encrypt-Insert engine; everything else is left unchanged.

use shardopt_core::condition::{ConditionTree, Connective};
use shardopt_core::function::{DefaultFunctionExecutor, FunctionExecutor};
use shardopt_core::rule::{EncryptRule, ShardingRule};
use shardopt_core::statement::{MergeStatement, Statement};
use shardopt_core::value::ScalarValue;
use shardopt_core::Result;
use tracing::debug;

use crate::encrypt_insert::EncryptInsertOptimizeEngine;
use crate::engine::{EncryptDefaultOptimizeEngine, OptimizeEngine};
use crate::generated_key::GeneratedKey;
use crate::insert::InsertOptimizeEngine;
use crate::query::QueryOptimizeEngine;

/// Build the sharding engine for `statement`.
///
/// `generated_key` is only consulted for inserts; callers resolve it with
/// [`GeneratedKey::resolve`] beforehand.
pub fn new_sharding_engine(
    rule: &dyn ShardingRule,
    statement: &Statement,
    parameters: &[ScalarValue],
    generated_key: Option<&GeneratedKey>,
) -> Result<OptimizeEngine> {
    new_sharding_engine_with(
        rule,
        statement,
        parameters,
        generated_key,
        &DefaultFunctionExecutor,
    )
}

pub fn new_sharding_engine_with(
    rule: &dyn ShardingRule,
    statement: &Statement,
    parameters: &[ScalarValue],
    generated_key: Option<&GeneratedKey>,
    functions: &dyn FunctionExecutor,
) -> Result<OptimizeEngine> {
    let engine = match statement {
        Statement::Insert(insert) => OptimizeEngine::Insert(InsertOptimizeEngine::new(
            rule,
            insert,
            parameters,
            generated_key,
            functions,
        )?),
        Statement::Select(select) => {
            OptimizeEngine::Query(QueryOptimizeEngine::new(&select.condition, parameters)?)
        }
        Statement::Dml(dml) => {
            OptimizeEngine::Query(QueryOptimizeEngine::new(&dml.condition, parameters)?)
        }
        Statement::Merge(merge) => {
            let condition = merge_condition(merge)?;
            OptimizeEngine::Query(QueryOptimizeEngine::new(&condition, parameters)?)
        }
        Statement::Other(other) => {
            debug!(
                "No routing condition for {:?} statement, using empty condition",
                other.kind
            );
            OptimizeEngine::Query(QueryOptimizeEngine::new(&ConditionTree::empty(), parameters)?)
        }
    };
    debug!(
        "Sharding engine for {:?} statement: {}",
        statement.kind(),
        engine.kind()
    );
    Ok(engine)
}

/// Build the encryption engine for `statement`.
pub fn new_encrypt_engine(
    rule: &dyn EncryptRule,
    statement: &Statement,
    parameters: &[ScalarValue],
) -> Result<OptimizeEngine> {
    new_encrypt_engine_with(rule, statement, parameters, &DefaultFunctionExecutor)
}

pub fn new_encrypt_engine_with(
    rule: &dyn EncryptRule,
    statement: &Statement,
    parameters: &[ScalarValue],
    functions: &dyn FunctionExecutor,
) -> Result<OptimizeEngine> {
    let engine = match statement {
        Statement::Insert(insert) => OptimizeEngine::EncryptInsert(
            EncryptInsertOptimizeEngine::new(rule, insert, parameters, functions)?,
        ),
        Statement::Select(_) | Statement::Dml(_) | Statement::Merge(_) | Statement::Other(_) => {
            OptimizeEngine::EncryptDefault(EncryptDefaultOptimizeEngine)
        }
    };
    debug!(
        "Encrypt engine for {:?} statement: {}",
        statement.kind(),
        engine.kind()
    );
    Ok(engine)
}

/// The routing condition of a MERGE statement, folding in its `USING` sub-select.
pub fn merge_condition(merge: &MergeStatement) -> Result<ConditionTree> {
    match merge.using.as_deref() {
        Some(using) if !using.condition.is_empty() => {
            let merged = ConditionTree::combine(
                merge.condition.clone(),
                Connective::And,
                using.condition.clone(),
            )
            .optimize()?;
            debug!("Merged MERGE condition for {}: {}", merge.table, merged);
            Ok(merged)
        }
        _ => Ok(merge.condition.clone()),
    }
}
