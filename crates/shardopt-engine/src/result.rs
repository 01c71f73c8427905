//! Results handed to the downstream router and rewriter.

use serde::{Deserialize, Serialize};
use shardopt_core::condition::ConditionTree;
use shardopt_core::statement::InsertValue;
use shardopt_core::value::ScalarValue;

/// The structure the router uses to pick data nodes for a statement or an insert row.
///
/// An empty condition means "no constraint": the router decides what that implies
/// (typically a broadcast). It is never absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoutingInput {
    pub condition: ConditionTree,
}

impl RoutingInput {
    pub fn new(condition: ConditionTree) -> Self {
        Self { condition }
    }
}

/// One optimized `VALUES` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOptimizeUnit {
    /// Row values aligned with [`InsertOptimizeResult::columns`]. Parameters are
    /// substituted; a SQL function stays unevaluated unless the engine needed its
    /// value, and is then replaced by the literal result.
    pub values: Vec<InsertValue>,
    /// Parameters the rewriter binds for this row when the statement is parameterized.
    pub parameters: Vec<ScalarValue>,
    pub routing: RoutingInput,
}

/// Optimized insert: the final column list and one unit per row, in statement order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOptimizeResult {
    pub table: String,
    pub columns: Vec<String>,
    pub units: Vec<InsertOptimizeUnit>,
}
