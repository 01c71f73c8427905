//! # Query Optimize Engine
//!
//! Used for SELECT, UPDATE, DELETE and MERGE statements (and the DDL/DAL fallback).
//! The condition tree keeps its shape; only parameter placeholders are replaced by
//! their bound values so that the router sees literals everywhere.

use shardopt_core::condition::ConditionTree;
use shardopt_core::value::ScalarValue;
use shardopt_core::Result;
use tracing::trace;

use crate::result::RoutingInput;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptimizeEngine {
    routing: RoutingInput,
}

impl QueryOptimizeEngine {
    /// Bind `parameters` into `condition`. Fails if a placeholder has no bound value.
    pub fn new(condition: &ConditionTree, parameters: &[ScalarValue]) -> Result<Self> {
        let condition = condition.bind_parameters(parameters)?;
        trace!("Query routing condition: {}", condition);
        Ok(Self {
            routing: RoutingInput::new(condition),
        })
    }

    pub fn routing(&self) -> &RoutingInput {
        &self.routing
    }

    pub fn optimize(self) -> RoutingInput {
        self.routing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardopt_core::condition::{Column, Operand, Predicate};
    use shardopt_core::OptimizeError;

    #[test]
    fn test_parameters_are_bound() {
        let tree = ConditionTree::leaf(Predicate::eq(Column::new("user_id"), Operand::Parameter(1)))
            .and(ConditionTree::leaf(Predicate::gt(Column::new("amount"), 10)));
        let engine =
            QueryOptimizeEngine::new(&tree, &[ScalarValue::Null, ScalarValue::Int64(42)]).unwrap();
        let expected = ConditionTree::leaf(Predicate::eq(Column::new("user_id"), 42))
            .and(ConditionTree::leaf(Predicate::gt(Column::new("amount"), 10)));
        assert_eq!(engine.optimize().condition, expected);
    }

    #[test]
    fn test_empty_tree_stays_empty() {
        let routing = QueryOptimizeEngine::new(&ConditionTree::empty(), &[])
            .unwrap()
            .optimize();
        assert!(routing.condition.is_empty());
    }

    #[test]
    fn test_unbound_parameter() {
        let tree = ConditionTree::leaf(Predicate::eq(Column::new("id"), Operand::Parameter(2)));
        assert_eq!(
            QueryOptimizeEngine::new(&tree, &[ScalarValue::Int64(1)]),
            Err(OptimizeError::ParameterOutOfRange { index: 2, count: 1 })
        );
    }
}
