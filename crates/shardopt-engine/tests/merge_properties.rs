//! Property tests for MERGE condition folding and insert row order.
//!
//! A conflicting equality anywhere in the folded tree fails the fold, so semantics
//! are compared only for folds that succeed.

use proptest::prelude::*;
use shardopt_core::condition::*;
use shardopt_core::keygen::{IncrementKeyGenerator, KeyGenerator};
use shardopt_core::rule::{InMemoryShardingRule, ShardingTable};
use shardopt_core::statement::*;
use shardopt_core::value::ScalarValue;
use shardopt_core::OptimizeError;
use shardopt_engine::*;
use std::sync::Arc;

const COLUMNS: [&str; 2] = ["status", "amount"];

fn predicate_strategy() -> impl Strategy<Value = Predicate> {
    let column = prop::sample::select(COLUMNS.to_vec()).prop_map(|name| Column::new(name));
    (column, 0u8..4, 0i64..5).prop_map(|(column, op, v)| match op {
        0 => Predicate::eq(column, v),
        1 => Predicate::lt(column, v),
        2 => Predicate::gt_eq(column, v),
        _ => Predicate::between(column, v, v + 2),
    })
}

fn tree_strategy() -> impl Strategy<Value = ConditionTree> {
    let leaf = predicate_strategy().prop_map(Condition::Leaf);
    leaf.prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..3).prop_map(Condition::And),
            prop::collection::vec(inner, 1..3).prop_map(Condition::Or),
        ]
    })
    .prop_map(|c| ConditionTree::new(c).unwrap())
}

fn binding_strategy() -> impl Strategy<Value = Binding> {
    (0i64..6, 0i64..6).prop_map(|(status, amount)| {
        Binding::new()
            .with_column(Column::new("status"), status)
            .with_column(Column::new("amount"), amount)
    })
}

fn merge(outer: ConditionTree, using: ConditionTree) -> MergeStatement {
    MergeStatement {
        table: "t_order".into(),
        condition: outer,
        using: Some(Box::new(SelectStatement {
            tables: vec!["t_source".into()],
            condition: using,
        })),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn merged_condition_is_conjunction(
        outer in tree_strategy(),
        using in tree_strategy(),
        binding in binding_strategy(),
    ) {
        let expected = outer.is_satisfied_by(&binding) && using.is_satisfied_by(&binding);
        match merge_condition(&merge(outer, using)) {
            Ok(merged) => prop_assert_eq!(merged.is_satisfied_by(&binding), expected),
            Err(err) => prop_assert!(
                matches!(err, OptimizeError::UnsatisfiableCondition { .. }),
                "unexpected error {}",
                err
            ),
        }
    }

    #[test]
    fn insert_units_follow_row_order(users in prop::collection::vec(0i64..1000, 1..20)) {
        let mut rule = InMemoryShardingRule::new();
        rule.add_table(
            "t_order",
            ShardingTable {
                sharding_columns: vec!["user_id".into()],
                key_column: Some("id".into()),
                key_generator: Some(Arc::new(IncrementKeyGenerator::new(1)) as Arc<dyn KeyGenerator>),
            },
        );
        let insert = InsertStatement {
            table: "t_order".into(),
            columns: vec!["user_id".into()],
            rows: users
                .iter()
                .map(|&u| InsertRow::new(vec![InsertValue::Literal(ScalarValue::Int64(u))]))
                .collect(),
        };
        let key = GeneratedKey::resolve(&rule, &insert, &[]).unwrap();
        let engine =
            new_sharding_engine(&rule, &Statement::Insert(insert), &[], key.as_ref()).unwrap();
        let OptimizeResult::Insert(result) = engine.optimize() else {
            panic!("expected insert result");
        };
        prop_assert_eq!(result.units.len(), users.len());
        for (i, (unit, user)) in result.units.iter().zip(&users).enumerate() {
            prop_assert_eq!(unit.values[0].literal(), Some(&ScalarValue::Int64(*user)));
            prop_assert_eq!(unit.values[1].literal(), Some(&ScalarValue::Int64(i as i64 + 1)));
        }
    }
}
