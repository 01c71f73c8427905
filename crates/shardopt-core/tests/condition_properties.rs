//! Property tests for condition-tree optimization.
//!
//! Random trees over three columns, a small value domain (so that bounds and
//! equalities on the same column collide often) plus a few integers and floats
//! around 2^53, and a few parameter placeholders.
//! The properties checked:
//!
//! - `optimize` is idempotent (structural equality);
//! - `combine` absorbs an empty side;
//! - `optimize` preserves which bindings satisfy the tree;
//! - a conflict is only reported for trees that no binding satisfies when the
//!   conflicting AND is the whole tree.

use proptest::prelude::*;
use shardopt_core::condition::*;
use shardopt_core::value::ScalarValue;
use shardopt_core::OptimizeError;

const COLUMNS: [&str; 3] = ["a", "b", "c"];
const LARGE: i64 = 1 << 53;

fn value_strategy() -> impl Strategy<Value = ScalarValue> {
    prop_oneof![
        4 => (0i64..6).prop_map(ScalarValue::Int64),
        2 => (0i64..6).prop_map(|v| ScalarValue::float(v as f64 + 0.5)),
        2 => prop::sample::select(vec!["x", "y"]).prop_map(|s| ScalarValue::utf8(s)),
        // Integers around 2^53, where an f64 cast stops being exact.
        1 => prop::sample::select(vec![LARGE - 1, LARGE, LARGE + 1]).prop_map(ScalarValue::Int64),
        1 => prop::sample::select(vec![LARGE - 1, LARGE, LARGE + 2])
            .prop_map(|v| ScalarValue::float(v as f64)),
        1 => Just(ScalarValue::Null),
    ]
}

fn operand_strategy() -> impl Strategy<Value = Operand> {
    prop_oneof![
        4 => value_strategy().prop_map(Operand::Literal),
        1 => (0usize..3).prop_map(Operand::Parameter),
    ]
}

fn predicate_strategy() -> impl Strategy<Value = Predicate> {
    let column = prop::sample::select(COLUMNS.to_vec()).prop_map(|name| Column::new(name));
    (
        column,
        0u8..7,
        prop::collection::vec(operand_strategy(), 1..4),
    )
        .prop_map(|(column, op, mut operands)| {
            let op = match op {
                0 => CompareOp::Eq,
                1 => CompareOp::Lt,
                2 => CompareOp::LtEq,
                3 => CompareOp::Gt,
                4 => CompareOp::GtEq,
                5 => CompareOp::In,
                _ => CompareOp::Between,
            };
            match op {
                CompareOp::In => {}
                CompareOp::Between => operands.resize(2, Operand::Literal(ScalarValue::Int64(3))),
                _ => operands.truncate(1),
            }
            Predicate::new(column, op, operands)
        })
}

fn condition_strategy() -> impl Strategy<Value = Condition> {
    let leaf = predicate_strategy().prop_map(Condition::Leaf);
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Condition::And),
            prop::collection::vec(inner, 1..4).prop_map(Condition::Or),
        ]
    })
}

fn tree_strategy() -> impl Strategy<Value = ConditionTree> {
    prop_oneof![
        1 => Just(ConditionTree::empty()),
        8 => condition_strategy().prop_map(|c| ConditionTree::new(c).unwrap()),
    ]
}

fn binding_strategy() -> impl Strategy<Value = Binding> {
    (
        prop::collection::vec(prop::option::of(value_strategy()), 3),
        prop::collection::vec(value_strategy(), 0..4),
    )
        .prop_map(|(columns, parameters)| {
            let mut binding = Binding::new().with_parameters(parameters);
            for (name, value) in COLUMNS.iter().zip(columns) {
                if let Some(value) = value {
                    binding = binding.with_column(Column::new(*name), value);
                }
            }
            binding
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn optimize_is_idempotent(tree in tree_strategy()) {
        if let Ok(once) = tree.optimize() {
            prop_assert_eq!(once.optimize(), Ok(once.clone()));
        }
    }

    #[test]
    fn combine_absorbs_empty(tree in tree_strategy()) {
        prop_assert_eq!(
            ConditionTree::combine(tree.clone(), Connective::And, ConditionTree::empty()),
            tree.clone()
        );
        prop_assert_eq!(
            ConditionTree::combine(ConditionTree::empty(), Connective::Or, tree.clone()),
            tree
        );
    }

    #[test]
    fn optimize_preserves_semantics(tree in tree_strategy(), binding in binding_strategy()) {
        if let Ok(optimized) = tree.optimize() {
            prop_assert_eq!(tree.is_satisfied_by(&binding), optimized.is_satisfied_by(&binding));
        }
    }

    #[test]
    fn conflicting_conjunction_is_never_satisfied(
        leaves in prop::collection::vec(predicate_strategy(), 1..6),
        binding in binding_strategy(),
    ) {
        let tree = ConditionTree::new(Condition::And(
            leaves.into_iter().map(Condition::Leaf).collect(),
        ))
        .unwrap();
        match tree.optimize() {
            Ok(optimized) => {
                prop_assert_eq!(tree.is_satisfied_by(&binding), optimized.is_satisfied_by(&binding));
            }
            Err(OptimizeError::UnsatisfiableCondition { .. }) => {
                prop_assert!(!tree.is_satisfied_by(&binding));
            }
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }

    #[test]
    fn and_combination_matches_both_sides(
        left in tree_strategy(),
        right in tree_strategy(),
        binding in binding_strategy(),
    ) {
        let combined = ConditionTree::combine(left.clone(), Connective::And, right.clone());
        prop_assert_eq!(
            combined.is_satisfied_by(&binding),
            left.is_satisfied_by(&binding) && right.is_satisfied_by(&binding)
        );
    }
}

#[test]
fn deserialization_rejects_empty_groups() {
    let err = serde_json::from_str::<ConditionTree>(r#"{"Or":[]}"#);
    assert!(err.is_err());

    let tree: ConditionTree = serde_json::from_str("null").unwrap();
    assert!(tree.is_empty());

    let tree: ConditionTree = serde_json::from_str(
        r#"{"Leaf":{"column":{"table":null,"name":"id"},"op":"Eq","operands":[{"Literal":{"Int64":7}}]}}"#,
    )
    .unwrap();
    assert_eq!(tree, ConditionTree::leaf(Predicate::eq(Column::new("id"), 7)));
}
