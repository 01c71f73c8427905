//! # Condition Trees
//!
//! A condition tree is the routing-relevant part of a statement's filter clause: a
//! boolean AND/OR structure over single-column comparisons. The shard router walks
//! it to decide which data nodes a statement touches.
//!
//! ## Shape
//!
//! ```text
//! Condition::And([
//!     Leaf(status = 'A'),
//!     Or([Leaf(region = 'EU'), Leaf(region = 'US')]),
//! ])
//! ```
//!
//! Nodes own their children exclusively. An `And` / `Or` node always has at least one
//! child; a statement without a filter clause has the *empty* tree, which is satisfied
//! by every binding. `ConditionTree` is the public handle and the only way to build a
//! tree from outside this module, so the non-empty invariant is checked once on entry
//! (`ConditionTree::new`, deserialization) and holds everywhere after.
//!
//! ## Persistent API
//!
//! `combine`, `optimize` and `bind_parameters` never mutate their input. Each returns
//! a fresh tree, which keeps ownership single and makes structural comparisons in tests
//! straightforward.
//!
//! ## Optimization
//!
//! `optimize` runs bottom-up and does two things per node:
//!
//! 1. **Flatten**: an `And` child of an `And` (or `Or` of `Or`) is spliced into its
//!    parent; a node left with a single child collapses to that child.
//! 2. **Merge** (only under `And`): sibling leaves on the same column with a single
//!    non-null literal operand are combined. Two upper bounds (or two lower bounds) of
//!    the same value family keep the tighter one; two equalities that agree keep the
//!    first; two equalities that disagree make the node unsatisfiable and the pass fails
//!    with [`OptimizeError::UnsatisfiableCondition`]. A merged leaf keeps the position of
//!    the first leaf of its group, so the output shape is fully determined by the input.
//!
//! Leaves with parameter operands, NULL literals, `IN` and `BETWEEN` are left alone, and
//! `Or` siblings are never merged.

use crate::error::{OptimizeError, Result};
use crate::value::{ScalarValue, ValueFamily};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Reference to a column, optionally qualified by its table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Column {
    pub table: Option<String>,
    pub name: String,
}

impl Column {
    /// A column without a table qualifier. It is a different merge key from the
    /// qualified form of the same name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref t) = self.table {
            write!(f, "{}.{}", t, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Comparison operator of a predicate leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `col = v`
    Eq,
    /// `col < v`
    Lt,
    /// `col <= v`
    LtEq,
    /// `col > v`
    Gt,
    /// `col >= v`
    GtEq,
    /// `col IN (v1, v2, ...)`
    In,
    /// `col BETWEEN low AND high`
    Between,
}

impl CompareOp {
    fn accepts_arity(&self, operands: usize) -> bool {
        match self {
            CompareOp::Eq | CompareOp::Lt | CompareOp::LtEq | CompareOp::Gt | CompareOp::GtEq => {
                operands == 1
            }
            CompareOp::In => operands >= 1,
            CompareOp::Between => operands == 2,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::In => "IN",
            CompareOp::Between => "BETWEEN",
        };
        f.write_str(s)
    }
}

/// A predicate operand: either a literal or a positional parameter placeholder (`?`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    Literal(ScalarValue),
    /// Zero-based index into the statement's bound parameters.
    Parameter(usize),
}

impl Operand {
    pub fn literal(&self) -> Option<&ScalarValue> {
        match self {
            Operand::Literal(v) => Some(v),
            Operand::Parameter(_) => None,
        }
    }

    /// Look up the operand's value, using `parameters` for placeholders.
    pub fn resolve<'a>(&'a self, parameters: &'a [ScalarValue]) -> Result<&'a ScalarValue> {
        match self {
            Operand::Literal(v) => Ok(v),
            Operand::Parameter(index) => {
                parameters
                    .get(*index)
                    .ok_or(OptimizeError::ParameterOutOfRange {
                        index: *index,
                        count: parameters.len(),
                    })
            }
        }
    }
}

impl From<ScalarValue> for Operand {
    fn from(v: ScalarValue) -> Self {
        Operand::Literal(v)
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Literal(ScalarValue::Int64(v))
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Literal(ScalarValue::Int64(v as i64))
    }
}

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Operand::Literal(ScalarValue::utf8(v))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{}", v),
            Operand::Parameter(i) => write!(f, "?{}", i),
        }
    }
}

/// A single column-comparison constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Predicate {
    pub column: Column,
    pub op: CompareOp,
    /// One operand for comparisons, two for `BETWEEN` (low, high), one or more for `IN`.
    pub operands: Vec<Operand>,
}

impl Predicate {
    pub fn new(column: Column, op: CompareOp, operands: Vec<Operand>) -> Self {
        Self {
            column,
            op,
            operands,
        }
    }

    pub fn eq(column: Column, value: impl Into<Operand>) -> Self {
        Self::new(column, CompareOp::Eq, vec![value.into()])
    }

    pub fn lt(column: Column, value: impl Into<Operand>) -> Self {
        Self::new(column, CompareOp::Lt, vec![value.into()])
    }

    pub fn lt_eq(column: Column, value: impl Into<Operand>) -> Self {
        Self::new(column, CompareOp::LtEq, vec![value.into()])
    }

    pub fn gt(column: Column, value: impl Into<Operand>) -> Self {
        Self::new(column, CompareOp::Gt, vec![value.into()])
    }

    pub fn gt_eq(column: Column, value: impl Into<Operand>) -> Self {
        Self::new(column, CompareOp::GtEq, vec![value.into()])
    }

    pub fn in_list(column: Column, values: Vec<Operand>) -> Self {
        Self::new(column, CompareOp::In, values)
    }

    pub fn between(column: Column, low: impl Into<Operand>, high: impl Into<Operand>) -> Self {
        Self::new(column, CompareOp::Between, vec![low.into(), high.into()])
    }

    /// Whether the operand count matches the operator.
    pub fn is_well_formed(&self) -> bool {
        self.op.accepts_arity(self.operands.len())
    }

    fn single_literal(&self) -> Option<&ScalarValue> {
        match self.operands.as_slice() {
            [Operand::Literal(v)] if !v.is_null() => Some(v),
            _ => None,
        }
    }

    fn merge_key(&self) -> Option<MergeKey> {
        let family = self.single_literal()?.family()?;
        match self.op {
            CompareOp::Eq => Some(MergeKey::Equal(self.column.clone())),
            CompareOp::Lt | CompareOp::LtEq => Some(MergeKey::Upper(self.column.clone(), family)),
            CompareOp::Gt | CompareOp::GtEq => Some(MergeKey::Lower(self.column.clone(), family)),
            CompareOp::In | CompareOp::Between => None,
        }
    }

    fn evaluate(&self, binding: &Binding) -> bool {
        let Some(value) = binding.column(&self.column) else {
            return false;
        };
        let mut operands = Vec::with_capacity(self.operands.len());
        for operand in &self.operands {
            match operand.resolve(binding.parameters()) {
                Ok(v) => operands.push(v),
                Err(_) => return false,
            }
        }
        match (self.op, operands.as_slice()) {
            (CompareOp::Eq, [o]) => value.sql_eq(o),
            (CompareOp::Lt, [o]) => value.compare(o) == Some(Ordering::Less),
            (CompareOp::LtEq, [o]) => {
                matches!(value.compare(o), Some(Ordering::Less | Ordering::Equal))
            }
            (CompareOp::Gt, [o]) => value.compare(o) == Some(Ordering::Greater),
            (CompareOp::GtEq, [o]) => {
                matches!(value.compare(o), Some(Ordering::Greater | Ordering::Equal))
            }
            (CompareOp::In, list) => list.iter().any(|o| value.sql_eq(o)),
            (CompareOp::Between, [low, high]) => {
                matches!(value.compare(low), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(value.compare(high), Some(Ordering::Less | Ordering::Equal))
            }
            _ => false,
        }
    }

    fn bind(&self, parameters: &[ScalarValue]) -> Result<Predicate> {
        let operands = self
            .operands
            .iter()
            .map(|o| o.resolve(parameters).cloned().map(Operand::Literal))
            .collect::<Result<Vec<_>>>()?;
        Ok(Predicate {
            column: self.column.clone(),
            op: self.op,
            operands,
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.op, self.operands.as_slice()) {
            (CompareOp::Between, [low, high]) => {
                write!(f, "{} BETWEEN {} AND {}", self.column, low, high)
            }
            (CompareOp::In, list) => {
                let items: Vec<String> = list.iter().map(|o| o.to_string()).collect();
                write!(f, "{} IN ({})", self.column, items.join(", "))
            }
            (op, [o]) => write!(f, "{} {} {}", self.column, op, o),
            (op, _) => write!(f, "{} {} <malformed>", self.column, op),
        }
    }
}

/// Boolean connective used by [`ConditionTree::combine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connective {
    And,
    Or,
}

/// A node of a condition tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Leaf(Predicate),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    fn validate(&self) -> Result<()> {
        match self {
            Condition::Leaf(p) if p.is_well_formed() => Ok(()),
            Condition::Leaf(p) => Err(OptimizeError::UnsupportedStatementShape(format!(
                "predicate `{}` has {} operands",
                p,
                p.operands.len()
            ))),
            Condition::And(children) | Condition::Or(children) => {
                if children.is_empty() {
                    return Err(OptimizeError::UnsupportedStatementShape(
                        "AND/OR group without children".to_string(),
                    ));
                }
                children.iter().try_for_each(Condition::validate)
            }
        }
    }

    fn evaluate(&self, binding: &Binding) -> bool {
        match self {
            Condition::Leaf(p) => p.evaluate(binding),
            Condition::And(children) => children.iter().all(|c| c.evaluate(binding)),
            Condition::Or(children) => children.iter().any(|c| c.evaluate(binding)),
        }
    }

    fn optimize(self) -> Result<Condition> {
        match self {
            Condition::Leaf(p) => Ok(Condition::Leaf(p)),
            Condition::And(children) => {
                let flat = flatten(children, Connective::And)?;
                let merged = merge_conjuncts(flat)?;
                Ok(collapse(merged, Connective::And))
            }
            Condition::Or(children) => {
                let flat = flatten(children, Connective::Or)?;
                Ok(collapse(flat, Connective::Or))
            }
        }
    }

    fn bind(&self, parameters: &[ScalarValue]) -> Result<Condition> {
        Ok(match self {
            Condition::Leaf(p) => Condition::Leaf(p.bind(parameters)?),
            Condition::And(children) => Condition::And(
                children
                    .iter()
                    .map(|c| c.bind(parameters))
                    .collect::<Result<_>>()?,
            ),
            Condition::Or(children) => Condition::Or(
                children
                    .iter()
                    .map(|c| c.bind(parameters))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            Condition::Leaf(p) => out.push(p),
            Condition::And(children) | Condition::Or(children) => {
                for c in children {
                    c.collect_leaves(out);
                }
            }
        }
    }
}

impl From<Predicate> for Condition {
    fn from(p: Predicate) -> Self {
        Condition::Leaf(p)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (children, sep) = match self {
            Condition::Leaf(p) => return write!(f, "{}", p),
            Condition::And(children) => (children, " AND "),
            Condition::Or(children) => (children, " OR "),
        };
        let parts: Vec<String> = children.iter().map(|c| c.to_string()).collect();
        write!(f, "({})", parts.join(sep))
    }
}

/// Optimize every child and splice same-kind grandchildren into the parent.
fn flatten(children: Vec<Condition>, connective: Connective) -> Result<Vec<Condition>> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match (child.optimize()?, connective) {
            (Condition::And(grandchildren), Connective::And)
            | (Condition::Or(grandchildren), Connective::Or) => out.extend(grandchildren),
            (other, _) => out.push(other),
        }
    }
    Ok(out)
}

fn collapse(mut children: Vec<Condition>, connective: Connective) -> Condition {
    if children.len() == 1 {
        return children.remove(0);
    }
    match connective {
        Connective::And => Condition::And(children),
        Connective::Or => Condition::Or(children),
    }
}

/// Group of conjunct leaves that can be folded into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MergeKey {
    Equal(Column),
    Upper(Column, ValueFamily),
    Lower(Column, ValueFamily),
}

fn merge_conjuncts(children: Vec<Condition>) -> Result<Vec<Condition>> {
    let mut out: Vec<Condition> = Vec::with_capacity(children.len());
    let mut slots: HashMap<MergeKey, usize> = HashMap::new();
    for child in children {
        let incoming = match child {
            Condition::Leaf(p) => p,
            other => {
                out.push(other);
                continue;
            }
        };
        let Some(key) = incoming.merge_key() else {
            out.push(Condition::Leaf(incoming));
            continue;
        };
        let Some(slot) = slots.get(&key).copied() else {
            slots.insert(key, out.len());
            out.push(Condition::Leaf(incoming));
            continue;
        };
        if let Condition::Leaf(kept) = &mut out[slot] {
            if tighter(&key, kept, &incoming)? {
                trace!("Tightened {} to {}", kept, incoming);
                *kept = incoming;
            }
        }
    }
    Ok(out)
}

/// Whether `incoming` should replace `kept` in their merge group.
fn tighter(key: &MergeKey, kept: &Predicate, incoming: &Predicate) -> Result<bool> {
    let (Some(kept_value), Some(new_value)) = (kept.single_literal(), incoming.single_literal())
    else {
        return Ok(false);
    };
    let ordering = new_value.compare(kept_value);
    match key {
        MergeKey::Equal(column) => {
            if ordering == Some(Ordering::Equal) {
                Ok(false)
            } else {
                Err(OptimizeError::UnsatisfiableCondition {
                    column: column.clone(),
                })
            }
        }
        MergeKey::Upper(..) => Ok(match ordering {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => incoming.op == CompareOp::Lt && kept.op == CompareOp::LtEq,
            _ => false,
        }),
        MergeKey::Lower(..) => Ok(match ordering {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => incoming.op == CompareOp::Gt && kept.op == CompareOp::GtEq,
            _ => false,
        }),
    }
}

/// The condition tree of a statement, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Option<Condition>", into = "Option<Condition>")]
pub struct ConditionTree {
    root: Option<Condition>,
}

impl ConditionTree {
    /// The tree of a statement without a filter clause.
    pub fn empty() -> Self {
        Self { root: None }
    }

    /// Wrap a condition, rejecting empty AND/OR groups and malformed leaves.
    pub fn new(root: Condition) -> Result<Self> {
        root.validate()?;
        Ok(Self { root: Some(root) })
    }

    pub fn leaf(predicate: Predicate) -> Self {
        Self {
            root: Some(Condition::Leaf(predicate)),
        }
    }

    /// AND of the given leaves: empty for none, a bare leaf for one.
    pub fn conjunction(mut predicates: Vec<Predicate>) -> Self {
        let root = match predicates.len() {
            0 => None,
            1 => Some(Condition::Leaf(predicates.remove(0))),
            _ => Some(Condition::And(
                predicates.into_iter().map(Condition::Leaf).collect(),
            )),
        };
        Self { root }
    }

    pub fn root(&self) -> Option<&Condition> {
        self.root.as_ref()
    }

    pub fn into_root(self) -> Option<Condition> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Build `left <connective> right`. An empty side yields the other side unchanged.
    pub fn combine(left: ConditionTree, connective: Connective, right: ConditionTree) -> Self {
        match (left.root, right.root) {
            (None, root) | (root, None) => Self { root },
            (Some(l), Some(r)) => {
                let children = vec![l, r];
                Self {
                    root: Some(match connective {
                        Connective::And => Condition::And(children),
                        Connective::Or => Condition::Or(children),
                    }),
                }
            }
        }
    }

    pub fn and(self, other: ConditionTree) -> Self {
        Self::combine(self, Connective::And, other)
    }

    pub fn or(self, other: ConditionTree) -> Self {
        Self::combine(self, Connective::Or, other)
    }

    /// Flatten and merge the tree (see the module docs). Idempotent.
    pub fn optimize(&self) -> Result<Self> {
        match &self.root {
            None => Ok(Self::empty()),
            Some(root) => Ok(Self {
                root: Some(root.clone().optimize()?),
            }),
        }
    }

    /// Replace every parameter placeholder with its bound value.
    pub fn bind_parameters(&self, parameters: &[ScalarValue]) -> Result<Self> {
        match &self.root {
            None => Ok(Self::empty()),
            Some(root) => Ok(Self {
                root: Some(root.bind(parameters)?),
            }),
        }
    }

    pub fn is_satisfied_by(&self, binding: &Binding) -> bool {
        self.root.as_ref().map_or(true, |r| r.evaluate(binding))
    }

    /// All predicate leaves in depth-first order.
    pub fn leaves(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.collect_leaves(&mut out);
        }
        out
    }

    /// Distinct referenced columns, in first-seen order.
    pub fn columns(&self) -> Vec<&Column> {
        let mut out: Vec<&Column> = Vec::new();
        for leaf in self.leaves() {
            if !out.contains(&&leaf.column) {
                out.push(&leaf.column);
            }
        }
        out
    }
}

impl From<Predicate> for ConditionTree {
    fn from(p: Predicate) -> Self {
        Self::leaf(p)
    }
}

impl TryFrom<Option<Condition>> for ConditionTree {
    type Error = OptimizeError;

    fn try_from(root: Option<Condition>) -> Result<Self> {
        match root {
            None => Ok(Self::empty()),
            Some(root) => Self::new(root),
        }
    }
}

impl From<ConditionTree> for Option<Condition> {
    fn from(tree: ConditionTree) -> Self {
        tree.root
    }
}

impl fmt::Display for ConditionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            None => f.write_str("<empty>"),
            Some(root) => write!(f, "{}", root),
        }
    }
}

/// Column and parameter values a condition tree is evaluated against.
///
/// A column missing from the binding behaves like SQL NULL: no comparison on it holds.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    columns: HashMap<Column, ScalarValue>,
    parameters: Vec<ScalarValue>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, column: Column, value: impl Into<ScalarValue>) -> Self {
        self.columns.insert(column, value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<ScalarValue>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn column(&self, column: &Column) -> Option<&ScalarValue> {
        self.columns.get(column)
    }

    pub fn parameters(&self) -> &[ScalarValue] {
        &self.parameters
    }
}
