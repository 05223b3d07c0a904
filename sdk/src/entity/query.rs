//! Field queries handed to storage backends

use crate::entity::record::Record;
use crate::entity::schema::{AttributeKind, TypeSchema};
use crate::entity::types::{DecoratorError, RecordId, Value};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Comparison applied by a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// `=`
    Eq,
    /// `IN`
    In,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::In => write!(f, "IN"),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = DecoratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            other => Err(DecoratorError::unsupported_argument(format!(
                "unknown sort direction '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

/// One filter on a property or field
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub name: String,
    pub kind: AttributeKind,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn matches(&self, record: &Record) -> bool {
        let Some(stored) = record.value_of(&self.name, self.kind) else {
            return false;
        };
        // Multi-value attributes match when any item does
        let candidates: &[Value] = match stored {
            Value::List(items) => items,
            single => std::slice::from_ref(single),
        };
        candidates.iter().any(|candidate| match self.operator {
            Operator::Eq => candidate.matches(&self.value),
            Operator::In => self
                .value
                .as_list()
                .is_some_and(|wanted| wanted.iter().any(|w| candidate.matches(w))),
        })
    }
}

/// One ordering directive
#[derive(Debug, Clone, PartialEq)]
pub struct OrderClause {
    pub name: String,
    pub kind: AttributeKind,
    pub direction: Direction,
}

impl OrderClause {
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let key = |record: &Record| -> Value {
            match record.value_of(&self.name, self.kind) {
                Some(Value::List(items)) => items.first().cloned().unwrap_or_default(),
                Some(value) => value.clone(),
                None => Value::Null,
            }
        };
        let ord = key(a).compare(&key(b));
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

/// Window over the ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub offset: usize,
    pub limit: usize,
}

/// Filter query over one entity type and bundle
#[derive(Debug, Clone)]
pub struct FieldQuery {
    schema: &'static TypeSchema,
    bundle: String,
    conditions: SmallVec<[Condition; 4]>,
    order: SmallVec<[OrderClause; 2]>,
    range: Option<Range>,
}

impl FieldQuery {
    pub fn new(schema: &'static TypeSchema, bundle: &str) -> Self {
        Self {
            schema,
            bundle: bundle.to_string(),
            conditions: SmallVec::new(),
            order: SmallVec::new(),
            range: None,
        }
    }

    pub fn schema(&self) -> &'static TypeSchema {
        self.schema
    }

    pub fn entity_type(&self) -> &'static str {
        self.schema.entity_type
    }

    pub fn bundle(&self) -> &str {
        &self.bundle
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn order(&self) -> &[OrderClause] {
        &self.order
    }

    pub fn range(&self) -> Option<Range> {
        self.range
    }

    pub fn add_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn add_order(&mut self, clause: OrderClause) {
        self.order.push(clause);
    }

    pub fn set_range(&mut self, range: Range) {
        self.range = Some(range);
    }

    /// Entity type, bundle and every condition hold for the record
    pub fn matches(&self, record: &Record) -> bool {
        record.entity_type() == self.entity_type()
            && record.bundle() == Some(self.bundle.as_str())
            && self.conditions.iter().all(|c| c.matches(record))
    }

    /// Compare two records by the ordering clauses, in declaration order
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        self.order
            .iter()
            .map(|clause| clause.compare(a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for FieldQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.entity_type(), self.bundle)?;
        for c in &self.conditions {
            write!(f, " {} {} {:?}", c.name, c.operator, c.value)?;
        }
        for o in &self.order {
            write!(f, " ORDER BY {} {}", o.name, o.direction)?;
        }
        if let Some(range) = self.range {
            write!(f, " RANGE {}+{}", range.offset, range.limit)?;
        }
        Ok(())
    }
}

/// Matching record IDs grouped by entity type, in result order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    ids: BTreeMap<String, Vec<RecordId>>,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the matches for an entity type. Empty sets leave no entry.
    pub fn insert(&mut self, entity_type: &str, ids: Vec<RecordId>) {
        if !ids.is_empty() {
            self.ids.insert(entity_type.to_string(), ids);
        }
    }

    pub fn ids_for(&self, entity_type: &str) -> Option<&[RecordId]> {
        self.ids.get(entity_type).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
