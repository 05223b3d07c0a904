//! Field finders returning decorated results

use crate::entity::dispatch::{FinderCall, resolve_finder};
use crate::entity::query::{Condition, Direction, FieldQuery, Operator, OrderClause, Range};
use crate::entity::schema::{AttributeKind, TypeSchema};
use crate::entity::store::{StorageBackend, Store};
use crate::entity::traits::Decorator;
use crate::entity::types::{DecoratorError, DecoratorResult, Value};
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Builds one filtered query for a decorator type and runs it once.
///
/// Every builder method consumes the finder and hands it back, and every
/// execution method consumes it for good.
pub struct Finder<'s, D, B: StorageBackend> {
    store: &'s Store<B>,
    query: FieldQuery,
    _decorator: PhantomData<fn() -> D>,
}

/// Outcome of a name-dispatched finder call
pub enum Dispatched<'s, D, B: StorageBackend> {
    /// `find_by_<attr>`: a finder ready for more conditions or execution
    Finder(Finder<'s, D, B>),
    /// `find_first_by_<attr>`: the first match, if any
    First(Option<D>),
}

impl<'s, D, B: StorageBackend> Dispatched<'s, D, B> {
    pub fn into_finder(self) -> Option<Finder<'s, D, B>> {
        match self {
            Dispatched::Finder(finder) => Some(finder),
            Dispatched::First(_) => None,
        }
    }

    pub fn into_first(self) -> Option<Option<D>> {
        match self {
            Dispatched::First(first) => Some(first),
            Dispatched::Finder(_) => None,
        }
    }
}

impl<D, B: StorageBackend> fmt::Debug for Dispatched<'_, D, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatched::Finder(finder) => f.debug_tuple("Finder").field(finder).finish(),
            Dispatched::First(first) => f
                .debug_tuple("First")
                .field(&first.as_ref().map(|_| ".."))
                .finish(),
        }
    }
}

/// Operator for a condition value, or `None` when the condition is skipped
fn operator_for(value: &Value) -> DecoratorResult<Option<Operator>> {
    match value {
        Value::List(items) if items.is_empty() => Ok(None),
        Value::List(items) => match items.iter().find(|item| !item.is_scalar()) {
            Some(item) => Err(DecoratorError::unsupported_argument(format!(
                "list items must be scalars, got {}",
                item.type_name()
            ))),
            None => Ok(Some(Operator::In)),
        },
        scalar if scalar.is_scalar() => Ok(Some(Operator::Eq)),
        other => Err(DecoratorError::unsupported_argument(format!(
            "got {}",
            other.type_name()
        ))),
    }
}

impl<'s, D: Decorator, B: StorageBackend> Finder<'s, D, B> {
    /// A query scoped to the entity type and bundle
    pub fn new(store: &'s Store<B>, schema: &'static TypeSchema, bundle: &str) -> Self {
        Self {
            store,
            query: FieldQuery::new(schema, bundle),
            _decorator: PhantomData,
        }
    }

    pub fn query(&self) -> &FieldQuery {
        &self.query
    }

    fn resolve(&self, name: &str) -> DecoratorResult<AttributeKind> {
        let schema = self.query.schema();
        schema
            .kind_of(name)
            .ok_or_else(|| DecoratorError::unknown_attribute(schema.entity_type, name))
    }

    /// Match records whose attribute equals a scalar or is one of a list of scalars.
    ///
    /// An empty list adds no condition at all.
    pub fn find_by(mut self, name: &str, value: impl Into<Value>) -> DecoratorResult<Self> {
        let value = value.into();
        let Some(operator) = operator_for(&value)? else {
            warn!(
                entity_type = self.query.entity_type(),
                attribute = name,
                "empty value list, condition skipped"
            );
            return Ok(self);
        };
        let kind = self.resolve(name)?;
        self.query.add_condition(Condition {
            name: name.to_string(),
            kind,
            operator,
            value,
        });
        Ok(self)
    }

    /// Order results by an attribute. Later calls break ties of earlier ones.
    pub fn order_by(mut self, name: &str, direction: Direction) -> DecoratorResult<Self> {
        let kind = self.resolve(name)?;
        self.query.add_order(OrderClause {
            name: name.to_string(),
            kind,
            direction,
        });
        Ok(self)
    }

    pub fn order_by_asc(self, name: &str) -> DecoratorResult<Self> {
        self.order_by(name, Direction::Asc)
    }

    /// Restrict results to `limit` matches after skipping `offset`
    pub fn range(mut self, offset: usize, limit: usize) -> Self {
        self.query.set_range(Range { offset, limit });
        self
    }

    pub fn find_first_by(self, name: &str, value: impl Into<Value>) -> DecoratorResult<Option<D>> {
        self.find_by(name, value)?.first()
    }

    /// Run the query and decorate every match, in the store's result order
    pub fn execute(self) -> DecoratorResult<Vec<D>> {
        let result = self.store.execute(&self.query)?;
        let Some(ids) = result.ids_for(self.query.entity_type()) else {
            return Ok(vec![]);
        };
        let records = self.store.load_many(self.query.schema(), ids)?;
        debug!(
            decorator = D::class_name(),
            count = records.len(),
            "finder executed"
        );
        Ok(records.into_iter().map(D::build_from_record).collect())
    }

    /// Run the query and decorate only the first match
    pub fn first(self) -> DecoratorResult<Option<D>> {
        let result = self.store.execute(&self.query)?;
        let Some(&id) = result
            .ids_for(self.query.entity_type())
            .and_then(<[_]>::first)
        else {
            return Ok(None);
        };
        Ok(self.store.load(self.query.schema(), id)?.map(D::build_from_record))
    }

    /// Number of matches, without loading records
    pub fn count(self) -> DecoratorResult<usize> {
        let result = self.store.execute(&self.query)?;
        Ok(result
            .ids_for(self.query.entity_type())
            .map_or(0, <[_]>::len))
    }

    /// Name-based dispatch of `find_by_<attr>` and `find_first_by_<attr>`
    pub fn call(self, name: &str, value: impl Into<Value>) -> DecoratorResult<Dispatched<'s, D, B>> {
        match resolve_finder(name) {
            FinderCall::FindBy(attr) => self.find_by(attr, value).map(Dispatched::Finder),
            FinderCall::FindFirstBy(attr) => self.find_first_by(attr, value).map(Dispatched::First),
            FinderCall::Unmatched => Err(DecoratorError::no_such_method("Finder", name)),
        }
    }
}

impl<D, B: StorageBackend> fmt::Debug for Finder<'_, D, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finder")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_uses_equality() {
        assert_eq!(operator_for(&Value::from(1)).unwrap(), Some(Operator::Eq));
        assert_eq!(operator_for(&Value::from("x")).unwrap(), Some(Operator::Eq));
    }

    #[test]
    fn list_uses_membership() {
        assert_eq!(
            operator_for(&Value::from(vec![1, 2])).unwrap(),
            Some(Operator::In)
        );
    }

    #[test]
    fn empty_list_is_skipped() {
        assert_eq!(operator_for(&Value::List(vec![])).unwrap(), None);
    }

    #[test]
    fn null_and_nested_values_are_rejected() {
        assert!(matches!(
            operator_for(&Value::Null),
            Err(DecoratorError::UnsupportedArgument { .. })
        ));
        assert!(matches!(
            operator_for(&Value::List(vec![Value::List(vec![])])),
            Err(DecoratorError::UnsupportedArgument { .. })
        ));
    }
}
