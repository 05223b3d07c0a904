//! Core traits for the entity decorator layer

use crate::entity::dispatch::{Accessor, FinderCall, resolve_accessor, resolve_finder};
use crate::entity::finder::{Dispatched, Finder};
use crate::entity::record::{FieldAccessible, Invoke, Record, RecordHandle};
use crate::entity::schema::TypeSchema;
use crate::entity::store::{StorageBackend, Store};
use crate::entity::types::{DecoratorError, DecoratorResult, RecordId, Value};
use std::cell::{Ref, RefMut};

/// Typed wrapper around exactly one raw record.
///
/// Implementors declare which entity type and bundle they wrap and how to
/// build themselves from a record handle; every finder, accessor and
/// persistence operation is provided on top of that. Use
/// [`decorator!`](crate::decorator) to declare one.
///
/// ```ignore
/// decorator! {
///     pub struct Article { schema: &NODE, bundle: "article" }
/// }
///
/// let published = Article::find_by(&store, "status", vec![1])?.execute()?;
/// let author: Decorated<User> = published[0].get_decorated("uid")?;
/// ```
pub trait Decorator: Sized {
    /// Entity type this decorator wraps
    const SCHEMA: &'static TypeSchema;

    /// Bundle within the entity type
    const BUNDLE: &'static str;

    /// Wrap a record. Finder results and decorated attribute values are
    /// built through this, so it always yields the implementing type.
    fn build_from_record(record: RecordHandle) -> Self;

    /// The wrapped record
    fn record(&self) -> &RecordHandle;

    /// Name used in dispatch errors
    fn class_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Wrap the given record, or create a new one when none is given
    fn construct<B: StorageBackend>(
        store: &Store<B>,
        record: Option<RecordHandle>,
    ) -> DecoratorResult<Self> {
        match record {
            Some(record) => Ok(Self::build_from_record(record)),
            None => Self::create(store),
        }
    }

    /// A decorator over a new, unsaved record of this type and bundle
    fn create<B: StorageBackend>(store: &Store<B>) -> DecoratorResult<Self> {
        let record = store.create(Self::SCHEMA, Self::BUNDLE)?;
        Ok(Self::wrap(record))
    }

    /// Take ownership of a record and wrap it
    fn wrap(record: Record) -> Self {
        Self::build_from_record(record.into_handle())
    }

    /// An empty finder scoped to this type and bundle
    fn finder<B: StorageBackend>(store: &Store<B>) -> Finder<'_, Self, B> {
        Finder::new(store, Self::SCHEMA, Self::BUNDLE)
    }

    /// Look up by identifier
    fn find<B: StorageBackend>(
        store: &Store<B>,
        id: impl Into<RecordId>,
    ) -> DecoratorResult<Option<Self>> {
        let id = id.into();
        Self::find_by(store, Self::SCHEMA.id_key, vec![Value::from(id)])?.first()
    }

    fn find_by<'s, B: StorageBackend>(
        store: &'s Store<B>,
        name: &str,
        value: impl Into<Value>,
    ) -> DecoratorResult<Finder<'s, Self, B>> {
        Self::finder(store).find_by(name, value)
    }

    fn find_first_by<B: StorageBackend>(
        store: &Store<B>,
        name: &str,
        value: impl Into<Value>,
    ) -> DecoratorResult<Option<Self>> {
        Self::finder(store).find_first_by(name, value)
    }

    /// Name-based dispatch of `find_by_<attr>` and `find_first_by_<attr>`
    fn call_static<'s, B: StorageBackend>(
        store: &'s Store<B>,
        name: &str,
        value: impl Into<Value>,
    ) -> DecoratorResult<Dispatched<'s, Self, B>> {
        match resolve_finder(name) {
            FinderCall::FindBy(attr) => Self::find_by(store, attr, value).map(Dispatched::Finder),
            FinderCall::FindFirstBy(attr) => {
                Self::find_first_by(store, attr, value).map(Dispatched::First)
            }
            FinderCall::Unmatched => {
                Err(DecoratorError::static_method_not_found(Self::class_name(), name))
            }
        }
    }

    fn id(&self) -> Option<RecordId> {
        self.record().borrow().id()
    }

    /// Read a property or field
    fn get(&self, name: &str) -> DecoratorResult<Value> {
        self.record().borrow().get(name)
    }

    /// Write a property or field
    fn set(&self, name: &str, value: impl Into<Value>) -> DecoratorResult<()> {
        self.record().borrow_mut().set(name, value.into())
    }

    fn has(&self, name: &str) -> bool {
        self.record().borrow().has(name)
    }

    /// Read an attribute, wrapping nested records in `T`
    fn get_decorated<T: Decorator>(&self, name: &str) -> DecoratorResult<Decorated<T>> {
        Ok(Decorated::from_value(self.get(name)?))
    }

    /// Persist the record's current state
    fn save<B: StorageBackend>(&self, store: &Store<B>) -> DecoratorResult<RecordId> {
        store.save(&mut self.record().borrow_mut())
    }

    /// Remove the record from the store. The wrapper keeps its in-memory state.
    fn delete<B: StorageBackend>(&self, store: &Store<B>) -> DecoratorResult<()> {
        let id = self.id().ok_or_else(|| {
            DecoratorError::store(Self::SCHEMA.entity_type, "delete", "record has not been saved")
        })?;
        store.delete(Self::SCHEMA, id)
    }

    /// Name-based dispatch: `get_<attr>`, `set_<attr>`, then the record's
    /// own methods. Overrides can fall back to [`dispatch_call`].
    fn call(&self, name: &str, args: &[Value]) -> DecoratorResult<Value> {
        dispatch_call(self, name, args)
    }

    /// Raw attribute of the wrapped record, bypassing the schema
    fn property(&self, name: &str) -> Option<Ref<'_, Value>> {
        Ref::filter_map(self.record().borrow(), |record| record.attribute(name)).ok()
    }

    /// Mutable raw attribute, for in-place edits of nested values
    fn property_mut(&self, name: &str) -> Option<RefMut<'_, Value>> {
        RefMut::filter_map(self.record().borrow_mut(), |record| record.attribute_mut(name)).ok()
    }

    fn set_property(&self, name: &str, value: impl Into<Value>) {
        self.record().borrow_mut().set_attribute(name, value.into());
    }

    /// Present and not blank
    fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some_and(|value| !value.is_blank())
    }

    fn unset_property(&self, name: &str) -> Option<Value> {
        self.record().borrow_mut().remove_attribute(name)
    }
}

/// Default name-based dispatch shared by every decorator
pub fn dispatch_call<D: Decorator>(decorator: &D, name: &str, args: &[Value]) -> DecoratorResult<Value> {
    match resolve_accessor(name) {
        Accessor::Get(attr) => decorator.get(attr),
        Accessor::Set(attr) => {
            let value = args
                .first()
                .cloned()
                .ok_or_else(|| DecoratorError::missing_argument(D::class_name(), name))?;
            decorator.set(attr, value)?;
            Ok(Value::Null)
        }
        Accessor::Method(method) => decorator
            .record()
            .borrow_mut()
            .invoke(method, args)
            .unwrap_or_else(|| Err(DecoratorError::method_not_found(D::class_name(), name))),
    }
}

/// Attribute value with nested records wrapped in a decorator
#[derive(Debug, Clone)]
pub enum Decorated<T> {
    /// The attribute held a single record
    Entity(T),
    /// The attribute held a list; record items are wrapped, others kept as is
    List(Vec<Decorated<T>>),
    /// Anything else, unchanged
    Value(Value),
}

impl<T: Decorator> Decorated<T> {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Record(record) => Decorated::Entity(T::build_from_record(record)),
            Value::List(items) => Decorated::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Record(record) => Decorated::Entity(T::build_from_record(record)),
                        other => Decorated::Value(other),
                    })
                    .collect(),
            ),
            other => Decorated::Value(other),
        }
    }
}

impl<T> Decorated<T> {
    pub fn into_entity(self) -> Option<T> {
        match self {
            Decorated::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Decorated<T>>> {
        match self {
            Decorated::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Decorated::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Every wrapped entity, dropping raw values
    pub fn entities(self) -> Vec<T> {
        match self {
            Decorated::Entity(entity) => vec![entity],
            Decorated::List(items) => items.into_iter().flat_map(Decorated::entities).collect(),
            Decorated::Value(_) => vec![],
        }
    }
}

/// Declare a decorator struct for an entity type and bundle.
///
/// ```ignore
/// decorator! {
///     /// Published and draft articles
///     pub struct Article { schema: &NODE, bundle: "article" }
/// }
/// ```
#[macro_export]
macro_rules! decorator {
    ($(#[$meta:meta])* $vis:vis struct $name:ident { schema: $schema:expr, bundle: $bundle:expr $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            record: $crate::entity::RecordHandle,
        }

        impl $crate::entity::Decorator for $name {
            const SCHEMA: &'static $crate::entity::TypeSchema = $schema;
            const BUNDLE: &'static str = $bundle;

            fn build_from_record(record: $crate::entity::RecordHandle) -> Self {
                Self { record }
            }

            fn record(&self) -> &$crate::entity::RecordHandle {
                &self.record
            }

            fn class_name() -> &'static str {
                stringify!($name)
            }
        }
    };
}
