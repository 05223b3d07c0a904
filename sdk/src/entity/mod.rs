//! Entity decorator framework
//!
//! Typed decorators over raw content records. A decorator declares the entity
//! type and bundle it wraps; finders build field queries against a
//! [`Store`] and hand back decorated results.

pub mod dispatch;
pub mod finder;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types and traits
pub use dispatch::{Accessor, FinderCall, resolve_accessor, resolve_finder};
pub use finder::{Dispatched, Finder};
pub use query::{Condition, Direction, FieldQuery, Operator, OrderClause, QueryResult, Range};
pub use record::{FieldAccessible, Invoke, Record, RecordHandle};
pub use schema::{AttributeKind, NODE, StorageKind, TAXONOMY_TERM, TypeSchema, USER};
pub use store::{StorageBackend, Store};
pub use traits::{Decorated, Decorator, dispatch_call};
pub use types::{DecoratorError, DecoratorResult, RecordId, Value};
