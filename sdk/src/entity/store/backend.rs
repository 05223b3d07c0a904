//! Storage backend abstraction for entity stores

use crate::entity::query::{FieldQuery, QueryResult};
use crate::entity::record::{Record, RecordHandle};
use crate::entity::schema::TypeSchema;
use crate::entity::types::{DecoratorResult, RecordId};

/// Capabilities the host content store provides.
///
/// Node-like and generic entity types are told apart through
/// [`TypeSchema::storage`]; backends branch on it internally so callers
/// see one creation and one deletion primitive.
pub trait StorageBackend {
    /// A new, unsaved record of the given bundle with the type's defaults applied
    fn create(&self, schema: &'static TypeSchema, bundle: &str) -> DecoratorResult<Record>;

    /// Load records by ID, in the order requested. Missing IDs are skipped.
    ///
    /// Every call returns fresh handles. Records referenced from the loaded
    /// ones are resolved within the same call, so a record reachable twice
    /// is the same handle both times.
    fn load(&self, schema: &'static TypeSchema, ids: &[RecordId])
        -> DecoratorResult<Vec<RecordHandle>>;

    /// Insert or update a record, assigning an ID to new ones
    fn save(&self, record: &mut Record) -> DecoratorResult<RecordId>;

    /// Delete records by ID
    fn delete(&self, schema: &'static TypeSchema, ids: &[RecordId]) -> DecoratorResult<()>;

    /// Run a query, returning matching IDs grouped by entity type
    fn execute(&self, query: &FieldQuery) -> DecoratorResult<QueryResult>;
}
