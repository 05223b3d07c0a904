//! Core store implementation for entities

use crate::entity::query::{FieldQuery, QueryResult};
use crate::entity::record::{Record, RecordHandle};
use crate::entity::schema::TypeSchema;
use crate::entity::store::StorageBackend;
use crate::entity::types::{DecoratorError, DecoratorResult, RecordId};
use tracing::debug;

/// Store implementation that uses a storage backend
pub struct Store<B: StorageBackend> {
    /// Storage backend
    backend: B,
}

impl<B: StorageBackend> Store<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// A new, unsaved record
    pub fn create(&self, schema: &'static TypeSchema, bundle: &str) -> DecoratorResult<Record> {
        debug!(entity_type = schema.entity_type, bundle, "create");
        let record = self.backend.create(schema, bundle)?;
        if record.entity_type() != schema.entity_type {
            return Err(DecoratorError::store(
                schema.entity_type,
                "create",
                format!("backend returned a '{}' record", record.entity_type()),
            ));
        }
        Ok(record)
    }

    /// Load a single record
    pub fn load(
        &self,
        schema: &'static TypeSchema,
        id: RecordId,
    ) -> DecoratorResult<Option<RecordHandle>> {
        debug!(entity_type = schema.entity_type, %id, "load");
        Ok(self.backend.load(schema, &[id])?.into_iter().next())
    }

    /// Load a single record, failing when it does not exist
    pub fn load_existing(
        &self,
        schema: &'static TypeSchema,
        id: RecordId,
    ) -> DecoratorResult<RecordHandle> {
        self.load(schema, id)?
            .ok_or_else(|| DecoratorError::not_found(schema.entity_type, id))
    }

    /// Load several records, preserving the order of `ids`
    pub fn load_many(
        &self,
        schema: &'static TypeSchema,
        ids: &[RecordId],
    ) -> DecoratorResult<Vec<RecordHandle>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        debug!(entity_type = schema.entity_type, count = ids.len(), "load_many");
        self.backend.load(schema, ids)
    }

    /// Persist the record's current state, returning its ID
    pub fn save(&self, record: &mut Record) -> DecoratorResult<RecordId> {
        let id = self.backend.save(record)?;
        debug!(entity_type = record.entity_type(), %id, "save");
        Ok(id)
    }

    pub fn delete(&self, schema: &'static TypeSchema, id: RecordId) -> DecoratorResult<()> {
        debug!(entity_type = schema.entity_type, %id, "delete");
        self.backend.delete(schema, &[id])
    }

    pub fn delete_many(&self, schema: &'static TypeSchema, ids: &[RecordId]) -> DecoratorResult<()> {
        debug!(entity_type = schema.entity_type, count = ids.len(), "delete_many");
        self.backend.delete(schema, ids)
    }

    pub fn execute(&self, query: &FieldQuery) -> DecoratorResult<QueryResult> {
        let result = self.backend.execute(query)?;
        debug!(
            query = %query,
            matches = result.ids_for(query.entity_type()).map_or(0, <[RecordId]>::len),
            "execute"
        );
        Ok(result)
    }
}

impl<B: StorageBackend + Default> Default for Store<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}
