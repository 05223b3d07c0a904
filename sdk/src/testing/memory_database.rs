// In-memory storage backend for testing
use crate::config::StoreConfig;
use crate::entity::query::{FieldQuery, QueryResult};
use crate::entity::record::{Record, RecordHandle};
use crate::entity::schema::{SchemaValidator, StorageKind, TypeSchema};
use crate::entity::store::{StorageBackend, Store};
use crate::entity::types::{DecoratorError, DecoratorResult, RecordId, Value};
use chrono::Utc;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Persisted form of an attribute value. Nested records are kept as
/// references and resolved again on load.
#[derive(Debug, Clone, PartialEq)]
enum StoredValue {
    Plain(Value),
    List(Vec<StoredValue>),
    Reference {
        entity_type: &'static str,
        id: RecordId,
    },
}

impl StoredValue {
    fn persist(
        value: &Value,
        owner: &Record,
        owner_id: RecordId,
        attribute: &str,
    ) -> DecoratorResult<Self> {
        match value {
            Value::List(items) => items
                .iter()
                .map(|item| Self::persist(item, owner, owner_id, attribute))
                .collect::<DecoratorResult<Vec<_>>>()
                .map(StoredValue::List),
            Value::Record(handle) => {
                // The record being saved is mutably borrowed; a reference to
                // itself is resolved without touching the handle.
                if std::ptr::eq(handle.as_ptr().cast_const(), owner) {
                    return Ok(StoredValue::Reference {
                        entity_type: owner.entity_type(),
                        id: owner_id,
                    });
                }
                let target = handle.try_borrow().map_err(|_| {
                    DecoratorError::store(
                        owner.entity_type(),
                        "save",
                        format!("'{}' references a record that is being modified", attribute),
                    )
                })?;
                let id = target.id().ok_or_else(|| {
                    DecoratorError::store(
                        owner.entity_type(),
                        "save",
                        format!(
                            "'{}' references an unsaved '{}' record",
                            attribute,
                            target.entity_type()
                        ),
                    )
                })?;
                Ok(StoredValue::Reference {
                    entity_type: target.entity_type(),
                    id,
                })
            }
            other => Ok(StoredValue::Plain(other.clone())),
        }
    }

    /// Queryable form: references compare by target identifier
    fn flatten(&self) -> Value {
        match self {
            StoredValue::Plain(value) => value.clone(),
            StoredValue::List(items) => Value::List(items.iter().map(Self::flatten).collect()),
            StoredValue::Reference { id, .. } => Value::from(*id),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredRecord {
    schema: &'static TypeSchema,
    properties: BTreeMap<String, StoredValue>,
    fields: BTreeMap<String, StoredValue>,
}

impl StoredRecord {
    fn persist(record: &Record, id: RecordId) -> DecoratorResult<Self> {
        let persist_map = |map: &BTreeMap<String, Value>| {
            map.iter()
                .map(|(name, value)| {
                    StoredValue::persist(value, record, id, name).map(|stored| (name.clone(), stored))
                })
                .collect::<DecoratorResult<BTreeMap<_, _>>>()
        };
        Ok(Self {
            schema: record.schema(),
            properties: persist_map(record.properties())?,
            fields: persist_map(record.fields())?,
        })
    }

    fn set_property(&mut self, name: &str, value: Value) {
        self.properties
            .insert(name.to_string(), StoredValue::Plain(value));
    }

    fn flattened(&self) -> Record {
        let flatten_map = |map: &BTreeMap<String, StoredValue>| {
            map.iter()
                .map(|(name, value)| (name.clone(), value.flatten()))
                .collect()
        };
        Record::from_parts(
            self.schema,
            flatten_map(&self.properties),
            flatten_map(&self.fields),
        )
    }
}

type Tables = BTreeMap<String, BTreeMap<RecordId, StoredRecord>>;

// Handles built during one load, so every record in the graph is built once
type Resolved = BTreeMap<(&'static str, RecordId), RecordHandle>;

fn resolve(
    tables: &Tables,
    entity_type: &str,
    id: RecordId,
    resolved: &mut Resolved,
) -> Option<RecordHandle> {
    let stored = tables.get(entity_type)?.get(&id)?;
    let key = (stored.schema.entity_type, id);
    if let Some(handle) = resolved.get(&key) {
        return Some(handle.clone());
    }

    let handle = Record::from_parts(stored.schema, BTreeMap::new(), BTreeMap::new()).into_handle();
    resolved.insert(key, handle.clone());

    let mut restore_map = |map: &BTreeMap<String, StoredValue>| {
        map.iter()
            .map(|(name, value)| (name.clone(), restore(tables, value, resolved)))
            .collect::<BTreeMap<_, _>>()
    };
    let properties = restore_map(&stored.properties);
    let fields = restore_map(&stored.fields);
    *handle.borrow_mut() = Record::from_parts(stored.schema, properties, fields);
    Some(handle)
}

fn restore(tables: &Tables, value: &StoredValue, resolved: &mut Resolved) -> Value {
    match value {
        StoredValue::Plain(value) => value.clone(),
        StoredValue::List(items) => Value::List(
            items
                .iter()
                .map(|item| restore(tables, item, resolved))
                .collect(),
        ),
        StoredValue::Reference { entity_type, id } => {
            match resolve(tables, entity_type, *id, resolved) {
                Some(handle) => Value::Record(handle),
                None => {
                    warn!(entity_type = *entity_type, %id, "dangling reference");
                    Value::Null
                }
            }
        }
    }
}

/// Deterministic storage for tests.
///
/// Records are kept as snapshots taken on save. References to other records
/// are stored by entity type and identifier, so loading always sees the
/// current state of the referenced record. Reference cycles load as cycles
/// of shared handles; they are not freed until one side drops its reference.
#[derive(Debug)]
pub struct MemoryDatabase {
    config: StoreConfig,
    // entity type -> record id -> record
    data: RefCell<Tables>,
    // entity type -> next id to assign
    sequences: RefCell<BTreeMap<String, i64>>,
    // addresses of descriptors that passed validation
    validated: RefCell<HashSet<usize>>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            data: RefCell::new(BTreeMap::new()),
            sequences: RefCell::new(BTreeMap::new()),
            validated: RefCell::new(HashSet::new()),
        }
    }

    pub fn with_config(config: StoreConfig) -> DecoratorResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn clear(&self) {
        self.data.borrow_mut().clear();
        self.sequences.borrow_mut().clear();
    }

    pub fn table_count(&self, entity_type: &str) -> usize {
        self.data
            .borrow()
            .get(entity_type)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Check if a record exists (for testing purposes)
    pub fn record_exists(&self, entity_type: &str, id: RecordId) -> bool {
        self.data
            .borrow()
            .get(entity_type)
            .is_some_and(|table| table.contains_key(&id))
    }

    /// Snapshot of a stored record with references resolved (for testing purposes)
    pub fn stored_record(&self, entity_type: &str, id: RecordId) -> Option<Record> {
        let data = self.data.borrow();
        let handle = resolve(&data, entity_type, id, &mut Resolved::new())?;
        let record = handle.borrow().clone();
        Some(record)
    }

    /// Entity types that currently hold records
    pub fn entity_types(&self) -> Vec<String> {
        self.data
            .borrow()
            .iter()
            .filter(|(_, table)| !table.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn check_schema(&self, schema: &'static TypeSchema) -> DecoratorResult<()> {
        let address = schema as *const TypeSchema as usize;
        if self.validated.borrow().contains(&address) {
            return Ok(());
        }
        for warning in SchemaValidator::new().validate(schema).into_result()? {
            warn!(entity_type = schema.entity_type, "{}", warning);
        }
        self.validated.borrow_mut().insert(address);
        Ok(())
    }

    fn peek_id(&self, entity_type: &str) -> RecordId {
        let next = self
            .sequences
            .borrow()
            .get(entity_type)
            .copied()
            .unwrap_or(self.config.first_id);
        RecordId(next)
    }

    /// Make sure the sequence hands out identifiers above `used`
    fn bump_sequence(&self, entity_type: &str, used: RecordId) -> DecoratorResult<()> {
        let following = used.get().checked_add(1).ok_or_else(|| {
            DecoratorError::store(entity_type, "save", "identifier space exhausted")
        })?;
        let mut sequences = self.sequences.borrow_mut();
        let next = sequences
            .entry(entity_type.to_string())
            .or_insert(self.config.first_id);
        if *next < following {
            *next = following;
        }
        Ok(())
    }

    /// Defaults a freshly prepared node-like record starts with
    fn prepare_node(&self, record: &mut Record) {
        let defaults = &self.config.node_defaults;
        let now = Utc::now().timestamp();
        record.set_attribute("status", Value::from(defaults.status));
        record.set_attribute("promote", Value::from(defaults.promote));
        record.set_attribute("sticky", Value::from(defaults.sticky));
        record.set_attribute("uid", Value::from(defaults.uid));
        record.set_attribute("created", Value::from(now));
        record.set_attribute("changed", Value::from(now));
    }
}

impl StorageBackend for MemoryDatabase {
    fn create(&self, schema: &'static TypeSchema, bundle: &str) -> DecoratorResult<Record> {
        self.check_schema(schema)?;
        let mut record = Record::new(schema, bundle);
        match schema.storage {
            StorageKind::Node => self.prepare_node(&mut record),
            StorageKind::Entity => {}
        }
        Ok(record)
    }

    fn load(
        &self,
        schema: &'static TypeSchema,
        ids: &[RecordId],
    ) -> DecoratorResult<Vec<RecordHandle>> {
        let data = self.data.borrow();
        let mut resolved = Resolved::new();
        Ok(ids
            .iter()
            .filter_map(|id| resolve(&data, schema.entity_type, *id, &mut resolved))
            .collect())
    }

    fn save(&self, record: &mut Record) -> DecoratorResult<RecordId> {
        let schema = record.schema();
        self.check_schema(schema)?;
        if record.bundle().is_none() {
            return Err(DecoratorError::store(
                schema.entity_type,
                "save",
                format!("record has no '{}' value", schema.bundle_key),
            ));
        }

        let id = record.id().unwrap_or_else(|| self.peek_id(schema.entity_type));
        let mut stored = StoredRecord::persist(record, id)?;
        self.bump_sequence(schema.entity_type, id)?;

        if record.id().is_none() {
            record.set_id(id);
            stored.set_property(schema.id_key, Value::from(id));
        }
        if schema.storage == StorageKind::Node {
            let changed = Value::from(Utc::now().timestamp());
            record.set_attribute("changed", changed.clone());
            stored.set_property("changed", changed);
        }

        self.data
            .borrow_mut()
            .entry(schema.entity_type.to_string())
            .or_default()
            .insert(id, stored);
        Ok(id)
    }

    fn delete(&self, schema: &'static TypeSchema, ids: &[RecordId]) -> DecoratorResult<()> {
        let mut data = self.data.borrow_mut();
        let Some(table) = data.get_mut(schema.entity_type) else {
            warn!(entity_type = schema.entity_type, "delete on empty entity type");
            return Ok(());
        };
        for id in ids {
            if table.remove(id).is_none() {
                warn!(entity_type = schema.entity_type, %id, "delete of unknown record");
            }
        }
        Ok(())
    }

    fn execute(&self, query: &FieldQuery) -> DecoratorResult<QueryResult> {
        if self.config.log_queries {
            info!(query = %query, "executing query");
        }
        let data = self.data.borrow();
        let mut result = QueryResult::new();
        let Some(table) = data.get(query.entity_type()) else {
            return Ok(result);
        };

        // Base order is ascending id; sort_by is stable
        let mut matches: Vec<Record> = table
            .values()
            .map(StoredRecord::flattened)
            .filter(|r| query.matches(r))
            .collect();
        matches.sort_by(|a, b| query.compare(a, b));

        let (offset, limit) = query
            .range()
            .map_or((0, usize::MAX), |range| (range.offset, range.limit));
        let ids: Vec<RecordId> = matches
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(Record::id)
            .collect();

        debug!(entity_type = query.entity_type(), matches = ids.len(), "memory query");
        result.insert(query.entity_type(), ids);
        Ok(result)
    }
}

/// Test store type alias for use in testing contexts
pub type TestStore = Store<MemoryDatabase>;

impl TestStore {
    /// A store over a fresh in-memory database
    pub fn in_memory() -> Self {
        Store::new(MemoryDatabase::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::record::FieldAccessible;
    use crate::entity::schema::{NODE, TAXONOMY_TERM};
    use std::rc::Rc;

    fn ids_of(handles: &[RecordHandle]) -> Vec<RecordId> {
        handles.iter().filter_map(|h| h.borrow().id()).collect()
    }

    #[test]
    fn node_creation_applies_defaults() {
        let db = MemoryDatabase::new();
        let record = db.create(&NODE, "article").unwrap();
        assert_eq!(record.get("status").unwrap(), Value::Int(1));
        assert_eq!(record.get("promote").unwrap(), Value::Int(1));
        assert!(record.get("created").unwrap().as_int().is_some());
    }

    #[test]
    fn generic_creation_only_sets_bundle() {
        let db = MemoryDatabase::new();
        let record = db.create(&TAXONOMY_TERM, "tags").unwrap();
        assert_eq!(record.properties().len(), 1);
        assert_eq!(record.bundle(), Some("tags"));
    }

    #[test]
    fn save_assigns_sequential_ids_per_type() {
        let db = MemoryDatabase::with_config(StoreConfig {
            first_id: 40,
            ..StoreConfig::default()
        })
        .unwrap();
        let mut a = db.create(&NODE, "article").unwrap();
        let mut b = db.create(&NODE, "article").unwrap();
        let mut t = db.create(&TAXONOMY_TERM, "tags").unwrap();

        assert_eq!(db.save(&mut a).unwrap(), RecordId(40));
        assert_eq!(db.save(&mut b).unwrap(), RecordId(41));
        assert_eq!(db.save(&mut t).unwrap(), RecordId(40));
        assert_eq!(a.id(), Some(RecordId(40)));
        assert_eq!(db.table_count("node"), 2);
    }

    #[test]
    fn explicit_ids_advance_the_sequence() {
        let db = MemoryDatabase::new();
        let mut imported = db.create(&NODE, "page").unwrap();
        imported.set_id(RecordId(10));
        db.save(&mut imported).unwrap();

        let mut fresh = db.create(&NODE, "page").unwrap();
        assert_eq!(db.save(&mut fresh).unwrap(), RecordId(11));
    }

    #[test]
    fn exhausted_identifier_space_is_an_error() {
        let db = MemoryDatabase::new();
        let mut last = db.create(&NODE, "page").unwrap();
        last.set_id(RecordId(i64::MAX));

        let err = db.save(&mut last).unwrap_err();
        assert!(err.to_string().contains("identifier space exhausted"));
        assert!(!db.record_exists("node", RecordId(i64::MAX)));

        let mut near = db.create(&NODE, "page").unwrap();
        near.set_id(RecordId(i64::MAX - 1));
        db.save(&mut near).unwrap();
        let mut fresh = db.create(&NODE, "page").unwrap();
        assert!(db.save(&mut fresh).is_err());
        assert!(fresh.is_new());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = StoreConfig {
            first_id: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(
            MemoryDatabase::with_config(config),
            Err(DecoratorError::Configuration { .. })
        ));
    }

    #[test]
    fn stored_records_are_snapshots() {
        let db = MemoryDatabase::new();
        let mut record = db.create(&NODE, "article").unwrap();
        record.set("title", Value::from("Before")).unwrap();
        let id = db.save(&mut record).unwrap();

        record.set("title", Value::from("After")).unwrap();
        let stored = db.stored_record("node", id).unwrap();
        assert_eq!(stored.get("title").unwrap(), Value::from("Before"));
    }

    #[test]
    fn load_preserves_requested_order_and_skips_missing() {
        let db = MemoryDatabase::new();
        for _ in 0..3 {
            let mut record = db.create(&NODE, "article").unwrap();
            db.save(&mut record).unwrap();
        }
        let loaded = db
            .load(&NODE, &[RecordId(3), RecordId(99), RecordId(1)])
            .unwrap();
        assert_eq!(ids_of(&loaded), vec![RecordId(3), RecordId(1)]);
    }

    #[test]
    fn references_are_stored_by_id() {
        let db = MemoryDatabase::new();
        let mut author = db.create(&NODE, "page").unwrap();
        author.set("title", Value::from("first")).unwrap();
        let author_id = db.save(&mut author).unwrap();

        let mut article = db.create(&NODE, "article").unwrap();
        article.set("body", Value::from(author.clone())).unwrap();
        let article_id = db.save(&mut article).unwrap();

        author.set("title", Value::from("second")).unwrap();
        db.save(&mut author).unwrap();

        let loaded = db.load(&NODE, &[article_id]).unwrap();
        let body = loaded[0].borrow().get("body").unwrap();
        let target = body.as_record().unwrap().borrow();
        assert_eq!(target.id(), Some(author_id));
        assert_eq!(target.get("title").unwrap(), Value::from("second"));
    }

    #[test]
    fn unsaved_references_are_rejected() {
        let db = MemoryDatabase::new();
        let draft = db.create(&NODE, "page").unwrap();
        let mut article = db.create(&NODE, "article").unwrap();
        article.set("body", Value::from(draft)).unwrap();

        let err = db.save(&mut article).unwrap_err();
        assert!(err.to_string().contains("unsaved 'node' record"));
        assert!(article.is_new());
        assert_eq!(db.table_count("node"), 0);
    }

    #[test]
    fn self_references_survive_save_and_load() {
        let db = MemoryDatabase::new();
        let handle = db.create(&NODE, "article").unwrap().into_handle();
        handle
            .borrow_mut()
            .set("body", Value::Record(handle.clone()))
            .unwrap();

        let id = db.save(&mut handle.borrow_mut()).unwrap();
        handle.borrow_mut().remove_attribute("body");

        let loaded = db.load(&NODE, &[id]).unwrap();
        let body = loaded[0].borrow().get("body").unwrap();
        assert!(Rc::ptr_eq(body.as_record().unwrap(), &loaded[0]));
        loaded[0].borrow_mut().remove_attribute("body");
    }

    #[test]
    fn dangling_references_load_as_null() {
        let db = MemoryDatabase::new();
        let mut target = db.create(&NODE, "page").unwrap();
        let target_id = db.save(&mut target).unwrap();
        let mut article = db.create(&NODE, "article").unwrap();
        article.set("body", Value::from(target)).unwrap();
        let id = db.save(&mut article).unwrap();

        db.delete(&NODE, &[target_id]).unwrap();
        let loaded = db.load(&NODE, &[id]).unwrap();
        assert_eq!(loaded[0].borrow().get("body").unwrap(), Value::Null);
    }

    #[test]
    fn queries_match_references_by_target_id() {
        use crate::entity::query::{Condition, Operator};
        use crate::entity::schema::AttributeKind;

        let db = MemoryDatabase::new();
        let mut target = db.create(&NODE, "page").unwrap();
        let target_id = db.save(&mut target).unwrap();
        let mut article = db.create(&NODE, "article").unwrap();
        article.set("body", Value::from(target)).unwrap();
        let id = db.save(&mut article).unwrap();

        let mut query = FieldQuery::new(&NODE, "article");
        query.add_condition(Condition {
            name: "body".into(),
            kind: AttributeKind::Field,
            operator: Operator::Eq,
            value: Value::from(target_id),
        });
        let result = db.execute(&query).unwrap();
        assert_eq!(result.ids_for("node"), Some(&[id][..]));
    }

    #[test]
    fn delete_removes_records() {
        let db = MemoryDatabase::new();
        let mut record = db.create(&NODE, "article").unwrap();
        let id = db.save(&mut record).unwrap();
        db.delete(&NODE, &[id]).unwrap();
        assert!(!db.record_exists("node", id));
        assert!(db.entity_types().is_empty());
    }

    #[test]
    fn invalid_schema_is_rejected() {
        const BROKEN: TypeSchema = TypeSchema::new("broken").with_fields(&["id"]);
        let db = MemoryDatabase::new();
        assert!(matches!(
            db.create(&BROKEN, "x"),
            Err(DecoratorError::Configuration { .. })
        ));
    }

    #[test]
    fn validation_is_per_descriptor_not_per_entity_type() {
        static BROKEN_NODE: TypeSchema = TypeSchema::new("node").with_fields(&["id"]);
        let db = MemoryDatabase::new();

        db.create(&NODE, "article").unwrap();
        assert!(matches!(
            db.create(&BROKEN_NODE, "article"),
            Err(DecoratorError::Configuration { .. })
        ));
    }
}
