//! Raw records and the capability traits decorators rely on

use crate::entity::schema::{AttributeKind, TypeSchema};
use crate::entity::types::{DecoratorError, DecoratorResult, RecordId, Value};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Shared, mutable reference to a record
pub type RecordHandle = Rc<RefCell<Record>>;

/// Uniform read/write access to named attributes, regardless of whether the
/// schema stores them as properties or fields
pub trait FieldAccessible {
    /// Read an attribute. Declared but unset attributes read as `Null`.
    fn get(&self, name: &str) -> DecoratorResult<Value>;

    /// Write an attribute
    fn set(&mut self, name: &str, value: Value) -> DecoratorResult<()>;

    /// Whether the attribute currently holds a value
    fn has(&self, name: &str) -> bool;
}

/// Methods a record answers when a decorator proxies an unknown call to it.
///
/// Returns `None` when the record has no method of that name.
pub trait Invoke {
    fn invoke(&mut self, method: &str, args: &[Value]) -> Option<DecoratorResult<Value>>;
}

/// The store's native representation of one persisted item
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: &'static TypeSchema,
    properties: BTreeMap<String, Value>,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// An empty, unsaved record of the given bundle
    pub fn new(schema: &'static TypeSchema, bundle: &str) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(schema.bundle_key.to_string(), Value::from(bundle));
        Self {
            schema,
            properties,
            fields: BTreeMap::new(),
        }
    }

    /// Reassemble a record from stored attribute maps
    pub fn from_parts(
        schema: &'static TypeSchema,
        properties: BTreeMap<String, Value>,
        fields: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            schema,
            properties,
            fields,
        }
    }

    pub fn schema(&self) -> &'static TypeSchema {
        self.schema
    }

    pub fn entity_type(&self) -> &'static str {
        self.schema.entity_type
    }

    pub fn bundle(&self) -> Option<&str> {
        self.properties
            .get(self.schema.bundle_key)
            .and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<RecordId> {
        self.properties
            .get(self.schema.id_key)
            .and_then(Value::as_int)
            .map(RecordId)
    }

    pub fn set_id(&mut self, id: RecordId) {
        self.properties
            .insert(self.schema.id_key.to_string(), Value::from(id));
    }

    pub fn label(&self) -> Option<&str> {
        self.schema
            .label_key
            .and_then(|key| self.properties.get(key))
            .and_then(Value::as_str)
    }

    /// Not yet saved
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Stored value of an attribute, looked up by declared kind
    pub fn value_of(&self, name: &str, kind: AttributeKind) -> Option<&Value> {
        match kind {
            AttributeKind::Property => self.properties.get(name),
            AttributeKind::Field => self.fields.get(name),
        }
    }

    /// Raw attribute lookup that ignores the schema: properties first, then fields
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.properties
            .get(name)
            .or_else(|| self.fields.get(name))
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self.properties.get_mut(name) {
            Some(value) => Some(value),
            None => self.fields.get_mut(name),
        }
    }

    /// Raw attribute write. Names the schema declares as fields land in the
    /// field map, everything else becomes a property.
    pub fn set_attribute(&mut self, name: &str, value: Value) {
        match self.schema.kind_of(name) {
            Some(AttributeKind::Field) => self.fields.insert(name.to_string(), value),
            _ => self.properties.insert(name.to_string(), value),
        };
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        self.properties
            .remove(name)
            .or_else(|| self.fields.remove(name))
    }

    pub fn into_handle(self) -> RecordHandle {
        Rc::new(RefCell::new(self))
    }

    /// Convert record to JSON for export or debugging. Nested records are
    /// exported as `{"entity_type", "id"}` references.
    pub fn to_json(&self) -> DecoratorResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| {
            DecoratorError::store(self.entity_type(), "to_json", e.to_string())
        })
    }
}

impl FieldAccessible for Record {
    fn get(&self, name: &str) -> DecoratorResult<Value> {
        let kind = self
            .schema
            .kind_of(name)
            .ok_or_else(|| DecoratorError::unknown_attribute(self.entity_type(), name))?;
        Ok(self.value_of(name, kind).cloned().unwrap_or_default())
    }

    fn set(&mut self, name: &str, value: Value) -> DecoratorResult<()> {
        match self.schema.kind_of(name) {
            Some(AttributeKind::Property) => {
                self.properties.insert(name.to_string(), value);
            }
            Some(AttributeKind::Field) => {
                self.fields.insert(name.to_string(), value);
            }
            None => return Err(DecoratorError::unknown_attribute(self.entity_type(), name)),
        }
        Ok(())
    }

    fn has(&self, name: &str) -> bool {
        self.schema
            .kind_of(name)
            .and_then(|kind| self.value_of(name, kind))
            .is_some_and(|value| !value.is_null())
    }
}

impl Invoke for Record {
    fn invoke(&mut self, method: &str, _args: &[Value]) -> Option<DecoratorResult<Value>> {
        let value = match method {
            "id" => Value::from(self.id()),
            "entity_type" => Value::from(self.entity_type()),
            "bundle" => Value::from(self.bundle()),
            "label" => Value::from(self.label()),
            "is_new" => Value::from(self.is_new()),
            _ => return None,
        };
        Some(Ok(value))
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Record", 3)?;
        state.serialize_field("entity_type", self.entity_type())?;
        state.serialize_field("properties", &self.properties)?;
        state.serialize_field("fields", &self.fields)?;
        state.end()
    }
}
