//! Static schema descriptors for entity types

use serde::{Deserialize, Serialize};

/// How a named attribute is stored on a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Simple scalar column on the base record
    Property,
    /// Structured, possibly multi-value attachment
    Field,
}

/// Storage primitives an entity type is handled with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    /// The privileged content type: prepared on creation, timestamped on save
    Node,
    /// Every other entity type
    Entity,
}

/// Declaration-time description of an entity type.
///
/// Decides for every attribute name whether it is a property or a field, so
/// the finder and the field-access layer never have to ask a live store.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TypeSchema {
    /// Entity type name, e.g. `node`
    pub entity_type: &'static str,
    /// Property holding the store-assigned identifier
    pub id_key: &'static str,
    /// Property holding the bundle name
    pub bundle_key: &'static str,
    /// Property used as a human readable label, if any
    pub label_key: Option<&'static str>,
    pub properties: &'static [&'static str],
    pub fields: &'static [&'static str],
    pub storage: StorageKind,
}

impl TypeSchema {
    /// A generic entity type keyed by `id` with its bundle under `type`
    pub const fn new(entity_type: &'static str) -> Self {
        Self {
            entity_type,
            id_key: "id",
            bundle_key: "type",
            label_key: None,
            properties: &[],
            fields: &[],
            storage: StorageKind::Entity,
        }
    }

    pub const fn with_id_key(self, id_key: &'static str) -> Self {
        Self { id_key, ..self }
    }

    pub const fn with_bundle_key(self, bundle_key: &'static str) -> Self {
        Self { bundle_key, ..self }
    }

    pub const fn with_label_key(self, label_key: &'static str) -> Self {
        Self {
            label_key: Some(label_key),
            ..self
        }
    }

    pub const fn with_properties(self, properties: &'static [&'static str]) -> Self {
        Self { properties, ..self }
    }

    pub const fn with_fields(self, fields: &'static [&'static str]) -> Self {
        Self { fields, ..self }
    }

    pub const fn with_storage(self, storage: StorageKind) -> Self {
        Self { storage, ..self }
    }

    /// Resolve an attribute name. Identifier, bundle and label keys are
    /// always properties.
    pub fn kind_of(&self, name: &str) -> Option<AttributeKind> {
        if name == self.id_key
            || name == self.bundle_key
            || self.label_key == Some(name)
            || self.properties.contains(&name)
        {
            Some(AttributeKind::Property)
        } else if self.fields.contains(&name) {
            Some(AttributeKind::Field)
        } else {
            None
        }
    }

    pub fn is_property(&self, name: &str) -> bool {
        self.kind_of(name) == Some(AttributeKind::Property)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }

    pub fn is_node(&self) -> bool {
        self.storage == StorageKind::Node
    }
}
