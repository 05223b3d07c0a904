//! Descriptors for the entity types every content store ships with

use super::types::{StorageKind, TypeSchema};

/// Content items
pub const NODE: TypeSchema = TypeSchema::new("node")
    .with_id_key("nid")
    .with_label_key("title")
    .with_properties(&[
        "vid", "language", "uid", "status", "created", "changed", "comment", "promote", "sticky",
    ])
    .with_fields(&["body"])
    .with_storage(StorageKind::Node);

/// Taxonomy terms, bundled by vocabulary
pub const TAXONOMY_TERM: TypeSchema = TypeSchema::new("taxonomy_term")
    .with_id_key("tid")
    .with_bundle_key("vocabulary")
    .with_label_key("name")
    .with_properties(&["description", "weight", "parent"]);

/// User accounts
pub const USER: TypeSchema = TypeSchema::new("user")
    .with_id_key("uid")
    .with_label_key("name")
    .with_properties(&["mail", "status", "created", "access", "login"]);
