//! Entity type schema descriptors

pub mod builtin;
pub mod types;
pub mod validation;

pub use builtin::{NODE, TAXONOMY_TERM, USER};
pub use types::{AttributeKind, StorageKind, TypeSchema};
pub use validation::{SchemaValidator, ValidationResult};
