//! Consistency checks for entity type descriptors

use super::types::TypeSchema;
use crate::entity::types::{DecoratorError, DecoratorResult};
use std::collections::HashSet;

/// Validator for entity type descriptors
pub struct SchemaValidator {
    /// Validation errors collected during validation
    errors: Vec<String>,
    /// Validation warnings collected during validation
    warnings: Vec<String>,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Validate a single descriptor
    pub fn validate(&mut self, schema: &TypeSchema) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        if schema.entity_type.is_empty() {
            self.errors.push("Entity type name cannot be empty".to_string());
            return self.result();
        }

        self.validate_keys(schema);
        self.validate_attributes(schema);

        self.result()
    }

    fn validate_keys(&mut self, schema: &TypeSchema) {
        let name = schema.entity_type;

        if schema.id_key.is_empty() {
            self.errors
                .push(format!("Entity type '{}' must declare an identifier key", name));
        }
        if schema.bundle_key.is_empty() {
            self.errors
                .push(format!("Entity type '{}' must declare a bundle key", name));
        }
        if schema.id_key == schema.bundle_key {
            self.errors.push(format!(
                "Entity type '{}' uses '{}' as both identifier and bundle key",
                name, schema.id_key
            ));
        }

        for key in [Some(schema.id_key), Some(schema.bundle_key), schema.label_key]
            .into_iter()
            .flatten()
        {
            if schema.fields.contains(&key) {
                self.errors.push(format!(
                    "Key '{}' of entity type '{}' must be a property, not a field",
                    key, name
                ));
            }
        }
    }

    fn validate_attributes(&mut self, schema: &TypeSchema) {
        let name = schema.entity_type;
        let mut seen = HashSet::new();

        for attribute in schema.properties.iter().chain(schema.fields.iter()) {
            if attribute.is_empty() {
                self.errors
                    .push(format!("Attribute name cannot be empty in entity type '{}'", name));
                continue;
            }
            if !seen.insert(*attribute) {
                self.errors.push(format!(
                    "Attribute '{}' is declared more than once in entity type '{}'",
                    attribute, name
                ));
            }
            if attribute.starts_with(char::is_uppercase) {
                self.warnings.push(format!(
                    "Attribute '{}' in entity type '{}' should start with a lowercase letter",
                    attribute, name
                ));
            }
            if attribute.starts_with("get_")
                || attribute.starts_with("set_")
                || attribute.starts_with("find_by_")
                || attribute.starts_with("find_first_by_")
            {
                self.warnings.push(format!(
                    "Attribute '{}' in entity type '{}' shadows an accessor prefix",
                    attribute, name
                ));
            }
        }
    }

    fn result(&self) -> ValidationResult {
        ValidationResult {
            errors: self.errors.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

/// Result of schema validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Validation errors that must be fixed
    pub errors: Vec<String>,
    /// Validation warnings (suggestions for improvement)
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get total number of issues (errors + warnings)
    pub fn issue_count(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    /// Turn collected errors into a configuration error
    pub fn into_result(self) -> DecoratorResult<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(DecoratorError::configuration(self.errors.join("; ")))
        }
    }
}
