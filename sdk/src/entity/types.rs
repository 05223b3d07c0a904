//! Core types for the entity decorator layer

use crate::entity::record::{Record, RecordHandle};
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Store-assigned record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId(id)
    }
}

impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        RecordId(id as i64)
    }
}

/// A field or property value as seen through the field-access abstraction.
///
/// Nested records are held by handle, so a record read out of a reference
/// field is the same record the parent points at. Records compare by
/// identity and print as `entity_type#id`, which keeps reference cycles safe
/// to compare, debug and serialize.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Record(RecordHandle),
}

impl Value {
    /// Booleans, numbers and strings. `Null` is not a scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Value::Record(_))
    }

    /// Whether the value counts as "empty" for existence checks
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty() || s == "0",
            Value::List(items) => items.is_empty(),
            Value::Record(_) => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordHandle> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Equality as the query layer sees it: ints and floats compare numerically
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            _ => self == other,
        }
    }

    /// Total order used for sorting query results.
    ///
    /// Values of different kinds sort by kind: null, bool, number, string,
    /// list, record. Records never compare unequal to each other.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let a = self.as_float().unwrap_or_default();
                let b = other.as_float().unwrap_or_default();
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::List(_) => 4,
            Value::Record(_) => 5,
        }
    }

}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Record(record) => match record.try_borrow() {
                Ok(record) => match record.id() {
                    Some(id) => write!(f, "Record({}#{})", record.entity_type(), id),
                    None => write!(f, "Record({}#new)", record.entity_type()),
                },
                Err(_) => f.write_str("Record(<in use>)"),
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => serializer.collect_seq(items),
            // Nested records are written as references, never inline
            Value::Record(record) => {
                let record = record
                    .try_borrow()
                    .map_err(|_| S::Error::custom("referenced record is being modified"))?;
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("entity_type", record.entity_type())?;
                map.serialize_entry("id", &record.id())?;
                map.end()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Value::Int(id.0)
    }
}

impl From<RecordHandle> for Value {
    fn from(record: RecordHandle) -> Self {
        Value::Record(record)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record.into_handle())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Error type for decorator, finder and store operations
#[derive(Error, Debug)]
pub enum DecoratorError {
    /// A dynamically dispatched instance method matched nothing
    #[error("{class} has no instance method called {method}")]
    MethodNotFound { class: String, method: String },

    /// A dynamically dispatched static (finder) method matched nothing
    #[error("{class} has no static method called {method}")]
    StaticMethodNotFound { class: String, method: String },

    /// A finder condition value that is neither a scalar nor a list of scalars
    #[error("Finders can only take scalars and lists of scalars as arguments: {reason}")]
    UnsupportedArgument { reason: String },

    /// A dynamically dispatched finder method matched nothing
    #[error("{class} has no method called {method}")]
    NoSuchMethod { class: String, method: String },

    /// A setter was dispatched without a value
    #[error("{class}::{method} expects a value argument")]
    MissingArgument { class: String, method: String },

    /// The attribute is neither a property nor a field of the entity type
    #[error("Unknown attribute '{name}' on entity type '{entity_type}'")]
    UnknownAttribute { entity_type: String, name: String },

    /// Record not found by the given ID
    #[error("Entity '{entity_type}' with id '{id}' not found")]
    NotFound { entity_type: String, id: String },

    /// Storage backend failure
    #[error("Store operation failed for entity '{entity_type}': {operation} - {reason}")]
    Store {
        entity_type: String,
        operation: String,
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// Builder pattern error
    #[error("Builder error: {message}")]
    Builder { message: String },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DecoratorError {
    pub fn method_not_found<C: AsRef<str>, M: AsRef<str>>(class: C, method: M) -> Self {
        Self::MethodNotFound {
            class: class.as_ref().to_string(),
            method: method.as_ref().to_string(),
        }
    }

    pub fn static_method_not_found<C: AsRef<str>, M: AsRef<str>>(class: C, method: M) -> Self {
        Self::StaticMethodNotFound {
            class: class.as_ref().to_string(),
            method: method.as_ref().to_string(),
        }
    }

    pub fn unsupported_argument<R: AsRef<str>>(reason: R) -> Self {
        Self::UnsupportedArgument {
            reason: reason.as_ref().to_string(),
        }
    }

    pub fn no_such_method<C: AsRef<str>, M: AsRef<str>>(class: C, method: M) -> Self {
        Self::NoSuchMethod {
            class: class.as_ref().to_string(),
            method: method.as_ref().to_string(),
        }
    }

    pub fn missing_argument<C: AsRef<str>, M: AsRef<str>>(class: C, method: M) -> Self {
        Self::MissingArgument {
            class: class.as_ref().to_string(),
            method: method.as_ref().to_string(),
        }
    }

    pub fn unknown_attribute<E: AsRef<str>, N: AsRef<str>>(entity_type: E, name: N) -> Self {
        Self::UnknownAttribute {
            entity_type: entity_type.as_ref().to_string(),
            name: name.as_ref().to_string(),
        }
    }

    pub fn not_found<E: AsRef<str>, I: fmt::Display>(entity_type: E, id: I) -> Self {
        Self::NotFound {
            entity_type: entity_type.as_ref().to_string(),
            id: id.to_string(),
        }
    }

    pub fn store<E: AsRef<str>, O: AsRef<str>, R: AsRef<str>>(
        entity_type: E,
        operation: O,
        reason: R,
    ) -> Self {
        Self::Store {
            entity_type: entity_type.as_ref().to_string(),
            operation: operation.as_ref().to_string(),
            reason: reason.as_ref().to_string(),
        }
    }

    pub fn configuration<R: AsRef<str>>(reason: R) -> Self {
        Self::Configuration {
            reason: reason.as_ref().to_string(),
        }
    }

    pub fn internal<M: AsRef<str>>(message: M) -> Self {
        Self::Internal {
            message: message.as_ref().to_string(),
        }
    }

    /// Whether the error comes from name-based dispatch rather than storage
    pub fn is_dispatch_error(&self) -> bool {
        matches!(
            self,
            Self::MethodNotFound { .. }
                | Self::StaticMethodNotFound { .. }
                | Self::NoSuchMethod { .. }
                | Self::MissingArgument { .. }
        )
    }
}

/// Result type alias for decorator operations
pub type DecoratorResult<T> = Result<T, DecoratorError>;

// Implement From trait for derive_builder compatibility
impl From<derive_builder::UninitializedFieldError> for DecoratorError {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        DecoratorError::Builder {
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for DecoratorError {
    fn from(error: anyhow::Error) -> Self {
        DecoratorError::Internal {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_exclude_null_lists_and_records() {
        assert!(Value::from(1).is_scalar());
        assert!(Value::from("a").is_scalar());
        assert!(Value::from(true).is_scalar());
        assert!(Value::from(1.5).is_scalar());
        assert!(!Value::Null.is_scalar());
        assert!(!Value::from(vec![1, 2]).is_scalar());
    }

    #[test]
    fn numeric_matching_crosses_int_and_float() {
        assert!(Value::Int(2).matches(&Value::Float(2.0)));
        assert!(!Value::Int(2).matches(&Value::String("2".into())));
    }

    #[test]
    fn compare_orders_by_kind_then_value() {
        assert_eq!(Value::Null.compare(&Value::Int(0)), Ordering::Less);
        assert_eq!(Value::Int(3).compare(&Value::Float(2.5)), Ordering::Greater);
        assert_eq!(
            Value::from("apple").compare(&Value::from("banana")),
            Ordering::Less
        );
    }

    #[test]
    fn blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("").is_blank());
        assert!(Value::from(0).is_blank());
        assert!(Value::List(vec![]).is_blank());
        assert!(Value::from("0").is_blank());
        assert!(!Value::from("x").is_blank());
        assert!(!Value::from("00").is_blank());
    }

    #[test]
    fn method_not_found_names_class_and_method() {
        let err = DecoratorError::method_not_found("Article", "frobnicate");
        assert_eq!(err.to_string(), "Article has no instance method called frobnicate");
        assert!(err.is_dispatch_error());

        let err = DecoratorError::static_method_not_found("Article", "destroy_all");
        assert_eq!(err.to_string(), "Article has no static method called destroy_all");
        assert!(err.is_dispatch_error());
    }

    #[test]
    fn records_compare_by_identity() {
        use crate::entity::schema::NODE;

        let a = Record::new(&NODE, "article").into_handle();
        let twin = Record::new(&NODE, "article").into_handle();
        assert_eq!(Value::Record(a.clone()), Value::Record(a.clone()));
        assert_ne!(Value::Record(a.clone()), Value::Record(twin));
        assert_eq!(format!("{:?}", Value::Record(a)), "Record(node#new)");
    }
}
