//! Tagged structured values used as wire encodings.
//!
//! A [`CloudObject`] is written as `{"@type": <tag>, ...fields}`. Coders
//! and restriction coders are written into steps in this form.

mod coder;

pub use coder::{CoderRegistry, CoderTag, CoderTranslator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TranslateError, TranslateResult};

/// A tagged structured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudObject {
    /// Type tag.
    #[serde(rename = "@type")]
    pub type_tag: String,
    /// Remaining fields, in insertion order.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CloudObject {
    /// Creates an object with no fields.
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            fields: Map::new(),
        }
    }

    /// Adds a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns a field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns a field, failing when it is absent.
    pub fn required_field(&self, key: &str) -> TranslateResult<&Value> {
        self.field(key).ok_or_else(|| {
            TranslateError::unsupported(format!(
                "cloud object '{}' is missing field '{key}'",
                self.type_tag
            ))
        })
    }

    /// Converts the object into a JSON value.
    pub fn to_value(&self) -> TranslateResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parses an object from a JSON value.
    pub fn from_value(value: &Value) -> TranslateResult<Self> {
        Ok(Self::deserialize(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form() {
        let object = CloudObject::new("kind:serializable").with_field("type_name", "a::B");
        let value = object.to_value().unwrap();
        assert_eq!(
            value,
            serde_json::json!({"@type": "kind:serializable", "type_name": "a::B"})
        );
        assert_eq!(CloudObject::from_value(&value).unwrap(), object);
    }

    #[test]
    fn test_required_field() {
        let object = CloudObject::new("kind:pair");
        assert!(matches!(
            object.required_field("component_encodings"),
            Err(TranslateError::UnsupportedShape(_))
        ));
    }
}
