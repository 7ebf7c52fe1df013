//! Introspectable display metadata.

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// Value of a display item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DisplayValue {
    /// Free text.
    String(String),
    /// Integer number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean flag.
    Boolean(bool),
    /// Point in time.
    Timestamp(Timestamp),
    /// Length of time.
    Duration(SignedDuration),
    /// Fully-qualified type name.
    Class(String),
}

impl From<&str> for DisplayValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for DisplayValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for DisplayValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for DisplayValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for DisplayValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Timestamp> for DisplayValue {
    fn from(value: Timestamp) -> Self {
        Self::Timestamp(value)
    }
}

impl From<SignedDuration> for DisplayValue {
    fn from(value: SignedDuration) -> Self {
        Self::Duration(value)
    }
}

/// One item of display metadata contributed by a transform or function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayItem {
    /// Key, unique within its namespace.
    pub key: String,
    /// Typed value.
    #[serde(flatten)]
    pub value: DisplayValue,
    /// Human readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Link to further information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    /// Type name of the contributing object.
    ///
    /// Filled in by the compiler from context when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl DisplayItem {
    /// Creates a display item.
    pub fn new(key: impl Into<String>, value: impl Into<DisplayValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            label: None,
            link_url: None,
            namespace: None,
        }
    }

    /// Creates a display item holding a type name.
    pub fn class(key: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(key, DisplayValue::Class(type_name.into()))
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the link URL.
    pub fn with_link_url(mut self, link_url: impl Into<String>) -> Self {
        self.link_url = Some(link_url.into());
        self
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}
