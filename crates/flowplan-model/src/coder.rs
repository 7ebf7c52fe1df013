//! Element-encoding descriptors.
//!
//! A [`Coder`] describes how the elements of a collection are encoded. The
//! encodings themselves live with the workers; the compiler only needs the
//! descriptor so it can be written into the job as a tagged cloud object.

use serde::{Deserialize, Serialize};

/// Element-encoding descriptor, possibly parameterized by component coders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Coder {
    /// Raw byte strings.
    Bytes,
    /// Variable-length 32-bit integers.
    VarInt,
    /// Variable-length 64-bit integers.
    VarLong,
    /// UTF-8 strings.
    StringUtf8,
    /// IEEE 754 doubles.
    Double,
    /// Booleans.
    Boolean,
    /// The unit value; encodes to zero bytes.
    Void,
    /// Key/value pairs.
    Kv {
        /// Coder of the key.
        key: Box<Coder>,
        /// Coder of the value.
        value: Box<Coder>,
    },
    /// Iterables of a single element coder.
    Iterable {
        /// Coder of each element.
        element: Box<Coder>,
    },
    /// Values that may be absent.
    Nullable {
        /// Coder of the present value.
        inner: Box<Coder>,
    },
    /// Prefixes the inner encoding with its length.
    LengthPrefix {
        /// The wrapped coder.
        inner: Box<Coder>,
    },
    /// A value together with its timestamp, windows and pane.
    WindowedValue {
        /// Coder of the value.
        value: Box<Coder>,
        /// Coder of the windows the value belongs to.
        window: Box<Coder>,
    },
    /// The single global window.
    GlobalWindow,
    /// Bounded `[start, end)` windows.
    IntervalWindow,
    /// Values serialized with a generic, type-named serializer.
    Serializable {
        /// Fully-qualified name of the serialized type.
        type_name: String,
    },
    /// Records of an indexed, randomly accessible materialization.
    IndexedRecord {
        /// Coders of the record key components, in order.
        key_coders: Vec<Coder>,
        /// Coder of the record value.
        value: Box<Coder>,
    },
    /// A coder outside the built-in vocabulary.
    ///
    /// Translating it requires a translator registered for `type_tag`.
    Custom {
        /// Wire type tag of the coder.
        type_tag: String,
        /// Opaque coder parameters.
        #[serde(default)]
        payload: serde_json::Value,
        /// Component coders.
        #[serde(default)]
        components: Vec<Coder>,
    },
}

impl Coder {
    /// Creates a key/value coder.
    pub fn kv(key: Coder, value: Coder) -> Self {
        Self::Kv {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Creates an iterable coder.
    pub fn iterable(element: Coder) -> Self {
        Self::Iterable {
            element: Box::new(element),
        }
    }

    /// Creates a nullable coder.
    pub fn nullable(inner: Coder) -> Self {
        Self::Nullable {
            inner: Box::new(inner),
        }
    }

    /// Creates a length-prefixed coder.
    pub fn length_prefix(inner: Coder) -> Self {
        Self::LengthPrefix {
            inner: Box::new(inner),
        }
    }

    /// Creates a windowed-value coder.
    pub fn windowed_value(value: Coder, window: Coder) -> Self {
        Self::WindowedValue {
            value: Box::new(value),
            window: Box::new(window),
        }
    }

    /// Creates a serializable coder for the given type name.
    pub fn serializable(type_name: impl Into<String>) -> Self {
        Self::Serializable {
            type_name: type_name.into(),
        }
    }

    /// Creates an indexed-record coder.
    pub fn indexed_record(key_coders: Vec<Coder>, value: Coder) -> Self {
        Self::IndexedRecord {
            key_coders,
            value: Box::new(value),
        }
    }

    /// Returns the key and value coders if this is a key/value coder.
    pub fn as_kv(&self) -> Option<(&Coder, &Coder)> {
        match self {
            Self::Kv { key, value } => Some((key, value)),
            _ => None,
        }
    }

    /// Returns the element coder if this is an iterable coder.
    pub fn as_iterable(&self) -> Option<&Coder> {
        match self {
            Self::Iterable { element } => Some(element),
            _ => None,
        }
    }

    /// Returns whether this coder encodes key/value pairs.
    pub fn is_kv(&self) -> bool {
        matches!(self, Self::Kv { .. })
    }
}
