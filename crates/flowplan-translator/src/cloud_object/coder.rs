//! Coder to cloud object conversion.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use flowplan_model::Coder;
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

use super::CloudObject;
use crate::error::{TranslateError, TranslateResult};

const COMPONENT_ENCODINGS: &str = "component_encodings";
const IS_PAIR_LIKE: &str = "is_pair_like";
const IS_STREAM_LIKE: &str = "is_stream_like";
const IS_WRAPPER: &str = "is_wrapper";
const TYPE_NAME: &str = "type_name";
const KEY_CODERS: &str = "key_coders";
const VALUE_CODER: &str = "value_coder";

/// Type tags of the built-in coders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
pub enum CoderTag {
    #[strum(serialize = "kind:bytes")]
    Bytes,
    #[strum(serialize = "kind:varint")]
    VarInt,
    #[strum(serialize = "kind:varlong")]
    VarLong,
    #[strum(serialize = "kind:string_utf8")]
    StringUtf8,
    #[strum(serialize = "kind:double")]
    Double,
    #[strum(serialize = "kind:boolean")]
    Boolean,
    #[strum(serialize = "kind:void")]
    Void,
    #[strum(serialize = "kind:pair")]
    Pair,
    #[strum(serialize = "kind:stream")]
    Stream,
    #[strum(serialize = "kind:nullable")]
    Nullable,
    #[strum(serialize = "kind:length_prefix")]
    LengthPrefix,
    #[strum(serialize = "kind:windowed_value")]
    WindowedValue,
    #[strum(serialize = "kind:global_window")]
    GlobalWindow,
    #[strum(serialize = "kind:interval_window")]
    IntervalWindow,
    #[strum(serialize = "kind:serializable")]
    Serializable,
    #[strum(serialize = "kind:indexed_record")]
    IndexedRecord,
}

/// Converts the payload of a custom coder to and from cloud object fields.
///
/// Component coders are handled by the registry and never reach the
/// translator.
pub trait CoderTranslator: Send + Sync {
    /// Writes the payload as cloud object fields.
    fn encode(&self, payload: &Value) -> TranslateResult<Map<String, Value>>;

    /// Reads the payload back from cloud object fields.
    fn decode(&self, fields: &Map<String, Value>) -> TranslateResult<Value>;
}

/// Converts coders to cloud objects and back.
///
/// Built-in coders are always supported; custom coders need a
/// [`CoderTranslator`] registered for their type tag.
#[derive(Clone, Default)]
pub struct CoderRegistry {
    translators: HashMap<String, Arc<dyn CoderTranslator>>,
}

impl fmt::Debug for CoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.translators.keys().collect();
        tags.sort();
        f.debug_struct("CoderRegistry")
            .field("custom_tags", &tags)
            .finish()
    }
}

impl CoderRegistry {
    /// Creates a registry with only the built-in coders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a translator for a custom type tag.
    ///
    /// Built-in tags cannot be overridden.
    pub fn register(
        &mut self,
        type_tag: impl Into<String>,
        translator: impl CoderTranslator + 'static,
    ) -> TranslateResult<()> {
        let type_tag = type_tag.into();
        if CoderTag::from_str(&type_tag).is_ok() {
            return Err(TranslateError::unsupported(format!(
                "coder tag '{type_tag}' is built in"
            )));
        }
        self.translators.insert(type_tag, Arc::new(translator));
        Ok(())
    }

    fn get(&self, type_tag: &str) -> TranslateResult<&dyn CoderTranslator> {
        self.translators
            .get(type_tag)
            .map(|translator| translator.as_ref())
            .ok_or_else(|| {
                TranslateError::unsupported(format!("no translator for coder '{type_tag}'"))
            })
    }

    /// Encodes a coder as a cloud object.
    pub fn encode(&self, coder: &Coder) -> TranslateResult<CloudObject> {
        let object = match coder {
            Coder::Bytes => CloudObject::new(CoderTag::Bytes),
            Coder::VarInt => CloudObject::new(CoderTag::VarInt),
            Coder::VarLong => CloudObject::new(CoderTag::VarLong),
            Coder::StringUtf8 => CloudObject::new(CoderTag::StringUtf8),
            Coder::Double => CloudObject::new(CoderTag::Double),
            Coder::Boolean => CloudObject::new(CoderTag::Boolean),
            Coder::Void => CloudObject::new(CoderTag::Void),
            Coder::GlobalWindow => CloudObject::new(CoderTag::GlobalWindow),
            Coder::IntervalWindow => CloudObject::new(CoderTag::IntervalWindow),
            Coder::Kv { key, value } => CloudObject::new(CoderTag::Pair)
                .with_field(COMPONENT_ENCODINGS, self.encode_all([&**key, &**value])?)
                .with_field(IS_PAIR_LIKE, true),
            Coder::Iterable { element } => CloudObject::new(CoderTag::Stream)
                .with_field(COMPONENT_ENCODINGS, self.encode_all([&**element])?)
                .with_field(IS_STREAM_LIKE, true),
            Coder::Nullable { inner } => CloudObject::new(CoderTag::Nullable)
                .with_field(COMPONENT_ENCODINGS, self.encode_all([&**inner])?),
            Coder::LengthPrefix { inner } => CloudObject::new(CoderTag::LengthPrefix)
                .with_field(COMPONENT_ENCODINGS, self.encode_all([&**inner])?),
            Coder::WindowedValue { value, window } => CloudObject::new(CoderTag::WindowedValue)
                .with_field(COMPONENT_ENCODINGS, self.encode_all([&**value, &**window])?)
                .with_field(IS_WRAPPER, true),
            Coder::Serializable { type_name } => {
                CloudObject::new(CoderTag::Serializable).with_field(TYPE_NAME, type_name.as_str())
            }
            Coder::IndexedRecord { key_coders, value } => CloudObject::new(CoderTag::IndexedRecord)
                .with_field(KEY_CODERS, self.encode_all(key_coders)?)
                .with_field(VALUE_CODER, self.encode(value)?.to_value()?),
            Coder::Custom {
                type_tag,
                payload,
                components,
            } => {
                let mut object = CloudObject::new(type_tag.as_str());
                object.fields = self.get(type_tag)?.encode(payload)?;
                if !components.is_empty() {
                    object
                        .fields
                        .insert(COMPONENT_ENCODINGS.to_owned(), self.encode_all(components)?);
                }
                object
            }
        };
        Ok(object)
    }

    /// Decodes a coder from a cloud object.
    pub fn decode(&self, object: &CloudObject) -> TranslateResult<Coder> {
        let Ok(tag) = CoderTag::from_str(&object.type_tag) else {
            return self.decode_custom(object);
        };

        let coder = match tag {
            CoderTag::Bytes => Coder::Bytes,
            CoderTag::VarInt => Coder::VarInt,
            CoderTag::VarLong => Coder::VarLong,
            CoderTag::StringUtf8 => Coder::StringUtf8,
            CoderTag::Double => Coder::Double,
            CoderTag::Boolean => Coder::Boolean,
            CoderTag::Void => Coder::Void,
            CoderTag::GlobalWindow => Coder::GlobalWindow,
            CoderTag::IntervalWindow => Coder::IntervalWindow,
            CoderTag::Pair => {
                let [key, value] = self.components(object)?;
                Coder::kv(key, value)
            }
            CoderTag::Stream => {
                let [element] = self.components(object)?;
                Coder::iterable(element)
            }
            CoderTag::Nullable => {
                let [inner] = self.components(object)?;
                Coder::nullable(inner)
            }
            CoderTag::LengthPrefix => {
                let [inner] = self.components(object)?;
                Coder::length_prefix(inner)
            }
            CoderTag::WindowedValue => {
                let [value, window] = self.components(object)?;
                Coder::windowed_value(value, window)
            }
            CoderTag::Serializable => {
                let type_name = object
                    .required_field(TYPE_NAME)?
                    .as_str()
                    .ok_or_else(|| malformed(object, TYPE_NAME))?;
                Coder::serializable(type_name)
            }
            CoderTag::IndexedRecord => {
                let key_coders = self.decode_all(object, object.required_field(KEY_CODERS)?)?;
                let value = CloudObject::from_value(object.required_field(VALUE_CODER)?)?;
                Coder::indexed_record(key_coders, self.decode(&value)?)
            }
        };
        Ok(coder)
    }

    fn decode_custom(&self, object: &CloudObject) -> TranslateResult<Coder> {
        let translator = self.get(&object.type_tag)?;

        let mut fields = object.fields.clone();
        let components = match fields.remove(COMPONENT_ENCODINGS) {
            Some(encoded) => self.decode_all(object, &encoded)?,
            None => Vec::new(),
        };

        Ok(Coder::Custom {
            type_tag: object.type_tag.clone(),
            payload: translator.decode(&fields)?,
            components,
        })
    }

    fn encode_all<'a>(&self, coders: impl IntoIterator<Item = &'a Coder>) -> TranslateResult<Value> {
        let encoded = coders
            .into_iter()
            .map(|coder| self.encode(coder)?.to_value())
            .collect::<TranslateResult<Vec<_>>>()?;
        Ok(Value::Array(encoded))
    }

    fn decode_all(&self, object: &CloudObject, encoded: &Value) -> TranslateResult<Vec<Coder>> {
        encoded
            .as_array()
            .ok_or_else(|| malformed(object, COMPONENT_ENCODINGS))?
            .iter()
            .map(|value| self.decode(&CloudObject::from_value(value)?))
            .collect()
    }

    fn components<const N: usize>(&self, object: &CloudObject) -> TranslateResult<[Coder; N]> {
        let components = self.decode_all(object, object.required_field(COMPONENT_ENCODINGS)?)?;
        let found = components.len();
        components.try_into().map_err(|_| {
            TranslateError::unsupported(format!(
                "coder '{}' expects {N} components, found {found}",
                object.type_tag
            ))
        })
    }
}

impl From<CoderTag> for String {
    fn from(tag: CoderTag) -> Self {
        tag.as_ref().to_owned()
    }
}

fn malformed(object: &CloudObject, field: &str) -> TranslateError {
    TranslateError::unsupported(format!(
        "coder '{}' has a malformed '{field}' field",
        object.type_tag
    ))
}
