//! Display metadata records written under `display_data`.

use flowplan_model::{AppliedTransform, DisplayItem, DisplayValue, Primitive, simple_type_name};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display};

use crate::error::{TranslateError, TranslateResult};

const FN_KEY: &str = "fn";
const FN_LABEL: &str = "Transform Function";

/// Type of a display record value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayType {
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Duration,
    Class,
}

/// One display record as written into a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRecord {
    /// Key, unique within the namespace.
    pub key: String,
    /// Type of `value`.
    #[serde(rename = "type")]
    pub kind: DisplayType,
    /// The value; durations are in milliseconds.
    pub value: Value,
    /// Unqualified type name of a `CLASS` value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_value: Option<String>,
    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Link to further information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    /// Fully-qualified type of the contributing object.
    pub namespace: String,
}

impl DisplayRecord {
    fn from_item(item: &DisplayItem, namespace: &str) -> TranslateResult<Self> {
        let (kind, value, short_value) = match &item.value {
            DisplayValue::String(value) => (DisplayType::String, Value::from(value.as_str()), None),
            DisplayValue::Integer(value) => (DisplayType::Integer, Value::from(*value), None),
            DisplayValue::Float(value) if value.is_finite() => {
                (DisplayType::Float, Value::from(*value), None)
            }
            DisplayValue::Float(value) => {
                return Err(TranslateError::unsupported(format!(
                    "display item '{}' has non-finite value {value}",
                    item.key
                )));
            }
            DisplayValue::Boolean(value) => (DisplayType::Boolean, Value::from(*value), None),
            DisplayValue::Timestamp(value) => {
                (DisplayType::Timestamp, Value::from(value.to_string()), None)
            }
            DisplayValue::Duration(value) => {
                let millis = i64::try_from(value.as_millis()).map_err(|_| {
                    TranslateError::unsupported(format!(
                        "display item '{}' has a duration out of range",
                        item.key
                    ))
                })?;
                (DisplayType::Duration, Value::from(millis), None)
            }
            DisplayValue::Class(type_name) => (
                DisplayType::Class,
                Value::from(type_name.as_str()),
                Some(simple_type_name(type_name).to_owned()),
            ),
        };

        Ok(Self {
            key: item.key.clone(),
            kind,
            value,
            short_value,
            label: item.label.clone(),
            link_url: item.link_url.clone(),
            namespace: item
                .namespace
                .clone()
                .unwrap_or_else(|| namespace.to_owned()),
        })
    }
}

/// Display records collected for one step.
#[derive(Debug, Default)]
pub(crate) struct DisplayData {
    records: Vec<DisplayRecord>,
}

impl DisplayData {
    /// Collects the records of a primitive transform and its function.
    pub fn for_transform(node: &AppliedTransform) -> TranslateResult<Self> {
        let mut data = Self::default();
        let Some(primitive) = node.primitive() else {
            return Ok(data);
        };

        data.add_items(&node.display_data, primitive.type_name())?;
        match primitive {
            Primitive::ParDo(par_do) => data.add_function(
                primitive.type_name(),
                &par_do.do_fn.type_name,
                &par_do.do_fn.display_data,
            )?,
            Primitive::CombineValues(combine) => data.add_items(
                &combine.combine_fn.display_data,
                &combine.combine_fn.type_name,
            )?,
            _ => {}
        }
        Ok(data)
    }

    fn add_items(&mut self, items: &[DisplayItem], namespace: &str) -> TranslateResult<()> {
        for item in items {
            self.records.push(DisplayRecord::from_item(item, namespace)?);
        }
        Ok(())
    }

    /// Adds the records of a processing function, preceded by a synthetic
    /// `fn` record unless the function supplies its own.
    fn add_function(
        &mut self,
        transform_namespace: &str,
        type_name: &str,
        items: &[DisplayItem],
    ) -> TranslateResult<()> {
        if !items.iter().any(|item| item.key == FN_KEY) {
            let synthetic = DisplayItem::class(FN_KEY, type_name).with_label(FN_LABEL);
            self.records
                .push(DisplayRecord::from_item(&synthetic, transform_namespace)?);
        }
        self.add_items(items, type_name)
    }

    /// Returns the `display_data` property, or `None` when there are no
    /// records.
    pub fn into_property(self) -> TranslateResult<Option<Value>> {
        if self.records.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_value(self.records)?))
    }
}

#[cfg(test)]
mod tests {
    use flowplan_model::{
        CollectionId, DoFnSpec, GroupByKey, Output, ParDo, TransformId, TransformKind,
    };
    use jiff::SignedDuration;
    use serde_json::json;

    use super::*;

    fn applied(primitive: Primitive, display_data: Vec<DisplayItem>) -> AppliedTransform {
        AppliedTransform {
            id: TransformId::from(1),
            full_name: "Step".into(),
            kind: TransformKind::Primitive { primitive },
            inputs: vec![CollectionId::from(0)],
            output: Output::Done,
            children: Vec::new(),
            parent: None,
            display_data,
        }
    }

    fn par_do(do_fn: DoFnSpec) -> Primitive {
        Primitive::ParDo(ParDo {
            do_fn,
            main_output_tag: "main".into(),
            side_inputs: Vec::new(),
        })
    }

    #[test]
    fn test_function_records() {
        let do_fn = DoFnSpec::new("my_pipeline::fns::EchoFn")
            .with_display_item(DisplayItem::new("foo", "bar"))
            .with_display_item(
                DisplayItem::class("foo2", "my_pipeline::Config")
                    .with_label("Test Class")
                    .with_link_url("http://www.example.com"),
            );
        let primitive = par_do(do_fn);
        let par_do_namespace = primitive.type_name();
        let node = applied(primitive, Vec::new());

        let property = DisplayData::for_transform(&node)
            .unwrap()
            .into_property()
            .unwrap()
            .unwrap();
        assert_eq!(
            property,
            json!([
                {
                    "key": "fn",
                    "type": "CLASS",
                    "value": "my_pipeline::fns::EchoFn",
                    "shortValue": "EchoFn",
                    "label": "Transform Function",
                    "namespace": par_do_namespace,
                },
                {
                    "key": "foo",
                    "type": "STRING",
                    "value": "bar",
                    "namespace": "my_pipeline::fns::EchoFn",
                },
                {
                    "key": "foo2",
                    "type": "CLASS",
                    "value": "my_pipeline::Config",
                    "shortValue": "Config",
                    "label": "Test Class",
                    "linkUrl": "http://www.example.com",
                    "namespace": "my_pipeline::fns::EchoFn",
                },
            ])
        );
    }

    #[test]
    fn test_function_supplied_fn_record_wins() {
        let do_fn = DoFnSpec::new("fns::WrapperFn")
            .with_display_item(DisplayItem::class("fn", "fns::InnerFn"));
        let node = applied(par_do(do_fn), Vec::new());

        let records = DisplayData::for_transform(&node).unwrap().records;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, "fns::InnerFn");
        assert_eq!(records[0].namespace, "fns::WrapperFn");
    }

    #[test]
    fn test_transform_records_and_value_types() {
        let items = vec![
            DisplayItem::new("window", SignedDuration::from_secs(90)),
            DisplayItem::new("ratio", 0.5),
            DisplayItem::new("strict", true).with_namespace("custom::Namespace"),
        ];
        let node = applied(Primitive::GroupByKey(GroupByKey::default()), items);

        let records = DisplayData::for_transform(&node).unwrap().records;
        assert_eq!(records[0].kind, DisplayType::Duration);
        assert_eq!(records[0].value, 90_000);
        assert_eq!(records[1].value, 0.5);
        assert_eq!(records[2].namespace, "custom::Namespace");
        assert!(records[0].namespace.ends_with("GroupByKey"));
    }

    #[test]
    fn test_no_records_omits_property() {
        let node = applied(Primitive::GroupByKey(GroupByKey::default()), Vec::new());
        assert!(DisplayData::for_transform(&node).unwrap().into_property().unwrap().is_none());
    }

    #[test]
    fn test_unrepresentable_values_are_rejected() {
        let node = applied(
            Primitive::GroupByKey(GroupByKey::default()),
            vec![DisplayItem::new("ratio", f64::NAN)],
        );
        assert!(matches!(
            DisplayData::for_transform(&node),
            Err(TranslateError::UnsupportedShape(message)) if message.contains("ratio")
        ));

        let node = applied(
            Primitive::GroupByKey(GroupByKey::default()),
            vec![DisplayItem::new("forever", f64::INFINITY)],
        );
        assert!(DisplayData::for_transform(&node).is_err());

        let node = applied(
            Primitive::GroupByKey(GroupByKey::default()),
            vec![DisplayItem::new("eternity", SignedDuration::MAX)],
        );
        assert!(DisplayData::for_transform(&node).is_err());
    }
}
