//! Materialization of broadcast views.
//!
//! A view becomes a helper step writing the collection as indexed records
//! followed by a `CollectionToSingleton` step whose output stands in for
//! the view collection.

use flowplan_model::{AppliedTransform, Coder, CreateView, DoFnSpec, ViewKind};
use serde::Serialize;
use strum::{AsRefStr, Display};

use super::{add_helper_step, helper_name};
use crate::TRACING_TARGET_LOWERING;
use crate::context::{StepOutput, TranslationContext};
use crate::error::TranslateResult;
use crate::job::StepKind;
use crate::property;
use crate::serialized::encode_payload;
use crate::translators::{MainInput, insert_display_data, single_input, single_output};

const TO_INDEXED_RECORDS: &str = "ToIndexedRecords";
const TO_INDEXED_RECORDS_FN: &str = concat!(module_path!(), "::ToIndexedRecordsFn");

/// How workers read a materialized view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
enum AccessPattern {
    Singleton,
    Iterable,
}

pub(crate) fn translate(
    node: &AppliedTransform,
    create_view: &CreateView,
    ctx: &mut TranslationContext<'_>,
) -> TranslateResult<()> {
    let input = MainInput::of_collection(ctx, single_input(node)?)?;
    let window_coder = input.windowing.window_fn.window_coder();

    let (access_pattern, key_coders) = match &create_view.view {
        ViewKind::Singleton { .. } => (AccessPattern::Singleton, vec![window_coder.clone()]),
        ViewKind::Iterable => (
            AccessPattern::Iterable,
            vec![window_coder.clone(), Coder::VarLong],
        ),
    };

    tracing::debug!(
        target: TRACING_TARGET_LOWERING,
        transform = %node.full_name,
        access_pattern = %access_pattern,
        "materializing view"
    );

    let indexed = Coder::indexed_record(key_coders, input.coder.clone());
    let helper_fn =
        DoFnSpec::new(TO_INDEXED_RECORDS_FN).with_payload(serde_json::to_vec(&access_pattern)?);
    let materialized = add_helper_step(
        ctx,
        &helper_name(node, TO_INDEXED_RECORDS),
        helper_fn,
        &input,
        StepOutput::new(indexed, window_coder).indexed(),
    )?;

    let mut step = ctx.add_step(&node.full_name, StepKind::CollectionToSingleton)?;
    step.insert_serialized(property::PARALLEL_INPUT, &materialized)?;
    step.insert(property::ACCESS_PATTERN, access_pattern.as_ref());
    if let ViewKind::Singleton { default_value } = &create_view.view {
        step.insert(property::HAS_DEFAULT, default_value.is_some());
        if let Some(default_value) = default_value {
            step.insert(property::DEFAULT_VALUE, encode_payload(default_value)?);
        }
    }
    insert_display_data(&mut step, node)?;
    ctx.add_collection_output(&mut step, single_output(node)?)?;
    ctx.push_step(step)
}
