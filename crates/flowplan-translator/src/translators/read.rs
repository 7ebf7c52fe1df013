//! Source steps.

use flowplan_model::{AppliedTransform, Primitive};
use serde_json::json;

use super::{insert_display_data, payload_mismatch, single_output};
use crate::context::TranslationContext;
use crate::error::TranslateResult;
use crate::job::StepKind;
use crate::property;
use crate::registry::TransformTranslator;
use crate::serialized::encode_payload;

/// Translates a source read into a `ParallelRead` step.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ReadTranslator;

impl TransformTranslator for ReadTranslator {
    fn translate(
        &self,
        node: &AppliedTransform,
        ctx: &mut TranslationContext<'_>,
    ) -> TranslateResult<()> {
        let Some(Primitive::Read(read)) = node.primitive() else {
            return Err(payload_mismatch(node, "read"));
        };

        let mut step = ctx.add_step(&node.full_name, StepKind::ParallelRead)?;
        step.insert(property::FORMAT, read.format.as_str());
        step.insert(property::SOURCE_SPEC, read.spec.clone());
        insert_display_data(&mut step, node)?;
        ctx.add_collection_output(&mut step, single_output(node)?)?;
        ctx.push_step(step)
    }
}

/// Translates in-line elements into a `ParallelRead` step over a custom
/// source holding the encoded elements.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CreateTranslator;

impl TransformTranslator for CreateTranslator {
    fn translate(
        &self,
        node: &AppliedTransform,
        ctx: &mut TranslationContext<'_>,
    ) -> TranslateResult<()> {
        let Some(Primitive::Create(create)) = node.primitive() else {
            return Err(payload_mismatch(node, "create"));
        };
        let output = single_output(node)?;
        let coder = &ctx.collection(output)?.coder;

        let mut step = ctx.add_step(&node.full_name, StepKind::ParallelRead)?;
        step.insert(property::FORMAT, property::CUSTOM_SOURCE_FORMAT);
        step.insert(
            property::SOURCE_SPEC,
            json!({
                (property::ELEMENTS): encode_payload(&create.elements)?,
                (property::ENCODING): ctx.encode_coder(coder)?,
            }),
        );
        insert_display_data(&mut step, node)?;
        ctx.add_collection_output(&mut step, output)?;
        ctx.push_step(step)
    }
}
