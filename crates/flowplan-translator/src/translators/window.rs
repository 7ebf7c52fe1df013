//! Window assignment steps.

use flowplan_model::{AppliedTransform, Primitive};

use super::{insert_display_data, insert_parallel_input, payload_mismatch, single_input, single_output};
use crate::context::TranslationContext;
use crate::error::TranslateResult;
use crate::job::StepKind;
use crate::property;
use crate::registry::TransformTranslator;
use crate::serialized::encode_payload;

/// Translates window assignment into a `Bucket` step carrying the
/// resulting windowing strategy.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AssignWindowsTranslator;

impl TransformTranslator for AssignWindowsTranslator {
    fn translate(
        &self,
        node: &AppliedTransform,
        ctx: &mut TranslationContext<'_>,
    ) -> TranslateResult<()> {
        let Some(Primitive::AssignWindows(assign)) = node.primitive() else {
            return Err(payload_mismatch(node, "window assignment"));
        };

        let output = single_output(node)?;
        let windowing = ctx
            .collection(output)?
            .windowing
            .with_window_fn(assign.window_fn.clone());

        let mut step = ctx.add_step(&node.full_name, StepKind::Bucket)?;
        insert_parallel_input(&mut step, ctx, single_input(node)?)?;
        step.insert(property::SERIALIZED_FN, encode_payload(&windowing)?);
        insert_display_data(&mut step, node)?;
        ctx.add_collection_output(&mut step, output)?;
        ctx.push_step(step)
    }
}
