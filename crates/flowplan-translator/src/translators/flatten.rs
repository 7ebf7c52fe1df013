//! Merge steps.

use flowplan_model::{AppliedTransform, Primitive};

use super::{insert_display_data, payload_mismatch, single_output};
use crate::context::TranslationContext;
use crate::error::{TranslateError, TranslateResult};
use crate::job::StepKind;
use crate::property;
use crate::registry::TransformTranslator;

/// Translates a merge of collections into a `Flatten` step.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FlattenTranslator;

impl TransformTranslator for FlattenTranslator {
    fn translate(
        &self,
        node: &AppliedTransform,
        ctx: &mut TranslationContext<'_>,
    ) -> TranslateResult<()> {
        let Some(Primitive::Flatten(_)) = node.primitive() else {
            return Err(payload_mismatch(node, "flatten"));
        };
        if node.inputs.is_empty() {
            return Err(TranslateError::unsupported(format!(
                "flatten '{}' has no inputs",
                node.full_name
            )));
        }

        let inputs = node
            .inputs
            .iter()
            .map(|input| ctx.output_ref(*input))
            .collect::<TranslateResult<Vec<_>>>()?;

        let mut step = ctx.add_step(&node.full_name, StepKind::Flatten)?;
        step.insert_serialized(property::INPUTS, &inputs)?;
        insert_display_data(&mut step, node)?;
        ctx.add_collection_output(&mut step, single_output(node)?)?;
        ctx.push_step(step)
    }
}
