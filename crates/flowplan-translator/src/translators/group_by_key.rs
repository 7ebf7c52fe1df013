//! Grouping steps.

use flowplan_model::{AppliedTransform, Primitive, WindowingStrategy};

use super::{
    insert_display_data, insert_parallel_input, payload_mismatch, single_input, single_output,
};
use crate::context::{StepBuilder, StepOutput, TranslationContext};
use crate::error::TranslateResult;
use crate::job::{OutputReference, StepKind};
use crate::property;
use crate::registry::TransformTranslator;
use crate::serialized::encode_payload;

/// Translates grouping by key into a `GroupByKey` step.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct GroupByKeyTranslator;

impl TransformTranslator for GroupByKeyTranslator {
    fn translate(
        &self,
        node: &AppliedTransform,
        ctx: &mut TranslationContext<'_>,
    ) -> TranslateResult<()> {
        let Some(Primitive::GroupByKey(group_by_key)) = node.primitive() else {
            return Err(payload_mismatch(node, "grouping"));
        };

        let input = single_input(node)?;
        let windowing = &ctx.collection(input)?.windowing;

        let mut step = ctx.add_step(&node.full_name, StepKind::GroupByKey)?;
        insert_parallel_input(&mut step, ctx, input)?;
        write_group_by_key_properties(&mut step, windowing, false)?;
        if group_by_key.disallow_combiner_lifting {
            step.insert(property::DISALLOW_COMBINER_LIFTING, true);
        }
        insert_display_data(&mut step, node)?;
        ctx.add_collection_output(&mut step, single_output(node)?)?;
        ctx.push_step(step)
    }
}

/// Adds a grouping step that is not backed by a pipeline transform.
pub(crate) fn add_group_by_key_step(
    ctx: &mut TranslationContext<'_>,
    name: &str,
    input: &OutputReference,
    windowing: &WindowingStrategy,
    output: StepOutput,
    sort_values: bool,
) -> TranslateResult<OutputReference> {
    let mut step = ctx.add_step(name, StepKind::GroupByKey)?;
    step.insert_serialized(property::PARALLEL_INPUT, input)?;
    write_group_by_key_properties(&mut step, windowing, sort_values)?;
    let reference = ctx.add_output(&mut step, output)?;
    ctx.push_step(step)?;
    Ok(reference)
}

fn write_group_by_key_properties(
    step: &mut StepBuilder,
    windowing: &WindowingStrategy,
    sort_values: bool,
) -> TranslateResult<()> {
    step.insert(property::SERIALIZED_FN, encode_payload(windowing)?);
    step.insert(
        property::IS_MERGING_WINDOW_FN,
        windowing.window_fn.is_merging(),
    );
    if sort_values {
        step.insert(property::SORT_VALUES, true);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use flowplan_model::{Coder, Pipeline, PipelineOptions, WindowFn};
    use jiff::SignedDuration;

    use super::*;
    use crate::cloud_object::CoderRegistry;
    use crate::serialized::decode_payload;
    use crate::translators::{AssignWindowsTranslator, CreateTranslator};

    #[test]
    fn test_group_by_key_over_sessions() {
        let mut pipeline = Pipeline::new();
        let pairs = pipeline
            .create(None, vec![], Coder::kv(Coder::StringUtf8, Coder::VarInt))
            .unwrap();
        let sessions = pipeline
            .window_into(None, pairs, WindowFn::sessions(SignedDuration::from_secs(30)))
            .unwrap();
        pipeline.group_by_key(Some("Group"), sessions).unwrap();

        let options = PipelineOptions::default();
        let coders = CoderRegistry::new();
        let mut ctx = TranslationContext::new(&pipeline, &options, &coders);
        let nodes = pipeline.transforms();
        CreateTranslator.translate(&nodes[0], &mut ctx).unwrap();
        AssignWindowsTranslator.translate(&nodes[1], &mut ctx).unwrap();
        GroupByKeyTranslator.translate(&nodes[2], &mut ctx).unwrap();

        let step = &ctx.steps()[2];
        assert_eq!(step.kind, StepKind::GroupByKey);
        assert_eq!(step.property(property::IS_MERGING_WINDOW_FN).unwrap(), true);
        assert!(step.property(property::SORT_VALUES).is_none());

        let windowing: WindowingStrategy =
            decode_payload(step.property(property::SERIALIZED_FN).unwrap().as_str().unwrap())
                .unwrap();
        assert!(windowing.window_fn.is_merging());

        let encoding = &step.outputs().unwrap()[0].encoding;
        let windowed = coders.decode(encoding).unwrap();
        assert_eq!(
            windowed,
            Coder::windowed_value(
                Coder::kv(Coder::StringUtf8, Coder::iterable(Coder::VarInt)),
                Coder::IntervalWindow,
            )
        );
    }
}
