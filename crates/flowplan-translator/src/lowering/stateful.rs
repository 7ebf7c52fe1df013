//! Batch lowering of per-key stateful processing.
//!
//! ```text
//! <name>/ReifyWindows                 ParallelDo   KV<K, WindowedValue<V>>
//! <name>/GroupByKeyAndSortValuesOnly  GroupByKey   KV<K, Iterable<WindowedValue<V>>>
//! <name>                              ParallelDo   user function
//! ```
//!
//! Windows are moved into the values before grouping, so the grouping
//! runs in the global window and the final step sees every value of a key
//! in timestamp order.

use flowplan_model::{AppliedTransform, Coder, DoFnSpec, ParDo, WindowingStrategy};

use super::{add_helper_step, helper_name};
use crate::TRACING_TARGET_LOWERING;
use crate::context::{StepOutput, TranslationContext};
use crate::error::{TranslateError, TranslateResult};
use crate::job::StepKind;
use crate::translators::{MainInput, add_group_by_key_step, build_par_do_step, single_input};

const REIFY_WINDOWS: &str = "ReifyWindows";
const GROUP_AND_SORT: &str = "GroupByKeyAndSortValuesOnly";
const REIFY_WINDOWED_VALUE_FN: &str = concat!(module_path!(), "::ReifyWindowedValueFn");

pub(crate) fn translate(
    node: &AppliedTransform,
    par_do: &ParDo,
    ctx: &mut TranslationContext<'_>,
) -> TranslateResult<()> {
    let input = MainInput::of_collection(ctx, single_input(node)?)?;
    let Some((key, value)) = input.coder.as_kv() else {
        return Err(TranslateError::unsupported(format!(
            "stateful processing in '{}' requires a keyed input",
            node.full_name
        )));
    };

    tracing::debug!(
        target: TRACING_TARGET_LOWERING,
        transform = %node.full_name,
        "lowering stateful processing"
    );

    let window_coder = input.windowing.window_fn.window_coder();
    let reified_value = Coder::windowed_value(value.clone(), window_coder);
    let reified = Coder::kv(key.clone(), reified_value.clone());
    let grouped = Coder::kv(key.clone(), Coder::iterable(reified_value));

    let reified_ref = add_helper_step(
        ctx,
        &helper_name(node, REIFY_WINDOWS),
        DoFnSpec::new(REIFY_WINDOWED_VALUE_FN),
        &input,
        StepOutput::new(reified, Coder::GlobalWindow),
    )?;

    let grouped_ref = add_group_by_key_step(
        ctx,
        &helper_name(node, GROUP_AND_SORT),
        &reified_ref,
        &WindowingStrategy::global(),
        StepOutput::new(grouped.clone(), Coder::GlobalWindow),
        true,
    )?;

    let grouped_input = MainInput {
        reference: grouped_ref,
        coder: grouped,
        windowing: input.windowing,
    };
    let step = build_par_do_step(
        ctx,
        node,
        &node.full_name,
        StepKind::ParallelDo,
        par_do,
        grouped_input,
    )?;
    ctx.push_step(step)
}

#[cfg(test)]
mod tests {
    use flowplan_model::{Pipeline, PipelineOptions, Primitive, StateKind, StateSpec};

    use super::*;
    use crate::cloud_object::CoderRegistry;
    use crate::property;
    use crate::registry::TransformTranslator;
    use crate::translators::{CreateTranslator, ParDoTranslator};

    fn stateful_fn() -> DoFnSpec {
        DoFnSpec::new("fns::DedupFn").with_state(StateSpec {
            id: "seen".into(),
            kind: StateKind::Set,
            coder: Coder::StringUtf8,
        })
    }

    fn translate_pipeline(pipeline: &Pipeline) -> TranslateResult<Vec<crate::job::Step>> {
        let options = PipelineOptions::default();
        let coders = CoderRegistry::new();
        let mut ctx = TranslationContext::new(pipeline, &options, &coders);
        for node in pipeline.transforms() {
            match node.primitive() {
                Some(Primitive::Create(_)) => CreateTranslator.translate(node, &mut ctx)?,
                _ => ParDoTranslator.translate(node, &mut ctx)?,
            }
        }
        Ok(ctx.finish().0)
    }

    #[test]
    fn test_lowered_step_sequence() {
        let mut pipeline = Pipeline::new();
        let pairs = pipeline
            .create(None, vec![], Coder::kv(Coder::StringUtf8, Coder::VarInt))
            .unwrap();
        pipeline.par_do(Some("Dedup"), pairs, stateful_fn(), Coder::VarInt).unwrap();

        let steps = translate_pipeline(&pipeline).unwrap();
        let shape: Vec<_> = steps
            .iter()
            .map(|step| (step.kind, step.name.as_str()))
            .collect();
        assert_eq!(
            shape,
            [
                (StepKind::ParallelRead, "Create"),
                (StepKind::ParallelDo, "Dedup/ReifyWindows"),
                (StepKind::GroupByKey, "Dedup/GroupByKeyAndSortValuesOnly"),
                (StepKind::ParallelDo, "Dedup"),
            ]
        );

        assert_eq!(steps[2].property(property::SORT_VALUES).unwrap(), true);
        assert_eq!(
            steps[3].parallel_input().unwrap().unwrap().step_name,
            "Dedup/GroupByKeyAndSortValuesOnly"
        );
        assert!(steps[3].property(property::USES_KEYED_STATE).is_none());
    }

    #[test]
    fn test_unkeyed_input_is_unsupported() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        pipeline.par_do(None, numbers, stateful_fn(), Coder::VarInt).unwrap();

        assert!(matches!(
            translate_pipeline(&pipeline),
            Err(TranslateError::UnsupportedShape(_))
        ));
    }
}
