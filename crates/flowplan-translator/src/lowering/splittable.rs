//! Streaming lowering of splittable processing.
//!
//! ```text
//! <name>/PairWithRestriction  ParallelDo              KV<In, R>
//! <name>/SplitRestriction     ParallelDo              KV<In, R>
//! <name>/AssignUniqueKey      ParallelDo              KV<Bytes, KV<In, R>>
//! <name>                      SplittableProcessKeyed  user function
//! ```

use flowplan_model::{AppliedTransform, Coder, DoFnSpec, ParDo};

use super::{add_helper_step, helper_name};
use crate::TRACING_TARGET_LOWERING;
use crate::context::{StepOutput, TranslationContext};
use crate::error::{TranslateError, TranslateResult};
use crate::job::StepKind;
use crate::property;
use crate::translators::{MainInput, build_par_do_step, single_input};

const PAIR_WITH_RESTRICTION: &str = "PairWithRestriction";
const SPLIT_RESTRICTION: &str = "SplitRestriction";
const ASSIGN_UNIQUE_KEY: &str = "AssignUniqueKey";

const PAIR_WITH_RESTRICTION_FN: &str = concat!(module_path!(), "::PairWithRestrictionFn");
const SPLIT_RESTRICTION_FN: &str = concat!(module_path!(), "::SplitRestrictionFn");
const ASSIGN_UNIQUE_KEY_FN: &str = concat!(module_path!(), "::AssignUniqueKeyFn");

pub(crate) fn translate(
    node: &AppliedTransform,
    par_do: &ParDo,
    ctx: &mut TranslationContext<'_>,
) -> TranslateResult<()> {
    let Some(restriction) = &par_do.do_fn.restriction else {
        return Err(TranslateError::invariant(format!(
            "transform '{}' has no restriction",
            node.full_name
        )));
    };
    if !ctx.is_streaming() {
        return Err(TranslateError::unsupported(format!(
            "splittable processing in '{}' requires streaming execution",
            node.full_name
        )));
    }

    tracing::debug!(
        target: TRACING_TARGET_LOWERING,
        transform = %node.full_name,
        restriction = %restriction.type_name,
        "lowering splittable processing"
    );

    let input = MainInput::of_collection(ctx, single_input(node)?)?;
    let window_coder = input.windowing.window_fn.window_coder();
    // Helpers call back into the user function for restriction handling.
    let user_fn = serde_json::to_vec(&par_do.do_fn)?;

    let with_restriction = Coder::kv(input.coder.clone(), restriction.coder.clone());
    let keyed = Coder::kv(Coder::Bytes, with_restriction.clone());

    let helpers = [
        (PAIR_WITH_RESTRICTION, PAIR_WITH_RESTRICTION_FN, with_restriction.clone()),
        (SPLIT_RESTRICTION, SPLIT_RESTRICTION_FN, with_restriction),
        (ASSIGN_UNIQUE_KEY, ASSIGN_UNIQUE_KEY_FN, keyed),
    ];

    let mut current = input.clone();
    for (helper, type_name, coder) in helpers {
        let reference = add_helper_step(
            ctx,
            &helper_name(node, helper),
            DoFnSpec::new(type_name).with_payload(user_fn.clone()),
            &current,
            StepOutput::new(coder.clone(), window_coder.clone()),
        )?;
        current = MainInput {
            reference,
            coder,
            windowing: input.windowing.clone(),
        };
    }

    let mut step = build_par_do_step(
        ctx,
        node,
        &node.full_name,
        StepKind::SplittableProcessKeyed,
        par_do,
        current,
    )?;
    step.insert(
        property::RESTRICTION_CODER,
        ctx.encode_coder(&restriction.coder)?,
    );
    ctx.push_step(step)
}

#[cfg(test)]
mod tests {
    use flowplan_model::{Pipeline, PipelineOptions, Primitive, RestrictionSpec};

    use super::*;
    use crate::cloud_object::{CloudObject, CoderRegistry};
    use crate::job::Step;
    use crate::registry::TransformTranslator;
    use crate::serialized::{FnBundle, decode_payload};
    use crate::translators::{CreateTranslator, ParDoTranslator};

    fn splittable_pipeline() -> Pipeline {
        let mut pipeline = Pipeline::new();
        let files = pipeline.create(None, vec!["a.txt".into()], Coder::StringUtf8).unwrap();
        let do_fn = DoFnSpec::new("fns::ReadLinesFn").with_restriction(RestrictionSpec {
            type_name: "fns::OffsetRange".into(),
            coder: Coder::serializable("fns::OffsetRange"),
        });
        pipeline.par_do(Some("ReadLines"), files, do_fn, Coder::StringUtf8).unwrap();
        pipeline
    }

    fn translate_pipeline(
        pipeline: &Pipeline,
        options: &PipelineOptions,
    ) -> TranslateResult<Vec<Step>> {
        let coders = CoderRegistry::new();
        let mut ctx = TranslationContext::new(pipeline, options, &coders);
        for node in pipeline.transforms() {
            match node.primitive() {
                Some(Primitive::Create(_)) => CreateTranslator.translate(node, &mut ctx)?,
                _ => ParDoTranslator.translate(node, &mut ctx)?,
            }
        }
        Ok(ctx.finish().0)
    }

    #[test]
    fn test_streaming_lowering() {
        let options = PipelineOptions::builder().with_streaming(true).build().unwrap();
        let steps = translate_pipeline(&splittable_pipeline(), &options).unwrap();

        let names: Vec<_> = steps.iter().map(|step| step.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Create",
                "ReadLines/PairWithRestriction",
                "ReadLines/SplitRestriction",
                "ReadLines/AssignUniqueKey",
                "ReadLines",
            ]
        );

        let splittable: Vec<_> = steps
            .iter()
            .filter(|step| step.kind == StepKind::SplittableProcessKeyed)
            .collect();
        assert_eq!(splittable.len(), 1);

        let step = splittable[0];
        let restriction_coder =
            CloudObject::from_value(step.property(property::RESTRICTION_CODER).unwrap()).unwrap();
        assert_eq!(
            CoderRegistry::new().decode(&restriction_coder).unwrap(),
            Coder::serializable("fns::OffsetRange")
        );

        let bundle: FnBundle =
            decode_payload(step.property(property::SERIALIZED_FN).unwrap().as_str().unwrap())
                .unwrap();
        assert_eq!(
            bundle.input_coder,
            Coder::kv(
                Coder::Bytes,
                Coder::kv(Coder::StringUtf8, Coder::serializable("fns::OffsetRange"))
            )
        );
        assert_eq!(bundle.do_fn.type_name, "fns::ReadLinesFn");
    }

    #[test]
    fn test_batch_is_unsupported() {
        let result = translate_pipeline(&splittable_pipeline(), &PipelineOptions::default());
        assert!(matches!(result, Err(TranslateError::UnsupportedShape(_))));
    }
}
