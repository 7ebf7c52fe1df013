//! Per-key combine steps.

use flowplan_model::{AppliedTransform, Primitive};

use super::{
    insert_display_data, insert_parallel_input, payload_mismatch, single_input, single_output,
};
use crate::context::TranslationContext;
use crate::error::TranslateResult;
use crate::job::StepKind;
use crate::property;
use crate::registry::TransformTranslator;
use crate::serialized::{CombineBundle, encode_payload};

/// Translates a combine of grouped values into a `CombineValues` step.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CombineValuesTranslator;

impl TransformTranslator for CombineValuesTranslator {
    fn translate(
        &self,
        node: &AppliedTransform,
        ctx: &mut TranslationContext<'_>,
    ) -> TranslateResult<()> {
        let Some(Primitive::CombineValues(combine)) = node.primitive() else {
            return Err(payload_mismatch(node, "combine"));
        };

        let input = single_input(node)?;
        let collection = ctx.collection(input)?;
        let bundle = CombineBundle {
            combine_fn: combine.combine_fn.clone(),
            input_coder: collection.coder.clone(),
            windowing_strategy: collection.windowing.clone(),
        };

        let mut step = ctx.add_step(&node.full_name, StepKind::CombineValues)?;
        insert_parallel_input(&mut step, ctx, input)?;
        step.insert(property::SERIALIZED_FN, encode_payload(&bundle)?);
        insert_display_data(&mut step, node)?;
        ctx.add_collection_output(&mut step, single_output(node)?)?;
        ctx.push_step(step)
    }
}

#[cfg(test)]
mod tests {
    use flowplan_model::{Coder, CombineFnSpec, DisplayItem, Pipeline, PipelineOptions};

    use super::*;
    use crate::cloud_object::CoderRegistry;
    use crate::serialized::decode_payload;
    use crate::translators::{CreateTranslator, GroupByKeyTranslator};

    #[test]
    fn test_combine_values_step() {
        let mut pipeline = Pipeline::new();
        let pairs = pipeline
            .create(None, vec![], Coder::kv(Coder::StringUtf8, Coder::VarLong))
            .unwrap();
        let grouped = pipeline.group_by_key(None, pairs).unwrap();
        let mut sum = CombineFnSpec::new("fns::SumFn", Coder::VarLong);
        sum.display_data.push(DisplayItem::new("zero", 0_i64));
        pipeline
            .combine_values(Some("Sum"), grouped, sum, Coder::VarLong)
            .unwrap();

        let options = PipelineOptions::default();
        let coders = CoderRegistry::new();
        let mut ctx = TranslationContext::new(&pipeline, &options, &coders);
        let nodes = pipeline.transforms();
        CreateTranslator.translate(&nodes[0], &mut ctx).unwrap();
        GroupByKeyTranslator.translate(&nodes[1], &mut ctx).unwrap();
        CombineValuesTranslator.translate(&nodes[2], &mut ctx).unwrap();

        let step = &ctx.steps()[2];
        assert_eq!(step.kind, StepKind::CombineValues);
        assert_eq!(step.parallel_input().unwrap().unwrap().step_name, "GroupByKey");

        let bundle: CombineBundle =
            decode_payload(step.property(property::SERIALIZED_FN).unwrap().as_str().unwrap())
                .unwrap();
        assert_eq!(bundle.combine_fn.type_name, "fns::SumFn");
        assert_eq!(
            bundle.input_coder,
            Coder::kv(Coder::StringUtf8, Coder::iterable(Coder::VarLong))
        );

        let display_data = step.property(property::DISPLAY_DATA).unwrap();
        assert_eq!(display_data[0]["namespace"], "fns::SumFn");
    }
}
