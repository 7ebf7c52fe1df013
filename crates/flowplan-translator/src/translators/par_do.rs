//! Processing steps.

use flowplan_model::{AppliedTransform, Coder, Output, ParDo, Primitive, WindowingStrategy};
use serde_json::{Map, Value};

use super::{insert_display_data, payload_mismatch, single_input};
use crate::context::{StepBuilder, TranslationContext};
use crate::error::{TranslateError, TranslateResult};
use crate::job::{OutputReference, StepKind};
use crate::lowering;
use crate::property;
use crate::registry::TransformTranslator;
use crate::serialized::{BundleOutput, FnBundle, encode_payload};

/// The main input a processing step reads.
#[derive(Debug, Clone)]
pub(crate) struct MainInput {
    pub reference: OutputReference,
    pub coder: Coder,
    pub windowing: WindowingStrategy,
}

impl MainInput {
    /// Reads the producer, coder and windowing of a pipeline collection.
    pub fn of_collection(
        ctx: &TranslationContext<'_>,
        id: flowplan_model::CollectionId,
    ) -> TranslateResult<Self> {
        let collection = ctx.collection(id)?;
        Ok(Self {
            reference: ctx.output_ref(id)?,
            coder: collection.coder.clone(),
            windowing: collection.windowing.clone(),
        })
    }
}

/// Translates per-element processing.
///
/// Splittable functions and, in batch mode, stateful functions are handed
/// to their lowering passes; everything else becomes one `ParallelDo` step.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ParDoTranslator;

impl TransformTranslator for ParDoTranslator {
    fn translate(
        &self,
        node: &AppliedTransform,
        ctx: &mut TranslationContext<'_>,
    ) -> TranslateResult<()> {
        let Some(Primitive::ParDo(par_do)) = node.primitive() else {
            return Err(payload_mismatch(node, "processing"));
        };

        if par_do.do_fn.is_splittable() {
            return lowering::splittable::translate(node, par_do, ctx);
        }
        if par_do.do_fn.is_stateful() && !ctx.is_streaming() {
            return lowering::stateful::translate(node, par_do, ctx);
        }

        let input = MainInput::of_collection(ctx, single_input(node)?)?;
        let step = build_par_do_step(ctx, node, &node.full_name, StepKind::ParallelDo, par_do, input)?;
        ctx.push_step(step)
    }
}

/// Builds the step running a user processing function over `input`.
///
/// Declares and registers every output collection of `node`, wires side
/// inputs and writes the function bundle. The step is returned unpushed so
/// callers can add kind-specific properties.
pub(crate) fn build_par_do_step(
    ctx: &mut TranslationContext<'_>,
    node: &AppliedTransform,
    name: &str,
    kind: StepKind,
    par_do: &ParDo,
    input: MainInput,
) -> TranslateResult<StepBuilder> {
    let mut step = ctx.add_step(name, kind)?;
    step.insert_serialized(property::PARALLEL_INPUT, &input.reference)?;

    if !par_do.side_inputs.is_empty() {
        let mut side_inputs = Map::new();
        for side_input in &par_do.side_inputs {
            let reference = ctx.output_ref(side_input.view)?;
            side_inputs.insert(side_input.tag.clone(), serde_json::to_value(reference)?);
        }
        step.insert(property::NON_PARALLEL_INPUTS, Value::Object(side_inputs));
    }

    let tagged: Vec<(String, _)> = match &node.output {
        Output::Collection { collection } => vec![(par_do.main_output_tag.clone(), *collection)],
        Output::Tuple { members } => members
            .iter()
            .map(|member| (member.tag.clone(), member.collection))
            .collect(),
        Output::Done => Vec::new(),
    };
    if !tagged.iter().any(|(tag, _)| *tag == par_do.main_output_tag) {
        return Err(TranslateError::unsupported(format!(
            "transform '{}' does not produce its main output '{}'",
            node.full_name, par_do.main_output_tag
        )));
    }

    let mut outputs = Vec::with_capacity(tagged.len());
    for (tag, collection) in tagged {
        let reference = ctx.add_collection_output(&mut step, collection)?;
        outputs.push(BundleOutput {
            tag,
            output_name: reference.output_name,
        });
    }

    let bundle = FnBundle {
        do_fn: par_do.do_fn.clone(),
        windowing_strategy: input.windowing,
        input_coder: input.coder,
        main_output_tag: par_do.main_output_tag.clone(),
        outputs,
        side_inputs: par_do
            .side_inputs
            .iter()
            .map(|side_input| side_input.tag.clone())
            .collect(),
    };
    step.insert(property::SERIALIZED_FN, encode_payload(&bundle)?);
    insert_display_data(&mut step, node)?;

    if par_do.do_fn.uses_keyed_state() {
        step.insert(property::USES_KEYED_STATE, "true");
    }
    Ok(step)
}
