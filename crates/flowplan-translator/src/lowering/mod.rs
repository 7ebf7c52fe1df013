//! Passes that lower one transform into several steps.
//!
//! Helper steps are named `<transform>/<Helper>` and run functions the
//! workers provide; their outputs are intermediate and never registered
//! for a pipeline collection.

pub(crate) mod side_input;
pub(crate) mod splittable;
pub(crate) mod stateful;

use flowplan_model::{AppliedTransform, DoFnSpec, MAIN_OUTPUT_TAG};

use crate::context::{StepOutput, TranslationContext};
use crate::error::TranslateResult;
use crate::job::{OutputReference, StepKind};
use crate::property;
use crate::serialized::{BundleOutput, FnBundle, encode_payload};
use crate::translators::MainInput;

/// Returns the name of a helper step of `node`.
fn helper_name(node: &AppliedTransform, helper: &str) -> String {
    format!("{}/{helper}", node.full_name)
}

/// Adds a single-output `ParallelDo` step running a worker-provided
/// function over `input`.
fn add_helper_step(
    ctx: &mut TranslationContext<'_>,
    name: &str,
    do_fn: DoFnSpec,
    input: &MainInput,
    output: StepOutput,
) -> TranslateResult<OutputReference> {
    let mut step = ctx.add_step(name, StepKind::ParallelDo)?;
    step.insert_serialized(property::PARALLEL_INPUT, &input.reference)?;
    let reference = ctx.add_output(&mut step, output)?;

    let bundle = FnBundle {
        do_fn,
        windowing_strategy: input.windowing.clone(),
        input_coder: input.coder.clone(),
        main_output_tag: MAIN_OUTPUT_TAG.to_owned(),
        outputs: vec![BundleOutput {
            tag: MAIN_OUTPUT_TAG.to_owned(),
            output_name: reference.output_name.clone(),
        }],
        side_inputs: Vec::new(),
    };
    step.insert(property::SERIALIZED_FN, encode_payload(&bundle)?);
    ctx.push_step(step)?;
    Ok(reference)
}
