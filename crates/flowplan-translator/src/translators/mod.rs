//! Built-in transform handlers.

mod combine;
mod flatten;
mod group_by_key;
mod par_do;
mod read;
mod view;
mod window;

use flowplan_model::{AppliedTransform, CollectionId, Output};

pub(crate) use combine::CombineValuesTranslator;
pub(crate) use flatten::FlattenTranslator;
pub(crate) use group_by_key::{GroupByKeyTranslator, add_group_by_key_step};
pub(crate) use par_do::{MainInput, ParDoTranslator, build_par_do_step};
pub(crate) use read::{CreateTranslator, ReadTranslator};
pub(crate) use view::CreateViewTranslator;
pub(crate) use window::AssignWindowsTranslator;

use crate::context::{StepBuilder, TranslationContext};
use crate::display::DisplayData;
use crate::error::{TranslateError, TranslateResult};
use crate::property;

/// Error for a handler invoked on a transform of another kind.
fn payload_mismatch(node: &AppliedTransform, expected: &str) -> TranslateError {
    TranslateError::invariant(format!(
        "transform '{}' dispatched to the {expected} handler",
        node.full_name
    ))
}

/// Returns the only main input of `node`.
pub(crate) fn single_input(node: &AppliedTransform) -> TranslateResult<CollectionId> {
    match node.inputs.as_slice() {
        [input] => Ok(*input),
        inputs => Err(TranslateError::unsupported(format!(
            "transform '{}' expects one input, found {}",
            node.full_name,
            inputs.len()
        ))),
    }
}

/// Returns the only output collection of `node`.
pub(crate) fn single_output(node: &AppliedTransform) -> TranslateResult<CollectionId> {
    match &node.output {
        Output::Collection { collection } => Ok(*collection),
        _ => Err(TranslateError::unsupported(format!(
            "transform '{}' expects a single output collection",
            node.full_name
        ))),
    }
}

/// Writes the transform's display records, if any.
pub(crate) fn insert_display_data(
    step: &mut StepBuilder,
    node: &AppliedTransform,
) -> TranslateResult<()> {
    if let Some(display_data) = DisplayData::for_transform(node)?.into_property()? {
        step.insert(property::DISPLAY_DATA, display_data);
    }
    Ok(())
}

/// Wires `parallel_input` of a step to the producer of `input`.
fn insert_parallel_input(
    step: &mut StepBuilder,
    ctx: &TranslationContext<'_>,
    input: CollectionId,
) -> TranslateResult<()> {
    let reference = ctx.output_ref(input)?;
    step.insert_serialized(property::PARALLEL_INPUT, &reference)
}
