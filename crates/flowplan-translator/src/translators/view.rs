//! Broadcast view steps.

use flowplan_model::{AppliedTransform, Primitive};

use super::payload_mismatch;
use crate::context::TranslationContext;
use crate::error::TranslateResult;
use crate::lowering;
use crate::registry::TransformTranslator;

/// Translates a view into an indexed materialization followed by a
/// `CollectionToSingleton` step.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CreateViewTranslator;

impl TransformTranslator for CreateViewTranslator {
    fn translate(
        &self,
        node: &AppliedTransform,
        ctx: &mut TranslationContext<'_>,
    ) -> TranslateResult<()> {
        let Some(Primitive::CreateView(create_view)) = node.primitive() else {
            return Err(payload_mismatch(node, "view"));
        };
        lowering::side_input::translate(node, create_view, ctx)
    }
}
