//! Hierarchy traversal and handler dispatch.

use std::collections::{HashMap, HashSet};

use flowplan_model::{AppliedTransform, Pipeline, TransformId};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::TRACING_TARGET_WALKER;
use crate::context::TranslationContext;
use crate::error::{TranslateError, TranslateResult};
use crate::registry::TranslatorRegistry;

/// Walks a pipeline depth-first in application order and dispatches every
/// primitive to its handler.
#[derive(Debug)]
pub(crate) struct PipelineWalker<'r> {
    registry: &'r TranslatorRegistry,
}

impl<'r> PipelineWalker<'r> {
    pub fn new(registry: &'r TranslatorRegistry) -> Self {
        Self { registry }
    }

    /// Translates every transform of the context's pipeline.
    ///
    /// Composite outputs are checked before anything else, so a partially
    /// bound composite fails with a binding error even when a downstream
    /// transform reads its unbound member.
    pub fn walk(&self, ctx: &mut TranslationContext<'_>) -> TranslateResult<()> {
        let pipeline = ctx.pipeline();
        for node in pipeline.transforms().iter().filter(|node| node.is_composite()) {
            check_composite_outputs(pipeline, node)?;
        }
        check_data_flow(pipeline)?;

        let mut visited = HashSet::new();
        for root in pipeline.roots() {
            self.visit(pipeline, *root, &mut visited, ctx)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        pipeline: &Pipeline,
        id: TransformId,
        visited: &mut HashSet<TransformId>,
        ctx: &mut TranslationContext<'_>,
    ) -> TranslateResult<()> {
        let node = pipeline.transform(id)?;
        if !visited.insert(id) {
            return Err(TranslateError::unsupported(format!(
                "transform '{}' appears more than once in the hierarchy",
                node.full_name
            )));
        }

        match node.primitive() {
            None => {
                tracing::trace!(
                    target: TRACING_TARGET_WALKER,
                    transform = %node.full_name,
                    children = node.children.len(),
                    "entering composite"
                );
                for child in &node.children {
                    self.visit(pipeline, *child, visited, ctx)?;
                }
                Ok(())
            }
            Some(primitive) => {
                tracing::trace!(
                    target: TRACING_TARGET_WALKER,
                    transform = %node.full_name,
                    urn = primitive.urn(),
                    "visiting primitive"
                );
                self.registry.get(primitive.urn())?.translate(node, ctx)
            }
        }
    }
}

/// Rejects composites exposing an output no transform produces.
fn check_composite_outputs(pipeline: &Pipeline, node: &AppliedTransform) -> TranslateResult<()> {
    for (tag, id) in node.output.collections() {
        if !pipeline.collection(id)?.is_bound() {
            let member = match tag {
                Some(tag) => format!("output '{tag}' ({id})"),
                None => format!("output {id}"),
            };
            return Err(TranslateError::Binding {
                transform: node.full_name.clone(),
                message: format!("{member} is not produced by any transform"),
            });
        }
    }
    Ok(())
}

/// Checks that every consumed collection comes from a primitive and that
/// the data flow between primitives is acyclic.
fn check_data_flow(pipeline: &Pipeline) -> TranslateResult<()> {
    let mut graph = DiGraph::<TransformId, ()>::new();
    let mut indices = HashMap::<TransformId, NodeIndex>::new();
    for node in pipeline.transforms() {
        if node.primitive().is_some() {
            indices.insert(node.id, graph.add_node(node.id));
        }
    }

    for node in pipeline.transforms() {
        let Some(&consumer) = indices.get(&node.id) else {
            continue;
        };
        for input in node.consumed() {
            let collection = pipeline.collection(input)?;
            let producer = collection
                .producer
                .and_then(|producer| indices.get(&producer).copied())
                .ok_or_else(|| {
                    TranslateError::unsupported(format!(
                        "transform '{}' reads {input}, which no primitive produces",
                        node.full_name
                    ))
                })?;
            graph.add_edge(producer, consumer, ());
        }
    }

    if is_cyclic_directed(&graph) {
        return Err(TranslateError::unsupported(
            "cycle detected in pipeline data flow",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use flowplan_model::{Coder, DoFnSpec, Output, PipelineOptions, TaggedOutput};

    use super::*;
    use crate::cloud_object::CoderRegistry;

    fn walk(pipeline: &Pipeline) -> TranslateResult<Vec<String>> {
        let options = PipelineOptions::default();
        let coders = CoderRegistry::new();
        let registry = TranslatorRegistry::with_builtins();
        let mut ctx = TranslationContext::new(pipeline, &options, &coders);
        PipelineWalker::new(&registry).walk(&mut ctx)?;
        Ok(ctx.steps().iter().map(|step| step.name.clone()).collect())
    }

    #[test]
    fn test_composites_are_expanded_in_order() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        pipeline.begin_composite("Outer", &[numbers]).unwrap();
        let doubled = pipeline
            .par_do(Some("Double"), numbers, DoFnSpec::new("fns::DoubleFn"), Coder::VarInt)
            .unwrap();
        pipeline.begin_composite("Inner", &[doubled]).unwrap();
        let squared = pipeline
            .par_do(Some("Square"), doubled, DoFnSpec::new("fns::SquareFn"), Coder::VarInt)
            .unwrap();
        pipeline
            .end_composite(Output::Collection { collection: squared })
            .unwrap();
        pipeline
            .end_composite(Output::Collection { collection: squared })
            .unwrap();
        pipeline
            .par_do(Some("Print"), squared, DoFnSpec::new("fns::PrintFn"), Coder::Void)
            .unwrap();

        assert_eq!(
            walk(&pipeline).unwrap(),
            ["Create", "Outer/Double", "Outer/Inner/Square", "Print"]
        );
    }

    #[test]
    fn test_partially_bound_composite() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        pipeline.begin_composite("Split", &[numbers]).unwrap();
        let evens = pipeline
            .par_do(Some("Evens"), numbers, DoFnSpec::new("fns::EvensFn"), Coder::VarInt)
            .unwrap();
        let dangling = pipeline.unbound_collection(Coder::VarInt);
        pipeline
            .end_composite(Output::Tuple {
                members: vec![
                    TaggedOutput {
                        tag: "evens".into(),
                        collection: evens,
                    },
                    TaggedOutput {
                        tag: "odds".into(),
                        collection: dangling,
                    },
                ],
            })
            .unwrap();

        match walk(&pipeline) {
            Err(TranslateError::Binding { transform, message }) => {
                assert_eq!(transform, "Split");
                assert!(message.contains("odds"));
            }
            other => panic!("expected binding error, got {other:?}"),
        }
    }

    #[test]
    fn test_unbound_member_read_downstream_is_a_binding_error() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        pipeline.begin_composite("Split", &[numbers]).unwrap();
        let evens = pipeline
            .par_do(Some("Evens"), numbers, DoFnSpec::new("fns::EvensFn"), Coder::VarInt)
            .unwrap();
        let odds = pipeline.unbound_collection(Coder::VarInt);
        pipeline
            .end_composite(Output::Tuple {
                members: vec![
                    TaggedOutput {
                        tag: "evens".into(),
                        collection: evens,
                    },
                    TaggedOutput {
                        tag: "odds".into(),
                        collection: odds,
                    },
                ],
            })
            .unwrap();
        pipeline
            .par_do(Some("UseOdds"), odds, DoFnSpec::new("fns::PrintFn"), Coder::Void)
            .unwrap();

        assert!(matches!(
            walk(&pipeline),
            Err(TranslateError::Binding { transform, .. }) if transform == "Split"
        ));
    }

    #[test]
    fn test_self_nested_composite_is_unsupported() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        pipeline.begin_composite("Loop", &[numbers]).unwrap();
        pipeline.end_composite(Output::Done).unwrap();

        let mut json = serde_json::to_value(&pipeline).unwrap();
        json["transforms"][1]["children"] = serde_json::json!([1]);
        let pipeline: Pipeline = serde_json::from_value(json).unwrap();

        assert!(matches!(
            walk(&pipeline),
            Err(TranslateError::UnsupportedShape(message)) if message.contains("Loop")
        ));
    }

    #[test]
    fn test_unproduced_input_is_unsupported() {
        let mut pipeline = Pipeline::new();
        let orphan = pipeline.unbound_collection(Coder::VarInt);
        pipeline
            .par_do(None, orphan, DoFnSpec::new("fns::IdentityFn"), Coder::VarInt)
            .unwrap();

        assert!(matches!(
            walk(&pipeline),
            Err(TranslateError::UnsupportedShape(_))
        ));
    }
}
