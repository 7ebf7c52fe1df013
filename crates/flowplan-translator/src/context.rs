//! Per-translation mutable state.

use std::collections::BTreeMap;

use flowplan_model::{Coder, Collection, CollectionId, Pipeline, PipelineOptions};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::TRACING_TARGET_STEP;
use crate::cloud_object::CoderRegistry;
use crate::error::{TranslateError, TranslateResult};
use crate::job::{OutputInfo, OutputReference, Step, StepKind};
use crate::naming::{IdAllocator, StepNames, display_label};
use crate::property;

/// A step being assembled.
#[derive(Debug)]
pub struct StepBuilder {
    kind: StepKind,
    name: String,
    properties: Map<String, Value>,
    outputs: Vec<OutputInfo>,
}

impl StepBuilder {
    /// Returns the unique step name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets a property.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.properties.insert(key.to_owned(), value.into());
    }

    /// Sets a property from any serializable value.
    pub fn insert_serialized<T: Serialize>(&mut self, key: &str, value: &T) -> TranslateResult<()> {
        self.properties
            .insert(key.to_owned(), serde_json::to_value(value)?);
        Ok(())
    }

    fn build(mut self) -> TranslateResult<Step> {
        if !self.outputs.is_empty() {
            let outputs = serde_json::to_value(&self.outputs)?;
            self.properties
                .insert(property::OUTPUT_INFO.to_owned(), outputs);
        }
        Ok(Step {
            kind: self.kind,
            name: self.name,
            properties: self.properties,
        })
    }
}

/// Encoding of one step output.
#[derive(Debug, Clone)]
pub struct StepOutput {
    coder: Coder,
    window_coder: Coder,
    use_indexed_format: bool,
}

impl StepOutput {
    /// Creates an output with the given element and window coders.
    pub fn new(coder: Coder, window_coder: Coder) -> Self {
        Self {
            coder,
            window_coder,
            use_indexed_format: false,
        }
    }

    /// Creates an output carrying the elements of a collection.
    pub fn for_collection(collection: &Collection) -> Self {
        Self::new(
            collection.coder.clone(),
            collection.windowing.window_fn.window_coder(),
        )
    }

    /// Marks the output as written in the indexed materialized format.
    pub fn indexed(mut self) -> Self {
        self.use_indexed_format = true;
        self
    }
}

/// Mutable state of one translation.
///
/// Owns the output identifier counter, the collection to output reference
/// table and the emitted steps. Created per translation and consumed by
/// [`TranslationContext::finish`].
#[derive(Debug)]
pub struct TranslationContext<'a> {
    pipeline: &'a Pipeline,
    options: &'a PipelineOptions,
    coders: &'a CoderRegistry,
    ids: IdAllocator,
    names: StepNames,
    steps: Vec<Step>,
    outputs: BTreeMap<CollectionId, OutputReference>,
}

impl<'a> TranslationContext<'a> {
    /// Creates an empty context.
    pub fn new(
        pipeline: &'a Pipeline,
        options: &'a PipelineOptions,
        coders: &'a CoderRegistry,
    ) -> Self {
        Self {
            pipeline,
            options,
            coders,
            ids: IdAllocator::new(),
            names: StepNames::new(options.stable_unique_names),
            steps: Vec::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Returns the pipeline being translated.
    pub fn pipeline(&self) -> &'a Pipeline {
        self.pipeline
    }

    /// Returns the pipeline options.
    pub fn options(&self) -> &'a PipelineOptions {
        self.options
    }

    /// Returns whether the job runs in streaming mode.
    pub fn is_streaming(&self) -> bool {
        self.options.streaming
    }

    /// Returns a collection of the pipeline.
    pub fn collection(&self, id: CollectionId) -> TranslateResult<&'a Collection> {
        Ok(self.pipeline.collection(id)?)
    }

    /// Returns the step output a collection was registered under.
    pub fn output_ref(&self, id: CollectionId) -> TranslateResult<OutputReference> {
        self.outputs.get(&id).cloned().ok_or_else(|| {
            TranslateError::unsupported(format!("collection {id} is consumed before it is produced"))
        })
    }

    /// Returns the steps emitted so far.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Starts a step, making its name unique within the job.
    pub fn add_step(&mut self, name: &str, kind: StepKind) -> TranslateResult<StepBuilder> {
        let name = self.names.claim(name)?;
        let mut properties = Map::new();
        properties.insert(property::USER_NAME.to_owned(), Value::from(name.as_str()));
        Ok(StepBuilder {
            kind,
            name,
            properties,
            outputs: Vec::new(),
        })
    }

    /// Declares the next output of a step and returns its reference.
    ///
    /// The output gets a fresh job-wide identifier and the display label
    /// `<step>.out<k>`.
    pub fn add_output(
        &mut self,
        step: &mut StepBuilder,
        output: StepOutput,
    ) -> TranslateResult<OutputReference> {
        let windowed = Coder::windowed_value(output.coder, output.window_coder);
        let output_name = self.ids.allocate();
        step.outputs.push(OutputInfo {
            user_name: display_label(&step.name, step.outputs.len()),
            output_name: output_name.clone(),
            encoding: self.coders.encode(&windowed)?,
            use_indexed_format: output.use_indexed_format,
        });
        Ok(OutputReference::new(step.name.clone(), output_name))
    }

    /// Records the step output a collection maps to.
    pub fn register(&mut self, id: CollectionId, reference: OutputReference) -> TranslateResult<()> {
        if let Some(existing) = self.outputs.get(&id) {
            return Err(TranslateError::invariant(format!(
                "collection {id} is already produced by step '{}'",
                existing.step_name
            )));
        }
        self.outputs.insert(id, reference);
        Ok(())
    }

    /// Declares an output for a collection and registers it.
    pub fn add_collection_output(
        &mut self,
        step: &mut StepBuilder,
        id: CollectionId,
    ) -> TranslateResult<OutputReference> {
        let output = StepOutput::for_collection(self.collection(id)?);
        let reference = self.add_output(step, output)?;
        self.register(id, reference.clone())?;
        Ok(reference)
    }

    /// Encodes a coder as a cloud object value.
    pub fn encode_coder(&self, coder: &Coder) -> TranslateResult<Value> {
        self.coders.encode(coder)?.to_value()
    }

    /// Appends a finished step.
    pub fn push_step(&mut self, step: StepBuilder) -> TranslateResult<()> {
        let step = step.build()?;
        tracing::debug!(
            target: TRACING_TARGET_STEP,
            step = %step.name,
            kind = %step.kind,
            "emitted step"
        );
        self.steps.push(step);
        Ok(())
    }

    /// Consumes the context, returning the steps and the output table.
    pub fn finish(self) -> (Vec<Step>, BTreeMap<CollectionId, OutputReference>) {
        (self.steps, self.outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outputs_are_labelled_by_position() {
        let pipeline = Pipeline::new();
        let options = PipelineOptions::default();
        let coders = CoderRegistry::new();
        let mut ctx = TranslationContext::new(&pipeline, &options, &coders);

        let mut step = ctx.add_step("Split", StepKind::ParallelDo).unwrap();
        let first = ctx
            .add_output(&mut step, StepOutput::new(Coder::VarInt, Coder::GlobalWindow))
            .unwrap();
        let second = ctx
            .add_output(&mut step, StepOutput::new(Coder::VarInt, Coder::GlobalWindow).indexed())
            .unwrap();
        ctx.push_step(step).unwrap();

        assert_eq!(first, OutputReference::new("Split", "1"));
        assert_eq!(second.output_name, "2");

        let (steps, _) = ctx.finish();
        let outputs = steps[0].outputs().unwrap();
        assert_eq!(outputs[0].user_name, "Split.out0");
        assert_eq!(outputs[1].user_name, "Split.out1");
        assert!(!outputs[0].use_indexed_format);
        assert!(outputs[1].use_indexed_format);
        assert_eq!(outputs[0].encoding.type_tag, "kind:windowed_value");
        assert_eq!(steps[0].property("user_name").unwrap(), "Split");
    }

    #[test]
    fn test_double_registration_is_invariant_violation() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        let options = PipelineOptions::default();
        let coders = CoderRegistry::new();
        let mut ctx = TranslationContext::new(&pipeline, &options, &coders);

        let reference = OutputReference::new("Create", "1");
        ctx.register(numbers, reference.clone()).unwrap();
        assert!(matches!(
            ctx.register(numbers, reference),
            Err(TranslateError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_unproduced_collection_reference() {
        let mut pipeline = Pipeline::new();
        let orphan = pipeline.unbound_collection(Coder::Bytes);
        let options = PipelineOptions::default();
        let coders = CoderRegistry::new();
        let ctx = TranslationContext::new(&pipeline, &options, &coders);

        assert!(matches!(
            ctx.output_ref(orphan),
            Err(TranslateError::UnsupportedShape(_))
        ));
    }
}
