//! Job specification assembly.

use std::collections::HashSet;

use flowplan_model::{Pipeline, PipelineOptions};

use crate::TRACING_TARGET;
use crate::cloud_object::CoderRegistry;
use crate::context::TranslationContext;
use crate::environment::{EnvironmentBuilder, OptionCodecs};
use crate::error::{TranslateError, TranslateResult};
use crate::job::{Job, JobSpecification, JobType, Package, Step};
use crate::registry::{TransformTranslator, TranslatorRegistry};
use crate::walker::PipelineWalker;

/// Compiles pipelines into job specifications.
///
/// The translator only reads its registries while translating, so one
/// instance can serve any number of concurrent translations. Each call to
/// [`JobTranslator::translate`] builds its own [`TranslationContext`].
#[derive(Debug, Clone)]
pub struct JobTranslator {
    options: PipelineOptions,
    transforms: TranslatorRegistry,
    coders: CoderRegistry,
    option_codecs: OptionCodecs,
}

impl JobTranslator {
    /// Creates a translator with handlers for every built-in primitive.
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            transforms: TranslatorRegistry::with_builtins(),
            coders: CoderRegistry::new(),
            option_codecs: OptionCodecs::new(),
        }
    }

    /// Returns the pipeline options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Registers a handler for a transform URN.
    pub fn with_translator(
        mut self,
        urn: impl Into<String>,
        translator: impl TransformTranslator + 'static,
    ) -> Self {
        self.transforms.register(urn, translator);
        self
    }

    /// Returns the transform handler registry.
    pub fn transforms_mut(&mut self) -> &mut TranslatorRegistry {
        &mut self.transforms
    }

    /// Returns the registry of custom coder translators.
    pub fn coders_mut(&mut self) -> &mut CoderRegistry {
        &mut self.coders
    }

    /// Returns the codecs used for custom option values.
    pub fn option_codecs_mut(&mut self) -> &mut OptionCodecs {
        &mut self.option_codecs
    }

    /// Translates `pipeline` into a job staging `packages` on the workers.
    ///
    /// Fails without returning a partial job when any transform, coder or
    /// option cannot be translated.
    pub fn translate(
        &self,
        pipeline: &Pipeline,
        packages: &[Package],
    ) -> TranslateResult<JobSpecification> {
        self.options
            .validate()
            .map_err(|error| TranslateError::InvalidOptions(error.to_string()))?;
        pipeline
            .validate()
            .map_err(|error| TranslateError::unsupported(error.to_string()))?;

        let mut ctx = TranslationContext::new(pipeline, &self.options, &self.coders);
        PipelineWalker::new(&self.transforms).walk(&mut ctx)?;
        let environment = EnvironmentBuilder::new(&self.options, &self.option_codecs)
            .with_packages(packages)
            .build()?;

        let (steps, outputs) = ctx.finish();
        check_output_ids(&steps)?;

        tracing::info!(
            target: TRACING_TARGET,
            job = %self.options.job_name,
            steps = steps.len(),
            outputs = outputs.len(),
            streaming = self.options.streaming,
            "translated pipeline"
        );

        let job = Job {
            id: None,
            project_id: None,
            name: self.options.job_name.clone(),
            job_type: JobType::from_streaming(self.options.streaming),
            environment,
            steps,
            current_state: None,
            current_state_time: None,
            execution_info: None,
            create_time: None,
        };
        Ok(JobSpecification { job, outputs })
    }
}

/// Checks that every output identifier is numeric and used once.
fn check_output_ids(steps: &[Step]) -> TranslateResult<()> {
    let mut seen = HashSet::new();
    for step in steps {
        for output in step.outputs()? {
            if output.output_name.parse::<u64>().is_err() {
                return Err(TranslateError::invariant(format!(
                    "step '{}' has non-numeric output id '{}'",
                    step.name, output.output_name
                )));
            }
            if !seen.insert(output.output_name.clone()) {
                return Err(TranslateError::invariant(format!(
                    "output id '{}' of step '{}' is not unique",
                    output.output_name, step.name
                )));
            }
        }
    }
    Ok(())
}
