//! Pipeline loading, translation and job output.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::Context;
use flowplan_model::{Pipeline, PipelineOptions};
use flowplan_translator::JobTranslator;
use flowplan_translator::job::{Job, JobSpecification, Package};

use crate::TRACING_TARGET_COMPILE;
use crate::config::OutputConfig;

/// Reads a pipeline definition from a file, or stdin for `-`.
pub fn read_pipeline(path: &Path) -> anyhow::Result<Pipeline> {
    let definition = if path == Path::new("-") {
        let mut definition = String::new();
        io::stdin()
            .read_to_string(&mut definition)
            .context("failed to read pipeline from stdin")?;
        definition
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline '{}'", path.display()))?
    };

    let pipeline: Pipeline = serde_json::from_str(&definition)
        .with_context(|| format!("invalid pipeline definition '{}'", path.display()))?;
    tracing::debug!(
        target: TRACING_TARGET_COMPILE,
        transforms = pipeline.transforms().len(),
        collections = pipeline.collections().len(),
        "loaded pipeline"
    );
    Ok(pipeline)
}

/// Translates a pipeline with the given options.
pub fn compile(
    pipeline: &Pipeline,
    options: &PipelineOptions,
    packages: &[Package],
) -> anyhow::Result<JobSpecification> {
    let translator = JobTranslator::new(options.clone());
    Ok(translator.translate(pipeline, packages)?)
}

/// Writes the job as JSON to the configured destination.
pub fn write_job(job: &Job, output: &OutputConfig) -> anyhow::Result<()> {
    let mut encoded = if output.pretty {
        serde_json::to_vec_pretty(job)
    } else {
        serde_json::to_vec(job)
    }
    .context("failed to serialize job")?;
    encoded.push(b'\n');

    match &output.output {
        Some(path) => {
            fs::write(path, &encoded)
                .with_context(|| format!("failed to write job to '{}'", path.display()))?;
            tracing::info!(
                target: TRACING_TARGET_COMPILE,
                path = %path.display(),
                steps = job.steps.len(),
                "wrote job"
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(&encoded)
                .and_then(|()| stdout.flush())
                .context("failed to write job to stdout")?;
        }
    }
    Ok(())
}
