//! Input and output configuration.

use std::path::PathBuf;

use clap::Args;
use flowplan_translator::job::Package;

use crate::TRACING_TARGET_CONFIG;

/// Pipeline definition and staged packages.
#[derive(Debug, Clone, Args)]
pub struct InputConfig {
    /// Path to the pipeline definition (JSON), or `-` for stdin.
    #[arg(short = 'p', long = "pipeline", env = "FLOWPLAN_PIPELINE")]
    pub pipeline: PathBuf,

    /// Packages staged for the workers, as `name=location`.
    #[arg(
        long = "package",
        env = "FLOWPLAN_PACKAGES",
        value_delimiter = ',',
        value_parser = parse_package
    )]
    pub packages: Vec<Package>,
}

impl InputConfig {
    pub(crate) fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            pipeline = %self.pipeline.display(),
            packages = self.packages.len(),
            "input configuration"
        );
    }
}

/// Where and how the job is written.
#[derive(Debug, Clone, Args)]
pub struct OutputConfig {
    /// File to write the job to; stdout when omitted.
    #[arg(short = 'o', long = "output", env = "FLOWPLAN_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Pretty-print the job.
    #[arg(long = "pretty", env = "FLOWPLAN_PRETTY")]
    pub pretty: bool,
}

impl OutputConfig {
    pub(crate) fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            output = ?self.output,
            pretty = self.pretty,
            "output configuration"
        );
    }
}

/// Parses a `name=location` package argument.
fn parse_package(value: &str) -> Result<Package, String> {
    match value.split_once('=') {
        Some((name, location)) if !name.is_empty() && !location.is_empty() => {
            Ok(Package::new(name, location))
        }
        _ => Err(format!("expected `name=location`, found `{value}`")),
    }
}
