//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── input: InputConfig        # Pipeline definition, staged packages
//! ├── output: OutputConfig      # Job destination and formatting
//! ├── log_json                  # Log format
//! └── options: PipelineOptions  # Job name, workers, autoscaling, ...
//! ```
//!
//! All configuration can be provided via CLI arguments or environment
//! variables. Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! flowplan --pipeline word-count.json --temp-location gs://bucket/tmp --max-num-workers 10
//!
//! # Or via environment variables
//! FLOWPLAN_PIPELINE=word-count.json FLOWPLAN_STREAMING=true flowplan
//! ```

mod io;

use std::process;

use clap::Parser;
use flowplan_model::PipelineOptions;
pub use io::{InputConfig, OutputConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "flowplan")]
#[command(about = "Compiles flowplan pipelines into job specifications")]
#[command(version)]
pub struct Cli {
    /// Pipeline definition and staged packages.
    #[clap(flatten)]
    pub input: InputConfig,

    /// Where and how the job is written.
    #[clap(flatten)]
    pub output: OutputConfig,

    /// Emit logs as JSON lines.
    #[arg(long = "log-json", env = "FLOWPLAN_LOG_JSON")]
    pub log_json: bool,

    /// Pipeline-wide options written into the job.
    #[clap(flatten)]
    pub options: PipelineOptions,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing on stderr with environment-based filtering.
    ///
    /// The job may be written to stdout, so logs never go there.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let json = self.log_json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        });
        let text = (!self.log_json)
            .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

        tracing_subscriber::registry()
            .with(filter)
            .with(json)
            .with(text)
            .init();
    }

    /// Logs configuration (no option values beyond job-shaping settings).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "build information"
        );

        self.input.log();
        self.output.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            job_name = %self.options.job_name,
            streaming = self.options.streaming,
            stable_unique_names = %self.options.stable_unique_names,
            max_num_workers = ?self.options.max_num_workers,
            autoscaling_algorithm = ?self.options.autoscaling_algorithm,
            experiments = ?self.options.experiments,
            "pipeline options"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use flowplan_model::{AutoscalingAlgorithm, StableUniqueNames};

    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "flowplan",
            "--pipeline",
            "pipeline.json",
            "--output",
            "job.json",
            "--pretty",
            "--job-name",
            "nightly",
            "--max-num-workers",
            "12",
            "--autoscaling-algorithm",
            "throughput-based",
            "--stable-unique-names",
            "error",
            "--experiments",
            "a,b",
            "--package",
            "app.jar=gs://bucket/staging/app.jar",
        ])
        .unwrap();

        assert_eq!(cli.input.pipeline.to_str(), Some("pipeline.json"));
        assert_eq!(cli.input.packages.len(), 1);
        assert_eq!(cli.input.packages[0].name, "app.jar");
        assert!(cli.output.pretty);
        assert_eq!(cli.options.job_name, "nightly");
        assert_eq!(cli.options.max_num_workers, Some(12));
        assert_eq!(
            cli.options.autoscaling_algorithm,
            Some(AutoscalingAlgorithm::ThroughputBased)
        );
        assert_eq!(cli.options.stable_unique_names, StableUniqueNames::Error);
        assert_eq!(cli.options.experiments, ["a", "b"]);
    }

    #[test]
    fn test_malformed_package_is_rejected() {
        let result = Cli::try_parse_from([
            "flowplan",
            "--pipeline",
            "pipeline.json",
            "--package",
            "no-location",
        ]);
        assert!(result.is_err());
    }
}
