#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod compile;
mod config;

use std::process;

use anyhow::Context;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "flowplan_cli::startup";
pub const TRACING_TARGET_COMPILE: &str = "flowplan_cli::compile";
pub const TRACING_TARGET_CONFIG: &str = "flowplan_cli::config";

fn main() {
    let Err(error) = run() else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_COMPILE,
            error = %format!("{error:#}"),
            "compilation failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    cli.init_tracing();
    cli.log();

    let pipeline = compile::read_pipeline(&cli.input.pipeline)?;
    let spec = compile::compile(&pipeline, &cli.options, &cli.input.packages)
        .context("failed to translate pipeline")?;
    compile::write_job(&spec.job, &cli.output)?;

    Ok(())
}
