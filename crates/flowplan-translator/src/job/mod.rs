//! Job specification wire types.

mod environment;
mod step;

use std::collections::BTreeMap;

pub use environment::{
    AutoscalingSettings, Environment, EnvironmentVersion, HARNESS_POOL_KIND, Package,
    ScalingAlgorithm, SdkPipelineOptions, UserAgent, WorkerPool,
};
use flowplan_model::CollectionId;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
pub use step::{OutputInfo, OutputReference, Step, StepKind};
use strum::{AsRefStr, Display};

/// Batch or streaming execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    /// Bounded input, runs to completion.
    JobTypeBatch,
    /// Unbounded input, runs until cancelled.
    JobTypeStreaming,
}

impl JobType {
    /// Returns the job type for the given mode.
    pub fn from_streaming(streaming: bool) -> Self {
        if streaming {
            Self::JobTypeStreaming
        } else {
            Self::JobTypeBatch
        }
    }
}

/// The job submitted to the backend.
///
/// The server-assigned fields are never set by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Server-assigned project identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Job name.
    pub name: String,
    /// Batch or streaming.
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Pipeline-wide configuration.
    pub environment: Environment,
    /// Steps in traversal order.
    pub steps: Vec<Step>,
    /// Server-assigned execution state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
    /// Time of the last state change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state_time: Option<Timestamp>,
    /// Server-assigned execution details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_info: Option<serde_json::Value>,
    /// Server-assigned creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<Timestamp>,
}

impl Job {
    /// Returns the step with the given name.
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.name == name)
    }
}

/// A translated job with the step output of every translated collection.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpecification {
    /// The job.
    pub job: Job,
    /// Output reference of every collection produced by a step.
    pub outputs: BTreeMap<CollectionId, OutputReference>,
}

impl JobSpecification {
    /// Returns the step output a collection maps to.
    pub fn output_reference(&self, collection: CollectionId) -> Option<&OutputReference> {
        self.outputs.get(&collection)
    }

    /// Returns the step producing a collection.
    pub fn producing_step(&self, collection: CollectionId) -> Option<&Step> {
        let reference = self.output_reference(collection)?;
        self.job.step(&reference.step_name)
    }
}
