//! Job environment and worker pool wire types.

use flowplan_model::AutoscalingAlgorithm;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display};

/// Worker pool kind running user code.
pub const HARNESS_POOL_KIND: &str = "harness";

/// Pipeline-wide configuration of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Prefix for temporary files written by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_storage_prefix: Option<String>,
    /// Enabled experiments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experiments: Vec<String>,
    /// Compiler that produced the job.
    pub user_agent: UserAgent,
    /// Environment version expected by the workers.
    pub version: EnvironmentVersion,
    /// Serialized pipeline options.
    pub sdk_pipeline_options: SdkPipelineOptions,
    /// Worker pools; the compiler always emits exactly one.
    pub worker_pools: Vec<WorkerPool>,
}

/// Name and version of the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgent {
    /// Compiler name.
    pub name: String,
    /// Compiler version.
    pub version: String,
}

/// Environment version expected by the workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVersion {
    /// Worker flavour: `"FNAPI_BATCH"` or `"FNAPI_STREAMING"`.
    pub job_type: String,
    /// Major version of the environment.
    pub major: String,
}

/// Serialized pipeline options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdkPipelineOptions {
    /// Option values keyed by camelCase option name.
    pub options: Map<String, Value>,
}

/// Worker pool settings.
///
/// Optional fields are written only when explicitly configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPool {
    /// Pool kind.
    pub kind: String,
    /// Machine type of the workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    /// Disk size per worker in gigabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<u32>,
    /// Network of the workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Subnetwork of the workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
    /// Compute zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Initial number of workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_workers: Option<u32>,
    /// Threads per worker harness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_threads_per_worker: Option<u32>,
    /// Packages staged for the workers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Package>,
    /// Autoscaling configuration; always present.
    pub autoscaling_settings: AutoscalingSettings,
}

/// A package staged for the workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// File name of the package.
    pub name: String,
    /// Staged location.
    pub location: String,
}

impl Package {
    /// Creates a package.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}

/// Autoscaling algorithm as written into the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ScalingAlgorithm {
    /// No autoscaling.
    AutoscalingAlgorithmNone,
    /// Throughput-based autoscaling.
    AutoscalingAlgorithmBasic,
}

impl From<AutoscalingAlgorithm> for ScalingAlgorithm {
    fn from(algorithm: AutoscalingAlgorithm) -> Self {
        match algorithm {
            AutoscalingAlgorithm::None => Self::AutoscalingAlgorithmNone,
            AutoscalingAlgorithm::ThroughputBased => Self::AutoscalingAlgorithmBasic,
        }
    }
}

/// Autoscaling settings of a worker pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingSettings {
    /// Requested algorithm; `null` when none was requested.
    pub algorithm: Option<ScalingAlgorithm>,
    /// Upper bound of the worker count; 0 when unset.
    pub max_num_workers: u32,
}
