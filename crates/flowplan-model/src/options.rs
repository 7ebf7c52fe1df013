//! Pipeline-wide options.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "config")]
use clap::Args;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{ModelError, ModelResult};

// Default values
const DEFAULT_JOB_NAME: &str = "flowplan-job";
const STAGING_DIRECTORY: &str = "staging";

/// How the compiler reacts to transforms that share a name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "config", derive(clap::ValueEnum))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StableUniqueNames {
    /// Renames silently.
    Off,
    /// Renames and logs a warning.
    #[default]
    Warning,
    /// Fails the translation.
    Error,
}

/// Worker autoscaling algorithm requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "config", derive(clap::ValueEnum))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoscalingAlgorithm {
    /// Keep the worker count fixed.
    None,
    /// Scale with throughput.
    ThroughputBased,
}

/// A typed option value outside the built-in option set.
///
/// The compiler writes it into the job only through a serializer registered
/// for its type.
#[derive(Clone)]
pub struct CustomValue {
    type_name: &'static str,
    type_id: TypeId,
    value: Arc<dyn Any + Send + Sync>,
}

impl CustomValue {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            value: Arc::new(value),
        }
    }

    /// Returns the name of the wrapped type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the identifier of the wrapped type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the wrapped value.
    #[inline]
    pub fn value(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }

    /// Returns the wrapped value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Custom option values keyed by option name.
#[derive(Debug, Clone, Default)]
pub struct CustomOptions {
    values: BTreeMap<String, CustomValue>,
}

impl CustomOptions {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), CustomValue::new(value));
    }

    /// Returns an option if it is set and has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    /// Iterates over options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CustomValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns the number of options.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether no options are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Pipeline-wide configuration.
///
/// Everything except [`CustomOptions`] is (de)serialized with camelCase
/// keys; unrecognized keys are preserved in `extra`. With the `config`
/// feature the options can be flattened into a command-line parser.
///
/// ## Example
///
/// ```rust
/// use flowplan_model::PipelineOptions;
///
/// let options = PipelineOptions::builder()
///     .with_job_name("word-count")
///     .with_temp_location("gs://bucket/tmp")
///     .with_max_num_workers(10u32)
///     .build()
///     .unwrap();
///
/// assert_eq!(
///     options.staging_location_or_default().as_deref(),
///     Some("gs://bucket/tmp/staging/")
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(
    name = "PipelineOptionsBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate_options")
)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineOptions {
    /// Name of the job
    #[builder(default = "DEFAULT_JOB_NAME.to_owned()")]
    #[cfg_attr(
        feature = "config",
        arg(long = "job-name", env = "FLOWPLAN_JOB_NAME", default_value = DEFAULT_JOB_NAME)
    )]
    pub job_name: String,

    /// Cloud project the job runs in
    #[builder(default)]
    #[cfg_attr(feature = "config", arg(long = "project", env = "FLOWPLAN_PROJECT"))]
    pub project: Option<String>,

    /// Application name reported with the job
    #[builder(default)]
    #[cfg_attr(feature = "config", arg(long = "app-name", env = "FLOWPLAN_APP_NAME"))]
    pub app_name: Option<String>,

    /// Runner the pipeline was built for
    #[builder(default)]
    #[cfg_attr(feature = "config", arg(long = "runner", env = "FLOWPLAN_RUNNER"))]
    pub runner: Option<String>,

    /// Location for temporary files
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "temp-location", env = "FLOWPLAN_TEMP_LOCATION")
    )]
    pub temp_location: Option<String>,

    /// Location for staged packages (defaults to `<temp-location>/staging/`)
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "staging-location", env = "FLOWPLAN_STAGING_LOCATION")
    )]
    pub staging_location: Option<String>,

    /// Run as a streaming job
    #[builder(default)]
    #[cfg_attr(feature = "config", arg(long = "streaming", env = "FLOWPLAN_STREAMING"))]
    pub streaming: bool,

    /// Reaction to transforms sharing a name
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(
            long = "stable-unique-names",
            env = "FLOWPLAN_STABLE_UNIQUE_NAMES",
            value_enum,
            default_value_t = StableUniqueNames::Warning
        )
    )]
    pub stable_unique_names: StableUniqueNames,

    /// Threads per worker harness (0 = backend default)
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(
            long = "number-of-worker-harness-threads",
            env = "FLOWPLAN_WORKER_HARNESS_THREADS",
            default_value_t = 0
        )
    )]
    pub number_of_worker_harness_threads: u32,

    /// Compute zone of the workers
    #[builder(default)]
    #[cfg_attr(feature = "config", arg(long = "zone", env = "FLOWPLAN_ZONE"))]
    pub zone: Option<String>,

    /// Network of the workers
    #[builder(default)]
    #[cfg_attr(feature = "config", arg(long = "network", env = "FLOWPLAN_NETWORK"))]
    pub network: Option<String>,

    /// Subnetwork of the workers
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "subnetwork", env = "FLOWPLAN_SUBNETWORK")
    )]
    pub subnetwork: Option<String>,

    /// Machine type of the workers
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "worker-machine-type", env = "FLOWPLAN_WORKER_MACHINE_TYPE")
    )]
    pub worker_machine_type: Option<String>,

    /// Disk size of each worker in gigabytes
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "disk-size-gb", env = "FLOWPLAN_DISK_SIZE_GB")
    )]
    pub disk_size_gb: Option<u32>,

    /// Initial number of workers
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "num-workers", env = "FLOWPLAN_NUM_WORKERS")
    )]
    pub num_workers: Option<u32>,

    /// Upper bound of the worker count
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "max-num-workers", env = "FLOWPLAN_MAX_NUM_WORKERS")
    )]
    pub max_num_workers: Option<u32>,

    /// Autoscaling algorithm
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(
            long = "autoscaling-algorithm",
            env = "FLOWPLAN_AUTOSCALING_ALGORITHM",
            value_enum
        )
    )]
    pub autoscaling_algorithm: Option<AutoscalingAlgorithm>,

    /// Experiments enabled for the job (comma-separated)
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(
            long = "experiments",
            env = "FLOWPLAN_EXPERIMENTS",
            value_delimiter = ','
        )
    )]
    pub experiments: Vec<String>,

    /// Options without a dedicated field.
    #[builder(default)]
    #[cfg_attr(feature = "config", arg(skip))]
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,

    /// Typed options serialized through registered codecs.
    #[builder(default)]
    #[cfg_attr(feature = "config", arg(skip))]
    #[serde(skip)]
    pub custom: CustomOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_owned(),
            project: None,
            app_name: None,
            runner: None,
            temp_location: None,
            staging_location: None,
            streaming: false,
            stable_unique_names: StableUniqueNames::default(),
            number_of_worker_harness_threads: 0,
            zone: None,
            network: None,
            subnetwork: None,
            worker_machine_type: None,
            disk_size_gb: None,
            num_workers: None,
            max_num_workers: None,
            autoscaling_algorithm: None,
            experiments: Vec::new(),
            extra: BTreeMap::new(),
            custom: CustomOptions::default(),
        }
    }
}

impl PipelineOptions {
    /// Creates a new options builder.
    pub fn builder() -> PipelineOptionsBuilder {
        PipelineOptionsBuilder::default()
    }

    /// Returns the staging location, derived from the temp location when
    /// not set explicitly.
    pub fn staging_location_or_default(&self) -> Option<String> {
        if let Some(staging_location) = &self.staging_location {
            return Some(staging_location.clone());
        }

        let temp_location = self.temp_location.as_deref()?;
        Some(format!(
            "{}/{STAGING_DIRECTORY}/",
            temp_location.trim_end_matches('/')
        ))
    }

    /// Sets a custom option.
    pub fn with_custom<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.custom.insert(key, value);
        self
    }

    /// Checks the options for values the backend would reject.
    pub fn validate(&self) -> ModelResult<()> {
        check_options(&self.job_name, self.disk_size_gb).map_err(ModelError::InvalidOptions)
    }
}

impl PipelineOptionsBuilder {
    fn validate_options(&self) -> Result<(), String> {
        let job_name = self.job_name.as_deref().unwrap_or(DEFAULT_JOB_NAME);
        check_options(job_name, self.disk_size_gb.flatten())
    }
}

fn check_options(job_name: &str, disk_size_gb: Option<u32>) -> Result<(), String> {
    if job_name.trim().is_empty() {
        return Err("Job name must not be empty".to_string());
    }

    if disk_size_gb == Some(0) {
        return Err("Disk size must be greater than 0".to_string());
    }

    Ok(())
}
