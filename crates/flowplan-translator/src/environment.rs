//! Job environment construction.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use flowplan_model::{CustomValue, PipelineOptions};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{TranslateError, TranslateResult};
use crate::job::{
    AutoscalingSettings, Environment, EnvironmentVersion, HARNESS_POOL_KIND, JobType, Package,
    SdkPipelineOptions, UserAgent, WorkerPool,
};

/// Name reported in the job's user agent.
const USER_AGENT_NAME: &str = "flowplan";
/// Major version of the worker environment the jobs target.
const ENVIRONMENT_MAJOR_VERSION: &str = "8";
const STAGING_LOCATION_KEY: &str = "stagingLocation";

type EncodeFn = Arc<dyn Fn(&dyn Any) -> TranslateResult<Value> + Send + Sync>;
type DecodeFn = Arc<dyn Fn(&Value) -> TranslateResult<Box<dyn Any + Send + Sync>> + Send + Sync>;

#[derive(Clone)]
struct OptionCodec {
    type_name: &'static str,
    encode: EncodeFn,
    decode: DecodeFn,
}

/// Serializer and deserializer pairs for custom option value types.
///
/// A custom option whose type has no registered codec cannot be written
/// into the job.
///
/// ```rust
/// use flowplan_translator::OptionCodecs;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Retry {
///     attempts: u32,
/// }
///
/// let mut codecs = OptionCodecs::new();
/// codecs.register::<Retry>();
///
/// let retry: Retry = codecs.decode(&serde_json::json!({"attempts": 3})).unwrap();
/// assert_eq!(retry, Retry { attempts: 3 });
/// ```
#[derive(Clone, Default)]
pub struct OptionCodecs {
    codecs: HashMap<TypeId, OptionCodec>,
}

impl fmt::Debug for OptionCodecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.codecs.values().map(|codec| codec.type_name).collect();
        types.sort_unstable();
        f.debug_struct("OptionCodecs").field("types", &types).finish()
    }
}

impl OptionCodecs {
    /// Creates an empty set of codecs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the serde representation of `T`.
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: Serialize + DeserializeOwned + Any + Send + Sync,
    {
        self.register_with::<T>(
            |value| Ok(serde_json::to_value(value)?),
            |value| Ok(T::deserialize(value)?),
        )
    }

    /// Registers an explicit serializer and deserializer for `T`,
    /// replacing any previous pair.
    pub fn register_with<T>(
        &mut self,
        serialize: impl Fn(&T) -> TranslateResult<Value> + Send + Sync + 'static,
        deserialize: impl Fn(&Value) -> TranslateResult<T> + Send + Sync + 'static,
    ) -> &mut Self
    where
        T: Any + Send + Sync,
    {
        let type_name = std::any::type_name::<T>();
        let encode: EncodeFn = Arc::new(move |value: &dyn Any| match value.downcast_ref::<T>() {
            Some(value) => serialize(value),
            None => Err(TranslateError::invariant(format!(
                "option codec for {type_name} received another type"
            ))),
        });
        let decode: DecodeFn = Arc::new(move |value: &Value| {
            Ok(Box::new(deserialize(value)?) as Box<dyn Any + Send + Sync>)
        });

        self.codecs.insert(
            TypeId::of::<T>(),
            OptionCodec {
                type_name,
                encode,
                decode,
            },
        );
        self
    }

    /// Returns whether a codec is registered for `T`.
    pub fn contains<T: Any>(&self) -> bool {
        self.codecs.contains_key(&TypeId::of::<T>())
    }

    /// Serializes a custom option value.
    pub fn encode(&self, value: &CustomValue) -> TranslateResult<Value> {
        let codec = self.codecs.get(&value.type_id()).ok_or_else(|| {
            TranslateError::unsupported(format!(
                "no serializer registered for option type {}",
                value.type_name()
            ))
        })?;
        (codec.encode)(value.value())
    }

    /// Deserializes a custom option value of type `T`.
    pub fn decode<T: Any + Send + Sync>(&self, value: &Value) -> TranslateResult<T> {
        let type_name = std::any::type_name::<T>();
        let codec = self.codecs.get(&TypeId::of::<T>()).ok_or_else(|| {
            TranslateError::unsupported(format!(
                "no deserializer registered for option type {type_name}"
            ))
        })?;
        let decoded = (codec.decode)(value)?;
        decoded.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            TranslateError::invariant(format!(
                "option codec for {type_name} produced another type"
            ))
        })
    }
}

/// Builds the pipeline-wide part of a job.
#[derive(Debug)]
pub(crate) struct EnvironmentBuilder<'a> {
    options: &'a PipelineOptions,
    codecs: &'a OptionCodecs,
    packages: &'a [Package],
}

impl<'a> EnvironmentBuilder<'a> {
    pub fn new(options: &'a PipelineOptions, codecs: &'a OptionCodecs) -> Self {
        Self {
            options,
            codecs,
            packages: &[],
        }
    }

    pub fn with_packages(mut self, packages: &'a [Package]) -> Self {
        self.packages = packages;
        self
    }

    pub fn build(&self) -> TranslateResult<Environment> {
        let job_type = match JobType::from_streaming(self.options.streaming) {
            JobType::JobTypeBatch => "FNAPI_BATCH",
            JobType::JobTypeStreaming => "FNAPI_STREAMING",
        };

        Ok(Environment {
            temp_storage_prefix: self.options.temp_location.clone(),
            experiments: self.options.experiments.clone(),
            user_agent: UserAgent {
                name: USER_AGENT_NAME.to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
            },
            version: EnvironmentVersion {
                job_type: job_type.to_owned(),
                major: ENVIRONMENT_MAJOR_VERSION.to_owned(),
            },
            sdk_pipeline_options: SdkPipelineOptions {
                options: self.options_map()?,
            },
            worker_pools: vec![self.worker_pool()],
        })
    }

    /// Serializes every set option under its camelCase name.
    fn options_map(&self) -> TranslateResult<Map<String, Value>> {
        let mut known = self.options.clone();
        let extra = std::mem::take(&mut known.extra);
        let Value::Object(serialized) = serde_json::to_value(&known)? else {
            return Err(TranslateError::invariant(
                "pipeline options did not serialize to a mapping",
            ));
        };

        let reserved: HashSet<String> = serialized.keys().cloned().collect();
        let mut options: Map<String, Value> = serialized
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect();
        for (key, value) in extra {
            insert_additional(&mut options, &reserved, key, value)?;
        }
        for (key, value) in self.options.custom.iter() {
            insert_additional(&mut options, &reserved, key.to_owned(), self.codecs.encode(value)?)?;
        }

        if !options.contains_key(STAGING_LOCATION_KEY)
            && let Some(staging_location) = self.options.staging_location_or_default()
        {
            options.insert(STAGING_LOCATION_KEY.to_owned(), Value::from(staging_location));
        }
        Ok(options)
    }

    fn worker_pool(&self) -> WorkerPool {
        let options = self.options;
        WorkerPool {
            kind: HARNESS_POOL_KIND.to_owned(),
            machine_type: options.worker_machine_type.clone(),
            disk_size_gb: options.disk_size_gb,
            network: options.network.clone(),
            subnetwork: options.subnetwork.clone(),
            zone: options.zone.clone(),
            num_workers: options.num_workers,
            num_threads_per_worker: Some(options.number_of_worker_harness_threads)
                .filter(|threads| *threads > 0),
            packages: self.packages.to_vec(),
            autoscaling_settings: AutoscalingSettings {
                algorithm: options.autoscaling_algorithm.map(Into::into),
                max_num_workers: options.max_num_workers.unwrap_or(0),
            },
        }
    }
}

/// Adds an option that is neither built in nor already present.
fn insert_additional(
    options: &mut Map<String, Value>,
    reserved: &HashSet<String>,
    key: String,
    value: Value,
) -> TranslateResult<()> {
    if reserved.contains(&key) || options.contains_key(&key) {
        return Err(TranslateError::InvalidOptions(format!(
            "option '{key}' shadows another option"
        )));
    }
    options.insert(key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use flowplan_model::AutoscalingAlgorithm;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::job::ScalingAlgorithm;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct RetryPolicy {
        attempts: u32,
        backoff_ms: u64,
    }

    struct Opaque;

    fn build(options: &PipelineOptions) -> TranslateResult<Environment> {
        let mut codecs = OptionCodecs::new();
        codecs.register::<RetryPolicy>();
        EnvironmentBuilder::new(options, &codecs).build()
    }

    #[test]
    fn test_unset_worker_fields_are_absent() {
        let environment = build(&PipelineOptions::default()).unwrap();
        assert_eq!(environment.worker_pools.len(), 1);

        let pool = serde_json::to_value(&environment.worker_pools[0]).unwrap();
        let pool = pool.as_object().unwrap();
        assert_eq!(pool["kind"], "harness");
        for key in ["machineType", "diskSizeGb", "network", "subnetwork", "zone", "numWorkers"] {
            assert!(!pool.contains_key(key), "{key} should be absent");
        }
        assert_eq!(
            pool["autoscalingSettings"],
            json!({"algorithm": null, "maxNumWorkers": 0})
        );
    }

    #[test]
    fn test_configured_worker_fields() {
        let options = PipelineOptions::builder()
            .with_network("default")
            .with_subnetwork("regions/us/subnetworks/default")
            .with_zone("us-central1-f")
            .with_worker_machine_type("n1-standard-4")
            .with_disk_size_gb(50u32)
            .with_number_of_worker_harness_threads(4u32)
            .build()
            .unwrap();
        let pool = &build(&options).unwrap().worker_pools[0];

        assert_eq!(pool.network.as_deref(), Some("default"));
        assert_eq!(
            pool.subnetwork.as_deref(),
            Some("regions/us/subnetworks/default")
        );
        assert_eq!(pool.zone.as_deref(), Some("us-central1-f"));
        assert_eq!(pool.machine_type.as_deref(), Some("n1-standard-4"));
        assert_eq!(pool.disk_size_gb, Some(50));
        assert_eq!(pool.num_threads_per_worker, Some(4));
    }

    #[test]
    fn test_autoscaling_settings() {
        let none = PipelineOptions::builder()
            .with_autoscaling_algorithm(AutoscalingAlgorithm::None)
            .build()
            .unwrap();
        let settings = build(&none).unwrap().worker_pools[0].autoscaling_settings;
        assert_eq!(
            settings.algorithm,
            Some(ScalingAlgorithm::AutoscalingAlgorithmNone)
        );
        assert_eq!(settings.max_num_workers, 0);

        let bounded = PipelineOptions::builder()
            .with_max_num_workers(42u32)
            .build()
            .unwrap();
        let settings = build(&bounded).unwrap().worker_pools[0].autoscaling_settings;
        assert_eq!(settings.algorithm, None);
        assert_eq!(settings.max_num_workers, 42);
    }

    #[test]
    fn test_options_map() {
        let options = PipelineOptions::builder()
            .with_job_name("word-count")
            .with_temp_location("gs://bucket/tmp/")
            .with_streaming(true)
            .build()
            .unwrap()
            .with_custom(
                "retryPolicy",
                RetryPolicy {
                    attempts: 3,
                    backoff_ms: 500,
                },
            );
        let environment = build(&options).unwrap();
        let map = &environment.sdk_pipeline_options.options;

        assert_eq!(map["jobName"], "word-count");
        assert_eq!(map["streaming"], true);
        assert_eq!(map["stagingLocation"], "gs://bucket/tmp/staging/");
        assert_eq!(map["retryPolicy"], json!({"attempts": 3, "backoff_ms": 500}));
        assert!(!map.contains_key("project"));
        assert_eq!(environment.version.job_type, "FNAPI_STREAMING");
        assert_eq!(
            environment.temp_storage_prefix.as_deref(),
            Some("gs://bucket/tmp/")
        );
    }

    #[test]
    fn test_additional_options_cannot_shadow_others() {
        let mut options = PipelineOptions::default();
        options.extra.insert("userFlag".into(), json!("yes"));
        let map = build(&options).unwrap().sdk_pipeline_options.options;
        assert_eq!(map["userFlag"], "yes");

        let mut options = PipelineOptions::default();
        options.extra.insert("jobName".into(), json!("hijacked"));
        assert!(matches!(
            build(&options),
            Err(TranslateError::InvalidOptions(message)) if message.contains("jobName")
        ));

        let mut options = PipelineOptions::default().with_custom(
            "project",
            RetryPolicy {
                attempts: 1,
                backoff_ms: 0,
            },
        );
        assert!(matches!(build(&options), Err(TranslateError::InvalidOptions(_))));

        options = PipelineOptions::default().with_custom(
            "retryPolicy",
            RetryPolicy {
                attempts: 1,
                backoff_ms: 0,
            },
        );
        options.extra.insert("retryPolicy".into(), json!({}));
        assert!(matches!(build(&options), Err(TranslateError::InvalidOptions(_))));
    }

    #[test]
    fn test_unregistered_custom_type() {
        let options = PipelineOptions::default().with_custom("opaque", Opaque);
        assert!(matches!(
            build(&options),
            Err(TranslateError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn test_codec_round_trip() {
        let mut codecs = OptionCodecs::new();
        codecs.register_with::<u64>(
            |value| Ok(Value::from(value.to_string())),
            |value| {
                value
                    .as_str()
                    .and_then(|text| text.parse().ok())
                    .ok_or_else(|| TranslateError::unsupported("expected a numeric string"))
            },
        );
        assert!(codecs.contains::<u64>());

        let encoded = codecs.encode(&CustomValue::new(7_u64)).unwrap();
        assert_eq!(encoded, "7");
        assert_eq!(codecs.decode::<u64>(&encoded).unwrap(), 7);
        assert!(matches!(
            codecs.decode::<RetryPolicy>(&encoded),
            Err(TranslateError::UnsupportedShape(_))
        ));
    }
}
