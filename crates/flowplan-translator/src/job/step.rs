//! Steps and output references.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

use crate::cloud_object::CloudObject;
use crate::error::TranslateResult;
use crate::property;

/// Kind of a step, from the vocabulary the backend executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
pub enum StepKind {
    /// Reads a source.
    ParallelRead,
    /// Runs a processing function over every element.
    ParallelDo,
    /// Groups by key.
    GroupByKey,
    /// Exposes a materialized collection as a view.
    CollectionToSingleton,
    /// Processes keyed restrictions with dynamic splitting.
    SplittableProcessKeyed,
    /// Merges collections.
    Flatten,
    /// Combines grouped values.
    CombineValues,
    /// Assigns windows.
    Bucket,
}

/// One unit of backend-executable work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Kind of work.
    pub kind: StepKind,
    /// Name, unique within the job.
    pub name: String,
    /// Open property bag, in insertion order.
    pub properties: Map<String, Value>,
}

impl Step {
    /// Returns a property.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Returns the declared outputs in order.
    pub fn outputs(&self) -> TranslateResult<Vec<OutputInfo>> {
        match self.properties.get(property::OUTPUT_INFO) {
            Some(outputs) => Ok(Vec::<OutputInfo>::deserialize(outputs)?),
            None => Ok(Vec::new()),
        }
    }

    /// Returns the input wired to `parallel_input`.
    pub fn parallel_input(&self) -> TranslateResult<Option<OutputReference>> {
        self.properties
            .get(property::PARALLEL_INPUT)
            .map(|input| Ok(OutputReference::deserialize(input)?))
            .transpose()
    }
}

/// A weak reference to a step output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "@type", rename = "OutputReference")]
pub struct OutputReference {
    /// Name of the producing step.
    pub step_name: String,
    /// Identifier of the output.
    pub output_name: String,
}

impl OutputReference {
    /// Creates a reference.
    pub fn new(step_name: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            output_name: output_name.into(),
        }
    }
}

/// One entry of a step's `output_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputInfo {
    /// Display label, `<step>.out<k>`.
    pub user_name: String,
    /// Job-wide unique numeric identifier.
    pub output_name: String,
    /// Windowed element coder.
    pub encoding: CloudObject,
    /// Set on outputs written in the indexed materialized format.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_indexed_format: bool,
}
