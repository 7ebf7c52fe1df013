//! Opaque payloads written under `serialized_fn`.
//!
//! Payloads are JSON documents encoded with standard base64 so they travel
//! through the property bag as plain strings and decode back exactly.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flowplan_model::{CombineFnSpec, Coder, DoFnSpec, WindowingStrategy};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::TranslateResult;

/// Encodes a payload.
pub fn encode_payload<T: Serialize>(payload: &T) -> TranslateResult<String> {
    let json = serde_json::to_vec(payload)?;
    Ok(STANDARD.encode(json))
}

/// Decodes a payload written by [`encode_payload`].
pub fn decode_payload<T: DeserializeOwned>(encoded: &str) -> TranslateResult<T> {
    let json = STANDARD.decode(encoded)?;
    Ok(serde_json::from_slice(&json)?)
}

/// An output of a processing function, as seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleOutput {
    /// Output tag used by the function.
    pub tag: String,
    /// Identifier of the step output the tag writes to.
    pub output_name: String,
}

/// A processing function together with everything a worker needs to run it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnBundle {
    /// The function.
    pub do_fn: DoFnSpec,
    /// Windowing strategy of the main input.
    pub windowing_strategy: WindowingStrategy,
    /// Element coder of the main input.
    pub input_coder: Coder,
    /// Tag of the main output.
    pub main_output_tag: String,
    /// Output tag map, in output order.
    #[serde(default)]
    pub outputs: Vec<BundleOutput>,
    /// Tags of the views read by the function.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub side_inputs: Vec<String>,
}

/// A combining function together with its coders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombineBundle {
    /// The function.
    pub combine_fn: CombineFnSpec,
    /// Element coder of the grouped input.
    pub input_coder: Coder,
    /// Windowing strategy of the input.
    pub windowing_strategy: WindowingStrategy,
}
