#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod coder;
mod collection;
mod display;
mod error;
mod function;
mod options;
mod pipeline;
mod transform;
mod window;

pub use coder::Coder;
pub use collection::{Collection, CollectionId, IsBounded};
pub use display::{DisplayItem, DisplayValue};
pub use error::{ModelError, ModelResult};
pub use function::{
    CombineFnSpec, DoFnSpec, ProcessParameter, RestrictionSpec, StateKind, StateSpec, TimeDomain,
    TimerSpec, simple_type_name,
};
pub use options::{
    AutoscalingAlgorithm, CustomOptions, CustomValue, PipelineOptions, PipelineOptionsBuilder,
    PipelineOptionsBuilderError, StableUniqueNames,
};
pub use pipeline::Pipeline;
pub use transform::{
    AppliedTransform, AssignWindows, CombineValues, Create, CreateView, CustomPrimitive, Flatten,
    GroupByKey, Output, ParDo, Primitive, Read, SideInput, TaggedOutput, TransformId,
    TransformKind, ViewKind, urn,
};
pub use window::{AccumulationMode, TimestampCombiner, WindowFn, WindowingStrategy};

/// Tag used for the main output of single-output processing transforms.
pub const MAIN_OUTPUT_TAG: &str = "main";
