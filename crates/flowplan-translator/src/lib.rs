#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod cloud_object;
mod context;
mod display;
mod environment;
mod error;
pub mod job;
mod lowering;
mod naming;
pub mod property;
mod registry;
pub mod serialized;
mod translator;
mod translators;
mod walker;

#[doc(hidden)]
pub mod prelude;

pub use context::{StepBuilder, StepOutput, TranslationContext};
pub use display::{DisplayRecord, DisplayType};
pub use environment::OptionCodecs;
pub use error::{TranslateError, TranslateResult};
pub use naming::display_label;
pub use registry::{TransformTranslator, TranslatorRegistry};
pub use translator::JobTranslator;

/// Tracing target for translation-wide events.
pub const TRACING_TARGET: &str = "flowplan_translator";

/// Tracing target for emitted steps.
pub const TRACING_TARGET_STEP: &str = "flowplan_translator::step";

/// Tracing target for hierarchy traversal.
pub const TRACING_TARGET_WALKER: &str = "flowplan_translator::walker";

/// Tracing target for multi-step lowering passes.
pub const TRACING_TARGET_LOWERING: &str = "flowplan_translator::lowering";
