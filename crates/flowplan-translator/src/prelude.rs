//! Prelude module for convenient imports.
//!
//! ```rust
//! use flowplan_translator::prelude::*;
//! ```

pub use crate::cloud_object::{CloudObject, CoderRegistry, CoderTranslator};
pub use crate::context::{StepBuilder, StepOutput, TranslationContext};
pub use crate::environment::OptionCodecs;
pub use crate::error::{TranslateError, TranslateResult};
pub use crate::job::{Job, JobSpecification, OutputReference, Package, Step, StepKind};
pub use crate::registry::{TransformTranslator, TranslatorRegistry};
pub use crate::translator::JobTranslator;
