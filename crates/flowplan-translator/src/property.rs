//! Step property keys understood by the backend.

/// Display name of a step or output.
pub const USER_NAME: &str = "user_name";
/// Ordered list of a step's outputs.
pub const OUTPUT_INFO: &str = "output_info";
/// Unique identifier of an output.
pub const OUTPUT_NAME: &str = "output_name";
/// Cloud-object encoding of an output's elements.
pub const ENCODING: &str = "encoding";
/// Marks an output written in the indexed, randomly-accessible format.
pub const USE_INDEXED_FORMAT: &str = "use_indexed_format";

/// Reference to the main input of a step.
pub const PARALLEL_INPUT: &str = "parallel_input";
/// Side inputs of a processing step, by tag.
pub const NON_PARALLEL_INPUTS: &str = "non_parallel_inputs";
/// Inputs of a flatten step.
pub const INPUTS: &str = "inputs";

/// Base64-encoded function bundle or windowing strategy.
pub const SERIALIZED_FN: &str = "serialized_fn";
/// Display records of a step.
pub const DISPLAY_DATA: &str = "display_data";
/// Set to `"true"` when the function reads per-key state or timers.
pub const USES_KEYED_STATE: &str = "uses_keyed_state";
/// Cloud-object encoding of a splittable function's restriction.
pub const RESTRICTION_CODER: &str = "restriction_coder";

/// Source format of a read step.
pub const FORMAT: &str = "format";
/// Format-specific source configuration.
pub const SOURCE_SPEC: &str = "source_spec";
/// Encoded in-line elements of a custom source.
pub const ELEMENTS: &str = "elements";

/// Requests grouped values sorted within each key.
pub const SORT_VALUES: &str = "sort_values";
/// Whether the grouping's window function merges windows.
pub const IS_MERGING_WINDOW_FN: &str = "is_merging_window_fn";
/// Forbids lifting combiners into a grouping step.
pub const DISALLOW_COMBINER_LIFTING: &str = "disallow_combiner_lifting";

/// How workers read a materialized view.
pub const ACCESS_PATTERN: &str = "access_pattern";
/// Whether a singleton view has a default value.
pub const HAS_DEFAULT: &str = "has_default";
/// Encoded default value of a singleton view.
pub const DEFAULT_VALUE: &str = "default_value";

/// Format of sources built from in-line elements.
pub const CUSTOM_SOURCE_FORMAT: &str = "custom_source";
