//! Descriptors of user processing and combining functions.

use serde::{Deserialize, Serialize};

use crate::coder::Coder;
use crate::display::DisplayItem;

/// Kind of a per-key state cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// A single value.
    Value,
    /// An append-only bag of values.
    Bag,
    /// A set of values.
    Set,
    /// A map of keys to values.
    Map,
    /// A value folded by a combining function.
    Combining,
}

/// A per-key state cell declared by a processing function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpec {
    /// Identifier of the cell.
    pub id: String,
    /// Kind of state.
    pub kind: StateKind,
    /// Coder of the stored values.
    pub coder: Coder,
}

/// Time domain of a timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeDomain {
    /// Fires on the input watermark.
    #[default]
    EventTime,
    /// Fires on the wall clock.
    ProcessingTime,
}

/// A per-key timer declared by a processing function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSpec {
    /// Identifier of the timer.
    pub id: String,
    /// Time domain of the timer.
    #[serde(default)]
    pub domain: TimeDomain,
}

/// A parameter of a function's per-element processing method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessParameter {
    /// The element being processed.
    Element,
    /// The element timestamp.
    Timestamp,
    /// The window of the element.
    Window,
    /// The generic process context.
    Context,
    /// A declared state cell.
    State {
        /// Identifier of the state cell.
        id: String,
    },
    /// A declared timer.
    Timer {
        /// Identifier of the timer.
        id: String,
    },
    /// The tracker of the current restriction.
    RestrictionTracker,
}

/// Per-element restriction of a splittable function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictionSpec {
    /// Fully-qualified name of the restriction type.
    pub type_name: String,
    /// Coder of the restriction.
    pub coder: Coder,
}

/// Descriptor of a per-element processing function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoFnSpec {
    /// Fully-qualified type name of the function.
    pub type_name: String,
    /// Opaque serialized function instance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payload: Vec<u8>,
    /// Declared state cells.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state: Vec<StateSpec>,
    /// Declared timers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timers: Vec<TimerSpec>,
    /// Parameters of the processing method.
    #[serde(default = "default_parameters")]
    pub parameters: Vec<ProcessParameter>,
    /// Restriction, present for splittable functions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restriction: Option<RestrictionSpec>,
    /// Display metadata contributed by the function.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display_data: Vec<DisplayItem>,
}

fn default_parameters() -> Vec<ProcessParameter> {
    vec![ProcessParameter::Context]
}

impl DoFnSpec {
    /// Creates a stateless function descriptor.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            payload: Vec::new(),
            state: Vec::new(),
            timers: Vec::new(),
            parameters: default_parameters(),
            restriction: None,
            display_data: Vec::new(),
        }
    }

    /// Sets the serialized function instance.
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Declares a state cell.
    pub fn with_state(mut self, state: StateSpec) -> Self {
        self.state.push(state);
        self
    }

    /// Declares a timer.
    pub fn with_timer(mut self, timer: TimerSpec) -> Self {
        self.timers.push(timer);
        self
    }

    /// Adds a processing method parameter.
    pub fn with_parameter(mut self, parameter: ProcessParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Makes the function splittable over the given restriction.
    pub fn with_restriction(mut self, restriction: RestrictionSpec) -> Self {
        self.restriction = Some(restriction);
        self
    }

    /// Adds a display item.
    pub fn with_display_item(mut self, item: DisplayItem) -> Self {
        self.display_data.push(item);
        self
    }

    /// Returns whether the function declares per-key state or timers.
    pub fn is_stateful(&self) -> bool {
        !self.state.is_empty() || !self.timers.is_empty()
    }

    /// Returns whether the function declares state or timers and its
    /// processing method takes one of them as a parameter.
    pub fn uses_keyed_state(&self) -> bool {
        self.is_stateful()
            && self.parameters.iter().any(|parameter| {
                matches!(
                    parameter,
                    ProcessParameter::State { .. } | ProcessParameter::Timer { .. }
                )
            })
    }

    /// Returns whether the function processes splittable restrictions.
    pub fn is_splittable(&self) -> bool {
        self.restriction.is_some()
    }

    /// Returns the type name without its module path.
    pub fn simple_name(&self) -> &str {
        simple_type_name(&self.type_name)
    }
}

/// Descriptor of a combining function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombineFnSpec {
    /// Fully-qualified type name of the function.
    pub type_name: String,
    /// Opaque serialized function instance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payload: Vec<u8>,
    /// Coder of the accumulator.
    pub accumulator_coder: Coder,
    /// Display metadata contributed by the function.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display_data: Vec<DisplayItem>,
}

impl CombineFnSpec {
    /// Creates a combining function descriptor.
    pub fn new(type_name: impl Into<String>, accumulator_coder: Coder) -> Self {
        Self {
            type_name: type_name.into(),
            payload: Vec::new(),
            accumulator_coder,
            display_data: Vec::new(),
        }
    }

    /// Returns the type name without its module path.
    pub fn simple_name(&self) -> &str {
        simple_type_name(&self.type_name)
    }
}

/// Strips the module path (`::` or `.` separated) from a type name.
pub fn simple_type_name(type_name: &str) -> &str {
    let tail = type_name.rsplit("::").next().unwrap_or(type_name);
    tail.rsplit('.').next().unwrap_or(tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_fn() -> DoFnSpec {
        DoFnSpec::new("my_pipeline::fns::CountFn").with_state(StateSpec {
            id: "count".into(),
            kind: StateKind::Value,
            coder: Coder::VarInt,
        })
    }

    #[test]
    fn test_declared_state_without_parameter() {
        let do_fn = counter_fn();
        assert!(do_fn.is_stateful());
        assert!(!do_fn.uses_keyed_state());
    }

    #[test]
    fn test_state_parameter_uses_keyed_state() {
        let do_fn = counter_fn().with_parameter(ProcessParameter::State { id: "count".into() });
        assert!(do_fn.uses_keyed_state());

        let timer_fn = DoFnSpec::new("my_pipeline::fns::Expiry")
            .with_timer(TimerSpec {
                id: "expiry".into(),
                domain: TimeDomain::EventTime,
            })
            .with_parameter(ProcessParameter::Timer { id: "expiry".into() });
        assert!(timer_fn.is_stateful());
        assert!(timer_fn.uses_keyed_state());
    }

    #[test]
    fn test_parameter_without_declaration() {
        let do_fn = DoFnSpec::new("my_pipeline::fns::LooseFn")
            .with_parameter(ProcessParameter::State { id: "missing".into() });
        assert!(!do_fn.is_stateful());
        assert!(!do_fn.uses_keyed_state());
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(counter_fn().simple_name(), "CountFn");
        assert_eq!(simple_type_name("org.example.Fn"), "Fn");
        assert_eq!(simple_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_default_parameters_on_deserialize() {
        let do_fn: DoFnSpec = serde_json::from_str(r#"{"type_name": "a::B"}"#).unwrap();
        assert_eq!(do_fn.parameters, vec![ProcessParameter::Context]);
        assert!(!do_fn.is_splittable());
    }
}
