//! Step names, output identifiers and display labels.

use std::collections::HashSet;

use flowplan_model::StableUniqueNames;

use crate::TRACING_TARGET;
use crate::error::{TranslateError, TranslateResult};

/// Issues output identifiers from a monotonic counter starting at 1.
#[derive(Debug)]
pub(crate) struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns the next identifier.
    pub fn allocate(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }
}

/// Tracks the step names already used in a job.
#[derive(Debug)]
pub(crate) struct StepNames {
    taken: HashSet<String>,
    policy: StableUniqueNames,
}

impl StepNames {
    pub fn new(policy: StableUniqueNames) -> Self {
        Self {
            taken: HashSet::new(),
            policy,
        }
    }

    /// Claims `name`, or the first free `name<k>` with `k >= 2` when it is
    /// taken and the policy allows renaming.
    pub fn claim(&mut self, name: &str) -> TranslateResult<String> {
        if self.taken.insert(name.to_owned()) {
            return Ok(name.to_owned());
        }

        if self.policy == StableUniqueNames::Error {
            return Err(TranslateError::DuplicateName(name.to_owned()));
        }

        let mut suffix = 2_usize;
        let unique = loop {
            let candidate = format!("{name}{suffix}");
            if !self.taken.contains(&candidate) {
                break candidate;
            }
            suffix += 1;
        };

        if self.policy == StableUniqueNames::Warning {
            tracing::warn!(
                target: TRACING_TARGET,
                name = %name,
                renamed = %unique,
                "step name is already taken"
            );
        }

        self.taken.insert(unique.clone());
        Ok(unique)
    }
}

/// Returns the display label of output `index` of a step.
pub fn display_label(step_name: &str, index: usize) -> String {
    format!("{step_name}.out{index}")
}
