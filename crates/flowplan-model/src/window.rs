//! Windowing strategies.

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::coder::Coder;

/// Assigns elements to windows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowFn {
    /// Every element belongs to the single global window.
    #[default]
    Global,
    /// Non-overlapping windows of a fixed size.
    Fixed {
        /// Window size.
        size: SignedDuration,
        /// Offset of window boundaries from the epoch.
        #[serde(default)]
        offset: SignedDuration,
    },
    /// Overlapping windows of a fixed size, started every `period`.
    Sliding {
        /// Window size.
        size: SignedDuration,
        /// Distance between window starts.
        period: SignedDuration,
        /// Offset of window boundaries from the epoch.
        #[serde(default)]
        offset: SignedDuration,
    },
    /// Per-key windows that close after a gap of inactivity.
    Sessions {
        /// Minimum gap between sessions.
        gap: SignedDuration,
    },
}

impl WindowFn {
    /// Creates fixed windows of the given size.
    pub fn fixed(size: SignedDuration) -> Self {
        Self::Fixed {
            size,
            offset: SignedDuration::ZERO,
        }
    }

    /// Creates sliding windows.
    pub fn sliding(size: SignedDuration, period: SignedDuration) -> Self {
        Self::Sliding {
            size,
            period,
            offset: SignedDuration::ZERO,
        }
    }

    /// Creates session windows.
    pub fn sessions(gap: SignedDuration) -> Self {
        Self::Sessions { gap }
    }

    /// Returns the coder of the windows this function assigns.
    pub fn window_coder(&self) -> Coder {
        match self {
            Self::Global => Coder::GlobalWindow,
            _ => Coder::IntervalWindow,
        }
    }

    /// Returns whether windows may merge (sessions).
    pub fn is_merging(&self) -> bool {
        matches!(self, Self::Sessions { .. })
    }
}

/// How panes of the same window relate to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccumulationMode {
    /// Each pane contains only elements new since the previous pane.
    #[default]
    DiscardingFiredPanes,
    /// Each pane contains every element seen so far.
    AccumulatingFiredPanes,
}

/// Timestamp assigned to grouped outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimestampCombiner {
    /// The earliest input timestamp.
    Earliest,
    /// The latest input timestamp.
    Latest,
    /// The end of the window.
    #[default]
    EndOfWindow,
}

/// Full windowing configuration of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowingStrategy {
    /// Window assignment function.
    #[serde(default)]
    pub window_fn: WindowFn,
    /// How long late data is still accepted.
    #[serde(default)]
    pub allowed_lateness: SignedDuration,
    /// Pane accumulation mode.
    #[serde(default)]
    pub accumulation_mode: AccumulationMode,
    /// Output timestamp policy.
    #[serde(default)]
    pub timestamp_combiner: TimestampCombiner,
}

impl WindowingStrategy {
    /// The default strategy: global window, no lateness.
    pub fn global() -> Self {
        Self::default()
    }

    /// Returns a copy of this strategy with a different window function.
    pub fn with_window_fn(&self, window_fn: WindowFn) -> Self {
        Self {
            window_fn,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_coder() {
        assert_eq!(WindowFn::Global.window_coder(), Coder::GlobalWindow);
        assert_eq!(
            WindowFn::fixed(SignedDuration::from_mins(1)).window_coder(),
            Coder::IntervalWindow
        );
    }

    #[test]
    fn test_only_sessions_merge() {
        assert!(WindowFn::sessions(SignedDuration::from_secs(30)).is_merging());
        assert!(!WindowFn::sliding(SignedDuration::from_mins(5), SignedDuration::from_mins(1)).is_merging());
        assert!(!WindowFn::Global.is_merging());
    }

    #[test]
    fn test_strategy_serialization() {
        let strategy = WindowingStrategy::global().with_window_fn(WindowFn::fixed(
            SignedDuration::from_mins(1),
        ));
        let json = serde_json::to_string(&strategy).unwrap();
        let back: WindowingStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, strategy);
    }
}
