//! Collections flowing between transforms.

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::coder::Coder;
use crate::transform::TransformId;
use crate::window::WindowingStrategy;

/// Identifier of a collection within one pipeline.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("c{_0}")]
#[display("c{_0}")]
#[serde(transparent)]
pub struct CollectionId(u32);

impl CollectionId {
    /// Returns the position of this collection in its pipeline.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Whether a collection has a finite number of elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsBounded {
    /// Finite collection.
    #[default]
    Bounded,
    /// Potentially infinite collection.
    Unbounded,
}

/// A typed dataset produced by one transform and consumed by others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Identifier within the pipeline.
    pub id: CollectionId,
    /// Name assigned by the user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Element coder.
    pub coder: Coder,
    /// Windowing strategy of the elements.
    #[serde(default)]
    pub windowing: WindowingStrategy,
    /// Boundedness.
    #[serde(default)]
    pub bounded: IsBounded,
    /// Primitive transform producing this collection.
    ///
    /// A collection without a producer is unbound and may not escape a
    /// composite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<TransformId>,
    /// Whether the collection is a broadcast view rather than a dataset.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_view: bool,
}

impl Collection {
    /// Returns whether a transform produces this collection.
    pub fn is_bound(&self) -> bool {
        self.producer.is_some()
    }
}
