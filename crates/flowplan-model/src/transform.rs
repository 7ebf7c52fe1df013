//! Applied transforms and primitive transform payloads.

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::collection::CollectionId;
use crate::display::DisplayItem;
use crate::function::{CombineFnSpec, DoFnSpec};
use crate::window::WindowFn;

/// URNs identifying the built-in primitive transforms.
pub mod urn {
    /// Reads from an external source.
    pub const READ: &str = "flowplan:primitive:read:v1";
    /// Creates a collection from in-line elements.
    pub const CREATE: &str = "flowplan:primitive:create:v1";
    /// Per-element processing.
    pub const PAR_DO: &str = "flowplan:primitive:par_do:v1";
    /// Groups key/value pairs by key.
    pub const GROUP_BY_KEY: &str = "flowplan:primitive:group_by_key:v1";
    /// Assigns elements to windows.
    pub const ASSIGN_WINDOWS: &str = "flowplan:primitive:assign_windows:v1";
    /// Merges several collections into one.
    pub const FLATTEN: &str = "flowplan:primitive:flatten:v1";
    /// Combines grouped values per key.
    pub const COMBINE_VALUES: &str = "flowplan:primitive:combine_values:v1";
    /// Exposes a collection as a broadcast view.
    pub const CREATE_VIEW: &str = "flowplan:primitive:create_view:v1";
}

/// Identifier of an applied transform within one pipeline.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("t{_0}")]
#[display("t{_0}")]
#[serde(transparent)]
pub struct TransformId(u32);

impl TransformId {
    /// Returns the position of this transform in its pipeline.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Reads a collection from an external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Read {
    /// Source format understood by the backend (for example `"text"`).
    pub format: String,
    /// Format-specific source specification.
    #[serde(default)]
    pub spec: serde_json::Value,
}

/// Creates a collection from in-line elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Create {
    /// Elements of the collection.
    pub elements: Vec<serde_json::Value>,
}

/// A broadcast view consumed by a processing function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideInput {
    /// Tag under which the function accesses the view.
    pub tag: String,
    /// The view collection.
    pub view: CollectionId,
}

/// Per-element processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParDo {
    /// The processing function.
    pub do_fn: DoFnSpec,
    /// Tag of the main output.
    pub main_output_tag: String,
    /// Views the function reads.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub side_inputs: Vec<SideInput>,
}

/// Groups key/value pairs by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupByKey {
    /// Forbids the backend from lifting combiners into this grouping.
    #[serde(default)]
    pub disallow_combiner_lifting: bool,
}

/// Assigns elements to windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignWindows {
    /// The window function.
    pub window_fn: WindowFn,
}

/// Merges collections of the same type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flatten {}

/// Combines the grouped values of each key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombineValues {
    /// The combining function.
    pub combine_fn: CombineFnSpec,
}

/// Access pattern of a broadcast view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewKind {
    /// Exactly one element per window.
    Singleton {
        /// Value used when a window is empty.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<serde_json::Value>,
    },
    /// Every element of the window, in no particular order.
    Iterable,
}

/// Exposes a collection as a broadcast view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateView {
    /// Access pattern of the view.
    pub view: ViewKind,
}

/// A primitive transform outside the built-in vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPrimitive {
    /// URN identifying the transform kind.
    pub urn: String,
    /// Opaque configuration.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Primitive transform payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From)]
#[serde(tag = "primitive", rename_all = "snake_case")]
pub enum Primitive {
    /// Source read.
    Read(Read),
    /// In-line creation.
    Create(Create),
    /// Per-element processing.
    ParDo(ParDo),
    /// Grouping by key.
    GroupByKey(GroupByKey),
    /// Window assignment.
    AssignWindows(AssignWindows),
    /// Collection merge.
    Flatten(Flatten),
    /// Per-key combine of grouped values.
    CombineValues(CombineValues),
    /// Broadcast view creation.
    CreateView(CreateView),
    /// Extension transform.
    Custom(CustomPrimitive),
}

impl Primitive {
    /// Returns the URN identifying this transform kind.
    pub fn urn(&self) -> &str {
        match self {
            Self::Read(_) => urn::READ,
            Self::Create(_) => urn::CREATE,
            Self::ParDo(_) => urn::PAR_DO,
            Self::GroupByKey(_) => urn::GROUP_BY_KEY,
            Self::AssignWindows(_) => urn::ASSIGN_WINDOWS,
            Self::Flatten(_) => urn::FLATTEN,
            Self::CombineValues(_) => urn::COMBINE_VALUES,
            Self::CreateView(_) => urn::CREATE_VIEW,
            Self::Custom(custom) => &custom.urn,
        }
    }

    /// Returns the fully-qualified type name of the payload.
    ///
    /// Used as the namespace of display items the transform contributes.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Read(_) => std::any::type_name::<Read>(),
            Self::Create(_) => std::any::type_name::<Create>(),
            Self::ParDo(_) => std::any::type_name::<ParDo>(),
            Self::GroupByKey(_) => std::any::type_name::<GroupByKey>(),
            Self::AssignWindows(_) => std::any::type_name::<AssignWindows>(),
            Self::Flatten(_) => std::any::type_name::<Flatten>(),
            Self::CombineValues(_) => std::any::type_name::<CombineValues>(),
            Self::CreateView(_) => std::any::type_name::<CreateView>(),
            Self::Custom(_) => std::any::type_name::<CustomPrimitive>(),
        }
    }

    /// Returns the name used when the user does not name the transform.
    pub fn default_name(&self) -> String {
        match self {
            Self::Read(read) => format!("Read({})", read.format),
            Self::Create(_) => "Create".to_owned(),
            Self::ParDo(par_do) => format!("ParDo({})", par_do.do_fn.simple_name()),
            Self::GroupByKey(_) => "GroupByKey".to_owned(),
            Self::AssignWindows(_) => "WindowInto".to_owned(),
            Self::Flatten(_) => "Flatten".to_owned(),
            Self::CombineValues(combine) => {
                format!("CombineValues({})", combine.combine_fn.simple_name())
            }
            Self::CreateView(create) => match create.view {
                ViewKind::Singleton { .. } => "ViewAsSingleton".to_owned(),
                ViewKind::Iterable => "ViewAsIterable".to_owned(),
            },
            Self::Custom(custom) => custom.urn.clone(),
        }
    }
}

/// Whether a transform is a primitive or groups other transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformKind {
    /// Translated into steps.
    Primitive {
        /// The transform payload.
        #[serde(flatten)]
        primitive: Primitive,
    },
    /// Expanded into its children.
    Composite,
}

/// A named member of a tuple output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedOutput {
    /// Output tag.
    pub tag: String,
    /// The tagged collection.
    pub collection: CollectionId,
}

/// The result of applying a transform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Output {
    /// A single collection.
    Collection {
        /// The output collection.
        collection: CollectionId,
    },
    /// Several named collections.
    Tuple {
        /// Members in declaration order.
        members: Vec<TaggedOutput>,
    },
    /// No output.
    #[default]
    Done,
}

impl Output {
    /// Returns the output collections in order, with their tags.
    pub fn collections(&self) -> Vec<(Option<&str>, CollectionId)> {
        match self {
            Self::Collection { collection } => vec![(None, *collection)],
            Self::Tuple { members } => members
                .iter()
                .map(|member| (Some(member.tag.as_str()), member.collection))
                .collect(),
            Self::Done => Vec::new(),
        }
    }
}

/// A transform applied within a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedTransform {
    /// Identifier within the pipeline.
    pub id: TransformId,
    /// Hierarchical name, `/`-separated from the outermost composite.
    pub full_name: String,
    /// Primitive payload or composite marker.
    #[serde(flatten)]
    pub kind: TransformKind,
    /// Main inputs in order.
    #[serde(default)]
    pub inputs: Vec<CollectionId>,
    /// Result of the transform.
    #[serde(default)]
    pub output: Output,
    /// Children of a composite, in application order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TransformId>,
    /// Enclosing composite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<TransformId>,
    /// Display metadata of the transform itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display_data: Vec<DisplayItem>,
}

impl AppliedTransform {
    /// Returns the primitive payload, if this is a primitive.
    pub fn primitive(&self) -> Option<&Primitive> {
        match &self.kind {
            TransformKind::Primitive { primitive } => Some(primitive),
            TransformKind::Composite => None,
        }
    }

    /// Returns whether this transform is a composite.
    pub fn is_composite(&self) -> bool {
        matches!(self.kind, TransformKind::Composite)
    }

    /// Returns every collection the transform reads, side inputs included.
    pub fn consumed(&self) -> Vec<CollectionId> {
        let mut consumed = self.inputs.clone();
        if let Some(Primitive::ParDo(par_do)) = self.primitive() {
            consumed.extend(par_do.side_inputs.iter().map(|side| side.view));
        }
        consumed
    }
}
