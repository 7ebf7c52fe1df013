//! Pipeline construction and lookup.
//!
//! A [`Pipeline`] owns every applied transform and collection. Transforms
//! are applied in order; composites are opened with
//! [`Pipeline::begin_composite`] and closed with [`Pipeline::end_composite`],
//! and everything applied in between becomes their children.

use serde::{Deserialize, Serialize};

use crate::coder::Coder;
use crate::collection::{Collection, CollectionId, IsBounded};
use crate::display::DisplayItem;
use crate::error::{ModelError, ModelResult};
use crate::function::{CombineFnSpec, DoFnSpec};
use crate::transform::{
    AppliedTransform, AssignWindows, CombineValues, Create, CreateView, CustomPrimitive, Flatten,
    GroupByKey, Output, ParDo, Primitive, Read, SideInput, TaggedOutput, TransformId,
    TransformKind, ViewKind,
};
use crate::window::{WindowFn, WindowingStrategy};
use crate::MAIN_OUTPUT_TAG;

/// A directed acyclic graph of applied transforms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    transforms: Vec<AppliedTransform>,
    collections: Vec<Collection>,
    roots: Vec<TransformId>,
    #[serde(skip)]
    scopes: Vec<TransformId>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the transform with the given id.
    pub fn transform(&self, id: TransformId) -> ModelResult<&AppliedTransform> {
        self.transforms
            .get(id.index())
            .ok_or(ModelError::UnknownTransform(id))
    }

    /// Returns the collection with the given id.
    pub fn collection(&self, id: CollectionId) -> ModelResult<&Collection> {
        self.collections
            .get(id.index())
            .ok_or(ModelError::UnknownCollection(id))
    }

    /// Returns the outermost transforms in application order.
    pub fn roots(&self) -> &[TransformId] {
        &self.roots
    }

    /// Returns every transform in application order.
    pub fn transforms(&self) -> &[AppliedTransform] {
        &self.transforms
    }

    /// Returns every collection in creation order.
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Checks that the transform hierarchy and collection wiring agree.
    ///
    /// Pipelines built through this API always do; pipelines read from a
    /// serialized definition may not.
    pub fn validate(&self) -> ModelResult<()> {
        if let Some(open) = self.scopes.last() {
            return Err(malformed(format!("composite {open} is still open")));
        }

        for (index, transform) in self.transforms.iter().enumerate() {
            if transform.id.index() != index {
                return Err(malformed(format!(
                    "transform at position {index} has id {}",
                    transform.id
                )));
            }
            for input in transform.consumed() {
                self.collection(input)?;
            }
            for (_, output) in transform.output.collections() {
                self.collection(output)?;
            }
            if !transform.is_composite() && !transform.children.is_empty() {
                return Err(malformed(format!(
                    "primitive '{}' has children",
                    transform.full_name
                )));
            }
            for child in &transform.children {
                if self.transform(*child)?.parent != Some(transform.id) {
                    return Err(malformed(format!(
                        "'{}' lists {child} as a child but is not its parent",
                        transform.full_name
                    )));
                }
            }
            if let Some(parent) = transform.parent
                && !self.transform(parent)?.children.contains(&transform.id)
            {
                return Err(malformed(format!(
                    "'{}' names {parent} as its parent but is not among its children",
                    transform.full_name
                )));
            }
        }

        for (index, collection) in self.collections.iter().enumerate() {
            if collection.id.index() != index {
                return Err(malformed(format!(
                    "collection at position {index} has id {}",
                    collection.id
                )));
            }
            let Some(producer) = collection.producer else {
                continue;
            };
            let transform = self.transform(producer)?;
            if transform.is_composite() {
                return Err(malformed(format!(
                    "{} is produced by composite '{}'",
                    collection.id, transform.full_name
                )));
            }
            let produced = transform
                .output
                .collections()
                .iter()
                .any(|(_, id)| *id == collection.id);
            if !produced {
                return Err(malformed(format!(
                    "{} names '{}' as its producer but is not among its outputs",
                    collection.id, transform.full_name
                )));
            }
        }

        self.check_hierarchy()
    }

    /// Every transform must be reached exactly once from the roots.
    fn check_hierarchy(&self) -> ModelResult<()> {
        for root in &self.roots {
            if let Some(parent) = self.transform(*root)?.parent {
                return Err(malformed(format!("root {root} is nested in {parent}")));
            }
        }

        let mut visited = vec![false; self.transforms.len()];
        let mut pending: Vec<TransformId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            let transform = self.transform(id)?;
            if std::mem::replace(&mut visited[id.index()], true) {
                return Err(malformed(format!(
                    "'{}' is reached more than once",
                    transform.full_name
                )));
            }
            pending.extend(transform.children.iter().rev().copied());
        }

        match visited.iter().position(|seen| !seen) {
            Some(index) => Err(malformed(format!(
                "'{}' is not reachable from the roots",
                self.transforms[index].full_name
            ))),
            None => Ok(()),
        }
    }

    /// Assigns a user name to a collection.
    pub fn set_collection_name(
        &mut self,
        id: CollectionId,
        name: impl Into<String>,
    ) -> ModelResult<()> {
        let collection = self
            .collections
            .get_mut(id.index())
            .ok_or(ModelError::UnknownCollection(id))?;
        collection.name = Some(name.into());
        Ok(())
    }

    /// Attaches a display item to a transform.
    pub fn add_display_item(&mut self, id: TransformId, item: DisplayItem) -> ModelResult<()> {
        let transform = self
            .transforms
            .get_mut(id.index())
            .ok_or(ModelError::UnknownTransform(id))?;
        transform.display_data.push(item);
        Ok(())
    }

    /// Creates a bounded collection from in-line elements.
    pub fn create(
        &mut self,
        name: Option<&str>,
        elements: Vec<serde_json::Value>,
        coder: Coder,
    ) -> ModelResult<CollectionId> {
        let primitive = Primitive::Create(Create { elements });
        self.apply_single(
            name,
            primitive,
            Vec::new(),
            coder,
            WindowingStrategy::global(),
            IsBounded::Bounded,
        )
    }

    /// Reads a collection from an external source.
    pub fn read(
        &mut self,
        name: Option<&str>,
        format: impl Into<String>,
        spec: serde_json::Value,
        coder: Coder,
        bounded: IsBounded,
    ) -> ModelResult<CollectionId> {
        let primitive = Primitive::Read(Read {
            format: format.into(),
            spec,
        });
        self.apply_single(
            name,
            primitive,
            Vec::new(),
            coder,
            WindowingStrategy::global(),
            bounded,
        )
    }

    /// Applies a single-output processing function.
    pub fn par_do(
        &mut self,
        name: Option<&str>,
        input: CollectionId,
        do_fn: DoFnSpec,
        output_coder: Coder,
    ) -> ModelResult<CollectionId> {
        self.par_do_with_side_inputs(name, input, do_fn, Vec::new(), output_coder)
    }

    /// Applies a single-output processing function that reads views.
    pub fn par_do_with_side_inputs(
        &mut self,
        name: Option<&str>,
        input: CollectionId,
        do_fn: DoFnSpec,
        side_inputs: Vec<SideInput>,
        output_coder: Coder,
    ) -> ModelResult<CollectionId> {
        let par_do = ParDo {
            do_fn,
            main_output_tag: MAIN_OUTPUT_TAG.to_owned(),
            side_inputs,
        };
        let mut outputs =
            self.par_do_tagged(name, input, par_do, vec![(MAIN_OUTPUT_TAG.to_owned(), output_coder)])?;
        outputs.pop().ok_or_else(|| ModelError::InvalidInput {
            transform: name.unwrap_or("ParDo").to_owned(),
            message: "processing function produced no output".to_owned(),
        })
    }

    /// Applies a processing function with tagged outputs.
    ///
    /// `outputs` lists each output tag with its coder; the main output tag of
    /// `par_do` must be among them. Returns the output collections in the
    /// order given.
    pub fn par_do_tagged(
        &mut self,
        name: Option<&str>,
        input: CollectionId,
        par_do: ParDo,
        outputs: Vec<(String, Coder)>,
    ) -> ModelResult<Vec<CollectionId>> {
        let transform_name = name
            .map(str::to_owned)
            .unwrap_or_else(|| Primitive::ParDo(par_do.clone()).default_name());

        if !outputs.iter().any(|(tag, _)| *tag == par_do.main_output_tag) {
            return Err(ModelError::InvalidInput {
                transform: transform_name,
                message: format!("main output tag '{}' is not declared", par_do.main_output_tag),
            });
        }
        for side_input in &par_do.side_inputs {
            if !self.collection(side_input.view)?.is_view {
                return Err(ModelError::InvalidInput {
                    transform: transform_name,
                    message: format!("side input '{}' is not a view", side_input.tag),
                });
            }
        }

        let source = self.collection(input)?;
        let windowing = source.windowing.clone();
        let bounded = source.bounded;

        let id = self.push_transform(
            &transform_name,
            TransformKind::Primitive {
                primitive: Primitive::ParDo(par_do),
            },
            vec![input],
        );
        let members: Vec<TaggedOutput> = outputs
            .into_iter()
            .map(|(tag, coder)| TaggedOutput {
                tag,
                collection: self.push_collection(coder, windowing.clone(), bounded, Some(id)),
            })
            .collect();
        let collections = members.iter().map(|member| member.collection).collect();
        self.transforms[id.index()].output = Output::Tuple { members };
        Ok(collections)
    }

    /// Groups a key/value collection by key.
    ///
    /// The output holds each key with the iterable of its values.
    pub fn group_by_key(
        &mut self,
        name: Option<&str>,
        input: CollectionId,
    ) -> ModelResult<CollectionId> {
        let primitive = Primitive::GroupByKey(GroupByKey::default());
        let source = self.collection(input)?;
        let Some((key, value)) = source.coder.as_kv() else {
            return Err(ModelError::InvalidInput {
                transform: name.map(str::to_owned).unwrap_or_else(|| primitive.default_name()),
                message: "input must be a key/value collection".to_owned(),
            });
        };
        let coder = Coder::kv(key.clone(), Coder::iterable(value.clone()));
        let (windowing, bounded) = (source.windowing.clone(), source.bounded);
        self.apply_single(name, primitive, vec![input], coder, windowing, bounded)
    }

    /// Assigns the elements of a collection to new windows.
    pub fn window_into(
        &mut self,
        name: Option<&str>,
        input: CollectionId,
        window_fn: WindowFn,
    ) -> ModelResult<CollectionId> {
        let source = self.collection(input)?;
        let coder = source.coder.clone();
        let windowing = source.windowing.with_window_fn(window_fn.clone());
        let bounded = source.bounded;
        let primitive = Primitive::AssignWindows(AssignWindows { window_fn });
        self.apply_single(name, primitive, vec![input], coder, windowing, bounded)
    }

    /// Merges collections that share a coder.
    pub fn flatten(
        &mut self,
        name: Option<&str>,
        inputs: &[CollectionId],
    ) -> ModelResult<CollectionId> {
        let primitive = Primitive::Flatten(Flatten {});
        let transform_name = || name.map(str::to_owned).unwrap_or_else(|| primitive.default_name());

        let Some((first, rest)) = inputs.split_first() else {
            return Err(ModelError::InvalidInput {
                transform: transform_name(),
                message: "at least one input is required".to_owned(),
            });
        };
        let first = self.collection(*first)?;
        let mut bounded = first.bounded;
        for id in rest {
            let other = self.collection(*id)?;
            if other.coder != first.coder {
                return Err(ModelError::InvalidInput {
                    transform: transform_name(),
                    message: format!("input {id} has a different coder"),
                });
            }
            if other.bounded == IsBounded::Unbounded {
                bounded = IsBounded::Unbounded;
            }
        }

        let (coder, windowing) = (first.coder.clone(), first.windowing.clone());
        self.apply_single(name, primitive, inputs.to_vec(), coder, windowing, bounded)
    }

    /// Combines the grouped values of each key.
    ///
    /// The input must hold keys with iterables of values, as produced by
    /// [`Pipeline::group_by_key`].
    pub fn combine_values(
        &mut self,
        name: Option<&str>,
        input: CollectionId,
        combine_fn: CombineFnSpec,
        output_value_coder: Coder,
    ) -> ModelResult<CollectionId> {
        let primitive = Primitive::CombineValues(CombineValues { combine_fn });
        let source = self.collection(input)?;
        let key = match source.coder.as_kv() {
            Some((key, value)) if value.as_iterable().is_some() => key.clone(),
            _ => {
                return Err(ModelError::InvalidInput {
                    transform: name.map(str::to_owned).unwrap_or_else(|| primitive.default_name()),
                    message: "input must hold keys with grouped values".to_owned(),
                });
            }
        };
        let coder = Coder::kv(key, output_value_coder);
        let (windowing, bounded) = (source.windowing.clone(), source.bounded);
        self.apply_single(name, primitive, vec![input], coder, windowing, bounded)
    }

    /// Exposes a collection as a singleton view.
    pub fn view_as_singleton(
        &mut self,
        name: Option<&str>,
        input: CollectionId,
        default_value: Option<serde_json::Value>,
    ) -> ModelResult<CollectionId> {
        self.create_view(name, input, ViewKind::Singleton { default_value })
    }

    /// Exposes a collection as an iterable view.
    pub fn view_as_iterable(
        &mut self,
        name: Option<&str>,
        input: CollectionId,
    ) -> ModelResult<CollectionId> {
        self.create_view(name, input, ViewKind::Iterable)
    }

    fn create_view(
        &mut self,
        name: Option<&str>,
        input: CollectionId,
        view: ViewKind,
    ) -> ModelResult<CollectionId> {
        let source = self.collection(input)?;
        let (coder, windowing, bounded) =
            (source.coder.clone(), source.windowing.clone(), source.bounded);
        let primitive = Primitive::CreateView(CreateView { view });
        let id = self.apply_single(name, primitive, vec![input], coder, windowing, bounded)?;
        self.collections[id.index()].is_view = true;
        Ok(id)
    }

    /// Applies a primitive outside the built-in vocabulary.
    ///
    /// Returns the output collection when `output_coder` is given.
    pub fn apply_custom(
        &mut self,
        name: Option<&str>,
        primitive: CustomPrimitive,
        inputs: &[CollectionId],
        output_coder: Option<Coder>,
    ) -> ModelResult<Option<CollectionId>> {
        let (windowing, bounded) = self.inherited(inputs)?;
        let primitive = Primitive::Custom(primitive);
        let transform_name = name.map(str::to_owned).unwrap_or_else(|| primitive.default_name());
        let id = self.push_transform(
            &transform_name,
            TransformKind::Primitive { primitive },
            inputs.to_vec(),
        );

        let Some(coder) = output_coder else {
            return Ok(None);
        };
        let collection = self.push_collection(coder, windowing, bounded, Some(id));
        self.transforms[id.index()].output = Output::Collection { collection };
        Ok(Some(collection))
    }

    /// Opens a composite transform.
    ///
    /// Every transform applied until the matching
    /// [`Pipeline::end_composite`] becomes its child.
    pub fn begin_composite(
        &mut self,
        name: &str,
        inputs: &[CollectionId],
    ) -> ModelResult<TransformId> {
        for input in inputs {
            self.collection(*input)?;
        }
        let id = self.push_transform(name, TransformKind::Composite, inputs.to_vec());
        self.scopes.push(id);
        Ok(id)
    }

    /// Closes the innermost open composite and records its output.
    ///
    /// Output members are not checked for being produced; that is verified
    /// when the pipeline is translated.
    pub fn end_composite(&mut self, output: Output) -> ModelResult<TransformId> {
        for (_, collection) in output.collections() {
            self.collection(collection)?;
        }
        let id = self.scopes.pop().ok_or(ModelError::NoOpenComposite)?;
        self.transforms[id.index()].output = output;
        Ok(id)
    }

    /// Creates a collection that no transform produces.
    pub fn unbound_collection(&mut self, coder: Coder) -> CollectionId {
        self.push_collection(coder, WindowingStrategy::global(), IsBounded::Bounded, None)
    }

    fn apply_single(
        &mut self,
        name: Option<&str>,
        primitive: Primitive,
        inputs: Vec<CollectionId>,
        coder: Coder,
        windowing: WindowingStrategy,
        bounded: IsBounded,
    ) -> ModelResult<CollectionId> {
        for input in &inputs {
            self.collection(*input)?;
        }
        let transform_name = name.map(str::to_owned).unwrap_or_else(|| primitive.default_name());
        let id = self.push_transform(
            &transform_name,
            TransformKind::Primitive { primitive },
            inputs,
        );
        let collection = self.push_collection(coder, windowing, bounded, Some(id));
        self.transforms[id.index()].output = Output::Collection { collection };
        Ok(collection)
    }

    /// Windowing of the first input and the combined boundedness of all.
    fn inherited(&self, inputs: &[CollectionId]) -> ModelResult<(WindowingStrategy, IsBounded)> {
        let mut windowing = None;
        let mut bounded = IsBounded::Bounded;
        for input in inputs {
            let collection = self.collection(*input)?;
            windowing.get_or_insert_with(|| collection.windowing.clone());
            if collection.bounded == IsBounded::Unbounded {
                bounded = IsBounded::Unbounded;
            }
        }
        Ok((windowing.unwrap_or_default(), bounded))
    }

    fn push_transform(
        &mut self,
        name: &str,
        kind: TransformKind,
        inputs: Vec<CollectionId>,
    ) -> TransformId {
        let id = TransformId::from(self.transforms.len() as u32);
        let parent = self.scopes.last().copied();
        let full_name = match parent {
            Some(parent) => format!("{}/{name}", self.transforms[parent.index()].full_name),
            None => name.to_owned(),
        };

        match parent {
            Some(parent) => self.transforms[parent.index()].children.push(id),
            None => self.roots.push(id),
        }
        self.transforms.push(AppliedTransform {
            id,
            full_name,
            kind,
            inputs,
            output: Output::Done,
            children: Vec::new(),
            parent,
            display_data: Vec::new(),
        });
        id
    }

    fn push_collection(
        &mut self,
        coder: Coder,
        windowing: WindowingStrategy,
        bounded: IsBounded,
        producer: Option<TransformId>,
    ) -> CollectionId {
        let id = CollectionId::from(self.collections.len() as u32);
        self.collections.push(Collection {
            id,
            name: None,
            coder,
            windowing,
            bounded,
            producer,
            is_view: false,
        });
        id
    }
}

fn malformed(message: String) -> ModelError {
    ModelError::Malformed(message)
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    fn kv_source(pipeline: &mut Pipeline) -> CollectionId {
        pipeline
            .create(
                Some("Pairs"),
                vec![serde_json::json!(["a", 1])],
                Coder::kv(Coder::StringUtf8, Coder::VarInt),
            )
            .unwrap()
    }

    #[test]
    fn test_default_and_user_names() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        let doubled = pipeline
            .par_do(Some("Double"), numbers, DoFnSpec::new("fns::DoubleFn"), Coder::VarInt)
            .unwrap();
        pipeline
            .par_do(None, doubled, DoFnSpec::new("fns::LogFn"), Coder::VarInt)
            .unwrap();

        let names: Vec<_> = pipeline
            .transforms()
            .iter()
            .map(|transform| transform.full_name.as_str())
            .collect();
        assert_eq!(names, ["Create", "Double", "ParDo(LogFn)"]);
        assert_eq!(pipeline.roots().len(), 3);
    }

    #[test]
    fn test_composite_children_are_nested() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(Some("Numbers"), vec![1.into()], Coder::VarInt).unwrap();
        let composite = pipeline.begin_composite("Outer", &[numbers]).unwrap();
        let inner = pipeline
            .par_do(Some("Inner"), numbers, DoFnSpec::new("fns::Fn"), Coder::VarInt)
            .unwrap();
        pipeline
            .end_composite(Output::Collection { collection: inner })
            .unwrap();

        let outer = pipeline.transform(composite).unwrap();
        assert!(outer.is_composite());
        assert_eq!(outer.children.len(), 1);

        let child = pipeline.transform(outer.children[0]).unwrap();
        assert_eq!(child.full_name, "Outer/Inner");
        assert_eq!(child.parent, Some(composite));
        assert_eq!(pipeline.roots().len(), 2);
    }

    #[test]
    fn test_end_composite_without_begin() {
        let mut pipeline = Pipeline::new();
        assert_eq!(
            pipeline.end_composite(Output::Done),
            Err(ModelError::NoOpenComposite)
        );
    }

    #[test]
    fn test_group_by_key_output_coder() {
        let mut pipeline = Pipeline::new();
        let pairs = kv_source(&mut pipeline);
        let grouped = pipeline.group_by_key(None, pairs).unwrap();

        let coder = &pipeline.collection(grouped).unwrap().coder;
        assert_eq!(
            coder,
            &Coder::kv(Coder::StringUtf8, Coder::iterable(Coder::VarInt))
        );
    }

    #[test]
    fn test_group_by_key_requires_kv() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        let error = pipeline.group_by_key(Some("Group"), numbers).unwrap_err();
        assert!(matches!(error, ModelError::InvalidInput { transform, .. } if transform == "Group"));
    }

    #[test]
    fn test_window_into_changes_downstream_windowing() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        let windowed = pipeline
            .window_into(None, numbers, WindowFn::fixed(SignedDuration::from_mins(1)))
            .unwrap();
        let processed = pipeline
            .par_do(None, windowed, DoFnSpec::new("fns::Fn"), Coder::VarInt)
            .unwrap();

        let windowing = &pipeline.collection(processed).unwrap().windowing;
        assert_eq!(windowing.window_fn, WindowFn::fixed(SignedDuration::from_mins(1)));
    }

    #[test]
    fn test_side_input_must_be_view() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        let side_input = SideInput {
            tag: "side".into(),
            view: numbers,
        };
        let result = pipeline.par_do_with_side_inputs(
            None,
            numbers,
            DoFnSpec::new("fns::Fn"),
            vec![side_input],
            Coder::VarInt,
        );
        assert!(result.is_err());

        let view = pipeline.view_as_singleton(None, numbers, None).unwrap();
        assert!(pipeline.collection(view).unwrap().is_view);
    }

    #[test]
    fn test_tagged_outputs_in_order() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        let par_do = ParDo {
            do_fn: DoFnSpec::new("fns::SplitFn"),
            main_output_tag: "even".into(),
            side_inputs: Vec::new(),
        };
        let outputs = pipeline
            .par_do_tagged(
                None,
                numbers,
                par_do,
                vec![("even".into(), Coder::VarInt), ("odd".into(), Coder::VarInt)],
            )
            .unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(outputs.iter().all(|id| pipeline.collection(*id).unwrap().is_bound()));
    }

    #[test]
    fn test_flatten_rejects_mixed_coders() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(None, vec![1.into()], Coder::VarInt).unwrap();
        let words = pipeline.create(None, vec!["a".into()], Coder::StringUtf8).unwrap();
        assert!(pipeline.flatten(None, &[numbers, words]).is_err());
        assert!(pipeline.flatten(None, &[]).is_err());
    }

    /// Serializes a small composite pipeline, applies `edit` to the JSON
    /// form and reads it back.
    fn edited(edit: impl FnOnce(&mut serde_json::Value)) -> Pipeline {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline.create(Some("Numbers"), vec![1.into()], Coder::VarInt).unwrap();
        pipeline.begin_composite("Outer", &[numbers]).unwrap();
        let doubled = pipeline
            .par_do(Some("Double"), numbers, DoFnSpec::new("fns::DoubleFn"), Coder::VarInt)
            .unwrap();
        pipeline
            .end_composite(Output::Collection { collection: doubled })
            .unwrap();
        pipeline.validate().unwrap();

        let mut json = serde_json::to_value(&pipeline).unwrap();
        edit(&mut json);
        serde_json::from_value(json).unwrap()
    }

    fn assert_malformed(pipeline: &Pipeline) {
        let error = pipeline.validate().unwrap_err();
        assert!(matches!(error, ModelError::Malformed(_)), "{error:?}");
    }

    #[test]
    fn test_validate_accepts_built_pipelines() {
        edited(|_| {}).validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_open_composite() {
        let mut pipeline = Pipeline::new();
        pipeline.begin_composite("Open", &[]).unwrap();
        assert_malformed(&pipeline);
    }

    #[test]
    fn test_validate_rejects_mismatched_id() {
        assert_malformed(&edited(|json| json["transforms"][2]["id"] = 0.into()));
        assert_malformed(&edited(|json| json["collections"][0]["id"] = 1.into()));
    }

    #[test]
    fn test_validate_rejects_bad_producer() {
        assert_malformed(&edited(|json| json["collections"][1]["producer"] = 1.into()));
        assert_malformed(&edited(|json| json["collections"][1]["producer"] = 0.into()));
        let out_of_range = edited(|json| json["collections"][1]["producer"] = 9.into());
        assert_eq!(
            out_of_range.validate(),
            Err(ModelError::UnknownTransform(TransformId::from(9)))
        );
    }

    #[test]
    fn test_validate_rejects_inconsistent_hierarchy() {
        // A composite listing itself as a child.
        assert_malformed(&edited(|json| {
            json["transforms"][1]["children"] = serde_json::json!([1, 2]);
        }));
        // A parent that does not list the child.
        assert_malformed(&edited(|json| {
            json["transforms"][1]["children"] = serde_json::json!([]);
        }));
        // A transform that is both a root and a child.
        assert_malformed(&edited(|json| {
            json["roots"] = serde_json::json!([0, 1, 2]);
        }));
        // A transform unreachable from the roots.
        assert_malformed(&edited(|json| {
            json["roots"] = serde_json::json!([1]);
        }));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut pipeline = Pipeline::new();
        let pairs = kv_source(&mut pipeline);
        pipeline.group_by_key(None, pairs).unwrap();

        let json = serde_json::to_string(&pipeline).unwrap();
        let back: Pipeline = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pipeline);
    }
}
