//! Metadata attached to every group and case.
//!
//! Metadata is composed once, when a node is defined. A child starts from a
//! copy of its parent's tags and lays its own tags on top, so every tag set on
//! a group is visible on all of its descendants unless they override it.
//!
//! A handful of keys are not user tags at all. They are computed from the
//! definition itself (description, location, the described subject, ...) and
//! can only be read through [`Metadata::get`]. Supplying one of them as a tag
//! is a [`DefinitionError::ReservedKey`].

use std::borrow::Cow;

use indexmap::IndexMap;

use crate::error::DefinitionError;

mod value;
pub use value::*;

mod location;
pub use location::*;

mod description;
pub(crate) use description::join_descriptions;
pub use description::{Description, DescriptionPart, Subject};

/// Keys computed by kispec that cannot be supplied as tags.
pub const RESERVED_KEYS: &[&str] = &[
    "description",
    "description_args",
    "full_description",
    "described_class",
    "file_path",
    "line_number",
    "location",
    "block",
    "execution_result",
    "example_group",
    "parent_example_group",
    "scoped_id",
];

/// Tag that carries explicit caller frames instead of the tracked call site.
pub const CALLER_TAG: &str = "caller";

pub const FOCUS_TAG: &str = "focus";
pub const ORDER_TAG: &str = "order";
pub const PENDING_TAG: &str = "pending";
pub const SKIP_TAG: &str = "skip";

pub const NO_REASON_GIVEN: &str = "No reason given";

/// User supplied tags, in the order they were given.
///
/// Usually built with the [`tags!`](crate::tags) macro.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(IndexMap<Tag, Value>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<Tag>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<Tag>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &Value)> {
        self.0.iter()
    }

    fn take(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }
}

impl<K: Into<Tag>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Tags {
    fn from(entries: [(K, V); N]) -> Self {
        entries
            .into_iter()
            .fold(Tags::new(), |tags, (k, v)| tags.with(k, v))
    }
}

impl From<()> for Tags {
    fn from(_: ()) -> Self {
        Self::new()
    }
}

/// Build [`Tags`] from `key` or `key = value` pairs.
///
/// A key without a value is set to `true`, so `tags!(focus, order = Value::sym("random"))`
/// focuses a group and orders it randomly.
#[macro_export]
macro_rules! tags {
    () => { $crate::metadata::Tags::new() };
    ($($key:ident $(= $value:expr)?),+ $(,)?) => {
        $crate::metadata::Tags::new()
            $(.with(::std::stringify!($key), $crate::tags!(@value $($value)?)))+
    };
    (@value) => { true };
    (@value $value:expr) => { $value };
}

/// The composed metadata of a group or case.
#[derive(Debug, Clone)]
pub struct Metadata {
    description: String,
    description_args: Description,
    full_description: String,
    described: Option<Subject>,
    site: CallSite,
    scoped_id: String,
    has_block: bool,
    tags: IndexMap<Tag, Value>,
}

/// What a new node is defined with.
#[derive(Debug, Clone)]
pub(crate) struct Definition {
    pub description: Description,
    pub tags: Tags,
    pub site: CallSite,
    pub scoped_id: String,
    pub has_block: bool,
}

impl Metadata {
    /// Compose metadata for a group below `parent` (or at the top level).
    pub(crate) fn group(
        parent: Option<&Metadata>,
        definition: Definition,
    ) -> Result<Self, DefinitionError> {
        let described = definition
            .description
            .subject()
            .cloned()
            .or_else(|| parent.and_then(|parent| parent.described.clone()));
        Self::compose(parent, definition, described)
    }

    /// Compose metadata for a case inside `group`.
    pub(crate) fn case(group: &Metadata, definition: Definition) -> Result<Self, DefinitionError> {
        let described = group.described.clone();
        Self::compose(Some(group), definition, described)
    }

    fn compose(
        parent: Option<&Metadata>,
        definition: Definition,
        described: Option<Subject>,
    ) -> Result<Self, DefinitionError> {
        let Definition {
            description,
            mut tags,
            mut site,
            scoped_id,
            has_block,
        } = definition;

        if let Some((key, _)) = tags.iter().find(|(key, _)| is_reserved(key)) {
            return Err(DefinitionError::ReservedKey { key: key.clone() });
        }

        if let Some(Value::List(frames)) = tags.take(CALLER_TAG) {
            let frames: Vec<String> = frames
                .iter()
                .filter_map(Value::as_str)
                .map(|frame| relative_path(frame).unwrap_or_else(|| frame.to_string()))
                .collect();
            if let Some(caller) = CallSite::from_frames(frames.iter().map(String::as_str)) {
                site = caller;
            }
        }

        let mut composed = parent.map(|p| p.tags.clone()).unwrap_or_default();
        composed.extend(tags.0);

        let rendered = description.render();
        let full_description = match parent {
            None => rendered.clone(),
            Some(parent) => join_descriptions(
                &parent.full_description,
                &parent.description_args,
                &rendered,
                &description,
            ),
        };

        Ok(Self {
            description: rendered,
            description_args: description,
            full_description,
            described,
            site,
            scoped_id,
            has_block,
            tags: composed,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn description_args(&self) -> &Description {
        &self.description_args
    }

    pub fn full_description(&self) -> &str {
        &self.full_description
    }

    pub fn described(&self) -> Option<&Subject> {
        self.described.as_ref()
    }

    pub fn site(&self) -> &CallSite {
        &self.site
    }

    pub fn location(&self) -> String {
        self.site.location()
    }

    pub fn scoped_id(&self) -> &str {
        &self.scoped_id
    }

    /// Read a tag or a computed key.
    ///
    /// `execution_result`, `example_group` and `parent_example_group` are
    /// reserved but live on the tree and the results, so they read as `None`.
    pub fn get(&self, key: &str) -> Option<Cow<'_, Value>> {
        let computed = match key {
            "description" => Value::from(self.description.clone()),
            "full_description" => Value::from(self.full_description.clone()),
            "description_args" => Value::List(
                self.description_args
                    .parts()
                    .iter()
                    .map(|part| match part {
                        DescriptionPart::Subject(subject) => {
                            Value::sym(subject.name().to_string())
                        }
                        DescriptionPart::Text(text) => Value::Str(text.clone()),
                    })
                    .collect(),
            ),
            "described_class" => Value::sym(self.described.as_ref()?.name().to_string()),
            "file_path" => Value::Str(self.site.file.clone()),
            "line_number" => Value::from(self.site.line),
            "location" => Value::from(self.site.location()),
            "scoped_id" => Value::from(self.scoped_id.clone()),
            "block" => Value::Bool(self.has_block),
            _ => return self.tags.get(key).map(Cow::Borrowed),
        };
        Some(Cow::Owned(computed))
    }

    /// The user tags, inherited ones included.
    pub fn tags(&self) -> impl Iterator<Item = (&Tag, &Value)> {
        self.tags.iter()
    }

    pub fn tag(&self, key: &str) -> Option<&Value> {
        self.tags.get(key)
    }

    /// Change a tag after definition.
    ///
    /// Only this node sees the change, neither its parent nor children that
    /// were already defined.
    pub fn set_tag(
        &mut self,
        key: impl Into<Tag>,
        value: impl Into<Value>,
    ) -> Result<(), DefinitionError> {
        let key = key.into();
        if is_reserved(&key) {
            return Err(DefinitionError::ReservedKey { key });
        }
        self.tags.insert(key, value.into());
        Ok(())
    }

    /// Replace the described subject, `None` clears it.
    ///
    /// Children defined afterwards inherit the new subject.
    pub fn set_described(&mut self, subject: Option<Subject>) {
        self.described = subject;
    }

    pub fn is_focused(&self) -> bool {
        self.tags.get(FOCUS_TAG).is_some_and(Value::is_truthy)
    }

    /// The reason a node is pending, if it is.
    pub fn pending_reason(&self) -> Option<Cow<'_, str>> {
        reason(self.tags.get(PENDING_TAG)?)
    }

    /// The reason a node is skipped, if it is.
    pub fn skip_reason(&self) -> Option<Cow<'_, str>> {
        reason(self.tags.get(SKIP_TAG)?)
    }
}

fn reason(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Bool(false) => None,
        Value::Str(reason) | Value::Symbol(reason) => Some(Cow::Borrowed(reason)),
        _ => Some(Cow::Borrowed(NO_REASON_GIVEN)),
    }
}

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}
