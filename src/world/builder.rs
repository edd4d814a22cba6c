use std::borrow::Cow;

use crate::{
    body::{BodyResult, case_fn},
    error::DefinitionError,
    filter::FilterRules,
    hook::{HookOwner, HookPhase, IntoHookScope, Proceed, around_hook, hook},
    metadata::{
        CallSite, Description, FOCUS_TAG, Metadata, PENDING_TAG, SKIP_TAG, Subject, Tag, Tags,
        Value,
    },
    runner::Context,
    shared::{InclusionMode, InclusionSite, SharedArgs},
    tree::NodeId,
    world::{World, XDESCRIBE_REASON},
};

pub(crate) const XIT_REASON: &str = "Temporarily skipped with xit";

/// Defines the contents of one group.
///
/// Handed to every group body. Nested groups, cases, hooks and shared group
/// inclusions defined through it end up below the group it was created for.
pub struct GroupBuilder<'w> {
    world: &'w World,
    id: NodeId,
}

macro_rules! case_helpers {
    ($($(#[$doc:meta])* $name:ident => |$tags:ident| $adjust:expr;)+) => {
        $(
            $(#[$doc])*
            #[track_caller]
            pub fn $name<F, T>(
                &mut self,
                description: impl Into<Description>,
                tags: impl Into<Tags>,
                body: F,
            ) -> Result<NodeId, DefinitionError>
            where
                F: Fn(&mut Context<'_>) -> T + 'static,
                T: Into<BodyResult>,
            {
                let site = CallSite::caller();
                let $tags: Tags = tags.into();
                let tags = $adjust;
                self.world
                    .add_case(self.id, description.into(), tags, site, Some(case_fn(body)))
            }
        )+
    };
}

macro_rules! group_helpers {
    ($($(#[$doc:meta])* $name:ident => |$tags:ident| $adjust:expr;)+) => {
        $(
            $(#[$doc])*
            #[track_caller]
            pub fn $name<F>(
                &mut self,
                description: impl Into<Description>,
                tags: impl Into<Tags>,
                body: F,
            ) -> Result<NodeId, DefinitionError>
            where
                F: FnOnce(&mut GroupBuilder<'_>) -> Result<(), DefinitionError>,
            {
                let site = CallSite::caller();
                let $tags: Tags = tags.into();
                let tags = $adjust;
                self.nested(description.into(), tags, site, body)
            }
        )+
    };
}

impl<'w> GroupBuilder<'w> {
    pub(crate) fn new(world: &'w World, id: NodeId) -> Self {
        Self { world, id }
    }

    /// The group being defined.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// A copy of the group's metadata as composed so far.
    pub fn metadata(&self) -> Metadata {
        self.world
            .tree()
            .metadata(self.id)
            .cloned()
            .expect("builder group exists")
    }

    /// Change a tag of this group. Only cases and groups defined afterwards
    /// inherit it.
    pub fn set_tag(
        &mut self,
        key: impl Into<Tag>,
        value: impl Into<Value>,
    ) -> Result<(), DefinitionError> {
        self.world.with_tree_mut(|tree| {
            tree.metadata_mut(self.id)
                .expect("builder group exists")
                .set_tag(key, value)
        })
    }

    /// Replace the described subject, `None` clears it.
    pub fn set_described(&mut self, subject: Option<Subject>) {
        self.world.with_tree_mut(|tree| {
            tree.metadata_mut(self.id)
                .expect("builder group exists")
                .set_described(subject)
        })
    }

    group_helpers! {
        /// Define a nested group.
        describe => |tags| tags;
        /// Alias of [`describe`](Self::describe).
        context => |tags| tags;
        /// A nested group tagged `focus`.
        fdescribe => |tags| tags.with(FOCUS_TAG, true);
        /// Alias of [`fdescribe`](Self::fdescribe).
        fcontext => |tags| tags.with(FOCUS_TAG, true);
        /// A nested group whose cases are all skipped.
        xdescribe => |tags| tags.with(SKIP_TAG, XDESCRIBE_REASON);
        /// Alias of [`xdescribe`](Self::xdescribe).
        xcontext => |tags| tags.with(SKIP_TAG, XDESCRIBE_REASON);
    }

    case_helpers! {
        /// Define a case.
        it => |tags| tags;
        /// Alias of [`it`](Self::it).
        example => |tags| tags;
        /// Alias of [`it`](Self::it).
        specify => |tags| tags;
        /// A case tagged `focus`.
        fit => |tags| tags.with(FOCUS_TAG, true);
        /// A case that is skipped.
        xit => |tags| tags.with(SKIP_TAG, XIT_REASON);
        /// A case that is expected to fail.
        ///
        /// If the body fails the case is pending, if it passes the case fails.
        pending => |tags| default_tag(tags, PENDING_TAG);
        /// A case that is skipped, its body never runs.
        skip => |tags| default_tag(tags, SKIP_TAG);
    }

    /// A case without a body, reported as pending.
    #[track_caller]
    pub fn not_yet_implemented(
        &mut self,
        description: impl Into<Description>,
        tags: impl Into<Tags>,
    ) -> Result<NodeId, DefinitionError> {
        let site = CallSite::caller();
        self.world
            .add_case(self.id, description.into(), tags.into(), site, None)
    }

    #[track_caller]
    pub fn before<F, T>(&mut self, scope: impl IntoHookScope, body: F) -> Result<(), DefinitionError>
    where
        F: Fn(&mut Context<'_>) -> T + 'static,
        T: Into<BodyResult>,
    {
        let site = CallSite::caller();
        self.add_hook(HookPhase::Before, scope, FilterRules::new(), body, site)
    }

    /// Like [`before`](Self::before), only for nodes matching `conditions`.
    #[track_caller]
    pub fn before_when<F, T>(
        &mut self,
        scope: impl IntoHookScope,
        conditions: impl Into<FilterRules>,
        body: F,
    ) -> Result<(), DefinitionError>
    where
        F: Fn(&mut Context<'_>) -> T + 'static,
        T: Into<BodyResult>,
    {
        let site = CallSite::caller();
        self.add_hook(HookPhase::Before, scope, conditions.into(), body, site)
    }

    #[track_caller]
    pub fn after<F, T>(&mut self, scope: impl IntoHookScope, body: F) -> Result<(), DefinitionError>
    where
        F: Fn(&mut Context<'_>) -> T + 'static,
        T: Into<BodyResult>,
    {
        let site = CallSite::caller();
        self.add_hook(HookPhase::After, scope, FilterRules::new(), body, site)
    }

    #[track_caller]
    pub fn after_when<F, T>(
        &mut self,
        scope: impl IntoHookScope,
        conditions: impl Into<FilterRules>,
        body: F,
    ) -> Result<(), DefinitionError>
    where
        F: Fn(&mut Context<'_>) -> T + 'static,
        T: Into<BodyResult>,
    {
        let site = CallSite::caller();
        self.add_hook(HookPhase::After, scope, conditions.into(), body, site)
    }

    #[track_caller]
    pub fn around<F, T>(&mut self, scope: impl IntoHookScope, body: F) -> Result<(), DefinitionError>
    where
        F: Fn(&mut Context<'_>, Proceed<'_>) -> T + 'static,
        T: Into<BodyResult>,
    {
        let site = CallSite::caller();
        self.add_around(scope, FilterRules::new(), body, site)
    }

    #[track_caller]
    pub fn around_when<F, T>(
        &mut self,
        scope: impl IntoHookScope,
        conditions: impl Into<FilterRules>,
        body: F,
    ) -> Result<(), DefinitionError>
    where
        F: Fn(&mut Context<'_>, Proceed<'_>) -> T + 'static,
        T: Into<BodyResult>,
    {
        let site = CallSite::caller();
        self.add_around(scope, conditions.into(), body, site)
    }

    /// Define shared examples visible to this group and everything below it.
    #[track_caller]
    pub fn shared_examples<F>(
        &mut self,
        name: impl Into<Tag>,
        params: &[&'static str],
        body: F,
    ) -> Result<(), DefinitionError>
    where
        F: Fn(&mut GroupBuilder<'_>, &SharedArgs) -> Result<(), DefinitionError> + 'static,
    {
        let site = CallSite::caller();
        self.world.shared_mut().define(
            Some(self.id),
            name.into(),
            params.iter().map(|param| Tag::from(*param)).collect(),
            std::rc::Rc::new(body),
            site,
        )
    }

    /// Include shared examples in a new nested group "behaves like <name>".
    #[track_caller]
    pub fn it_behaves_like(
        &mut self,
        name: &str,
        args: Vec<Value>,
    ) -> Result<NodeId, DefinitionError> {
        let site = CallSite::caller();
        self.include(name, args, site, InclusionMode::Nested, |_| Ok(()))
    }

    /// Like [`it_behaves_like`](Self::it_behaves_like), then run `customize`
    /// in the same nested group.
    #[track_caller]
    pub fn it_behaves_like_with<F>(
        &mut self,
        name: &str,
        args: Vec<Value>,
        customize: F,
    ) -> Result<NodeId, DefinitionError>
    where
        F: FnOnce(&mut GroupBuilder<'_>) -> Result<(), DefinitionError>,
    {
        let site = CallSite::caller();
        self.include(name, args, site, InclusionMode::Nested, customize)
    }

    /// Include shared examples directly into this group.
    #[track_caller]
    pub fn include_examples(&mut self, name: &str, args: Vec<Value>) -> Result<(), DefinitionError> {
        let site = CallSite::caller();
        self.include(name, args, site, InclusionMode::Merged, |_| Ok(()))
            .map(|_| ())
    }

    fn nested<F>(
        &mut self,
        description: Description,
        tags: Tags,
        site: CallSite,
        body: F,
    ) -> Result<NodeId, DefinitionError>
    where
        F: FnOnce(&mut GroupBuilder<'_>) -> Result<(), DefinitionError>,
    {
        let id = self
            .world
            .add_group(Some(self.id), description, tags, site)?;
        self.world.build(id, body)?;
        Ok(id)
    }

    fn include<F>(
        &mut self,
        name: &str,
        args: Vec<Value>,
        site: CallSite,
        mode: InclusionMode,
        customize: F,
    ) -> Result<NodeId, DefinitionError>
    where
        F: FnOnce(&mut GroupBuilder<'_>) -> Result<(), DefinitionError>,
    {
        let lineage = self.world.tree().lineage(self.id);
        let shared = self.world.shared_groups().lookup(&lineage, name)?;

        let key = InclusionSite {
            target: self.id,
            name: Cow::Owned(name.to_string()),
            site: site.clone(),
            mode,
        };
        if let Some(included) = self.world.shared_groups().cached(&key) {
            log::trace!(target: "kispec", "reusing shared examples {name:?} included at {site}");
            return Ok(included);
        }

        let args = shared.bind(args)?;
        let target = match mode {
            InclusionMode::Nested => self.world.add_group(
                Some(self.id),
                Description::from(format!("behaves like {name}")),
                Tags::new(),
                site,
            )?,
            InclusionMode::Merged => self.id,
        };
        log::trace!(
            target: "kispec",
            "including shared examples {name:?} defined at {}",
            shared.site()
        );

        let body = shared.body();
        self.world.build(target, |builder| {
            (*body)(builder, &args)?;
            customize(builder)
        })?;
        self.world.shared_mut().remember(key, target);
        Ok(target)
    }

    fn add_hook<F, T>(
        &mut self,
        phase: HookPhase,
        scope: impl IntoHookScope,
        conditions: FilterRules,
        body: F,
        site: CallSite,
    ) -> Result<(), DefinitionError>
    where
        F: Fn(&mut Context<'_>) -> T + 'static,
        T: Into<BodyResult>,
    {
        let scope = scope.into_hook_scope()?;
        self.world.with_tree_mut(|tree| {
            tree.group_mut(self.id)
                .expect("builder group exists")
                .hooks
                .add(HookOwner::Group, phase, scope, hook(body, conditions, site))
        })
    }

    fn add_around<F, T>(
        &mut self,
        scope: impl IntoHookScope,
        conditions: FilterRules,
        body: F,
        site: CallSite,
    ) -> Result<(), DefinitionError>
    where
        F: Fn(&mut Context<'_>, Proceed<'_>) -> T + 'static,
        T: Into<BodyResult>,
    {
        let scope = scope.into_hook_scope()?;
        self.world.with_tree_mut(|tree| {
            tree.group_mut(self.id)
                .expect("builder group exists")
                .hooks
                .add_around(scope, around_hook(body, conditions, site))
        })
    }
}

/// `tags` with `key` set to `true` unless a reason was given already.
fn default_tag(mut tags: Tags, key: &'static str) -> Tags {
    if !tags.contains(key) {
        tags.insert(key, true);
    }
    tags
}
