//! The world: the group tree, the shared groups and the configuration of one
//! suite.
//!
//! Groups are defined through the world and the [`GroupBuilder`] it hands to
//! each group body. Top level groups are the only isolated roots: a body that
//! calls back into the world to define another top level group gets
//! [`DefinitionError::NestedIsolatedRoot`].

use std::{
    cell::{Cell, Ref, RefCell},
    fmt::Debug,
    rc::Rc,
};

use crate::{
    config::Configuration,
    error::DefinitionError,
    metadata::{CallSite, Definition, Description, Metadata, SKIP_TAG, FOCUS_TAG, Tag, Tags},
    body::CaseFn,
    outcome::ExecutionResult,
    reporter::Reporter,
    runner,
    shared::{SharedArgs, SharedGroups},
    tree::{NodeId, Tree},
};

mod builder;
pub use builder::GroupBuilder;

pub(crate) const XDESCRIBE_REASON: &str = "Temporarily skipped with xdescribe";

/// Counts nested definition bodies, decremented again on drop.
struct DefiningGuard<'w>(&'w Cell<usize>);

impl<'w> DefiningGuard<'w> {
    fn enter(depth: &'w Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DefiningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

struct RunningGuard<'w>(&'w Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[derive(Default)]
pub struct World {
    tree: RefCell<Tree>,
    shared: RefCell<SharedGroups>,
    config: Configuration,
    defining: Cell<usize>,
    running: Cell<bool>,
    stop: Cell<bool>,
}

impl Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("tree", &self.tree)
            .field("shared", &self.shared)
            .field("config", &self.config)
            .field("stop", &self.stop)
            .finish_non_exhaustive()
    }
}

impl World {
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn configuration_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    /// Define a top level group.
    #[track_caller]
    pub fn describe<F>(
        &self,
        description: impl Into<Description>,
        tags: impl Into<Tags>,
        body: F,
    ) -> Result<NodeId, DefinitionError>
    where
        F: FnOnce(&mut GroupBuilder<'_>) -> Result<(), DefinitionError>,
    {
        let site = CallSite::caller();
        self.define_root(description.into(), tags.into(), site, body)
    }

    /// Alias of [`describe`](Self::describe).
    #[track_caller]
    pub fn context<F>(
        &self,
        description: impl Into<Description>,
        tags: impl Into<Tags>,
        body: F,
    ) -> Result<NodeId, DefinitionError>
    where
        F: FnOnce(&mut GroupBuilder<'_>) -> Result<(), DefinitionError>,
    {
        let site = CallSite::caller();
        self.define_root(description.into(), tags.into(), site, body)
    }

    /// A top level group tagged `focus`.
    #[track_caller]
    pub fn fdescribe<F>(
        &self,
        description: impl Into<Description>,
        tags: impl Into<Tags>,
        body: F,
    ) -> Result<NodeId, DefinitionError>
    where
        F: FnOnce(&mut GroupBuilder<'_>) -> Result<(), DefinitionError>,
    {
        let site = CallSite::caller();
        let tags = tags.into().with(FOCUS_TAG, true);
        self.define_root(description.into(), tags, site, body)
    }

    /// A top level group whose cases are all skipped.
    #[track_caller]
    pub fn xdescribe<F>(
        &self,
        description: impl Into<Description>,
        tags: impl Into<Tags>,
        body: F,
    ) -> Result<NodeId, DefinitionError>
    where
        F: FnOnce(&mut GroupBuilder<'_>) -> Result<(), DefinitionError>,
    {
        let site = CallSite::caller();
        let tags = tags.into().with(SKIP_TAG, XDESCRIBE_REASON);
        self.define_root(description.into(), tags, site, body)
    }

    /// Define shared examples visible to every group.
    #[track_caller]
    pub fn shared_examples<F>(
        &self,
        name: impl Into<Tag>,
        params: &[&'static str],
        body: F,
    ) -> Result<(), DefinitionError>
    where
        F: Fn(&mut GroupBuilder<'_>, &SharedArgs) -> Result<(), DefinitionError> + 'static,
    {
        let site = CallSite::caller();
        self.check_definable()?;
        if self.defining.get() > 0 {
            return Err(DefinitionError::NestedIsolatedRoot {
                what: "shared group",
            });
        }
        self.shared.borrow_mut().define(
            None,
            name.into(),
            params.iter().map(|param| Tag::from(*param)).collect(),
            Rc::new(body),
            site,
        )
    }

    pub fn tree(&self) -> Ref<'_, Tree> {
        self.tree.borrow()
    }

    pub fn shared_groups(&self) -> Ref<'_, SharedGroups> {
        self.shared.borrow()
    }

    /// The result of a case, `None` for groups and unknown ids.
    pub fn result(&self, id: NodeId) -> Option<ExecutionResult> {
        self.tree.borrow().case(id).map(|case| case.result().clone())
    }

    /// Ask a running suite to stop, see [`Context::request_stop`](crate::Context::request_stop).
    pub fn request_stop(&self) {
        self.stop.set(true);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.get()
    }

    /// Run every selected case.
    ///
    /// Returns `true` if nothing failed and the run was not stopped early.
    /// Running again replaces the results of the previous run.
    pub fn run(&self, mut reporter: impl Reporter) -> bool {
        if self.running.replace(true) {
            log::warn!(target: "kispec", "the suite is already running");
            return false;
        }
        let _running = RunningGuard(&self.running);
        self.stop.set(false);

        let tree = self.tree.borrow();
        runner::run(&tree, &self.config, &self.stop, &mut reporter)
    }

    fn check_definable(&self) -> Result<(), DefinitionError> {
        match self.running.get() {
            true => Err(DefinitionError::DefinedWhileRunning),
            false => Ok(()),
        }
    }

    fn define_root<F>(
        &self,
        description: Description,
        tags: Tags,
        site: CallSite,
        body: F,
    ) -> Result<NodeId, DefinitionError>
    where
        F: FnOnce(&mut GroupBuilder<'_>) -> Result<(), DefinitionError>,
    {
        self.check_definable()?;
        if self.defining.get() > 0 {
            return Err(DefinitionError::NestedIsolatedRoot { what: "group" });
        }
        let id = self.add_group(None, description, tags, site)?;
        self.build(id, body)?;
        Ok(id)
    }

    /// Evaluate a group body against `id`.
    pub(crate) fn build<F, R>(&self, id: NodeId, body: F) -> Result<R, DefinitionError>
    where
        F: FnOnce(&mut GroupBuilder<'_>) -> Result<R, DefinitionError>,
    {
        let _defining = DefiningGuard::enter(&self.defining);
        body(&mut GroupBuilder::new(self, id))
    }

    pub(crate) fn add_group(
        &self,
        parent: Option<NodeId>,
        description: Description,
        tags: Tags,
        site: CallSite,
    ) -> Result<NodeId, DefinitionError> {
        self.check_definable()?;
        let mut tree = self.tree.borrow_mut();
        let definition = Definition {
            description,
            tags,
            site,
            scoped_id: tree.next_scoped_id(parent),
            has_block: true,
        };
        let metadata = Metadata::group(parent.and_then(|parent| tree.metadata(parent)), definition)?;
        log::trace!(
            target: "kispec",
            "defined group {:?} at {}",
            metadata.full_description(),
            metadata.location()
        );
        Ok(tree.add_group(parent, metadata))
    }

    pub(crate) fn add_case(
        &self,
        group: NodeId,
        description: Description,
        tags: Tags,
        site: CallSite,
        body: Option<CaseFn>,
    ) -> Result<NodeId, DefinitionError> {
        self.check_definable()?;
        let mut tree = self.tree.borrow_mut();
        let definition = Definition {
            description,
            tags,
            site,
            scoped_id: tree.next_scoped_id(Some(group)),
            has_block: body.is_some(),
        };
        let parent = tree.metadata(group).expect("builder group exists");
        let metadata = Metadata::case(parent, definition)?;
        log::trace!(
            target: "kispec",
            "defined case {:?} at {}",
            metadata.full_description(),
            metadata.location()
        );
        Ok(tree.add_case(group, metadata, body))
    }

    pub(crate) fn with_tree_mut<R>(&self, f: impl FnOnce(&mut Tree) -> R) -> R {
        f(&mut self.tree.borrow_mut())
    }

    pub(crate) fn shared_mut(&self) -> std::cell::RefMut<'_, SharedGroups> {
        self.shared.borrow_mut()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{metadata::Value, reporter::RecordingReporter, tags};

    #[test]
    fn top_level_groups_cannot_nest() {
        let world = World::default();
        let result = world.describe("outer", (), |_| {
            world.describe("inner", (), |_| Ok(()))?;
            Ok(())
        });
        assert_eq!(
            result,
            Err(DefinitionError::NestedIsolatedRoot { what: "group" })
        );

        let result = world.describe("outer", (), |_| {
            world.shared_examples("late", &[], |_, _| Ok(()))
        });
        assert_eq!(
            result,
            Err(DefinitionError::NestedIsolatedRoot {
                what: "shared group"
            })
        );

        // the guard is released again
        assert!(world.describe("after", (), |_| Ok(())).is_ok());
    }

    #[test]
    fn focused_and_skipped_roots_tag_their_groups() {
        let world = World::default();
        let focused = world.fdescribe("focused", (), |_| Ok(())).unwrap();
        let skipped = world.xdescribe("skipped", tags!(slow), |_| Ok(())).unwrap();

        let tree = world.tree();
        assert!(tree.metadata(focused).unwrap().is_focused());
        let skipped = tree.metadata(skipped).unwrap();
        assert_eq!(skipped.skip_reason().as_deref(), Some(XDESCRIBE_REASON));
        assert_eq!(skipped.tag("slow"), Some(&Value::Bool(true)));
    }

    #[test]
    fn reserved_keys_fail_the_definition() {
        let world = World::default();
        assert_eq!(
            world.describe("group", tags!(location = "here"), |_| Ok(())),
            Err(DefinitionError::ReservedKey {
                key: "location".into()
            })
        );
        assert!(world.tree().is_empty());
    }

    #[test]
    fn runs_record_results() {
        let world = World::default();
        let mut case = None;
        world
            .describe("group", (), |g| {
                case = Some(g.it("works", (), |_| {})?);
                Ok(())
            })
            .unwrap();
        let case = case.unwrap();

        assert!(!world.result(case).unwrap().ran());
        let mut reporter = RecordingReporter::default();
        assert!(world.run(&mut reporter));
        assert!(world.result(case).unwrap().passed());
        assert_eq!(reporter.finished().count(), 1);
    }
}
