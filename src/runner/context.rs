use std::{
    any::Any,
    borrow::Cow,
    cell::Cell,
    fmt::Debug,
    panic,
};

use indexmap::IndexMap;

use crate::{
    metadata::{Metadata, Subject, Tag},
    runner::panic::SkipSignal,
};

/// A value stored in the group [`State`].
///
/// Anything `Clone + Debug + 'static` qualifies.
pub trait Slot: Any + Debug {
    fn clone_slot(&self) -> Box<dyn Slot>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> Slot for T
where
    T: Any + Clone + Debug,
{
    fn clone_slot(&self) -> Box<dyn Slot> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Clone for Box<dyn Slot> {
    fn clone(&self) -> Self {
        (**self).clone_slot()
    }
}

/// Named values shared from group hooks down to cases.
///
/// A group starts from a copy of its parent's state, its group before hooks
/// fill it in, and every case and child group gets its own copy. Writes made
/// by a case never reach its siblings, and the state is dropped once the
/// group's after hooks are done.
#[derive(Debug, Clone, Default)]
pub struct State(IndexMap<Tag, Box<dyn Slot>>);

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Any + Clone + Debug>(&mut self, key: impl Into<Tag>, value: T) {
        self.0.insert(key.into(), Box::new(value));
    }

    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        (**self.0.get(key)?).as_any().downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        (**self.0.get_mut(key)?).as_any_mut().downcast_mut()
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.0.shift_remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|key| key.as_ref())
    }
}

/// What bodies and hooks get to work with.
pub struct Context<'c> {
    state: &'c mut State,
    metadata: Option<&'c Metadata>,
    stop: &'c Cell<bool>,
    pub(crate) pending: Option<Cow<'static, str>>,
}

impl<'c> Context<'c> {
    pub(crate) fn new(
        state: &'c mut State,
        metadata: Option<&'c Metadata>,
        stop: &'c Cell<bool>,
    ) -> Self {
        Self {
            state,
            metadata,
            stop,
            pending: None,
        }
    }

    pub fn set<T: Any + Clone + Debug>(&mut self, key: impl Into<Tag>, value: T) {
        self.state.set(key, value)
    }

    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.state.get(key)
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.state.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.state.remove(key)
    }

    pub fn state(&self) -> &State {
        &*self.state
    }

    /// Metadata of the running case or group, `None` in run hooks.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata
    }

    pub fn described(&self) -> Option<&Subject> {
        self.metadata?.described()
    }

    /// Mark the running case as pending.
    ///
    /// The body keeps running. If it fails afterwards the case is pending, if
    /// it passes the case fails for not failing. Only cases can be pending:
    /// called from a group or run hook this has no effect, use
    /// [`Context::skip`] there instead.
    pub fn pending(&mut self, reason: impl Into<Cow<'static, str>>) {
        self.pending = Some(reason.into());
    }

    /// Stop the running body or hook right here and skip the case.
    ///
    /// Called from a group before hook, every case of the group is skipped.
    pub fn skip(&self, reason: impl Into<Cow<'static, str>>) -> ! {
        panic::resume_unwind(Box::new(SkipSignal(reason.into())))
    }

    /// Ask the run to stop after the current case.
    pub fn request_stop(&self) {
        self.stop.set(true);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.get()
    }
}

impl Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("state", &self.state)
            .field(
                "metadata",
                &self.metadata.map(Metadata::full_description),
            )
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
