use std::{cell::RefCell, rc::Rc};

use crate::{
    Configuration, Context, World,
    diagnostics::CollectDiagnostics,
    metadata::{CallSite, Definition, Description, Metadata, Tags},
};

/// Metadata of a top level group defined at `tests/defs.rs:10`.
pub fn metadata(description: impl Into<Description>, tags: Tags) -> Metadata {
    let definition = Definition {
        description: description.into(),
        tags,
        site: CallSite::parse("tests/defs.rs:10").expect("site is valid"),
        scoped_id: String::from("1"),
        has_block: true,
    };
    Metadata::group(None, definition).expect("test metadata is valid")
}

/// A world whose diagnostics are collected instead of logged.
pub fn world(config: Configuration) -> (World, CollectDiagnostics) {
    let diagnostics = CollectDiagnostics::new();
    let world = World::new(config.with_diagnostics(diagnostics.clone()));
    (world, diagnostics)
}

/// Records what hooks and bodies ran, in order.
#[derive(Debug, Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<String>>>);

impl Trace {
    pub fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn take(&self) -> Vec<String> {
        self.0.take()
    }

    /// A hook or body that only records `label`.
    pub fn hook(&self, label: &'static str) -> impl Fn(&mut Context<'_>) + 'static {
        let trace = self.clone();
        move |_: &mut Context<'_>| trace.push(label)
    }
}

macro_rules! nonzero {
    (0) => {
        compile_error!("0 is zero")
    };

    ($value:literal) => {
        std::convert::TryFrom::try_from($value).unwrap()
    };
}

pub(crate) use nonzero;
