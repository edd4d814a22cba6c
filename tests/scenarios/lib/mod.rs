use std::{cell::RefCell, rc::Rc};

use kispec::{Configuration, Context, World, diagnostics::CollectDiagnostics};

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

    pub fn hook(&self, label: &'static str) -> impl Fn(&mut Context<'_>) + 'static {
        let trace = self.clone();
        move |_: &mut Context<'_>| trace.push(label)
    }
}

/// A world with collected diagnostics.
pub fn world(config: Configuration) -> (World, CollectDiagnostics) {
    let diagnostics = CollectDiagnostics::new();
    let world = World::new(config.with_diagnostics(diagnostics.clone()));
    (world, diagnostics)
}
