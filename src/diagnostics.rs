//! The warning channel.
//!
//! Some things are worth telling the user about but are not failures of any
//! case: an `order` tag naming a strategy nobody registered, errors raised by
//! after hooks, inclusion rules that filtered out everything. These go through
//! a [`Diagnostics`] sink, which by default forwards to the [`log`] facade.

use std::{cell::RefCell, rc::Rc};

/// A sink for warnings.
pub trait Diagnostics {
    fn warn(&self, message: &str);
}

impl<F> Diagnostics for F
where
    F: Fn(&str),
{
    fn warn(&self, message: &str) {
        self(message)
    }
}

/// Forward warnings to [`log::warn!`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn warn(&self, message: &str) {
        log::warn!(target: "kispec", "{message}");
    }
}

/// Keep warnings in memory.
///
/// Clones share the same buffer, so a clone can be handed to the
/// configuration while the original is kept to read the messages back.
#[derive(Debug, Default, Clone)]
pub struct CollectDiagnostics(Rc<RefCell<Vec<String>>>);

impl CollectDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn take(&self) -> Vec<String> {
        self.0.take()
    }
}

impl Diagnostics for CollectDiagnostics {
    fn warn(&self, message: &str) {
        log::debug!(target: "kispec", "collected warning: {message}");
        self.0.borrow_mut().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn closures_are_sinks() {
        let count = Cell::new(0);
        let sink = |_: &str| count.set(count.get() + 1);
        sink.warn("one");
        sink.warn("two");
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn collected_messages_are_shared_between_clones() {
        let diagnostics = CollectDiagnostics::new();
        let handle = diagnostics.clone();
        handle.warn("first");
        diagnostics.warn("second");
        assert_eq!(diagnostics.take(), ["first", "second"]);
        assert!(handle.messages().is_empty());
    }
}
