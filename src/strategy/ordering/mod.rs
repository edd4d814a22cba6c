//! Ordering of sibling nodes.
//!
//! Every group orders its own cases and its own child groups right before
//! running them. Which strategy a group uses is decided by its `order` tag,
//! which is inherited like any other tag, so a whole subtree can be switched to
//! random order from its root. Groups without the tag use the `global`
//! strategy, and so does the list of top level groups.
//!
//! Strategies only ever permute the slice they are handed. They cannot add or
//! drop nodes.
//!
//! Implement [`OrderingStrategy`] (or pass a closure) and register it in the
//! [`OrderingRegistry`] to add a custom order.

use std::{fmt::Debug, rc::Rc};

use indexmap::IndexMap;

use crate::{
    diagnostics::Diagnostics,
    metadata::{Metadata, ORDER_TAG, Tag},
    tree::NodeId,
};

mod defined;
pub use defined::*;

mod random;
pub use random::*;

pub const DEFINED: &str = "defined";
pub const RANDOM: &str = "random";
pub const GLOBAL: &str = "global";

/// A node handed to an [`OrderingStrategy`].
#[derive(Debug, Clone, Copy)]
pub struct OrderItem<'m> {
    pub id: NodeId,
    pub metadata: &'m Metadata,
}

/// A strategy for ordering the siblings on one nesting level.
pub trait OrderingStrategy {
    /// Reorder `items` in place.
    ///
    /// `seed` is the seed of the current run. Strategies that are not random
    /// can ignore it.
    fn order(&self, items: &mut [OrderItem<'_>], seed: u64);
}

impl<F> OrderingStrategy for F
where
    F: Fn(&mut [OrderItem<'_>]),
{
    fn order(&self, items: &mut [OrderItem<'_>], _: u64) {
        self(items)
    }
}

/// Named ordering strategies plus the seed random strategies use.
///
/// A new registry knows `defined`, `random` and `global`, with `global`
/// being the defined order.
#[derive(Clone)]
pub struct OrderingRegistry {
    strategies: IndexMap<Tag, Rc<dyn OrderingStrategy>>,
    seed: u64,
}

impl Debug for OrderingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderingRegistry")
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .field("seed", &self.seed)
            .finish()
    }
}

impl Default for OrderingRegistry {
    fn default() -> Self {
        let defined: Rc<dyn OrderingStrategy> = Rc::new(DefinedOrdering);
        let mut strategies = IndexMap::new();
        strategies.insert(Tag::from(DEFINED), Rc::clone(&defined));
        strategies.insert(Tag::from(RANDOM), Rc::new(RandomOrdering) as Rc<dyn OrderingStrategy>);
        strategies.insert(Tag::from(GLOBAL), defined);
        Self {
            strategies,
            seed: rand::random(),
        }
    }
}

impl OrderingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy, replacing one with the same name.
    ///
    /// Registering under `global` replaces the default order.
    pub fn register(
        &mut self,
        name: impl Into<Tag>,
        strategy: impl OrderingStrategy + 'static,
    ) -> &mut Self {
        self.strategies.insert(name.into(), Rc::new(strategy));
        self
    }

    pub fn with_strategy(
        mut self,
        name: impl Into<Tag>,
        strategy: impl OrderingStrategy + 'static,
    ) -> Self {
        self.register(name, strategy);
        self
    }

    /// Make the strategy registered as `name` the global one.
    ///
    /// Returns `false` and changes nothing if `name` is unknown.
    pub fn set_global(&mut self, name: &str) -> bool {
        match self.strategies.get(name).cloned() {
            Some(strategy) => {
                self.strategies.insert(Tag::from(GLOBAL), strategy);
                true
            }
            None => false,
        }
    }

    pub fn with_global(mut self, name: &str) -> Self {
        self.set_global(name);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn set_seed(&mut self, seed: u64) -> &mut Self {
        self.seed = seed;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fetch(&self, name: &str) -> Option<Rc<dyn OrderingStrategy>> {
        self.strategies.get(name).cloned()
    }

    pub fn global(&self) -> Rc<dyn OrderingStrategy> {
        self.fetch(GLOBAL)
            .unwrap_or_else(|| Rc::new(DefinedOrdering))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(|name| name.as_ref())
    }

    /// The strategy for a group, by its `order` tag.
    ///
    /// An `order` tag naming an unregistered strategy falls back to the
    /// global one and is reported to `diagnostics` with the group's location.
    pub fn resolve(
        &self,
        metadata: &Metadata,
        diagnostics: &dyn Diagnostics,
    ) -> Rc<dyn OrderingStrategy> {
        let Some(value) = metadata.tag(ORDER_TAG) else {
            return self.global();
        };
        if let Some(strategy) = value.text().and_then(|name| self.fetch(&name)) {
            return strategy;
        }
        diagnostics.warn(&format!(
            "Ignoring unrecognized ordering {value} for the group defined at {}, \
             falling back to the global ordering",
            metadata.location()
        ));
        self.global()
    }

    /// Order `items` with `strategy` and this registry's seed.
    pub fn apply(&self, strategy: &dyn OrderingStrategy, items: &mut [OrderItem<'_>]) {
        strategy.order(items, self.seed);
    }
}
