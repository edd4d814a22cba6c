pub mod diagnostics;
pub mod error;
pub mod metadata;
pub mod outcome;
pub mod reporter;
pub mod tree;

mod strategy;
pub use strategy::*;

mod body;
pub use body::*;

mod config;
pub use config::*;

mod runner;
pub use runner::{Context, Slot, State};

mod shared;
pub use shared::*;

mod world;
pub use world::*;

pub mod prelude {
    pub use crate::{
        BodyResult, Configuration, Context, GroupBuilder, World,
        error::DefinitionError,
        filter::{FilterManager, FilterRules, Matcher},
        hook::{HookScope, Proceed},
        metadata::{Description, Subject, Tags, Value},
        ordering::OrderingRegistry,
        outcome::{ExecutionResult, Status},
        tags,
        tree::NodeId,
    };
}

#[cfg(test)]
mod test_support;
