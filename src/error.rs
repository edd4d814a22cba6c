use std::borrow::Cow;

use thiserror::Error;

use crate::strategy::hook::HookScope;

/// Errors raised while defining groups, cases, hooks and shared groups.
///
/// These are structural mistakes in the suite definition. They are returned
/// right away from the definition call and are never caught by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DefinitionError {
    #[error(":{key} is not allowed as user metadata, it is computed by kispec")]
    ReservedKey { key: Cow<'static, str> },

    #[error("Could not find shared examples {name:?}")]
    SharedGroupNotFound { name: Cow<'static, str> },

    #[error("shared examples {name:?} are already defined in this scope")]
    DuplicateSharedGroup { name: Cow<'static, str> },

    #[error("shared examples {name:?} take {expected} parameter(s) but {got} were given")]
    SharedGroupArity {
        name: Cow<'static, str>,
        expected: usize,
        got: usize,
    },

    #[error("defining an isolated {what} inside another group definition is not allowed")]
    NestedIsolatedRoot { what: &'static str },

    #[error("around hooks are only supported for the case scope, not `{scope}`")]
    UnsupportedAroundScope { scope: HookScope },

    #[error("`{scope}` hooks can only be registered on the configuration")]
    RunScopeOutsideConfiguration { scope: HookScope },

    #[error("unknown hook scope {0:?}")]
    UnknownHookScope(String),

    #[error("groups cannot be defined while the suite is running")]
    DefinedWhileRunning,
}
