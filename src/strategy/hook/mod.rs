//! Setup and teardown hooks.
//!
//! Hooks are registered with a scope and a phase:
//!
//! - [`HookScope::Case`] hooks run around every single case below the group
//!   they are registered on.
//! - [`HookScope::Group`] hooks run once around all cases of their group,
//!   before the first and after the last one.
//! - [`HookScope::Run`] hooks run once around the whole run and can only be
//!   registered on the [`Configuration`](crate::Configuration).
//!
//! Before hooks run outermost group first, each group's hooks in registration
//! order. After hooks run innermost group first, each group's hooks in reverse
//! registration order. Around hooks exist for the case scope only and wrap the
//! case's before hooks, its body and its after hooks.

use std::{fmt::Display, str::FromStr};

use crate::{
    body::BodyResult, error::DefinitionError, filter::FilterRules, metadata::{CallSite, Metadata},
    runner::Context,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookScope {
    Case,
    Group,
    Run,
}

impl HookScope {
    /// Accepted spellings for each scope.
    pub const ALIASES: &'static [(&'static str, HookScope)] = &[
        ("each", HookScope::Case),
        ("example", HookScope::Case),
        ("case", HookScope::Case),
        ("all", HookScope::Group),
        ("context", HookScope::Group),
        ("group", HookScope::Group),
        ("suite", HookScope::Run),
        ("run", HookScope::Run),
    ];

    fn index(self) -> usize {
        match self {
            HookScope::Case => 0,
            HookScope::Group => 1,
            HookScope::Run => 2,
        }
    }
}

impl Display for HookScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HookScope::Case => "case",
            HookScope::Group => "group",
            HookScope::Run => "run",
        })
    }
}

impl FromStr for HookScope {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix(':').unwrap_or(s);
        Self::ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, scope)| *scope)
            .ok_or_else(|| DefinitionError::UnknownHookScope(s.to_string()))
    }
}

/// Anything that names a hook scope, a [`HookScope`] or one of its aliases.
pub trait IntoHookScope {
    fn into_hook_scope(self) -> Result<HookScope, DefinitionError>;
}

impl IntoHookScope for HookScope {
    fn into_hook_scope(self) -> Result<HookScope, DefinitionError> {
        Ok(self)
    }
}

impl IntoHookScope for &str {
    fn into_hook_scope(self) -> Result<HookScope, DefinitionError> {
        self.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
    Around,
}

impl Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HookPhase::Before => "before",
            HookPhase::After => "after",
            HookPhase::Around => "around",
        })
    }
}

pub type HookFn = Box<dyn Fn(&mut Context<'_>) -> BodyResult>;
pub type AroundFn = Box<dyn Fn(&mut Context<'_>, Proceed<'_>) -> BodyResult>;

/// Continue with the rest of an around chain.
///
/// Handed to around hooks. Calling [`run`](Self::run) runs the inner around
/// hooks, the before hooks, the case body and the after hooks. An around hook
/// that drops it without calling `run` keeps the case from running at all.
pub struct Proceed<'p> {
    inner: &'p mut dyn FnMut(&mut Context<'_>),
}

impl<'p> Proceed<'p> {
    pub(crate) fn new(inner: &'p mut dyn FnMut(&mut Context<'_>)) -> Self {
        Self { inner }
    }

    pub fn run(self, ctx: &mut Context<'_>) {
        (self.inner)(ctx)
    }
}

pub struct Hook<F> {
    pub(crate) body: F,
    pub(crate) conditions: FilterRules,
    pub(crate) site: CallSite,
}

impl<F> Hook<F> {
    pub fn site(&self) -> &CallSite {
        &self.site
    }

    pub fn conditions(&self) -> &FilterRules {
        &self.conditions
    }

    /// Whether the hook applies to a node with this metadata.
    pub fn applies_to(&self, metadata: &Metadata) -> bool {
        self.conditions.all_apply(metadata)
    }
}

impl<F> std::fmt::Debug for Hook<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook")
            .field("conditions", &self.conditions)
            .field("site", &self.site)
            .finish_non_exhaustive()
    }
}

pub(crate) fn hook<F, T>(body: F, conditions: FilterRules, site: CallSite) -> Hook<HookFn>
where
    F: Fn(&mut Context<'_>) -> T + 'static,
    T: Into<BodyResult>,
{
    Hook {
        body: Box::new(move |ctx| body(ctx).into()),
        conditions,
        site,
    }
}

pub(crate) fn around_hook<F, T>(body: F, conditions: FilterRules, site: CallSite) -> Hook<AroundFn>
where
    F: Fn(&mut Context<'_>, Proceed<'_>) -> T + 'static,
    T: Into<BodyResult>,
{
    Hook {
        body: Box::new(move |ctx, proceed| body(ctx, proceed).into()),
        conditions,
        site,
    }
}

/// Where hooks are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HookOwner {
    Configuration,
    Group,
}

/// The hooks registered on one group or on the configuration.
#[derive(Debug, Default)]
pub struct HookSet {
    before: [Vec<Hook<HookFn>>; 3],
    after: [Vec<Hook<HookFn>>; 3],
    around: Vec<Hook<AroundFn>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(owner: HookOwner, scope: HookScope) -> Result<(), DefinitionError> {
        match (owner, scope) {
            (HookOwner::Group, HookScope::Run) => {
                Err(DefinitionError::RunScopeOutsideConfiguration { scope })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn add(
        &mut self,
        owner: HookOwner,
        phase: HookPhase,
        scope: HookScope,
        hook: Hook<HookFn>,
    ) -> Result<(), DefinitionError> {
        Self::check(owner, scope)?;
        let hooks = match phase {
            HookPhase::Before => &mut self.before[scope.index()],
            HookPhase::After => &mut self.after[scope.index()],
            HookPhase::Around => return Err(DefinitionError::UnsupportedAroundScope { scope }),
        };
        log::trace!(target: "kispec", "registered {phase}(:{scope}) hook at {}", hook.site);
        hooks.push(hook);
        Ok(())
    }

    pub(crate) fn add_around(
        &mut self,
        scope: HookScope,
        hook: Hook<AroundFn>,
    ) -> Result<(), DefinitionError> {
        if scope != HookScope::Case {
            return Err(DefinitionError::UnsupportedAroundScope { scope });
        }
        log::trace!(target: "kispec", "registered around(:{scope}) hook at {}", hook.site);
        self.around.push(hook);
        Ok(())
    }

    /// Before hooks of `scope`, in registration order.
    pub fn before(&self, scope: HookScope) -> &[Hook<HookFn>] {
        &self.before[scope.index()]
    }

    /// After hooks of `scope`, in registration order.
    pub fn after(&self, scope: HookScope) -> &[Hook<HookFn>] {
        &self.after[scope.index()]
    }

    pub fn around(&self) -> &[Hook<AroundFn>] {
        &self.around
    }

    pub fn is_empty(&self) -> bool {
        self.before.iter().chain(&self.after).all(Vec::is_empty) && self.around.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Hook<HookFn> {
        hook(|_: &mut Context<'_>| {}, FilterRules::new(), CallSite::caller())
    }

    #[test]
    fn aliases_resolve_to_scopes() {
        for (alias, scope) in [
            ("each", HookScope::Case),
            ("example", HookScope::Case),
            (":all", HookScope::Group),
            ("context", HookScope::Group),
            ("suite", HookScope::Run),
        ] {
            assert_eq!(alias.into_hook_scope(), Ok(scope));
        }
        assert_eq!(
            "everything".into_hook_scope(),
            Err(DefinitionError::UnknownHookScope("everything".into()))
        );
    }

    #[test]
    fn run_scope_is_configuration_only() {
        let mut hooks = HookSet::new();
        assert_eq!(
            hooks.add(HookOwner::Group, HookPhase::Before, HookScope::Run, noop()),
            Err(DefinitionError::RunScopeOutsideConfiguration {
                scope: HookScope::Run
            })
        );
        assert!(
            hooks
                .add(HookOwner::Configuration, HookPhase::After, HookScope::Run, noop())
                .is_ok()
        );
        assert_eq!(hooks.after(HookScope::Run).len(), 1);
        assert!(hooks.before(HookScope::Run).is_empty());
    }

    #[test]
    fn around_is_case_scope_only() {
        let mut hooks = HookSet::new();
        let around = || {
            around_hook(
                |ctx: &mut Context<'_>, proceed: Proceed<'_>| proceed.run(ctx),
                FilterRules::new(),
                CallSite::caller(),
            )
        };
        assert_eq!(
            hooks.add_around(HookScope::Group, around()),
            Err(DefinitionError::UnsupportedAroundScope {
                scope: HookScope::Group
            })
        );
        assert!(hooks.add_around(HookScope::Case, around()).is_ok());
        assert_eq!(hooks.around().len(), 1);
    }
}
