use std::{fmt::Debug, num::NonZeroUsize};

use crate::{
    body::BodyResult,
    diagnostics::{Diagnostics, LogDiagnostics},
    error::DefinitionError,
    filter::{FilterManager, FilterRules},
    hook::{HookOwner, HookPhase, HookSet, IntoHookScope, Proceed, around_hook, hook},
    metadata::CallSite,
    ordering::OrderingRegistry,
    runner::Context,
};

/// Everything a run takes from outside the group tree.
///
/// Built in code, the crate never reads files, environment variables or
/// command line flags itself. Filter rules coming from several sources can
/// be combined with [`FilterManager::merge`] before they end up here.
#[non_exhaustive]
pub struct Configuration {
    pub filter: FilterManager,
    pub ordering: OrderingRegistry,
    pub hooks: HookSet,
    /// Stop after this many failed cases.
    pub fail_fast: Option<NonZeroUsize>,
    pub diagnostics: Box<dyn Diagnostics>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            filter: FilterManager::default(),
            ordering: OrderingRegistry::default(),
            hooks: HookSet::default(),
            fail_fast: None,
            diagnostics: Box::new(LogDiagnostics),
        }
    }
}

impl Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("filter", &self.filter)
            .field("ordering", &self.ordering)
            .field("hooks", &self.hooks)
            .field("fail_fast", &self.fail_fast)
            .finish_non_exhaustive()
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(self, filter: FilterManager) -> Self {
        Self { filter, ..self }
    }

    pub fn with_ordering(self, ordering: OrderingRegistry) -> Self {
        Self { ordering, ..self }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.ordering.set_seed(seed);
        self
    }

    pub fn with_fail_fast(self, limit: NonZeroUsize) -> Self {
        Self {
            fail_fast: Some(limit),
            ..self
        }
    }

    pub fn with_run_all_when_everything_filtered(mut self, run_all: bool) -> Self {
        self.filter = self.filter.with_run_all_when_everything_filtered(run_all);
        self
    }

    pub fn with_diagnostics(self, diagnostics: impl Diagnostics + 'static) -> Self {
        Self {
            diagnostics: Box::new(diagnostics),
            ..self
        }
    }

    /// Register a before hook for every case, every top level group or the
    /// whole run.
    #[track_caller]
    pub fn before<F, T>(&mut self, scope: impl IntoHookScope, body: F) -> Result<(), DefinitionError>
    where
        F: Fn(&mut Context<'_>) -> T + 'static,
        T: Into<BodyResult>,
    {
        let site = CallSite::caller();
        self.add(HookPhase::Before, scope, FilterRules::new(), body, site)
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
        self.add(HookPhase::Before, scope, conditions.into(), body, site)
    }

    #[track_caller]
    pub fn after<F, T>(&mut self, scope: impl IntoHookScope, body: F) -> Result<(), DefinitionError>
    where
        F: Fn(&mut Context<'_>) -> T + 'static,
        T: Into<BodyResult>,
    {
        let site = CallSite::caller();
        self.add(HookPhase::After, scope, FilterRules::new(), body, site)
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
        self.add(HookPhase::After, scope, conditions.into(), body, site)
    }

    /// Register an around hook, only the case scope is supported.
    #[track_caller]
    pub fn around<F, T>(&mut self, scope: impl IntoHookScope, body: F) -> Result<(), DefinitionError>
    where
        F: Fn(&mut Context<'_>, Proceed<'_>) -> T + 'static,
        T: Into<BodyResult>,
    {
        let site = CallSite::caller();
        let scope = scope.into_hook_scope()?;
        self.hooks
            .add_around(scope, around_hook(body, FilterRules::new(), site))
    }

    fn add<F, T>(
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
        self.hooks.add(
            HookOwner::Configuration,
            phase,
            scope,
            hook(body, conditions, site),
        )
    }
}
