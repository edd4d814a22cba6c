//! Running the group tree.
//!
//! A run is single threaded and depth first. Before anything runs, the
//! filter selects the cases taking part, and every group on the way to a
//! selected case is marked. Unmarked groups are never entered: no
//! notifications, no group hooks.
//!
//! For each group:
//!
//! 1. the group's state starts as a copy of its parent's,
//! 2. group before hooks run (configuration ones first for top level groups),
//! 3. the selected cases run, in the group's order,
//! 4. the child groups run, in the group's order,
//! 5. group after hooks run in reverse (configuration ones last).
//!
//! A failing group before hook fails every selected case below the group
//! without running it, and the after hooks still run. Errors in after hooks
//! never change a case's status, they go to the diagnostics sink.

use std::{
    borrow::Cow,
    cell::Cell,
    collections::{HashSet, VecDeque},
};

use crate::{
    config::Configuration,
    hook::{AroundFn, Hook, HookFn, HookScope, Proceed},
    metadata::{CallSite, Metadata},
    ordering::{OrderItem, OrderingStrategy},
    outcome::{AROUND_DID_NOT_RUN, ExecutionResult, Failure, NOT_YET_IMPLEMENTED, Status},
    reporter::Reporter,
    tree::{Case, Group, NodeId, Tree},
};

mod context;
pub use context::{Context, Slot, State};

pub(crate) mod panic;
use panic::{Interrupt, QuietPanicGuard, invoke};

/// Run every selected case of `tree`.
///
/// Returns `true` if no case failed and the run was not stopped early.
pub(crate) fn run(
    tree: &Tree,
    config: &Configuration,
    stop: &Cell<bool>,
    reporter: &mut dyn Reporter,
) -> bool {
    let _guard = QuietPanicGuard::install();
    Runner::new(tree, config, stop, reporter).run()
}

#[derive(Default)]
struct CaseOutcome {
    ran: bool,
    interrupt: Option<Interrupt>,
    after_errors: Vec<(Failure, CallSite)>,
}

struct Runner<'r> {
    tree: &'r Tree,
    config: &'r Configuration,
    stop: &'r Cell<bool>,
    reporter: &'r mut dyn Reporter,
    selected: HashSet<NodeId>,
    selected_groups: HashSet<NodeId>,
    failures: usize,
}

impl<'r> Runner<'r> {
    fn new(
        tree: &'r Tree,
        config: &'r Configuration,
        stop: &'r Cell<bool>,
        reporter: &'r mut dyn Reporter,
    ) -> Self {
        let cases = tree.all_cases();
        let selected: HashSet<NodeId> = config
            .filter
            .prune(
                cases
                    .iter()
                    .filter_map(|id| Some((*id, tree.metadata(*id)?))),
                config.diagnostics.as_ref(),
            )
            .into_iter()
            .collect();
        let selected_groups = selected
            .iter()
            .flat_map(|case| tree.lineage(*case))
            .collect();

        Self {
            tree,
            config,
            stop,
            reporter,
            selected,
            selected_groups,
            failures: 0,
        }
    }

    fn run(mut self) -> bool {
        let tree = self.tree;
        let config = self.config;
        self.announce_filters();

        let roots: Vec<NodeId> = tree
            .roots()
            .iter()
            .copied()
            .filter(|root| self.selected_groups.contains(root))
            .collect();
        let mut queue: VecDeque<NodeId> = self.order(roots, config.ordering.global().as_ref()).into();
        log::debug!(
            target: "kispec",
            "running {} cases in {} top level groups, seed {}",
            self.selected.len(),
            queue.len(),
            config.ordering.seed()
        );

        let mut state = State::new();
        let mut success = true;
        let before_run = config.hooks.before(HookScope::Run).iter();
        match self.run_before_hooks(before_run, &mut state, None) {
            Ok(()) => {
                while let Some(group) = queue.pop_front() {
                    if self.stop.get() {
                        log::debug!(
                            target: "kispec",
                            "stop requested, purging {} top level groups",
                            queue.len() + 1
                        );
                        queue.clear();
                        success = false;
                        break;
                    }
                    success &= self.run_group(group, &state, true);
                }
            }
            Err(interrupt) => {
                log::debug!(target: "kispec", "before(:run) hook interrupted the run: {interrupt:?}");
                for group in queue.drain(..) {
                    let Some(metadata) = tree.metadata(group) else {
                        continue;
                    };
                    self.reporter.group_started(group, metadata);
                    self.abort_cases_below(group, &interrupt);
                    self.reporter.group_finished(group, metadata);
                }
                success = matches!(interrupt, Interrupt::Skipped(_));
            }
        }

        let after_run = config.hooks.after(HookScope::Run).iter().rev();
        self.run_after_hooks(after_run, &mut state, None, HookScope::Run);
        log::debug!(target: "kispec", "run finished with {} failures", self.failures);
        success
    }

    fn announce_filters(&mut self) {
        let filter = &self.config.filter;
        if !filter.inclusions().is_empty() {
            self.reporter
                .message(&format!("Run options: include {}", filter.inclusions()));
        }
        if !filter.exclusions().is_empty() {
            self.reporter
                .message(&format!("Run options: exclude {}", filter.exclusions()));
        }
    }

    fn order(&self, ids: Vec<NodeId>, strategy: &dyn OrderingStrategy) -> Vec<NodeId> {
        let tree = self.tree;
        let mut items: Vec<OrderItem<'_>> = ids
            .into_iter()
            .filter_map(|id| {
                Some(OrderItem {
                    id,
                    metadata: tree.metadata(id)?,
                })
            })
            .collect();
        self.config.ordering.apply(strategy, &mut items);
        items.into_iter().map(|item| item.id).collect()
    }

    fn run_group(&mut self, id: NodeId, parent_state: &State, top_level: bool) -> bool {
        if self.stop.get() {
            return false;
        }
        if !self.selected_groups.contains(&id) {
            return true;
        }
        let tree = self.tree;
        let config = self.config;
        let Some(group) = tree.group(id) else {
            return true;
        };
        let metadata = group.metadata();

        self.reporter.group_started(id, metadata);
        log::debug!(target: "kispec", "entering group {:?}", metadata.full_description());

        let configured: &[Hook<HookFn>] = match top_level {
            true => config.hooks.before(HookScope::Group),
            false => &[],
        };
        let befores = configured
            .iter()
            .chain(group.hooks.before(HookScope::Group))
            .filter(|hook| hook.applies_to(metadata));

        let mut state = parent_state.clone();
        let succeeded = match self.run_before_hooks(befores, &mut state, Some(metadata)) {
            Ok(()) => {
                let strategy = config
                    .ordering
                    .resolve(metadata, config.diagnostics.as_ref());

                let cases: Vec<NodeId> = tree
                    .cases(id)
                    .filter(|case| self.selected.contains(case))
                    .collect();
                let mut ok = true;
                for case in self.order(cases, strategy.as_ref()) {
                    if self.stop.get() {
                        ok = false;
                        continue;
                    }
                    ok &= self.run_case(case, &state);
                }

                let children: Vec<NodeId> = tree.child_groups(id).collect();
                for child in self.order(children, strategy.as_ref()) {
                    ok &= self.run_group(child, &state, false);
                }
                ok
            }
            Err(interrupt) => {
                log::debug!(
                    target: "kispec",
                    "before(:group) hook of {:?} interrupted it: {interrupt:?}",
                    metadata.full_description()
                );
                self.abort_cases_below(id, &interrupt);
                matches!(interrupt, Interrupt::Skipped(_))
            }
        };

        let configured: &[Hook<HookFn>] = match top_level {
            true => config.hooks.after(HookScope::Group),
            false => &[],
        };
        let afters = group
            .hooks
            .after(HookScope::Group)
            .iter()
            .rev()
            .chain(configured.iter().rev())
            .filter(|hook| hook.applies_to(metadata));
        self.run_after_hooks(afters, &mut state, Some(metadata), HookScope::Group);

        self.reporter.group_finished(id, metadata);
        succeeded
    }

    fn run_case(&mut self, id: NodeId, group_state: &State) -> bool {
        let tree = self.tree;
        let config = self.config;
        let Some(case) = tree.case(id) else {
            return true;
        };
        let metadata = case.metadata();
        self.reporter.case_started(id, metadata);
        let mut result = ExecutionResult::started_now();

        if let Some(reason) = metadata.skip_reason() {
            result.pending_message = Some(Cow::Owned(reason.into_owned()));
            result.finish(Status::Skipped);
            return self.finish_case(id, case, result);
        }
        let Some(body) = case.body.as_ref() else {
            result.pending_message = Some(Cow::Borrowed(NOT_YET_IMPLEMENTED));
            result.finish(Status::Pending);
            return self.finish_case(id, case, result);
        };

        let groups: Vec<&Group> = tree
            .lineage(id)
            .into_iter()
            .filter_map(|group| tree.group(group))
            .collect();
        let arounds: Vec<&Hook<AroundFn>> = config
            .hooks
            .around()
            .iter()
            .chain(groups.iter().flat_map(|group| group.hooks.around()))
            .filter(|hook| hook.applies_to(metadata))
            .collect();
        let befores: Vec<&Hook<HookFn>> = config
            .hooks
            .before(HookScope::Case)
            .iter()
            .chain(
                groups
                    .iter()
                    .flat_map(|group| group.hooks.before(HookScope::Case)),
            )
            .filter(|hook| hook.applies_to(metadata))
            .collect();
        let afters: Vec<&Hook<HookFn>> = groups
            .iter()
            .rev()
            .flat_map(|group| group.hooks.after(HookScope::Case).iter().rev())
            .chain(config.hooks.after(HookScope::Case).iter().rev())
            .filter(|hook| hook.applies_to(metadata))
            .collect();

        log::trace!(
            target: "kispec",
            "case {:?}: {} around, {} before, {} after hooks",
            metadata.full_description(),
            arounds.len(),
            befores.len(),
            afters.len()
        );

        let mut state = group_state.clone();
        let mut ctx = Context::new(&mut state, Some(metadata), self.stop);
        ctx.pending = metadata
            .pending_reason()
            .map(|reason| Cow::Owned(reason.into_owned()));

        let mut outcome = CaseOutcome::default();
        let around_result = {
            let mut inner = |ctx: &mut Context<'_>| {
                outcome.ran = true;
                for hook in &befores {
                    if let Err(interrupt) = invoke(|| (hook.body)(ctx)) {
                        outcome.interrupt = Some(interrupt);
                        break;
                    }
                }
                if outcome.interrupt.is_none() {
                    if let Err(interrupt) = invoke(|| body(ctx)) {
                        outcome.interrupt = Some(interrupt);
                    }
                }
                for hook in &afters {
                    if let Err(Interrupt::Failed(failure)) = invoke(|| (hook.body)(ctx)) {
                        outcome.after_errors.push((failure, hook.site.clone()));
                    }
                }
            };
            run_around(&arounds, &mut ctx, &mut inner)
        };
        let pending = ctx.pending.take();

        let interrupt = outcome.interrupt.or(around_result.err());
        match (interrupt, pending) {
            (Some(Interrupt::Skipped(reason)), _) => {
                result.pending_message = Some(reason);
                result.finish(Status::Skipped);
            }
            (None, _) if !outcome.ran => {
                result.pending_message = Some(Cow::Borrowed(AROUND_DID_NOT_RUN));
                result.finish(Status::Skipped);
            }
            (Some(Interrupt::Failed(failure)), Some(reason)) => {
                result.pending_message = Some(reason);
                result.pending_failure = Some(failure);
                result.finish(Status::Pending);
            }
            (None, Some(reason)) => {
                result.failure = Some(Failure::PendingPassed {
                    reason: reason.clone(),
                });
                result.pending_message = Some(reason);
                result.finish(Status::Failed);
            }
            (Some(Interrupt::Failed(failure)), None) => {
                result.failure = Some(failure);
                result.finish(Status::Failed);
            }
            (None, None) => result.finish(Status::Passed),
        }

        for (failure, site) in outcome.after_errors {
            self.report_after_error(HookScope::Case, &failure, &site);
        }
        self.finish_case(id, case, result)
    }

    /// Settle every selected case below `group` without running it.
    ///
    /// Nested groups still report their start and finish around their own
    /// cases, so the notifications stay properly nested.
    fn abort_cases_below(&mut self, group: NodeId, interrupt: &Interrupt) {
        let tree = self.tree;
        let cases: Vec<NodeId> = tree
            .cases(group)
            .filter(|case| self.selected.contains(case))
            .collect();
        for id in cases {
            let Some(case) = tree.case(id) else {
                continue;
            };
            self.reporter.case_started(id, case.metadata());
            let mut result = ExecutionResult::started_now();
            match interrupt {
                Interrupt::Failed(failure) => {
                    result.failure = Some(failure.clone());
                    result.finish(Status::Failed);
                }
                Interrupt::Skipped(reason) => {
                    result.pending_message = Some(reason.clone());
                    result.finish(Status::Skipped);
                }
            }
            self.finish_case(id, case, result);
        }

        let children: Vec<NodeId> = tree
            .child_groups(group)
            .filter(|child| self.selected_groups.contains(child))
            .collect();
        for child in children {
            let Some(metadata) = tree.metadata(child) else {
                continue;
            };
            self.reporter.group_started(child, metadata);
            self.abort_cases_below(child, interrupt);
            self.reporter.group_finished(child, metadata);
        }
    }

    fn finish_case(&mut self, id: NodeId, case: &Case, result: ExecutionResult) -> bool {
        let ok = !result.failed();
        if !ok {
            self.record_failure();
        }
        log::debug!(
            target: "kispec",
            "{:?} finished: {:?}",
            case.metadata().full_description(),
            result.status
        );
        self.reporter.case_finished(id, case.metadata(), &result);
        *case.result.borrow_mut() = result;
        ok
    }

    fn record_failure(&mut self) {
        self.failures += 1;
        let Some(limit) = self.config.fail_fast else {
            return;
        };
        if self.failures >= limit.get() && !self.stop.replace(true) {
            log::debug!(target: "kispec", "fail fast limit of {limit} reached, stopping");
        }
    }

    /// Run hooks in the given order, stopping at the first interruption.
    fn run_before_hooks<'h>(
        &self,
        hooks: impl Iterator<Item = &'h Hook<HookFn>>,
        state: &mut State,
        metadata: Option<&Metadata>,
    ) -> Result<(), Interrupt> {
        for hook in hooks {
            log::trace!(target: "kispec", "before hook defined at {}", hook.site);
            let mut ctx = Context::new(state, metadata, self.stop);
            invoke(|| (hook.body)(&mut ctx))?;
            if let Some(reason) = ctx.pending.take() {
                log::debug!(
                    target: "kispec",
                    "ignoring pending({reason:?}) outside of a case, hook defined at {}",
                    hook.site
                );
            }
        }
        Ok(())
    }

    /// Run every hook, collecting errors and reporting them once all ran.
    fn run_after_hooks<'h>(
        &self,
        hooks: impl Iterator<Item = &'h Hook<HookFn>>,
        state: &mut State,
        metadata: Option<&Metadata>,
        scope: HookScope,
    ) {
        let mut errors = Vec::new();
        for hook in hooks {
            log::trace!(target: "kispec", "after hook defined at {}", hook.site);
            let mut ctx = Context::new(state, metadata, self.stop);
            if let Err(Interrupt::Failed(failure)) = invoke(|| (hook.body)(&mut ctx)) {
                errors.push((failure, &hook.site));
            }
        }
        for (failure, site) in errors {
            self.report_after_error(scope, &failure, site);
        }
    }

    fn report_after_error(&self, scope: HookScope, failure: &Failure, site: &CallSite) {
        self.config.diagnostics.warn(&format!(
            "An error occurred in an `after(:{scope})` hook.\n  {failure}\n  occurred at {site}"
        ));
    }
}

/// Run `inner` wrapped in `arounds`, the first one outermost.
fn run_around(
    arounds: &[&Hook<AroundFn>],
    ctx: &mut Context<'_>,
    inner: &mut dyn FnMut(&mut Context<'_>),
) -> Result<(), Interrupt> {
    let Some((first, rest)) = arounds.split_first() else {
        inner(ctx);
        return Ok(());
    };

    let mut nested = Ok(());
    let result = {
        let mut next = |ctx: &mut Context<'_>| {
            nested = run_around(rest, ctx, &mut *inner);
        };
        invoke(|| (first.body)(ctx, Proceed::new(&mut next)))
    };
    nested.and(result)
}
