use crate::{
    diagnostics::Diagnostics,
    filter::{FilterRules, Matcher},
    metadata::{Metadata, Tag},
};

/// Inclusion and exclusion rules for a run.
///
/// A case is selected when it satisfies every inclusion rule (or there are
/// none) and no exclusion rule. Excluding wins over including.
///
/// Setting a rule in one direction drops the rule for the same tag in the
/// other direction, so `include("slow", true)` after `exclude("slow", true)`
/// leaves only the inclusion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterManager {
    inclusions: FilterRules,
    exclusions: FilterRules,
    run_all_when_everything_filtered: bool,
}

impl FilterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inclusions(&self) -> &FilterRules {
        &self.inclusions
    }

    pub fn exclusions(&self) -> &FilterRules {
        &self.exclusions
    }

    pub fn include(&mut self, tag: impl Into<Tag>, matcher: impl Into<Matcher>) -> &mut Self {
        let tag = tag.into();
        self.exclusions.remove(&tag);
        self.inclusions.insert(tag, matcher);
        self
    }

    pub fn exclude(&mut self, tag: impl Into<Tag>, matcher: impl Into<Matcher>) -> &mut Self {
        let tag = tag.into();
        self.inclusions.remove(&tag);
        self.exclusions.insert(tag, matcher);
        self
    }

    /// Set a rule only if no rule for `tag` exists in either direction.
    pub fn include_with_low_priority(
        &mut self,
        tag: impl Into<Tag>,
        matcher: impl Into<Matcher>,
    ) -> &mut Self {
        let tag = tag.into();
        if !self.has_rule(&tag) {
            self.inclusions.insert(tag, matcher);
        }
        self
    }

    /// Set a rule only if no rule for `tag` exists in either direction.
    pub fn exclude_with_low_priority(
        &mut self,
        tag: impl Into<Tag>,
        matcher: impl Into<Matcher>,
    ) -> &mut Self {
        let tag = tag.into();
        if !self.has_rule(&tag) {
            self.exclusions.insert(tag, matcher);
        }
        self
    }

    /// Replace all inclusion rules.
    pub fn include_only(&mut self, rules: impl Into<FilterRules>) -> &mut Self {
        self.inclusions = rules.into();
        for tag in self.inclusions.tags() {
            self.exclusions.remove(tag);
        }
        self
    }

    /// Replace all exclusion rules.
    pub fn exclude_only(&mut self, rules: impl Into<FilterRules>) -> &mut Self {
        self.exclusions = rules.into();
        for tag in self.exclusions.tags() {
            self.inclusions.remove(tag);
        }
        self
    }

    pub fn with_include(mut self, tag: impl Into<Tag>, matcher: impl Into<Matcher>) -> Self {
        self.include(tag, matcher);
        self
    }

    pub fn with_exclude(mut self, tag: impl Into<Tag>, matcher: impl Into<Matcher>) -> Self {
        self.exclude(tag, matcher);
        self
    }

    /// Ignore the inclusion rules when they select nothing.
    pub fn with_run_all_when_everything_filtered(mut self, run_all: bool) -> Self {
        self.run_all_when_everything_filtered = run_all;
        self
    }

    pub fn run_all_when_everything_filtered(&self) -> bool {
        self.run_all_when_everything_filtered
    }

    fn has_rule(&self, tag: &str) -> bool {
        self.inclusions.contains(tag) || self.exclusions.contains(tag)
    }

    /// Lay `later` on top of `self`.
    ///
    /// For every tag `later` has a rule for, its rule wins in both
    /// directions: an opposing rule in `self` is dropped and a rule in the
    /// same direction is replaced. Tags `later` does not mention keep their
    /// rules from `self`.
    pub fn merge(&mut self, later: &FilterManager) -> &mut Self {
        for tag in later.inclusions.tags() {
            self.exclusions.remove(tag);
        }
        for tag in later.exclusions.tags() {
            self.inclusions.remove(tag);
        }
        for (tag, matcher) in later.inclusions.iter() {
            self.inclusions.insert(tag.clone(), matcher.clone());
        }
        for (tag, matcher) in later.exclusions.iter() {
            self.exclusions.insert(tag.clone(), matcher.clone());
        }
        self.run_all_when_everything_filtered |= later.run_all_when_everything_filtered;
        self
    }

    pub fn includes(&self, metadata: &Metadata) -> bool {
        self.inclusions.is_empty() || self.inclusions.all_apply(metadata)
    }

    pub fn excludes(&self, metadata: &Metadata) -> bool {
        self.exclusions.any_apply(metadata)
    }

    pub fn selects(&self, metadata: &Metadata) -> bool {
        self.includes(metadata) && !self.excludes(metadata)
    }

    /// Keep the items whose metadata is selected.
    ///
    /// With `run_all_when_everything_filtered` set and nothing selected, the
    /// inclusion rules are dropped, only the exclusion rules are applied and a
    /// notice goes to `diagnostics`.
    pub fn prune<'m, T>(
        &self,
        items: impl IntoIterator<Item = (T, &'m Metadata)>,
        diagnostics: &dyn Diagnostics,
    ) -> Vec<T> {
        let items: Vec<(T, &Metadata)> = items.into_iter().collect();
        let nothing_selected = !items.iter().any(|(_, metadata)| self.selects(metadata));

        if nothing_selected && !self.inclusions.is_empty() && self.run_all_when_everything_filtered {
            diagnostics.warn(&format!(
                "All examples were filtered out; ignoring {}",
                self.inclusions
            ));
            return items
                .into_iter()
                .filter(|(_, metadata)| !self.excludes(metadata))
                .map(|(item, _)| item)
                .collect();
        }

        items
            .into_iter()
            .filter(|(_, metadata)| self.selects(metadata))
            .map(|(item, _)| item)
            .collect()
    }
}
