//! Tag based filtering.
//!
//! A filter is a set of rules, each pairing a tag with a [`Matcher`]. The
//! [`FilterManager`] keeps one set of inclusion rules and one set of exclusion
//! rules and decides which cases take part in a run. Cases that are not
//! selected are never started, and groups without any selected case are not
//! entered at all, so their group hooks never fire.
//!
//! The same rule sets are used as conditions on hooks: a hook with conditions
//! only applies to nodes whose metadata satisfies all of them.

use std::{borrow::Cow, fmt::Display, rc::Rc};

use indexmap::IndexMap;
use regex::Regex;

use crate::metadata::{Metadata, Tag, Value};

mod manager;
pub use manager::*;

/// How a single rule matches a metadata value.
#[derive(Clone)]
#[non_exhaustive]
pub enum Matcher {
    /// Loose equality, see [`Value::loosely_eq`].
    ///
    /// `true` matches any present truthy value. Against list metadata the rule
    /// matches if any element does.
    Value(Value),

    /// A regular expression over the value's text form.
    Pattern(Regex),

    /// A predicate over the value, `None` when the tag is absent.
    Predicate(Rc<dyn Fn(Option<&Value>) -> bool>),

    /// Every sub-key has to match the record value's entry.
    Record(IndexMap<Tag, Matcher>),
}

impl Matcher {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    pub fn predicate(f: impl Fn(Option<&Value>) -> bool + 'static) -> Self {
        Self::Predicate(Rc::new(f))
    }

    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let actual = match (self, actual) {
            (Matcher::Predicate(predicate), actual) => return predicate(actual),
            (_, None) => return false,
            (_, Some(actual)) => actual,
        };

        match (self, actual) {
            (Matcher::Record(rules), Value::Record(entries)) => rules
                .iter()
                .all(|(key, rule)| rule.matches(entries.get(key))),
            (Matcher::Record(_), _) => false,
            (Matcher::Value(Value::List(_)), _) => self.matches_single(actual),
            (_, Value::List(items)) => items.iter().any(|item| self.matches_single(item)),
            _ => self.matches_single(actual),
        }
    }

    fn matches_single(&self, actual: &Value) -> bool {
        match self {
            Matcher::Value(Value::Bool(true)) => {
                actual.is_truthy() && !actual.loosely_eq(&Value::Bool(false))
            }
            Matcher::Value(expected) => expected.loosely_eq(actual),
            Matcher::Pattern(pattern) => actual.text().is_some_and(|text| pattern.is_match(&text)),
            Matcher::Predicate(predicate) => predicate(Some(actual)),
            Matcher::Record(_) => self.matches(Some(actual)),
        }
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Pattern(pattern) => f.debug_tuple("Pattern").field(&pattern.as_str()).finish(),
            Self::Predicate(_) => write!(f, "Predicate(...)"),
            Self::Record(rules) => f.debug_tuple("Record").field(rules).finish(),
        }
    }
}

impl Display for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Matcher::Value(value) => write!(f, "{value}"),
            Matcher::Pattern(pattern) => write!(f, "/{}/", pattern.as_str()),
            Matcher::Predicate(_) => write!(f, "#<predicate>"),
            Matcher::Record(rules) => {
                f.write_str("{")?;
                for (i, (key, rule)) in rules.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {rule}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            (Self::Predicate(a), Self::Predicate(b)) => Rc::ptr_eq(a, b),
            (Self::Record(a), Self::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Value> for Matcher {
    fn from(value: Value) -> Self {
        match value {
            Value::Record(entries) => Self::Record(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Matcher::from(value)))
                    .collect(),
            ),
            value => Self::Value(value),
        }
    }
}

impl From<Regex> for Matcher {
    fn from(value: Regex) -> Self {
        Self::Pattern(value)
    }
}

macro_rules! matcher_from_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Matcher {
            fn from(value: $ty) -> Self {
                Self::from(Value::from(value))
            }
        })*
    };
}

matcher_from_value!(bool, i64, i32, u32, &'static str, String, Cow<'static, str>);

/// An ordered set of tag rules, one rule per tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterRules(IndexMap<Tag, Matcher>);

impl FilterRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: impl Into<Tag>, matcher: impl Into<Matcher>) -> Self {
        self.insert(tag, matcher);
        self
    }

    /// Set the rule for `tag`, replacing an earlier one.
    pub fn insert(&mut self, tag: impl Into<Tag>, matcher: impl Into<Matcher>) -> Option<Matcher> {
        self.0.insert(tag.into(), matcher.into())
    }

    pub fn remove(&mut self, tag: &str) -> Option<Matcher> {
        self.0.shift_remove(tag)
    }

    pub fn get(&self, tag: &str) -> Option<&Matcher> {
        self.0.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains_key(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &Matcher)> {
        self.0.iter()
    }

    fn rule_applies(tag: &str, matcher: &Matcher, metadata: &Metadata) -> bool {
        matcher.matches(metadata.get(tag).as_deref())
    }

    /// Every rule matches. An empty set matches everything.
    pub fn all_apply(&self, metadata: &Metadata) -> bool {
        self.0
            .iter()
            .all(|(tag, matcher)| Self::rule_applies(tag, matcher, metadata))
    }

    /// At least one rule matches. An empty set matches nothing.
    pub fn any_apply(&self, metadata: &Metadata) -> bool {
        self.0
            .iter()
            .any(|(tag, matcher)| Self::rule_applies(tag, matcher, metadata))
    }
}

impl Display for FilterRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, (tag, matcher)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tag}: {matcher}")?;
        }
        f.write_str("}")
    }
}

impl<K: Into<Tag>, M: Into<Matcher>, const N: usize> From<[(K, M); N]> for FilterRules {
    fn from(rules: [(K, M); N]) -> Self {
        rules
            .into_iter()
            .fold(Self::new(), |rules, (tag, matcher)| rules.with(tag, matcher))
    }
}

impl From<()> for FilterRules {
    fn from(_: ()) -> Self {
        Self::new()
    }
}
