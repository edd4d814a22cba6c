use std::{
    any::{TypeId, type_name},
    borrow::Cow,
    fmt::Display,
};

/// The thing a group is about.
///
/// A type subject is what `describe(Description::of::<Vec<u8>>())` records. A
/// symbol subject names something that has no Rust type, like a feature flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Type { name: Cow<'static, str>, id: TypeId },
    Symbol(Cow<'static, str>),
}

impl Subject {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type {
            name: short_type_name(type_name::<T>()).into(),
            id: TypeId::of::<T>(),
        }
    }

    pub fn symbol(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Symbol(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Subject::Type { name, .. } | Subject::Symbol(name) => name,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Subject::Type { .. })
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        matches!(self, Subject::Type { id, .. } if *id == TypeId::of::<T>())
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`.
fn short_type_name(full: &str) -> String {
    fn last_segment(path: &str) -> &str {
        path.rsplit("::").next().unwrap_or(path)
    }

    let mut short = String::with_capacity(full.len());
    let mut start = 0;
    for (i, c) in full.char_indices() {
        if matches!(c, '<' | '>' | ',' | '(' | ')' | '[' | ']' | ';' | '&' | '*' | ' ') {
            short.push_str(last_segment(&full[start..i]));
            short.push(c);
            start = i + c.len_utf8();
        }
    }
    short.push_str(last_segment(&full[start..]));
    short
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionPart {
    Subject(Subject),
    Text(Cow<'static, str>),
}

impl DescriptionPart {
    fn as_text(&self) -> &str {
        match self {
            DescriptionPart::Subject(subject) => subject.name(),
            DescriptionPart::Text(text) => text,
        }
    }
}

/// The arguments a group or case is described with.
///
/// Usually built through one of the `From` conversions:
///
/// - `"some text"` or a `String`
/// - a [`Subject`]
/// - `(Subject, "#method")`
/// - `()` for no description at all
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    parts: Vec<DescriptionPart>,
}

impl Description {
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe a Rust type.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::from(Subject::of::<T>())
    }

    pub fn symbol(name: impl Into<Cow<'static, str>>) -> Self {
        Self::from(Subject::symbol(name))
    }

    pub fn and(mut self, text: impl Into<Cow<'static, str>>) -> Self {
        self.parts.push(DescriptionPart::Text(text.into()));
        self
    }

    pub fn parts(&self) -> &[DescriptionPart] {
        &self.parts
    }

    /// The subject a group describes, taken from the first argument.
    pub fn subject(&self) -> Option<&Subject> {
        match self.parts.first()? {
            DescriptionPart::Subject(subject) => Some(subject),
            DescriptionPart::Text(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Join the parts, see [`join_descriptions`] for the separator rule.
    pub fn render(&self) -> String {
        let mut rendered = String::new();
        let mut previous: Option<&DescriptionPart> = None;
        for part in &self.parts {
            rendered.push_str(separator(previous, Some(part)));
            rendered.push_str(part.as_text());
            previous = Some(part);
        }
        rendered
    }

    pub(crate) fn first(&self) -> Option<&DescriptionPart> {
        self.parts.first()
    }

    pub(crate) fn last(&self) -> Option<&DescriptionPart> {
        self.parts.last()
    }
}

const CONNECTORS: &[&str] = &["#", "::", "."];

fn separator(previous: Option<&DescriptionPart>, next: Option<&DescriptionPart>) -> &'static str {
    match (previous, next) {
        (None, _) => "",
        (Some(DescriptionPart::Subject(subject)), Some(DescriptionPart::Text(text)))
            if subject.is_type() && CONNECTORS.iter().any(|c| text.starts_with(c)) =>
        {
            ""
        }
        _ => " ",
    }
}

/// Append a child's description to its parent's full description.
///
/// Parts are joined by a single space. When the parent's last argument is a
/// type subject and the child starts with `#`, `.` or `::`, no space is
/// inserted, so `Vec` and `#push` read as `Vec#push`.
pub(crate) fn join_descriptions(
    parent_full: &str,
    parent: &Description,
    child_rendered: &str,
    child: &Description,
) -> String {
    match (parent_full.is_empty(), child_rendered.is_empty()) {
        (true, _) => child_rendered.to_string(),
        (false, true) => parent_full.to_string(),
        (false, false) => {
            let sep = separator(parent.last(), child.first());
            format!("{parent_full}{sep}{child_rendered}")
        }
    }
}

impl From<&'static str> for Description {
    fn from(value: &'static str) -> Self {
        Self::new().and(value)
    }
}

impl From<String> for Description {
    fn from(value: String) -> Self {
        Self::new().and(value)
    }
}

impl From<Subject> for Description {
    fn from(value: Subject) -> Self {
        Self {
            parts: vec![DescriptionPart::Subject(value)],
        }
    }
}

impl From<(Subject, &'static str)> for Description {
    fn from((subject, text): (Subject, &'static str)) -> Self {
        Self::from(subject).and(text)
    }
}

impl From<()> for Description {
    fn from(_: ()) -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn short_type_names() {
        assert_eq!(Subject::of::<String>().name(), "String");
        assert_eq!(Subject::of::<Vec<String>>().name(), "Vec<String>");
        assert_eq!(
            Subject::of::<HashMap<String, i32>>().name(),
            "HashMap<String, i32>"
        );
        assert_eq!(Subject::of::<[u8]>().name(), "[u8]");
    }

    #[test]
    fn renders_subject_and_text() {
        assert_eq!(Description::from("group").render(), "group");
        assert_eq!(Description::of::<String>().render(), "String");
        assert_eq!(Description::of::<String>().and("group").render(), "String group");
        assert_eq!(Description::new().render(), "");
    }

    #[test]
    fn connectors_glue_onto_type_subjects() {
        for connector in ["#", ".", "::"] {
            let description = Description::of::<Vec<u8>>().and(format!("{connector}method"));
            assert_eq!(description.render(), format!("Vec<u8>{connector}method"));
        }
        let description = Description::symbol("flag").and("#method");
        assert_eq!(description.render(), "flag #method");
    }

    #[test]
    fn subject_comes_from_the_first_argument() {
        assert!(Description::from("text").subject().is_none());
        assert!(Description::of::<u8>().subject().unwrap().is::<u8>());
        assert_eq!(
            Description::symbol("group").subject(),
            Some(&Subject::symbol("group"))
        );
    }
}
