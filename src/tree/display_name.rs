use std::sync::LazyLock;

use regex::{Captures, Regex};

static WORD_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^0-9a-zA-Z]+([0-9a-zA-Z])").expect("word break pattern is valid")
});

static NOT_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_]").expect("identifier pattern is valid"));

/// A readable, identifier-like name for a group description.
///
/// `"does something"` becomes `DoesSomething`, non-ASCII characters are
/// dropped, names that would not start with an uppercase letter get a
/// `Nested` prefix and an empty description is `Anonymous`.
pub fn base_name(description: &str) -> String {
    if description.is_empty() {
        return String::from("Anonymous");
    }

    let padded = format!(" {description}");
    let camel = WORD_BREAK.replace_all(&padded, |captures: &Captures<'_>| {
        captures[1].to_ascii_uppercase()
    });
    let name = NOT_IDENT.replace_all(camel.trim_start(), "");

    match name.chars().next() {
        Some(first) if first.is_ascii_uppercase() => name.into_owned(),
        _ => format!("Nested{name}"),
    }
}

/// `base` itself, or `base_2`, `base_3`... if taken.
pub fn disambiguate(base: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}
