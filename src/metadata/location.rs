use std::{borrow::Cow, env, fmt::Display, panic::Location, sync::LazyLock};

use regex::Regex;

// path:line, optionally followed by :column and/or ":in `...'"
static FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<file>.+?):(?<line>\d+)(?::(?<column>\d+))?(?::in .*)?$")
        .expect("frame pattern is valid")
});

// Frames that point into kispec itself are never the definition site.
static FRAMEWORK_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[/\\])kispec[/\\]src[/\\]")
        .expect("framework pattern is valid")
});

/// Where a group, case or hook was defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub file: Cow<'static, str>,
    pub line: u32,
    pub column: Option<u32>,
}

impl CallSite {
    /// The call site of the nearest caller that is not `#[track_caller]`.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }

    /// Parse a single `path:line[:column]` frame.
    pub fn parse(frame: &str) -> Option<Self> {
        let captures = FRAME.captures(frame.trim())?;
        let line = captures.name("line")?.as_str().parse().ok()?;
        let column = captures
            .name("column")
            .and_then(|column| column.as_str().parse().ok());
        Some(Self {
            file: captures["file"].to_string().into(),
            line,
            column,
        })
    }

    /// Pick the first frame that lies outside of kispec's own sources.
    pub fn from_frames<'f>(frames: impl IntoIterator<Item = &'f str>) -> Option<Self> {
        frames
            .into_iter()
            .filter(|frame| !FRAMEWORK_FRAME.is_match(frame))
            .find_map(Self::parse)
    }

    pub fn file_path(&self) -> &str {
        &self.file
    }

    /// `file:line`, the form used in metadata and diagnostics.
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

impl From<&'static Location<'static>> for CallSite {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: Cow::Borrowed(location.file()),
            line: location.line(),
            column: Some(location.column()),
        }
    }
}

impl Display for CallSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Replace every occurrence of the current directory in `text` with `.`.
pub fn relative_path(text: &str) -> Option<String> {
    let here = env::current_dir().ok()?;
    let here = here.to_str()?;
    Some(text.replace(here, "."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_points_at_this_file() {
        let line = line!() + 1;
        let site = CallSite::caller();
        assert_eq!(site.line, line);
        assert!(site.file_path().ends_with("location.rs"));
        assert_eq!(site.location(), format!("{}:{line}", site.file));
    }

    #[test]
    fn parses_frames() {
        let site = CallSite::parse("example_file:42").unwrap();
        assert_eq!(site.file, "example_file");
        assert_eq!(site.line, 42);
        assert_eq!(site.column, None);

        let site = CallSite::parse("C:/path/to/file_spec.rs:17").unwrap();
        assert_eq!(site.file, "C:/path/to/file_spec.rs");
        assert_eq!(site.line, 17);

        let site = CallSite::parse("tests/a.rs:3:999").unwrap();
        assert_eq!(site.line, 3);
        assert_eq!(site.column, Some(999));

        let site = CallSite::parse("tests/a.rs:3:in `block'").unwrap();
        assert_eq!(site.line, 3);

        assert_eq!(CallSite::parse("no line here"), None);
    }

    #[test]
    fn skips_framework_frames() {
        let site =
            CallSite::from_frames(["/home/me/kispec/src/world/builder.rs:10", "tests/defs.rs:7"])
                .unwrap();
        assert_eq!(site.location(), "tests/defs.rs:7");
    }

    #[test]
    fn relative_path_replaces_the_current_directory() {
        let here = env::current_dir().unwrap();
        let here = here.to_str().unwrap();
        assert_eq!(relative_path(here).as_deref(), Some("."));
        assert_eq!(
            relative_path(&format!("foo {here} bar")).as_deref(),
            Some("foo . bar")
        );
    }
}
