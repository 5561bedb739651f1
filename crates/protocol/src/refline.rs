use serde::{Deserialize, Serialize};
use std::fmt;

/// Leading segment of every application reference
pub const APP_REF_KIND: &str = "app";

/// One `app/<id>/<arch>/<branch>` reference
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RefLine {
    pub app_id: String,
    pub arch: String,
    pub branch: String,
}

impl RefLine {
    pub fn new(
        app_id: impl Into<String>,
        arch: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            arch: arch.into(),
            branch: branch.into(),
        }
    }

    /// Parse a single reference line.
    ///
    /// Accepts exactly four non-empty `/`-separated segments starting with `app`,
    /// surrounded by optional whitespace. The identifier must be dotted.
    pub fn parse(text: &str) -> Option<Self> {
        let mut segments = text.trim().split('/');
        let kind = segments.next()?;
        let app_id = segments.next()?;
        let arch = segments.next()?;
        let branch = segments.next()?;

        if segments.next().is_some() || kind != APP_REF_KIND {
            return None;
        }
        if arch.is_empty() || branch.is_empty() || !is_dotted_app_id(app_id) {
            return None;
        }

        Some(Self::new(app_id, arch, branch))
    }
}

impl fmt::Display for RefLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{APP_REF_KIND}/{}/{}/{}",
            self.app_id, self.arch, self.branch
        )
    }
}

/// Identifier of a well-formed reference line, if any.
pub fn parse_line(text: &str) -> Option<String> {
    RefLine::parse(text).map(|line| line.app_id)
}

/// Application ids are reverse-DNS names; anything without a namespace separator
/// (runtimes' bare names, empty strings) is not an application.
pub fn is_dotted_app_id(app_id: &str) -> bool {
    !app_id.is_empty() && app_id.contains('.')
}

pub fn make_ref(app_id: &str, arch: &str, branch: &str) -> String {
    format!("{APP_REF_KIND}/{app_id}/{arch}/{branch}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_four_segment_reference() {
        let line = RefLine::parse("app/org.example.App/x86_64/stable").expect("valid ref");
        assert_eq!(line, RefLine::new("org.example.App", "x86_64", "stable"));
        assert_eq!(line.to_string(), "app/org.example.App/x86_64/stable");
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        assert_eq!(
            parse_line("  app/org.gnome.Maps/aarch64/beta \t"),
            Some("org.gnome.Maps".to_string())
        );
    }

    #[test]
    fn rejects_missing_branch_segment() {
        assert_eq!(parse_line("app/org.example.App/x86_64"), None);
    }

    #[test]
    fn rejects_extra_segments_and_other_kinds() {
        assert_eq!(parse_line("app/org.example.App/x86_64/stable/extra"), None);
        assert_eq!(parse_line("runtime/org.gnome.Platform/x86_64/45"), None);
        assert_eq!(parse_line("org.example.App/x86_64/stable"), None);
        assert_eq!(parse_line("app//x86_64/stable"), None);
        assert_eq!(parse_line("app/org.example.App//stable"), None);
    }

    #[test]
    fn rejects_undotted_identifiers() {
        assert_eq!(parse_line("app/firefox/x86_64/stable"), None);
        assert!(!is_dotted_app_id(""));
        assert!(is_dotted_app_id("org.mozilla.firefox"));
    }

    #[test]
    fn make_ref_matches_display() {
        let line = RefLine::new("io.github.Foo", "x86_64", "stable");
        assert_eq!(make_ref("io.github.Foo", "x86_64", "stable"), line.to_string());
    }
}
