use std::fmt;

use folio::error::ErrorDetail;

/// How an issue affects the build.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// The build degrades but still publishes everything else.
    Warning,
    /// One entry is affected; it is still built where possible.
    Entry,
    /// The build fails and nothing is written.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => "warning".fmt(f),
            Severity::Entry => "error".fmt(f),
            Severity::Fatal => "fatal".fmt(f),
        }
    }
}

/// A problem found during a build. Paths are root-relative, `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum Issue {
    #[error("{path}: malformed front matter: {message}")]
    MalformedFrontMatter { path: String, message: String },
    #[error("{path}: file name has no valid `YYYY-MM-DD-` date")]
    MissingDateToken { path: String },
    #[error("{path}: invalid permalink: {message}")]
    InvalidPermalink { path: String, message: String },
    #[error("{path}: unknown layout `{name}`{}", required_by_suffix(.required_by))]
    UnknownLayout { path: String, name: String, required_by: Option<String> },
    #[error("{path}: not valid UTF-8: invalid bytes were replaced")]
    InvalidUtf8 { path: String },
    #[error("{path}: malformed data file: {message}")]
    MalformedData { path: String, message: String },
    #[error("route `{route}` is claimed by {}", .claimants.join(", "))]
    RouteCollision { route: String, claimants: Vec<String> },
    #[error("{0}")]
    LayoutCycle(String),
    #[error("{path}: template error: {message}")]
    Template { path: String, message: String },
    #[error("unknown skin `{requested}`: using `{fallback}`")]
    UnknownSkin { requested: String, fallback: String },
    #[error("{path}: stylesheet not built: {message}")]
    Stylesheet { path: String, message: String },
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    match required_by {
        Some(layout) => format!(" (parent of `{layout}`)"),
        None => String::new(),
    }
}

impl ErrorDetail for Issue { }

impl Issue {
    pub fn severity(&self) -> Severity {
        match self {
            Issue::UnknownSkin { .. } | Issue::Stylesheet { .. } => Severity::Warning,
            Issue::MalformedFrontMatter { .. }
                | Issue::MissingDateToken { .. }
                | Issue::InvalidPermalink { .. }
                | Issue::UnknownLayout { .. }
                | Issue::InvalidUtf8 { .. }
                | Issue::MalformedData { .. } => Severity::Entry,
            Issue::RouteCollision { .. }
                | Issue::LayoutCycle(_)
                | Issue::Template { .. } => Severity::Fatal,
        }
    }
}

/// Sorts `issues` by severity, most severe first, then by message, and
/// removes duplicates.
pub fn normalize(issues: &mut Vec<Issue>) {
    issues.sort_by_cached_key(|issue| (std::cmp::Reverse(issue.severity()), issue.to_string()));
    issues.dedup();
}

/// Renders an error on one line.
pub fn one_line(error: &impl fmt::Display) -> String {
    error.to_string()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_issues_are_sorted_and_unique() {
        let cycle = Issue::LayoutCycle("layout `a` is its own ancestor: a -> b -> a".into());
        let mut issues = vec![
            Issue::MissingDateToken { path: "_posts/b.md".into() },
            cycle.clone(),
            Issue::UnknownSkin { requested: "x".into(), fallback: "default".into() },
            Issue::MissingDateToken { path: "_posts/a.md".into() },
            cycle.clone(),
        ];

        normalize(&mut issues);
        assert_eq!(issues.len(), 4);
        assert_eq!(issues[0], cycle);
        assert_eq!(issues[1], Issue::MissingDateToken { path: "_posts/a.md".into() });
        assert_eq!(issues[3].severity(), Severity::Warning);
    }

    #[test]
    fn messages() {
        let issue = Issue::UnknownLayout {
            path: "about.md".into(),
            name: "base".into(),
            required_by: Some("page".into()),
        };

        assert_eq!(issue.to_string(), "about.md: unknown layout `base` (parent of `page`)");

        let issue = Issue::RouteCollision {
            route: "/same/".into(),
            claimants: vec!["a.md".into(), "b.md".into()],
        };

        assert_eq!(issue.severity(), Severity::Fatal);
        assert_eq!(issue.to_string(), "route `/same/` is claimed by a.md, b.md");
        assert_eq!(one_line(&"failed\n    path: x\n"), "failed: path: x");
    }
}
