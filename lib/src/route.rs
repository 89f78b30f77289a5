//! Validated output routes and permalink pattern expansion.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::ErrorDetail;
use crate::util::PathExt;

/// The placeholders a route pattern may use.
pub const PLACEHOLDERS: &[&str] = &["year", "month", "day", "title", "slug", "collection", "path"];

/// A URL path beginning with `/`, free of unresolved placeholders and `.` or
/// `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Route(Arc<str>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("route `{0}` does not begin with `/`")]
    Relative(String),
    #[error("route `{route}` contains unresolved placeholder `:{name}`")]
    Unresolved { route: String, name: String },
    #[error("route `{0}` contains a `.` or `..` segment")]
    DotSegment(String),
    #[error("pattern `{pattern}` uses unknown placeholder `:{name}`")]
    UnknownPlaceholder { pattern: String, name: String },
}

impl ErrorDetail for RouteError { }

/// Finds every `:name` placeholder in `string` as `(start, name)`. A
/// placeholder is a `:` followed by an ASCII letter.
fn placeholders(string: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    let bytes = string.as_bytes();
    memchr::memchr_iter(b':', bytes).filter_map(move |i| {
        let rest = &bytes[i + 1..];
        if !rest.first().is_some_and(u8::is_ascii_alphabetic) {
            return None;
        }

        let len = rest.iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count();

        Some((i, &string[i + 1..i + 1 + len]))
    })
}

impl Route {
    /// Validates `route`.
    ///
    /// ```rust
    /// use folio::route::Route;
    ///
    /// assert!(Route::parse("/2024/01/01/hello/").is_ok());
    /// assert!(Route::parse("/feed.xml").is_ok());
    /// assert!(Route::parse("about/").is_err());
    /// assert!(Route::parse("/:year/x/").is_err());
    /// assert!(Route::parse("/a/../b/").is_err());
    /// assert!(Route::parse("/./same/").is_err());
    /// assert!(Route::parse("/time/12:30/").is_ok());
    /// ```
    pub fn parse(route: &str) -> Result<Route, RouteError> {
        if !route.starts_with('/') {
            return Err(RouteError::Relative(route.into()));
        }

        if let Some((_, name)) = placeholders(route).next() {
            return Err(RouteError::Unresolved { route: route.into(), name: name.into() });
        }

        if route.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(RouteError::DotSegment(route.into()));
        }

        Ok(Route(route.into()))
    }

    /// The route of a page at the root-relative `path`: the path with its
    /// extension replaced by `/`. `index` files route to their directory.
    ///
    /// ```rust
    /// use folio::route::Route;
    ///
    /// assert_eq!(Route::for_page("about.md".as_ref()).as_str(), "/about/");
    /// assert_eq!(Route::for_page("index.html".as_ref()).as_str(), "/");
    /// assert_eq!(Route::for_page("docs/index.md".as_ref()).as_str(), "/docs/");
    /// assert_eq!(Route::for_page("docs/setup.md".as_ref()).as_str(), "/docs/setup/");
    /// ```
    pub fn for_page(path: &Path) -> Route {
        let path = match path.file_stem() {
            Some(stem) if stem == "index" => Cow::Borrowed(path.parent().unwrap_or(Path::new(""))),
            _ => path.without_extension(),
        };

        match path.to_url_path() {
            url if url.is_empty() => Route("/".into()),
            url => Route(format!("/{url}/").into()),
        }
    }

    /// The route of a file copied verbatim from the root-relative `path`.
    pub fn for_file(path: &Path) -> Route {
        Route(format!("/{}", path.to_url_path()).into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The file this route is written to, relative to the output directory.
    /// Routes ending in `/`, or whose last segment has no `.`, are written to
    /// an `index.html` in the directory they name.
    ///
    /// ```rust
    /// use std::path::Path;
    /// use folio::route::Route;
    ///
    /// let path = |r| Route::parse(r).unwrap().output_path();
    /// assert_eq!(path("/"), Path::new("index.html"));
    /// assert_eq!(path("/about/"), Path::new("about/index.html"));
    /// assert_eq!(path("/about"), Path::new("about/index.html"));
    /// assert_eq!(path("/feed.xml"), Path::new("feed.xml"));
    /// ```
    pub fn output_path(&self) -> PathBuf {
        let mut path: PathBuf = self.0.split('/').filter(|s| !s.is_empty()).collect();
        let last = self.0.rsplit('/').next().unwrap_or_default();
        if last.is_empty() || !last.contains('.') {
            path.push("index.html");
        }

        path
    }
}

/// Expands every known placeholder in `pattern` via `lookup`, collapsing
/// repeated slashes, and validates the result.
///
/// ```rust
/// use folio::route::expand;
///
/// let route = expand("/:collection/:title/", |name| match name {
///     "collection" => Some("notes".into()),
///     "title" => Some("first-note".into()),
///     _ => None,
/// });
///
/// assert_eq!(route.unwrap().as_str(), "/notes/first-note/");
/// ```
pub fn expand<'a, F>(pattern: &str, lookup: F) -> Result<Route, RouteError>
    where F: Fn(&str) -> Option<Cow<'a, str>>
{
    let mut expanded = String::with_capacity(pattern.len() + 16);
    let mut cursor = 0;
    for (start, name) in placeholders(pattern) {
        if let Some(value) = lookup(name) {
            expanded.push_str(&pattern[cursor..start]);
            expanded.push_str(&value);
            cursor = start + 1 + name.len();
        }
    }

    expanded.push_str(&pattern[cursor..]);

    let mut route = String::with_capacity(expanded.len());
    for c in expanded.chars() {
        if !(c == '/' && route.ends_with('/')) {
            route.push(c);
        }
    }

    Route::parse(&route)
}

/// Checks that `pattern` begins with `/` and uses only [`PLACEHOLDERS`].
pub fn validate_pattern(pattern: &str) -> Result<(), RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::Relative(pattern.into()));
    }

    match placeholders(pattern).find(|(_, name)| !PLACEHOLDERS.contains(name)) {
        Some((_, name)) => Err(RouteError::UnknownPlaceholder {
            pattern: pattern.into(),
            name: name.into(),
        }),
        None => Ok(()),
    }
}

/// Joins a base URL or path prefix with a route, keeping exactly one `/`
/// between them. Absolute URLs in `path` are returned unchanged.
///
/// ```rust
/// use folio::route::join_url;
///
/// assert_eq!(join_url("/blog", "/about/"), "/blog/about/");
/// assert_eq!(join_url("/blog/", "css/main.css"), "/blog/css/main.css");
/// assert_eq!(join_url("", "/about/"), "/about/");
/// assert_eq!(join_url("https://x.org", "/"), "https://x.org/");
/// assert_eq!(join_url("/blog", "https://y.org/a"), "https://y.org/a");
/// ```
pub fn join_url(base: &str, path: &str) -> String {
    if path.contains("://") {
        return path.to_string();
    }

    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Route {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Route {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
