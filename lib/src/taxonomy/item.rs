use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::route::Route;
use crate::taxonomy::*;
use crate::value::Date;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// Converted from Markdown to HTML.
    Markdown,
    /// Emitted as-is after templating.
    Html,
}

/// A content file: front matter plus body, belonging to exactly one
/// collection.
///
/// Everything but the route is fixed at construction. The route is assigned
/// exactly once, after every item is known.
#[derive(Debug)]
pub struct Item {
    /// Absolute path to the source file.
    pub source: Arc<Path>,
    /// Path relative to the site root. Identifies the item.
    pub relative: Arc<Path>,
    pub collection: Arc<str>,
    pub metadata: Metadata,
    pub body: Arc<str>,
    pub kind: ContentKind,
    /// The file name without its date token or extension.
    pub stem: Arc<str>,
    /// The date from the file name's `YYYY-MM-DD-` token.
    pub date_token: Option<Date>,
    /// The effective date: front matter `date`, else the date token.
    pub date: Option<Date>,
    route: OnceLock<Route>,
}

impl Item {
    pub fn new(source: Arc<Path>, relative: Arc<Path>, collection: Arc<str>) -> Self {
        let stem = relative.file_stem()
            .map(|s| s.to_string_lossy().into())
            .unwrap_or_else(|| "".into());

        Item {
            source,
            relative,
            collection,
            metadata: Metadata::default(),
            body: "".into(),
            kind: ContentKind::Markdown,
            stem,
            date_token: None,
            date: None,
            route: OnceLock::new(),
        }
    }

    pub fn with_content(mut self, metadata: Metadata, body: Arc<str>, kind: ContentKind) -> Self {
        self.metadata = metadata;
        self.body = body;
        self.kind = kind;
        self
    }

    pub fn with_date(mut self, stem: Arc<str>, token: Option<Date>, date: Option<Date>) -> Self {
        self.stem = stem;
        self.date_token = token;
        self.date = date;
        self
    }

    pub fn file_name(&self) -> &str {
        self.relative.file_name().and_then(|s| s.to_str()).unwrap_or_default()
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.get()
    }

    /// Assigns the route. Returns the route back if one was already set.
    pub fn set_route(&self, route: Route) -> Result<(), Route> {
        self.route.set(route)
    }
}

/// A file copied verbatim to its root-relative route.
#[derive(Debug, Clone)]
pub struct StaticFile {
    pub source: Arc<Path>,
    pub relative: Arc<Path>,
    pub route: Route,
}
