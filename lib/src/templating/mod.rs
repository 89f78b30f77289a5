pub mod minijinja;
mod layout;

pub use layout::*;

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::taxonomy::Metadata;
use crate::value::Dict;

/// The variables a template is rendered with, in addition to the `site`
/// global.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// Exposed as `page`.
    pub page: &'a Metadata,
    /// Exposed as `layout`: the front matter of the layout being rendered.
    pub layout: Option<&'a Metadata>,
    /// Exposed as `content`, marked safe.
    pub content: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn page(page: &'a Metadata) -> Self {
        Scope { page, layout: None, content: None }
    }
}

pub trait EngineInit {
    type Engine: Engine + 'static;

    /// Creates an engine exposing `globals` as `site`, loading includes from
    /// the absolute directory `includes`, if any.
    fn init(globals: Arc<Dict>, includes: Option<&Path>) -> Self::Engine;
}

pub trait Engine: Send + Sync + Debug {
    /// Renders the template source `template`. `name` identifies the template
    /// in errors and selects auto-escaping by its extension.
    fn render(&self, name: &str, template: &str, scope: &Scope<'_>) -> Result<String>;
}
