use std::path::Path;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Chainable, ErrorDetail, Result};
use crate::fstree::FsTree;
use crate::markdown::frontmatter::{self, FrontMatterError};
use crate::taxonomy::Metadata;
use crate::templating::{Engine, Scope};
use crate::util::{read_lossy, PathExt};
use crate::value::Value;

/// A template that wraps rendered content at its `{{ content }}` insertion
/// point, itself optionally wrapped by a parent layout.
#[derive(Debug, Clone)]
pub struct Layout {
    /// The path of the file relative to the layouts directory, without its
    /// extension.
    pub name: Arc<str>,
    /// Root-relative path to the source file.
    pub path: Arc<Path>,
    pub metadata: Metadata,
    pub template: Arc<str>,
    pub parent: Option<Arc<str>>,
}

/// How a front matter mapping selects its layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutRef<'a> {
    /// No `layout` key.
    Unset,
    /// `layout: none`, `layout: null`, `layout: false` or an empty name.
    Disabled,
    Named(&'a str),
    /// A `layout` value of any other type.
    Invalid(&'a Value),
}

impl<'a> LayoutRef<'a> {
    pub fn of(metadata: &'a Metadata) -> LayoutRef<'a> {
        match metadata.get_raw("layout") {
            None => LayoutRef::Unset,
            Some(Value::Null) | Some(Value::Bool(false)) => LayoutRef::Disabled,
            Some(Value::String(s)) if s.is_empty() || &**s == "none" => LayoutRef::Disabled,
            Some(Value::String(s)) => LayoutRef::Named(s),
            Some(other) => LayoutRef::Invalid(other),
        }
    }
}

/// The layouts of a chain, innermost first.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    pub layouts: Vec<Arc<Layout>>,
    /// The name the chain stopped at because no such layout exists.
    pub missing: Option<Missing>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Missing {
    pub name: Arc<str>,
    /// The layout naming the missing one as its parent, or `None` if the
    /// chain's first name is missing.
    pub required_by: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout `{repeated}` is its own ancestor: {}", display_cycle(.chain, .repeated))]
    Cycle { chain: Vec<Arc<str>>, repeated: Arc<str> },
}

impl ErrorDetail for LayoutError { }

fn display_cycle(chain: &[Arc<str>], repeated: &str) -> String {
    let mut names: Vec<&str> = chain.iter().map(|n| &**n).collect();
    names.push(repeated);
    names.join(" -> ")
}

impl Layout {
    /// Parses the layout `name` from `source`. A malformed front matter block
    /// is returned alongside the layout, which then has empty front matter.
    pub fn parse(
        name: Arc<str>,
        path: Arc<Path>,
        source: &str,
    ) -> (Layout, Option<FrontMatterError>) {
        let (front, error) = frontmatter::parse_lenient(source);
        let metadata = Metadata::new(front.data);
        let parent = match LayoutRef::of(&metadata) {
            LayoutRef::Named(parent) => Some(Arc::from(parent)),
            LayoutRef::Invalid(value) => {
                tracing::warn!(layout = %name, "ignoring `layout` of type {}", value.kind());
                None
            }
            LayoutRef::Unset | LayoutRef::Disabled => None,
        };

        let layout = Layout { name, path, metadata, template: front.body.into(), parent };
        (layout, error)
    }

    /// The template name: the root-relative path, for error messages and
    /// auto-escaping.
    pub fn template_name(&self) -> String {
        self.path.to_url_path()
    }
}

/// A problem with a layout file that still yields a layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadProblem {
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),
    #[error("not valid UTF-8: invalid bytes were replaced")]
    NotUtf8,
}

#[derive(Debug, Clone, Default)]
pub struct Layouts {
    map: FxHashMap<Arc<str>, Arc<Layout>>,
}

impl Layouts {
    /// Loads every file beneath the root-relative directory `dir` of `tree`
    /// as a layout. Returns the layouts and every problem that left a layout
    /// usable, by layout path.
    pub fn load(tree: &FsTree, dir: &Path) -> Result<(Layouts, Vec<(Arc<Path>, LoadProblem)>)> {
        let mut layouts = Layouts::default();
        let mut problems = vec![];
        for entry in tree.files_under(dir) {
            let (source, lossy) = read_lossy(&entry.path)
                .chain_with(|| error!("failed to read layout", "path" => entry.path.display()))?;

            if lossy {
                problems.push((entry.relative.clone(), LoadProblem::NotUtf8));
            }

            let name = match entry.relative.strip_prefix(dir) {
                Ok(relative) => relative.without_extension().to_url_path(),
                Err(_) => continue,
            };

            let (layout, problem) = Layout::parse(name.into(), entry.relative.clone(), &source);
            if let Some(problem) = problem {
                problems.push((entry.relative.clone(), problem.into()));
            }

            if let Some(existing) = layouts.get(&layout.name) {
                tracing::warn!(
                    layout = %layout.name,
                    "ignoring {} in favor of {}",
                    layout.path.display(), existing.path.display(),
                );

                continue;
            }

            layouts.insert(layout);
        }

        Ok((layouts, problems))
    }

    pub fn insert(&mut self, layout: Layout) {
        self.map.insert(layout.name.clone(), Arc::new(layout));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Layout>> {
        self.map.get(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Resolves the chain of layouts starting at `name` by following parents.
    /// A name without a layout truncates the chain; a name seen twice is a
    /// cycle.
    pub fn chain(&self, name: &str) -> Result<Chain, LayoutError> {
        let mut chain = Chain::default();
        let mut visited = FxHashSet::default();
        let mut next: Option<(Arc<str>, Option<Arc<str>>)> = Some((name.into(), None));

        while let Some((name, required_by)) = next.take() {
            if !visited.insert(name.clone()) {
                return Err(LayoutError::Cycle {
                    chain: chain.layouts.iter().map(|l| l.name.clone()).collect(),
                    repeated: name,
                });
            }

            let Some(layout) = self.map.get(&name) else {
                chain.missing = Some(Missing { name, required_by });
                break;
            };

            next = layout.parent.clone().map(|parent| (parent, Some(layout.name.clone())));
            chain.layouts.push(layout.clone());
        }

        Ok(chain)
    }
}

/// Wraps `content` in every layout of `chain`, innermost first. Each layout
/// sees `page`, its own front matter as `layout`, and the content rendered so
/// far as `content`.
pub fn compose<E>(engine: &E, chain: &[Arc<Layout>], content: String, page: &Metadata) -> Result<String>
    where E: Engine + ?Sized
{
    chain.iter().try_fold(content, |content, layout| {
        let scope = Scope { page, layout: Some(&layout.metadata), content: Some(content.as_str()) };
        engine.render(&layout.template_name(), &layout.template, &scope)
            .chain_with(|| error!("failed to render layout", "layout" => &layout.name))
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::templating::minijinja::MiniJinjaEngine;
    use crate::templating::EngineInit;

    fn layouts(sources: &[(&str, &str)]) -> Layouts {
        let mut layouts = Layouts::default();
        for (name, source) in sources {
            let path: Arc<Path> = Path::new("_layouts").join(format!("{name}.html")).into();
            let (layout, error) = Layout::parse((*name).into(), path, source);
            assert!(error.is_none());
            layouts.insert(layout);
        }

        layouts
    }

    fn names(chain: &Chain) -> Vec<&str> {
        chain.layouts.iter().map(|l| &*l.name).collect()
    }

    #[test]
    fn two_layout_cycle_is_detected() {
        let layouts = layouts(&[("a", "---\nlayout: b\n---\nA"), ("b", "---\nlayout: a\n---\nB")]);
        let error = layouts.chain("a").unwrap_err();
        assert_eq!(error, LayoutError::Cycle {
            chain: vec!["a".into(), "b".into()],
            repeated: "a".into(),
        });

        assert!(error.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn self_cycle_is_detected() {
        let layouts = layouts(&[("loop", "---\nlayout: loop\n---\n{{ content }}")]);
        assert!(matches!(layouts.chain("loop"), Err(LayoutError::Cycle { repeated, .. }) if &*repeated == "loop"));
    }

    #[test]
    fn missing_parent_truncates() {
        let layouts = layouts(&[("post", "---\nlayout: base\n---\n{{ content }}")]);
        let chain = layouts.chain("post").unwrap();
        assert_eq!(names(&chain), ["post"]);
        assert_eq!(chain.missing, Some(Missing { name: "base".into(), required_by: Some("post".into()) }));

        let chain = layouts.chain("nope").unwrap();
        assert!(chain.layouts.is_empty());
        assert_eq!(chain.missing.unwrap().required_by, None);
    }

    #[test]
    fn disabled_parents_end_the_chain() {
        let layouts = layouts(&[
            ("a", "---\nlayout: none\n---\nA"),
            ("b", "---\nlayout: false\n---\nB"),
            ("c", "---\nlayout:\n---\nC"),
        ]);

        for name in ["a", "b", "c"] {
            let chain = layouts.chain(name).unwrap();
            assert_eq!(names(&chain), [name]);
            assert!(chain.missing.is_none());
        }
    }

    #[test]
    fn composes_innermost_first() {
        let layouts = layouts(&[
            ("base", "<html>{{ content }}</html>"),
            ("post", "---\nlayout: base\nkind: article\n---\n<{{ layout.kind }}>{{ content }}</{{ layout.kind }}>"),
        ]);

        let engine = MiniJinjaEngine::init(Arc::default(), None);
        let chain = layouts.chain("post").unwrap();
        assert_eq!(names(&chain), ["post", "base"]);

        let page = Metadata::from(crate::dict! { "title" => "T" });
        let html = compose(&engine, &chain.layouts, "<h1>T</h1>".into(), &page).unwrap();
        assert_eq!(html, "<html><article><h1>T</h1></article></html>");
    }

    #[test]
    fn loads_from_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("_layouts/nested")).unwrap();
        std::fs::write(dir.path().join("_layouts/default.html"), "{{ content }}").unwrap();
        std::fs::write(dir.path().join("_layouts/nested/post.html"), "---\nlayout: default\n---\nx").unwrap();
        std::fs::write(dir.path().join("_layouts/bad.html"), "---\nlayout: [\n---\ny").unwrap();

        let tree = FsTree::build(dir.path()).unwrap();
        let (layouts, problems) = Layouts::load(&tree, Path::new("_layouts")).unwrap();
        assert_eq!(layouts.len(), 3);
        assert_eq!(problems.len(), 1);
        assert_eq!(&*problems[0].0, Path::new("_layouts/bad.html"));
        assert!(matches!(problems[0].1, LoadProblem::FrontMatter(_)));
        assert_eq!(names(&layouts.chain("nested/post").unwrap()), ["nested/post", "default"]);
    }

    #[test]
    fn invalid_utf8_layouts_load_lossily() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("_layouts")).unwrap();
        std::fs::write(dir.path().join("_layouts/latin1.html"), b"caf\xe9 {{ content }}").unwrap();

        let tree = FsTree::build(dir.path()).unwrap();
        let (layouts, problems) = Layouts::load(&tree, Path::new("_layouts")).unwrap();
        assert_eq!(problems, [(Arc::from(Path::new("_layouts/latin1.html")), LoadProblem::NotUtf8)]);
        assert_eq!(&*layouts.get("latin1").unwrap().template, "caf\u{fffd} {{ content }}");
    }
}
