use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use folio::{keys, Collection, ContentKind, Item, MetaKey, Metadata, Renderer, Site, StaticFile};
use folio::error::Error;
use folio::markdown::render_markdown;
use folio::route::Route;
use folio::templating::{compose, Engine, Layout, LayoutRef, Layouts, Scope};
use folio::util::{is_template, slugify, PathExt};
use folio::value::{Dict, Value};

use crate::config::Settings;
use crate::issue::{one_line, Issue};
use crate::{CollectionName, Slug, SourcePath, Url};

/// A file ready to be written.
#[derive(Debug)]
pub struct Output {
    pub route: Route,
    /// Relative to the output directory.
    pub path: PathBuf,
    pub contents: Contents,
}

#[derive(Debug)]
pub enum Contents {
    Text(String),
    /// Copied from the absolute source path.
    Copy(Arc<Path>),
}

#[derive(Debug)]
pub struct WrenRenderer<'a> {
    pub engine: &'a dyn Engine,
    pub layouts: &'a Layouts,
    pub issues: &'a Mutex<Vec<Issue>>,
}

/// The `page` an item's templates see: its front matter plus the derived
/// `url`, `collection`, `path` and `date`, and defaults for `slug` and
/// `title`.
pub fn page(collection: &Collection, item: &Item) -> Metadata {
    let mut derived: Vec<(&str, Value)> = vec![
        (CollectionName::KEY, collection.name.clone().into()),
        (SourcePath::KEY, item.relative.to_url_path().into()),
    ];

    if let Some(route) = item.route() {
        derived.push((Url::KEY, route.as_str().into()));
    }

    if let Some(date) = item.date {
        derived.push((keys::Date::KEY, date.into()));
    }

    item.metadata.with_all(derived)
        .with_default(Slug, slugify(&item.stem))
        .with_default(keys::Title, item.stem.clone())
}

/// The `site` global: configuration globals, `url`, `baseurl`, the resolved
/// `skin`, `data`, and every collection's listing under `collections` and,
/// unless configuration uses the name, under its own name.
pub fn globals(settings: &Settings, site: &Site, data: Dict, skin: &str) -> Dict {
    let mut globals = settings.globals.clone();
    let mut collections = Dict::new();
    for collection in &site.collections {
        let listing: Value = collection.listing.iter()
            .map(|item| Value::from(page(collection, item).as_dict().clone()))
            .collect();

        globals.entry(collection.name.clone()).or_insert_with(|| listing.clone());
        collections.insert(collection.name.clone(), listing);
    }

    globals.insert("collections".into(), collections.into());
    globals.insert("data".into(), data.into());
    globals.insert("url".into(), settings.url.as_str().into());
    globals.insert("baseurl".into(), settings.baseurl.as_str().into());
    globals.insert("skin".into(), skin.into());
    globals
}

impl WrenRenderer<'_> {
    /// The layouts wrapping `item`, innermost first. Unknown layouts are
    /// pushed as issues; a cycle fails.
    fn layouts(&self, collection: &Collection, item: &Item, path: &str) -> Result<Vec<Arc<Layout>>, Issue> {
        let name = match LayoutRef::of(&item.metadata) {
            LayoutRef::Unset => collection.layout.as_deref().filter(|name| *name != "none"),
            LayoutRef::Disabled => None,
            LayoutRef::Named(name) => Some(name),
            LayoutRef::Invalid(value) => {
                self.issues.lock().push(Issue::UnknownLayout {
                    path: path.into(),
                    name: value.to_string(),
                    required_by: None,
                });

                None
            }
        };

        let Some(name) = name else {
            return Ok(vec![]);
        };

        let chain = self.layouts.chain(name).map_err(|e| Issue::LayoutCycle(e.to_string()))?;
        if let Some(missing) = chain.missing {
            self.issues.lock().push(Issue::UnknownLayout {
                path: path.into(),
                name: missing.name.to_string(),
                required_by: missing.required_by.map(|name| name.to_string()),
            });
        }

        Ok(chain.layouts)
    }
}

impl Renderer for WrenRenderer<'_> {
    type Render = Output;
    type Error = Issue;

    fn render_item(&self, _: &Site, collection: &Arc<Collection>, item: &Arc<Item>) -> Result<Output, Issue> {
        let path = item.relative.to_url_path();
        let Some(route) = item.route() else {
            return Err(Issue::Template { path, message: "entry has no route".into() });
        };

        let template_error = |e: Error| Issue::Template { path: path.clone(), message: one_line(&e) };
        let page = page(collection, item);
        let body = match is_template(&item.body) {
            true => self.engine.render(&path, &item.body, &Scope::page(&page)).map_err(template_error)?,
            false => item.body.to_string(),
        };

        let html = match item.kind {
            ContentKind::Markdown => render_markdown(&body),
            ContentKind::Html => body,
        };

        let layouts = self.layouts(collection, item, &path)?;
        let html = compose(self.engine, &layouts, html, &page).map_err(template_error)?;
        tracing::debug!(%path, %route, layouts = layouts.len(), "rendered entry");
        Ok(Output { route: route.clone(), path: route.output_path(), contents: Contents::Text(html) })
    }

    fn render_static(&self, _: &Site, file: &Arc<StaticFile>) -> Result<Output, Issue> {
        Ok(Output {
            route: file.route.clone(),
            path: file.relative.to_path_buf(),
            contents: Contents::Copy(file.source.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use folio::templating::minijinja::MiniJinjaEngine;
    use folio::templating::EngineInit;
    use folio::value::Date;

    use super::*;

    fn layouts(sources: &[(&str, &str)]) -> Layouts {
        let mut layouts = Layouts::default();
        for (name, source) in sources {
            let path: Arc<Path> = Path::new("_layouts").join(format!("{name}.html")).into();
            layouts.insert(Layout::parse((*name).into(), path, source).0);
        }

        layouts
    }

    fn site(layout: Option<&str>, entries: &[(&str, &str)]) -> Site {
        let mut posts = Collection::new("posts".into(), Some(Path::new("_posts").into()), true,
            "/:year/:month/:day/:title/".into())
            .with_layout(layout.map(Arc::from));

        for (i, (name, source)) in entries.iter().enumerate() {
            let front = folio::markdown::frontmatter::parse(source).unwrap();
            let relative: Arc<Path> = Path::new("_posts").join(name).into();
            let date = Date::from_ymd(2024, 1, i as u32 + 1);
            let item = Item::new(relative.clone(), relative, "posts".into())
                .with_content(Metadata::new(front.data), front.body.into(), ContentKind::Markdown)
                .with_date(name.trim_end_matches(".md").into(), date, date);

            let route = format!("/2024/01/{:02}/{}/", i + 1, item.stem);
            item.set_route(Route::parse(&route).unwrap()).unwrap();
            posts.push(Arc::new(item));
        }

        posts.finish();
        let mut site = Site::new(Path::new("/site").into());
        site.collections.push(Arc::new(posts));
        site
    }

    fn render(site: &Site, layouts: &Layouts) -> (Result<Vec<Output>, Vec<Issue>>, Vec<Issue>) {
        let settings = Settings::default();
        let globals = globals(&settings, site, Dict::new(), "default");
        let engine = MiniJinjaEngine::init(Arc::new(globals), None);
        let issues = Mutex::new(vec![]);
        let renderer = WrenRenderer { engine: &engine, layouts, issues: &issues };
        let result = renderer.render_site(site);
        (result, issues.into_inner())
    }

    fn text(output: &Output) -> &str {
        match &output.contents {
            Contents::Text(text) => text,
            Contents::Copy(_) => panic!("not rendered"),
        }
    }

    #[test]
    fn derived_page_variables() {
        let site = site(None, &[("hello.md", "---\ntitle: Hello\n---\nHi")]);
        let (collection, item) = site.items().next().unwrap();
        let page = page(collection, item);
        assert_eq!(page.get_raw("url").and_then(Value::as_str), Some("/2024/01/01/hello/"));
        assert_eq!(page.get_raw("collection").and_then(Value::as_str), Some("posts"));
        assert_eq!(page.get_raw("slug").and_then(Value::as_str), Some("hello"));
        assert_eq!(page.get_raw("title").and_then(Value::as_str), Some("Hello"));
        assert_eq!(page.get_raw("date"), Some(&Value::from(Date::from_ymd(2024, 1, 1).unwrap())));
    }

    #[test]
    fn listings_are_exposed_newest_first() {
        let site = site(None, &[("a.md", "A"), ("b.md", "B")]);
        let globals = globals(&Settings::default(), &site, Dict::new(), "dark");
        let titles: Vec<_> = globals["posts"].as_slice().unwrap().iter()
            .map(|page| page.as_dict().unwrap()["title"].to_string())
            .collect();

        assert_eq!(titles, ["b", "a"]);
        assert_eq!(globals["collections"].as_dict().unwrap()["posts"], globals["posts"]);
        assert_eq!(globals["skin"].as_str(), Some("dark"));
    }

    #[test]
    fn layouts_wrap_templated_markdown() {
        let layouts = layouts(&[
            ("base", "<html>{{ content }}</html>"),
            ("post", "---\nlayout: base\n---\n<article>{{ content }}</article>"),
        ]);

        let site = site(Some("post"), &[
            ("a.md", "---\ntitle: T\n---\n# {{ page.title }}"),
            ("b.md", "---\nlayout: none\n---\n*b*"),
        ]);

        let (result, issues) = render(&site, &layouts);
        let outputs = result.unwrap();
        assert!(issues.is_empty());
        assert_eq!(text(&outputs[0]), "<html><article><h1>T</h1>\n</article></html>");
        assert_eq!(outputs[0].path, Path::new("2024/01/01/a/index.html"));
        assert_eq!(text(&outputs[1]), "<p><em>b</em></p>\n");
    }

    #[test]
    fn unknown_layouts_are_entry_issues() {
        let layouts = layouts(&[("post", "---\nlayout: missing\n---\n<article>{{ content }}</article>")]);
        let site = site(None, &[("a.md", "---\nlayout: post\n---\nx"), ("b.md", "---\nlayout: nope\n---\ny")]);

        let (result, issues) = render(&site, &layouts);
        let outputs = result.unwrap();
        assert_eq!(text(&outputs[0]), "<article><p>x</p>\n</article>");
        assert_eq!(text(&outputs[1]), "<p>y</p>\n");
        assert!(issues.contains(&Issue::UnknownLayout {
            path: "_posts/a.md".into(),
            name: "missing".into(),
            required_by: Some("post".into()),
        }));

        assert!(issues.contains(&Issue::UnknownLayout {
            path: "_posts/b.md".into(),
            name: "nope".into(),
            required_by: None,
        }));
    }

    #[test]
    fn cycles_and_template_errors_are_fatal() {
        let layouts = layouts(&[
            ("a", "---\nlayout: b\n---\n{{ content }}"),
            ("b", "---\nlayout: a\n---\n{{ content }}"),
        ]);

        let site = site(Some("a"), &[("x.md", "x"), ("y.md", "---\nlayout: none\n---\n{% if %}")]);
        let (result, _) = render(&site, &layouts);
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], Issue::LayoutCycle(message) if message.contains("a -> b -> a")));
        assert!(matches!(&errors[1], Issue::Template { path, .. } if path == "_posts/y.md"));
    }
}
