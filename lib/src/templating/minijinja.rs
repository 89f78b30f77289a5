use std::path::Path;
use std::sync::Arc;

use minijinja::{context, path_loader, Environment};
use minijinja::value::Value;

use crate::error::Result;
use crate::templating::{Engine, EngineInit, Scope};
use crate::value::Dict;

#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Result<Environment<'static>>,
}

fn try_init(globals: Arc<Dict>, includes: Option<&Path>) -> Result<Environment<'static>> {
    let mut env = Environment::new();
    if let Some(dir) = includes {
        if !dir.is_dir() {
            return err!("includes directory does not exist", "path" => dir.display());
        }

        env.set_loader(path_loader(dir));
    }

    env.add_global("site", value_object::dict(globals));
    env.add_function("now", ext::now);
    env.add_filter("date", ext::date);
    env.add_filter("relative_url", ext::relative_url);
    env.add_filter("absolute_url", ext::absolute_url);
    env.add_filter("slugify", ext::slugify);
    Ok(env)
}

impl EngineInit for MiniJinjaEngine {
    type Engine = Self;

    fn init(globals: Arc<Dict>, includes: Option<&Path>) -> Self::Engine {
        MiniJinjaEngine { env: try_init(globals, includes) }
    }
}

impl Engine for MiniJinjaEngine {
    fn render(&self, name: &str, template: &str, scope: &Scope<'_>) -> Result<String> {
        let env = self.env.as_ref().map_err(|e| e.clone())?;
        let context = context! {
            page => value_object::dict(scope.page.as_dict().clone()),
            layout => scope.layout.map(|m| value_object::dict(m.as_dict().clone())),
            content => scope.content.map(|c| Value::from_safe_string(c.to_string())),
        };

        Ok(env.render_named_str(name, template, context)?)
    }
}

mod ext {
    use minijinja::{value::Value, Error, ErrorKind, State};

    use crate::route::join_url;
    use crate::value::Date;

    trait Ext {
        fn find(self, key: &str) -> Result<Value, Error>;
    }

    impl Ext for Value {
        fn find(self, key: &str) -> Result<Value, Error> {
            if key.is_empty() {
                return Ok(self);
            }

            let mut value = self;
            for attr in key.split('.') {
                let attr = value.get_attr(attr)?;

                if attr.is_undefined() {
                    return Err(Error::new(
                        ErrorKind::UndefinedError,
                        format!("missing key {key} in {value:#?}")
                    ));
                }

                value = attr;
            }

            Ok(value)
        }
    }

    impl Ext for &State<'_, '_> {
        fn find(self, key: &str) -> Result<Value, Error> {
            let (base, key) = key.split_once('.').unwrap_or((key, ""));
            let base_val = self.lookup(base)
                .filter(|v| !v.is_undefined())
                .ok_or_else(|| Error::new(
                    ErrorKind::MissingArgument,
                    format!("expected {base} in context but it wasn't found")
                ))?;

            base_val.find(key)
        }
    }

    /// The string at `key`, or `""` if it isn't set.
    fn find_str(state: &State<'_, '_>, key: &str) -> String {
        state.find(key).ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default()
    }

    pub fn relative_url(state: &State<'_, '_>, path: &str) -> String {
        join_url(&find_str(state, "site.baseurl"), path)
    }

    pub fn absolute_url(state: &State<'_, '_>, path: &str) -> String {
        let relative = relative_url(state, path);
        join_url(&find_str(state, "site.url"), &relative)
    }

    pub fn slugify(value: &str) -> String {
        crate::util::slugify(value)
    }

    pub fn date(value: Value, fmt: &str) -> Result<String, Error> {
        let date = match i64::try_from(value.clone()).ok() {
            Some(ts) => Date::from_timestamp(ts),
            None => value.as_str().and_then(Date::parse),
        };

        let date = date.ok_or_else(|| Error::new(
            ErrorKind::InvalidOperation,
            format!("`date` must be applied to a date or timestamp, found {value}")
        ))?;

        date.format(fmt).ok_or_else(|| Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid date format `{fmt}`")
        ))
    }

    pub fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

mod value_object {
    use std::sync::Arc;

    use minijinja::value::{Enumerator, Object, ObjectRepr, Value};

    use crate::value::{self, Num};

    #[derive(Debug)]
    struct Dict(Arc<value::Dict>);

    #[derive(Debug)]
    struct Array(Arc<Vec<value::Value>>);

    pub fn dict(dict: Arc<value::Dict>) -> Value {
        Value::from_object(Dict(dict))
    }

    pub fn to_value(value: &value::Value) -> Value {
        match value {
            value::Value::Null => Value::from(()),
            value::Value::Bool(b) => Value::from(*b),
            value::Value::Num(Num::Int(v)) => Value::from(*v),
            value::Value::Num(Num::UInt(v)) => Value::from(*v),
            value::Value::Num(Num::Float(v)) => Value::from(*v),
            value::Value::String(s) => Value::from(s.clone()),
            value::Value::Date(d) => Value::from(d.to_string()),
            value::Value::Array(a) => Value::from_object(Array(a.clone())),
            value::Value::Dict(d) => dict(d.clone()),
        }
    }

    impl Object for Dict {
        fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
            self.0.get(key.as_str()?).map(to_value)
        }

        fn enumerate(self: &Arc<Self>) -> Enumerator {
            Enumerator::Values(self.0.keys().map(|k| Value::from(k.clone())).collect())
        }
    }

    impl Object for Array {
        fn repr(self: &Arc<Self>) -> ObjectRepr {
            ObjectRepr::Seq
        }

        fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
            self.0.get(key.as_usize()?).map(to_value)
        }

        fn enumerate(self: &Arc<Self>) -> Enumerator {
            Enumerator::Seq(self.0.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::taxonomy::Metadata;
    use crate::value::{Date, Value as FolioValue};

    fn engine() -> MiniJinjaEngine {
        let posts: FolioValue = vec![
            FolioValue::Dict(Arc::new(crate::dict! { "title" => "Second", "url" => "/2/" })),
            FolioValue::Dict(Arc::new(crate::dict! { "title" => "First", "url" => "/1/" })),
        ].into();

        let globals = crate::dict! {
            "title" => "My Blog",
            "baseurl" => "/blog",
            "url" => "https://example.org",
            "posts" => posts,
        };

        MiniJinjaEngine::init(Arc::new(globals), None)
    }

    fn render(template: &str, page: &Metadata) -> String {
        engine().render("test.md", template, &Scope::page(page)).unwrap()
    }

    #[test]
    fn globals_and_page() {
        let page = Metadata::from(crate::dict! { "title" => "Hi", "tags" => vec!["a", "b"] });
        assert_eq!(render("{{ page.title }} | {{ site.title }}", &page), "Hi | My Blog");
        assert_eq!(render("{{ page.tags | join(',') }}", &page), "a,b");
        assert_eq!(render("{% for p in site.posts %}{{ p.title }};{% endfor %}", &page), "Second;First;");
        assert_eq!(render("{{ site.posts | length }}", &page), "2");
    }

    #[test]
    fn filters() {
        let page = Metadata::from(crate::dict! {
            "date" => Date::parse("2024-01-09 08:05:00").unwrap(),
            "title" => "Héllo Wörld",
        });

        assert_eq!(render("{{ page.date | date('%Y/%m/%d %H:%M') }}", &page), "2024/01/09 08:05");
        assert_eq!(render("{{ '/about/' | relative_url }}", &page), "/blog/about/");
        assert_eq!(render("{{ '/about/' | absolute_url }}", &page), "https://example.org/blog/about/");
        assert_eq!(render("{{ page.title | slugify }}", &page), "hello-world");
        assert!(engine().render("x", "{{ page.title | date('%Y') }}", &Scope::page(&page)).is_err());
        assert!(!render("{{ now() | date('%Y') }}", &page).is_empty());
    }

    #[test]
    fn content_is_not_escaped() {
        let page = Metadata::default();
        let scope = Scope { page: &page, layout: None, content: Some("<p>x & y</p>") };
        let html = engine().render("default.html", "<main>{{ content }}</main>", &scope).unwrap();
        assert_eq!(html, "<main><p>x & y</p></main>");
    }

    #[test]
    fn includes_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nav.html"), "<nav>{{ site.title }}</nav>").unwrap();

        let engine = MiniJinjaEngine::init(Arc::new(crate::dict! { "title" => "T" }), Some(dir.path()));
        let page = Metadata::default();
        let html = engine.render("page.html", "{% include 'nav.html' %}", &Scope::page(&page)).unwrap();
        assert_eq!(html, "<nav>T</nav>");

        let missing = MiniJinjaEngine::init(Arc::default(), Some(&dir.path().join("nope")));
        assert!(missing.render("x", "hi", &Scope::page(&page)).is_err());
    }

    #[test]
    fn syntax_errors_are_reported() {
        let page = Metadata::default();
        let error = engine().render("broken.md", "{% if %}", &Scope::page(&page)).unwrap_err();
        assert!(error.to_string().contains("broken.md"));
    }
}
