use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use folio::{err, error, Collection};
use folio::error::{Chainable, Result};
use folio::route::validate_pattern;
use folio::value::{Dict, Format, Toml, Yaml};

use crate::{CONFIG_FILES, PAGES, POSTS};

/// Site configuration. Every key without a meaning of its own is a global,
/// exposed to templates as `site.<key>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The scheme and host the site is served from.
    pub url: String,
    /// The path prefix the site is served under.
    pub baseurl: String,
    pub skin: Option<String>,
    pub layouts_dir: PathBuf,
    pub includes_dir: PathBuf,
    pub sass_dir: PathBuf,
    pub data_dir: PathBuf,
    pub stylesheet: Stylesheet,
    pub markdown_ext: Vec<String>,
    pub exclude: Vec<PathBuf>,
    pub collections: BTreeMap<String, CollectionSettings>,
    /// The default layout by collection name.
    pub defaults: BTreeMap<String, String>,
    #[serde(flatten)]
    pub globals: Dict,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Stylesheet {
    /// The root-relative entry file.
    pub entry: PathBuf,
    /// The root-relative output file. Defaults to `entry` with a `.css`
    /// extension.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    pub dir: Option<PathBuf>,
    pub dated: Option<bool>,
    pub permalink: Option<String>,
    pub layout: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            url: String::new(),
            baseurl: String::new(),
            skin: None,
            layouts_dir: "_layouts".into(),
            includes_dir: "_includes".into(),
            sass_dir: "_sass".into(),
            data_dir: "_data".into(),
            stylesheet: Stylesheet::default(),
            markdown_ext: vec!["md".into(), "markdown".into()],
            exclude: vec![],
            collections: BTreeMap::new(),
            defaults: BTreeMap::new(),
            globals: Dict::new(),
        }
    }
}

impl Default for Stylesheet {
    fn default() -> Self {
        Stylesheet { entry: "assets/css/main.scss".into(), output: None }
    }
}

impl Stylesheet {
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(output) => output.clone(),
            None => self.entry.with_extension("css"),
        }
    }
}

impl Settings {
    /// Reads and validates the first of [`CONFIG_FILES`] in `root`. Returns
    /// the defaults if there is none, along with the root-relative path of
    /// the file read.
    pub fn load(root: &Path) -> Result<(Settings, Option<PathBuf>)> {
        let Some(name) = CONFIG_FILES.iter().find(|name| root.join(name).is_file()) else {
            tracing::debug!("no configuration file: using defaults");
            return Ok((Settings::default(), None));
        };

        let path = root.join(name);
        let source = std::fs::read_to_string(&path)
            .chain_with(|| error!("failed to read configuration", "path" => path.display()))?;

        let invalid = || error!("invalid configuration", "path" => path.display());
        let settings: Settings = match source.trim().is_empty() {
            true => Settings::default(),
            false if name.ends_with(".toml") => Toml::from_str(&source).chain_with(invalid)?,
            false => Yaml::from_str(&source).chain_with(invalid)?,
        };

        settings.validate().chain_with(invalid)?;
        tracing::debug!(config = %name, "loaded configuration");
        Ok((settings, Some(PathBuf::from(name))))
    }

    /// Checks that collection names, directories and permalink patterns are
    /// usable.
    pub fn validate(&self) -> Result<()> {
        if self.collections.contains_key(PAGES) {
            return err!("`pages` is a reserved collection name");
        }

        let mut dirs: FxHashMap<PathBuf, Arc<str>> = FxHashMap::default();
        for collection in self.collections() {
            let Some(dir) = &collection.dir else { continue };
            if !is_relative_and_normal(dir) {
                return err! {
                    "collection directory must be a relative path within the site",
                    "collection" => &collection.name,
                    "directory" => dir.display(),
                };
            }

            if let Some(existing) = dirs.insert(dir.to_path_buf(), collection.name.clone()) {
                return err! {
                    "two collections share a directory",
                    "directory" => dir.display(),
                    "collections" => format!("{existing}, {}", collection.name),
                };
            }

            validate_pattern(&collection.permalink).chain_with(|| error! {
                "invalid collection permalink",
                "collection" => &collection.name,
            })?;
        }

        for path in [&self.layouts_dir, &self.includes_dir, &self.sass_dir, &self.data_dir] {
            if !is_relative_and_normal(path) {
                return err!("directory must be a relative path within the site", "path" => path.display());
            }
        }

        Ok(())
    }

    /// The configured collections, `posts` first unless it is configured,
    /// without any items.
    pub fn collections(&self) -> Vec<Collection> {
        let default = CollectionSettings::default();
        let posts = (!self.collections.contains_key(POSTS)).then_some((POSTS, &default));

        posts.into_iter()
            .chain(self.collections.iter().map(|(name, c)| (name.as_str(), c)))
            .map(|(name, settings)| self.collection(name, settings))
            .collect()
    }

    fn collection(&self, name: &str, settings: &CollectionSettings) -> Collection {
        let is_posts = name == POSTS;
        let dir = settings.dir.clone().unwrap_or_else(|| format!("_{name}").into());
        let dated = settings.dated.unwrap_or(is_posts);
        let permalink = match (&settings.permalink, is_posts) {
            (Some(permalink), _) => permalink.as_str(),
            (None, true) => "/:year/:month/:day/:title/",
            (None, false) => "/:collection/:path/",
        };

        Collection::new(name.into(), Some(dir.into()), dated, permalink.into())
            .with_layout(self.default_layout(name, settings.layout.as_deref()))
    }

    /// The implicit collection of every content file outside a collection
    /// directory.
    pub fn pages(&self) -> Collection {
        Collection::new(PAGES.into(), None, false, "/:path/".into())
            .with_layout(self.default_layout(PAGES, None))
    }

    fn default_layout(&self, collection: &str, configured: Option<&str>) -> Option<Arc<str>> {
        configured.or_else(|| self.defaults.get(collection).map(|s| s.as_str()))
            .map(Arc::from)
    }

    /// Returns `true` if `path` has one of the Markdown extensions.
    pub fn is_markdown(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.markdown_ext.iter().any(|m| m.eq_ignore_ascii_case(ext)))
    }

    /// Directories holding layouts, includes, sass partials or data, which
    /// are never content.
    pub fn special_dirs(&self) -> [&Path; 4] {
        [&self.layouts_dir, &self.includes_dir, &self.sass_dir, &self.data_dir]
    }
}

fn is_relative_and_normal(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().next().is_some()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use folio::value::Value;

    use super::*;

    fn load(name: &str, source: &str) -> Result<Settings> {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(name), source).unwrap();
        Settings::load(dir.path()).map(|(settings, _)| settings)
    }

    #[test]
    fn defaults_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, file) = Settings::load(dir.path()).unwrap();
        assert!(file.is_none());
        assert_eq!(settings.layouts_dir, Path::new("_layouts"));
        assert_eq!(settings.stylesheet.output_path(), Path::new("assets/css/main.css"));

        let collections = settings.collections();
        assert_eq!(collections.len(), 1);
        assert_eq!(&*collections[0].name, "posts");
        assert!(collections[0].dated);
        assert_eq!(&*collections[0].permalink, "/:year/:month/:day/:title/");
        assert_eq!(collections[0].dir.as_deref(), Some(Path::new("_posts")));
    }

    #[test]
    fn yaml_configuration() {
        let settings = load("_config.yml", "\
title: My Blog
baseurl: /blog
skin: dark
collections:
  notes:
    layout: note
  posts:
    permalink: /blog/:title/
defaults:
  pages: page
  posts: post
").unwrap();

        assert_eq!(settings.baseurl, "/blog");
        assert_eq!(settings.skin.as_deref(), Some("dark"));
        assert_eq!(settings.globals.get("title"), Some(&Value::from("My Blog")));
        assert!(!settings.globals.contains_key("collections"));

        let collections = settings.collections();
        let names: Vec<_> = collections.iter().map(|c| &*c.name).collect();
        assert_eq!(names, ["notes", "posts"]);
        assert_eq!(collections[0].dir.as_deref(), Some(Path::new("_notes")));
        assert_eq!(&*collections[0].permalink, "/:collection/:path/");
        assert_eq!(collections[0].layout.as_deref(), Some("note"));
        assert!(!collections[0].dated);
        assert!(collections[1].dated);
        assert_eq!(&*collections[1].permalink, "/blog/:title/");
        assert_eq!(collections[1].layout.as_deref(), Some("post"));
        assert_eq!(settings.pages().layout.as_deref(), Some("page"));
    }

    #[test]
    fn toml_configuration() {
        let settings = load("_config.toml", "url = \"https://example.org\"\nauthor = \"Ann\"\n").unwrap();
        assert_eq!(settings.url, "https://example.org");
        assert_eq!(settings.globals.get("author"), Some(&Value::from("Ann")));
        assert!(load("_config.yml", "").is_ok());
    }

    #[test]
    fn invalid_configurations() {
        assert!(load("_config.yml", "collections:\n  pages: {}\n").is_err());
        assert!(load("_config.yml", "collections:\n  notes:\n    permalink: /:category/:title/\n").is_err());
        assert!(load("_config.yml", "collections:\n  notes:\n    permalink: notes/:title/\n").is_err());
        assert!(load("_config.yml", "collections:\n  a:\n    dir: x\n  b:\n    dir: x\n").is_err());
        assert!(load("_config.yml", "collections:\n  a:\n    dir: ../x\n").is_err());
        assert!(load("_config.yml", "skin: [\n").is_err());

        let error = load("_config.yml", "collections:\n  pages: {}\n").unwrap_err();
        assert!(error.to_string().contains("reserved"));
    }
}
