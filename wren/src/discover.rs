use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use folio::{error, keys, Collection, ContentKind, Item, Metadata, Site, StaticFile};
use folio::error::{Chainable, Result};
use folio::fstree::FsTree;
use folio::markdown::frontmatter;
use folio::route::Route;
use folio::util::{read_lossy, PathExt};
use folio::value::{read_by_extension, Date, Dict, Value};

use crate::config::Settings;
use crate::issue::{one_line, Issue};

/// A content file awaiting parsing.
#[derive(Debug)]
pub struct Source {
    pub path: Arc<Path>,
    pub relative: Arc<Path>,
    /// Index of the owning collection.
    pub collection: usize,
    pub kind: ContentKind,
}

#[derive(Debug, Default)]
pub struct Discovery {
    pub sources: Vec<Source>,
    pub statics: Vec<StaticFile>,
}

#[derive(Debug)]
pub enum Parsed {
    Item(Item),
    /// An HTML file without front matter outside every collection.
    Static(StaticFile),
    /// Unpublished, or an HTML file without front matter in a collection.
    Skipped,
}

/// Walks `root`, skipping hidden entries and the root-relative `skip` paths.
pub fn walk(root: &Path, settings: &Settings, skip: impl IntoIterator<Item = PathBuf>) -> Result<FsTree> {
    let mut skip: Vec<PathBuf> = skip.into_iter().collect();
    skip.extend(settings.exclude.iter().cloned());
    FsTree::build_with(root, move |path, _| !skip.iter().any(|s| path.starts_with(s)))
}

/// Sorts every file of `tree` into content sources, by owning collection,
/// and static files. `collections` must hold exactly one collection without
/// a directory, which owns content outside every collection directory.
pub fn classify(tree: &FsTree, settings: &Settings, collections: &[Collection]) -> Discovery {
    let pages = collections.iter().position(|c| c.dir.is_none());
    let mut discovery = Discovery::default();
    for entry in tree.files() {
        let relative = &entry.relative;
        let kind = content_kind(settings, relative);
        let owner = owner(collections, relative).or_else(|| match is_special(settings, relative) {
            true => None,
            false => pages,
        });

        match (owner, kind) {
            (Some(collection), Some(kind)) => discovery.sources.push(Source {
                path: entry.path.clone(),
                relative: relative.clone(),
                collection,
                kind,
            }),
            (Some(c), None) if Some(c) == pages && **relative != *settings.stylesheet.entry => {
                discovery.statics.push(StaticFile {
                    source: entry.path.clone(),
                    relative: relative.clone(),
                    route: Route::for_file(relative),
                });
            }
            _ => tracing::trace!(path = %relative.display(), "ignoring file"),
        }
    }

    tracing::debug!(
        content = discovery.sources.len(),
        statics = discovery.statics.len(),
        "discovered files",
    );

    discovery
}

fn content_kind(settings: &Settings, path: &Path) -> Option<ContentKind> {
    if settings.is_markdown(path) {
        return Some(ContentKind::Markdown);
    }

    match path.extension()?.to_str()? {
        "html" | "htm" => Some(ContentKind::Html),
        _ => None,
    }
}

/// The collection whose directory is the longest prefix of `path`.
fn owner(collections: &[Collection], path: &Path) -> Option<usize> {
    collections.iter()
        .enumerate()
        .filter_map(|(i, c)| Some((i, c.dir.as_deref()?)))
        .filter(|(_, dir)| path.starts_with(dir))
        .max_by_key(|(_, dir)| dir.components().count())
        .map(|(i, _)| i)
}

/// Files under an `_`-prefixed directory or a configured special directory
/// belong to no collection unless a collection claims them.
fn is_special(settings: &Settings, path: &Path) -> bool {
    path.components().any(|c| c.as_os_str().to_string_lossy().starts_with('_'))
        || settings.special_dirs().iter().any(|dir| path.starts_with(dir))
}

/// Splits a leading `YYYY-MM-DD-` token from `stem`, which must leave a
/// non-empty rest.
pub fn date_token(stem: &str) -> Option<(Date, &str)> {
    let rest = stem.get(10..)?.strip_prefix('-').filter(|rest| !rest.is_empty())?;
    Some((Date::parse(stem.get(..10)?)?, rest))
}

/// Reads and splits `source`. Problems that leave the entry usable are
/// pushed to `issues`; only I/O errors fail.
pub fn parse(source: &Source, collection: &Collection, issues: &Mutex<Vec<Issue>>) -> Result<Parsed> {
    let (text, lossy) = read_lossy(&source.path)
        .chain_with(|| error!("failed to read content", "path" => source.path.display()))?;

    let path = source.relative.to_url_path();
    if lossy {
        issues.lock().push(Issue::InvalidUtf8 { path: path.clone() });
    }

    if source.kind == ContentKind::Html && !frontmatter::has_front_matter(&text) {
        return Ok(match collection.dir {
            Some(_) => Parsed::Skipped,
            None => Parsed::Static(StaticFile {
                source: source.path.clone(),
                relative: source.relative.clone(),
                route: Route::for_file(&source.relative),
            }),
        });
    }

    let (front, problem) = frontmatter::parse_lenient(&text);
    if let Some(problem) = problem {
        issues.lock().push(Issue::MalformedFrontMatter { path: path.clone(), message: problem.to_string() });
    }

    let metadata = Metadata::new(front.data);
    if let Some(Ok(false)) = metadata.get(keys::Published) {
        tracing::debug!(%path, "skipping unpublished entry");
        return Ok(Parsed::Skipped);
    }

    let file_stem = source.relative.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (token, stem) = match collection.dated {
        true => match date_token(&file_stem) {
            Some((date, rest)) => (Some(date), rest),
            None => {
                issues.lock().push(Issue::MissingDateToken { path: path.clone() });
                (None, file_stem.as_str())
            }
        },
        false => (None, file_stem.as_str()),
    };

    let date = match metadata.get(keys::Date) {
        Some(Ok(date)) => Some(date),
        Some(Err(value)) => {
            tracing::warn!(%path, "ignoring `date` of type {}", value.kind());
            token
        }
        None => token,
    };

    let item = Item::new(source.path.clone(), source.relative.clone(), collection.name.clone())
        .with_content(metadata, front.body.into(), source.kind)
        .with_date(stem.into(), token, date);

    Ok(Parsed::Item(item))
}

/// Groups parsed entries into their collections and builds the site.
pub fn index(
    root: Arc<Path>,
    mut collections: Vec<Collection>,
    sources: &[Source],
    parsed: Vec<Parsed>,
    mut statics: Vec<StaticFile>,
) -> Site {
    for (source, parsed) in sources.iter().zip(parsed) {
        match parsed {
            Parsed::Item(item) => collections[source.collection].push(Arc::new(item)),
            Parsed::Static(file) => statics.push(file),
            Parsed::Skipped => {}
        }
    }

    statics.sort_by(|a, b| a.relative.cmp(&b.relative));
    let mut site = Site::new(root);
    for mut collection in collections {
        collection.finish();
        site.collections.push(Arc::new(collection));
    }

    site.statics = statics.into_iter().map(Arc::new).collect();
    site
}

/// Reads every data file beneath `dir` into a mapping keyed by its path
/// relative to `dir` without the extension.
pub fn load_data(tree: &FsTree, dir: &Path, issues: &Mutex<Vec<Issue>>) -> Dict {
    let mut data = Dict::new();
    for entry in tree.files_under(dir) {
        let Ok(relative) = entry.relative.strip_prefix(dir) else { continue };
        match read_by_extension::<Value>(&entry.path) {
            Some(Ok(value)) => {
                data.insert(relative.without_extension().to_url_path().into(), value);
            }
            Some(Err(e)) => issues.lock().push(Issue::MalformedData {
                path: entry.relative.to_url_path(),
                message: one_line(&e),
            }),
            None => tracing::debug!(path = %entry.relative.display(), "ignoring non-data file"),
        }
    }

    data
}
