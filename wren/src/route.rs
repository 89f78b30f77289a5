use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use folio::{keys, Collection, Item, Site};
use folio::rayon::prelude::*;
use folio::route::{expand, Route, RouteError};
use folio::util::{slugify, titleize, PathExt};

use crate::issue::Issue;

/// The pattern for entries of a dated collection that have no date.
pub const UNDATED: &str = "/:collection/:title/";

/// Every claim on an output file, keyed by the file's path relative to the
/// output directory.
#[derive(Debug, Default)]
pub struct Claims {
    map: DashMap<PathBuf, Vec<(Route, Arc<Path>)>>,
}

impl Claims {
    pub fn claim(&self, output: PathBuf, route: Route, claimant: Arc<Path>) {
        self.map.entry(output).or_default().push((route, claimant));
    }

    /// A [`Issue::RouteCollision`] for every output file claimed more than
    /// once, sorted.
    pub fn collisions(&self) -> Vec<Issue> {
        let mut collisions: Vec<Issue> = self.map.iter()
            .filter(|claims| claims.value().len() > 1)
            .map(|claims| {
                let route = claims.value().iter().map(|(route, _)| route).min();
                let mut claimants: Vec<String> = claims.value().iter()
                    .map(|(_, path)| path.to_url_path())
                    .collect();

                claimants.sort();
                Issue::RouteCollision {
                    route: route.map(|r| r.to_string()).unwrap_or_default(),
                    claimants,
                }
            })
            .collect();

        collisions.sort();
        collisions
    }
}

/// Resolves and assigns the route of every item of `site` in parallel, then
/// claims the output of every item and static file.
pub fn assign(site: &Site, claims: &Claims, issues: &Mutex<Vec<Issue>>) {
    site.collections.par_iter().for_each(|collection| {
        collection.items.par_iter().for_each(|item| {
            let (route, issue) = resolve(collection, item);
            if let Some(issue) = issue {
                issues.lock().push(issue);
            }

            claims.claim(route.output_path(), route.clone(), item.relative.clone());
            if item.set_route(route).is_err() {
                tracing::warn!(path = %item.relative.display(), "entry is already routed");
            }
        })
    });

    for file in &site.statics {
        claims.claim(file.relative.to_path_buf(), file.route.clone(), file.relative.clone());
    }
}

/// The route of `item`: its valid explicit permalink, else its default
/// route. An invalid permalink is returned as an issue.
pub fn resolve(collection: &Collection, item: &Item) -> (Route, Option<Issue>) {
    let invalid = |message: String| Issue::InvalidPermalink {
        path: item.relative.to_url_path(),
        message,
    };

    let problem = match item.metadata.get(keys::Permalink) {
        Some(Ok(permalink)) => match Route::parse(&permalink) {
            Ok(route) => return (route, None),
            Err(e) => Some(invalid(e.to_string())),
        },
        Some(Err(value)) => Some(invalid(format!("expected a string, found a {}", value.kind()))),
        None => None,
    };

    match default_route(collection, item) {
        Ok(route) => (route, problem),
        Err(e) => (Route::for_page(&item.relative), problem.or_else(|| Some(invalid(e.to_string())))),
    }
}

/// Pages route to their path. Collection items expand their collection's
/// pattern, or [`UNDATED`] if the collection is dated and the item isn't.
pub fn default_route(collection: &Collection, item: &Item) -> Result<Route, RouteError> {
    let Some(dir) = &collection.dir else {
        return Ok(Route::for_page(&item.relative));
    };

    let pattern = match (collection.dated, item.date) {
        (true, None) => UNDATED,
        _ => &*collection.permalink,
    };

    let path = item.relative.strip_prefix(dir)
        .map(|path| path.without_extension().to_url_path())
        .unwrap_or_default();

    expand(pattern, |name| match name {
        "year" => item.date.map(|d| Cow::Owned(format!("{:04}", d.year()))),
        "month" => item.date.map(|d| Cow::Owned(format!("{:02}", d.month()))),
        "day" => item.date.map(|d| Cow::Owned(format!("{:02}", d.day()))),
        "title" => Some(Cow::Owned(titleize(&item.stem))),
        "slug" => Some(Cow::Owned(slugify(&item.stem))),
        "collection" => Some(Cow::Borrowed(&*collection.name)),
        "path" => Some(Cow::Borrowed(path.as_str())),
        _ => None,
    })
}
