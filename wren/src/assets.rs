use std::fs;
use std::path::Path;

use folio::route::Route;
use folio::sass;
use folio::util::PathExt;

use crate::config::Settings;
use crate::issue::{one_line, Issue};
use crate::render::{Contents, Output};

/// Resolves the configured skin against the sass directory's `skins/`.
/// Returns the name of the skin to use and, if the configured one is
/// unknown, the issue to report.
pub fn skin(root: &Path, settings: &Settings) -> (String, Option<Issue>) {
    let skins = root.join(&settings.sass_dir).join("skins");
    let skin = sass::resolve_skin(&skins, settings.skin.as_deref());
    let issue = skin.fell_back_from.map(|requested| Issue::UnknownSkin {
        requested,
        fallback: skin.name.clone(),
    });

    (skin.name, issue)
}

/// The route the stylesheet is written to.
pub fn route(settings: &Settings) -> Route {
    Route::for_file(&settings.stylesheet.output_path())
}

/// Returns `true` if the site has a stylesheet entry file.
pub fn has_stylesheet(root: &Path, settings: &Settings) -> bool {
    root.join(&settings.stylesheet.entry).is_file()
}

/// Compiles the stylesheet entry with `skin`. Returns `None` if the site has
/// no stylesheet. Imports resolve against the sass directory, then the
/// entry's directory.
pub fn build(root: &Path, settings: &Settings, skin: &str) -> Option<Result<Output, Issue>> {
    if !has_stylesheet(root, settings) {
        return None;
    }

    let entry = &settings.stylesheet.entry;
    let failed = |message: String| Issue::Stylesheet { path: entry.to_url_path(), message };
    let path = root.join(entry);
    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) => return Some(Err(failed(e.to_string()))),
    };

    let sass_dir = root.join(&settings.sass_dir);
    let entry_dir = path.parent().unwrap_or(root);
    let name = entry.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let result = sass::compile(&name, &source, skin, &[sass_dir.as_path(), entry_dir])
        .map(|css| Output {
            route: route(settings),
            path: settings.stylesheet.output_path(),
            contents: Contents::Text(css),
        })
        .map_err(|e| failed(one_line(&e)));

    if let Ok(output) = &result {
        tracing::debug!(route = %output.route, %skin, "compiled stylesheet");
    }

    Some(result)
}
