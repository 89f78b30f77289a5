//! Stylesheet compilation with a selectable skin.
//!
//! The entry stylesheet is a template in which `{{ skin }}` (or
//! `{{ site.skin }}`) names the selected skin, so it can import the skin's
//! variables before the rules that use them:
//!
//! ```scss
//! ---
//! ---
//! @import "skins/{{ skin }}";
//! @import "base";
//!
//! .custom { color: $accent; }
//! ```

use std::path::Path;

use crate::error::Result;
use crate::markdown::frontmatter;
use crate::util::is_template;

/// The skin used when none is configured or the configured one is unknown.
pub const DEFAULT_SKIN: &str = "default";

/// The outcome of skin resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skin {
    pub name: String,
    /// The requested skin, if it was unknown and replaced by the default.
    pub fell_back_from: Option<String>,
}

/// Returns `true` if `skins_dir` contains `[_]name.scss` or `[_]name.sass`.
pub fn skin_exists(skins_dir: &Path, name: &str) -> bool {
    let simple = !name.is_empty() && !name.contains(['/', '\\']) && !name.starts_with('.');
    simple && ["", "_"].iter()
        .flat_map(|prefix| ["scss", "sass"].map(|ext| format!("{prefix}{name}.{ext}")))
        .any(|file| skins_dir.join(file).is_file())
}

/// Selects the skin named `requested` if it exists in `skins_dir`, or
/// [`DEFAULT_SKIN`] otherwise.
pub fn resolve_skin(skins_dir: &Path, requested: Option<&str>) -> Skin {
    match requested {
        None => Skin { name: DEFAULT_SKIN.into(), fell_back_from: None },
        Some(name) if name == DEFAULT_SKIN || skin_exists(skins_dir, name) => {
            Skin { name: name.into(), fell_back_from: None }
        }
        Some(name) => {
            tracing::warn!("unknown skin `{name}`: using `{DEFAULT_SKIN}`");
            Skin { name: DEFAULT_SKIN.into(), fell_back_from: Some(name.into()) }
        }
    }
}

/// Renders the entry stylesheet `source` with `skin` and compiles it to CSS.
/// `name` is the entry's file name; imports are resolved against
/// `load_paths`, in order.
pub fn compile(name: &str, source: &str, skin: &str, load_paths: &[&Path]) -> Result<String> {
    let body = frontmatter::parse_lenient(source).0.body;
    let scss = match is_template(body) {
        true => {
            let env = minijinja::Environment::new();
            let context = minijinja::context! {
                skin => skin,
                site => minijinja::context! { skin => skin },
            };

            env.render_named_str(name, body, context)?
        }
        false => body.to_string(),
    };

    let mut options = grass::Options::default();
    for path in load_paths {
        options = options.load_path(path);
    }

    if name.ends_with(".sass") {
        options = options.input_syntax(grass::InputSyntax::Sass);
    }

    grass::from_string(scss, &options)
        .map_err(|e| error!("failed to compile sass to css", "entry" => name, e))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    const ENTRY: &str = "---\n---\n@import \"skins/{{ skin }}\";\n@import \"base\";\n\n.x { color: $accent; }\n";

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let sass = dir.path().join("_sass");
        fs::create_dir_all(sass.join("skins")).unwrap();
        fs::write(sass.join("skins/_default.scss"), "$bg: white;\n$accent: blue;\n").unwrap();
        fs::write(sass.join("skins/_dark.scss"), "$bg: black;\n$accent: orange;\n").unwrap();
        fs::write(sass.join("_base.scss"), "body { background: $bg; }\n").unwrap();
        dir
    }

    fn build(dir: &Path, requested: Option<&str>) -> (Skin, String) {
        let sass = dir.join("_sass");
        let skin = resolve_skin(&sass.join("skins"), requested);
        let css = compile("main.scss", ENTRY, &skin.name, &[&sass]).unwrap();
        (skin, css)
    }

    #[test]
    fn skins_change_variables() {
        let dir = fixture();
        let (_, default) = build(dir.path(), None);
        let (dark_skin, dark) = build(dir.path(), Some("dark"));

        assert!(default.contains("background: white"));
        assert!(default.contains("color: blue"));
        assert_eq!(dark_skin, Skin { name: "dark".into(), fell_back_from: None });
        assert!(dark.contains("background: black"));
        assert!(dark.find("background").unwrap() < dark.find(".x").unwrap());
    }

    #[test]
    fn unknown_skin_matches_default() {
        let dir = fixture();
        let (_, default) = build(dir.path(), Some("default"));
        let (skin, fallback) = build(dir.path(), Some("nonexistent"));

        assert_eq!(skin.name, DEFAULT_SKIN);
        assert_eq!(skin.fell_back_from.as_deref(), Some("nonexistent"));
        assert_eq!(fallback, default);
    }

    #[test]
    fn skin_names_are_plain_file_names() {
        let dir = fixture();
        let skins = dir.path().join("_sass/skins");
        assert!(skin_exists(&skins, "dark"));
        assert!(!skin_exists(&skins, "../_base"));
        assert!(!skin_exists(&skins, ""));
    }

    #[test]
    fn site_skin_and_failures() {
        let dir = fixture();
        let sass = dir.path().join("_sass");
        let entry = "@import \"skins/{{ site.skin }}\";\n.y { color: $accent; }\n";
        let css = compile("main.scss", entry, "dark", &[&sass]).unwrap();
        assert!(css.contains("color: orange"));

        assert!(compile("main.scss", "@import \"missing\";", "default", &[&sass]).is_err());
        assert!(compile("main.scss", ".z { color: $undefined; }", "default", &[]).is_err());
    }
}
