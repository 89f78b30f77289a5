use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Chainable, ErrorDetail, Result};

pub trait Format: Sized {
    /// The human-readable name of the format.
    const NAME: &'static str;

    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    /// Parses `string` as the data format `Self` as a `T` or returns an error
    /// if the `string` is an invalid `T`.
    fn from_str<T: DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    /// Reads and parses the file at `path`.
    fn read<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
        let path = path.as_ref();
        let string = fs::read_to_string(path)
            .chain_with(|| error!("failed to read file", "path" => path.display()))?;

        Self::from_str(&string).chain_with(|| error! {
            format!("invalid {} data", Self::NAME),
            "path" => path.display(),
        })
    }
}

macro_rules! impl_format {
    ($name:ident ($display:literal): $func:expr, $E:ty) => (
        pub struct $name;

        impl Format for $name {
            const NAME: &'static str = $display;

            type Error = $E;

            fn from_str<T: DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Yaml("YAML"): serde_yaml::from_str, serde_yaml::Error);
impl_format!(Toml("TOML"): toml::from_str, toml::de::Error);
impl_format!(Json("JSON"): serde_json::from_str, serde_json::Error);

/// Reads `path` with the format its extension names, or returns `None` if the
/// extension names no known format.
pub fn read_by_extension<T: DeserializeOwned>(path: &Path) -> Option<Result<T>> {
    match path.extension()?.to_str()? {
        "yml" | "yaml" => Some(Yaml::read(path)),
        "toml" => Some(Toml::read(path)),
        "json" => Some(Json::read(path)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn read_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ nope").unwrap();

        let error = read_by_extension::<Value>(&path).unwrap().unwrap_err();
        assert_eq!(error.message(), "invalid JSON data");
        assert!(error.to_string().contains("broken.json"));
    }

    #[test]
    fn unknown_extensions_are_skipped() {
        assert!(read_by_extension::<Value>(Path::new("notes.txt")).is_none());
    }
}
