use std::borrow::Cow;
use std::path::{Component, Path};

pub trait PathExt: AsRef<Path> {
    /// The path with its final extension removed.
    fn without_extension(&self) -> Cow<'_, Path>;

    /// The normal components of the path joined by `/`, regardless of the
    /// platform separator.
    fn to_url_path(&self) -> String;
}

impl PathExt for Path {
    fn without_extension(&self) -> Cow<'_, Path> {
        match self.extension() {
            Some(_) => self.with_extension("").into(),
            None => self.into(),
        }
    }

    fn to_url_path(&self) -> String {
        let mut string = String::new();
        for component in self.components() {
            if let Component::Normal(v) = component {
                if !string.is_empty() {
                    string.push('/');
                }

                string.push_str(&v.to_string_lossy());
            }
        }

        string
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use super::PathExt;

    #[test]
    fn strips_only_the_last_extension() {
        assert_eq!(Path::new("a/b.tar.gz").without_extension(), Path::new("a/b.tar"));
        assert_eq!(Path::new("a/b").without_extension(), Path::new("a/b"));
    }

    #[test]
    fn url_paths_skip_non_normal_components() {
        assert_eq!(Path::new("./docs/intro.md").to_url_path(), "docs/intro.md");
        assert_eq!(Path::new("about.md").to_url_path(), "about.md");
    }
}
