//! Splitting a content file into its front matter and body.
//!
//! A front matter block opens with a first line consisting solely of `---`
//! (YAML) or `+++` (TOML) and closes at the next line consisting solely of the
//! same delimiter. A trailing `\r` on either line is tolerated.
//!
//! ```rust
//! use folio::markdown::frontmatter;
//!
//! let file = "---\ntitle: Hello\n---\n# Hi\n";
//! let front = frontmatter::parse(file).unwrap();
//! assert_eq!(front.data["title"].as_str(), Some("Hello"));
//! assert_eq!(front.body, "# Hi\n");
//!
//! let plain = frontmatter::parse("# Hi\n").unwrap();
//! assert!(plain.data.is_empty());
//! assert_eq!(plain.body, "# Hi\n");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{ErrorDetail, Result};
use crate::value::{Dict, Format, Toml, Value, Yaml};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `---`
    Yaml,
    /// `+++`
    Toml,
}

impl Delimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delimiter::Yaml => "---",
            Delimiter::Toml => "+++",
        }
    }

    fn format(&self) -> &'static str {
        match self {
            Delimiter::Yaml => Yaml::NAME,
            Delimiter::Toml => Toml::NAME,
        }
    }

    fn from_line(line: &str) -> Option<Delimiter> {
        match line.strip_suffix('\r').unwrap_or(line) {
            "---" => Some(Delimiter::Yaml),
            "+++" => Some(Delimiter::Toml),
            _ => None,
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrontMatterError {
    #[error("front matter opened with `{delimiter}` is never closed")]
    Unclosed { delimiter: Delimiter },
    #[error("invalid {format} front matter: {message}")]
    Invalid { format: &'static str, message: String },
    #[error("front matter must be a mapping, found a {found}")]
    NotAMapping { found: &'static str },
}

impl ErrorDetail for FrontMatterError { }

/// A content file split into its front matter mapping and body.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter<'a> {
    pub data: Arc<Dict>,
    pub body: &'a str,
    /// The delimiter of the block, or `None` if the file has no block.
    pub delimiter: Option<Delimiter>,
}

impl FrontMatter<'_> {
    fn empty(body: &str, delimiter: Option<Delimiter>) -> FrontMatter<'_> {
        FrontMatter { data: Arc::default(), body, delimiter }
    }
}

/// Returns `true` if `input` opens with a front matter delimiter line.
pub fn has_front_matter(input: &str) -> bool {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let first = input.split_once('\n').map_or(input, |(line, _)| line);
    Delimiter::from_line(first).is_some()
}

/// Splits `input` into `(delimiter, block, body)`, or `None` if there is no
/// opening delimiter.
fn split(input: &str) -> Result<Option<(Delimiter, &str, &str)>, FrontMatterError> {
    let (first, mut rest) = input.split_once('\n').unwrap_or((input, ""));
    let Some(delimiter) = Delimiter::from_line(first) else {
        return Ok(None);
    };

    let block_start = input.len() - rest.len();
    let mut block_end = block_start;
    while !rest.is_empty() {
        let (line, next) = rest.split_once('\n').unwrap_or((rest, ""));
        if Delimiter::from_line(line) == Some(delimiter) {
            return Ok(Some((delimiter, &input[block_start..block_end], next)));
        }

        block_end += rest.len() - next.len();
        rest = next;
    }

    Err(FrontMatterError::Unclosed { delimiter })
}

fn parse_block(delimiter: Delimiter, block: &str) -> Result<Arc<Dict>, FrontMatterError> {
    if block.trim().is_empty() {
        return Ok(Arc::default());
    }

    let invalid = |message: String| FrontMatterError::Invalid {
        format: delimiter.format(),
        message,
    };

    let value: Value = match delimiter {
        Delimiter::Yaml => Yaml::from_str(block).map_err(|e| invalid(e.to_string()))?,
        Delimiter::Toml => Toml::from_str(block).map_err(|e| invalid(e.to_string()))?,
    };

    match value {
        Value::Null => Ok(Arc::default()),
        Value::Dict(dict) => Ok(dict),
        other => Err(FrontMatterError::NotAMapping { found: other.kind() }),
    }
}

/// Splits `input` into front matter and body.
///
/// A file without an opening delimiter has an empty mapping and its whole
/// text as the body.
pub fn parse(input: &str) -> Result<FrontMatter<'_>, FrontMatterError> {
    match parse_lenient(input) {
        (front, None) => Ok(front),
        (_, Some(error)) => Err(error),
    }
}

/// Like [`parse()`], but always yields a usable [`FrontMatter`] alongside any
/// error: an unclosed block leaves the whole file as the body, while an
/// invalid block is dropped and the text after it kept as the body.
pub fn parse_lenient(input: &str) -> (FrontMatter<'_>, Option<FrontMatterError>) {
    let unmarked = input.strip_prefix('\u{feff}').unwrap_or(input);
    match split(unmarked) {
        Ok(None) => (FrontMatter::empty(input, None), None),
        Err(e) => (FrontMatter::empty(input, None), Some(e)),
        Ok(Some((delimiter, block, body))) => match parse_block(delimiter, block) {
            Ok(data) => (FrontMatter { data, body, delimiter: Some(delimiter) }, None),
            Err(e) => (FrontMatter::empty(body, Some(delimiter)), Some(e)),
        }
    }
}

/// Serializes `data` as a YAML front matter block followed by `body`.
/// [`parse()`] of the result yields `data` and `body` again.
pub fn emit(data: &Dict, body: &str) -> Result<String> {
    let mut output = String::from("---\n");
    if !data.is_empty() {
        output.push_str(&serde_yaml::to_string(data)?);
        if !output.ends_with('\n') {
            output.push('\n');
        }
    }

    output.push_str("---\n");
    output.push_str(body);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Date, Num};

    #[test]
    fn parse_then_emit_is_idempotent() {
        let inputs = [
            "---\ntitle: \"Hello: World\"\ndate: 2024-01-01\ntags: [a, b]\ncount: 7\n---\nbody text\n",
            "---\n---\n",
            "---\r\nlayout: post\r\n---\r\n# Windows\r\n",
            "+++\ntitle = \"toml\"\nweight = 2.5\n+++\nbody",
            "---\nnested:\n  flag: true\n  none: null\n---\n\n\nlater\n",
        ];

        for input in inputs {
            let first = parse(input).unwrap();
            let emitted = emit(&first.data, first.body).unwrap();
            let second = parse(&emitted).unwrap();
            assert_eq!(first.data, second.data, "{input:?}");
            assert_eq!(first.body, second.body, "{input:?}");
            assert_eq!(emit(&second.data, second.body).unwrap(), emitted);
        }
    }

    #[test]
    fn values_are_typed() {
        let front = parse("---\ndate: 2024-01-01 10:30:00 +0000\ndraft: true\nn: 3\n---\n").unwrap();
        assert_eq!(front.data["date"].to_date(), Date::parse("2024-01-01 10:30:00"));
        assert_eq!(front.data["draft"], Value::Bool(true));
        assert_eq!(front.data["n"], Value::Num(Num::Int(3)));
        assert_eq!(front.delimiter, Some(Delimiter::Yaml));
    }

    #[test]
    fn no_delimiter_means_empty_mapping_and_whole_body() {
        for input in ["", "# Title\n\ntext", " ---\na: 1\n---\n", "----\n", "text\n---\n"] {
            let front = parse(input).unwrap();
            assert!(front.data.is_empty());
            assert_eq!(front.body, input);
            assert_eq!(front.delimiter, None);
        }
    }

    #[test]
    fn byte_order_mark_is_only_dropped_before_a_block() {
        let plain = "\u{feff}# Title\n";
        assert_eq!(parse(plain).unwrap().body, plain);

        let front = parse("\u{feff}---\ntitle: T\n---\nbody").unwrap();
        assert_eq!(front.data["title"], Value::from("T"));
        assert_eq!(front.body, "body");

        let unclosed = "\u{feff}---\ntitle: T\n";
        assert_eq!(parse_lenient(unclosed).0.body, unclosed);
    }

    #[test]
    fn unclosed_block() {
        let input = "---\ntitle: Oops\nno end here\n";
        assert_eq!(parse(input), Err(FrontMatterError::Unclosed { delimiter: Delimiter::Yaml }));

        let (front, error) = parse_lenient(input);
        assert!(error.is_some());
        assert!(front.data.is_empty());
        assert_eq!(front.body, input);

        assert!(parse("---").is_err());
        assert!(parse("+++\na = 1\n---\n").is_err());
    }

    #[test]
    fn malformed_blocks_keep_the_body() {
        let (front, error) = parse_lenient("---\n: [\n---\nbody\n");
        assert!(matches!(error, Some(FrontMatterError::Invalid { format: "YAML", .. })));
        assert_eq!(front.body, "body\n");

        let (front, error) = parse_lenient("---\n- a\n- b\n---\nbody\n");
        assert_eq!(error, Some(FrontMatterError::NotAMapping { found: "array" }));
        assert!(front.data.is_empty());
        assert_eq!(front.body, "body\n");
    }

    #[test]
    fn closing_delimiter_at_end_of_file() {
        let front = parse("---\na: 1\n---").unwrap();
        assert_eq!(front.data.len(), 1);
        assert_eq!(front.body, "");
        assert!(has_front_matter("---\r\n"));
        assert!(!has_front_matter("<html>"));
    }
}
