use std::io;
use std::path::Path;

mod macros;
mod path_ext;

pub use path_ext::*;
pub use macros::*;

/// Convert spaces to hyphens. Remove characters that aren't alphanumerics,
/// underscores, or hyphens. Convert to lowercase. Also strip leading and
/// trailing whitespace.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        for b in deunicode::deunicode_char(ch).unwrap_or("-").bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => {
                    // All sequences of characters not alphanumeric or `_` are
                    // converted into one `-`.
                    need_dash = !output.is_empty();
                }
            }
        }
    }

    output
}

/// Lower-cases `stem` and converts spaces and underscores to hyphens, leaving
/// every other character alone.
///
/// ```rust
/// use folio::util::titleize;
///
/// assert_eq!(titleize("Hello World"), "hello-world");
/// assert_eq!(titleize("snake_case Title"), "snake-case-title");
/// assert_eq!(titleize("c++ & rust"), "c++-&-rust");
/// ```
pub fn titleize(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            ' ' | '_' => '-',
            c => c,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Returns `true` if `input` is likely to contain a template.
pub fn is_template(input: &str) -> bool {
    let mut slice = input.as_bytes();
    while let Some(i) = memchr::memchr(b'{', slice) {
        match slice.get(i + 1) {
            Some(b'{') | Some(b'%') => return true,
            Some(_) => slice = &slice[(i + 1)..],
            None => return false,
        }
    }

    false
}

/// Reads the file at `path` as text, replacing invalid UTF-8 with `U+FFFD`.
/// The flag is `true` if anything was replaced.
pub fn read_lossy(path: &Path) -> io::Result<(String, bool)> {
    let bytes = std::fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok((text, false)),
        Err(e) => Ok((String::from_utf8_lossy(e.as_bytes()).into_owned(), true)),
    }
}
