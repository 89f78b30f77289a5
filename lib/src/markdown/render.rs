use pulldown_cmark::{html, Options, Parser};

/// The Markdown extensions enabled for every body.
pub fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH
}

/// Renders CommonMark `input` to HTML.
///
/// ```rust
/// use folio::markdown::render_markdown;
///
/// assert_eq!(render_markdown("# Hi"), "<h1>Hi</h1>\n");
/// assert_eq!(render_markdown("~~old~~"), "<p><del>old</del></p>\n");
/// ```
pub fn render_markdown(input: &str) -> String {
    let parser = Parser::new_ext(input, options());
    let mut output = String::with_capacity(input.len() + input.len() / 2);
    html::push_html(&mut output, parser);
    output
}

#[cfg(test)]
mod tests {
    use super::render_markdown;

    #[test]
    fn tables_render() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>2</td>"));
    }

    #[test]
    fn raw_html_passes_through() {
        let html = render_markdown("<div class=\"x\">hi</div>\n");
        assert!(html.starts_with("<div class=\"x\">hi</div>"));
    }
}
