/// Convert an HTML document or fragment to Markdown.
pub fn to_markdown(html: &str) -> String {
    html2md::parse_html(html)
}
