use std::sync::LazyLock;

use regex::Regex;

/// Level 1–4 markdown heading on its own line. Deeper levels are body text.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(#{1,4})\s+(.*?)\s*$").unwrap());

/// Heading text of a line, if the line is a heading.
pub fn heading(line: &str) -> Option<&str> {
    let text = HEADING_RE.captures(line)?.get(2)?.as_str();
    (!text.is_empty()).then_some(text)
}

/// Text of the first heading in the document.
pub fn first_heading(markdown: &str) -> Option<&str> {
    markdown.lines().find_map(heading)
}

/// Body under the heading called `name` (case-insensitive), up to the next
/// heading or the end of the document. `None` when the heading is absent.
pub fn find_section(markdown: &str, name: &str) -> Option<String> {
    let mut lines = markdown.lines();
    lines.find(|l| heading(l).is_some_and(|h| h.eq_ignore_ascii_case(name)))?;

    let body = lines
        .take_while(|l| heading(l).is_none())
        .collect::<Vec<_>>()
        .join("\n");
    Some(body.trim().to_string())
}

/// First section present among `names`, in priority order.
pub fn find_first_section(markdown: &str, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| find_section(markdown, name))
}
