use std::sync::LazyLock;

use regex::Regex;

static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:[-*•]\s+)+").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse multi-line, bulleted text into one `"; "`-joined line.
pub fn normalize(text: &str) -> String {
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(strip_bullet)
        .collect::<Vec<_>>()
        .join("; ");
    WHITESPACE_RE.replace_all(&joined, " ").trim().to_string()
}

/// Drop leading `-`, `*` or `•` markers followed by whitespace. Stacked markers
/// (`- - x`) go together so that `normalize` stays idempotent.
pub fn strip_bullet(line: &str) -> &str {
    match BULLET_RE.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

/// A line holding nothing but a bullet marker.
pub fn is_bare_bullet(line: &str) -> bool {
    matches!(line.trim(), "-" | "*" | "•")
}
