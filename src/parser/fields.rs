use regex::Regex;

/// Value of the first `Label: value` or `Label - value` line, case-insensitive.
/// Bold markers around the label (`**Sponsor:**`) are tolerated.
pub fn find_field(text: &str, label: &str) -> Option<String> {
    let pattern = format!(
        r"(?i)\b{}(?:\*\*|__)?[ \t]*[:\-](?:\*\*|__)?[ \t]*([^\r\n]*)",
        regex::escape(label)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(text)?;
    Some(caps[1].trim().to_string())
}

/// First non-empty value among `labels`, in priority order.
pub fn find_first_field(text: &str, labels: &[&str]) -> String {
    labels
        .iter()
        .filter_map(|label| find_field(text, label))
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}
