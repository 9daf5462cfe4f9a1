// Text cleanup applied before classification.
use once_cell::sync::Lazy;
use regex::Regex;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").unwrap());

/// Strips tags, lowercases, keeps only `[a-z0-9]` and single spaces.
pub fn normalize(text: &str) -> String {
    let untagged = HTML_TAG.replace_all(text, " ");
    let lowered = untagged.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
