//! Free-text segmentation for quick add, pasted lists and voice transcripts.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex pattern is valid")
}

// Quantity phrases are removed from the whole input before splitting,
// in this order.
static DOZEN: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\b(?:a\s+)?dozen\s+"));
static COUNTED_CONTAINERS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\b\d+(?:[.,]\d+)?\s+(?:bottles|cans|boxes|bags|jars)\s+of\s+"));
static SINGLE_CONTAINER: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\b(?:a|an|the)\s+(?:bottle|can|box|bag|jar)\s+of\s+"));

static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)[,\r\n]|\s+and(?:\s+and)*\s+"));

static LEADING_VERB: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)^(?:add|get|buy|need|want|purchase|pick\s+up|grab)\s+")
});
static LEADING_POLITENESS: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)^(?:i\s+need|i\s+want|i['’]m\s+getting|im\s+getting|i['’]d\s+like|id\s+like|please\s+add|please\s+get)\s+",
    )
});
static LEADING_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)^(?:a|an|the|some)\s+"));

/// Split free text into item names.
///
/// Quantity phrases ("a dozen", "2 bottles of", "a jar of") are removed,
/// the text is split on commas, newlines and the word "and", and each piece
/// loses a leading verb, politeness phrase and article. Empty pieces are
/// dropped and duplicates collapse to their first occurrence.
#[must_use]
pub fn parse_items(input: &str) -> Vec<String> {
    if input.trim().is_empty() {
        return Vec::new();
    }

    let reduced = DOZEN.replace_all(input, "");
    let reduced = COUNTED_CONTAINERS.replace_all(&reduced, "");
    let reduced = SINGLE_CONTAINER.replace_all(&reduced, "");

    let mut seen = HashSet::new();
    SEPARATOR
        .split(&reduced)
        .map(strip_filler)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

fn strip_filler(segment: &str) -> String {
    let segment = segment.trim();
    let segment = LEADING_VERB.replace(segment, "");
    let segment = LEADING_POLITENESS.replace(segment.trim_start(), "");
    let segment = LEADING_ARTICLE.replace(segment.trim_start(), "");
    sanitize_item_name(&segment)
}

/// Trim and collapse interior whitespace runs to a single space.
/// Case and punctuation are left alone.
#[must_use]
pub fn sanitize_item_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}
