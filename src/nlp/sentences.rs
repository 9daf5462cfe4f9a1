// English sentence segmentation.
// Blank lines always separate sentences. Inside a paragraph a run of terminal
// punctuation followed by whitespace ends a sentence, unless it is a period
// after an abbreviation or an initial, or the next word starts lowercase.
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

const TERMINATORS: &[char] = &['.', '!', '?', '…'];
const CLOSERS: &[char] = &['"', '\'', ')', ']', '}', '’', '”', '»'];

// Never end a sentence.
static ABBREVIATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "mr", "mrs", "ms", "dr", "prof", "capt", "lt", "sgt", "gov", "sen", "vs", "approx",
        "dept", "e.g", "i.e", "ph.d",
    ]
    .iter()
    .copied()
    .collect()
});

// Titles that are also ordinary words; abbreviations only when capitalized, as in "Col. Smith".
static TITLES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["gen", "col", "rep", "rev", "hon", "st", "mt", "ft"].iter().copied().collect()
});

// Abbreviations only when a number follows, as in "No. 5" or "Dec. 25".
static NUMBERED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "no", "nos", "vol", "pp", "fig", "art", "sec", "ch", "est", "jan", "feb", "mar", "apr",
        "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
    ]
    .iter()
    .copied()
    .collect()
});

/// Splits `text` into sentences, in order, with internal whitespace collapsed.
/// Fragments without any letter or digit are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for paragraph in PARAGRAPH_BREAK.split(text) {
        split_paragraph(paragraph, &mut sentences);
    }
    sentences
}

fn split_paragraph(paragraph: &str, out: &mut Vec<String>) {
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        if !TERMINATORS.contains(&chars[i].1) {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        while j < chars.len() && TERMINATORS.contains(&chars[j].1) {
            j += 1;
        }
        while j < chars.len() && CLOSERS.contains(&chars[j].1) {
            j += 1;
        }
        // "3.14", "e.g.x", "word!word" stay inside the sentence.
        if j < chars.len() && !chars[j].1.is_whitespace() {
            i = j;
            continue;
        }
        let end = chars.get(j).map(|&(pos, _)| pos).unwrap_or(paragraph.len());
        if is_boundary(paragraph, &chars, start, i, j) {
            push_sentence(&paragraph[start..end], out);
            start = end;
        }
        i = j;
    }
    push_sentence(&paragraph[start..], out);
}

fn is_boundary(paragraph: &str, chars: &[(usize, char)], start: usize, i: usize, j: usize) -> bool {
    let next = chars[j..].iter().map(|&(_, c)| c).find(|c| !c.is_whitespace());
    let Some(next) = next else {
        return true;
    };
    let only_periods = chars[i..j]
        .iter()
        .filter(|(_, c)| TERMINATORS.contains(c))
        .all(|&(_, c)| c == '.');
    if !only_periods {
        return true;
    }
    if next.is_lowercase() {
        return false;
    }
    let before = &paragraph[start..chars[i].0];
    let raw = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| !c.is_alphanumeric());
    let word = raw.to_lowercase();
    let key = word.as_str();
    if ABBREVIATIONS.contains(key)
        || (TITLES.contains(key) && raw.starts_with(char::is_uppercase))
        || (NUMBERED.contains(key) && next.is_ascii_digit())
    {
        return false;
    }
    // Single-letter initials such as "J. Smith".
    let mut letters = word.chars();
    !matches!((letters.next(), letters.next()), (Some(c), None) if c.is_alphabetic())
}

fn push_sentence(raw: &str, out: &mut Vec<String>) {
    if !raw.chars().any(char::is_alphanumeric) {
        return;
    }
    out.push(raw.split_whitespace().collect::<Vec<_>>().join(" "));
}
