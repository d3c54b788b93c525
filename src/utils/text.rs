//! Text normalization helpers shared by extraction, prompting and the local generator.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Words ignored when picking key terms
const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "also", "although", "among", "another",
    "because", "been", "before", "being", "below", "between", "both", "cannot", "could",
    "does", "doing", "down", "during", "each", "either", "every", "from", "further", "have",
    "having", "here", "however", "into", "itself", "just", "many", "more", "most", "much",
    "must", "neither", "only", "other", "otherwise", "over", "same", "several", "should",
    "since", "some", "such", "than", "that", "their", "them", "themselves", "then", "there",
    "therefore", "these", "they", "this", "those", "through", "thus", "under", "until", "upon",
    "very", "were", "what", "when", "where", "whether", "which", "while", "whom", "whose",
    "will", "with", "within", "without", "would", "your",
];

fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"[A-Za-z][A-Za-z\-]{3,}").expect("valid word regex"))
}

fn whitespace_regex() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Normalize extracted text: trim lines, drop blank ones, collapse whitespace runs.
pub fn clean_text(text: &str) -> String {
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    whitespace_regex().replace_all(&joined, " ").into_owned()
}

/// Truncate `text` to at most `max_chars` characters, keeping the leading content.
///
/// The cut lands on the last whitespace before the limit when one exists in the
/// second half of the window, otherwise exactly at the limit. Never splits a
/// UTF-8 character. Returns the text unchanged when it already fits.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    let cut = match text.char_indices().nth(max_chars) {
        Some((idx, _)) => idx,
        None => return text,
    };

    let window = &text[..cut];
    match window.rfind(char::is_whitespace) {
        Some(ws) if ws >= cut / 2 => window[..ws].trim_end(),
        _ => window,
    }
}

/// Split text into sentences on `.`, `!` or `?` followed by whitespace or end of text.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |next| next.is_whitespace());
            if at_boundary {
                push_sentence(&mut sentences, &current);
                current.clear();
            }
        }
    }
    push_sentence(&mut sentences, &current);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let sentence = whitespace_regex().replace_all(raw.trim(), " ");
    if sentence.chars().any(char::is_alphanumeric) {
        sentences.push(sentence.into_owned());
    }
}

/// Most frequent content words, ties broken by first occurrence.
///
/// Terms keep the casing of their first occurrence.
pub fn key_terms(text: &str, limit: usize) -> Vec<String> {
    let mut stats: HashMap<String, (usize, usize, String)> = HashMap::new();

    for (position, m) in word_regex().find_iter(text).enumerate() {
        let word = m.as_str().trim_matches('-');
        if word.len() < 4 {
            continue;
        }
        let lower = word.to_ascii_lowercase();
        if STOPWORDS.contains(&lower.as_str()) {
            continue;
        }
        let entry = stats
            .entry(lower)
            .or_insert_with(|| (0, position, word.to_string()));
        entry.0 += 1;
    }

    let mut ranked: Vec<(usize, usize, String)> = stats.into_values().collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    ranked.into_iter().take(limit).map(|(_, _, w)| w).collect()
}

/// Shorten text for display, appending an ellipsis when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

/// Make a string safe to use as a file stem
pub fn clean_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }

    let trimmed = collapsed.trim_matches(|c: char| c == '_' || c.is_whitespace());
    if trimmed.is_empty() {
        "study_materials".to_string()
    } else {
        trimmed.to_string()
    }
}
