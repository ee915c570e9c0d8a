//! Text tokenization for the search projection.
//!
//! Case folding, accent stripping, English stop-word removal and a light suffix
//! stemmer. Documents and queries go through the same function so their terms compare.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

static STOP_WORDS: Lazy<HashSet<String>> = Lazy::new(|| {
    stop_words::get(stop_words::LANGUAGE::English)
        .iter()
        .map(|w| w.to_string().to_lowercase())
        .collect()
});

/// Lowercase and strip diacritics (`Émile` -> `emile`).
pub fn fold(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Reduce an English word to a rough stem (`programming` -> `program`).
pub fn stem(word: &str) -> String {
    if word.len() <= 3 || !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return word.to_string();
    }

    let mut w = word.to_string();

    if let Some(base) = w.strip_suffix("sses") {
        w = format!("{}ss", base);
    } else if let Some(base) = w.strip_suffix("ies") {
        w = format!("{}y", base);
    } else if w.ends_with('s') && !w.ends_with("ss") && !w.ends_with("us") && !w.ends_with("is") {
        w.pop();
    }

    for suffix in ["ing", "ed"] {
        if let Some(base) = w.strip_suffix(suffix) {
            if base.len() >= 3 && base.chars().any(is_vowel) {
                w = undouble(base);
                break;
            }
        }
    }

    w
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// `programm` -> `program`, `runn` -> `run`; `ll`, `ss` and `zz` stay.
fn undouble(base: &str) -> String {
    let bytes = base.as_bytes();
    let n = bytes.len();
    if n >= 2 && bytes[n - 1] == bytes[n - 2] {
        let last = bytes[n - 1] as char;
        if !is_vowel(last) && !matches!(last, 'l' | 's' | 'z') {
            return base[..n - 1].to_string();
        }
    }
    base.to_string()
}

/// Split text into search terms, deduplicated, in first-seen order.
pub fn tokenize(text: &str) -> Vec<String> {
    let folded = fold(text);
    let mut seen = HashSet::new();
    let mut terms = Vec::new();

    for word in folded.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() || is_stop_word(word) {
            continue;
        }
        let term = stem(word);
        if seen.insert(term.clone()) {
            terms.push(term);
        }
    }

    terms
}
