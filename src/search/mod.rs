//! Search index: a weighted term projection derived from each title's text fields.
//!
//! The projection is recomputed on every title write that changes title, author,
//! genre or ISBN, and stored next to the row it describes. Ranking favors a title
//! match over author, author over genre, genre over ISBN, then sorts alphabetically.

pub mod tokenizer;

use std::cmp::Ordering;

use sqlx::FromRow;

use crate::models::title::{Title, TitleDraft};

pub use tokenizer::tokenize;

/// Field weight, highest relevance first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weight {
    A,
    B,
    C,
    D,
}

/// Per-title weighted term sets, as stored in the `search_*_terms` columns
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct SearchProjection {
    pub search_title_terms: Vec<String>,
    pub search_author_terms: Vec<String>,
    pub search_genre_terms: Vec<String>,
    pub search_isbn_terms: Vec<String>,
}

impl SearchProjection {
    pub fn compute(title: &str, author: &str, genre: &str, isbn: &str) -> Self {
        Self {
            search_title_terms: tokenize(title),
            search_author_terms: tokenize(author),
            search_genre_terms: tokenize(genre),
            search_isbn_terms: tokenize(isbn),
        }
    }

    pub fn for_draft(draft: &TitleDraft) -> Self {
        Self::compute(&draft.title, &draft.author, &draft.genre, &draft.isbn)
    }

    pub fn is_empty(&self) -> bool {
        self.search_title_terms.is_empty()
            && self.search_author_terms.is_empty()
            && self.search_genre_terms.is_empty()
            && self.search_isbn_terms.is_empty()
    }

    fn terms(&self, weight: Weight) -> &[String] {
        match weight {
            Weight::A => &self.search_title_terms,
            Weight::B => &self.search_author_terms,
            Weight::C => &self.search_genre_terms,
            Weight::D => &self.search_isbn_terms,
        }
    }

    /// Best weight at which any query term appears
    pub fn best_term_match(&self, query_terms: &[String]) -> Option<Weight> {
        [Weight::A, Weight::B, Weight::C, Weight::D]
            .into_iter()
            .find(|w| self.terms(*w).iter().any(|t| query_terms.contains(t)))
    }
}

/// A tokenized free-text query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    /// Trimmed raw query, used for substring matching
    pub raw: String,
    pub terms: Vec<String>,
}

impl SearchTerms {
    /// `None` for a blank query: blank never means "match everything".
    pub fn parse(query: &str) -> Option<Self> {
        let raw = query.trim();
        if raw.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            terms: tokenize(raw),
        })
    }

    /// `%raw%` with LIKE wildcards escaped
    pub fn like_pattern(&self) -> String {
        contains_pattern(&self.raw)
    }
}

/// Escape `%`, `_` and `\` so user text matches literally inside LIKE/ILIKE.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn contains_pattern(text: &str) -> String {
    format!("%{}%", escape_like(text))
}

pub fn prefix_pattern(text: &str) -> String {
    format!("{}%", escape_like(text))
}

/// A title loaded together with its stored projection
#[derive(Debug, Clone, FromRow)]
pub struct SearchCandidate {
    #[sqlx(flatten)]
    pub title: Title,
    #[sqlx(flatten)]
    pub projection: SearchProjection,
}

impl SearchCandidate {
    /// Relevance of this candidate, or `None` if it does not match at all.
    ///
    /// Term matches use the weighted projection; the substring fallback covers
    /// title (A), author (B) and ISBN (D) so a stale projection never hides a row.
    pub fn rank(&self, query: &SearchTerms) -> Option<Weight> {
        let by_terms = self.projection.best_term_match(&query.terms);

        let needle = tokenizer::fold(&query.raw);
        let contains = |field: &str| tokenizer::fold(field).contains(&needle);
        let by_substring = if contains(&self.title.title) {
            Some(Weight::A)
        } else if contains(&self.title.author) {
            Some(Weight::B)
        } else if contains(&self.title.isbn) {
            Some(Weight::D)
        } else {
            None
        };

        match (by_terms, by_substring) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Whether the query matches the title field itself, by term or substring.
    pub fn matches_title(&self, query: &SearchTerms) -> bool {
        self.projection
            .search_title_terms
            .iter()
            .any(|t| query.terms.contains(t))
            || tokenizer::fold(&self.title.title).contains(&tokenizer::fold(&query.raw))
    }
}

fn alphabetical(a: &Title, b: &Title) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.id.cmp(&b.id))
}

/// Keep matching candidates ordered by relevance, then alphabetically by title.
pub fn rank_candidates(candidates: Vec<SearchCandidate>, query: &SearchTerms) -> Vec<Title> {
    let mut ranked: Vec<(Weight, Title)> = candidates
        .into_iter()
        .filter_map(|c| c.rank(query).map(|w| (w, c.title)))
        .collect();

    ranked.sort_by(|(wa, a), (wb, b)| wa.cmp(wb).then_with(|| alphabetical(a, b)));
    ranked.into_iter().map(|(_, title)| title).collect()
}

/// Candidates whose title matches, alphabetically.
pub fn title_matches(candidates: Vec<SearchCandidate>, query: &SearchTerms) -> Vec<Title> {
    let mut titles: Vec<Title> = candidates
        .into_iter()
        .filter(|c| c.matches_title(query))
        .map(|c| c.title)
        .collect();
    titles.sort_by(alphabetical);
    titles
}

/// Wrap every word of `text` that matches a query term in `<mark>` tags.
pub fn highlight(text: &str, query: &SearchTerms) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();

    for c in text.chars() {
        if c.is_alphanumeric() {
            word.push(c);
        } else {
            push_word(&mut out, &word, query);
            word.clear();
            out.push(c);
        }
    }
    push_word(&mut out, &word, query);
    out
}

fn push_word(out: &mut String, word: &str, query: &SearchTerms) {
    if word.is_empty() {
        return;
    }
    let folded = tokenizer::fold(word);
    if !tokenizer::is_stop_word(&folded) && query.terms.contains(&tokenizer::stem(&folded)) {
        out.push_str("<mark>");
        out.push_str(word);
        out.push_str("</mark>");
    } else {
        out.push_str(word);
    }
}

/// `<title> by <author>`
pub fn suggestion_label(title: &str, author: &str) -> String {
    format!("{} by {}", title, author)
}
