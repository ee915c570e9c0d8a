//! Title (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppResult, FieldErrors};

use super::loan::LoanDetails;

pub const ISBN_LENGTH: usize = 13;

/// Strip separators (hyphens, spaces, anything non-digit) from a raw ISBN.
pub fn normalize_isbn(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Title model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Title {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub genre: String,
    /// Canonical ISBN-13, digits only
    pub isbn: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Title {
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    pub fn borrowed_copies(&self) -> i32 {
        self.total_copies - self.available_copies
    }
}

/// Title as returned to callers, with derived availability
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TitleView {
    #[serde(flatten)]
    pub title: Title,
    pub is_available: bool,
    pub borrowed_copies: i32,
    /// Title with matched words wrapped in `<mark>`, on search results only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_highlight: Option<String>,
}

impl From<Title> for TitleView {
    fn from(title: Title) -> Self {
        Self {
            is_available: title.is_available(),
            borrowed_copies: title.borrowed_copies(),
            title_highlight: None,
            title,
        }
    }
}

/// Title with every loan that references it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TitleDetails {
    #[serde(flatten)]
    pub title: TitleView,
    pub loans: Vec<LoanDetails>,
}

/// Create title request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTitle {
    pub title: String,
    pub author: String,
    pub genre: String,
    /// ISBN-13, separators allowed (e.g. `978-0-596-51617-8`)
    pub isbn: String,
    pub total_copies: i32,
    /// Defaults to `total_copies`
    pub available_copies: Option<i32>,
}

/// Update title request. Omitted fields keep their current value.
///
/// `available_copies` is not writable here: it only moves through borrow and return.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTitle {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub isbn: Option<String>,
    pub total_copies: Option<i32>,
}

impl UpdateTitle {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.genre.is_none()
            && self.isbn.is_none()
            && self.total_copies.is_none()
    }
}

/// Normalized title values about to be written.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct TitleDraft {
    #[validate(length(max = 255, message = "is too long (maximum is 255 characters)"))]
    pub title: String,
    #[validate(length(max = 255, message = "is too long (maximum is 255 characters)"))]
    pub author: String,
    #[validate(length(max = 100, message = "is too long (maximum is 100 characters)"))]
    pub genre: String,
    pub isbn: String,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub total_copies: i32,
    #[validate(range(min = 0, message = "must be greater than or equal to 0"))]
    pub available_copies: i32,
}

impl TitleDraft {
    /// Build a draft from a create request: trim text, canonicalize the ISBN and
    /// default `available_copies` to `total_copies`.
    pub fn from_create(request: &CreateTitle) -> Self {
        Self {
            title: request.title.trim().to_string(),
            author: request.author.trim().to_string(),
            genre: request.genre.trim().to_string(),
            isbn: normalize_isbn(&request.isbn),
            total_copies: request.total_copies,
            available_copies: request.available_copies.unwrap_or(request.total_copies),
        }
    }

    /// Apply an update on top of the currently committed row.
    ///
    /// The number of copies on loan is preserved when `total_copies` changes, so the
    /// resulting `available_copies` can go negative; `check` rejects that.
    pub fn from_update(current: &Title, changes: &UpdateTitle) -> Self {
        let total_copies = changes.total_copies.unwrap_or(current.total_copies);
        let on_loan = current.borrowed_copies();

        Self {
            title: changes
                .title
                .as_deref()
                .map(str::trim)
                .unwrap_or(&current.title)
                .to_string(),
            author: changes
                .author
                .as_deref()
                .map(str::trim)
                .unwrap_or(&current.author)
                .to_string(),
            genre: changes
                .genre
                .as_deref()
                .map(str::trim)
                .unwrap_or(&current.genre)
                .to_string(),
            isbn: changes
                .isbn
                .as_deref()
                .map(normalize_isbn)
                .unwrap_or_else(|| current.isbn.clone()),
            total_copies,
            available_copies: total_copies.saturating_sub(on_loan),
        }
    }

    /// Check every rule and report all violations at once.
    pub fn check(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();

        if let Err(e) = self.validate() {
            errors.extend_from(&e);
        }

        for (field, value) in [("title", &self.title), ("author", &self.author), ("genre", &self.genre)] {
            if value.is_empty() {
                errors.add(field, "can't be blank");
            } else if value.contains('\0') {
                errors.add(field, "contains invalid characters");
            }
        }

        if self.isbn.is_empty() {
            errors.add("isbn", "can't be blank");
        } else if self.isbn.len() != ISBN_LENGTH {
            errors.add("isbn", "must be exactly 13 digits");
        }

        if self.available_copies > self.total_copies {
            errors.add("available_copies", "cannot exceed total copies");
        }

        errors.into_result()
    }

    /// Whether any field feeding the search projection differs from `current`.
    pub fn text_changed(&self, current: &Title) -> bool {
        self.title != current.title
            || self.author != current.author
            || self.genre != current.genre
            || self.isbn != current.isbn
    }
}

/// Title listing filters
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct TitleQuery {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Case-insensitive substring of the author
    pub author: Option<String>,
    /// Case-insensitive substring of the genre
    pub genre: Option<String>,
    /// Only titles with at least one copy on the shelf
    pub available_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Free-text search request
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Prefix suggestion request
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct SuggestionQuery {
    pub q: Option<String>,
    /// Number of suggestions (default 5, at most 50)
    pub limit: Option<i64>,
}

/// Full-text search narrowed by exact filters, all combined with AND
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct AdvancedSearchQuery {
    pub q: Option<String>,
    /// Match the query against the title field only
    pub title_only: Option<bool>,
    /// Exact genre (case-insensitive)
    pub genre: Option<String>,
    /// Exact author (case-insensitive)
    pub author: Option<String>,
    /// Substring of the canonical ISBN
    pub isbn: Option<String>,
    pub available_only: Option<bool>,
    /// Minimum number of total copies
    pub min_copies: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl AdvancedSearchQuery {
    pub fn has_filters(&self) -> bool {
        let present = |s: &Option<String>| s.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false);
        present(&self.genre)
            || present(&self.author)
            || present(&self.isbn)
            || self.available_only.unwrap_or(false)
            || self.min_copies.is_some()
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct Paginated<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}
