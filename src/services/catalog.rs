//! Catalog management and search service

use chrono::{Duration, Utc};

use crate::{
    config::{LendingConfig, SearchConfig},
    error::AppResult,
    models::title::{
        AdvancedSearchQuery, CreateTitle, Paginated, SearchQuery, SuggestionQuery, Title, TitleDetails,
        TitleDraft, TitleQuery, TitleView, UpdateTitle,
    },
    repository::{page_bounds, Repository},
    search::{highlight, rank_candidates, suggestion_label, title_matches, SearchTerms},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    search: SearchConfig,
    lending: LendingConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, search: SearchConfig, lending: LendingConfig) -> Self {
        Self {
            repository,
            search,
            lending,
        }
    }

    /// List titles with filters
    pub async fn list_titles(&self, query: &TitleQuery) -> AppResult<Paginated<TitleView>> {
        let (titles, total, page, per_page) = self
            .repository
            .titles
            .list(query, self.search.default_per_page, self.search.max_per_page)
            .await?;

        Ok(Paginated {
            items: titles.into_iter().map(TitleView::from).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Get title by ID
    pub async fn get_title(&self, id: i32) -> AppResult<TitleView> {
        Ok(self.repository.titles.get_by_id(id).await?.into())
    }

    /// Get title by ID with every loan made on it
    pub async fn get_title_details(&self, id: i32) -> AppResult<TitleDetails> {
        let title = self.repository.titles.get_by_id(id).await?;
        let rows = self.repository.loans.for_title(id).await?;

        let now = Utc::now();
        let due_soon = Duration::days(self.lending.due_soon_days);

        Ok(TitleDetails {
            title: title.into(),
            loans: rows.into_iter().map(|r| r.into_details(now, due_soon)).collect(),
        })
    }

    /// Create a new title
    pub async fn create_title(&self, request: &CreateTitle) -> AppResult<Title> {
        let draft = TitleDraft::from_create(request);
        let title = self.repository.titles.create(&draft).await?;

        tracing::info!(
            "Catalog create: title id={} isbn={} copies={}",
            title.id,
            title.isbn,
            title.total_copies
        );
        Ok(title)
    }

    /// Update an existing title
    pub async fn update_title(&self, id: i32, changes: &UpdateTitle) -> AppResult<Title> {
        let title = self.repository.titles.update(id, changes).await?;

        tracing::info!(
            "Catalog update: title id={} copies={}/{}",
            title.id,
            title.available_copies,
            title.total_copies
        );
        Ok(title)
    }

    /// Delete a title and its loan history
    pub async fn delete_title(&self, id: i32) -> AppResult<()> {
        self.repository.titles.delete(id).await?;
        tracing::info!("Catalog delete: title id={}", id);
        Ok(())
    }

    // =========================================================================
    // SEARCH
    // =========================================================================

    /// Ranked free-text search. A blank query returns nothing.
    pub async fn search(&self, query: &SearchQuery) -> AppResult<Paginated<TitleView>> {
        let (page, per_page) = page_bounds(
            query.page,
            query.per_page,
            self.search.default_per_page,
            self.search.max_per_page,
        );

        let Some(terms) = query.q.as_deref().and_then(SearchTerms::parse) else {
            return Ok(paginate(Vec::new(), page, per_page, None));
        };

        let candidates = self.repository.titles.search_candidates(&terms).await?;
        Ok(paginate(rank_candidates(candidates, &terms), page, per_page, Some(&terms)))
    }

    /// `<title> by <author>` for titles starting with the query
    pub async fn suggestions(&self, query: &SuggestionQuery) -> AppResult<Vec<String>> {
        let prefix = query.q.as_deref().map(str::trim).unwrap_or_default();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        let limit = query
            .limit
            .unwrap_or(self.search.default_suggestions)
            .clamp(1, self.search.max_suggestions);

        let rows = self.repository.titles.suggestions(prefix, limit).await?;
        Ok(rows
            .iter()
            .map(|(title, author)| suggestion_label(title, author))
            .collect())
    }

    /// Full-text search narrowed by exact filters.
    ///
    /// Without a query the filters apply to the whole catalog; with neither the
    /// result is empty.
    pub async fn advanced_search(&self, query: &AdvancedSearchQuery) -> AppResult<Paginated<TitleView>> {
        let (page, per_page) = page_bounds(
            query.page,
            query.per_page,
            self.search.default_per_page,
            self.search.max_per_page,
        );

        let terms = query.q.as_deref().and_then(SearchTerms::parse);
        if terms.is_none() && !query.has_filters() {
            return Ok(paginate(Vec::new(), page, per_page, None));
        }

        let candidates = self
            .repository
            .titles
            .advanced_candidates(terms.as_ref(), query)
            .await?;

        let titles = match &terms {
            Some(terms) if query.title_only.unwrap_or(false) => title_matches(candidates, terms),
            Some(terms) => rank_candidates(candidates, terms),
            None => candidates.into_iter().map(|c| c.title).collect(),
        };
        Ok(paginate(titles, page, per_page, terms.as_ref()))
    }
}

/// Slice an already ordered result set into one page, highlighting titles
/// against `terms` when given
fn paginate(titles: Vec<Title>, page: i64, per_page: i64, terms: Option<&SearchTerms>) -> Paginated<TitleView> {
    let total = titles.len() as i64;
    let skip = usize::try_from((page - 1).saturating_mul(per_page)).unwrap_or(usize::MAX);

    Paginated {
        items: titles
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .map(|title| {
                let title_highlight = terms.map(|terms| highlight(&title.title, terms));
                TitleView {
                    title_highlight,
                    ..TitleView::from(title)
                }
            })
            .collect(),
        total,
        page,
        per_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(id: i32, name: &str) -> Title {
        Title {
            id,
            title: name.to_string(),
            author: "Author".to_string(),
            genre: "Genre".to_string(),
            isbn: format!("978000000000{}", id),
            total_copies: 2,
            available_copies: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_paginate_keeps_order_and_total() {
        let titles: Vec<Title> = (1..=5).map(|i| title(i, &format!("T{}", i))).collect();

        let page = paginate(titles.clone(), 2, 2, None);
        assert_eq!(page.total, 5);
        assert_eq!(page.items.iter().map(|t| t.title.id).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(page.items[0].borrowed_copies, 1);
        assert!(page.items[0].is_available);

        let past_end = paginate(titles.clone(), 4, 2, None);
        assert_eq!(past_end.total, 5);
        assert!(past_end.items.is_empty());

        let far = paginate(titles, i64::MAX, 20, None);
        assert_eq!(far.total, 5);
        assert!(far.items.is_empty());
    }

    #[test]
    fn test_paginate_highlights_search_results() {
        let titles = vec![title(1, "Ruby Programming")];

        let plain = paginate(titles.clone(), 1, 20, None);
        assert!(plain.items[0].title_highlight.is_none());

        let terms = SearchTerms::parse("ruby").unwrap();
        let page = paginate(titles, 1, 20, Some(&terms));
        assert_eq!(page.items[0].title_highlight.as_deref(), Some("<mark>Ruby</mark> Programming"));
    }
}
