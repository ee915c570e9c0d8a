//! Titles repository: catalog storage, copy counters and the search projection

use sqlx::{Connection, PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::title::{normalize_isbn, AdvancedSearchQuery, Title, TitleDraft, TitleQuery, UpdateTitle},
    search::{contains_pattern, prefix_pattern, SearchCandidate, SearchProjection, SearchTerms},
};

use super::{map_constraint_error, page_bounds};

const TITLE_COLUMNS: &str =
    "id, title, author, genre, isbn, total_copies, available_copies, created_at, updated_at";

const PROJECTION_COLUMNS: &str =
    "search_title_terms, search_author_terms, search_genre_terms, search_isbn_terms";

#[derive(Clone)]
pub struct TitlesRepository {
    pool: Pool<Postgres>,
}

impl TitlesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Get title by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Title> {
        sqlx::query_as::<_, Title>(&format!("SELECT {} FROM titles WHERE id = $1", TITLE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Title with id {} not found", id)))
    }

    /// List titles with substring filters and pagination
    pub async fn list(
        &self,
        query: &TitleQuery,
        default_per_page: i64,
        max_per_page: i64,
    ) -> AppResult<(Vec<Title>, i64, i64, i64)> {
        let (page, per_page) = page_bounds(query.page, query.per_page, default_per_page, max_per_page);
        let offset = (page - 1) * per_page;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM titles WHERE 1=1");
        push_list_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM titles WHERE 1=1",
            TITLE_COLUMNS
        ));
        push_list_filters(&mut select, query);
        select
            .push(" ORDER BY LOWER(title), id LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);

        let titles = select.build_query_as::<Title>().fetch_all(&self.pool).await?;

        Ok((titles, total, page, per_page))
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Insert a new title and its search projection in one transaction
    pub async fn create(&self, draft: &TitleDraft) -> AppResult<Title> {
        draft.check()?;

        let mut tx = self.pool.begin().await?;

        let title = sqlx::query_as::<_, Title>(&format!(
            r#"
            INSERT INTO titles (title, author, genre, isbn, total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            TITLE_COLUMNS
        ))
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(&draft.genre)
        .bind(&draft.isbn)
        .bind(draft.total_copies)
        .bind(draft.available_copies)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_constraint_error)?;

        refresh_projection(&mut tx, title.id, &SearchProjection::for_draft(draft)).await;

        tx.commit().await?;
        Ok(title)
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Update a title against its current committed row.
    ///
    /// The row is locked first so the copy-count check sees the same value the
    /// write is applied to. Copies on loan are preserved when `total_copies` changes.
    pub async fn update(&self, id: i32, changes: &UpdateTitle) -> AppResult<Title> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, SearchCandidate>(&format!(
            "SELECT {}, {} FROM titles WHERE id = $1 FOR UPDATE",
            TITLE_COLUMNS, PROJECTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Title with id {} not found", id)))?;

        let draft = TitleDraft::from_update(&current.title, changes);
        draft.check()?;

        let updated = sqlx::query_as::<_, Title>(&format!(
            r#"
            UPDATE titles SET
                title = $2,
                author = $3,
                genre = $4,
                isbn = $5,
                available_copies = available_copies + ($6 - total_copies),
                total_copies = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TITLE_COLUMNS
        ))
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(&draft.genre)
        .bind(&draft.isbn)
        .bind(draft.total_copies)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_constraint_error)?;

        if draft.text_changed(&current.title) || current.projection.is_empty() {
            refresh_projection(&mut tx, id, &SearchProjection::for_draft(&draft)).await;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Move `available_copies` by `delta`, keeping it within `0..=total_copies`.
    ///
    /// This is the only write path for the counter. It is a single conditional
    /// update evaluated against the committed row, and must run on the caller's
    /// transaction so the counter commits or rolls back with the loan row.
    pub async fn adjust_availability(conn: &mut PgConnection, title_id: i32, delta: i32) -> AppResult<Title> {
        let adjusted = sqlx::query_as::<_, Title>(&format!(
            r#"
            UPDATE titles
            SET available_copies = available_copies + $2, updated_at = NOW()
            WHERE id = $1
              AND available_copies + $2 >= 0
              AND available_copies + $2 <= total_copies
            RETURNING {}
            "#,
            TITLE_COLUMNS
        ))
        .bind(title_id)
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_constraint_error)?;

        if let Some(title) = adjusted {
            return Ok(title);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE id = $1)")
            .bind(title_id)
            .fetch_one(&mut *conn)
            .await?;

        if !exists {
            Err(AppError::NotFound(format!("Title with id {} not found", title_id)))
        } else if delta < 0 {
            Err(AppError::Conflict("No copies available for borrowing".to_string()))
        } else {
            Err(AppError::Conflict("All copies are already available".to_string()))
        }
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// Delete a title and, by cascade, its loan history.
    /// Refused while any loan on it is outstanding.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM titles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Title with id {} not found", id)))?;

        let has_active_loans: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE title_id = $1 AND returned_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if has_active_loans {
            return Err(AppError::Conflict(
                "Title has active loans and cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // SEARCH
    // =========================================================================

    /// Titles whose projection shares a term with the query, or whose title,
    /// author or ISBN contains the raw query. Unranked.
    pub async fn search_candidates(&self, query: &SearchTerms) -> AppResult<Vec<SearchCandidate>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {}, {} FROM titles WHERE ",
            TITLE_COLUMNS, PROJECTION_COLUMNS
        ));
        push_match_clause(&mut qb, query);

        Ok(qb.build_query_as::<SearchCandidate>().fetch_all(&self.pool).await?)
    }

    /// Full-text candidates (when a query is given) narrowed by exact filters.
    /// Without a query the rows come back alphabetically.
    pub async fn advanced_candidates(
        &self,
        query: Option<&SearchTerms>,
        filters: &AdvancedSearchQuery,
    ) -> AppResult<Vec<SearchCandidate>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {}, {} FROM titles WHERE 1=1",
            TITLE_COLUMNS, PROJECTION_COLUMNS
        ));

        if let Some(query) = query {
            qb.push(" AND ");
            push_match_clause(&mut qb, query);
        }
        if let Some(genre) = non_blank(&filters.genre) {
            qb.push(" AND LOWER(genre) = LOWER(").push_bind(genre).push(")");
        }
        if let Some(author) = non_blank(&filters.author) {
            qb.push(" AND LOWER(author) = LOWER(").push_bind(author).push(")");
        }
        if let Some(isbn) = non_blank(&filters.isbn) {
            let digits = normalize_isbn(&isbn);
            if digits.is_empty() {
                qb.push(" AND FALSE");
            } else {
                qb.push(" AND isbn LIKE ").push_bind(contains_pattern(&digits));
            }
        }
        if filters.available_only.unwrap_or(false) {
            qb.push(" AND available_copies > 0");
        }
        if let Some(min_copies) = filters.min_copies {
            qb.push(" AND total_copies >= ").push_bind(min_copies);
        }
        qb.push(" ORDER BY LOWER(title), id");

        Ok(qb.build_query_as::<SearchCandidate>().fetch_all(&self.pool).await?)
    }

    /// `(title, author)` pairs whose title starts with `prefix`
    pub async fn suggestions(&self, prefix: &str, limit: i64) -> AppResult<Vec<(String, String)>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT title, author FROM titles WHERE title ILIKE $1 ORDER BY LOWER(title), id LIMIT $2",
        )
        .bind(prefix_pattern(prefix))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Store a freshly computed projection inside its own savepoint.
///
/// A failure here is logged and rolled back to the savepoint; the surrounding title
/// write still commits and the substring fallback keeps the row findable.
async fn refresh_projection(conn: &mut PgConnection, title_id: i32, projection: &SearchProjection) {
    let result = async {
        let mut savepoint = Connection::begin(&mut *conn).await?;
        sqlx::query(
            r#"
            UPDATE titles SET
                search_title_terms = $2,
                search_author_terms = $3,
                search_genre_terms = $4,
                search_isbn_terms = $5
            WHERE id = $1
            "#,
        )
        .bind(title_id)
        .bind(&projection.search_title_terms)
        .bind(&projection.search_author_terms)
        .bind(&projection.search_genre_terms)
        .bind(&projection.search_isbn_terms)
        .execute(&mut *savepoint)
        .await?;
        savepoint.commit().await?;
        Ok::<(), sqlx::Error>(())
    }
    .await;

    if let Err(e) = result {
        tracing::warn!("Failed to update search projection for title {}: {}", title_id, e);
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn push_match_clause(qb: &mut QueryBuilder<'_, Postgres>, query: &SearchTerms) {
    let pattern = query.like_pattern();
    qb.push("(search_title_terms && ")
        .push_bind(query.terms.clone())
        .push(" OR search_author_terms && ")
        .push_bind(query.terms.clone())
        .push(" OR search_genre_terms && ")
        .push_bind(query.terms.clone())
        .push(" OR search_isbn_terms && ")
        .push_bind(query.terms.clone())
        .push(" OR title ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR author ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR isbn ILIKE ")
        .push_bind(pattern)
        .push(")");
}

fn push_list_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &TitleQuery) {
    if let Some(title) = non_blank(&query.title) {
        qb.push(" AND title ILIKE ").push_bind(contains_pattern(&title));
    }
    if let Some(author) = non_blank(&query.author) {
        qb.push(" AND author ILIKE ").push_bind(contains_pattern(&author));
    }
    if let Some(genre) = non_blank(&query.genre) {
        qb.push(" AND genre ILIKE ").push_bind(contains_pattern(&genre));
    }
    if query.available_only.unwrap_or(false) {
        qb.push(" AND available_copies > 0");
    }
}
