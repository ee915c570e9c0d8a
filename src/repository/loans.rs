//! Loans repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::loan::{check_due_after_borrowed, Loan, LoanQuery, LoanRow, LoanStatus, UpdateLoan},
};

use super::{map_constraint_error, page_bounds, titles::TitlesRepository};

const LOAN_COLUMNS: &str = "id, borrower_id, title_id, borrowed_at, due_at, returned_at";

/// Loan columns joined with the title they refer to
pub(crate) const LOAN_ROW_SELECT: &str = r#"
    SELECT l.id, l.borrower_id, l.title_id, l.borrowed_at, l.due_at, l.returned_at,
           t.title, t.author, t.isbn
    FROM loans l
    JOIN titles t ON t.id = l.title_id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!("SELECT {} FROM loans WHERE id = $1", LOAN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Get loan by ID together with its title
    pub async fn get_row(&self, id: i32) -> AppResult<LoanRow> {
        sqlx::query_as::<_, LoanRow>(&format!("{} WHERE l.id = $1", LOAN_ROW_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// List loans with filters and pagination, newest first
    pub async fn list(
        &self,
        query: &LoanQuery,
        now: DateTime<Utc>,
        default_per_page: i64,
        max_per_page: i64,
    ) -> AppResult<(Vec<LoanRow>, i64, i64, i64)> {
        let (page, per_page) = page_bounds(query.page, query.per_page, default_per_page, max_per_page);
        let offset = (page - 1) * per_page;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM loans l WHERE 1=1");
        push_loan_filters(&mut count, query, now);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("{} WHERE 1=1", LOAN_ROW_SELECT));
        push_loan_filters(&mut select, query, now);
        select
            .push(" ORDER BY l.borrowed_at DESC, l.id DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select.build_query_as::<LoanRow>().fetch_all(&self.pool).await?;

        Ok((rows, total, page, per_page))
    }

    /// Every loan ever made on a title, newest first
    pub async fn for_title(&self, title_id: i32) -> AppResult<Vec<LoanRow>> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "{} WHERE l.title_id = $1 ORDER BY l.borrowed_at DESC, l.id DESC",
            LOAN_ROW_SELECT
        ))
        .bind(title_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Outstanding loans of a borrower, soonest due first
    pub async fn active_for_borrower(&self, borrower_id: i32) -> AppResult<Vec<LoanRow>> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "{} WHERE l.borrower_id = $1 AND l.returned_at IS NULL ORDER BY l.due_at, l.id",
            LOAN_ROW_SELECT
        ))
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Most recently returned loans of a borrower
    pub async fn history_for_borrower(&self, borrower_id: i32, limit: i64) -> AppResult<Vec<LoanRow>> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            r#"{}
            WHERE l.borrower_id = $1 AND l.returned_at IS NOT NULL
            ORDER BY l.returned_at DESC, l.id DESC
            LIMIT $2"#,
            LOAN_ROW_SELECT
        ))
        .bind(borrower_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // BORROW / RETURN
    // =========================================================================

    /// Create an outstanding loan and take one copy off the shelf, atomically.
    pub async fn borrow(
        &self,
        borrower_id: i32,
        title_id: i32,
        borrowed_at: DateTime<Utc>,
        due_at: DateTime<Utc>,
    ) -> AppResult<Loan> {
        check_due_after_borrowed(borrowed_at, due_at)?;

        let mut tx = self.pool.begin().await?;

        let title_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE id = $1)")
            .bind(title_id)
            .fetch_one(&mut *tx)
            .await?;
        if !title_exists {
            return Err(AppError::NotFound(format!("Title with id {} not found", title_id)));
        }

        let already_borrowed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM loans
                WHERE borrower_id = $1 AND title_id = $2 AND returned_at IS NULL
            )
            "#,
        )
        .bind(borrower_id)
        .bind(title_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_borrowed {
            return Err(AppError::Conflict("Title already borrowed by this borrower".to_string()));
        }

        TitlesRepository::adjust_availability(&mut tx, title_id, -1).await?;

        // The partial unique index settles a race between two borrows by the same borrower
        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            INSERT INTO loans (borrower_id, title_id, borrowed_at, due_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(borrower_id)
        .bind(title_id)
        .bind(borrowed_at)
        .bind(due_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_constraint_error)?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Close an outstanding loan and put its copy back on the shelf, atomically.
    pub async fn return_loan(&self, id: i32, returned_at: DateTime<Utc>) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let returned = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans SET returned_at = $2, updated_at = NOW()
            WHERE id = $1 AND returned_at IS NULL
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(id)
        .bind(returned_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_constraint_error)?;

        let loan = match returned {
            Some(loan) => loan,
            None => {
                let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
                return Err(if exists {
                    AppError::Conflict("Loan already returned".to_string())
                } else {
                    AppError::NotFound(format!("Loan with id {} not found", id))
                });
            }
        };

        TitlesRepository::adjust_availability(&mut tx, loan.title_id, 1).await?;

        tx.commit().await?;
        Ok(loan)
    }

    // =========================================================================
    // ADMINISTRATIVE UPDATE / DELETE
    // =========================================================================

    /// Change due date and/or return timestamp.
    ///
    /// Setting `returned_at` on an outstanding loan returns it. On a loan already
    /// returned it only corrects the timestamp; a loan is never reopened.
    pub async fn update(&self, id: i32, changes: &UpdateLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE id = $1 FOR UPDATE",
            LOAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        changes.check_against(&current)?;

        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans SET
                due_at = COALESCE($2, due_at),
                returned_at = COALESCE($3, returned_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(id)
        .bind(changes.due_at)
        .bind(changes.returned_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_constraint_error)?;

        if current.is_active() && !loan.is_active() {
            TitlesRepository::adjust_availability(&mut tx, loan.title_id, 1).await?;
        }

        tx.commit().await?;
        Ok(loan)
    }

    /// Remove a loan record. Deleting an outstanding loan puts its copy back.
    pub async fn delete(&self, id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(&format!(
            "DELETE FROM loans WHERE id = $1 RETURNING {}",
            LOAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        if loan.is_active() {
            TitlesRepository::adjust_availability(&mut tx, loan.title_id, 1).await?;
        }

        tx.commit().await?;
        Ok(loan)
    }
}

fn push_loan_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &LoanQuery, now: DateTime<Utc>) {
    if let Some(borrower_id) = query.borrower_id {
        qb.push(" AND l.borrower_id = ").push_bind(borrower_id);
    }
    if let Some(title_id) = query.title_id {
        qb.push(" AND l.title_id = ").push_bind(title_id);
    }
    match query.status {
        Some(LoanStatus::Active) => {
            qb.push(" AND l.returned_at IS NULL");
        }
        Some(LoanStatus::Returned) => {
            qb.push(" AND l.returned_at IS NOT NULL");
        }
        Some(LoanStatus::Overdue) => {
            qb.push(" AND l.returned_at IS NULL AND l.due_at < ").push_bind(now);
        }
        None => {}
    }
}
