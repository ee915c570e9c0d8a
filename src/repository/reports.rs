//! Read-only circulation reports

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        loan::LoanRow,
        report::{BorrowedTitleCount, OverdueBorrower},
    },
};

use super::loans::LOAN_ROW_SELECT;

#[derive(Clone)]
pub struct ReportsRepository {
    pool: Pool<Postgres>,
}

impl ReportsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Outstanding loans whose due date has passed, oldest due first
    pub async fn overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<LoanRow>> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "{} WHERE l.returned_at IS NULL AND l.due_at < $1 ORDER BY l.due_at, l.id",
            LOAN_ROW_SELECT
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Outstanding loans due in `[start, end)`
    pub async fn due_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Vec<LoanRow>> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            r#"{}
            WHERE l.returned_at IS NULL AND l.due_at >= $1 AND l.due_at < $2
            ORDER BY l.due_at, l.id"#,
            LOAN_ROW_SELECT
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Titles by number of loans ever made, returned or not
    pub async fn most_borrowed(&self, limit: i64) -> AppResult<Vec<BorrowedTitleCount>> {
        let rows = sqlx::query_as::<_, BorrowedTitleCount>(
            r#"
            SELECT t.id AS title_id, t.title, t.author, COUNT(l.id) AS loan_count
            FROM titles t
            JOIN loans l ON l.title_id = t.id
            GROUP BY t.id
            ORDER BY loan_count DESC, LOWER(t.title), t.id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Borrowers holding overdue loans, most overdue loans first
    pub async fn overdue_borrowers(&self, now: DateTime<Utc>) -> AppResult<Vec<OverdueBorrower>> {
        let rows = sqlx::query_as::<_, OverdueBorrower>(
            r#"
            SELECT borrower_id, COUNT(*) AS overdue_count
            FROM loans
            WHERE returned_at IS NULL AND due_at < $1
            GROUP BY borrower_id
            ORDER BY overdue_count DESC, borrower_id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
