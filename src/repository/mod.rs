//! Repository layer for database operations

pub mod loans;
pub mod reports;
pub mod titles;

use sqlx::{Pool, Postgres};

use crate::error::AppError;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub titles: titles::TitlesRepository,
    pub loans: loans::LoansRepository,
    pub reports: reports::ReportsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            titles: titles::TitlesRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            reports: reports::ReportsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";

/// Translate constraint violations into conflicts; anything else stays a database error.
///
/// Constraints back up the checks done in application code, so a lost race surfaces
/// here instead of as corrupted counters.
pub(crate) fn map_constraint_error(err: sqlx::Error) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        let code = db_err.code();
        let constraint = db_err.constraint().unwrap_or_default();

        match (code.as_deref(), constraint) {
            (Some(UNIQUE_VIOLATION), "titles_isbn_key") => {
                return AppError::Conflict("A title with this ISBN already exists".to_string());
            }
            (Some(UNIQUE_VIOLATION), "loans_one_outstanding_per_borrower") => {
                return AppError::Conflict("Title already borrowed by this borrower".to_string());
            }
            (Some(CHECK_VIOLATION), "titles_available_copies_bounds") => {
                return AppError::Conflict(
                    "Available copies must stay between 0 and total copies".to_string(),
                );
            }
            (Some(CHECK_VIOLATION), "loans_due_after_borrowed") => {
                return AppError::invalid("due_at", "must be after borrowed date");
            }
            (Some(CHECK_VIOLATION), "loans_returned_after_borrowed") => {
                return AppError::invalid("returned_at", "cannot be before borrowed date");
            }
            _ => {}
        }
    }
    AppError::Database(err)
}

/// Page and per-page clamped to sane bounds. The page is capped so that
/// `(page - 1) * per_page` always fits in an `i64`.
pub(crate) fn page_bounds(page: Option<i64>, per_page: Option<i64>, default: i64, max: i64) -> (i64, i64) {
    let max = max.max(1);
    let page = page.unwrap_or(1).clamp(1, i64::MAX / max);
    let per_page = per_page.unwrap_or(default).clamp(1, max);
    (page, per_page)
}
