//! Circulation reports

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::{
    config::LendingConfig,
    error::AppResult,
    models::{
        loan::{LoanDetails, LoanRow},
        report::{BorrowedTitleCount, OverdueBorrower},
    },
    repository::Repository,
};

const DEFAULT_MOST_BORROWED: i64 = 10;
const MAX_MOST_BORROWED: i64 = 100;

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
    lending: LendingConfig,
}

impl ReportsService {
    pub fn new(repository: Repository, lending: LendingConfig) -> Self {
        Self { repository, lending }
    }

    fn details(&self, rows: Vec<LoanRow>, now: DateTime<Utc>) -> Vec<LoanDetails> {
        let due_soon = Duration::days(self.lending.due_soon_days);
        rows.into_iter().map(|r| r.into_details(now, due_soon)).collect()
    }

    /// Outstanding loans past their due date
    pub async fn overdue(&self) -> AppResult<Vec<LoanDetails>> {
        let now = Utc::now();
        let rows = self.repository.reports.overdue(now).await?;
        Ok(self.details(rows, now))
    }

    /// Outstanding loans due on the current calendar day (UTC)
    pub async fn due_today(&self) -> AppResult<Vec<LoanDetails>> {
        let now = Utc::now();
        let (start, end) = day_bounds(now);
        let rows = self.repository.reports.due_between(start, end).await?;
        Ok(self.details(rows, now))
    }

    /// Outstanding loans due within the next seven days
    pub async fn due_this_week(&self) -> AppResult<Vec<LoanDetails>> {
        let now = Utc::now();
        let rows = self
            .repository
            .reports
            .due_between(now, now + Duration::days(7))
            .await?;
        Ok(self.details(rows, now))
    }

    /// Titles lent most often
    pub async fn most_borrowed(&self, limit: Option<i64>) -> AppResult<Vec<BorrowedTitleCount>> {
        let limit = limit.unwrap_or(DEFAULT_MOST_BORROWED).clamp(1, MAX_MOST_BORROWED);
        self.repository.reports.most_borrowed(limit).await
    }

    /// Borrowers with at least one overdue loan
    pub async fn overdue_borrowers(&self) -> AppResult<Vec<OverdueBorrower>> {
        self.repository.reports.overdue_borrowers(Utc::now()).await
    }
}

/// Midnight to midnight (UTC) around `now`
fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}
