//! Loan management service

use chrono::{DateTime, Duration, Utc};

use crate::{
    config::{LendingConfig, SearchConfig},
    error::AppResult,
    models::{
        loan::{CreateLoan, Loan, LoanDetails, LoanQuery, UpdateLoan},
        title::Paginated,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    lending: LendingConfig,
    search: SearchConfig,
}

impl LoansService {
    pub fn new(repository: Repository, lending: LendingConfig, search: SearchConfig) -> Self {
        Self {
            repository,
            lending,
            search,
        }
    }

    fn due_soon(&self) -> Duration {
        Duration::days(self.lending.due_soon_days)
    }

    /// Get loan by ID
    pub async fn get(&self, id: i32) -> AppResult<Loan> {
        self.repository.loans.get_by_id(id).await
    }

    /// Get loan by ID with its title and derived state
    pub async fn get_details(&self, id: i32) -> AppResult<LoanDetails> {
        let row = self.repository.loans.get_row(id).await?;
        Ok(row.into_details(Utc::now(), self.due_soon()))
    }

    /// List loans with filters
    pub async fn list(&self, query: &LoanQuery) -> AppResult<Paginated<LoanDetails>> {
        let now = Utc::now();
        let (rows, total, page, per_page) = self
            .repository
            .loans
            .list(query, now, self.search.default_per_page, self.search.max_per_page)
            .await?;

        let due_soon = self.due_soon();
        Ok(Paginated {
            items: rows.into_iter().map(|r| r.into_details(now, due_soon)).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Outstanding loans of a borrower
    pub async fn active_for_borrower(&self, borrower_id: i32) -> AppResult<Vec<LoanDetails>> {
        let now = Utc::now();
        let due_soon = self.due_soon();
        let rows = self.repository.loans.active_for_borrower(borrower_id).await?;
        Ok(rows.into_iter().map(|r| r.into_details(now, due_soon)).collect())
    }

    /// Recently returned loans of a borrower
    pub async fn history_for_borrower(&self, borrower_id: i32) -> AppResult<Vec<LoanDetails>> {
        let now = Utc::now();
        let due_soon = self.due_soon();
        let rows = self
            .repository
            .loans
            .history_for_borrower(borrower_id, self.lending.history_limit)
            .await?;
        Ok(rows.into_iter().map(|r| r.into_details(now, due_soon)).collect())
    }

    /// Borrow one copy of a title
    pub async fn borrow(&self, borrower_id: i32, request: &CreateLoan) -> AppResult<Loan> {
        let now = Utc::now();
        let due_at = request
            .due_at
            .unwrap_or_else(|| default_due_at(now, self.lending.default_loan_days));

        let loan = self
            .repository
            .loans
            .borrow(borrower_id, request.title_id, now, due_at)
            .await?;

        tracing::info!(
            "Loan created: id={} borrower={} title={} due={}",
            loan.id,
            loan.borrower_id,
            loan.title_id,
            loan.due_at
        );
        Ok(loan)
    }

    /// Return a borrowed copy
    pub async fn return_loan(&self, id: i32) -> AppResult<Loan> {
        let loan = self.repository.loans.return_loan(id, Utc::now()).await?;
        tracing::info!("Loan returned: id={} title={}", loan.id, loan.title_id);
        Ok(loan)
    }

    /// Administrative update of due date and/or return timestamp
    pub async fn update(&self, id: i32, changes: &UpdateLoan) -> AppResult<Loan> {
        let loan = self.repository.loans.update(id, changes).await?;
        tracing::info!("Loan updated: id={}", loan.id);
        Ok(loan)
    }

    /// Delete a loan record
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let loan = self.repository.loans.delete(id).await?;
        if loan.is_active() {
            tracing::info!("Outstanding loan deleted: id={} title={}, copy restored", loan.id, loan.title_id);
        } else {
            tracing::info!("Loan deleted: id={}", loan.id);
        }
        Ok(())
    }
}

/// Due date used when a borrow request does not give one
pub fn default_due_at(borrowed_at: DateTime<Utc>, loan_days: i64) -> DateTime<Utc> {
    borrowed_at + Duration::days(loan_days)
}
