//! Loan (one physical-copy checkout) model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppResult, FieldErrors};

/// Loan model from database. `returned_at` empty means outstanding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub borrower_id: i32,
    pub title_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }

    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.due_at < now
    }

    /// Whole days elapsed since the due date, 0 unless overdue.
    pub fn days_overdue_at(&self, now: DateTime<Utc>) -> i64 {
        if self.is_overdue_at(now) {
            (now - self.due_at).num_days()
        } else {
            0
        }
    }

    /// Outstanding, not yet overdue, and due within `window`.
    pub fn is_due_soon_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.is_active() && self.due_at > now && self.due_at <= now + window
    }
}

/// Due date must fall strictly after the borrow date.
pub fn check_due_after_borrowed(
    borrowed_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    if due_at <= borrowed_at {
        errors.add("due_at", "must be after borrowed date");
    }
    errors.into_result()
}

/// Minimal title fields carried alongside a loan
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TitleSummary {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

/// Loan joined with its title, as read by listing queries
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    pub id: i32,
    pub borrower_id: i32,
    pub title_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl LoanRow {
    pub fn into_details(self, now: DateTime<Utc>, due_soon: Duration) -> LoanDetails {
        let loan = Loan {
            id: self.id,
            borrower_id: self.borrower_id,
            title_id: self.title_id,
            borrowed_at: self.borrowed_at,
            due_at: self.due_at,
            returned_at: self.returned_at,
        };
        LoanDetails::new(
            loan,
            TitleSummary {
                id: self.title_id,
                title: self.title,
                author: self.author,
                isbn: self.isbn,
            },
            now,
            due_soon,
        )
    }
}

/// Loan with its title and state derived at read time
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub title: TitleSummary,
    pub is_active: bool,
    pub is_overdue: bool,
    pub is_due_soon: bool,
    pub days_overdue: i64,
}

impl LoanDetails {
    pub fn new(loan: Loan, title: TitleSummary, now: DateTime<Utc>, due_soon: Duration) -> Self {
        Self {
            is_active: loan.is_active(),
            is_overdue: loan.is_overdue_at(now),
            is_due_soon: loan.is_due_soon_at(now, due_soon),
            days_overdue: loan.days_overdue_at(now),
            loan,
            title,
        }
    }
}

/// Borrow request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub title_id: i32,
    /// Defaults to the configured loan period from now
    pub due_at: Option<DateTime<Utc>>,
    /// Borrow on behalf of another member (librarians only)
    pub borrower_id: Option<i32>,
}

/// Administrative loan update. Borrow-time uniqueness and availability rules are not
/// re-applied; the due date must still follow the borrow date.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateLoan {
    pub due_at: Option<DateTime<Utc>>,
    /// Setting this on an outstanding loan returns it
    pub returned_at: Option<DateTime<Utc>>,
}

impl UpdateLoan {
    /// Validate the update against the loan as currently committed
    pub fn check_against(&self, current: &Loan) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if self.due_at.is_none() && self.returned_at.is_none() {
            errors.add("loan", "at least one of due_at or returned_at is required");
        }
        if let Some(due_at) = self.due_at {
            if due_at <= current.borrowed_at {
                errors.add("due_at", "must be after borrowed date");
            }
        }
        if let Some(returned_at) = self.returned_at {
            if returned_at < current.borrowed_at {
                errors.add("returned_at", "cannot be before borrowed date");
            }
        }
        errors.into_result()
    }
}

/// Loan state filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
    Overdue,
}

/// Loan listing filters
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct LoanQuery {
    pub borrower_id: Option<i32>,
    pub title_id: Option<i32>,
    pub status: Option<LoanStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
