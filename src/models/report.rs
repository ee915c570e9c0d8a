//! Read-only circulation report rows

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// A title ranked by how many times it has been lent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowedTitleCount {
    pub title_id: i32,
    pub title: String,
    pub author: String,
    pub loan_count: i64,
}

/// A borrower holding at least one overdue loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OverdueBorrower {
    pub borrower_id: i32,
    pub overdue_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}
