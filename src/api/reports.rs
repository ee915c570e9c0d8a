//! Circulation report endpoints (librarians only)

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        loan::LoanDetails,
        report::{BorrowedTitleCount, LimitQuery, OverdueBorrower},
    },
};

use super::AuthenticatedUser;

/// Outstanding loans past their due date
#[utoipa::path(
    get,
    path = "/reports/overdue",
    tag = "reports",
    responses(
        (status = 200, description = "Overdue loans", body = Vec<LoanDetails>),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    user.require_librarian()?;

    Ok(Json(state.services.reports.overdue().await?))
}

/// Outstanding loans due today
#[utoipa::path(
    get,
    path = "/reports/due-today",
    tag = "reports",
    responses(
        (status = 200, description = "Loans due today", body = Vec<LoanDetails>),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn due_today(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    user.require_librarian()?;

    Ok(Json(state.services.reports.due_today().await?))
}

/// Outstanding loans due in the next seven days
#[utoipa::path(
    get,
    path = "/reports/due-this-week",
    tag = "reports",
    responses(
        (status = 200, description = "Loans due this week", body = Vec<LoanDetails>),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn due_this_week(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    user.require_librarian()?;

    Ok(Json(state.services.reports.due_this_week().await?))
}

/// Titles lent most often
#[utoipa::path(
    get,
    path = "/reports/most-borrowed",
    tag = "reports",
    params(
        ("limit" = Option<i64>, Query, description = "Number of titles (default: 10, max: 100)")
    ),
    responses(
        (status = 200, description = "Most borrowed titles", body = Vec<BorrowedTitleCount>),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn most_borrowed(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<BorrowedTitleCount>>> {
    user.require_librarian()?;

    Ok(Json(state.services.reports.most_borrowed(query.limit).await?))
}

/// Borrowers holding overdue loans
#[utoipa::path(
    get,
    path = "/reports/overdue-borrowers",
    tag = "reports",
    responses(
        (status = 200, description = "Borrowers with overdue loans", body = Vec<OverdueBorrower>),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn overdue_borrowers(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<Vec<OverdueBorrower>>> {
    user.require_librarian()?;

    Ok(Json(state.services.reports.overdue_borrowers().await?))
}
