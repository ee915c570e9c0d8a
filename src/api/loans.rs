//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        loan::{CreateLoan, Loan, LoanDetails, LoanQuery, UpdateLoan},
        title::Paginated,
    },
};

use super::AuthenticatedUser;

/// List loans. Members only see their own.
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(
        ("borrower_id" = Option<i32>, Query, description = "Filter by borrower"),
        ("title_id" = Option<i32>, Query, description = "Filter by title"),
        ("status" = Option<String>, Query, description = "active, returned or overdue"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Loans per page (default: 20, max: 100)")
    ),
    responses(
        (status = 200, description = "List of loans", body = Paginated<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(mut query): Query<LoanQuery>,
) -> AppResult<Json<Paginated<LoanDetails>>> {
    if !user.is_librarian() {
        query.borrower_id = Some(user.id);
    }

    let loans = state.services.loans.list(&query).await?;
    Ok(Json(loans))
}

/// Get loan details by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_details(id).await?;
    user.require_self_or_librarian(loan.loan.borrower_id)?;

    Ok(Json(loan))
}

/// Borrow a copy of a title
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 403, description = "Borrowing on behalf of someone else requires the librarian role"),
        (status = 404, description = "Title not found"),
        (status = 409, description = "Already borrowed or no copies available"),
        (status = 422, description = "Invalid due date", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let borrower_id = user.borrower_for(request.borrower_id)?;

    let loan = state.services.loans.borrow(borrower_id, &request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan returned", body = Loan),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.get(id).await?;
    user.require_self_or_librarian(loan.borrower_id)?;

    let returned = state.services.loans.return_loan(id).await?;
    Ok(Json(returned))
}

/// Change a loan's due date or return timestamp
#[utoipa::path(
    put,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = UpdateLoan,
    responses(
        (status = 200, description = "Loan updated", body = Loan),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Invalid dates", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(changes): Json<UpdateLoan>,
) -> AppResult<Json<Loan>> {
    user.require_librarian()?;

    let loan = state.services.loans.update(id, &changes).await?;
    Ok(Json(loan))
}

/// Delete a loan record
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    user.require_librarian()?;

    state.services.loans.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Outstanding loans of a borrower
#[utoipa::path(
    get,
    path = "/borrowers/{id}/loans",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    responses(
        (status = 200, description = "Borrower's active loans", body = Vec<LoanDetails>),
        (status = 403, description = "Not the borrower")
    )
)]
pub async fn get_borrower_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(borrower_id): Path<i32>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    user.require_self_or_librarian(borrower_id)?;

    let loans = state.services.loans.active_for_borrower(borrower_id).await?;
    Ok(Json(loans))
}

/// Recently returned loans of a borrower
#[utoipa::path(
    get,
    path = "/borrowers/{id}/history",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    responses(
        (status = 200, description = "Borrower's return history", body = Vec<LoanDetails>),
        (status = 403, description = "Not the borrower")
    )
)]
pub async fn get_borrower_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(borrower_id): Path<i32>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    user.require_self_or_librarian(borrower_id)?;

    let loans = state.services.loans.history_for_borrower(borrower_id).await?;
    Ok(Json(loans))
}
