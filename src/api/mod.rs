//! API handlers for the circulation REST endpoints

pub mod health;
pub mod loans;
pub mod openapi;
pub mod reports;
pub mod titles;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::user::{CurrentUser, Role},
    AppState,
};

/// Caller id, set by the identity gateway in front of this service
pub const USER_ID_HEADER: &str = "x-user-id";
/// Caller role (`member` or `librarian`), set by the identity gateway
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor for the caller already authenticated upstream
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, USER_ID_HEADER)
            .ok_or_else(|| AppError::Authentication("Missing caller identity".to_string()))?
            .parse::<i32>()
            .map_err(|_| AppError::Authentication("Invalid caller identity".to_string()))?;

        let role = header_value(parts, USER_ROLE_HEADER)
            .ok_or_else(|| AppError::Authentication("Missing caller role".to_string()))?
            .parse::<Role>()
            .map_err(AppError::Authentication)?;

        Ok(AuthenticatedUser(CurrentUser { id, role }))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Titles (catalog)
        .route("/titles", get(titles::list_titles).post(titles::create_title))
        .route("/titles/search", get(titles::search_titles))
        .route("/titles/search/suggestions", get(titles::search_suggestions))
        .route("/titles/search/advanced", get(titles::advanced_search))
        .route(
            "/titles/:id",
            get(titles::get_title)
                .put(titles::update_title)
                .delete(titles::delete_title),
        )
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::create_loan))
        .route(
            "/loans/:id",
            get(loans::get_loan)
                .put(loans::update_loan)
                .delete(loans::delete_loan),
        )
        .route("/loans/:id/return", post(loans::return_loan))
        // Borrowers
        .route("/borrowers/:id/loans", get(loans::get_borrower_loans))
        .route("/borrowers/:id/history", get(loans::get_borrower_history))
        // Reports
        .route("/reports/overdue", get(reports::overdue))
        .route("/reports/due-today", get(reports::due_today))
        .route("/reports/due-this-week", get(reports::due_this_week))
        .route("/reports/most-borrowed", get(reports::most_borrowed))
        .route("/reports/overdue-borrowers", get(reports::overdue_borrowers))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
