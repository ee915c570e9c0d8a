//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, loans, reports, titles};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation API",
        version = "0.1.0",
        description = "Lending inventory: catalog, search and loans"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Titles
        titles::list_titles,
        titles::get_title,
        titles::create_title,
        titles::update_title,
        titles::delete_title,
        // Search
        titles::search_titles,
        titles::search_suggestions,
        titles::advanced_search,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::create_loan,
        loans::return_loan,
        loans::update_loan,
        loans::delete_loan,
        loans::get_borrower_loans,
        loans::get_borrower_history,
        // Reports
        reports::overdue,
        reports::due_today,
        reports::due_this_week,
        reports::most_borrowed,
        reports::overdue_borrowers,
    ),
    components(
        schemas(
            // Titles
            crate::models::title::Title,
            crate::models::title::TitleView,
            crate::models::title::TitleDetails,
            crate::models::title::CreateTitle,
            crate::models::title::UpdateTitle,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::TitleSummary,
            crate::models::loan::CreateLoan,
            crate::models::loan::UpdateLoan,
            crate::models::loan::LoanStatus,
            // Reports
            crate::models::report::BorrowedTitleCount,
            crate::models::report::OverdueBorrower,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::error::ErrorKind,
            crate::error::FieldError,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "titles", description = "Catalog management"),
        (name = "search", description = "Catalog search"),
        (name = "loans", description = "Borrowing and returns"),
        (name = "reports", description = "Circulation reports")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
