//! Title (catalog) and search endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::title::{
        AdvancedSearchQuery, CreateTitle, Paginated, SearchQuery, SuggestionQuery, Title, TitleDetails, TitleQuery,
        TitleView, UpdateTitle,
    },
};

use super::AuthenticatedUser;

/// List titles with filters and pagination
#[utoipa::path(
    get,
    path = "/titles",
    tag = "titles",
    params(
        ("title" = Option<String>, Query, description = "Substring of the title"),
        ("author" = Option<String>, Query, description = "Substring of the author"),
        ("genre" = Option<String>, Query, description = "Substring of the genre"),
        ("available_only" = Option<bool>, Query, description = "Only titles with a copy on the shelf"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Titles per page (default: 20, max: 100)")
    ),
    responses(
        (status = 200, description = "List of titles", body = Paginated<TitleView>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_titles(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<TitleQuery>,
) -> AppResult<Json<Paginated<TitleView>>> {
    let titles = state.services.catalog.list_titles(&query).await?;
    Ok(Json(titles))
}

/// Get title details by ID, including its loans
#[utoipa::path(
    get,
    path = "/titles/{id}",
    tag = "titles",
    params(
        ("id" = i32, Path, description = "Title ID")
    ),
    responses(
        (status = 200, description = "Title details", body = TitleDetails),
        (status = 404, description = "Title not found")
    )
)]
pub async fn get_title(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<TitleDetails>> {
    let title = state.services.catalog.get_title_details(id).await?;
    Ok(Json(title))
}

/// Create a new title
#[utoipa::path(
    post,
    path = "/titles",
    tag = "titles",
    request_body = CreateTitle,
    responses(
        (status = 201, description = "Title created", body = Title),
        (status = 403, description = "Librarian role required"),
        (status = 409, description = "ISBN already in the catalog"),
        (status = 422, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_title(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<CreateTitle>,
) -> AppResult<(StatusCode, Json<Title>)> {
    user.require_librarian()?;

    let created = state.services.catalog.create_title(&request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing title
#[utoipa::path(
    put,
    path = "/titles/{id}",
    tag = "titles",
    params(
        ("id" = i32, Path, description = "Title ID")
    ),
    request_body = UpdateTitle,
    responses(
        (status = 200, description = "Title updated", body = Title),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "Title not found"),
        (status = 409, description = "ISBN already in the catalog"),
        (status = 422, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_title(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(changes): Json<UpdateTitle>,
) -> AppResult<Json<Title>> {
    user.require_librarian()?;

    let updated = state.services.catalog.update_title(id, &changes).await?;
    Ok(Json(updated))
}

/// Delete a title
#[utoipa::path(
    delete,
    path = "/titles/{id}",
    tag = "titles",
    params(
        ("id" = i32, Path, description = "Title ID")
    ),
    responses(
        (status = 204, description = "Title deleted"),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "Title not found"),
        (status = 409, description = "Title has active loans")
    )
)]
pub async fn delete_title(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    user.require_librarian()?;

    state.services.catalog.delete_title(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ranked free-text search over title, author, genre and ISBN
#[utoipa::path(
    get,
    path = "/titles/search",
    tag = "search",
    params(
        ("q" = Option<String>, Query, description = "Search text; blank returns no results"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Titles per page (default: 20, max: 100)")
    ),
    responses(
        (status = 200, description = "Matching titles, most relevant first", body = Paginated<TitleView>)
    )
)]
pub async fn search_titles(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Paginated<TitleView>>> {
    let results = state.services.catalog.search(&query).await?;
    Ok(Json(results))
}

/// Title suggestions by prefix
#[utoipa::path(
    get,
    path = "/titles/search/suggestions",
    tag = "search",
    params(
        ("q" = Option<String>, Query, description = "Title prefix"),
        ("limit" = Option<i64>, Query, description = "Number of suggestions (default: 5, max: 50)")
    ),
    responses(
        (status = 200, description = "`<title> by <author>` labels", body = Vec<String>)
    )
)]
pub async fn search_suggestions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<SuggestionQuery>,
) -> AppResult<Json<Vec<String>>> {
    let suggestions = state.services.catalog.suggestions(&query).await?;
    Ok(Json(suggestions))
}

/// Free-text search narrowed by exact filters
#[utoipa::path(
    get,
    path = "/titles/search/advanced",
    tag = "search",
    params(
        ("q" = Option<String>, Query, description = "Search text"),
        ("title_only" = Option<bool>, Query, description = "Match the search text against titles only"),
        ("genre" = Option<String>, Query, description = "Exact genre"),
        ("author" = Option<String>, Query, description = "Exact author"),
        ("isbn" = Option<String>, Query, description = "Part of the ISBN"),
        ("available_only" = Option<bool>, Query, description = "Only titles with a copy on the shelf"),
        ("min_copies" = Option<i32>, Query, description = "Minimum total copies"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Titles per page (default: 20, max: 100)")
    ),
    responses(
        (status = 200, description = "Matching titles", body = Paginated<TitleView>)
    )
)]
pub async fn advanced_search(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<AdvancedSearchQuery>,
) -> AppResult<Json<Paginated<TitleView>>> {
    let results = state.services.catalog.advanced_search(&query).await?;
    Ok(Json(results))
}
