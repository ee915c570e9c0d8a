//! Catalog store integration tests.
//!
//! Need a PostgreSQL server: `DATABASE_URL=... cargo test -- --ignored`

mod common;

use circulation_server::{
    error::AppError,
    models::title::{TitleQuery, UpdateTitle},
    repository::titles::TitlesRepository,
};
use sqlx::PgPool;

use common::{available_copies, borrow, create_title, new_title, state};

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_create_title_defaults_and_normalizes(pool: PgPool) {
    let state = state(pool);

    let title = state
        .services
        .catalog
        .create_title(&new_title(" Ruby Programming ", "J. Doe", "Programming", "978-0-596-51617-8", 3))
        .await
        .unwrap();

    assert_eq!(title.title, "Ruby Programming");
    assert_eq!(title.isbn, "9780596516178");
    assert_eq!(title.total_copies, 3);
    assert_eq!(title.available_copies, 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_create_title_reports_every_violation(pool: PgPool) {
    let state = state(pool);

    let result = state
        .services
        .catalog
        .create_title(&new_title("", " ", "", "123", 0))
        .await;

    match result {
        Err(AppError::Validation(errors)) => {
            for field in ["title", "author", "genre", "isbn", "total_copies"] {
                assert!(errors.has_field(field), "missing error for {}", field);
            }
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_duplicate_isbn_is_a_conflict(pool: PgPool) {
    let state = state(pool);
    create_title(&state, "Ruby Programming", "J. Doe", "Programming", "9780596516178", 1).await;

    let result = state
        .services
        .catalog
        .create_title(&new_title("Another Book", "A. Writer", "Fiction", "978 0596 516178", 1))
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_available_copies_cannot_exceed_total(pool: PgPool) {
    let state = state(pool);

    let mut request = new_title("Ruby Programming", "J. Doe", "Programming", "9780596516178", 2);
    request.available_copies = Some(3);

    match state.services.catalog.create_title(&request).await {
        Err(AppError::Validation(errors)) => assert!(errors.has_field("available_copies")),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_update_total_preserves_copies_on_loan(pool: PgPool) {
    let state = state(pool);
    let title = create_title(&state, "Dune", "Frank Herbert", "Science Fiction", "9780441172719", 3).await;
    borrow(&state, 1, title.id).await;
    borrow(&state, 2, title.id).await;

    let changes = UpdateTitle {
        total_copies: Some(5),
        ..Default::default()
    };
    let updated = state.services.catalog.update_title(title.id, &changes).await.unwrap();
    assert_eq!(updated.total_copies, 5);
    assert_eq!(updated.available_copies, 3);

    let shrink = UpdateTitle {
        total_copies: Some(1),
        ..Default::default()
    };
    let result = state.services.catalog.update_title(title.id, &shrink).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(available_copies(&state, title.id).await, 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_update_missing_title_is_not_found(pool: PgPool) {
    let state = state(pool);

    let changes = UpdateTitle {
        genre: Some("Poetry".to_string()),
        ..Default::default()
    };
    let result = state.services.catalog.update_title(9999, &changes).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_delete_blocked_by_active_loan_only(pool: PgPool) {
    let state = state(pool);
    let title = create_title(&state, "Dune", "Frank Herbert", "Science Fiction", "9780441172719", 1).await;
    let loan = borrow(&state, 1, title.id).await;

    let blocked = state.services.catalog.delete_title(title.id).await;
    assert!(matches!(blocked, Err(AppError::Conflict(_))));

    state.services.loans.return_loan(loan.id).await.unwrap();
    state.services.catalog.delete_title(title.id).await.unwrap();

    assert!(matches!(
        state.services.catalog.get_title(title.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        state.services.loans.get(loan.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_adjust_availability_stays_in_bounds(pool: PgPool) {
    let state = state(pool.clone());
    let title = create_title(&state, "Dune", "Frank Herbert", "Science Fiction", "9780441172719", 1).await;

    let mut conn = pool.acquire().await.unwrap();

    let result = TitlesRepository::adjust_availability(&mut conn, title.id, 1).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let taken = TitlesRepository::adjust_availability(&mut conn, title.id, -1).await.unwrap();
    assert_eq!(taken.available_copies, 0);

    let result = TitlesRepository::adjust_availability(&mut conn, title.id, -1).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let result = TitlesRepository::adjust_availability(&mut conn, 9999, -1).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_list_titles_filters_and_paginates(pool: PgPool) {
    let state = state(pool);
    create_title(&state, "Dune", "Frank Herbert", "Science Fiction", "9780441172719", 1).await;
    create_title(&state, "Dune Messiah", "Frank Herbert", "Science Fiction", "9780593098233", 1).await;
    let emma = create_title(&state, "Emma", "Jane Austen", "Classics", "9780141439587", 1).await;
    borrow(&state, 1, emma.id).await;

    let query = TitleQuery {
        author: Some("herbert".to_string()),
        per_page: Some(1),
        ..Default::default()
    };
    let page = state.services.catalog.list_titles(&query).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].title.title, "Dune");

    let query = TitleQuery {
        available_only: Some(true),
        ..Default::default()
    };
    let page = state.services.catalog.list_titles(&query).await.unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|t| t.is_available));
}
