//! Search index integration tests: ranking, suggestions and filtered search.
//!
//! Need a PostgreSQL server: `DATABASE_URL=... cargo test -- --ignored`

mod common;

use circulation_server::{
    models::title::{AdvancedSearchQuery, SearchQuery, SuggestionQuery, TitleView, UpdateTitle},
    AppState,
};
use sqlx::PgPool;

use common::{borrow, create_title, state};

async fn search(state: &AppState, q: &str) -> Vec<String> {
    let query = SearchQuery {
        q: Some(q.to_string()),
        ..Default::default()
    };
    names(&state.services.catalog.search(&query).await.unwrap().items)
}

fn names(items: &[TitleView]) -> Vec<String> {
    items.iter().map(|t| t.title.title.clone()).collect()
}

async fn seed_programming(state: &AppState) {
    create_title(state, "Ruby Programming", "J. Doe", "Programming", "9780000000001", 2).await;
    create_title(state, "Python Basics", "Ruby Smith", "Programming", "9780000000002", 1).await;
    create_title(state, "Gardening", "Ann Green", "Hobbies", "9780000000003", 1).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_title_match_ranks_above_author_match(pool: PgPool) {
    let state = state(pool);
    seed_programming(&state).await;

    assert_eq!(search(&state, "Ruby").await, vec!["Ruby Programming", "Python Basics"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_blank_query_returns_nothing(pool: PgPool) {
    let state = state(pool);
    seed_programming(&state).await;

    assert!(search(&state, "").await.is_empty());
    assert!(search(&state, "   ").await.is_empty());

    let page = state.services.catalog.search(&SearchQuery::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_genre_and_isbn_matches(pool: PgPool) {
    let state = state(pool);
    seed_programming(&state).await;

    assert_eq!(search(&state, "hobbies").await, vec!["Gardening"]);
    assert_eq!(search(&state, "9780000000003").await, vec!["Gardening"]);
    assert_eq!(search(&state, "programming").await, vec!["Ruby Programming", "Python Basics"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_substring_fallback(pool: PgPool) {
    let state = state(pool);
    create_title(&state, "Metaprogramming Ruby", "Paolo Perrotta", "Programming", "9781941222126", 1).await;

    assert_eq!(search(&state, "metaprog").await, vec!["Metaprogramming Ruby"]);
    assert_eq!(search(&state, "perrot").await, vec!["Metaprogramming Ruby"]);
    assert_eq!(search(&state, "1941222").await, vec!["Metaprogramming Ruby"]);
    assert!(search(&state, "haskell").await.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_projection_follows_title_updates(pool: PgPool) {
    let state = state(pool);
    let title = create_title(&state, "Ruby Programming", "J. Doe", "Programming", "9780000000001", 1).await;

    let changes = UpdateTitle {
        title: Some("Elixir in Action".to_string()),
        ..Default::default()
    };
    state.services.catalog.update_title(title.id, &changes).await.unwrap();

    assert_eq!(search(&state, "elixir").await, vec!["Elixir in Action"]);
    assert!(search(&state, "ruby").await.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_suggestions_by_title_prefix(pool: PgPool) {
    let state = state(pool);
    seed_programming(&state).await;
    create_title(&state, "Rust in Action", "Tim McNamara", "Programming", "9781617294556", 1).await;

    let query = SuggestionQuery {
        q: Some("Ru".to_string()),
        limit: None,
    };
    let suggestions = state.services.catalog.suggestions(&query).await.unwrap();
    assert_eq!(
        suggestions,
        vec!["Ruby Programming by J. Doe", "Rust in Action by Tim McNamara"]
    );

    let query = SuggestionQuery {
        q: Some("ru".to_string()),
        limit: Some(1),
    };
    assert_eq!(state.services.catalog.suggestions(&query).await.unwrap().len(), 1);

    let blank = SuggestionQuery {
        q: Some(" ".to_string()),
        limit: None,
    };
    assert!(state.services.catalog.suggestions(&blank).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_advanced_search_filters(pool: PgPool) {
    let state = state(pool);
    seed_programming(&state).await;
    let python = create_title(&state, "Python Cookbook", "D. Beazley", "Programming", "9781449340377", 1).await;
    borrow(&state, 1, python.id).await;

    let query = AdvancedSearchQuery {
        q: Some("python".to_string()),
        available_only: Some(true),
        ..Default::default()
    };
    let page = state.services.catalog.advanced_search(&query).await.unwrap();
    assert_eq!(names(&page.items), vec!["Python Basics"]);

    let query = AdvancedSearchQuery {
        q: Some("ruby".to_string()),
        author: Some("ruby smith".to_string()),
        ..Default::default()
    };
    let page = state.services.catalog.advanced_search(&query).await.unwrap();
    assert_eq!(names(&page.items), vec!["Python Basics"]);

    let query = AdvancedSearchQuery {
        genre: Some("HOBBIES".to_string()),
        ..Default::default()
    };
    let page = state.services.catalog.advanced_search(&query).await.unwrap();
    assert_eq!(names(&page.items), vec!["Gardening"]);

    let query = AdvancedSearchQuery {
        isbn: Some("978-1449".to_string()),
        ..Default::default()
    };
    let page = state.services.catalog.advanced_search(&query).await.unwrap();
    assert_eq!(names(&page.items), vec!["Python Cookbook"]);

    let query = AdvancedSearchQuery {
        min_copies: Some(2),
        ..Default::default()
    };
    let page = state.services.catalog.advanced_search(&query).await.unwrap();
    assert_eq!(names(&page.items), vec!["Ruby Programming"]);

    let page = state
        .services
        .catalog
        .advanced_search(&AdvancedSearchQuery::default())
        .await
        .unwrap();
    assert!(page.items.is_empty());
}

async fn break_projection_writes(pool: &PgPool) {
    sqlx::query(
        r#"
        CREATE FUNCTION reject_projection_write() RETURNS trigger AS $$
        BEGIN
            RAISE EXCEPTION 'projection writes are disabled';
        END;
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(pool)
    .await
    .expect("create trigger function");

    sqlx::query(
        r#"
        CREATE TRIGGER titles_reject_projection_write
        BEFORE UPDATE OF search_title_terms, search_author_terms, search_genre_terms, search_isbn_terms
        ON titles
        FOR EACH ROW EXECUTE FUNCTION reject_projection_write()
        "#,
    )
    .execute(pool)
    .await
    .expect("create trigger");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_failed_projection_refresh_keeps_title_write(pool: PgPool) {
    break_projection_writes(&pool).await;
    let state = state(pool);

    let title = create_title(&state, "Ruby Book", "Ann Author", "Programming", "9780000000001", 1).await;
    let stored = state.services.catalog.get_title(title.id).await.unwrap();
    assert_eq!(stored.title.title, "Ruby Book");
    assert_eq!(search(&state, "ruby").await, vec!["Ruby Book"]);

    let changes = UpdateTitle {
        title: Some("Elixir in Action".to_string()),
        ..Default::default()
    };
    let updated = state.services.catalog.update_title(title.id, &changes).await.unwrap();
    assert_eq!(updated.title, "Elixir in Action");
    assert_eq!(search(&state, "elixir").await, vec!["Elixir in Action"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_title_only_search_and_highlight(pool: PgPool) {
    let state = state(pool);
    seed_programming(&state).await;

    let query = AdvancedSearchQuery {
        q: Some("ruby".to_string()),
        title_only: Some(true),
        ..Default::default()
    };
    let page = state.services.catalog.advanced_search(&query).await.unwrap();
    assert_eq!(names(&page.items), vec!["Ruby Programming"]);
    assert_eq!(
        page.items[0].title_highlight.as_deref(),
        Some("<mark>Ruby</mark> Programming")
    );

    let query = SearchQuery {
        q: Some("ruby".to_string()),
        ..Default::default()
    };
    let page = state.services.catalog.search(&query).await.unwrap();
    assert_eq!(page.items[1].title.title, "Python Basics");
    assert_eq!(page.items[1].title_highlight.as_deref(), Some("Python Basics"));

    let listed = state.services.catalog.list_titles(&Default::default()).await.unwrap();
    assert!(listed.items.iter().all(|t| t.title_highlight.is_none()));
}
