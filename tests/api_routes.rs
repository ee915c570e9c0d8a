//! HTTP routing, caller identity and role policy.
//!
//! Tests without `#[ignore]` never touch the database: the pool connects lazily
//! and every request here is answered before a query would run.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use circulation_server::{api, config::AppConfig, AppState};
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;

fn lazy_app() -> Router {
    let config = AppConfig::default();
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database.url)
        .expect("lazy pool");
    api::create_router(AppState::new(config, pool))
}

fn get(uri: &str, user: Option<(i32, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some((id, role)) = user {
        builder = builder
            .header(api::USER_ID_HEADER, id.to_string())
            .header(api::USER_ROLE_HEADER, role);
    }
    builder.body(Body::empty()).expect("request")
}

fn send_json(method: &str, uri: &str, user: (i32, &str), body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header(api::USER_ID_HEADER, user.0.to_string())
        .header(api::USER_ROLE_HEADER, user.1)
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = call(lazy_app(), get("/api/v1/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_identity_is_unauthenticated() {
    let (status, body) = call(lazy_app(), get("/api/v1/titles", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn test_invalid_role_is_unauthenticated() {
    let (status, _) = call(lazy_app(), get("/api/v1/titles", Some((1, "admin")))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_members_cannot_write_titles() {
    let request = send_json(
        "POST",
        "/api/v1/titles",
        (1, "member"),
        json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "genre": "Science Fiction",
            "isbn": "9780441172719",
            "total_copies": 1
        }),
    );
    let (status, body) = call(lazy_app(), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_members_cannot_borrow_for_others() {
    let request = send_json(
        "POST",
        "/api/v1/loans",
        (1, "member"),
        json!({ "title_id": 1, "borrower_id": 2 }),
    );
    let (status, _) = call(lazy_app(), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_members_cannot_read_reports_or_other_borrowers() {
    let (status, _) = call(lazy_app(), get("/api/v1/reports/overdue", Some((1, "member")))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(lazy_app(), get("/api/v1/borrowers/2/loans", Some((1, "member")))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_blank_search_is_empty() {
    let (status, body) = call(lazy_app(), get("/api/v1/titles/search?q=", Some((1, "member")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["items"], json!([]));

    let (status, body) = call(
        lazy_app(),
        get("/api/v1/titles/search/suggestions?q=%20", Some((1, "member"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = call(lazy_app(), get("/api/v1/titles/search/advanced", Some((1, "member")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_huge_page_number_is_clamped() {
    let (status, body) = call(
        lazy_app(),
        get("/api/v1/titles/search?q=&page=9223372036854775807", Some((1, "member"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], i64::MAX / 100);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_borrow_and_return_over_http(pool: PgPool) {
    let app = api::create_router(common::state(pool));
    let librarian = (100, "librarian");
    let member = (7, "member");

    let (status, title) = call(
        app.clone(),
        send_json(
            "POST",
            "/api/v1/titles",
            librarian,
            json!({
                "title": "Dune",
                "author": "Frank Herbert",
                "genre": "Science Fiction",
                "isbn": "978-0-441-17271-9",
                "total_copies": 1
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(title["isbn"], "9780441172719");
    let title_id = title["id"].as_i64().expect("title id");

    let (status, loan) = call(
        app.clone(),
        send_json("POST", "/api/v1/loans", member, json!({ "title_id": title_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["borrower_id"], 7);
    let loan_id = loan["id"].as_i64().expect("loan id");

    let (status, body) = call(
        app.clone(),
        send_json("POST", "/api/v1/loans", (8, "member"), json!({ "title_id": title_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, _) = call(
        app.clone(),
        send_json("POST", &format!("/api/v1/loans/{}/return", loan_id), (8, "member"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        app.clone(),
        send_json("POST", &format!("/api/v1/loans/{}/return", loan_id), member, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["returned_at"].is_string());

    let (status, body) = call(
        app.clone(),
        send_json("POST", &format!("/api/v1/loans/{}/return", loan_id), member, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Loan already returned");

    let (status, body) = call(app, get(&format!("/api/v1/titles/{}", title_id), Some(member))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_copies"], 1);
    assert_eq!(body["is_available"], true);
    assert_eq!(body["loans"].as_array().map(|l| l.len()), Some(1));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_validation_errors_list_every_field(pool: PgPool) {
    let app = api::create_router(common::state(pool));

    let (status, body) = call(
        app,
        send_json(
            "POST",
            "/api/v1/titles",
            (100, "librarian"),
            json!({
                "title": "",
                "author": "",
                "genre": "",
                "isbn": "12",
                "total_copies": 0
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .expect("details")
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    for field in ["author", "genre", "isbn", "title", "total_copies"] {
        assert!(fields.contains(&field), "missing {}", field);
    }
}
