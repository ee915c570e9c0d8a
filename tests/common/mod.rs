//! Shared helpers for integration tests

#![allow(dead_code)]

use circulation_server::{
    config::AppConfig,
    models::{loan::CreateLoan, title::CreateTitle, Loan, Title},
    AppState,
};
use sqlx::PgPool;

pub fn state(pool: PgPool) -> AppState {
    AppState::new(AppConfig::default(), pool)
}

pub fn new_title(title: &str, author: &str, genre: &str, isbn: &str, copies: i32) -> CreateTitle {
    CreateTitle {
        title: title.to_string(),
        author: author.to_string(),
        genre: genre.to_string(),
        isbn: isbn.to_string(),
        total_copies: copies,
        available_copies: None,
    }
}

pub async fn create_title(
    state: &AppState,
    title: &str,
    author: &str,
    genre: &str,
    isbn: &str,
    copies: i32,
) -> Title {
    state
        .services
        .catalog
        .create_title(&new_title(title, author, genre, isbn, copies))
        .await
        .expect("Failed to create title")
}

pub fn borrow_request(title_id: i32) -> CreateLoan {
    CreateLoan {
        title_id,
        due_at: None,
        borrower_id: None,
    }
}

pub async fn borrow(state: &AppState, borrower_id: i32, title_id: i32) -> Loan {
    state
        .services
        .loans
        .borrow(borrower_id, &borrow_request(title_id))
        .await
        .expect("Failed to borrow")
}

pub async fn available_copies(state: &AppState, title_id: i32) -> i32 {
    state
        .services
        .catalog
        .get_title(title_id)
        .await
        .expect("Failed to load title")
        .title
        .available_copies
}

/// Move a loan into the past so it is overdue by `days_overdue` whole days
pub async fn backdate_loan(pool: &PgPool, loan_id: i32, days_overdue: i32) {
    sqlx::query(
        r#"
        UPDATE loans
        SET borrowed_at = NOW() - make_interval(days => $2 + 14),
            due_at = NOW() - make_interval(days => $2)
        WHERE id = $1
        "#,
    )
    .bind(loan_id)
    .bind(days_overdue)
    .execute(pool)
    .await
    .expect("Failed to backdate loan");
}
