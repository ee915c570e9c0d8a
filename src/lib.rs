//! Circulation Server
//!
//! Lending inventory for a library: a catalog of titles with copy counts,
//! weighted free-text search over that catalog, and a loan ledger whose borrow
//! and return transitions keep the copy counts consistent under concurrent use.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod search;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, pool: sqlx::PgPool) -> Self {
        let services = services::Services::new(repository::Repository::new(pool), &config);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
