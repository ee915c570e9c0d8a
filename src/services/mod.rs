//! Business logic services

pub mod catalog;
pub mod loans;
pub mod reports;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub reports: reports::ReportsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(
                repository.clone(),
                config.search.clone(),
                config.lending.clone(),
            ),
            loans: loans::LoansService::new(
                repository.clone(),
                config.lending.clone(),
                config.search.clone(),
            ),
            reports: reports::ReportsService::new(repository.clone(), config.lending.clone()),
            repository,
        }
    }

    /// Check the database is reachable
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
