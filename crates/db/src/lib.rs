//! Database layer with `SeaORM` entities and the PostgreSQL store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - [`PgStore`], implementing every store port of `creditship-core`
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::PgStore;

use std::time::Duration;

use creditship_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool sized by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
