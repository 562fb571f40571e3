//! PostgreSQL implementation of the core store ports.
//!
//! One [`PgStore`] implements every store trait; each aggregate lives in its
//! own file. Ledger mutations run in a single database transaction with the
//! affected account rows locked in ascending id order.

mod account;
mod batch_job;
mod convert;
mod ledger;
mod shipment;

use creditship_shared::types::PageRequest;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QuerySelect, Select};

pub(crate) use convert::store_err;

/// Store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabaseConnection,
}

impl PgStore {
    /// Creates a store over an open connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Runs `select` for one page and counts the unpaged total.
async fn fetch_page<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    page: PageRequest,
) -> Result<(Vec<E::Model>, u64), DbErr>
where
    E: EntityTrait,
    E::Model: Send + Sync,
{
    let total = select.clone().count(db).await?;
    let items = select
        .offset(page.offset())
        .limit(page.limit())
        .all(db)
        .await?;
    Ok((items, total))
}
