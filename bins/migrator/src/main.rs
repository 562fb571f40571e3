//! Database migration runner for Creditship.
//!
//! Reads `DATABASE_URL`. Usage:
//!   migrator up      - Create the ledger schema
//!   migrator down    - Drop it again
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop everything and re-run migrations

use sea_orm_migration::prelude::*;
use creditship_db::migration::Migrator;

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Run the migrator CLI (it sets up its own tracing)
    cli::run_cli(Migrator).await;
}
