//! Initial database migration.
//!
//! Creates the enums, tables, constraints and the append-only trigger for the
//! credit ledger.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TABLES
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(BATCH_JOBS_SQL).await?;
        db.execute_unprepared(SHIPMENTS_SQL).await?;
        db.execute_unprepared(CREDIT_TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 3: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Position in the reseller hierarchy
CREATE TYPE account_role AS ENUM (
    'super_admin',
    'admin',
    'reseller',
    'user'
);

-- Cause of a balance change
CREATE TYPE transaction_kind AS ENUM (
    'credit_assign',
    'credit_revoke',
    'label_purchase',
    'label_refund'
);

-- Label billing state
CREATE TYPE shipment_status AS ENUM (
    'pending',
    'purchased',
    'purchased_unbilled',
    'refunded',
    'error',
    'interrupted'
);

-- Batch job progress
CREATE TYPE batch_status AS ENUM (
    'pending',
    'processing',
    'completed',
    'failed',
    'cancelled'
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    email VARCHAR(255) NOT NULL,
    name VARCHAR(255) NOT NULL,
    role account_role NOT NULL,
    balance NUMERIC(14, 2) NOT NULL DEFAULT 0,
    creator_id UUID REFERENCES accounts(id),
    active BOOLEAN NOT NULL DEFAULT TRUE,
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_accounts_email UNIQUE (email),
    CONSTRAINT chk_accounts_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_accounts_email_lowercase CHECK (email = LOWER(email))
);

CREATE INDEX idx_accounts_creator ON accounts(creator_id);
CREATE INDEX idx_accounts_role ON accounts(role);
";

const BATCH_JOBS_SQL: &str = r"
CREATE TABLE batch_jobs (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL REFERENCES accounts(id),
    filename VARCHAR(255) NOT NULL,
    status batch_status NOT NULL DEFAULT 'pending',
    total_rows INTEGER NOT NULL,
    processed_rows INTEGER NOT NULL DEFAULT 0,
    successful_rows INTEGER NOT NULL DEFAULT 0,
    failed_rows INTEGER NOT NULL DEFAULT 0,
    rows JSONB NOT NULL,
    error_log JSONB NOT NULL DEFAULT '[]'::jsonb,
    fatal_error TEXT,
    cancel_requested BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    completed_at TIMESTAMPTZ,

    CONSTRAINT chk_batch_jobs_accounting CHECK (
        processed_rows = successful_rows + failed_rows
        AND processed_rows <= total_rows
    )
);

CREATE INDEX idx_batch_jobs_owner ON batch_jobs(owner_id, created_at DESC);
CREATE INDEX idx_batch_jobs_unfinished ON batch_jobs(created_at)
    WHERE status IN ('pending', 'processing');
";

const SHIPMENTS_SQL: &str = r"
CREATE TABLE shipments (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id),
    status shipment_status NOT NULL DEFAULT 'pending',
    rate_ref VARCHAR(255),
    external_purchase_ref VARCHAR(255),
    tracking_id VARCHAR(255),
    label_url TEXT,
    cost NUMERIC(14, 2),
    carrier VARCHAR(100),
    service_level VARCHAR(255),
    refund_ref VARCHAR(255),
    details JSONB NOT NULL,
    batch_job_id UUID REFERENCES batch_jobs(id),
    batch_row INTEGER,
    error_message TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    purchased_at TIMESTAMPTZ,
    refunded_at TIMESTAMPTZ,

    CONSTRAINT uq_shipments_batch_row UNIQUE (batch_job_id, batch_row),
    CONSTRAINT chk_shipments_batch_ref CHECK ((batch_job_id IS NULL) = (batch_row IS NULL)),
    CONSTRAINT chk_shipments_cost_when_charged CHECK (
        status IN ('pending', 'error', 'interrupted') OR cost IS NOT NULL
    )
);

CREATE INDEX idx_shipments_account ON shipments(account_id, created_at DESC);
CREATE INDEX idx_shipments_needs_review ON shipments(updated_at)
    WHERE status IN ('purchased_unbilled', 'interrupted');
";

const CREDIT_TRANSACTIONS_SQL: &str = r"
CREATE TABLE credit_transactions (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id),
    kind transaction_kind NOT NULL,
    amount NUMERIC(14, 2) NOT NULL,
    balance_after NUMERIC(14, 2) NOT NULL,
    description TEXT NOT NULL,
    authorized_by UUID NOT NULL REFERENCES accounts(id),
    reference_id UUID REFERENCES shipments(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_credit_transactions_amount_non_zero CHECK (amount <> 0),
    CONSTRAINT chk_credit_transactions_balance_after CHECK (balance_after >= 0)
);

CREATE INDEX idx_credit_transactions_account ON credit_transactions(account_id, created_at DESC);
CREATE INDEX idx_credit_transactions_reference ON credit_transactions(reference_id)
    WHERE reference_id IS NOT NULL;
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: reject_credit_transaction_change
-- Credit transactions are append-only history
-- ============================================================
CREATE OR REPLACE FUNCTION reject_credit_transaction_change()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'credit_transactions is append-only, % is not allowed', TG_OP;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_credit_transactions_append_only
BEFORE UPDATE OR DELETE ON credit_transactions
FOR EACH ROW
EXECUTE FUNCTION reject_credit_transaction_change();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_credit_transactions_append_only ON credit_transactions;
DROP FUNCTION IF EXISTS reject_credit_transaction_change();
DROP TABLE IF EXISTS credit_transactions;
DROP TABLE IF EXISTS shipments;
DROP TABLE IF EXISTS batch_jobs;
DROP TABLE IF EXISTS accounts;
DROP TYPE IF EXISTS batch_status;
DROP TYPE IF EXISTS shipment_status;
DROP TYPE IF EXISTS transaction_kind;
DROP TYPE IF EXISTS account_role;
";
