//! Conversions between entity models and domain types.

use chrono::{DateTime, FixedOffset, Utc};
use creditship_core::access::Role;
use creditship_core::account::Account;
use creditship_core::batch::{BatchJob, BatchStatus, RowError};
use creditship_core::ledger::{CreditTransaction, TransactionKind};
use creditship_core::shipment::{BatchRowRef, Shipment, ShipmentDetails, ShipmentStatus};
use creditship_core::store::StoreError;
use sea_orm::{DbErr, SqlErr};

use crate::entities::{accounts, batch_jobs, credit_transactions, sea_orm_active_enums, shipments};

/// Maps a database error onto the store error taxonomy.
pub(crate) fn store_err(err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return StoreError::Duplicate(detail);
    }
    match err {
        DbErr::RecordNotFound(what) => StoreError::Missing(what),
        DbErr::RecordNotUpdated => StoreError::Missing("record not updated".to_string()),
        other => StoreError::Unavailable(other.to_string()),
    }
}

pub(crate) fn utc(at: DateTime<FixedOffset>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

pub(crate) fn count(value: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

pub(crate) fn db_count(value: u32, column: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

// ============================================================================
// enums
// ============================================================================

impl From<Role> for sea_orm_active_enums::AccountRole {
    fn from(role: Role) -> Self {
        match role {
            Role::SuperAdmin => Self::SuperAdmin,
            Role::Admin => Self::Admin,
            Role::Reseller => Self::Reseller,
            Role::User => Self::User,
        }
    }
}

impl From<sea_orm_active_enums::AccountRole> for Role {
    fn from(role: sea_orm_active_enums::AccountRole) -> Self {
        use sea_orm_active_enums::AccountRole;
        match role {
            AccountRole::SuperAdmin => Self::SuperAdmin,
            AccountRole::Admin => Self::Admin,
            AccountRole::Reseller => Self::Reseller,
            AccountRole::User => Self::User,
        }
    }
}

impl From<TransactionKind> for sea_orm_active_enums::TransactionKind {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::CreditAssign => Self::CreditAssign,
            TransactionKind::CreditRevoke => Self::CreditRevoke,
            TransactionKind::LabelPurchase => Self::LabelPurchase,
            TransactionKind::LabelRefund => Self::LabelRefund,
        }
    }
}

impl From<sea_orm_active_enums::TransactionKind> for TransactionKind {
    fn from(kind: sea_orm_active_enums::TransactionKind) -> Self {
        use sea_orm_active_enums::TransactionKind as Db;
        match kind {
            Db::CreditAssign => Self::CreditAssign,
            Db::CreditRevoke => Self::CreditRevoke,
            Db::LabelPurchase => Self::LabelPurchase,
            Db::LabelRefund => Self::LabelRefund,
        }
    }
}

impl From<ShipmentStatus> for sea_orm_active_enums::ShipmentStatus {
    fn from(status: ShipmentStatus) -> Self {
        match status {
            ShipmentStatus::Pending => Self::Pending,
            ShipmentStatus::Purchased => Self::Purchased,
            ShipmentStatus::PurchasedUnbilled => Self::PurchasedUnbilled,
            ShipmentStatus::Refunded => Self::Refunded,
            ShipmentStatus::Error => Self::Error,
            ShipmentStatus::Interrupted => Self::Interrupted,
        }
    }
}

impl From<sea_orm_active_enums::ShipmentStatus> for ShipmentStatus {
    fn from(status: sea_orm_active_enums::ShipmentStatus) -> Self {
        use sea_orm_active_enums::ShipmentStatus as Db;
        match status {
            Db::Pending => Self::Pending,
            Db::Purchased => Self::Purchased,
            Db::PurchasedUnbilled => Self::PurchasedUnbilled,
            Db::Refunded => Self::Refunded,
            Db::Error => Self::Error,
            Db::Interrupted => Self::Interrupted,
        }
    }
}

impl From<BatchStatus> for sea_orm_active_enums::BatchStatus {
    fn from(status: BatchStatus) -> Self {
        match status {
            BatchStatus::Pending => Self::Pending,
            BatchStatus::Processing => Self::Processing,
            BatchStatus::Completed => Self::Completed,
            BatchStatus::Failed => Self::Failed,
            BatchStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<sea_orm_active_enums::BatchStatus> for BatchStatus {
    fn from(status: sea_orm_active_enums::BatchStatus) -> Self {
        use sea_orm_active_enums::BatchStatus as Db;
        match status {
            Db::Pending => Self::Pending,
            Db::Processing => Self::Processing,
            Db::Completed => Self::Completed,
            Db::Failed => Self::Failed,
            Db::Cancelled => Self::Cancelled,
        }
    }
}

// ============================================================================
// models
// ============================================================================

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id.into(),
            email: model.email,
            name: model.name,
            role: model.role.into(),
            balance: model.balance,
            creator_id: model.creator_id.map(Into::into),
            active: model.active,
            password_hash: model.password_hash,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

impl From<credit_transactions::Model> for CreditTransaction {
    fn from(model: credit_transactions::Model) -> Self {
        Self {
            id: model.id.into(),
            account_id: model.account_id.into(),
            kind: model.kind.into(),
            amount: model.amount,
            balance_after: model.balance_after,
            description: model.description,
            authorized_by: model.authorized_by.into(),
            reference_id: model.reference_id.map(Into::into),
            created_at: utc(model.created_at),
        }
    }
}

impl TryFrom<shipments::Model> for Shipment {
    type Error = StoreError;

    fn try_from(model: shipments::Model) -> Result<Self, Self::Error> {
        let details: ShipmentDetails = serde_json::from_value(model.details).map_err(|e| {
            StoreError::Corrupt(format!("shipment {} details: {e}", model.id))
        })?;
        let batch = match (model.batch_job_id, model.batch_row) {
            (Some(job_id), Some(row)) => Some(BatchRowRef {
                job_id: job_id.into(),
                row_index: count(row, "batch_row")?,
            }),
            _ => None,
        };
        Ok(Self {
            id: model.id.into(),
            account_id: model.account_id.into(),
            status: model.status.into(),
            rate_ref: model.rate_ref,
            external_purchase_ref: model.external_purchase_ref,
            tracking_id: model.tracking_id,
            label_url: model.label_url,
            cost: model.cost,
            carrier: model.carrier,
            service_level: model.service_level,
            refund_ref: model.refund_ref,
            details,
            batch,
            error_message: model.error_message,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
            purchased_at: model.purchased_at.map(utc),
            refunded_at: model.refunded_at.map(utc),
        })
    }
}

impl TryFrom<batch_jobs::Model> for BatchJob {
    type Error = StoreError;

    fn try_from(model: batch_jobs::Model) -> Result<Self, Self::Error> {
        let error_log: Vec<RowError> = serde_json::from_value(model.error_log).map_err(|e| {
            StoreError::Corrupt(format!("batch job {} error log: {e}", model.id))
        })?;
        Ok(Self {
            id: model.id.into(),
            owner_id: model.owner_id.into(),
            filename: model.filename,
            status: model.status.into(),
            total_rows: count(model.total_rows, "total_rows")?,
            processed_rows: count(model.processed_rows, "processed_rows")?,
            successful_rows: count(model.successful_rows, "successful_rows")?,
            failed_rows: count(model.failed_rows, "failed_rows")?,
            error_log,
            fatal_error: model.fatal_error,
            cancel_requested: model.cancel_requested,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
            completed_at: model.completed_at.map(utc),
        })
    }
}
