//! `SeaORM` Entity for shipments table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ShipmentStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub status: ShipmentStatus,
    pub rate_ref: Option<String>,
    pub external_purchase_ref: Option<String>,
    pub tracking_id: Option<String>,
    pub label_url: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub cost: Option<Decimal>,
    pub carrier: Option<String>,
    pub service_level: Option<String>,
    pub refund_ref: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub details: Json,
    pub batch_job_id: Option<Uuid>,
    pub batch_row: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub purchased_at: Option<DateTimeWithTimeZone>,
    pub refunded_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::batch_jobs::Entity",
        from = "Column::BatchJobId",
        to = "super::batch_jobs::Column::Id"
    )]
    BatchJobs,
    #[sea_orm(has_many = "super::credit_transactions::Entity")]
    CreditTransactions,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::batch_jobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BatchJobs.def()
    }
}

impl Related<super::credit_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
