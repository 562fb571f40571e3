//! Shipment persistence.

use chrono::{DateTime, FixedOffset, Utc};
use creditship_core::shipment::{
    LabelPurchase, NewShipment, Shipment, ShipmentFilter, ShipmentStatus,
};
use creditship_core::store::{ShipmentStore, StoreError};
use creditship_shared::types::{BatchJobId, PageRequest, ShipmentId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

use super::convert::db_count;
use super::ledger::record_purchase;
use super::{PgStore, fetch_page, store_err};
use crate::entities::{sea_orm_active_enums, shipments};

impl PgStore {
    /// Updates a shipment only while it is still `Pending`.
    async fn update_pending<F>(&self, id: ShipmentId, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut shipments::ActiveModel, DateTime<FixedOffset>) + Send,
    {
        let txn = self.db.begin().await.map_err(store_err)?;
        let found = shipments::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(store_err)?;
        if let Some(model) = found
            && ShipmentStatus::from(model.status) == ShipmentStatus::Pending
        {
            let now: DateTime<FixedOffset> = Utc::now().into();
            let mut active: shipments::ActiveModel = model.into();
            change(&mut active, now);
            active.updated_at = Set(now);
            active.update(&txn).await.map_err(store_err)?;
        }
        txn.commit().await.map_err(store_err)
    }
}

impl ShipmentStore for PgStore {
    async fn insert_shipment(&self, shipment: NewShipment) -> Result<Shipment, StoreError> {
        let details = serde_json::to_value(&shipment.details)
            .map_err(|e| StoreError::Corrupt(format!("shipment details: {e}")))?;
        let batch_row = shipment
            .batch
            .map(|batch| db_count(batch.row_index, "batch_row"))
            .transpose()?;
        let now = Utc::now().into();
        let model = shipments::ActiveModel {
            id: Set(shipment.id.into_inner()),
            account_id: Set(shipment.account_id.into_inner()),
            status: Set(sea_orm_active_enums::ShipmentStatus::Pending),
            rate_ref: Set(None),
            external_purchase_ref: Set(None),
            tracking_id: Set(None),
            label_url: Set(None),
            cost: Set(None),
            carrier: Set(None),
            service_level: Set(None),
            refund_ref: Set(None),
            details: Set(details),
            batch_job_id: Set(shipment.batch.map(|batch| batch.job_id.into_inner())),
            batch_row: Set(batch_row),
            error_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            purchased_at: Set(None),
            refunded_at: Set(None),
        };
        let inserted = model.insert(&self.db).await.map_err(store_err)?;
        Shipment::try_from(inserted)
    }

    async fn find_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>, StoreError> {
        shipments::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_err)?
            .map(Shipment::try_from)
            .transpose()
    }

    async fn find_batch_row_shipment(
        &self,
        job_id: BatchJobId,
        row_index: u32,
    ) -> Result<Option<Shipment>, StoreError> {
        shipments::Entity::find()
            .filter(shipments::Column::BatchJobId.eq(job_id.into_inner()))
            .filter(shipments::Column::BatchRow.eq(db_count(row_index, "batch_row")?))
            .one(&self.db)
            .await
            .map_err(store_err)?
            .map(Shipment::try_from)
            .transpose()
    }

    async fn mark_shipment_failed(&self, id: ShipmentId, message: &str) -> Result<(), StoreError> {
        let message = message.to_string();
        self.update_pending(id, move |active, _| {
            active.status = Set(sea_orm_active_enums::ShipmentStatus::Error);
            active.error_message = Set(Some(message));
        })
        .await
    }

    async fn mark_shipment_interrupted(
        &self,
        id: ShipmentId,
        message: &str,
    ) -> Result<(), StoreError> {
        let message = message.to_string();
        self.update_pending(id, move |active, _| {
            active.status = Set(sea_orm_active_enums::ShipmentStatus::Interrupted);
            active.error_message = Set(Some(message));
        })
        .await
    }

    async fn mark_shipment_unbilled(
        &self,
        id: ShipmentId,
        purchase: &LabelPurchase,
        message: &str,
    ) -> Result<(), StoreError> {
        let message = message.to_string();
        let purchase = purchase.clone();
        self.update_pending(id, move |active, now| {
            record_purchase(active, &purchase, now);
            active.status = Set(sea_orm_active_enums::ShipmentStatus::PurchasedUnbilled);
            active.error_message = Set(Some(message));
        })
        .await
    }

    async fn list_shipments(
        &self,
        filter: &ShipmentFilter,
        page: PageRequest,
    ) -> Result<(Vec<Shipment>, u64), StoreError> {
        let mut query = shipments::Entity::find();
        if let Some(ids) = &filter.account_ids {
            query = query.filter(
                shipments::Column::AccountId.is_in(ids.iter().map(|id| id.into_inner())),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(
                shipments::Column::Status.eq(sea_orm_active_enums::ShipmentStatus::from(status)),
            );
        }
        if let Some(job_id) = filter.batch_job_id {
            query = query.filter(shipments::Column::BatchJobId.eq(job_id.into_inner()));
        }
        let query = query
            .order_by_desc(shipments::Column::CreatedAt)
            .order_by_desc(shipments::Column::Id);

        let (models, total) = fetch_page(&self.db, query, page)
            .await
            .map_err(store_err)?;
        let shipments = models
            .into_iter()
            .map(Shipment::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((shipments, total))
    }
}
