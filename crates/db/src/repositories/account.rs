//! Account persistence.

use chrono::Utc;
use creditship_core::account::{Account, AccountFilter, NewAccount};
use creditship_core::store::{AccountStore, StoreError};
use creditship_shared::types::{AccountId, PageRequest};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::{PgStore, fetch_page, store_err};
use crate::entities::{accounts, sea_orm_active_enums::AccountRole};

impl AccountStore for PgStore {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let found = accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_err)?;
        Ok(found.map(Into::into))
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let found = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(store_err)?;
        Ok(found.map(Into::into))
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let now = Utc::now().into();
        let model = accounts::ActiveModel {
            id: Set(account.id.into_inner()),
            email: Set(account.email),
            name: Set(account.name),
            role: Set(AccountRole::from(account.role)),
            balance: Set(Decimal::ZERO),
            creator_id: Set(account.creator_id.map(AccountId::into_inner)),
            active: Set(true),
            password_hash: Set(account.password_hash),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let inserted = model.insert(&self.db).await.map_err(store_err)?;
        Ok(inserted.into())
    }

    async fn set_account_active(
        &self,
        id: AccountId,
        active: bool,
    ) -> Result<Option<Account>, StoreError> {
        let Some(model) = accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_err)?
        else {
            return Ok(None);
        };
        let mut model: accounts::ActiveModel = model.into();
        model.active = Set(active);
        model.updated_at = Set(Utc::now().into());
        let updated = model.update(&self.db).await.map_err(store_err)?;
        Ok(Some(updated.into()))
    }

    async fn created_account_ids(
        &self,
        creator_id: AccountId,
    ) -> Result<Vec<AccountId>, StoreError> {
        let ids: Vec<Uuid> = accounts::Entity::find()
            .select_only()
            .column(accounts::Column::Id)
            .filter(accounts::Column::CreatorId.eq(creator_id.into_inner()))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(store_err)?;
        Ok(ids.into_iter().map(AccountId::from).collect())
    }

    async fn list_accounts(
        &self,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> Result<(Vec<Account>, u64), StoreError> {
        let mut query = accounts::Entity::find();
        if let Some(ids) = &filter.ids {
            query = query.filter(
                accounts::Column::Id.is_in(ids.iter().map(|id| id.into_inner())),
            );
        }
        if let Some(role) = filter.role {
            query = query.filter(accounts::Column::Role.eq(AccountRole::from(role)));
        }
        if let Some(active) = filter.active {
            query = query.filter(accounts::Column::Active.eq(active));
        }
        let query = query
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id);

        let (models, total) = fetch_page(&self.db, query, page)
            .await
            .map_err(store_err)?;
        Ok((models.into_iter().map(Into::into).collect(), total))
    }
}
