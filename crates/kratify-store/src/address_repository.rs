use crate::error::{StoreError, StoreResult};
use crate::models::{ADDRESS_COLUMNS, ADDRESSES, Address, AddressChanges, NewAddress};
use kratify_db::audit::{CREATED_AT, NOT_DELETED, UPDATED_AT};
use kratify_db::{
    Clock, GenericClient, MutationQb, SharedClock, SqlQb, SystemClock, delete, insert, params,
    select, update,
};
use std::sync::Arc;
use uuid::Uuid;

const ENTITY: &str = "address";

/// Address book access, always scoped to live rows.
///
/// Keeping a single primary address per user is the caller's job: run
/// [`AddressRepository::clear_primary`] and the write in one transaction.
pub struct AddressRepository<C> {
    client: C,
    clock: SharedClock,
}

impl<C: GenericClient> AddressRepository<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Insert an address for `user_id` and return the stored row.
    pub async fn create(
        &self,
        user_id: Uuid,
        new: NewAddress,
        actor: Option<Uuid>,
    ) -> StoreResult<Address> {
        let mut qb = insert(ADDRESSES)
            .set("user_id", user_id)
            .set("label", new.label)
            .set("recipient_name", new.recipient_name)
            .set("phone", new.phone)
            .set("province", new.province)
            .set("city", new.city)
            .set("district", new.district)
            .set("sub_district", new.sub_district)
            .set("postal_code", new.postal_code)
            .set("full_address", new.full_address)
            .set("is_primary", new.is_primary)
            .set("is_active", true)
            .returning(ADDRESS_COLUMNS)
            .with_clock(self.clock.clone())
            .tag("addresses.create");
        qb = match actor {
            Some(actor) => qb.set_created_by(actor),
            None => qb.set(CREATED_AT, self.clock.now()),
        };

        qb.fetch_one::<Address>(&self.client)
            .await
            .map_err(|e| StoreError::from_db(ENTITY, e))
    }

    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Address> {
        select(ADDRESSES)
            .select(ADDRESS_COLUMNS)
            .where_("id = ?", params![id])
            .where_raw(NOT_DELETED)
            .limit(1)
            .tag("addresses.find_by_id")
            .fetch_opt::<Address>(&self.client)
            .await?
            .ok_or_else(|| StoreError::not_found(ENTITY))
    }

    /// Live addresses of `user_id`: primary first, then newest first.
    pub async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Address>> {
        Ok(select(ADDRESSES)
            .select(ADDRESS_COLUMNS)
            .where_("user_id = ?", params![user_id])
            .where_raw(NOT_DELETED)
            .order_by("is_primary DESC")
            .order_by("created_at DESC")
            .tag("addresses.find_by_user")
            .fetch_all::<Address>(&self.client)
            .await?)
    }

    /// Write the supplied fields of an address owned by `user_id`, then
    /// return the refreshed row.
    ///
    /// Another user's address is reported as not found.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: AddressChanges,
        actor: Option<Uuid>,
    ) -> StoreResult<Address> {
        if changes.is_empty() {
            return self.find_owned(user_id, id).await;
        }

        let mut qb = update(ADDRESSES)
            .set_opt("label", changes.label)
            .set_opt("recipient_name", changes.recipient_name)
            .set_opt("phone", changes.phone)
            .set_opt("province", changes.province)
            .set_opt("city", changes.city)
            .set_opt("district", changes.district)
            .set_opt("sub_district", changes.sub_district)
            .set_opt("postal_code", changes.postal_code)
            .set_opt("full_address", changes.full_address)
            .set_opt("is_primary", changes.is_primary)
            .where_("id = ? AND user_id = ?", params![id, user_id])
            .where_raw(NOT_DELETED)
            .with_clock(self.clock.clone())
            .tag("addresses.update");
        qb = match actor {
            Some(actor) => qb.set_updated_by(actor),
            None => qb.set(UPDATED_AT, self.clock.now()),
        };

        if qb.execute(&self.client).await? == 0 {
            return Err(StoreError::not_found(ENTITY));
        }
        self.find_by_id(id).await
    }

    /// Soft delete an address owned by `user_id`.
    pub async fn delete(&self, user_id: Uuid, id: Uuid, actor: Option<Uuid>) -> StoreResult<()> {
        let mut qb = delete(ADDRESSES)
            .where_("id = ? AND user_id = ?", params![id, user_id])
            .where_raw(NOT_DELETED)
            .with_clock(self.clock.clone())
            .tag("addresses.delete");
        if let Some(actor) = actor {
            qb = qb.set_deleted_by(actor);
        }

        match qb.execute(&self.client).await? {
            0 => Err(StoreError::not_found(ENTITY)),
            _ => Ok(()),
        }
    }

    /// Unset the primary flag on every live address of `user_id`.
    ///
    /// Returns the number of addresses changed.
    pub async fn clear_primary(&self, user_id: Uuid, actor: Option<Uuid>) -> StoreResult<u64> {
        let mut qb = update(ADDRESSES)
            .set("is_primary", false)
            .where_("user_id = ?", params![user_id])
            .where_raw("is_primary")
            .where_raw(NOT_DELETED)
            .with_clock(self.clock.clone())
            .tag("addresses.clear_primary");
        qb = match actor {
            Some(actor) => qb.set_updated_by(actor),
            None => qb.set(UPDATED_AT, self.clock.now()),
        };
        Ok(qb.execute(&self.client).await?)
    }

    async fn find_owned(&self, user_id: Uuid, id: Uuid) -> StoreResult<Address> {
        select(ADDRESSES)
            .select(ADDRESS_COLUMNS)
            .where_("id = ? AND user_id = ?", params![id, user_id])
            .where_raw(NOT_DELETED)
            .limit(1)
            .tag("addresses.find_owned")
            .fetch_opt::<Address>(&self.client)
            .await?
            .ok_or_else(|| StoreError::not_found(ENTITY))
    }
}
