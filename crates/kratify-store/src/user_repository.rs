use crate::error::{StoreError, StoreResult};
use crate::models::{NewUser, USER_COLUMNS, USERS, User, UserChanges};
use kratify_db::audit::{CREATED_AT, NOT_DELETED, UPDATED_AT};
use kratify_db::{
    Clock, DbError, GenericClient, MutationQb, Page, SharedClock, SqlQb, SystemClock, delete,
    insert, params, select, update,
};
use std::sync::Arc;
use uuid::Uuid;

const ENTITY: &str = "user";

/// Users table access. Soft-deleted rows are invisible to every lookup.
///
/// `C` is any [`GenericClient`]: a pooled connection, a transaction, or a
/// reference to either.
pub struct UserRepository<C> {
    client: C,
    clock: SharedClock,
}

impl<C: GenericClient> UserRepository<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` for every audit timestamp written by this repository.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Insert a user and return its generated id.
    ///
    /// A taken email yields [`StoreError::DuplicateEmail`].
    pub async fn create(&self, new: NewUser, actor: Option<Uuid>) -> StoreResult<Uuid> {
        let mut qb = insert(USERS)
            .set("email", new.email)
            .set("password", new.password)
            .set("name", new.name)
            .set_opt("role", new.role)
            .set("is_active", true)
            .with_clock(self.clock.clone())
            .tag("users.create");
        qb = match actor {
            Some(actor) => qb.set_created_by(actor),
            None => qb.set(CREATED_AT, self.clock.now()),
        };

        let key = qb.execute(&self.client).await.map_err(|e| {
            if e.is_unique_violation() {
                StoreError::DuplicateEmail
            } else {
                StoreError::from_db(ENTITY, e)
            }
        })?;
        let id = Uuid::parse_str(&key).map_err(|e| DbError::decode("id", e.to_string()))?;

        tracing::debug!(target: "kratify_store", user_id = %id, "user created");
        Ok(id)
    }

    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<User> {
        select(USERS)
            .select(USER_COLUMNS)
            .where_("id = ?", params![id])
            .where_raw(NOT_DELETED)
            .limit(1)
            .tag("users.find_by_id")
            .fetch_opt::<User>(&self.client)
            .await?
            .ok_or_else(|| StoreError::not_found(ENTITY))
    }

    pub async fn find_by_email(&self, email: &str) -> StoreResult<User> {
        select(USERS)
            .select(USER_COLUMNS)
            .where_("email = ?", params![email.to_string()])
            .where_raw(NOT_DELETED)
            .limit(1)
            .tag("users.find_by_email")
            .fetch_opt::<User>(&self.client)
            .await?
            .ok_or_else(|| StoreError::not_found(ENTITY))
    }

    /// All live users, newest first.
    pub async fn find_all(&self) -> StoreResult<Vec<User>> {
        Ok(select(USERS)
            .select(USER_COLUMNS)
            .where_raw(NOT_DELETED)
            .order_by("created_at DESC")
            .tag("users.find_all")
            .fetch_all::<User>(&self.client)
            .await?)
    }

    /// One page of live users, newest first.
    pub async fn list(&self, page: i64, per_page: i64) -> StoreResult<Page<User>> {
        Ok(select(USERS)
            .select(USER_COLUMNS)
            .where_raw(NOT_DELETED)
            .order_by("created_at DESC")
            .tag("users.list")
            .fetch_page::<User>(&self.client, page, per_page)
            .await?)
    }

    /// Apply `changes` and return the refreshed row.
    pub async fn update(
        &self,
        id: Uuid,
        changes: UserChanges,
        actor: Option<Uuid>,
    ) -> StoreResult<User> {
        if changes.is_empty() {
            return self.find_by_id(id).await;
        }

        let mut qb = update(USERS)
            .set_opt("name", changes.name)
            .set_opt("password", changes.password)
            .set_opt("role", changes.role)
            .set_opt("is_active", changes.is_active)
            .where_("id = ?", params![id])
            .where_raw(NOT_DELETED)
            .with_clock(self.clock.clone())
            .tag("users.update");
        qb = match actor {
            Some(actor) => qb.set_updated_by(actor),
            None => qb.set(UPDATED_AT, self.clock.now()),
        };

        if qb.execute(&self.client).await? == 0 {
            return Err(StoreError::not_found(ENTITY));
        }
        self.find_by_id(id).await
    }

    /// Soft delete.
    pub async fn delete(&self, id: Uuid, actor: Option<Uuid>) -> StoreResult<()> {
        let mut qb = delete(USERS)
            .where_("id = ?", params![id])
            .where_raw(NOT_DELETED)
            .with_clock(self.clock.clone())
            .tag("users.delete");
        if let Some(actor) = actor {
            qb = qb.set_deleted_by(actor);
        }

        match qb.execute(&self.client).await? {
            0 => Err(StoreError::not_found(ENTITY)),
            _ => Ok(()),
        }
    }

    /// Physically remove the row, soft-deleted or not.
    pub async fn purge(&self, id: Uuid) -> StoreResult<()> {
        let removed = delete(USERS)
            .hard_delete()
            .where_("id = ?", params![id])
            .tag("users.purge")
            .execute(&self.client)
            .await?;
        if removed == 0 {
            return Err(StoreError::not_found(ENTITY));
        }
        tracing::debug!(target: "kratify_store", user_id = %id, "user purged");
        Ok(())
    }
}
