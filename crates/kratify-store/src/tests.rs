//! Repository statements checked against a recording client.
//!
//! The recorder returns no rows, so lookups end in `NotFound`; what matters
//! here is the SQL and arguments each method sends.

use crate::models::{AddressChanges, NewAddress, NewUser, UserChanges};
use crate::{AddressRepository, StoreError, UserRepository};
use chrono::{TimeZone, Utc};
use kratify_db::{DbResult, FixedClock, GenericClient, SharedClock};
use std::sync::{Arc, Mutex};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Call {
    tag: Option<String>,
    sql: String,
    args: Vec<String>,
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Call>>,
    affected: u64,
}

impl Recorder {
    fn affecting(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    fn push(&self, tag: Option<&str>, sql: &str, params: &[&(dyn ToSql + Sync)]) {
        self.calls.lock().unwrap().push(Call {
            tag: tag.map(str::to_string),
            sql: sql.to_string(),
            args: params.iter().map(|p| format!("{p:?}")).collect(),
        });
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl GenericClient for Recorder {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        self.push(None, sql, params);
        Ok(vec![])
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        self.push(None, sql, params);
        Ok(self.affected)
    }

    async fn query_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<Vec<Row>> {
        self.push(Some(tag), sql, params);
        Ok(vec![])
    }

    async fn execute_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<u64> {
        self.push(Some(tag), sql, params);
        Ok(self.affected)
    }
}

const NOW: &str = "2024-05-01T12:00:00Z";

fn frozen() -> SharedClock {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ))
}

fn ids() -> (Uuid, Uuid, Uuid) {
    (
        Uuid::from_u128(0x1111),
        Uuid::from_u128(0x2222),
        Uuid::from_u128(0xaaaa),
    )
}

fn new_address() -> NewAddress {
    NewAddress {
        label: "Home".into(),
        recipient_name: "Ada".into(),
        phone: "0812".into(),
        province: "Jawa Barat".into(),
        city: "Bandung".into(),
        district: "Coblong".into(),
        sub_district: "Dago".into(),
        postal_code: "40135".into(),
        full_address: "Jl. Dago 1".into(),
        is_primary: true,
    }
}

// ==================== users ====================

#[tokio::test]
async fn user_lookup_filters_soft_deleted() {
    let (user_id, ..) = ids();
    let client = Recorder::default();
    let users = UserRepository::new(&client);

    let err = users.find_by_id(user_id).await.unwrap_err();
    assert!(err.is_not_found());

    let calls = client.calls();
    assert_eq!(calls[0].tag.as_deref(), Some("users.find_by_id"));
    assert!(calls[0].sql.starts_with("SELECT id, email, password, name, role"));
    assert!(
        calls[0]
            .sql
            .ends_with("FROM users WHERE id = $1 AND deleted_at IS NULL LIMIT 1")
    );
    assert_eq!(calls[0].args, vec![user_id.to_string()]);
}

#[tokio::test]
async fn user_by_email_binds_the_address() {
    let client = Recorder::default();
    let users = UserRepository::new(&client);

    let err = users.find_by_email("ada@example.com").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "user" }));
    assert_eq!(client.calls()[0].args, vec![r#""ada@example.com""#]);
}

#[tokio::test]
async fn create_user_with_actor_stamps_created_audit() {
    let (_, _, admin) = ids();
    let client = Recorder::default();
    let users = UserRepository::new(&client).with_clock(frozen());

    let new = NewUser {
        email: "ada@example.com".into(),
        password: "hash".into(),
        name: "Ada".into(),
        role: None,
    };
    // No RETURNING row from the recorder.
    assert!(users.create(new, Some(admin)).await.unwrap_err().is_not_found());

    let calls = client.calls();
    assert_eq!(calls[0].tag.as_deref(), Some("users.create"));
    assert_eq!(
        calls[0].sql,
        "INSERT INTO users (email, password, name, is_active, created_by, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id"
    );
    assert_eq!(calls[0].args[3], "true");
    assert_eq!(calls[0].args[4], admin.to_string());
    assert_eq!(calls[0].args[5], NOW);
}

#[tokio::test]
async fn create_user_without_actor_still_sets_created_at() {
    let client = Recorder::default();
    let users = UserRepository::new(&client).with_clock(frozen());

    let new = NewUser {
        email: "bob@example.com".into(),
        password: "hash".into(),
        name: "Bob".into(),
        role: Some("admin".into()),
    };
    let _ = users.create(new, None).await;

    let calls = client.calls();
    assert_eq!(
        calls[0].sql,
        "INSERT INTO users (email, password, name, role, is_active, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id"
    );
    assert_eq!(calls[0].args[5], NOW);
}

#[tokio::test]
async fn update_user_writes_only_supplied_fields() {
    let (user_id, _, admin) = ids();
    let client = Recorder::affecting(1);
    let users = UserRepository::new(&client).with_clock(frozen());

    let changes = UserChanges {
        name: Some("Ada L.".into()),
        is_active: Some(false),
        ..Default::default()
    };
    // Refetch after the write finds nothing in the recorder.
    let err = users.update(user_id, changes, Some(admin)).await.unwrap_err();
    assert!(err.is_not_found());

    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].sql,
        "UPDATE users SET name = $1, is_active = $2, updated_by = $3, updated_at = $4 \
         WHERE id = $5 AND deleted_at IS NULL"
    );
    assert_eq!(
        calls[0].args,
        vec![
            r#""Ada L.""#.to_string(),
            "false".to_string(),
            admin.to_string(),
            NOW.to_string(),
            user_id.to_string(),
        ]
    );
    assert_eq!(calls[1].tag.as_deref(), Some("users.find_by_id"));
}

#[tokio::test]
async fn update_user_missing_row_skips_refetch() {
    let (user_id, ..) = ids();
    let client = Recorder::affecting(0);
    let users = UserRepository::new(&client);

    let changes = UserChanges {
        role: Some("admin".into()),
        ..Default::default()
    };
    let err = users.update(user_id, changes, None).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn empty_user_changes_only_read() {
    let (user_id, ..) = ids();
    let client = Recorder::affecting(1);
    let users = UserRepository::new(&client);

    let _ = users.update(user_id, UserChanges::default(), None).await;
    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].sql.starts_with("SELECT "));
}

#[tokio::test]
async fn delete_user_is_soft() {
    let (user_id, _, admin) = ids();
    let client = Recorder::affecting(1);
    let users = UserRepository::new(&client).with_clock(frozen());

    users.delete(user_id, Some(admin)).await.unwrap();

    let calls = client.calls();
    assert_eq!(calls[0].tag.as_deref(), Some("users.delete"));
    assert_eq!(
        calls[0].sql,
        "UPDATE users SET deleted_at = $1, deleted_by = $2, updated_at = $3 \
         WHERE id = $4 AND deleted_at IS NULL"
    );
    assert_eq!(calls[0].args[0], NOW);
    assert_eq!(calls[0].args[2], NOW);
}

#[tokio::test]
async fn delete_user_twice_is_not_found() {
    let (user_id, ..) = ids();
    let client = Recorder::affecting(0);
    let users = UserRepository::new(&client);

    assert!(users.delete(user_id, None).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn purge_user_is_physical() {
    let (user_id, ..) = ids();
    let client = Recorder::affecting(1);
    let users = UserRepository::new(&client);

    users.purge(user_id).await.unwrap();
    let calls = client.calls();
    assert_eq!(calls[0].sql, "DELETE FROM users WHERE id = $1");
    assert_eq!(calls[0].args, vec![user_id.to_string()]);
}

#[tokio::test]
async fn list_users_counts_then_pages() {
    let client = Recorder::default();
    let users = UserRepository::new(&client);

    // COUNT(*) returns no row in the recorder.
    assert!(users.list(0, 0).await.is_err());
    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].sql,
        "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL"
    );
    assert_eq!(calls[0].tag.as_deref(), Some("users.list"));
}

#[tokio::test]
async fn find_all_users_newest_first() {
    let client = Recorder::default();
    let users = UserRepository::new(&client);

    assert!(users.find_all().await.unwrap().is_empty());
    assert!(
        client.calls()[0]
            .sql
            .ends_with("FROM users WHERE deleted_at IS NULL ORDER BY created_at DESC")
    );
}

// ==================== addresses ====================

#[tokio::test]
async fn create_address_returns_full_row() {
    let (user_id, ..) = ids();
    let client = Recorder::default();
    let addresses = AddressRepository::new(&client).with_clock(frozen());

    let err = addresses.create(user_id, new_address(), None).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "address" }));

    let calls = client.calls();
    assert_eq!(calls[0].tag.as_deref(), Some("addresses.create"));
    assert!(calls[0].sql.starts_with(
        "INSERT INTO addresses (user_id, label, recipient_name, phone, province, city, \
         district, sub_district, postal_code, full_address, is_primary, is_active, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING id, user_id,"
    ));
    assert!(calls[0].sql.ends_with("deleted_by"));
    assert_eq!(calls[0].args[0], user_id.to_string());
    assert_eq!(calls[0].args[12], NOW);
}

#[tokio::test]
async fn addresses_of_user_primary_first() {
    let (user_id, ..) = ids();
    let client = Recorder::default();
    let addresses = AddressRepository::new(&client);

    assert!(addresses.find_by_user(user_id).await.unwrap().is_empty());
    assert!(client.calls()[0].sql.ends_with(
        "FROM addresses WHERE user_id = $1 AND deleted_at IS NULL \
         ORDER BY is_primary DESC, created_at DESC"
    ));
}

#[tokio::test]
async fn update_address_is_scoped_to_owner() {
    let (user_id, address_id, _) = ids();
    let client = Recorder::affecting(1);
    let addresses = AddressRepository::new(&client).with_clock(frozen());

    let changes = AddressChanges {
        city: Some("Jakarta".into()),
        is_primary: Some(false),
        ..Default::default()
    };
    let _ = addresses.update(user_id, address_id, changes, None).await;

    let calls = client.calls();
    assert_eq!(
        calls[0].sql,
        "UPDATE addresses SET city = $1, is_primary = $2, updated_at = $3 \
         WHERE id = $4 AND user_id = $5 AND deleted_at IS NULL"
    );
    assert_eq!(calls[0].args[3], address_id.to_string());
    assert_eq!(calls[0].args[4], user_id.to_string());
    assert_eq!(calls[1].tag.as_deref(), Some("addresses.find_by_id"));
}

#[tokio::test]
async fn foreign_address_update_is_not_found() {
    let (user_id, address_id, _) = ids();
    let client = Recorder::affecting(0);
    let addresses = AddressRepository::new(&client);

    let changes = AddressChanges {
        label: Some("Office".into()),
        ..Default::default()
    };
    let err = addresses
        .update(user_id, address_id, changes, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn delete_address_is_soft_and_scoped() {
    let (user_id, address_id, admin) = ids();
    let client = Recorder::affecting(1);
    let addresses = AddressRepository::new(&client).with_clock(frozen());

    addresses.delete(user_id, address_id, Some(admin)).await.unwrap();
    assert_eq!(
        client.calls()[0].sql,
        "UPDATE addresses SET deleted_at = $1, deleted_by = $2, updated_at = $3 \
         WHERE id = $4 AND user_id = $5 AND deleted_at IS NULL"
    );
}

#[tokio::test]
async fn clear_primary_reports_changed_rows() {
    let (user_id, _, admin) = ids();
    let client = Recorder::affecting(2);
    let addresses = AddressRepository::new(&client).with_clock(frozen());

    let changed = addresses.clear_primary(user_id, Some(admin)).await.unwrap();
    assert_eq!(changed, 2);

    let calls = client.calls();
    assert_eq!(calls[0].tag.as_deref(), Some("addresses.clear_primary"));
    assert_eq!(
        calls[0].sql,
        "UPDATE addresses SET is_primary = $1, updated_by = $2, updated_at = $3 \
         WHERE user_id = $4 AND is_primary AND deleted_at IS NULL"
    );
    assert_eq!(calls[0].args[0], "false");
}
