//! Builders executed through a recording client: what reaches the driver.

use chrono::{TimeZone, Utc};
use kratify_db::{
    DbError, DbResult, FixedClock, GenericClient, MutationQb, SharedClock, SqlQb, bulk_insert,
    delete, params, select, update,
};
use std::sync::{Arc, Mutex};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone, PartialEq)]
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

    fn record(&self, tag: Option<&str>, sql: &str, params: &[&(dyn ToSql + Sync)]) {
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
        self.record(None, sql, params);
        Ok(vec![])
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        self.record(None, sql, params);
        Ok(self.affected)
    }

    async fn query_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<Vec<Row>> {
        self.record(Some(tag), sql, params);
        Ok(vec![])
    }

    async fn execute_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<u64> {
        self.record(Some(tag), sql, params);
        Ok(self.affected)
    }
}

fn frozen() -> SharedClock {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ))
}

#[tokio::test]
async fn soft_delete_reaches_driver_with_audit_args() {
    let client = Recorder::affecting(1);

    let affected = delete("users")
        .where_("id = ?", params!["u1"])
        .set_deleted_by("admin1")
        .with_clock(frozen())
        .execute(&client)
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].sql,
        "UPDATE users SET deleted_at = $1, deleted_by = $2, updated_at = $3 WHERE id = $4"
    );
    assert_eq!(calls[0].args.len(), 4);
    assert_eq!(calls[0].args[0], calls[0].args[2]);
    assert_eq!(calls[0].args[1], r#""admin1""#);
    assert_eq!(calls[0].args[3], r#""u1""#);
}

#[tokio::test]
async fn tag_is_forwarded_to_tagged_primitives() {
    let client = Recorder::default();

    update("addresses")
        .set("is_primary", false)
        .where_("user_id = ?", params!["u1"])
        .tag("addresses.clear_primary")
        .with_clock(frozen())
        .execute(&client)
        .await
        .unwrap();

    select("users")
        .eq("role", "admin")
        .tag("users.admins")
        .query(&client)
        .await
        .unwrap();

    let calls = client.calls();
    assert_eq!(calls[0].tag.as_deref(), Some("addresses.clear_primary"));
    assert_eq!(
        calls[0].sql,
        "UPDATE addresses SET is_primary = $1 WHERE user_id = $2"
    );
    assert_eq!(calls[1].tag.as_deref(), Some("users.admins"));
    assert_eq!(calls[1].sql, "SELECT * FROM users WHERE role = $1");
}

#[tokio::test]
async fn fetch_one_without_rows_is_not_found() {
    let client = Recorder::default();

    let err = select("users")
        .where_("email = ?", params!["missing@b.com"])
        .where_raw("deleted_at IS NULL")
        .limit(1)
        .query_one(&client)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let none = select("users")
        .where_("email = ?", params!["missing@b.com"])
        .query_opt(&client)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn empty_bulk_insert_never_reaches_driver() {
    let client = Recorder::default();

    let err = bulk_insert("tags", &["name", "color"])
        .add_row(params!["only-one"])
        .execute(&client)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Validation(_)));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn count_without_rows_reports_not_found() {
    let client = Recorder::default();

    let err = select("users")
        .where_raw("deleted_at IS NULL")
        .order_by("created_at DESC")
        .paginate(2, 20)
        .count(&client)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let calls = client.calls();
    assert_eq!(
        calls[0].sql,
        "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL"
    );
}
