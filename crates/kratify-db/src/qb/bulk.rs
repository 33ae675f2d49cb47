//! Multi-row INSERT builder.
//!
//! ```ignore
//! use kratify_db::{bulk_insert, params, MutationQb};
//!
//! let inserted = bulk_insert("addresses", &["user_id", "label"])
//!     .add_row(params![user_id, "Home"])
//!     .add_row(params![user_id, "Office"])
//!     .execute(&client)
//!     .await?;
//! ```

use crate::audit;
use crate::clock::{SharedClock, system_clock};
use crate::error::{DbError, DbResult};
use crate::qb::param::{Param, ParamList};
use crate::qb::traits::{BuiltQuery, MutationQb, SqlQb};
use tokio_postgres::types::ToSql;

/// Builds `INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4), ...`.
///
/// A row whose length differs from the column count is dropped when it is
/// added, with a `warn` event. Executing with no rows is a validation error.
#[derive(Clone, Debug)]
pub struct BulkInsertQb {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Param>>,
    created_by: Option<Param>,
    clock: SharedClock,
    tag: Option<String>,
}

impl BulkInsertQb {
    pub fn new(table: &str, columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            created_by: None,
            clock: system_clock(),
            tag: None,
        }
    }

    /// Append one row of values, in column order.
    pub fn add_row(mut self, values: Vec<Param>) -> Self {
        if values.len() != self.columns.len() {
            tracing::warn!(
                target: "kratify_db::bulk",
                table = %self.table,
                expected = self.columns.len(),
                got = values.len(),
                "dropping bulk insert row with mismatched column count"
            );
            return self;
        }
        self.rows.push(values);
        self
    }

    /// Stamp every row with `created_by = actor` and `created_at = now`.
    pub fn set_created_by<A: ToSql + Send + Sync + 'static>(mut self, actor: A) -> Self {
        self.created_by = Some(Param::new(actor));
        self
    }

    /// Override the time source used for `created_at`.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Tag executions of this statement for monitoring.
    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    /// Number of accepted rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn render(self) -> BuiltQuery {
        let mut params = ParamList::new();
        let mut columns = self.columns;
        let audit_values = self.created_by.map(|actor| (actor, Param::new(self.clock.now())));
        if audit_values.is_some() {
            columns.push(audit::CREATED_BY.to_string());
            columns.push(audit::CREATED_AT.to_string());
        }

        let tuples: Vec<String> = self
            .rows
            .into_iter()
            .map(|row| {
                let mut slots: Vec<String> = row
                    .into_iter()
                    .map(|p| format!("${}", params.push_param(p)))
                    .collect();
                if let Some((actor, now)) = &audit_values {
                    slots.push(format!("${}", params.push_param(actor.clone())));
                    slots.push(format!("${}", params.push_param(now.clone())));
                }
                format!("({})", slots.join(", "))
            })
            .collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            columns.join(", "),
            tuples.join(", ")
        );

        let built = BuiltQuery::new(sql, params.into_vec());
        match self.tag {
            Some(tag) => built.with_tag(tag),
            None => built,
        }
    }
}

impl SqlQb for BulkInsertQb {
    fn build(self) -> BuiltQuery {
        self.render()
    }

    fn validate(&self) -> DbResult<()> {
        if self.rows.is_empty() {
            return Err(DbError::validation(format!(
                "bulk insert into {} has no rows",
                self.table
            )));
        }
        Ok(())
    }
}

impl MutationQb for BulkInsertQb {}
