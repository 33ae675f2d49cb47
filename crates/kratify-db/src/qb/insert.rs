//! INSERT statement builder with created-by auditing.

use crate::audit;
use crate::client::GenericClient;
use crate::clock::{SharedClock, system_clock};
use crate::error::DbResult;
use crate::qb::param::{Param, ParamList};
use crate::qb::traits::{BuiltQuery, SqlQb};
use crate::row::returned_key;
use tokio_postgres::types::ToSql;

/// Value expression for one INSERT column.
#[derive(Clone, Debug)]
enum ValueExpr {
    /// Parameterized value
    Param(Param),
    /// Raw SQL expression without parameter (e.g. `now()`)
    Raw(String),
}

/// INSERT statement builder.
///
/// Emits `INSERT INTO t (cols) VALUES ($1, ...) RETURNING id`. When an actor
/// is set, `created_by` and `created_at` are appended after every caller
/// column.
#[derive(Clone, Debug)]
pub struct InsertQb {
    table: String,
    columns: Vec<String>,
    values: Vec<ValueExpr>,
    created_by: Option<Param>,
    returning: String,
    clock: SharedClock,
    tag: Option<String>,
}

impl InsertQb {
    /// Create a new INSERT builder.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            values: Vec::new(),
            created_by: None,
            returning: audit::PRIMARY_KEY.to_string(),
            clock: system_clock(),
            tag: None,
        }
    }

    /// Set a column value.
    pub fn set<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.columns.push(column.to_string());
        self.values.push(ValueExpr::Param(Param::new(value)));
        self
    }

    /// Set an optional column value (None => skip).
    pub fn set_opt<T: ToSql + Send + Sync + 'static>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a column to a raw SQL expression.
    pub fn set_raw(mut self, column: &str, expr: &str) -> Self {
        self.columns.push(column.to_string());
        self.values.push(ValueExpr::Raw(expr.to_string()));
        self
    }

    /// Record `actor` in `created_by` and stamp `created_at`.
    pub fn set_created_by<A: ToSql + Send + Sync + 'static>(mut self, actor: A) -> Self {
        self.created_by = Some(Param::new(actor));
        self
    }

    /// Name the generated-key column returned by `execute` (default `id`).
    pub fn returning_key(mut self, column: &str) -> Self {
        self.returning = column.to_string();
        self
    }

    /// Replace the whole RETURNING list, e.g. `*` to read the stored row
    /// back with [`SqlQb::fetch_one`].
    pub fn returning(mut self, cols: &str) -> Self {
        self.returning = cols.to_string();
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

    fn render(self) -> BuiltQuery {
        debug_assert!(
            !self.columns.is_empty(),
            "INSERT INTO {} built without any column",
            self.table
        );

        let mut params = ParamList::new();
        let mut columns = self.columns;
        let mut placeholders: Vec<String> = self
            .values
            .into_iter()
            .map(|v| match v {
                ValueExpr::Param(p) => format!("${}", params.push_param(p)),
                ValueExpr::Raw(raw) => raw,
            })
            .collect();

        if let Some(actor) = self.created_by {
            let now = self.clock.now();
            columns.push(audit::CREATED_BY.to_string());
            placeholders.push(format!("${}", params.push_param(actor)));
            columns.push(audit::CREATED_AT.to_string());
            placeholders.push(format!("${}", params.push(now)));
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        if !self.returning.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.returning);
        }

        let built = BuiltQuery::new(sql, params.into_vec());
        match self.tag {
            Some(tag) => built.with_tag(tag),
            None => built,
        }
    }

    /// Execute and return the generated key as text.
    ///
    /// `uuid`, integer and text keys are supported. Database errors are
    /// returned unchanged.
    pub async fn execute(self, conn: &impl GenericClient) -> DbResult<String> {
        let row = self.render().query_one(conn).await?;
        returned_key(&row)
    }
}

impl SqlQb for InsertQb {
    fn build(self) -> BuiltQuery {
        self.render()
    }
}
