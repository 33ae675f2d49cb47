//! DELETE statement builder: soft delete by default, hard delete on request.

use crate::audit;
use crate::clock::{SharedClock, system_clock};
use crate::qb::expr::ExprGroup;
use crate::qb::param::{Param, ParamList};
use crate::qb::traits::{BuiltQuery, MutationQb, SqlQb};
use tokio_postgres::types::ToSql;

/// How matching rows are removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// `UPDATE ... SET deleted_at = now` (rows stay in the table).
    #[default]
    Soft,
    /// `DELETE FROM ...` (rows are removed, no audit columns touched).
    Hard,
}

/// DELETE statement builder.
///
/// Soft mode emits
/// `UPDATE t SET deleted_at = $1[, deleted_by = $2], updated_at = $n WHERE ...`
/// with WHERE placeholders numbered after the SET ones. Hard mode emits
/// `DELETE FROM t [WHERE ...]` and ignores any actor. Both timestamps of a
/// soft delete come from a single clock reading.
///
/// With no predicate the WHERE clause is omitted and **every row** matches.
#[derive(Clone, Debug)]
pub struct DeleteQb {
    table: String,
    mode: DeleteMode,
    deleted_by: Option<Param>,
    where_group: ExprGroup,
    clock: SharedClock,
    tag: Option<String>,
}

impl DeleteQb {
    /// Create a new (soft) DELETE builder.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            mode: DeleteMode::Soft,
            deleted_by: None,
            where_group: ExprGroup::new(),
            clock: system_clock(),
            tag: None,
        }
    }

    /// Remove rows physically instead of stamping `deleted_at`.
    pub fn hard_delete(mut self) -> Self {
        self.mode = DeleteMode::Hard;
        self
    }

    /// Current mode.
    pub fn mode(&self) -> DeleteMode {
        self.mode
    }

    /// Record `actor` in `deleted_by`. Ignored in hard mode.
    pub fn set_deleted_by<A: ToSql + Send + Sync + 'static>(mut self, actor: A) -> Self {
        self.deleted_by = Some(Param::new(actor));
        self
    }

    // ==================== WHERE ====================

    /// Add a predicate fragment with local placeholders (`?` or `$n`).
    /// A top-level `OR` is parenthesised when other predicates are present.
    pub fn where_(mut self, fragment: &str, params: Vec<Param>) -> Self {
        self.where_group.fragment(fragment, params);
        self
    }

    /// Add a predicate without arguments.
    pub fn where_raw(mut self, fragment: &str) -> Self {
        self.where_group.raw(fragment);
        self
    }

    /// Add WHERE: column = value
    pub fn eq<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.where_group.eq(column, value);
        self
    }

    /// Add WHERE: column IN (values...). An empty `values` is a no-op.
    pub fn where_in<T: ToSql + Send + Sync + 'static>(mut self, column: &str, values: Vec<T>) -> Self {
        self.where_group.in_list(column, values);
        self
    }

    /// Add WHERE: column IS NULL
    pub fn where_null(mut self, column: &str) -> Self {
        self.where_group.is_null(column);
        self
    }

    /// Override the time source used for `deleted_at` / `updated_at`.
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
        let mut params = ParamList::new();
        let mut sql = match self.mode {
            DeleteMode::Hard => format!("DELETE FROM {}", self.table),
            DeleteMode::Soft => {
                let now = self.clock.now();
                let mut sets = vec![format!("{} = ${}", audit::DELETED_AT, params.push(now))];
                if let Some(actor) = self.deleted_by {
                    sets.push(format!("{} = ${}", audit::DELETED_BY, params.push_param(actor)));
                }
                sets.push(format!("{} = ${}", audit::UPDATED_AT, params.push(now)));
                format!("UPDATE {} SET {}", self.table, sets.join(", "))
            }
        };

        let where_sql = self.where_group.build_into(&mut params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        let built = BuiltQuery::new(sql, params.into_vec());
        match self.tag {
            Some(tag) => built.with_tag(tag),
            None => built,
        }
    }
}

impl SqlQb for DeleteQb {
    fn build(self) -> BuiltQuery {
        self.render()
    }
}

impl MutationQb for DeleteQb {}
