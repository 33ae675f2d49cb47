//! UPDATE statement builder with updated-by auditing.

use crate::audit;
use crate::clock::{SharedClock, system_clock};
use crate::qb::expr::ExprGroup;
use crate::qb::param::{Param, ParamList};
use crate::qb::traits::{BuiltQuery, MutationQb, SqlQb};
use tokio_postgres::types::ToSql;

/// SET field value type.
#[derive(Clone, Debug)]
enum SetField {
    /// Parameterized value
    Value(Param),
    /// Raw SQL expression
    Raw(String),
}

/// UPDATE statement builder.
///
/// Predicates are ANDed; there is no OR group on updates. With no predicate
/// at all the WHERE clause is omitted and **every row** is updated.
#[derive(Clone, Debug)]
pub struct UpdateQb {
    table: String,
    set_fields: Vec<(String, SetField)>,
    updated_by: Option<Param>,
    where_group: ExprGroup,
    clock: SharedClock,
    tag: Option<String>,
}

impl UpdateQb {
    /// Create a new UPDATE builder.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            set_fields: Vec::new(),
            updated_by: None,
            where_group: ExprGroup::new(),
            clock: system_clock(),
            tag: None,
        }
    }

    /// Set a column value.
    pub fn set<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.set_fields
            .push((column.to_string(), SetField::Value(Param::new(value))));
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
        self.set_fields
            .push((column.to_string(), SetField::Raw(expr.to_string())));
        self
    }

    /// Record `actor` in `updated_by` and stamp `updated_at`.
    ///
    /// Both clauses follow every caller SET clause.
    pub fn set_updated_by<A: ToSql + Send + Sync + 'static>(mut self, actor: A) -> Self {
        self.updated_by = Some(Param::new(actor));
        self
    }

    /// Number of caller SET clauses so far.
    pub fn set_count(&self) -> usize {
        self.set_fields.len()
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

    /// Add WHERE: column != value
    pub fn ne<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.where_group.ne(column, value);
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

    /// Add WHERE: column IS NOT NULL
    pub fn where_not_null(mut self, column: &str) -> Self {
        self.where_group.is_not_null(column);
        self
    }

    /// Override the time source used for `updated_at`.
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
            !self.set_fields.is_empty(),
            "UPDATE {} built without any SET clause",
            self.table
        );

        let mut params = ParamList::new();
        let mut set_parts: Vec<String> = self
            .set_fields
            .into_iter()
            .map(|(col, field)| match field {
                SetField::Value(p) => format!("{col} = ${}", params.push_param(p)),
                SetField::Raw(expr) => format!("{col} = {expr}"),
            })
            .collect();

        if let Some(actor) = self.updated_by {
            let now = self.clock.now();
            set_parts.push(format!("{} = ${}", audit::UPDATED_BY, params.push_param(actor)));
            set_parts.push(format!("{} = ${}", audit::UPDATED_AT, params.push(now)));
        }

        let mut sql = format!("UPDATE {} SET {}", self.table, set_parts.join(", "));
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

impl SqlQb for UpdateQb {
    fn build(self) -> BuiltQuery {
        self.render()
    }
}

impl MutationQb for UpdateQb {}
