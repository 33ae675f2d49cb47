//! SELECT statement builder.

use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::qb::expr::{Expr, ExprGroup};
use crate::qb::page::Page;
use crate::qb::param::{Param, ParamList};
use crate::qb::traits::{BuiltQuery, SqlQb};
use crate::row::FromRow;
use tokio_postgres::types::ToSql;

const DEFAULT_PER_PAGE: i64 = 10;

/// SELECT statement builder with expression-based WHERE/HAVING.
///
/// Top-level predicates are ANDed; [`SelectQb::or_where`] adds a group whose
/// members are ORed with each other and ANDed with the rest.
#[derive(Clone, Debug)]
pub struct SelectQb {
    /// Table or FROM expression
    from_expr: String,
    /// SELECT columns (default ["*"])
    select_cols: Vec<String>,
    distinct: bool,
    /// JOIN clauses, verbatim
    join_clauses: Vec<String>,
    where_group: ExprGroup,
    group_by: Vec<String>,
    having_group: ExprGroup,
    order_clauses: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    tag: Option<String>,
}

impl SelectQb {
    /// Create a new SELECT builder for a table (or `table alias`).
    pub fn new(table: &str) -> Self {
        Self {
            from_expr: table.to_string(),
            select_cols: vec!["*".to_string()],
            distinct: false,
            join_clauses: Vec::new(),
            where_group: ExprGroup::new(),
            group_by: Vec::new(),
            having_group: ExprGroup::new(),
            order_clauses: Vec::new(),
            limit: None,
            offset: None,
            tag: None,
        }
    }

    // ==================== SELECT columns ====================

    /// Replace the projection with a single expression.
    pub fn select(mut self, cols: &str) -> Self {
        self.select_cols = vec![cols.to_string()];
        self
    }

    /// Replace the projection with a list of columns.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.select_cols = cols.iter().map(|s| s.to_string()).collect();
        if self.select_cols.is_empty() {
            self.select_cols.push("*".to_string());
        }
        self
    }

    /// Append one column to the projection.
    pub fn add_column(mut self, col: &str) -> Self {
        if self.select_cols.len() == 1 && self.select_cols[0] == "*" {
            self.select_cols[0] = col.to_string();
        } else {
            self.select_cols.push(col.to_string());
        }
        self
    }

    /// Emit `SELECT DISTINCT`.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // ==================== JOIN ====================

    /// Add a join fragment verbatim, e.g. `LEFT JOIN addresses a ON a.user_id = u.id`.
    pub fn join(mut self, clause: &str) -> Self {
        self.join_clauses.push(clause.to_string());
        self
    }

    /// Add INNER JOIN.
    pub fn inner_join(mut self, table: &str, on: &str) -> Self {
        self.join_clauses.push(format!("INNER JOIN {table} ON {on}"));
        self
    }

    /// Add LEFT JOIN.
    pub fn left_join(mut self, table: &str, on: &str) -> Self {
        self.join_clauses.push(format!("LEFT JOIN {table} ON {on}"));
        self
    }

    /// Add RIGHT JOIN.
    pub fn right_join(mut self, table: &str, on: &str) -> Self {
        self.join_clauses.push(format!("RIGHT JOIN {table} ON {on}"));
        self
    }

    /// Add FULL OUTER JOIN.
    pub fn full_join(mut self, table: &str, on: &str) -> Self {
        self.join_clauses.push(format!("FULL OUTER JOIN {table} ON {on}"));
        self
    }

    // ==================== WHERE ====================

    /// Add a predicate fragment with local placeholders (`?` or `$n`).
    ///
    /// A top-level `OR` in the text is wrapped in parentheses once other
    /// predicates join it. See [`Expr::fragment`] for the jsonb `?` caveat.
    ///
    /// ```ignore
    /// select("users").where_("email = ?", params!["a@b.com"]);
    /// ```
    pub fn where_(mut self, fragment: &str, params: Vec<Param>) -> Self {
        self.where_group.fragment(fragment, params);
        self
    }

    /// Add a predicate without arguments.
    pub fn where_raw(mut self, fragment: &str) -> Self {
        self.where_group.raw(fragment);
        self
    }

    /// Add an OR group: the entries are joined by OR and the group is ANDed
    /// with the other predicates.
    pub fn or_where(mut self, exprs: Vec<Expr>) -> Self {
        self.where_group.or_group(exprs);
        self
    }

    /// Add a custom expression.
    pub fn and_expr(mut self, expr: Expr) -> Self {
        self.where_group.and_expr(expr);
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

    /// Add WHERE: column > value
    pub fn gt<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.where_group.gt(column, value);
        self
    }

    /// Add WHERE: column >= value
    pub fn gte<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.where_group.gte(column, value);
        self
    }

    /// Add WHERE: column < value
    pub fn lt<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.where_group.lt(column, value);
        self
    }

    /// Add WHERE: column <= value
    pub fn lte<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.where_group.lte(column, value);
        self
    }

    /// Add WHERE: column IN (values...)
    ///
    /// An empty `values` adds **no** predicate at all, so the statement is not
    /// narrowed. Callers that mean "match nothing" must check for emptiness.
    pub fn where_in<T: ToSql + Send + Sync + 'static>(mut self, column: &str, values: Vec<T>) -> Self {
        self.where_group.in_list(column, values);
        self
    }

    /// Add WHERE: column NOT IN (values...). An empty `values` is a no-op.
    pub fn where_not_in<T: ToSql + Send + Sync + 'static>(
        mut self,
        column: &str,
        values: Vec<T>,
    ) -> Self {
        self.where_group.not_in(column, values);
        self
    }

    /// Add WHERE: column LIKE pattern
    pub fn where_like<T: ToSql + Send + Sync + 'static>(mut self, column: &str, pattern: T) -> Self {
        self.where_group.like(column, pattern);
        self
    }

    /// Add WHERE: column ILIKE pattern
    pub fn where_ilike<T: ToSql + Send + Sync + 'static>(mut self, column: &str, pattern: T) -> Self {
        self.where_group.ilike(column, pattern);
        self
    }

    /// Add WHERE: column BETWEEN from AND to (inclusive)
    pub fn where_between<T: ToSql + Send + Sync + 'static>(
        mut self,
        column: &str,
        from: T,
        to: T,
    ) -> Self {
        self.where_group.between(column, from, to);
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

    // ==================== Grouping & ordering ====================

    /// Add a GROUP BY entry.
    pub fn group_by(mut self, clause: &str) -> Self {
        self.group_by.push(clause.to_string());
        self
    }

    /// Add a HAVING fragment with local placeholders.
    ///
    /// HAVING arguments are numbered after all WHERE arguments.
    pub fn having(mut self, fragment: &str, params: Vec<Param>) -> Self {
        self.having_group.fragment(fragment, params);
        self
    }

    /// Add an ORDER BY entry, e.g. `created_at DESC`.
    pub fn order_by(mut self, clause: &str) -> Self {
        self.order_clauses.push(clause.to_string());
        self
    }

    // ==================== Pagination ====================

    /// Set LIMIT. Values of zero or below are not emitted.
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Set OFFSET. Values of zero or below are not emitted.
    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Page-based LIMIT/OFFSET. `page < 1` becomes 1, `per_page < 1` becomes 10.
    pub fn paginate(mut self, page: i64, per_page: i64) -> Self {
        let (page, per_page) = normalize_page(page, per_page);
        self.limit = Some(per_page);
        self.offset = Some((page - 1).saturating_mul(per_page));
        self
    }

    /// Tag executions of this statement for monitoring.
    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    // ==================== Build ====================

    fn push_body(&self, sql: &mut String, params: &mut ParamList) {
        sql.push_str(" FROM ");
        sql.push_str(&self.from_expr);

        for join in &self.join_clauses {
            sql.push(' ');
            sql.push_str(join);
        }

        let where_sql = self.where_group.build_into(params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        let having_sql = self.having_group.build_into(params);
        if !having_sql.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&having_sql);
        }
    }

    fn render(&self) -> BuiltQuery {
        let mut params = ParamList::new();
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.select_cols.join(", "));
        self.push_body(&mut sql, &mut params);

        if !self.order_clauses.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_clauses.join(", "));
        }
        if let Some(limit) = self.limit.filter(|n| *n > 0) {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset.filter(|n| *n > 0) {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        self.finish(sql, params)
    }

    fn render_count(&self) -> BuiltQuery {
        let mut params = ParamList::new();
        let grouped = self.distinct || !self.group_by.is_empty() || !self.having_group.is_empty();

        let sql = if grouped {
            let mut inner = String::from("SELECT ");
            if self.distinct {
                inner.push_str("DISTINCT ");
                inner.push_str(&self.select_cols.join(", "));
            } else {
                inner.push('1');
            }
            self.push_body(&mut inner, &mut params);
            format!("SELECT COUNT(*) FROM ({inner}) AS t")
        } else {
            let mut sql = String::from("SELECT COUNT(*)");
            self.push_body(&mut sql, &mut params);
            sql
        };

        self.finish(sql, params)
    }

    fn finish(&self, sql: String, params: ParamList) -> BuiltQuery {
        let built = BuiltQuery::new(sql, params.into_vec());
        match &self.tag {
            Some(tag) => built.with_tag(tag.clone()),
            None => built,
        }
    }

    /// Render the COUNT statement this builder would run (for inspection).
    pub fn build_count(&self) -> BuiltQuery {
        self.render_count()
    }

    /// Count the rows matching FROM/JOIN/WHERE (ORDER BY and LIMIT ignored).
    pub async fn count(self, conn: &impl GenericClient) -> DbResult<i64> {
        let row = self.render_count().query_one(conn).await?;
        row.try_get::<_, i64>(0)
            .map_err(|e| DbError::decode("count", e.to_string()))
    }

    /// Whether any row matches.
    pub async fn exists(self, conn: &impl GenericClient) -> DbResult<bool> {
        Ok(self.count(conn).await? > 0)
    }

    /// Count, then fetch one page of rows mapped to `T`.
    pub async fn fetch_page<T: FromRow>(
        self,
        conn: &impl GenericClient,
        page: i64,
        per_page: i64,
    ) -> DbResult<Page<T>> {
        let (page, per_page) = normalize_page(page, per_page);
        let total = self.clone().count(conn).await?;
        let data = self.paginate(page, per_page).fetch_all::<T>(conn).await?;
        Ok(Page::new(page, per_page, total, data))
    }
}

fn normalize_page(page: i64, per_page: i64) -> (i64, i64) {
    let page = if page < 1 { 1 } else { page };
    let per_page = if per_page < 1 { DEFAULT_PER_PAGE } else { per_page };
    (page, per_page)
}

impl SqlQb for SelectQb {
    fn build(self) -> BuiltQuery {
        self.render()
    }
}
