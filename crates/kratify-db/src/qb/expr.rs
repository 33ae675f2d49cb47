//! Predicate tree for WHERE/HAVING clauses.
//!
//! Predicates are collected as [`Expr`] nodes and rendered once, when the
//! statement is built. Rendering pushes every bound value onto a shared
//! [`ParamList`], so each placeholder index comes from the list length at the
//! moment the value is pushed. Sections rendered later (WHERE after SET,
//! HAVING after WHERE) simply continue the same list.
//!
//! Caller-authored SQL enters the tree as [`Expr::Fragment`]. A fragment's
//! local placeholders (`?` taken in order, or `$n` naming the fragment's n-th
//! value) are rewritten to global `$k` tokens during rendering.

use crate::qb::param::{Param, ParamList};
use std::fmt::Write as _;
use tokio_postgres::types::ToSql;

/// One node of a predicate tree.
#[derive(Clone, Debug)]
pub enum Expr {
    /// Children joined with `AND`; empty children are skipped.
    And(Vec<Expr>),

    /// Children joined with `OR`.
    Or(Vec<Expr>),

    /// `NOT (inner)`.
    Not(Box<Expr>),

    /// `column <op> $n`
    Compare {
        column: String,
        op: &'static str,
        value: Param,
    },

    NullCheck { column: String, is_null: bool },

    /// Never built empty; see [`Expr::in_list`].
    InList {
        column: String,
        values: Vec<Param>,
        negated: bool,
    },

    Between {
        column: String,
        from: Param,
        to: Param,
        negated: bool,
    },

    /// Caller-authored SQL with local placeholders, renumbered on render.
    Fragment { sql: String, params: Vec<Param> },

    /// Text copied into the statement as-is.
    Raw(String),
}

impl Expr {
    pub fn and(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    pub fn or(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    fn compare<T: ToSql + Send + Sync + 'static>(
        column: impl Into<String>,
        op: &'static str,
        value: T,
    ) -> Self {
        Expr::Compare {
            column: column.into(),
            op,
            value: Param::new(value),
        }
    }

    /// `column = $n`. The other comparison constructors differ only in the operator.
    pub fn eq<T: ToSql + Send + Sync + 'static>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, "=", value)
    }

    pub fn ne<T: ToSql + Send + Sync + 'static>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, "!=", value)
    }

    pub fn gt<T: ToSql + Send + Sync + 'static>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, ">", value)
    }

    pub fn gte<T: ToSql + Send + Sync + 'static>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, ">=", value)
    }

    pub fn lt<T: ToSql + Send + Sync + 'static>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, "<", value)
    }

    pub fn lte<T: ToSql + Send + Sync + 'static>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, "<=", value)
    }

    pub fn like<T: ToSql + Send + Sync + 'static>(column: impl Into<String>, pattern: T) -> Self {
        Self::compare(column, "LIKE", pattern)
    }

    /// Case-insensitive `LIKE`.
    pub fn ilike<T: ToSql + Send + Sync + 'static>(column: impl Into<String>, pattern: T) -> Self {
        Self::compare(column, "ILIKE", pattern)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: true,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: false,
        }
    }

    /// `column IN ($a, $b, ...)`.
    ///
    /// An empty list yields an empty expression, which renders to nothing:
    /// filtering on an empty set adds **no** predicate rather than an
    /// always-false one. Check for emptiness first if "match nothing" is meant.
    pub fn in_list<T: ToSql + Send + Sync + 'static>(
        column: impl Into<String>,
        values: Vec<T>,
    ) -> Self {
        Self::list(column, values, false)
    }

    /// Same empty-list rule as [`Expr::in_list`].
    pub fn not_in<T: ToSql + Send + Sync + 'static>(
        column: impl Into<String>,
        values: Vec<T>,
    ) -> Self {
        Self::list(column, values, true)
    }

    fn list<T: ToSql + Send + Sync + 'static>(
        column: impl Into<String>,
        values: Vec<T>,
        negated: bool,
    ) -> Self {
        if values.is_empty() {
            return Expr::And(Vec::new());
        }
        Expr::InList {
            column: column.into(),
            values: values.into_iter().map(Param::new).collect(),
            negated,
        }
    }

    /// Inclusive range.
    pub fn between<T: ToSql + Send + Sync + 'static>(
        column: impl Into<String>,
        from: T,
        to: T,
    ) -> Self {
        Expr::Between {
            column: column.into(),
            from: Param::new(from),
            to: Param::new(to),
            negated: false,
        }
    }

    pub fn not_between<T: ToSql + Send + Sync + 'static>(
        column: impl Into<String>,
        from: T,
        to: T,
    ) -> Self {
        Expr::Between {
            column: column.into(),
            from: Param::new(from),
            to: Param::new(to),
            negated: true,
        }
    }

    /// Caller SQL whose `?` / `$n` placeholders refer to `params` only.
    ///
    /// When `params` is non-empty every unquoted `?` is read as a placeholder,
    /// so the jsonb operators `?`, `?|` and `?&` cannot appear in the text.
    /// Use `jsonb_exists(col, $1)` / `jsonb_exists_any` / `jsonb_exists_all`
    /// instead. A fragment with a top-level `OR` is parenthesised when it is
    /// ANDed with other predicates.
    ///
    /// # Example
    /// ```ignore
    /// Expr::fragment("email = ?", params!["a@b.com"]);
    /// Expr::fragment("created_at BETWEEN $1 AND $2", params![from, to]);
    /// ```
    pub fn fragment(sql: impl Into<String>, params: Vec<Param>) -> Self {
        Expr::Fragment {
            sql: sql.into(),
            params,
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    /// True when rendering would produce no text.
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().all(|e| e.is_empty()),
            Expr::Not(inner) => inner.is_empty(),
            Expr::Raw(sql) => sql.trim().is_empty(),
            Expr::Fragment { sql, .. } => sql.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the SQL fragment, pushing bound values onto `params`.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            Expr::And(exprs) => join_group(exprs, " AND ", params),
            Expr::Or(exprs) => join_group(exprs, " OR ", params),
            Expr::Not(inner) => {
                let sql = inner.build(params);
                if sql.is_empty() {
                    String::new()
                } else {
                    format!("NOT ({sql})")
                }
            }
            Expr::Compare { column, op, value } => {
                let idx = params.push_param(value.clone());
                format!("{column} {op} ${idx}")
            }
            Expr::NullCheck { column, is_null } => {
                if *is_null {
                    format!("{column} IS NULL")
                } else {
                    format!("{column} IS NOT NULL")
                }
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| format!("${}", params.push_param(v.clone())))
                    .collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{column} {op} ({})", placeholders.join(", "))
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                let idx1 = params.push_param(from.clone());
                let idx2 = params.push_param(to.clone());
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!("{column} {op} ${idx1} AND ${idx2}")
            }
            Expr::Fragment {
                sql,
                params: local,
            } => renumber_fragment(sql, local, params),
            Expr::Raw(sql) => sql.clone(),
        }
    }
}

fn join_group(exprs: &[Expr], sep: &str, params: &mut ParamList) -> String {
    let live: Vec<&Expr> = exprs.iter().filter(|e| !e.is_empty()).collect();
    let several = live.len() > 1;
    let parts: Vec<String> = live
        .into_iter()
        .map(|e| {
            let sql = e.build(params);
            let wrap = match (sep, e) {
                // An OR group is always one operand of the surrounding AND.
                (" AND ", Expr::Or(_)) => !sql.is_empty(),
                // Caller text may carry its own top-level OR.
                (" AND ", _) => several && has_top_level_or(&sql),
                (" OR ", Expr::And(inner)) => inner.iter().filter(|i| !i.is_empty()).count() > 1,
                _ => false,
            };
            if wrap { format!("({sql})") } else { sql }
        })
        .filter(|s| !s.is_empty())
        .collect();
    parts.join(sep)
}

/// True when `sql` has an `OR` keyword outside parentheses and quotes.
fn has_top_level_or(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' => depth += 1,
            b')' => depth -= 1,
            b'O' | b'o' if depth == 0 => {
                let next = bytes.get(i + 1).copied();
                let before = i.checked_sub(1).map(|j| bytes[j]);
                let after = bytes.get(i + 2).copied();
                let boundary = |c: Option<u8>| c.is_none_or(|c| !(c.is_ascii_alphanumeric() || c == b'_'));
                if matches!(next, Some(b'R' | b'r')) && boundary(before) && boundary(after) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Rewrite a fragment's local placeholders into global ones.
///
/// All of the fragment's values are appended to `params` first, in the order
/// given. `$n` then maps to `$(offset + n)` and each `?` takes the next value
/// in sequence. Tokens inside single-quoted literals, `$n` beyond the
/// fragment's value count, and surplus `?` are copied through untouched.
pub(crate) fn renumber_fragment(sql: &str, local: &[Param], params: &mut ParamList) -> String {
    let offset = params.len();
    for p in local {
        params.push_param(p.clone());
    }
    if local.is_empty() {
        return sql.to_string();
    }

    let mut out = String::with_capacity(sql.len() + local.len() * 2);
    let mut seq = 0usize;
    let mut in_literal = false;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal && seq < local.len() => {
                seq += 1;
                let _ = write!(out, "${}", offset + seq);
            }
            '$' if !in_literal => {
                let mut digits = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(d);
                    chars.next();
                }
                match digits.parse::<usize>() {
                    Ok(n) if (1..=local.len()).contains(&n) => {
                        let _ = write!(out, "${}", offset + n);
                    }
                    _ => {
                        out.push('$');
                        out.push_str(&digits);
                    }
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

macro_rules! compare_methods {
    ($($name:ident => $op:literal),* $(,)?) => {
        $(
            #[doc = concat!("AND `column ", $op, " $n`.")]
            pub fn $name<T: ToSql + Send + Sync + 'static>(&mut self, column: &str, value: T) {
                self.exprs.push(Expr::$name(column, value));
            }
        )*
    };
}

/// The clauses of one WHERE or HAVING section, joined with AND.
///
/// Empty entries (an empty IN list, a blank fragment) never reach the
/// output, so a group that only received empty entries renders nothing.
#[derive(Clone, Debug, Default)]
pub struct ExprGroup {
    exprs: Vec<Expr>,
}

impl ExprGroup {
    pub fn new() -> Self {
        Self { exprs: Vec::new() }
    }

    /// Check if the group renders to nothing.
    pub fn is_empty(&self) -> bool {
        self.exprs.iter().all(|e| e.is_empty())
    }

    /// Number of top-level entries (empty ones included).
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    /// Add an expression to be ANDed. Empty expressions are dropped.
    pub fn and_expr(&mut self, expr: Expr) {
        if !expr.is_empty() {
            self.exprs.push(expr);
        }
    }

    /// Add a fragment with local placeholders.
    pub fn fragment(&mut self, sql: &str, params: Vec<Param>) {
        self.and_expr(Expr::fragment(sql, params));
    }

    /// Parameterless condition text.
    pub fn raw(&mut self, sql: &str) {
        self.and_expr(Expr::raw(sql));
    }

    /// Add fragments joined by OR; the group is ANDed with the rest.
    pub fn or_group(&mut self, exprs: Vec<Expr>) {
        self.and_expr(Expr::Or(exprs));
    }

    compare_methods! {
        eq => "=",
        ne => "!=",
        gt => ">",
        gte => ">=",
        lt => "<",
        lte => "<=",
        like => "LIKE",
        ilike => "ILIKE",
    }

    pub fn is_null(&mut self, column: &str) {
        self.exprs.push(Expr::is_null(column));
    }

    pub fn is_not_null(&mut self, column: &str) {
        self.exprs.push(Expr::is_not_null(column));
    }

    /// No-op for an empty list.
    pub fn in_list<T: ToSql + Send + Sync + 'static>(&mut self, column: &str, values: Vec<T>) {
        self.and_expr(Expr::in_list(column, values));
    }

    /// No-op for an empty list.
    pub fn not_in<T: ToSql + Send + Sync + 'static>(&mut self, column: &str, values: Vec<T>) {
        self.and_expr(Expr::not_in(column, values));
    }

    pub fn between<T: ToSql + Send + Sync + 'static>(&mut self, column: &str, from: T, to: T) {
        self.exprs.push(Expr::between(column, from, to));
    }

    /// Render the group (without the WHERE/HAVING keyword), continuing the
    /// numbering of `params`.
    pub fn build_into(&self, params: &mut ParamList) -> String {
        join_group(&self.exprs, " AND ", params)
    }

    /// Render the group into a fresh parameter list.
    pub fn build(&self) -> (String, ParamList) {
        let mut params = ParamList::new();
        let sql = self.build_into(&mut params);
        (sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_simple_eq() {
        let expr = Expr::eq("name", "alice");
        let mut params = ParamList::new();
        assert_eq!(expr.build(&mut params), "name = $1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_nested_and_or() {
        let expr = Expr::and(vec![
            Expr::eq("status", "active"),
            Expr::or(vec![Expr::eq("role", "admin"), Expr::eq("role", "owner")]),
        ]);
        let mut params = ParamList::new();
        assert_eq!(
            expr.build(&mut params),
            "status = $1 AND (role = $2 OR role = $3)"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_empty_in_list_renders_nothing() {
        let expr = Expr::in_list::<i32>("id", vec![]);
        assert!(expr.is_empty());
        let mut params = ParamList::new();
        assert_eq!(expr.build(&mut params), "");
        assert!(params.is_empty());
    }

    #[test]
    fn test_question_mark_fragment() {
        let expr = Expr::fragment("a = ? OR b = ?", params![1i32, 2i32]);
        let mut params = ParamList::new();
        params.push("earlier");
        assert_eq!(expr.build(&mut params), "a = $2 OR b = $3");
        assert_eq!(format!("{:?}", params.as_slice()), r#"["earlier", 1, 2]"#);
    }

    #[test]
    fn test_dollar_fragment_is_offset() {
        let mut params = ParamList::new();
        params.push(1i32);
        params.push(2i32);
        params.push(3i32);
        let sql = renumber_fragment("x = $2 AND y = $1", &params!["a", "b"], &mut params);
        assert_eq!(sql, "x = $5 AND y = $4");
        assert_eq!(format!("{:?}", params.as_slice()), r#"[1, 2, 3, "a", "b"]"#);
    }

    #[test]
    fn test_dollar_fragment_reuses_local_index() {
        let mut params = ParamList::new();
        params.push("x");
        let sql = renumber_fragment("a = $1 OR b = $1", &params!["v"], &mut params);
        assert_eq!(sql, "a = $2 OR b = $2");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_multi_digit_placeholders() {
        let mut params = ParamList::new();
        for i in 0..9 {
            params.push(i);
        }
        let local = params![10i32, 11i32, 12i32, 13i32, 14i32, 15i32, 16i32, 17i32, 18i32, 19i32];
        let sql = renumber_fragment("c = $10 AND d = $1", &local, &mut params);
        assert_eq!(sql, "c = $19 AND d = $10");
    }

    #[test]
    fn test_literals_are_not_renumbered() {
        let mut params = ParamList::new();
        params.push(0i32);
        let sql = renumber_fragment("note = 'what?' AND price = '$1' AND id = ?", &params![5i32], &mut params);
        assert_eq!(sql, "note = 'what?' AND price = '$1' AND id = $2");
    }

    #[test]
    fn test_out_of_range_tokens_are_kept() {
        let mut params = ParamList::new();
        let sql = renumber_fragment("a = ? AND b = ? AND c = $3", &params![1i32], &mut params);
        assert_eq!(sql, "a = $1 AND b = ? AND c = $3");
    }

    #[test]
    fn test_group_continues_numbering() {
        let mut group = ExprGroup::new();
        group.eq("name", "alice");
        group.gt("age", 18i32);

        let mut params = ParamList::new();
        params.push("set value");
        params.push("other");
        params.push("third");
        assert_eq!(group.build_into(&mut params), "name = $4 AND age > $5");
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn test_or_group_of_one_keeps_parens() {
        let mut group = ExprGroup::new();
        group.raw("deleted_at IS NULL");
        group.or_group(vec![Expr::fragment("email = ?", params!["a@b.com"])]);
        let (sql, _) = group.build();
        assert_eq!(sql, "deleted_at IS NULL AND (email = $1)");
    }

    #[test]
    fn test_top_level_or_detection() {
        assert!(has_top_level_or("a = 1 OR b = 2"));
        assert!(has_top_level_or("a = 1 or b = 2"));
        assert!(!has_top_level_or("(a = 1 OR b = 2)"));
        assert!(!has_top_level_or("note = 'x OR y'"));
        assert!(!has_top_level_or("\"OR\" = 1"));
        assert!(!has_top_level_or("color = $1 AND orders > 0"));
        assert!(!has_top_level_or("vendor = $1"));
    }

    #[test]
    fn test_jsonb_key_checks() {
        // Without values the jsonb `?` operator passes through.
        let mut params = ParamList::new();
        let sql = renumber_fragment("tags ? 'vip'", &[], &mut params);
        assert_eq!(sql, "tags ? 'vip'");

        // With values, the function form keeps the key bound.
        params.push("earlier");
        let sql = renumber_fragment("jsonb_exists(tags, ?)", &params!["vip"], &mut params);
        assert_eq!(sql, "jsonb_exists(tags, $2)");
    }

    #[test]
    fn test_not() {
        let expr = Expr::not(Expr::eq("banned", true));
        let mut params = ParamList::new();
        assert_eq!(expr.build(&mut params), "NOT (banned = $1)");
    }
}
