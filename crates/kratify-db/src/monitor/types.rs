use std::fmt;
use std::time::Duration;

/// The kind of statement being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// DDL, utility statements, anything unrecognized
    Other,
}

impl QueryType {
    /// Detect the statement kind from its leading keyword.
    ///
    /// A soft delete is an `UPDATE` and is reported as such.
    pub fn from_sql(sql: &str) -> Self {
        let keyword: String = sql
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();

        match keyword.to_ascii_uppercase().as_str() {
            "SELECT" => QueryType::Select,
            "INSERT" => QueryType::Insert,
            "UPDATE" => QueryType::Update,
            "DELETE" => QueryType::Delete,
            "WITH" => Self::after_cte(sql),
            _ => QueryType::Other,
        }
    }

    /// Find the statement that follows the last top-level `AS (...)` of a CTE.
    fn after_cte(sql: &str) -> Self {
        let mut depth = 0i32;
        let mut last_top_level = 0;
        let mut in_literal = false;
        for (i, b) in sql.bytes().enumerate() {
            match b {
                b'\'' => in_literal = !in_literal,
                b'(' if !in_literal => depth += 1,
                b')' if !in_literal => {
                    depth -= 1;
                    if depth == 0 {
                        last_top_level = i + 1;
                    }
                }
                _ => {}
            }
        }
        if last_top_level == 0 {
            return QueryType::Select;
        }
        match Self::from_sql(&sql[last_top_level..]) {
            QueryType::Other => QueryType::Select,
            other => other,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryType::Select => "select",
            QueryType::Insert => "insert",
            QueryType::Update => "update",
            QueryType::Delete => "delete",
            QueryType::Other => "other",
        };
        f.write_str(s)
    }
}

/// What a monitor is told about a statement.
///
/// Only the argument count is carried; argument values never reach monitors.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub sql: String,
    pub param_count: usize,
    pub query_type: QueryType,
    /// Optional name for the statement, e.g. `users.find_by_email`.
    pub tag: Option<String>,
}

impl QueryContext {
    pub fn new(sql: &str, param_count: usize) -> Self {
        Self {
            sql: sql.to_string(),
            param_count,
            query_type: QueryType::from_sql(sql),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Maximum length for error messages in `QueryResult::Error`.
const MAX_ERROR_LEN: usize = 512;

/// Outcome of a statement, as seen by monitors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// Query returned rows.
    Rows(usize),
    /// Statement affected rows.
    Affected(u64),
    /// Failure message (truncated to 512 bytes).
    Error(String),
}

impl QueryResult {
    /// Create an error result, truncating long messages.
    pub fn error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.len() <= MAX_ERROR_LEN {
            return Self::Error(msg);
        }
        let truncated = super::truncate_sql_bytes(&msg, MAX_ERROR_LEN);
        Self::Error(format!("{truncated}..."))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error(_))
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
            QueryResult::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Trait for observing statement execution.
pub trait QueryMonitor: Send + Sync {
    /// Called before a statement is sent.
    fn on_query_start(&self, _ctx: &QueryContext) {}

    /// Called after a statement completes (success or failure).
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult);

    /// Called when a statement exceeds the configured slow threshold.
    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration) {}
}
