use super::truncate_sql_bytes;
use super::types::{QueryContext, QueryMonitor, QueryResult};
use std::time::Duration;

/// Emits one `tracing` event per completed statement under the
/// `kratify_db::sql` target.
///
/// Successful statements are logged at `INFO`, failures at `ERROR` and slow
/// statements additionally at `WARN`. Argument values are never logged, only
/// their count.
#[derive(Debug, Clone)]
pub struct TracingMonitor {
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingMonitor {
    fn default() -> Self {
        Self {
            max_sql_length: Some(500),
        }
    }
}

impl TracingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

impl QueryMonitor for TracingMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        let tag = ctx.tag.as_deref().unwrap_or("-");
        let sql = self.truncate_sql(&ctx.sql);
        match result {
            QueryResult::Error(error) => tracing::error!(
                target: "kratify_db::sql",
                operation = %ctx.query_type,
                tag,
                param_count = ctx.param_count,
                duration = ?duration,
                error = %error,
                sql = %sql,
                "statement failed"
            ),
            ok => tracing::info!(
                target: "kratify_db::sql",
                operation = %ctx.query_type,
                tag,
                param_count = ctx.param_count,
                duration = ?duration,
                result = %ok,
                sql = %sql,
                "statement executed"
            ),
        }
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        tracing::warn!(
            target: "kratify_db::sql",
            operation = %ctx.query_type,
            tag = ctx.tag.as_deref().unwrap_or("-"),
            duration = ?duration,
            sql = %self.truncate_sql(&ctx.sql),
            "slow statement"
        );
    }
}
