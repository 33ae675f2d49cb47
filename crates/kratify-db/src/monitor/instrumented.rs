use super::config::MonitorConfig;
use super::monitors::NoopMonitor;
use super::types::{QueryContext, QueryMonitor, QueryResult};
use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Wraps a [`GenericClient`] with timing, monitoring and a statement timeout.
///
/// Monitoring must be explicitly enabled via `MonitorConfig::enable_monitoring()`;
/// the timeout applies either way.
pub struct InstrumentedClient<C> {
    client: C,
    monitor: Arc<dyn QueryMonitor>,
    config: MonitorConfig,
}

impl<C: GenericClient> InstrumentedClient<C> {
    /// Wrap `client`; nothing is reported until monitoring is enabled.
    pub fn new(client: C) -> Self {
        Self {
            client,
            monitor: Arc::new(NoopMonitor),
            config: MonitorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the monitor (default [`NoopMonitor`]).
    pub fn with_monitor<M: QueryMonitor + 'static>(mut self, monitor: M) -> Self {
        self.monitor = Arc::new(monitor);
        self
    }

    /// Share one monitor across several wrapped clients.
    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Unwrap, e.g. to commit a wrapped transaction.
    pub fn into_inner(self) -> C {
        self.client
    }

    fn report(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        if !self.config.monitoring_enabled {
            return;
        }

        self.monitor.on_query_complete(ctx, duration, result);

        if let Some(threshold) = self.config.slow_query_threshold {
            if duration > threshold {
                self.monitor.on_slow_query(ctx, duration);
            }
        }
    }

    async fn with_timeout<T, F>(&self, future: F) -> DbResult<T>
    where
        F: std::future::Future<Output = DbResult<T>> + Send,
    {
        match self.config.query_timeout {
            Some(timeout) => {
                tokio::pin!(future);
                tokio::select! {
                    result = &mut future => result,
                    _ = tokio::time::sleep(timeout) => {
                        if let Some(cancel_token) = self.client.cancel_token() {
                            tokio::spawn(async move {
                                let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                            });
                        }
                        Err(DbError::Timeout(timeout))
                    }
                }
            }
            None => future.await,
        }
    }

    fn context(&self, sql: &str, param_count: usize, tag: Option<&str>) -> QueryContext {
        let ctx = QueryContext::new(sql, param_count);
        let ctx = match tag {
            Some(tag) => ctx.with_tag(tag),
            None => ctx,
        };
        if self.config.monitoring_enabled {
            self.monitor.on_query_start(&ctx);
        }
        ctx
    }

    async fn query_inner(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        tag: Option<&str>,
    ) -> DbResult<Vec<Row>> {
        let ctx = self.context(sql, params.len(), tag);

        let start = Instant::now();
        let result = self.with_timeout(self.client.query(sql, params)).await;
        let duration = start.elapsed();

        let outcome = match &result {
            Ok(rows) => QueryResult::Rows(rows.len()),
            Err(e) => QueryResult::error(e.to_string()),
        };
        self.report(&ctx, duration, &outcome);
        result
    }

    async fn execute_inner(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        tag: Option<&str>,
    ) -> DbResult<u64> {
        let ctx = self.context(sql, params.len(), tag);

        let start = Instant::now();
        let result = self.with_timeout(self.client.execute(sql, params)).await;
        let duration = start.elapsed();

        let outcome = match &result {
            Ok(n) => QueryResult::Affected(*n),
            Err(e) => QueryResult::error(e.to_string()),
        };
        self.report(&ctx, duration, &outcome);
        result
    }
}

impl<C: GenericClient> GenericClient for InstrumentedClient<C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        self.query_inner(sql, params, None).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        self.execute_inner(sql, params, None).await
    }

    async fn query_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<Vec<Row>> {
        self.query_inner(sql, params, Some(tag)).await
    }

    async fn execute_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<u64> {
        self.execute_inner(sql, params, Some(tag)).await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        self.client.cancel_token()
    }
}
