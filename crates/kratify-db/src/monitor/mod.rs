//! Statement monitoring and timeouts.
//!
//! Builders never log. Observability is opt-in: wrap a connection in an
//! [`InstrumentedClient`] and give it a [`QueryMonitor`].
//!
//! # Example
//!
//! ```rust,ignore
//! use kratify_db::monitor::{InstrumentedClient, MonitorConfig, TracingMonitor};
//! use std::time::Duration;
//!
//! let config = MonitorConfig::new()
//!     .with_query_timeout(Duration::from_secs(30))
//!     .with_slow_query_threshold(Duration::from_millis(500))
//!     .enable_monitoring();
//!
//! let client = InstrumentedClient::new(pool.get().await?)
//!     .with_config(config)
//!     .with_monitor(TracingMonitor::new());
//! ```

mod config;
mod instrumented;
mod monitors;
mod tracing_monitor;
mod types;


pub use config::MonitorConfig;
pub use instrumented::InstrumentedClient;
pub use monitors::{CompositeMonitor, NoopMonitor, QueryStats, StatsMonitor};
pub use tracing_monitor::TracingMonitor;
pub use types::{QueryContext, QueryMonitor, QueryResult, QueryType};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
