use std::time::Duration;

/// Settings for [`super::InstrumentedClient`].
///
/// The default reports nothing and never times out.
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// Deadline per statement.
    pub query_timeout: Option<Duration>,
    /// Statements slower than this trigger `on_slow_query`.
    pub slow_query_threshold: Option<Duration>,
    /// Whether monitors receive events.
    pub monitoring_enabled: bool,
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A statement exceeding it returns [`crate::DbError::Timeout`] and a
    /// server-side cancel is attempted.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn enable_monitoring(mut self) -> Self {
        self.monitoring_enabled = true;
        self
    }

    pub fn disable_monitoring(mut self) -> Self {
        self.monitoring_enabled = false;
        self
    }
}
