//! # kratify-db
//!
//! Audited, soft-delete aware SQL statement builders for PostgreSQL.
//!
//! ## Features
//!
//! - **Local placeholders**: fragments are written with `?` (or `$1` counted
//!   from the fragment) and renumbered into one `$1..$N` sequence at build time
//! - **Audit columns**: `created_by/at`, `updated_by/at` and `deleted_by/at`
//!   are appended by the builders from an injectable [`Clock`]
//! - **Soft delete by default**: `delete()` renders an `UPDATE ... SET
//!   deleted_at`; a physical `DELETE` needs `hard_delete()`
//! - **Transaction-friendly**: anything implementing [`GenericClient`] runs a
//!   statement (connections, transactions, pooled clients)
//! - **Opt-in monitoring**: [`InstrumentedClient`] adds timing, `tracing`
//!   output and a statement timeout
//!
//! ## Example
//!
//! ```ignore
//! use kratify_db::{params, qb, DatabaseConfig, SqlQb};
//!
//! let pool = kratify_db::create_pool(&DatabaseConfig::from_env()?)?;
//! let client = pool.get().await?;
//!
//! let user = qb::select("users")
//!     .where_("email = ?", params!["a@b.com"])
//!     .where_raw("deleted_at IS NULL")
//!     .limit(1)
//!     .fetch_opt::<User>(&client)
//!     .await?;
//! ```

pub mod audit;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod monitor;
pub mod qb;
pub mod row;

#[cfg(feature = "pool")]
pub mod pool;

pub use client::GenericClient;
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use config::{DatabaseConfig, PoolSettings};
pub use error::{DbError, DbResult};
pub use monitor::{
    CompositeMonitor, InstrumentedClient, MonitorConfig, NoopMonitor, QueryContext, QueryMonitor,
    QueryResult, QueryStats, QueryType, StatsMonitor, TracingMonitor,
};
pub use row::{FromRow, RowExt};

pub use qb::{
    BuiltQuery, BulkInsertQb, DeleteMode, DeleteQb, Expr, ExprGroup, InsertQb, MutationQb, Page,
    Param, ParamList, SelectQb, SqlQb, UpdateQb, bulk_insert, delete, insert, select, update,
};

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_manager_config, create_pool_with_tls};

#[cfg(feature = "pool")]
pub use deadpool_postgres;
pub use tokio_postgres;
