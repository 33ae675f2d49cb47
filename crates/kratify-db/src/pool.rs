//! Connection pool construction.

use crate::config::DatabaseConfig;
use crate::error::{DbError, DbResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, PoolBuilder, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

/// Create a pool from [`DatabaseConfig`] without TLS.
///
/// Size and timeouts come from `config.pool`. Use [`create_pool_with_tls`]
/// when `ssl_mode` is `require`.
///
/// ```ignore
/// let cfg = kratify_db::DatabaseConfig::from_env()?;
/// let pool = kratify_db::create_pool(&cfg)?;
/// let client = pool.get().await?;
/// ```
pub fn create_pool(config: &DatabaseConfig) -> DbResult<Pool> {
    create_pool_with_tls(config, NoTls)
}

/// Create a pool from [`DatabaseConfig`] using a custom TLS connector.
pub fn create_pool_with_tls<T>(config: &DatabaseConfig, tls: T) -> DbResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let pool = &config.pool;
    create_pool_with_manager_config(config, tls, default_manager_config(), |builder| {
        builder
            .max_size(pool.max_size)
            .wait_timeout(Some(pool.wait_timeout()))
            .create_timeout(Some(pool.create_timeout()))
    })
}

/// Create a pool with an explicit `ManagerConfig` and extra `PoolBuilder` tuning.
///
/// The Tokio runtime is always attached so builder timeouts take effect.
pub fn create_pool_with_manager_config<T>(
    config: &DatabaseConfig,
    tls: T,
    manager_config: ManagerConfig,
    configure_pool: impl FnOnce(PoolBuilder) -> PoolBuilder,
) -> DbResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let pg_config = config.pg_config()?;
    let mgr = Manager::from_config(pg_config, tls, manager_config);

    let pool = configure_pool(Pool::builder(mgr).runtime(Runtime::Tokio1))
        .build()
        .map_err(|e| DbError::Pool(e.to_string()))?;

    tracing::debug!(
        target: "kratify_db::pool",
        max_size = config.pool.max_size,
        host = %config.host,
        database = %config.name,
        "connection pool created"
    );
    Ok(pool)
}

fn default_manager_config() -> ManagerConfig {
    ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    }
}
