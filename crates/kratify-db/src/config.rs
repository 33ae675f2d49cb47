//! Database connection settings.
//!
//! Settings come from a TOML document with a `[database]` table or from
//! `DB_*` environment variables (a `.env` file is honored). A full
//! `DATABASE_URL` / `url` takes precedence over the individual fields.
//!
//! ```toml
//! [database]
//! host = "localhost"
//! port = 5432
//! user = "kratify"
//! password = "secret"
//! name = "kratify"
//! ssl_mode = "disable"
//! time_zone = "UTC"
//!
//! [database.pool]
//! max_size = 100
//! wait_timeout_secs = 30
//! create_timeout_secs = 10
//! ```

use crate::error::{DbError, DbResult};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio_postgres::config::SslMode;

/// Connection and pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection string; when set, the discrete fields are ignored.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    /// `disable`, `prefer` or `require`.
    pub ssl_mode: String,
    /// Session time zone, applied with `-c TimeZone=...`.
    pub time_zone: String,
    pub pool: PoolSettings,
}

/// Pool sizing and timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_size: usize,
    /// How long a caller waits for a free connection.
    pub wait_timeout_secs: u64,
    /// How long opening a new connection may take.
    pub create_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 100,
            wait_timeout_secs: 30,
            create_timeout_secs: 10,
        }
    }
}

impl PoolSettings {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "postgres".to_string(),
            ssl_mode: "disable".to_string(),
            time_zone: "UTC".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    database: DatabaseConfig,
}

impl DatabaseConfig {
    /// Parse a TOML document containing a `[database]` table.
    pub fn from_toml_str(raw: &str) -> DbResult<Self> {
        let file: ConfigFile = toml::from_str(raw)
            .map_err(|e| DbError::config(format!("failed to parse database config: {e}")))?;
        file.database.validated()
    }

    /// Read and parse a TOML file containing a `[database]` table.
    pub fn load_toml(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DbError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Load from the process environment after reading `.env`, if present.
    ///
    /// Recognized: `DATABASE_URL`, `DB_HOST`, `DB_PORT`, `DB_USER`,
    /// `DB_PASSWORD`, `DB_NAME`, `DB_SSL_MODE`, `DB_TIMEZONE`,
    /// `DB_POOL_MAX_SIZE`, `DB_POOL_WAIT_TIMEOUT`, `DB_POOL_CREATE_TIMEOUT`.
    pub fn from_env() -> DbResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(DbError::config(format!("failed to read .env: {e}")));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        cfg.url = get("DATABASE_URL");
        if let Some(v) = get("DB_HOST") {
            cfg.host = v;
        }
        if let Some(v) = get("DB_PORT") {
            cfg.port = parse_num("DB_PORT", &v)?;
        }
        if let Some(v) = get("DB_USER") {
            cfg.user = v;
        }
        if let Some(v) = get("DB_PASSWORD") {
            cfg.password = v;
        }
        if let Some(v) = get("DB_NAME") {
            cfg.name = v;
        }
        if let Some(v) = get("DB_SSL_MODE") {
            cfg.ssl_mode = v;
        }
        if let Some(v) = get("DB_TIMEZONE") {
            cfg.time_zone = v;
        }
        if let Some(v) = get("DB_POOL_MAX_SIZE") {
            cfg.pool.max_size = parse_num("DB_POOL_MAX_SIZE", &v)?;
        }
        if let Some(v) = get("DB_POOL_WAIT_TIMEOUT") {
            cfg.pool.wait_timeout_secs = parse_num("DB_POOL_WAIT_TIMEOUT", &v)?;
        }
        if let Some(v) = get("DB_POOL_CREATE_TIMEOUT") {
            cfg.pool.create_timeout_secs = parse_num("DB_POOL_CREATE_TIMEOUT", &v)?;
        }

        cfg.validated()
    }

    fn validated(self) -> DbResult<Self> {
        self.ssl_mode()?;
        if self.pool.max_size == 0 {
            return Err(DbError::config("pool.max_size must be at least 1"));
        }
        Ok(self)
    }

    /// The configured SSL mode.
    pub fn ssl_mode(&self) -> DbResult<SslMode> {
        match self.ssl_mode.to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            other => Err(DbError::config(format!("unsupported ssl_mode '{other}'"))),
        }
    }

    /// Driver-level configuration for opening connections.
    pub fn pg_config(&self) -> DbResult<tokio_postgres::Config> {
        let mut pg = match &self.url {
            Some(url) => tokio_postgres::Config::from_str(url)
                .map_err(|e| DbError::Connection(e.to_string()))?,
            None => {
                let mut pg = tokio_postgres::Config::new();
                pg.host(&self.host)
                    .port(self.port)
                    .user(&self.user)
                    .dbname(&self.name)
                    .ssl_mode(self.ssl_mode()?);
                if !self.password.is_empty() {
                    pg.password(&self.password);
                }
                pg
            }
        };

        if !self.time_zone.is_empty() {
            pg.options(format!("-c TimeZone={}", self.time_zone));
        }
        pg.connect_timeout(self.pool.create_timeout());
        Ok(pg)
    }
}

fn parse_num<T: FromStr>(key: &str, value: &str) -> DbResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| DbError::config(format!("{key}: invalid value '{value}': {e}")))
}
