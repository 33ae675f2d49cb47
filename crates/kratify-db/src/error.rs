//! Error types for kratify-db

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Result type alias for kratify-db operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for database operations
///
/// Database failures are carried as-is in [`DbError::Query`]; classifying them
/// (duplicate key, transient, ...) is left to the caller.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// SQLSTATE reported by the server, if this error came from the database.
    pub fn sql_state(&self) -> Option<&SqlState> {
        match self {
            Self::Query(err) => err.code(),
            _ => None,
        }
    }

    /// Name of the violated constraint, if the server reported one.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::Query(err) => err.as_db_error().and_then(|db| db.constraint()),
            _ => None,
        }
    }

    /// Check if the database rejected the statement with a unique violation (23505)
    pub fn is_unique_violation(&self) -> bool {
        self.sql_state() == Some(&SqlState::UNIQUE_VIOLATION)
    }

    /// Check if the database rejected the statement with a foreign key violation (23503)
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sql_state() == Some(&SqlState::FOREIGN_KEY_VIOLATION)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for DbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_have_no_sql_state() {
        let err = DbError::not_found("user u1");
        assert!(err.is_not_found());
        assert!(err.sql_state().is_none());
        assert!(!err.is_unique_violation());
        assert_eq!(err.to_string(), "Not found: user u1");
    }

    #[test]
    fn decode_error_names_the_column() {
        let err = DbError::decode("id", "unexpected type int2");
        assert_eq!(
            err.to_string(),
            "Decode error on column 'id': unexpected type int2"
        );
    }
}
