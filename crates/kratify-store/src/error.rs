//! Repository errors.

use kratify_db::DbError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No live (non soft-deleted) row matched.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("email is already registered")]
    DuplicateEmail,

    #[error(transparent)]
    Db(#[from] DbError),
}

impl StoreError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Translate a driver error, turning the "no rows" case into
    /// [`StoreError::NotFound`] for `entity`.
    pub(crate) fn from_db(entity: &'static str, err: DbError) -> Self {
        if err.is_not_found() {
            Self::not_found(entity)
        } else {
            Self::Db(err)
        }
    }
}
