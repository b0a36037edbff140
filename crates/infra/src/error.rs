//! Persistence errors.

use thiserror::Error;

use salesdesk_core::DomainError;
use salesdesk_sales::StockError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error.
///
/// Domain and stock failures detected while a write is in progress are
/// passed through unchanged so callers can report them precisely.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// Map driver errors, turning constraint violations into conflicts.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned());
            match code.as_deref() {
                // unique violation
                Some("23505") => {
                    StoreError::Conflict(format!("{operation}: {}", db_err.message()))
                }
                // foreign key violation
                Some("23503") => StoreError::Conflict(format!(
                    "{operation}: record is still referenced ({})",
                    db_err.message()
                )),
                _ => StoreError::Database(sqlx::Error::Database(db_err)),
            }
        }
        other => StoreError::Database(other),
    }
}
