//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] and [`fred`] errors. Conversions into the engine's
//! [`StoreError`] and [`CacheError`] classify failures so the engine can
//! tell a timeout from a constraint violation.
//!
//! [`StoreError`]: idlemint_engine::store::StoreError
//! [`CacheError`]: idlemint_engine::cache::CacheError

use idlemint_engine::cache::CacheError;
use idlemint_engine::store::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A Redis operation failed.
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Classify a sqlx failure for the engine's retry logic.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(db.to_string())
        }
        sqlx::Error::PoolTimedOut => StoreError::Timeout(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

impl From<DbError> for CacheError {
    fn from(err: DbError) -> Self {
        Self::Backend(err.to_string())
    }
}
