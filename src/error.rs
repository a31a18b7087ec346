use thiserror::Error;

use crate::models::{MAX_HEADCOUNT, MIN_HEADCOUNT};
use crate::overlap::Conflict;

/// Failures raised by store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("store query failed: {0}")]
    Query(String),
    #[error("duplicate record: {0}")]
    Duplicate(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Connection(err.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => StoreError::Connection(err.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Rejections of the reserve and cancel operations.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error(
        "visitors must be between {min} and {max}, got {0}",
        min = MIN_HEADCOUNT,
        max = MAX_HEADCOUNT
    )]
    InvalidHeadcount(i32),
    #[error("slot {0} not found")]
    SlotNotFound(String),
    #[error("not enough place on this slot ({occupied}/{max} taken, {requested} more requested)")]
    CapacityExceeded {
        occupied: i32,
        max: i32,
        requested: i32,
    },
    #[error("{0}")]
    OverlapConflict(Conflict),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rejections of the place, slot and visitor glue operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("user is not the creator")]
    Unauthorized,
    #[error(transparent)]
    Store(#[from] StoreError),
}
