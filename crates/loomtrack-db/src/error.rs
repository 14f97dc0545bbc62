//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          Domain rule (CoreError)           │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ◄──────────── DbError::Domain                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError::kind() → ErrorKind ← HTTP layer picks the status code        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use loomtrack_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Message of the loom exclusivity conflict.
pub const LOOM_BUSY_MESSAGE: &str = "Another RUNNING beam exists on this loom";

/// Database operation errors.
///
/// These errors wrap sqlx errors and domain errors raised inside a
/// transaction, so repository methods return a single error type.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate beam or inward number
    /// - Any UNIQUE index violation not mapped to a domain conflict
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    ///
    /// ## When This Occurs
    /// - Busy timeout elapsed while waiting for a beam lock
    /// - Commit failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Returns the coarse kind of this error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::Domain(err) => err.kind(),
            _ => ErrorKind::Storage,
        }
    }
}

impl From<loomtrack_core::ValidationError> for DbError {
    fn from(err: loomtrack_core::ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
///   running-loom index        → Domain(Conflict "Another RUNNING beam ...")
///   pending-adjustment index  → Domain(Conflict)
///   "database is locked"      → DbError::TransactionFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    match field.as_str() {
                        "beam_issues.loom_id" => {
                            DbError::Domain(CoreError::Conflict(LOOM_BUSY_MESSAGE.to_string()))
                        }
                        "beam_adjustments.receive_id" => DbError::Domain(CoreError::Conflict(
                            "Receive batch already has a pending adjustment".to_string(),
                        )),
                        _ => DbError::UniqueViolation {
                            field,
                            value: "unknown".to_string(),
                        },
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::TransactionFailed(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(DbError::from(sqlx::Error::RowNotFound).kind(), ErrorKind::NotFound);
        assert_eq!(DbError::PoolExhausted.kind(), ErrorKind::Storage);
        assert_eq!(
            DbError::from(CoreError::Conflict(LOOM_BUSY_MESSAGE.into())).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            DbError::from(loomtrack_core::ValidationError::MarksNotIncreasing).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_domain_message_is_transparent() {
        let err = DbError::from(CoreError::Conflict(LOOM_BUSY_MESSAGE.into()));
        assert_eq!(err.to_string(), LOOM_BUSY_MESSAGE);
    }
}
