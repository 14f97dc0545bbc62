//! # Sequence Repository
//!
//! Persisted running numbers for business codes.
//!
//! ## How Numbers Are Allocated
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Atomic Upsert-Increment                              │
//! │                                                                         │
//! │  next("beam", FY 25-26)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO sequence_counters ... VALUES ('beam', '25-26', 1)         │
//! │  ON CONFLICT DO UPDATE SET value = value + 1                           │
//! │  RETURNING value                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  7  → FiscalYear::format_code("B", 7) → "B-25-0007"                    │
//! │                                                                         │
//! │  One statement: SQLite's write lock serializes concurrent callers,     │
//! │  so N callers always see exactly 1..N. Nothing is cached in process.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use loomtrack_core::FiscalYear;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Scope of counters that never reset.
pub const GLOBAL_SCOPE: &str = "global";

/// Repository for sequence counters.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Next value of `purpose` within a fiscal year.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let n = db.sequences().next("beam", &FiscalYear::current()).await?;
    /// ```
    pub async fn next(&self, purpose: &str, fiscal_year: &FiscalYear) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        next_in(&mut *conn, purpose, &fiscal_year.code()).await
    }

    /// Next value of a counter that spans all fiscal years.
    pub async fn next_global(&self, purpose: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        next_in(&mut *conn, purpose, GLOBAL_SCOPE).await
    }

    /// Current value without incrementing; `None` if never allocated.
    pub async fn peek(&self, purpose: &str, scope: &str) -> DbResult<Option<i64>> {
        let value = sqlx::query_scalar::<_, i64>(
            "SELECT value FROM sequence_counters WHERE purpose = ?1 AND fiscal_year = ?2",
        )
        .bind(purpose)
        .bind(scope)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }
}

/// Increments `(purpose, scope)` on the given connection and returns the new
/// value.
///
/// Runs inside the caller's transaction when given `&mut *tx`, so codes
/// allocated by a rolled-back transaction are released with it.
pub(crate) async fn next_in(
    conn: &mut SqliteConnection,
    purpose: &str,
    scope: &str,
) -> DbResult<i64> {
    let value = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO sequence_counters (purpose, fiscal_year, value, updated_at)
        VALUES (?1, ?2, 1, ?3)
        ON CONFLICT(purpose, fiscal_year)
        DO UPDATE SET value = value + 1, updated_at = excluded.updated_at
        RETURNING value
        "#,
    )
    .bind(purpose)
    .bind(scope)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    debug!(purpose = %purpose, scope = %scope, value, "Allocated sequence value");
    Ok(value)
}

// =============================================================================
// Unit Tests
// =============================================================================
