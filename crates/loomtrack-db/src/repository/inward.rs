//! # Inward Repository
//!
//! Beam inventory ledger: inward batches and the beams they create.
//!
//! ## Creating an Inward Batch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create_inward (one transaction)                      │
//! │                                                                         │
//! │  NewInward { details: [d1, d2, ...] }                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  next("inward", FY) ──► BI-25-0003  ──► INSERT inward_batches (open)   │
//! │       │                                                                 │
//! │       ▼  for each detail                                                │
//! │  find-or-create beam_sets(set_number)                                  │
//! │  next("beam", FY)   ──► B-25-0041   ──► INSERT beams                   │
//! │                                         remaining = total = sizing     │
//! │                                         status in_stock                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT  (any failure rolls back header, beams and counters)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Beam Lock
//! [`lock_beam`] is the single way a transaction claims a beam. It is a
//! no-op `UPDATE ... RETURNING`, which takes SQLite's write lock and hands
//! back the row as it is under that lock.

use chrono::Utc;
use loomtrack_core::lifecycle::InwardEvent;
use loomtrack_core::validation::validate_new_inward;
use loomtrack_core::{
    fiscal::{BEAM_PREFIX, INWARD_PREFIX},
    Beam, BeamStatus, CoreError, FiscalYear, InwardBatch, InwardWithBeams, NewInward, SEQ_BEAM,
    SEQ_INWARD,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::rows::{BeamRow, InwardRow, BEAM_COLUMNS, INWARD_COLUMNS};
use crate::repository::sequence::next_in;

/// Message of the cancel-inward conflict.
pub const BEAMS_IN_USE_MESSAGE: &str = "Cannot cancel inward: some beams already used/issued";

/// Repository for inward batches and beams.
///
/// ## Usage
/// ```rust,ignore
/// let created = db.inwards().create_inward(new_inward, Some("clerk")).await?;
/// let beam = db.inwards().get_beam_by_number("B-25-0041").await?;
/// ```
#[derive(Debug, Clone)]
pub struct InwardRepository {
    pool: SqlitePool,
}

impl InwardRepository {
    /// Creates a new InwardRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InwardRepository { pool }
    }

    /// Records a batch of sized beams.
    ///
    /// The inward date defaults to today. Inward and beam codes come from the
    /// fiscal year of the day the batch is recorded, whatever its inward date.
    pub async fn create_inward(
        &self,
        inward: NewInward,
        actor: Option<&str>,
    ) -> DbResult<InwardWithBeams> {
        validate_new_inward(&inward)?;

        let now = Utc::now();
        let inward_date = inward.inward_date.unwrap_or_else(|| now.date_naive());
        let fiscal_year = FiscalYear::for_date(now.date_naive());
        let fy_code = fiscal_year.code();

        debug!(
            fiscal_year = %fy_code,
            details = inward.details.len(),
            "Creating inward batch"
        );

        let mut tx = self.pool.begin().await?;

        let inward_seq = next_in(&mut *tx, SEQ_INWARD, &fy_code).await?;
        let inward_id = Uuid::new_v4().to_string();
        let inward_number = fiscal_year.format_code(INWARD_PREFIX, inward_seq);

        let header = sqlx::query_as::<_, InwardRow>(&format!(
            r#"
            INSERT INTO inward_batches (
                id, inward_number, fiscal_year, inward_date, production_type,
                sizing_party_id, job_party_id, status, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'open', ?8, ?9, ?9)
            RETURNING {INWARD_COLUMNS}
            "#
        ))
        .bind(&inward_id)
        .bind(&inward_number)
        .bind(&fy_code)
        .bind(inward_date)
        .bind(inward.production_type)
        .bind(&inward.sizing_party_id)
        .bind(&inward.job_party_id)
        .bind(actor)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut beams = Vec::with_capacity(inward.details.len());
        for detail in &inward.details {
            let set_id = find_or_create_set(&mut *tx, detail.set_number.trim()).await?;
            let beam_seq = next_in(&mut *tx, SEQ_BEAM, &fy_code).await?;

            let beam = sqlx::query_as::<_, BeamRow>(&format!(
                r#"
                INSERT INTO beams (
                    id, inward_id, beam_number, beam_name_id, set_id, sizing_meter,
                    ltol_meter, total_meter, remaining_meter, status, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?6, ?6, 'in_stock', ?8, ?8)
                RETURNING {BEAM_COLUMNS}
                "#
            ))
            .bind(Uuid::new_v4().to_string())
            .bind(&inward_id)
            .bind(fiscal_year.format_code(BEAM_PREFIX, beam_seq))
            .bind(&detail.beam_name_id)
            .bind(&set_id)
            .bind(detail.sizing_meter)
            .bind(detail.ltol_meter)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

            beams.push(Beam::from(beam));
        }

        tx.commit().await?;

        info!(
            inward_id = %inward_id,
            inward_number = %inward_number,
            beams = beams.len(),
            "Inward batch created"
        );

        Ok(InwardWithBeams {
            inward: header.into(),
            beams,
        })
    }

    /// Cancels an inward batch and every beam it created.
    ///
    /// ## Rules
    /// - Already CANCELLED → InvalidState
    /// - Any beam not IN_STOCK → Conflict
    ///
    /// Beam and inward codes stay allocated.
    pub async fn cancel_inward(&self, inward_id: &str) -> DbResult<InwardWithBeams> {
        debug!(inward_id = %inward_id, "Cancelling inward batch");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // No-op write first so the transaction holds the write lock.
        let header: InwardBatch = sqlx::query_as::<_, InwardRow>(&format!(
            "UPDATE inward_batches SET status = status WHERE id = ?1 RETURNING {INWARD_COLUMNS}"
        ))
        .bind(inward_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::not_found("Inward", inward_id))?
        .into();

        let next_status = header.status.apply(InwardEvent::Cancel)?;

        let in_use: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM beams WHERE inward_id = ?1 AND status != 'in_stock'",
        )
        .bind(inward_id)
        .fetch_one(&mut *tx)
        .await?;

        if in_use > 0 {
            warn!(inward_id = %inward_id, in_use, "Inward has beams in use");
            return Err(CoreError::Conflict(BEAMS_IN_USE_MESSAGE.to_string()).into());
        }

        let header = sqlx::query_as::<_, InwardRow>(&format!(
            "UPDATE inward_batches SET status = ?2, updated_at = ?3 WHERE id = ?1 \
             RETURNING {INWARD_COLUMNS}"
        ))
        .bind(inward_id)
        .bind(next_status)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let beams = sqlx::query_as::<_, BeamRow>(&format!(
            "UPDATE beams SET status = ?2, updated_at = ?3 WHERE inward_id = ?1 \
             RETURNING {BEAM_COLUMNS}"
        ))
        .bind(inward_id)
        .bind(BeamStatus::Cancelled)
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(inward_id = %inward_id, beams = beams.len(), "Inward batch cancelled");

        let mut beams: Vec<Beam> = beams.into_iter().map(Beam::from).collect();
        beams.sort_by(|a, b| a.beam_number.cmp(&b.beam_number));

        Ok(InwardWithBeams {
            inward: header.into(),
            beams,
        })
    }

    /// Gets an inward batch with its beams in code order.
    pub async fn get_inward(&self, inward_id: &str) -> DbResult<Option<InwardWithBeams>> {
        let header = sqlx::query_as::<_, InwardRow>(&format!(
            "SELECT {INWARD_COLUMNS} FROM inward_batches WHERE id = ?1"
        ))
        .bind(inward_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let beams = sqlx::query_as::<_, BeamRow>(&format!(
            "SELECT {BEAM_COLUMNS} FROM beams WHERE inward_id = ?1 ORDER BY beam_number"
        ))
        .bind(inward_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(InwardWithBeams {
            inward: header.into(),
            beams: beams.into_iter().map(Beam::from).collect(),
        }))
    }

    /// Gets a beam by ID.
    pub async fn get_beam(&self, beam_id: &str) -> DbResult<Option<Beam>> {
        let mut conn = self.pool.acquire().await?;
        fetch_beam(&mut *conn, beam_id).await
    }

    /// Gets a beam by its code, e.g. `B-25-0041`.
    pub async fn get_beam_by_number(&self, beam_number: &str) -> DbResult<Option<Beam>> {
        let row = sqlx::query_as::<_, BeamRow>(&format!(
            "SELECT {BEAM_COLUMNS} FROM beams WHERE beam_number = ?1"
        ))
        .bind(beam_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Beam::from))
    }

    /// Beams currently in stock, oldest first.
    pub async fn list_in_stock(&self, limit: u32) -> DbResult<Vec<Beam>> {
        let rows = sqlx::query_as::<_, BeamRow>(&format!(
            "SELECT {BEAM_COLUMNS} FROM beams WHERE status = 'in_stock' \
             ORDER BY created_at, beam_number LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Beam::from).collect())
    }
}

// =============================================================================
// Shared Beam Access
// =============================================================================

async fn find_or_create_set(conn: &mut SqliteConnection, set_number: &str) -> DbResult<String> {
    sqlx::query(
        "INSERT INTO beam_sets (id, set_number, created_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(set_number) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(set_number)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    let id = sqlx::query_scalar::<_, String>("SELECT id FROM beam_sets WHERE set_number = ?1")
        .bind(set_number)
        .fetch_one(&mut *conn)
        .await?;

    Ok(id)
}

/// Reads a beam without locking it.
pub(crate) async fn fetch_beam(conn: &mut SqliteConnection, beam_id: &str) -> DbResult<Option<Beam>> {
    let row = sqlx::query_as::<_, BeamRow>(&format!(
        "SELECT {BEAM_COLUMNS} FROM beams WHERE id = ?1"
    ))
    .bind(beam_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Beam::from))
}

/// Claims the beam for the rest of the transaction and returns its current
/// row. Must be the first statement of the transaction.
pub(crate) async fn lock_beam(conn: &mut SqliteConnection, beam_id: &str) -> DbResult<Beam> {
    let row = sqlx::query_as::<_, BeamRow>(&format!(
        "UPDATE beams SET status = status WHERE id = ?1 RETURNING {BEAM_COLUMNS}"
    ))
    .bind(beam_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::not_found("Beam", beam_id))?;

    Ok(row.into())
}

/// Writes a beam's status and lengths.
pub(crate) async fn store_beam(conn: &mut SqliteConnection, beam: &Beam) -> DbResult<Beam> {
    let row = sqlx::query_as::<_, BeamRow>(&format!(
        r#"
        UPDATE beams SET
            status = ?2,
            total_meter = ?3,
            remaining_meter = ?4,
            updated_at = ?5
        WHERE id = ?1
        RETURNING {BEAM_COLUMNS}
        "#
    ))
    .bind(&beam.id)
    .bind(beam.status)
    .bind(beam.total_meter)
    .bind(beam.remaining_meter)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

// =============================================================================
// Unit Tests
// =============================================================================
