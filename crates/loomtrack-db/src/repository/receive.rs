//! # Receive Repository
//!
//! Draft receive batches and the pieces reported on them.
//!
//! ## Piece Entry
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_draft(beam, design, issue?) ──► DRAFT  GR-251016093012345-a3f9 │
//! │       │                                 ltol_snapshot = issue ltol     │
//! │       │                                                 else beam ltol │
//! │       ▼                                                                 │
//! │  add_piece(batch, NewPiece)                                            │
//! │       │                                                                 │
//! │       ├── damaged ≤ meter, marks in [0, meter] strictly increasing     │
//! │       ├── net = meter − damaged                                        │
//! │       ├── avg_interval = mean gap between marks                        │
//! │       ├── delta_ltol = avg_interval − ltol_snapshot                    │
//! │       ▼                                                                 │
//! │  piece_rows + piece_marks written in one transaction                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use loomtrack_core::piece::evaluate_piece;
use loomtrack_core::reconcile::ReceiveTotals;
use loomtrack_core::validation::validate_new_receive;
use loomtrack_core::{
    BeamStatus, CoreError, Measure, NewPiece, NewReceive, PieceRow, ReceiveBatch, ReceiveStatus,
    ReceiveWithPieces, Roll, SEQ_MAIN_PIECE,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::inward::fetch_beam;
use crate::repository::issue::fetch_issue;
use crate::repository::rows::{
    MarkRow, PieceRowRow, ReceiveRow, RollRow, PIECE_COLUMNS, RECEIVE_COLUMNS, ROLL_COLUMNS,
};
use crate::repository::sequence::{next_in, GLOBAL_SCOPE};

/// Repository for receive batches and pieces.
///
/// ## Usage
/// ```rust,ignore
/// let batch = db.receives().create_draft(new_receive, Some("clerk")).await?;
/// let main = db.receives().next_piece_number().await?;
/// db.receives().add_piece(&batch.id, NewPiece { main_piece_no: main, .. }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ReceiveRepository {
    pool: SqlitePool,
}

impl ReceiveRepository {
    /// Creates a new ReceiveRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReceiveRepository { pool }
    }

    /// Opens a DRAFT receive batch against a beam.
    ///
    /// ## Rules
    /// - Beam must exist and not be CANCELLED
    /// - A referenced issue must exist and belong to the beam
    ///
    /// The loom defaults to the issue's loom when not given.
    pub async fn create_draft(
        &self,
        receive: NewReceive,
        actor: Option<&str>,
    ) -> DbResult<ReceiveBatch> {
        validate_new_receive(&receive)?;

        debug!(beam_id = %receive.beam_id, issue_id = ?receive.issue_id, "Creating receive draft");

        let mut conn = self.pool.acquire().await?;

        let beam = fetch_beam(&mut *conn, &receive.beam_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Beam", &receive.beam_id))?;

        if beam.status == BeamStatus::Cancelled {
            return Err(CoreError::InvalidTransition {
                entity: "Beam",
                from: beam.status.label().to_string(),
                action: "receive",
            }
            .into());
        }

        let issue = match receive.issue_id.as_deref() {
            Some(issue_id) => {
                let issue = fetch_issue(&mut *conn, issue_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Issue", issue_id))?;
                if issue.beam_id != beam.id {
                    return Err(CoreError::Conflict(format!(
                        "Issue {} does not belong to beam {}",
                        issue_id, beam.beam_number
                    ))
                    .into());
                }
                Some(issue)
            }
            None => None,
        };

        let ltol_snapshot = issue
            .as_ref()
            .and_then(|i| i.sizing_ltol_snapshot)
            .or(beam.ltol_meter);
        let loom_id = receive
            .loom_id
            .clone()
            .or_else(|| issue.as_ref().and_then(|i| i.loom_id.clone()));

        let now = Utc::now();
        let row = sqlx::query_as::<_, ReceiveRow>(&format!(
            r#"
            INSERT INTO receive_batches (
                id, receive_number, receive_date, beam_id, issue_id, design_id,
                loom_id, ltol_snapshot, status, note, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'draft', ?9, ?10, ?3, ?3)
            RETURNING {RECEIVE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(generate_receive_number())
        .bind(now)
        .bind(&beam.id)
        .bind(&receive.issue_id)
        .bind(&receive.design_id)
        .bind(&loom_id)
        .bind(ltol_snapshot)
        .bind(&receive.note)
        .bind(actor)
        .fetch_one(&mut *conn)
        .await?;

        let batch = ReceiveBatch::from(row);
        info!(
            receive_id = %batch.id,
            receive_number = %batch.receive_number,
            beam_number = %beam.beam_number,
            "Receive draft created"
        );
        Ok(batch)
    }

    /// Adds a piece to a DRAFT batch.
    ///
    /// The piece and its marks are written together or not at all.
    pub async fn add_piece(&self, receive_id: &str, piece: NewPiece) -> DbResult<PieceRow> {
        debug!(
            receive_id = %receive_id,
            main_piece_no = piece.main_piece_no,
            meter = %piece.meter,
            "Adding piece"
        );

        let mut tx = self.pool.begin().await?;

        let batch = lock_receive(&mut *tx, receive_id).await?;
        if batch.status != ReceiveStatus::Draft {
            return Err(CoreError::InvalidTransition {
                entity: "Receive batch",
                from: batch.status.label().to_string(),
                action: "add piece",
            }
            .into());
        }

        let metrics = evaluate_piece(&piece, batch.ltol_snapshot)?;
        let piece_id = Uuid::new_v4().to_string();
        let suffix = piece
            .part_suffix
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let row = sqlx::query_as::<_, PieceRowRow>(&format!(
            r#"
            INSERT INTO piece_rows (
                id, receive_id, main_piece_no, part_suffix, piece_label,
                meter, weight, damaged_meter, damaged_weight, net_meter, net_weight,
                reed, pick, width, avg_interval, delta_ltol, remarks, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18)
            RETURNING {PIECE_COLUMNS}
            "#
        ))
        .bind(&piece_id)
        .bind(receive_id)
        .bind(piece.main_piece_no)
        .bind(suffix)
        .bind(&metrics.piece_label)
        .bind(piece.meter)
        .bind(piece.weight)
        .bind(piece.damaged_meter)
        .bind(piece.damaged_weight)
        .bind(metrics.net_meter)
        .bind(metrics.net_weight)
        .bind(piece.reed)
        .bind(piece.pick)
        .bind(piece.width)
        .bind(metrics.avg_interval)
        .bind(metrics.delta_ltol)
        .bind(&piece.remarks)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for (index, position) in piece.marks.iter().enumerate() {
            sqlx::query(
                "INSERT INTO piece_marks (id, piece_id, mark_index, position) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&piece_id)
            .bind(index as i64)
            .bind(*position)
            .execute(&mut *tx)
            .await?;
        }

        // Touch the batch so readers see when it last changed.
        sqlx::query("UPDATE receive_batches SET updated_at = ?2 WHERE id = ?1")
            .bind(receive_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(piece_id = %piece_id, label = %metrics.piece_label, "Piece added");
        Ok(row.into_piece(piece.marks))
    }

    /// Allocates the next main piece number (global counter).
    pub async fn next_piece_number(&self) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        next_in(&mut *conn, SEQ_MAIN_PIECE, GLOBAL_SCOPE).await
    }

    /// Gets a batch with its pieces and their marks.
    pub async fn get(&self, receive_id: &str) -> DbResult<Option<ReceiveWithPieces>> {
        let mut conn = self.pool.acquire().await?;

        let Some(batch) = fetch_receive(&mut *conn, receive_id).await? else {
            return Ok(None);
        };
        let pieces = load_pieces(&mut *conn, receive_id).await?;

        Ok(Some(ReceiveWithPieces { batch, pieces }))
    }

    /// Sums over the batch's pieces.
    pub async fn totals(&self, receive_id: &str) -> DbResult<ReceiveTotals> {
        let mut conn = self.pool.acquire().await?;
        let pieces = load_pieces(&mut *conn, receive_id).await?;
        Ok(ReceiveTotals::from_pieces(&pieces))
    }

    /// Rolls created when the batch was confirmed.
    pub async fn rolls_for(&self, receive_id: &str) -> DbResult<Vec<Roll>> {
        let rows = sqlx::query_as::<_, RollRow>(&format!(
            r#"
            SELECT {ROLL_COLUMNS} FROM rolls
            WHERE receive_id = ?1
            ORDER BY
                (SELECT main_piece_no FROM piece_rows WHERE piece_rows.id = rolls.piece_id),
                (SELECT piece_label FROM piece_rows WHERE piece_rows.id = rolls.piece_id)
            "#
        ))
        .bind(receive_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Roll::from).collect())
    }

    /// Batches received against a beam, newest first.
    pub async fn list_for_beam(&self, beam_id: &str) -> DbResult<Vec<ReceiveBatch>> {
        let rows = sqlx::query_as::<_, ReceiveRow>(&format!(
            "SELECT {RECEIVE_COLUMNS} FROM receive_batches WHERE beam_id = ?1 \
             ORDER BY created_at DESC"
        ))
        .bind(beam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ReceiveBatch::from).collect())
    }
}

// =============================================================================
// Shared Receive Access
// =============================================================================

/// `GR-{yyMMddHHmmssSSS}-{4 hex}`
fn generate_receive_number() -> String {
    let stamp = Utc::now().format("%y%m%d%H%M%S%3f");
    let salt = Uuid::new_v4().simple().to_string();
    format!("GR-{}-{}", stamp, &salt[..4])
}

pub(crate) async fn fetch_receive(
    conn: &mut SqliteConnection,
    receive_id: &str,
) -> DbResult<Option<ReceiveBatch>> {
    let row = sqlx::query_as::<_, ReceiveRow>(&format!(
        "SELECT {RECEIVE_COLUMNS} FROM receive_batches WHERE id = ?1"
    ))
    .bind(receive_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(ReceiveBatch::from))
}

/// No-op write on the batch row; takes the write lock and re-reads it.
pub(crate) async fn lock_receive(
    conn: &mut SqliteConnection,
    receive_id: &str,
) -> DbResult<ReceiveBatch> {
    let row = sqlx::query_as::<_, ReceiveRow>(&format!(
        "UPDATE receive_batches SET status = status WHERE id = ?1 RETURNING {RECEIVE_COLUMNS}"
    ))
    .bind(receive_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::not_found("Receive batch", receive_id))?;

    Ok(row.into())
}

/// Writes a batch's status.
pub(crate) async fn store_receive_status(
    conn: &mut SqliteConnection,
    receive_id: &str,
    status: ReceiveStatus,
) -> DbResult<ReceiveBatch> {
    let row = sqlx::query_as::<_, ReceiveRow>(&format!(
        "UPDATE receive_batches SET status = ?2, updated_at = ?3 WHERE id = ?1 \
         RETURNING {RECEIVE_COLUMNS}"
    ))
    .bind(receive_id)
    .bind(status)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Pieces of a batch in label order, with their marks.
pub(crate) async fn load_pieces(
    conn: &mut SqliteConnection,
    receive_id: &str,
) -> DbResult<Vec<PieceRow>> {
    let rows = sqlx::query_as::<_, PieceRowRow>(&format!(
        "SELECT {PIECE_COLUMNS} FROM piece_rows WHERE receive_id = ?1 \
         ORDER BY main_piece_no, piece_label"
    ))
    .bind(receive_id)
    .fetch_all(&mut *conn)
    .await?;

    let marks = sqlx::query_as::<_, MarkRow>(
        r#"
        SELECT m.piece_id, m.position
        FROM piece_marks m
        JOIN piece_rows p ON p.id = m.piece_id
        WHERE p.receive_id = ?1
        ORDER BY m.piece_id, m.mark_index
        "#,
    )
    .bind(receive_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_piece: HashMap<String, Vec<Measure>> = HashMap::new();
    for mark in marks {
        by_piece.entry(mark.piece_id).or_default().push(mark.position);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let marks = by_piece.remove(&row.id).unwrap_or_default();
            row.into_piece(marks)
        })
        .collect())
}

// =============================================================================
// Unit Tests
// =============================================================================
