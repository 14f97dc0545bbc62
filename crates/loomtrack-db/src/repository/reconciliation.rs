//! # Reconciliation Repository
//!
//! Confirms receive batches against their beam and resolves overproduction.
//!
//! ## Confirmation Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    confirm(batch)                                       │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    lock_beam(batch.beam_id)     ← waits here while another confirm     │
//! │       │                           or approval holds the beam           │
//! │       ▼                                                                 │
//! │    re-read batch (must still be DRAFT), pieces, totals                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │    assess(net, remaining, total, policy)                               │
//! │       │                                                                 │
//! │       ├── WithinCapacity ── rolls, remaining -= net, CONFIRMED         │
//! │       ├── AutoAccepted ──── rolls, total += over, remaining = 0,       │
//! │       │                     adjustment increase_total, CONFIRMED       │
//! │       └── NeedsApproval ─── adjustment pending, PENDING_APPROVAL       │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Approval
//! ```text
//!  PENDING_APPROVAL ──approve(increase_total)──► total += over, remaining = 0
//!        │                                       rolls, CONFIRMED
//!        ├──────────approve(allow_negative)───► remaining -= over
//!        │                                       rolls, CONFIRMED
//!        └──────────approve(reject)───────────► DRAFT, beam untouched
//! ```

use chrono::Utc;
use loomtrack_core::lifecycle::ReceiveEvent;
use loomtrack_core::piece::roll_label;
use loomtrack_core::reconcile::{
    assess, Disposition, NOTE_AUTO_ACCEPTED, NOTE_PENDING, NOTE_REJECTED_SUFFIX, SYSTEM_ACTOR,
};
use loomtrack_core::{
    AdjustmentAction, ApprovalAction, ApprovalOutcome, Beam, BeamAdjustment, ConfirmOutcome,
    CoreError, Measure, OverproductionPolicy, PieceRow, ReceiveBatch, ReceiveStatus,
    ReceiveTotals, Roll,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::inward::{lock_beam, store_beam};
use crate::repository::receive::{fetch_receive, load_pieces, lock_receive, store_receive_status};
use crate::repository::rows::{AdjustmentRow, RollRow, ADJUSTMENT_COLUMNS, ROLL_COLUMNS};

/// Repository for confirmation, approval and cancellation of receive batches.
///
/// ## Usage
/// ```rust,ignore
/// match db.reconciliation().confirm(&batch.id, Some("clerk")).await? {
///     ConfirmOutcome::Confirmed { rolls, .. } => print_labels(&rolls),
///     ConfirmOutcome::NeedsApproval { adjustment, .. } => notify_supervisor(&adjustment),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ReconciliationRepository {
    pool: SqlitePool,
    policy: OverproductionPolicy,
}

impl ReconciliationRepository {
    /// Creates a new ReconciliationRepository.
    pub fn new(pool: SqlitePool, policy: OverproductionPolicy) -> Self {
        ReconciliationRepository { pool, policy }
    }

    /// Confirms a DRAFT batch against its beam.
    ///
    /// ## Errors
    /// - NotFound: batch or beam missing
    /// - InvalidState: batch is not DRAFT (checked again under the beam lock)
    /// - NothingToConfirm: net meter is not positive
    pub async fn confirm(&self, receive_id: &str, actor: Option<&str>) -> DbResult<ConfirmOutcome> {
        debug!(receive_id = %receive_id, "Confirming receive batch");

        // The beam of a batch never changes, so it can be read before locking.
        let beam_id = self.beam_of_receive(receive_id).await?;

        let mut tx = self.pool.begin().await?;

        let mut beam = lock_beam(&mut *tx, &beam_id).await?;
        let batch = fetch_receive(&mut *tx, receive_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Receive batch", receive_id))?;
        // Either branch leaves DRAFT; any other status fails here.
        batch.status.apply(ReceiveEvent::Finalize)?;

        let pieces = load_pieces(&mut *tx, receive_id).await?;
        let totals = ReceiveTotals::from_pieces(&pieces);
        if !totals.net_meter.is_positive() {
            return Err(CoreError::NothingToConfirm {
                net: totals.net_meter,
            }
            .into());
        }

        let remaining_before = beam.remaining_meter;
        let disposition = assess(
            totals.net_meter,
            remaining_before,
            beam.total_meter,
            &self.policy,
        );

        let outcome = match disposition {
            Disposition::WithinCapacity { new_remaining } => {
                beam.remaining_meter = new_remaining;
                let beam = store_beam(&mut *tx, &beam).await?;
                let (batch, rolls) =
                    finalize_receive(&mut *tx, &batch, &beam, &pieces, ReceiveEvent::Finalize, actor)
                        .await?;

                ConfirmOutcome::Confirmed {
                    batch,
                    beam,
                    totals,
                    rolls,
                    adjustment: None,
                }
            }

            Disposition::AutoAccepted { over_by, new_total } => {
                beam.total_meter = new_total;
                beam.remaining_meter = Measure::zero();
                let beam = store_beam(&mut *tx, &beam).await?;

                let now = Utc::now();
                let adjustment = insert_adjustment(
                    &mut *tx,
                    &BeamAdjustment {
                        id: Uuid::new_v4().to_string(),
                        beam_id: beam.id.clone(),
                        receive_id: batch.id.clone(),
                        expected_remaining_before: remaining_before,
                        actual_received: totals.net_meter,
                        over_by,
                        action_taken: AdjustmentAction::IncreaseTotal,
                        new_beam_total: Some(new_total),
                        new_remaining: Some(Measure::zero()),
                        approved_by: Some(SYSTEM_ACTOR.to_string()),
                        approved_at: Some(now),
                        note: Some(NOTE_AUTO_ACCEPTED.to_string()),
                        created_at: now,
                        updated_at: now,
                    },
                )
                .await?;

                let (batch, rolls) =
                    finalize_receive(&mut *tx, &batch, &beam, &pieces, ReceiveEvent::Finalize, actor)
                        .await?;

                info!(
                    receive_id = %receive_id,
                    over_by = %over_by,
                    new_total = %new_total,
                    "Overproduction auto-accepted within tolerance"
                );

                ConfirmOutcome::Confirmed {
                    batch,
                    beam,
                    totals,
                    rolls,
                    adjustment: Some(adjustment),
                }
            }

            Disposition::NeedsApproval { over_by } => {
                let now = Utc::now();
                let adjustment = insert_adjustment(
                    &mut *tx,
                    &BeamAdjustment {
                        id: Uuid::new_v4().to_string(),
                        beam_id: beam.id.clone(),
                        receive_id: batch.id.clone(),
                        expected_remaining_before: remaining_before,
                        actual_received: totals.net_meter,
                        over_by,
                        action_taken: AdjustmentAction::Pending,
                        new_beam_total: None,
                        new_remaining: None,
                        approved_by: None,
                        approved_at: None,
                        note: Some(NOTE_PENDING.to_string()),
                        created_at: now,
                        updated_at: now,
                    },
                )
                .await?;

                let next = batch.status.apply(ReceiveEvent::HoldForApproval)?;
                let batch = store_receive_status(&mut *tx, receive_id, next).await?;

                warn!(
                    receive_id = %receive_id,
                    beam_number = %beam.beam_number,
                    remaining = %remaining_before,
                    net = %totals.net_meter,
                    over_by = %over_by,
                    "Overproduction needs approval"
                );

                ConfirmOutcome::NeedsApproval {
                    batch,
                    totals,
                    adjustment,
                }
            }
        };

        tx.commit().await?;

        if let ConfirmOutcome::Confirmed { beam, rolls, .. } = &outcome {
            info!(
                receive_id = %receive_id,
                beam_number = %beam.beam_number,
                rolls = rolls.len(),
                remaining = %beam.remaining_meter,
                "Receive batch confirmed"
            );
        }

        Ok(outcome)
    }

    /// Applies a supervisor decision to a pending adjustment.
    ///
    /// ## Errors
    /// - NotFound: adjustment missing
    /// - InvalidState: adjustment is not pending, or its batch is not
    ///   PENDING_APPROVAL
    pub async fn approve(
        &self,
        adjustment_id: &str,
        decision: ApprovalAction,
        actor: Option<&str>,
    ) -> DbResult<ApprovalOutcome> {
        debug!(adjustment_id = %adjustment_id, ?decision, "Resolving adjustment");

        let beam_id = self
            .get_adjustment(adjustment_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Adjustment", adjustment_id))?
            .beam_id;

        let mut tx = self.pool.begin().await?;

        let mut beam = lock_beam(&mut *tx, &beam_id).await?;
        let mut adjustment = fetch_adjustment(&mut *tx, adjustment_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Adjustment", adjustment_id))?;
        let resolved = adjustment.action_taken.resolve(decision)?;

        let batch = fetch_receive(&mut *tx, &adjustment.receive_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Receive batch", &adjustment.receive_id))?;

        let now = Utc::now();
        adjustment.action_taken = resolved;
        adjustment.approved_by = actor.map(str::to_string);
        adjustment.approved_at = Some(now);

        let outcome = match decision {
            ApprovalAction::Reject => {
                let next = batch.status.apply(ReceiveEvent::Reject)?;
                adjustment.note = Some(rejected_note(adjustment.note.as_deref()));
                let adjustment = store_adjustment(&mut *tx, &adjustment).await?;
                let batch = store_receive_status(&mut *tx, &batch.id, next).await?;

                ApprovalOutcome::Rejected { adjustment, batch }
            }

            ApprovalAction::IncreaseTotal | ApprovalAction::AllowNegative => {
                // Validates the batch status before anything is written.
                batch.status.apply(ReceiveEvent::Approve)?;

                if decision == ApprovalAction::IncreaseTotal {
                    beam.total_meter += adjustment.over_by;
                    beam.remaining_meter = Measure::zero();
                    adjustment.new_beam_total = Some(beam.total_meter);
                } else {
                    beam.remaining_meter -= adjustment.over_by;
                }
                adjustment.new_remaining = Some(beam.remaining_meter);

                let beam = store_beam(&mut *tx, &beam).await?;
                let adjustment = store_adjustment(&mut *tx, &adjustment).await?;

                let pieces = load_pieces(&mut *tx, &batch.id).await?;
                let (batch, rolls) =
                    finalize_receive(&mut *tx, &batch, &beam, &pieces, ReceiveEvent::Approve, actor)
                        .await?;

                ApprovalOutcome::Approved {
                    adjustment,
                    batch,
                    beam,
                    rolls,
                }
            }
        };

        tx.commit().await?;

        info!(
            adjustment_id = %adjustment_id,
            action = resolved.label(),
            approved_by = ?actor,
            "Adjustment resolved"
        );

        Ok(outcome)
    }

    /// Cancels a DRAFT or PENDING_APPROVAL batch.
    ///
    /// A pending adjustment of the batch is rejected in the same transaction.
    /// CONFIRMED batches cannot be cancelled.
    pub async fn cancel(&self, receive_id: &str) -> DbResult<ReceiveBatch> {
        debug!(receive_id = %receive_id, "Cancelling receive batch");

        let mut tx = self.pool.begin().await?;

        let batch = lock_receive(&mut *tx, receive_id).await?;
        let next = batch.status.apply(ReceiveEvent::Cancel)?;

        if batch.status == ReceiveStatus::PendingApproval {
            let rejected = sqlx::query(
                r#"
                UPDATE beam_adjustments SET
                    action_taken = 'rejected',
                    note = COALESCE(note, '') || ?2,
                    updated_at = ?3
                WHERE receive_id = ?1 AND action_taken = 'pending'
                "#,
            )
            .bind(receive_id)
            .bind(NOTE_REJECTED_SUFFIX)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

            debug!(
                receive_id = %receive_id,
                rejected = rejected.rows_affected(),
                "Rejected pending adjustment of cancelled batch"
            );
        }

        let cancelled = store_receive_status(&mut *tx, receive_id, next).await?;

        tx.commit().await?;

        info!(receive_id = %receive_id, from = batch.status.label(), "Receive batch cancelled");
        Ok(cancelled)
    }

    /// Gets an adjustment by ID.
    pub async fn get_adjustment(&self, adjustment_id: &str) -> DbResult<Option<BeamAdjustment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_adjustment(&mut *conn, adjustment_id).await
    }

    /// The pending adjustment of a batch, if any.
    pub async fn pending_adjustment_for(
        &self,
        receive_id: &str,
    ) -> DbResult<Option<BeamAdjustment>> {
        let row = sqlx::query_as::<_, AdjustmentRow>(&format!(
            "SELECT {ADJUSTMENT_COLUMNS} FROM beam_adjustments \
             WHERE receive_id = ?1 AND action_taken = 'pending'"
        ))
        .bind(receive_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(BeamAdjustment::from))
    }

    /// Every adjustment recorded against a beam, oldest first.
    pub async fn adjustments_for_beam(&self, beam_id: &str) -> DbResult<Vec<BeamAdjustment>> {
        let rows = sqlx::query_as::<_, AdjustmentRow>(&format!(
            "SELECT {ADJUSTMENT_COLUMNS} FROM beam_adjustments WHERE beam_id = ?1 \
             ORDER BY created_at"
        ))
        .bind(beam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BeamAdjustment::from).collect())
    }

    async fn beam_of_receive(&self, receive_id: &str) -> DbResult<String> {
        let beam_id =
            sqlx::query_scalar::<_, String>("SELECT beam_id FROM receive_batches WHERE id = ?1")
                .bind(receive_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| CoreError::not_found("Receive batch", receive_id))?;

        Ok(beam_id)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn rejected_note(note: Option<&str>) -> String {
    format!("{}{}", note.unwrap_or_default(), NOTE_REJECTED_SUFFIX)
}

/// Creates one roll per piece and moves the batch to CONFIRMED.
async fn finalize_receive(
    conn: &mut SqliteConnection,
    batch: &ReceiveBatch,
    beam: &Beam,
    pieces: &[PieceRow],
    event: ReceiveEvent,
    received_by: Option<&str>,
) -> DbResult<(ReceiveBatch, Vec<Roll>)> {
    let next = batch.status.apply(event)?;
    let now = Utc::now();

    let mut rolls = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let row = sqlx::query_as::<_, RollRow>(&format!(
            r#"
            INSERT INTO rolls (
                id, piece_id, receive_id, beam_id, design_id, loom_id,
                meter, net_meter, weight, received_by, receive_date, label_payload, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            RETURNING {ROLL_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&piece.id)
        .bind(&batch.id)
        .bind(&beam.id)
        .bind(&batch.design_id)
        .bind(&batch.loom_id)
        .bind(piece.meter)
        .bind(piece.net_meter)
        .bind(piece.weight)
        .bind(received_by)
        .bind(batch.receive_date)
        .bind(roll_label(&beam.beam_number, &batch.design_id, piece))
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        rolls.push(Roll::from(row));
    }

    let batch = store_receive_status(&mut *conn, &batch.id, next).await?;
    Ok((batch, rolls))
}

async fn fetch_adjustment(
    conn: &mut SqliteConnection,
    adjustment_id: &str,
) -> DbResult<Option<BeamAdjustment>> {
    let row = sqlx::query_as::<_, AdjustmentRow>(&format!(
        "SELECT {ADJUSTMENT_COLUMNS} FROM beam_adjustments WHERE id = ?1"
    ))
    .bind(adjustment_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(BeamAdjustment::from))
}

async fn insert_adjustment(
    conn: &mut SqliteConnection,
    adjustment: &BeamAdjustment,
) -> DbResult<BeamAdjustment> {
    let row = sqlx::query_as::<_, AdjustmentRow>(&format!(
        r#"
        INSERT INTO beam_adjustments (
            id, beam_id, receive_id, expected_remaining_before, actual_received, over_by,
            action_taken, new_beam_total, new_remaining, approved_by, approved_at, note,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        RETURNING {ADJUSTMENT_COLUMNS}
        "#
    ))
    .bind(&adjustment.id)
    .bind(&adjustment.beam_id)
    .bind(&adjustment.receive_id)
    .bind(adjustment.expected_remaining_before)
    .bind(adjustment.actual_received)
    .bind(adjustment.over_by)
    .bind(adjustment.action_taken)
    .bind(adjustment.new_beam_total)
    .bind(adjustment.new_remaining)
    .bind(&adjustment.approved_by)
    .bind(adjustment.approved_at)
    .bind(&adjustment.note)
    .bind(adjustment.created_at)
    .bind(adjustment.updated_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

async fn store_adjustment(
    conn: &mut SqliteConnection,
    adjustment: &BeamAdjustment,
) -> DbResult<BeamAdjustment> {
    let row = sqlx::query_as::<_, AdjustmentRow>(&format!(
        r#"
        UPDATE beam_adjustments SET
            action_taken = ?2,
            new_beam_total = ?3,
            new_remaining = ?4,
            approved_by = ?5,
            approved_at = ?6,
            note = ?7,
            updated_at = ?8
        WHERE id = ?1
        RETURNING {ADJUSTMENT_COLUMNS}
        "#
    ))
    .bind(&adjustment.id)
    .bind(adjustment.action_taken)
    .bind(adjustment.new_beam_total)
    .bind(adjustment.new_remaining)
    .bind(&adjustment.approved_by)
    .bind(adjustment.approved_at)
    .bind(&adjustment.note)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use loomtrack_core::{BeamStatus, ErrorKind, NewBeamDetail, NewInward, NewPiece, NewReceive};

    fn w(v: i64) -> Measure {
        Measure::from_whole(v)
    }

    async fn setup(policy: OverproductionPolicy) -> (Database, Beam) {
        let db = Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .with_policy(policy);
        let created = db
            .inwards()
            .create_inward(
                NewInward {
                    details: vec![NewBeamDetail {
                        beam_name_id: None,
                        set_number: "S-1".into(),
                        sizing_meter: w(1000),
                        ltol_meter: Some(w(100)),
                    }],
                    ..NewInward::default()
                },
                None,
            )
            .await
            .unwrap();
        (db, created.beams[0].clone())
    }

    /// Draft with one piece per entry in `meters`.
    async fn receive(db: &Database, beam: &Beam, meters: &[i64]) -> ReceiveBatch {
        let batch = db
            .receives()
            .create_draft(
                NewReceive {
                    beam_id: beam.id.clone(),
                    design_id: "D-1".into(),
                    issue_id: None,
                    loom_id: Some("L-1".into()),
                    note: None,
                },
                None,
            )
            .await
            .unwrap();
        for &meter in meters {
            let main = db.receives().next_piece_number().await.unwrap();
            db.receives()
                .add_piece(
                    &batch.id,
                    NewPiece {
                        main_piece_no: main,
                        meter: w(meter),
                        ..NewPiece::default()
                    },
                )
                .await
                .unwrap();
        }
        batch
    }

    async fn beam_now(db: &Database, beam: &Beam) -> Beam {
        db.inwards().get_beam(&beam.id).await.unwrap().unwrap()
    }

    /// Drains the beam to zero and escalates a 50m overproduction.
    async fn pending_overproduction(db: &Database, beam: &Beam) -> (ReceiveBatch, BeamAdjustment) {
        let first = receive(db, beam, &[1000]).await;
        assert!(db
            .reconciliation()
            .confirm(&first.id, None)
            .await
            .unwrap()
            .is_confirmed());

        let batch = receive(db, beam, &[50]).await;
        match db.reconciliation().confirm(&batch.id, None).await.unwrap() {
            ConfirmOutcome::NeedsApproval { adjustment, .. } => (batch, adjustment),
            other => panic!("expected NeedsApproval, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_confirm_within_capacity() {
        let (db, beam) = setup(OverproductionPolicy::default()).await;
        let batch = receive(&db, &beam, &[600, 400]).await;

        let outcome = db.reconciliation().confirm(&batch.id, Some("clerk")).await.unwrap();
        let ConfirmOutcome::Confirmed {
            batch: confirmed,
            beam: after,
            totals,
            rolls,
            adjustment,
        } = outcome
        else {
            panic!("expected Confirmed");
        };

        assert_eq!(confirmed.status, ReceiveStatus::Confirmed);
        assert_eq!(after.remaining_meter, Measure::zero());
        assert_eq!(after.total_meter, w(1000));
        assert_eq!(totals.net_meter, w(1000));
        assert_eq!(rolls.len(), 2);
        assert!(adjustment.is_none());
        assert_eq!(rolls[0].received_by.as_deref(), Some("clerk"));
        assert_eq!(rolls[0].loom_id.as_deref(), Some("L-1"));

        let label: serde_json::Value = serde_json::from_str(&rolls[0].label_payload).unwrap();
        assert_eq!(label["beam_no"], beam.beam_number.as_str());
        assert_eq!(label["design_no"], "D-1");
        assert_eq!(label["net_meter"], 600);

        assert_eq!(db.receives().rolls_for(&batch.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_confirm_needs_approval() {
        let (db, beam) = setup(OverproductionPolicy::default()).await;
        let (batch, adjustment) = pending_overproduction(&db, &beam).await;

        assert_eq!(adjustment.action_taken, AdjustmentAction::Pending);
        assert_eq!(adjustment.over_by, w(50));
        assert_eq!(adjustment.expected_remaining_before, Measure::zero());
        assert_eq!(adjustment.actual_received, w(50));
        assert_eq!(adjustment.note.as_deref(), Some(NOTE_PENDING));

        let stored = db.receives().get(&batch.id).await.unwrap().unwrap();
        assert_eq!(stored.batch.status, ReceiveStatus::PendingApproval);
        assert!(db.receives().rolls_for(&batch.id).await.unwrap().is_empty());
        assert_eq!(beam_now(&db, &beam).await.remaining_meter, Measure::zero());

        let pending = db
            .reconciliation()
            .pending_adjustment_for(&batch.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pending.id, adjustment.id);
    }

    #[tokio::test]
    async fn test_auto_accept_within_tolerance() {
        let policy = OverproductionPolicy {
            tolerance_percent: 2.0,
            auto_accept_within_tolerance: true,
        };
        let (db, beam) = setup(policy).await;
        let batch = receive(&db, &beam, &[1015]).await;

        let ConfirmOutcome::Confirmed {
            beam: after,
            adjustment: Some(adjustment),
            rolls,
            ..
        } = db.reconciliation().confirm(&batch.id, None).await.unwrap()
        else {
            panic!("expected auto-accepted confirmation");
        };

        assert_eq!(after.total_meter, w(1015));
        assert_eq!(after.remaining_meter, Measure::zero());
        assert_eq!(rolls.len(), 1);
        assert_eq!(adjustment.action_taken, AdjustmentAction::IncreaseTotal);
        assert_eq!(adjustment.approved_by.as_deref(), Some(SYSTEM_ACTOR));
        assert_eq!(adjustment.note.as_deref(), Some(NOTE_AUTO_ACCEPTED));
        assert_eq!(adjustment.new_beam_total, Some(w(1015)));

        // Beyond tolerance still escalates.
        let batch = receive(&db, &beam, &[25]).await;
        assert!(!db
            .reconciliation()
            .confirm(&batch.id, None)
            .await
            .unwrap()
            .is_confirmed());
    }

    #[tokio::test]
    async fn test_approve_allow_negative() {
        let (db, beam) = setup(OverproductionPolicy::default()).await;
        let (batch, adjustment) = pending_overproduction(&db, &beam).await;

        let ApprovalOutcome::Approved {
            adjustment,
            batch: confirmed,
            beam: after,
            rolls,
        } = db
            .reconciliation()
            .approve(&adjustment.id, ApprovalAction::AllowNegative, Some("supervisor"))
            .await
            .unwrap()
        else {
            panic!("expected Approved");
        };

        assert_eq!(after.remaining_meter, w(-50));
        assert_eq!(after.total_meter, w(1000));
        assert_eq!(confirmed.id, batch.id);
        assert_eq!(confirmed.status, ReceiveStatus::Confirmed);
        assert_eq!(rolls.len(), 1);
        assert_eq!(rolls[0].received_by.as_deref(), Some("supervisor"));
        assert_eq!(adjustment.action_taken, AdjustmentAction::AllowNegative);
        assert_eq!(adjustment.new_remaining, Some(w(-50)));
        assert_eq!(adjustment.approved_by.as_deref(), Some("supervisor"));
        assert!(adjustment.approved_at.is_some());
    }

    #[tokio::test]
    async fn test_approve_increase_total() {
        let (db, beam) = setup(OverproductionPolicy::default()).await;
        let (_, adjustment) = pending_overproduction(&db, &beam).await;

        let outcome = db
            .reconciliation()
            .approve(&adjustment.id, ApprovalAction::IncreaseTotal, None)
            .await
            .unwrap();
        let ApprovalOutcome::Approved { beam: after, adjustment, .. } = outcome else {
            panic!("expected Approved");
        };

        assert_eq!(after.total_meter, w(1050));
        assert_eq!(after.remaining_meter, Measure::zero());
        assert_eq!(adjustment.new_beam_total, Some(w(1050)));
        assert_eq!(adjustment.new_remaining, Some(Measure::zero()));

        // Already resolved.
        let err = db
            .reconciliation()
            .approve(&adjustment.id, ApprovalAction::Reject, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_reject_returns_batch_to_draft() {
        let (db, beam) = setup(OverproductionPolicy::default()).await;
        let (batch, adjustment) = pending_overproduction(&db, &beam).await;

        let ApprovalOutcome::Rejected {
            adjustment,
            batch: draft,
        } = db
            .reconciliation()
            .approve(&adjustment.id, ApprovalAction::Reject, Some("supervisor"))
            .await
            .unwrap()
        else {
            panic!("expected Rejected");
        };

        assert_eq!(draft.status, ReceiveStatus::Draft);
        assert_eq!(adjustment.action_taken, AdjustmentAction::Rejected);
        assert_eq!(
            adjustment.note.as_deref(),
            Some("Overproduction pending approval | rejected")
        );
        assert_eq!(beam_now(&db, &beam).await.remaining_meter, Measure::zero());
        assert!(db.receives().rolls_for(&batch.id).await.unwrap().is_empty());

        // The corrected batch can be edited again.
        db.receives()
            .add_piece(
                &batch.id,
                NewPiece {
                    main_piece_no: 99,
                    meter: w(1),
                    ..NewPiece::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_nothing_to_confirm() {
        let (db, beam) = setup(OverproductionPolicy::default()).await;
        let batch = receive(&db, &beam, &[]).await;

        let err = db.reconciliation().confirm(&batch.id, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NothingToConfirm);

        let err = db.reconciliation().confirm("missing", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_confirm_twice_is_invalid() {
        let (db, beam) = setup(OverproductionPolicy::default()).await;
        let batch = receive(&db, &beam, &[100]).await;
        db.reconciliation().confirm(&batch.id, None).await.unwrap();

        let err = db.reconciliation().confirm(&batch.id, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(beam_now(&db, &beam).await.remaining_meter, w(900));
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let (db, beam) = setup(OverproductionPolicy::default()).await;

        let draft = receive(&db, &beam, &[10]).await;
        let cancelled = db.reconciliation().cancel(&draft.id).await.unwrap();
        assert_eq!(cancelled.status, ReceiveStatus::Cancelled);

        let err = db.reconciliation().cancel(&draft.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let (pending, adjustment) = pending_overproduction(&db, &beam).await;
        db.reconciliation().cancel(&pending.id).await.unwrap();
        let adjustment = db
            .reconciliation()
            .get_adjustment(&adjustment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(adjustment.action_taken, AdjustmentAction::Rejected);
        assert!(db
            .reconciliation()
            .pending_adjustment_for(&pending.id)
            .await
            .unwrap()
            .is_none());

        // Confirmed batches are final.
        let confirmed = db.receives().list_for_beam(&beam.id).await.unwrap();
        let confirmed = confirmed
            .iter()
            .find(|b| b.status == ReceiveStatus::Confirmed)
            .unwrap();
        let err = db.reconciliation().cancel(&confirmed.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        assert_eq!(db.reconciliation().adjustments_for_beam(&beam.id).await.unwrap().len(), 1);
        assert_eq!(beam_now(&db, &beam).await.status, BeamStatus::InStock);
    }
}
