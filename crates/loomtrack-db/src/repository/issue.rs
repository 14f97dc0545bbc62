//! # Issue Repository
//!
//! Assigns beams to looms and drives the issue lifecycle.
//!
//! ## Issue Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create ──► WAITING ──start──► RUNNING ──complete──► COMPLETED         │
//! │   beam IN_STOCK → ISSUED          │                   beam CLOSED if   │
//! │                                   │                   remaining ≤ 0    │
//! │                                   └──interrupt──► INTERRUPTED          │
//! │                                                   beam ISSUED →        │
//! │                                                   IN_STOCK             │
//! │                                                                         │
//! │  One RUNNING issue per loom: checked on start and enforced by the      │
//! │  partial unique index ux_beam_issues_running_loom.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use loomtrack_core::lifecycle::{BeamEvent, IssueEvent};
use loomtrack_core::validation::validate_new_issue;
use loomtrack_core::yield_calc::{expected_yield, YieldInput};
use loomtrack_core::{BeamIssue, BeamStatus, CoreError, IssueStatus, NewIssue};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbResult, LOOM_BUSY_MESSAGE};
use crate::repository::inward::{lock_beam, store_beam};
use crate::repository::rows::{IssueRow, ISSUE_COLUMNS};

/// Repository for beam issues.
#[derive(Debug, Clone)]
pub struct IssueRepository {
    pool: SqlitePool,
}

impl IssueRepository {
    /// Creates a new IssueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        IssueRepository { pool }
    }

    /// Issues an in-stock beam, snapshotting its lengths and computing the
    /// expected yield.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let issue = db.issues().create(NewIssue {
    ///     loom_id: Some("L-07".into()),
    ///     roll_length: Some(Measure::from_whole(100)),
    ///     ..NewIssue::for_beam(beam.id.clone())
    /// }, Some("supervisor")).await?;
    /// ```
    pub async fn create(&self, issue: NewIssue, actor: Option<&str>) -> DbResult<BeamIssue> {
        validate_new_issue(&issue)?;

        debug!(beam_id = %issue.beam_id, loom_id = ?issue.loom_id, "Creating beam issue");

        let mut tx = self.pool.begin().await?;

        let mut beam = lock_beam(&mut *tx, &issue.beam_id).await?;
        beam.status = beam.status.apply(BeamEvent::Issue)?;

        let expected = expected_yield(&YieldInput {
            sizing_meter: beam.sizing_meter,
            sizing_ltol: beam.ltol_meter,
            grey_ltol: issue.grey_ltol,
            expected_fabric_meter: issue.expected_fabric_meter,
            roll_length: issue.roll_length,
            width_split_factor: issue.width_split_factor,
        });

        let now = Utc::now();
        let row = sqlx::query_as::<_, IssueRow>(&format!(
            r#"
            INSERT INTO beam_issues (
                id, beam_id, loom_id, design_id,
                sizing_meter_snapshot, sizing_ltol_snapshot, grey_ltol_snapshot,
                expected_fabric_meter, roll_length, width_split_factor,
                base_roll_count, expected_roll_count, expected_total_output_meter,
                issue_status, issue_date, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                      'waiting', ?14, ?15, ?14, ?14)
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&beam.id)
        .bind(&issue.loom_id)
        .bind(&issue.design_id)
        .bind(beam.sizing_meter)
        .bind(beam.ltol_meter)
        .bind(issue.grey_ltol)
        .bind(expected.expected_fabric_meter)
        .bind(issue.roll_length)
        .bind(issue.width_split_factor)
        .bind(expected.base_roll_count)
        .bind(expected.expected_roll_count)
        .bind(expected.expected_total_output_meter)
        .bind(now)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        store_beam(&mut *tx, &beam).await?;

        tx.commit().await?;

        let created = BeamIssue::from(row);
        info!(
            issue_id = %created.id,
            beam_number = %beam.beam_number,
            expected_rolls = ?created.expected_roll_count,
            "Beam issued"
        );
        Ok(created)
    }

    /// WAITING → RUNNING.
    ///
    /// Conflict when another issue is already running on the same loom.
    pub async fn start(&self, issue_id: &str) -> DbResult<BeamIssue> {
        debug!(issue_id = %issue_id, "Starting beam issue");

        let mut tx = self.pool.begin().await?;

        let issue = lock_issue(&mut *tx, issue_id).await?;
        let next = issue.issue_status.apply(IssueEvent::Start)?;

        if let Some(loom_id) = issue.loom_id.as_deref() {
            let running: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM beam_issues \
                 WHERE loom_id = ?1 AND issue_status = 'running' AND id != ?2",
            )
            .bind(loom_id)
            .bind(issue_id)
            .fetch_one(&mut *tx)
            .await?;

            if running > 0 {
                warn!(issue_id = %issue_id, loom_id = %loom_id, "Loom already running a beam");
                return Err(CoreError::Conflict(LOOM_BUSY_MESSAGE.to_string()).into());
            }
        }

        let now = Utc::now();
        let started = store_issue(&mut *tx, issue_id, next, Some(now), None).await?;

        tx.commit().await?;

        info!(issue_id = %issue_id, loom_id = ?started.loom_id, "Beam issue started");
        Ok(started)
    }

    /// RUNNING → INTERRUPTED; the beam goes back to stock with its lengths
    /// untouched.
    pub async fn interrupt(&self, issue_id: &str) -> DbResult<BeamIssue> {
        debug!(issue_id = %issue_id, "Interrupting beam issue");

        let mut tx = self.pool.begin().await?;

        let issue = lock_issue(&mut *tx, issue_id).await?;
        let next = issue.issue_status.apply(IssueEvent::Interrupt)?;

        let mut beam = lock_beam(&mut *tx, &issue.beam_id).await?;
        beam.status = beam.status.apply(BeamEvent::Release)?;
        store_beam(&mut *tx, &beam).await?;

        let interrupted = store_issue(
            &mut *tx,
            issue_id,
            next,
            issue.start_date,
            Some(Utc::now()),
        )
        .await?;

        tx.commit().await?;

        info!(issue_id = %issue_id, beam_number = %beam.beam_number, "Beam issue interrupted");
        Ok(interrupted)
    }

    /// Any open state → COMPLETED. Fails once the issue is already
    /// COMPLETED. Closes the beam when nothing is left on it.
    pub async fn complete(&self, issue_id: &str) -> DbResult<BeamIssue> {
        debug!(issue_id = %issue_id, "Completing beam issue");

        let mut tx = self.pool.begin().await?;

        let issue = lock_issue(&mut *tx, issue_id).await?;
        let next = issue.issue_status.apply(IssueEvent::Complete)?;

        let mut beam = lock_beam(&mut *tx, &issue.beam_id).await?;
        if !beam.remaining_meter.is_positive() {
            beam.status = beam.status.apply(BeamEvent::Close)?;
            store_beam(&mut *tx, &beam).await?;
        }

        let completed = store_issue(
            &mut *tx,
            issue_id,
            next,
            issue.start_date,
            Some(Utc::now()),
        )
        .await?;

        tx.commit().await?;

        info!(
            issue_id = %issue_id,
            beam_closed = beam.status == BeamStatus::Closed,
            "Beam issue completed"
        );
        Ok(completed)
    }

    /// Gets an issue by ID.
    pub async fn get(&self, issue_id: &str) -> DbResult<Option<BeamIssue>> {
        let mut conn = self.pool.acquire().await?;
        fetch_issue(&mut *conn, issue_id).await
    }

    /// Every issue of a beam, newest first.
    pub async fn list_for_beam(&self, beam_id: &str) -> DbResult<Vec<BeamIssue>> {
        let rows = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM beam_issues WHERE beam_id = ?1 \
             ORDER BY created_at DESC"
        ))
        .bind(beam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BeamIssue::from).collect())
    }

    /// The issue currently running on a loom, if any.
    pub async fn running_on_loom(&self, loom_id: &str) -> DbResult<Option<BeamIssue>> {
        let row = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM beam_issues \
             WHERE loom_id = ?1 AND issue_status = 'running'"
        ))
        .bind(loom_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(BeamIssue::from))
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub(crate) async fn fetch_issue(
    conn: &mut SqliteConnection,
    issue_id: &str,
) -> DbResult<Option<BeamIssue>> {
    let row = sqlx::query_as::<_, IssueRow>(&format!(
        "SELECT {ISSUE_COLUMNS} FROM beam_issues WHERE id = ?1"
    ))
    .bind(issue_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(BeamIssue::from))
}

/// No-op write on the issue row; takes the write lock and re-reads it.
async fn lock_issue(conn: &mut SqliteConnection, issue_id: &str) -> DbResult<BeamIssue> {
    let row = sqlx::query_as::<_, IssueRow>(&format!(
        "UPDATE beam_issues SET issue_status = issue_status WHERE id = ?1 \
         RETURNING {ISSUE_COLUMNS}"
    ))
    .bind(issue_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::not_found("Issue", issue_id))?;

    Ok(row.into())
}

async fn store_issue(
    conn: &mut SqliteConnection,
    issue_id: &str,
    status: IssueStatus,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
) -> DbResult<BeamIssue> {
    let row = sqlx::query_as::<_, IssueRow>(&format!(
        r#"
        UPDATE beam_issues SET
            issue_status = ?2,
            start_date = ?3,
            end_date = ?4,
            updated_at = ?5
        WHERE id = ?1
        RETURNING {ISSUE_COLUMNS}
        "#
    ))
    .bind(issue_id)
    .bind(status)
    .bind(start_date)
    .bind(end_date)
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
    use loomtrack_core::{Beam, ErrorKind, Measure, NewBeamDetail, NewInward};

    async fn setup(beams: usize) -> (Database, Vec<Beam>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let details = (0..beams)
            .map(|i| NewBeamDetail {
                beam_name_id: None,
                set_number: format!("S-{}", i),
                sizing_meter: Measure::from_whole(1000),
                ltol_meter: Some(Measure::from_whole(100)),
            })
            .collect();
        let created = db
            .inwards()
            .create_inward(
                NewInward {
                    details,
                    ..NewInward::default()
                },
                None,
            )
            .await
            .unwrap();
        (db, created.beams)
    }

    fn on_loom(beam: &Beam, loom: &str) -> NewIssue {
        NewIssue {
            loom_id: Some(loom.to_string()),
            ..NewIssue::for_beam(beam.id.clone())
        }
    }

    #[tokio::test]
    async fn test_create_snapshots_and_yield() {
        let (db, beams) = setup(1).await;

        let issue = db
            .issues()
            .create(
                NewIssue {
                    grey_ltol: Some(Measure::from_whole(95)),
                    roll_length: Some(Measure::from_whole(100)),
                    width_split_factor: 2,
                    ..on_loom(&beams[0], "L-1")
                },
                Some("supervisor"),
            )
            .await
            .unwrap();

        assert_eq!(issue.issue_status, IssueStatus::Waiting);
        assert_eq!(issue.sizing_meter_snapshot, Measure::from_whole(1000));
        assert_eq!(issue.sizing_ltol_snapshot, Some(Measure::from_whole(100)));
        assert_eq!(issue.expected_fabric_meter, Some(Measure::from_whole(950)));
        assert_eq!(issue.base_roll_count, Some(10));
        assert_eq!(issue.expected_roll_count, Some(20));
        assert_eq!(
            issue.expected_total_output_meter,
            Some(Measure::from_whole(1900))
        );
        assert_eq!(issue.created_by.as_deref(), Some("supervisor"));

        let beam = db.inwards().get_beam(&beams[0].id).await.unwrap().unwrap();
        assert_eq!(beam.status, BeamStatus::Issued);
        assert_eq!(beam.remaining_meter, Measure::from_whole(1000));
    }

    #[tokio::test]
    async fn test_create_requires_in_stock_beam() {
        let (db, beams) = setup(1).await;
        db.issues()
            .create(NewIssue::for_beam(beams[0].id.clone()), None)
            .await
            .unwrap();

        let err = db
            .issues()
            .create(NewIssue::for_beam(beams[0].id.clone()), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let err = db
            .issues()
            .create(NewIssue::for_beam("missing"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_create_rejects_zero_split() {
        let (db, beams) = setup(1).await;
        let err = db
            .issues()
            .create(
                NewIssue {
                    width_split_factor: 0,
                    ..NewIssue::for_beam(beams[0].id.clone())
                },
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_one_running_issue_per_loom() {
        let (db, beams) = setup(2).await;
        let first = db.issues().create(on_loom(&beams[0], "L-7"), None).await.unwrap();
        let second = db.issues().create(on_loom(&beams[1], "L-7"), None).await.unwrap();

        let started = db.issues().start(&first.id).await.unwrap();
        assert_eq!(started.issue_status, IssueStatus::Running);
        assert!(started.start_date.is_some());

        let err = db.issues().start(&second.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), LOOM_BUSY_MESSAGE);

        let running = db.issues().running_on_loom("L-7").await.unwrap().unwrap();
        assert_eq!(running.id, first.id);

        // Freed after the first is interrupted.
        db.issues().interrupt(&first.id).await.unwrap();
        db.issues().start(&second.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_interrupt_releases_beam() {
        let (db, beams) = setup(1).await;
        let issue = db.issues().create(on_loom(&beams[0], "L-1"), None).await.unwrap();

        let err = db.issues().interrupt(&issue.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        db.issues().start(&issue.id).await.unwrap();
        let interrupted = db.issues().interrupt(&issue.id).await.unwrap();
        assert_eq!(interrupted.issue_status, IssueStatus::Interrupted);
        assert!(interrupted.end_date.is_some());

        let beam = db.inwards().get_beam(&beams[0].id).await.unwrap().unwrap();
        assert_eq!(beam.status, BeamStatus::InStock);
        assert_eq!(beam.remaining_meter, Measure::from_whole(1000));

        // The beam can be issued again.
        db.issues()
            .create(NewIssue::for_beam(beams[0].id.clone()), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_complete_twice_is_invalid() {
        let (db, beams) = setup(1).await;
        let issue = db.issues().create(on_loom(&beams[0], "L-1"), None).await.unwrap();
        db.issues().start(&issue.id).await.unwrap();

        let completed = db.issues().complete(&issue.id).await.unwrap();
        assert_eq!(completed.issue_status, IssueStatus::Completed);

        let err = db.issues().complete(&issue.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        // Remaining length was positive, so the beam is not closed.
        let beam = db.inwards().get_beam(&beams[0].id).await.unwrap().unwrap();
        assert_eq!(beam.status, BeamStatus::Issued);
    }

    #[tokio::test]
    async fn test_complete_waiting_issue() {
        let (db, beams) = setup(1).await;
        let issue = db.issues().create(on_loom(&beams[0], "L-1"), None).await.unwrap();
        assert_eq!(issue.issue_status, IssueStatus::Waiting);

        let completed = db.issues().complete(&issue.id).await.unwrap();
        assert_eq!(completed.issue_status, IssueStatus::Completed);
        assert!(completed.start_date.is_none());
        assert!(completed.end_date.is_some());

        let beam = db.inwards().get_beam(&beams[0].id).await.unwrap().unwrap();
        assert_eq!(beam.status, BeamStatus::Issued);

        let err = db.issues().complete(&issue.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_complete_interrupted_issue() {
        let (db, beams) = setup(1).await;
        let issue = db.issues().create(on_loom(&beams[0], "L-1"), None).await.unwrap();
        db.issues().start(&issue.id).await.unwrap();
        db.issues().interrupt(&issue.id).await.unwrap();

        let completed = db.issues().complete(&issue.id).await.unwrap();
        assert_eq!(completed.issue_status, IssueStatus::Completed);

        let beam = db.inwards().get_beam(&beams[0].id).await.unwrap().unwrap();
        assert_eq!(beam.status, BeamStatus::InStock);
    }

    #[tokio::test]
    async fn test_complete_closes_exhausted_beam() {
        let (db, beams) = setup(1).await;
        let issue = db.issues().create(on_loom(&beams[0], "L-1"), None).await.unwrap();
        db.issues().start(&issue.id).await.unwrap();

        sqlx::query("UPDATE beams SET remaining_meter = 0 WHERE id = ?1")
            .bind(&beams[0].id)
            .execute(db.pool())
            .await
            .unwrap();

        db.issues().complete(&issue.id).await.unwrap();
        let beam = db.inwards().get_beam(&beams[0].id).await.unwrap().unwrap();
        assert_eq!(beam.status, BeamStatus::Closed);
        assert_eq!(db.issues().list_for_beam(&beams[0].id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_issue() {
        let (db, _) = setup(1).await;
        assert!(db.issues().get("missing").await.unwrap().is_none());
        let err = db.issues().start("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
