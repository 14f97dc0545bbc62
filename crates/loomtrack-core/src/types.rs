//! # Domain Types
//!
//! Core domain types used throughout Loomtrack.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  InwardBatch    │──►│      Beam       │──►│   BeamIssue     │       │
//! │  │  ─────────────  │1:N│  ─────────────  │1:N│  ─────────────  │       │
//! │  │  inward_number  │   │  beam_number    │   │  loom_id        │       │
//! │  │  BI-25-0001     │   │  B-25-0001      │   │  snapshots      │       │
//! │  │  status         │   │  total/remaining│   │  issue_status   │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │1:N                                    │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │ BeamAdjustment  │◄──│  ReceiveBatch   │──►│    PieceRow     │       │
//! │  │  ─────────────  │   │  ─────────────  │1:N│  ─────────────  │       │
//! │  │  over_by        │   │  receive_number │   │  meter, marks   │       │
//! │  │  action_taken   │   │  status         │   │  net_meter      │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │1:1 (confirmed) │
//! │                                              ┌────────▼────────┐       │
//! │                                              │      Roll       │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (beam_number, inward_number, receive_number) - human-readable
//!
//! Loom, design, party and beam-name references point at master data owned
//! elsewhere, so they are carried as opaque strings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::measure::Measure;

// =============================================================================
// Status Enums
// =============================================================================

/// Whether the sized beams were produced for the mill itself or on job work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductionType {
    #[default]
    Own,
    Job,
}

/// Status of an inward batch header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InwardStatus {
    #[default]
    Open,
    Cancelled,
}

/// Where a beam is in its life.
///
/// ```text
///            issue              release (interrupt)
///  IN_STOCK ──────► ISSUED ─────────────────────► IN_STOCK
///     │               │
///     │ cancel        │ close (complete, remaining ≤ 0)
///     ▼               ▼
///  CANCELLED        CLOSED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeamStatus {
    #[default]
    InStock,
    Issued,
    Closed,
    Cancelled,
}

/// Status of a beam-to-loom issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    #[default]
    Waiting,
    Running,
    Interrupted,
    Completed,
}

/// Status of a receive batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiveStatus {
    #[default]
    Draft,
    PendingApproval,
    Confirmed,
    Cancelled,
}

/// What was done about an overproduction.
///
/// `Pending` is the only non-terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentAction {
    #[default]
    Pending,
    IncreaseTotal,
    AllowNegative,
    Rejected,
}

impl AdjustmentAction {
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, AdjustmentAction::Pending)
    }
}

/// Supervisor decision on a pending adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    IncreaseTotal,
    AllowNegative,
    Reject,
}

// =============================================================================
// Beam Inventory
// =============================================================================

/// Header of a batch of sized beams received into inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InwardBatch {
    pub id: String,
    /// `BI-{YY}-{NNNN}`
    pub inward_number: String,
    /// Fiscal year code, e.g. `25-26`.
    pub fiscal_year: String,
    pub inward_date: NaiveDate,
    pub production_type: ProductionType,
    pub sizing_party_id: Option<String>,
    pub job_party_id: Option<String>,
    pub status: InwardStatus,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Grouping of beams sized together, keyed by an external set number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamSet {
    pub id: String,
    pub set_number: String,
    pub created_at: DateTime<Utc>,
}

/// A single sized beam in inventory.
///
/// `remaining_meter` only changes inside a confirmation or approval
/// transaction that holds the beam lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beam {
    pub id: String,
    pub inward_id: String,
    /// `B-{YY}-{NNNN}`
    pub beam_number: String,
    pub beam_name_id: Option<String>,
    pub set_id: String,
    pub sizing_meter: Measure,
    /// Length tolerance (ltol) reported by the sizing unit.
    pub ltol_meter: Option<Measure>,
    pub total_meter: Measure,
    pub remaining_meter: Measure,
    pub status: BeamStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An inward batch together with the beams it created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InwardWithBeams {
    pub inward: InwardBatch,
    pub beams: Vec<Beam>,
}

// =============================================================================
// Issue
// =============================================================================

/// Assignment of a beam to a loom for weaving.
///
/// Uses the snapshot pattern: sizing length and tolerances are frozen at
/// creation so later edits to the beam do not change expected yield.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamIssue {
    pub id: String,
    pub beam_id: String,
    pub loom_id: Option<String>,
    pub design_id: Option<String>,
    pub sizing_meter_snapshot: Measure,
    pub sizing_ltol_snapshot: Option<Measure>,
    pub grey_ltol_snapshot: Option<Measure>,
    pub expected_fabric_meter: Option<Measure>,
    pub roll_length: Option<Measure>,
    pub width_split_factor: i64,
    pub base_roll_count: Option<i64>,
    pub expected_roll_count: Option<i64>,
    pub expected_total_output_meter: Option<Measure>,
    pub issue_status: IssueStatus,
    pub issue_date: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Receive
// =============================================================================

/// Header collecting woven pieces reported against a beam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveBatch {
    pub id: String,
    /// `GR-{yyMMddHHmmssSSS}-{4 hex}`
    pub receive_number: String,
    pub receive_date: DateTime<Utc>,
    pub beam_id: String,
    pub issue_id: Option<String>,
    pub design_id: String,
    pub loom_id: Option<String>,
    /// Tolerance inherited from the issue, else from the beam.
    pub ltol_snapshot: Option<Measure>,
    pub status: ReceiveStatus,
    pub note: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One woven piece (or part of a piece) on a receive batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceRow {
    pub id: String,
    pub receive_id: String,
    pub main_piece_no: i64,
    pub part_suffix: Option<String>,
    pub piece_label: String,
    pub meter: Measure,
    pub weight: Option<Measure>,
    pub damaged_meter: Measure,
    pub damaged_weight: Option<Measure>,
    pub net_meter: Measure,
    pub net_weight: Option<Measure>,
    pub reed: Option<i64>,
    pub pick: Option<i64>,
    pub width: Option<Measure>,
    pub avg_interval: Option<Measure>,
    pub delta_ltol: Option<Measure>,
    pub remarks: Option<String>,
    /// Mark positions in order.
    pub marks: Vec<Measure>,
    pub created_at: DateTime<Utc>,
}

/// A receive batch together with its pieces (marks included).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveWithPieces {
    pub batch: ReceiveBatch,
    pub pieces: Vec<PieceRow>,
}

/// Final output record, one per piece of a confirmed batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roll {
    pub id: String,
    pub piece_id: String,
    pub receive_id: String,
    pub beam_id: String,
    pub design_id: String,
    pub loom_id: Option<String>,
    pub meter: Measure,
    pub net_meter: Measure,
    pub weight: Option<Measure>,
    pub received_by: Option<String>,
    pub receive_date: DateTime<Utc>,
    /// JSON label consumed by label printers, see [`crate::piece::roll_label`].
    pub label_payload: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Adjustment
// =============================================================================

/// Record of a confirmation that exceeded the beam's remaining length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamAdjustment {
    pub id: String,
    pub beam_id: String,
    pub receive_id: String,
    pub expected_remaining_before: Measure,
    pub actual_received: Measure,
    pub over_by: Measure,
    pub action_taken: AdjustmentAction,
    pub new_beam_total: Option<Measure>,
    pub new_remaining: Option<Measure>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Inputs
// =============================================================================
// Already schema-validated by the caller; domain rules are checked here.

/// Attributes of a new inward batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInward {
    /// Defaults to today.
    #[serde(default)]
    pub inward_date: Option<NaiveDate>,
    #[serde(default)]
    pub production_type: ProductionType,
    #[serde(default)]
    pub sizing_party_id: Option<String>,
    #[serde(default)]
    pub job_party_id: Option<String>,
    pub details: Vec<NewBeamDetail>,
}

/// One beam line on a new inward batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBeamDetail {
    #[serde(default)]
    pub beam_name_id: Option<String>,
    pub set_number: String,
    pub sizing_meter: Measure,
    #[serde(default)]
    pub ltol_meter: Option<Measure>,
}

/// Attributes of a new beam issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIssue {
    pub beam_id: String,
    #[serde(default)]
    pub loom_id: Option<String>,
    #[serde(default)]
    pub design_id: Option<String>,
    #[serde(default)]
    pub expected_fabric_meter: Option<Measure>,
    #[serde(default)]
    pub roll_length: Option<Measure>,
    #[serde(default = "default_width_split_factor")]
    pub width_split_factor: i64,
    #[serde(default)]
    pub grey_ltol: Option<Measure>,
}

fn default_width_split_factor() -> i64 {
    1
}

impl NewIssue {
    /// An issue for `beam_id` with every optional attribute unset.
    pub fn for_beam(beam_id: impl Into<String>) -> Self {
        NewIssue {
            beam_id: beam_id.into(),
            loom_id: None,
            design_id: None,
            expected_fabric_meter: None,
            roll_length: None,
            width_split_factor: default_width_split_factor(),
            grey_ltol: None,
        }
    }
}

/// Attributes of a new receive batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReceive {
    pub beam_id: String,
    pub design_id: String,
    #[serde(default)]
    pub issue_id: Option<String>,
    #[serde(default)]
    pub loom_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A piece reported on a draft receive batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPiece {
    pub main_piece_no: i64,
    #[serde(default)]
    pub part_suffix: Option<String>,
    pub meter: Measure,
    #[serde(default)]
    pub weight: Option<Measure>,
    #[serde(default)]
    pub damaged_meter: Measure,
    #[serde(default)]
    pub damaged_weight: Option<Measure>,
    #[serde(default)]
    pub reed: Option<i64>,
    #[serde(default)]
    pub pick: Option<i64>,
    #[serde(default)]
    pub width: Option<Measure>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub marks: Vec<Measure>,
}

// =============================================================================
// Unit Tests
// =============================================================================
