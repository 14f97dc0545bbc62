//! Internal row types and their conversion into domain types.
//!
//! Column lists are shared so `SELECT` and `UPDATE ... RETURNING` statements
//! always decode into the same row shape.

use chrono::{DateTime, NaiveDate, Utc};

use loomtrack_core::{
    AdjustmentAction, Beam, BeamAdjustment, BeamIssue, BeamStatus, InwardBatch, InwardStatus,
    IssueStatus, Measure, PieceRow, ProductionType, ReceiveBatch, ReceiveStatus, Roll,
};

// =============================================================================
// Column Lists
// =============================================================================

pub(crate) const INWARD_COLUMNS: &str = "id, inward_number, fiscal_year, inward_date, \
    production_type, sizing_party_id, job_party_id, status, created_by, created_at, updated_at";

pub(crate) const BEAM_COLUMNS: &str = "id, inward_id, beam_number, beam_name_id, set_id, \
    sizing_meter, ltol_meter, total_meter, remaining_meter, status, created_at, updated_at";

pub(crate) const ISSUE_COLUMNS: &str = "id, beam_id, loom_id, design_id, \
    sizing_meter_snapshot, sizing_ltol_snapshot, grey_ltol_snapshot, expected_fabric_meter, \
    roll_length, width_split_factor, base_roll_count, expected_roll_count, \
    expected_total_output_meter, issue_status, issue_date, start_date, end_date, created_by, \
    created_at, updated_at";

pub(crate) const RECEIVE_COLUMNS: &str = "id, receive_number, receive_date, beam_id, issue_id, \
    design_id, loom_id, ltol_snapshot, status, note, created_by, created_at, updated_at";

pub(crate) const PIECE_COLUMNS: &str = "id, receive_id, main_piece_no, part_suffix, piece_label, \
    meter, weight, damaged_meter, damaged_weight, net_meter, net_weight, reed, pick, width, \
    avg_interval, delta_ltol, remarks, created_at";

pub(crate) const ROLL_COLUMNS: &str = "id, piece_id, receive_id, beam_id, design_id, loom_id, \
    meter, net_meter, weight, received_by, receive_date, label_payload, created_at";

pub(crate) const ADJUSTMENT_COLUMNS: &str = "id, beam_id, receive_id, \
    expected_remaining_before, actual_received, over_by, action_taken, new_beam_total, \
    new_remaining, approved_by, approved_at, note, created_at, updated_at";

// =============================================================================
// Inward / Beam
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct InwardRow {
    id: String,
    inward_number: String,
    fiscal_year: String,
    inward_date: NaiveDate,
    production_type: ProductionType,
    sizing_party_id: Option<String>,
    job_party_id: Option<String>,
    status: InwardStatus,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InwardRow> for InwardBatch {
    fn from(row: InwardRow) -> Self {
        Self {
            id: row.id,
            inward_number: row.inward_number,
            fiscal_year: row.fiscal_year,
            inward_date: row.inward_date,
            production_type: row.production_type,
            sizing_party_id: row.sizing_party_id,
            job_party_id: row.job_party_id,
            status: row.status,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BeamRow {
    id: String,
    inward_id: String,
    beam_number: String,
    beam_name_id: Option<String>,
    set_id: String,
    sizing_meter: Measure,
    ltol_meter: Option<Measure>,
    total_meter: Measure,
    remaining_meter: Measure,
    status: BeamStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BeamRow> for Beam {
    fn from(row: BeamRow) -> Self {
        Self {
            id: row.id,
            inward_id: row.inward_id,
            beam_number: row.beam_number,
            beam_name_id: row.beam_name_id,
            set_id: row.set_id,
            sizing_meter: row.sizing_meter,
            ltol_meter: row.ltol_meter,
            total_meter: row.total_meter,
            remaining_meter: row.remaining_meter,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Issue
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct IssueRow {
    id: String,
    beam_id: String,
    loom_id: Option<String>,
    design_id: Option<String>,
    sizing_meter_snapshot: Measure,
    sizing_ltol_snapshot: Option<Measure>,
    grey_ltol_snapshot: Option<Measure>,
    expected_fabric_meter: Option<Measure>,
    roll_length: Option<Measure>,
    width_split_factor: i64,
    base_roll_count: Option<i64>,
    expected_roll_count: Option<i64>,
    expected_total_output_meter: Option<Measure>,
    issue_status: IssueStatus,
    issue_date: DateTime<Utc>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IssueRow> for BeamIssue {
    fn from(row: IssueRow) -> Self {
        Self {
            id: row.id,
            beam_id: row.beam_id,
            loom_id: row.loom_id,
            design_id: row.design_id,
            sizing_meter_snapshot: row.sizing_meter_snapshot,
            sizing_ltol_snapshot: row.sizing_ltol_snapshot,
            grey_ltol_snapshot: row.grey_ltol_snapshot,
            expected_fabric_meter: row.expected_fabric_meter,
            roll_length: row.roll_length,
            width_split_factor: row.width_split_factor,
            base_roll_count: row.base_roll_count,
            expected_roll_count: row.expected_roll_count,
            expected_total_output_meter: row.expected_total_output_meter,
            issue_status: row.issue_status,
            issue_date: row.issue_date,
            start_date: row.start_date,
            end_date: row.end_date,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Receive / Piece / Roll
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ReceiveRow {
    id: String,
    receive_number: String,
    receive_date: DateTime<Utc>,
    beam_id: String,
    issue_id: Option<String>,
    design_id: String,
    loom_id: Option<String>,
    ltol_snapshot: Option<Measure>,
    status: ReceiveStatus,
    note: Option<String>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReceiveRow> for ReceiveBatch {
    fn from(row: ReceiveRow) -> Self {
        Self {
            id: row.id,
            receive_number: row.receive_number,
            receive_date: row.receive_date,
            beam_id: row.beam_id,
            issue_id: row.issue_id,
            design_id: row.design_id,
            loom_id: row.loom_id,
            ltol_snapshot: row.ltol_snapshot,
            status: row.status,
            note: row.note,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Piece row without its marks; marks are loaded separately.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PieceRowRow {
    pub(crate) id: String,
    receive_id: String,
    main_piece_no: i64,
    part_suffix: Option<String>,
    piece_label: String,
    meter: Measure,
    weight: Option<Measure>,
    damaged_meter: Measure,
    damaged_weight: Option<Measure>,
    net_meter: Measure,
    net_weight: Option<Measure>,
    reed: Option<i64>,
    pick: Option<i64>,
    width: Option<Measure>,
    avg_interval: Option<Measure>,
    delta_ltol: Option<Measure>,
    remarks: Option<String>,
    created_at: DateTime<Utc>,
}

impl PieceRowRow {
    pub(crate) fn into_piece(self, marks: Vec<Measure>) -> PieceRow {
        PieceRow {
            id: self.id,
            receive_id: self.receive_id,
            main_piece_no: self.main_piece_no,
            part_suffix: self.part_suffix,
            piece_label: self.piece_label,
            meter: self.meter,
            weight: self.weight,
            damaged_meter: self.damaged_meter,
            damaged_weight: self.damaged_weight,
            net_meter: self.net_meter,
            net_weight: self.net_weight,
            reed: self.reed,
            pick: self.pick,
            width: self.width,
            avg_interval: self.avg_interval,
            delta_ltol: self.delta_ltol,
            remarks: self.remarks,
            marks,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MarkRow {
    pub(crate) piece_id: String,
    pub(crate) position: Measure,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RollRow {
    id: String,
    piece_id: String,
    receive_id: String,
    beam_id: String,
    design_id: String,
    loom_id: Option<String>,
    meter: Measure,
    net_meter: Measure,
    weight: Option<Measure>,
    received_by: Option<String>,
    receive_date: DateTime<Utc>,
    label_payload: String,
    created_at: DateTime<Utc>,
}

impl From<RollRow> for Roll {
    fn from(row: RollRow) -> Self {
        Self {
            id: row.id,
            piece_id: row.piece_id,
            receive_id: row.receive_id,
            beam_id: row.beam_id,
            design_id: row.design_id,
            loom_id: row.loom_id,
            meter: row.meter,
            net_meter: row.net_meter,
            weight: row.weight,
            received_by: row.received_by,
            receive_date: row.receive_date,
            label_payload: row.label_payload,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Adjustment
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AdjustmentRow {
    id: String,
    beam_id: String,
    receive_id: String,
    expected_remaining_before: Measure,
    actual_received: Measure,
    over_by: Measure,
    action_taken: AdjustmentAction,
    new_beam_total: Option<Measure>,
    new_remaining: Option<Measure>,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AdjustmentRow> for BeamAdjustment {
    fn from(row: AdjustmentRow) -> Self {
        Self {
            id: row.id,
            beam_id: row.beam_id,
            receive_id: row.receive_id,
            expected_remaining_before: row.expected_remaining_before,
            actual_received: row.actual_received,
            over_by: row.over_by,
            action_taken: row.action_taken,
            new_beam_total: row.new_beam_total,
            new_remaining: row.new_remaining,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
