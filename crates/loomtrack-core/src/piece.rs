//! # Piece Evaluation
//!
//! Derived values of a piece row and the roll label printed for it.
//!
//! ## Piece Workflow
//! ```text
//! NewPiece { meter, damaged_meter, weight, marks, ... }
//!      │
//!      ▼
//! evaluate_piece(&piece, ltol_snapshot) ← THIS MODULE
//!      │   ├── damaged ≤ meter
//!      │   ├── every mark in [0, meter], strictly increasing
//!      │   ├── net = meter − damaged (4 decimals)
//!      │   └── avg_interval, delta_ltol from marks
//!      ▼
//! PieceMetrics ──► stored on the piece row
//!      │
//!      ▼ (confirmation)
//! roll_label() ──► {"beam_no":..,"design_no":..,"main_piece_no":..,
//!                   "piece_label":..,"net_meter":..}
//! ```

use serde::{Serialize, Serializer};

use crate::measure::Measure;
use crate::types::{NewPiece, PieceRow};
use crate::validation::{validate_marks, validate_piece_amounts, ValidationResult};

/// Values computed from a piece's reported amounts and marks.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceMetrics {
    pub piece_label: String,
    pub net_meter: Measure,
    pub net_weight: Option<Measure>,
    pub avg_interval: Option<Measure>,
    pub delta_ltol: Option<Measure>,
}

/// `"{main}{suffix}"`, e.g. `12` or `12A`.
pub fn piece_label(main_piece_no: i64, part_suffix: Option<&str>) -> String {
    match part_suffix {
        Some(suffix) => format!("{}{}", main_piece_no, suffix),
        None => main_piece_no.to_string(),
    }
}

/// Mean distance between consecutive marks, `None` with fewer than two.
pub fn average_interval(marks: &[Measure]) -> Option<Measure> {
    if marks.len() < 2 {
        return None;
    }
    let gaps: Measure = marks.windows(2).map(|w| w[1] - w[0]).sum();
    gaps.div_round(marks.len() as i64 - 1)
}

/// Validates a new piece and computes its derived values.
///
/// `ltol_snapshot` is the tolerance captured on the receive batch.
pub fn evaluate_piece(
    piece: &NewPiece,
    ltol_snapshot: Option<Measure>,
) -> ValidationResult<PieceMetrics> {
    validate_piece_amounts(piece)?;
    validate_marks(&piece.marks, piece.meter)?;

    let net_meter = piece.meter - piece.damaged_meter;
    let net_weight = piece
        .weight
        .map(|w| w - piece.damaged_weight.unwrap_or_default());

    let avg_interval = average_interval(&piece.marks);
    let delta_ltol = match (avg_interval, ltol_snapshot) {
        (Some(avg), Some(ltol)) => Some(avg - ltol),
        _ => None,
    };

    Ok(PieceMetrics {
        piece_label: piece_label(piece.main_piece_no, non_empty(piece.part_suffix.as_deref())),
        net_meter,
        net_weight,
        avg_interval,
        delta_ltol,
    })
}

fn non_empty(suffix: Option<&str>) -> Option<&str> {
    suffix.map(str::trim).filter(|s| !s.is_empty())
}

/// Recomputes the net meter of a stored piece from its gross and damage.
pub fn recompute_net(piece: &PieceRow) -> Measure {
    piece.meter - piece.damaged_meter
}

// =============================================================================
// Roll Label
// =============================================================================

/// Label payload printed on a roll.
///
/// Field order is part of the contract with label printers. Whole meters
/// print without a fractional part (`1000`, not `1000.0`).
#[derive(Debug, Clone, Serialize)]
pub struct RollLabel<'a> {
    pub beam_no: &'a str,
    pub design_no: &'a str,
    pub main_piece_no: i64,
    pub piece_label: &'a str,
    #[serde(serialize_with = "label_meter")]
    pub net_meter: Measure,
}

fn label_meter<S: Serializer>(meter: &Measure, serializer: S) -> Result<S::Ok, S::Error> {
    match meter.as_whole() {
        Some(whole) => serializer.serialize_i64(whole),
        None => serializer.serialize_f64(meter.as_f64()),
    }
}

/// Serializes the label of a roll created from `piece`.
pub fn roll_label(beam_no: &str, design_no: &str, piece: &PieceRow) -> String {
    let label = RollLabel {
        beam_no,
        design_no,
        main_piece_no: piece.main_piece_no,
        piece_label: &piece.piece_label,
        net_meter: piece.net_meter,
    };
    // Plain struct of strings and numbers; serialization cannot fail.
    serde_json::to_string(&label).unwrap_or_default()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn piece(meter: f64, damaged: f64, marks: &[f64]) -> NewPiece {
        NewPiece {
            main_piece_no: 12,
            meter: Measure::from_f64(meter),
            damaged_meter: Measure::from_f64(damaged),
            marks: marks.iter().copied().map(Measure::from_f64).collect(),
            ..NewPiece::default()
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(piece_label(12, None), "12");
        assert_eq!(piece_label(12, Some("A")), "12A");
    }

    #[test]
    fn test_net_and_weight() {
        let mut p = piece(120.5, 0.5, &[]);
        p.weight = Some(Measure::from_f64(30.0));
        p.damaged_weight = Some(Measure::from_f64(1.25));

        let m = evaluate_piece(&p, None).unwrap();
        assert_eq!(m.net_meter, Measure::from_whole(120));
        assert_eq!(m.net_weight, Some(Measure::from_f64(28.75)));
        assert_eq!(m.avg_interval, None);
        assert_eq!(m.delta_ltol, None);
    }

    #[test]
    fn test_net_weight_absent_without_weight() {
        let mut p = piece(100.0, 0.0, &[]);
        p.damaged_weight = Some(Measure::from_f64(2.0));
        assert_eq!(evaluate_piece(&p, None).unwrap().net_weight, None);
    }

    #[test]
    fn test_marks_statistics() {
        let p = piece(200.0, 0.0, &[10.0, 60.0, 112.0]);
        let m = evaluate_piece(&p, Some(Measure::from_whole(50))).unwrap();
        assert_eq!(m.avg_interval, Some(Measure::from_whole(51)));
        assert_eq!(m.delta_ltol, Some(Measure::from_whole(1)));
    }

    #[test]
    fn test_single_mark_has_no_interval() {
        let p = piece(200.0, 0.0, &[10.0]);
        let m = evaluate_piece(&p, Some(Measure::from_whole(50))).unwrap();
        assert_eq!(m.avg_interval, None);
        assert_eq!(m.delta_ltol, None);
    }

    #[test]
    fn test_damage_exceeding_meter() {
        let err = evaluate_piece(&piece(10.0, 10.5, &[]), None).unwrap_err();
        assert_eq!(err.to_string(), "Damaged meter cannot exceed meter");
    }

    #[test]
    fn test_marks_not_increasing() {
        let err = evaluate_piece(&piece(200.0, 0.0, &[100.0, 50.0]), None).unwrap_err();
        assert_eq!(err.to_string(), "Marks must be strictly increasing");
    }

    #[test]
    fn test_mark_out_of_range() {
        let err = evaluate_piece(&piece(200.0, 0.0, &[10.0, 250.0]), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mark 250 out of range for piece meter 200"
        );
    }

    #[test]
    fn test_roll_label_key_order() {
        let row = PieceRow {
            id: "p1".into(),
            receive_id: "r1".into(),
            main_piece_no: 12,
            part_suffix: Some("A".into()),
            piece_label: "12A".into(),
            meter: Measure::from_whole(100),
            weight: None,
            damaged_meter: Measure::from_f64(0.5),
            damaged_weight: None,
            net_meter: Measure::from_f64(99.5),
            net_weight: None,
            reed: None,
            pick: None,
            width: None,
            avg_interval: None,
            delta_ltol: None,
            remarks: None,
            marks: vec![],
            created_at: Utc::now(),
        };
        assert_eq!(
            roll_label("B-25-0001", "D-7", &row),
            r#"{"beam_no":"B-25-0001","design_no":"D-7","main_piece_no":12,"piece_label":"12A","net_meter":99.5}"#
        );
        assert_eq!(recompute_net(&row), row.net_meter);
    }

    #[test]
    fn test_roll_label_whole_meters_have_no_fraction() {
        let row = PieceRow {
            id: "p2".into(),
            receive_id: "r1".into(),
            main_piece_no: 12,
            part_suffix: Some("A".into()),
            piece_label: "12A".into(),
            meter: Measure::from_whole(1000),
            weight: None,
            damaged_meter: Measure::zero(),
            damaged_weight: None,
            net_meter: Measure::from_whole(1000),
            net_weight: None,
            reed: None,
            pick: None,
            width: None,
            avg_interval: None,
            delta_ltol: None,
            remarks: None,
            marks: vec![],
            created_at: Utc::now(),
        };
        assert_eq!(
            roll_label("B-25-0001", "D-1", &row),
            r#"{"beam_no":"B-25-0001","design_no":"D-1","main_piece_no":12,"piece_label":"12A","net_meter":1000}"#
        );
    }
}
