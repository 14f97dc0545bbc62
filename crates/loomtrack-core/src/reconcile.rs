//! # Reconciliation Rules
//!
//! Pure decision logic used when a receive batch is confirmed against its
//! beam. The database layer gathers the numbers under a beam lock, asks
//! [`assess`] what to do, and writes the outcome.
//!
//! ## Confirmation Decision
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  net = Σ piece.net_meter        remaining = beam.remaining_meter       │
//! │                                                                         │
//! │  net ≤ remaining ───────────────────────────► WithinCapacity           │
//! │       │                                       rolls, remaining -= net  │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  over_by = net − remaining                                             │
//! │  tolerance = total × tolerance_percent / 100                           │
//! │       │                                                                 │
//! │  over_by ≤ tolerance AND auto-accept ───────► AutoAccepted             │
//! │       │                                       total += over_by,        │
//! │       │ no                                    remaining = 0, rolls     │
//! │       ▼                                                                 │
//! │  NeedsApproval ── pending adjustment, batch PENDING_APPROVAL           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::measure::Measure;
use crate::types::{Beam, BeamAdjustment, PieceRow, ReceiveBatch, Roll};

/// Default overproduction tolerance, percent of the beam's total length.
pub const DEFAULT_TOLERANCE_PERCENT: f64 = 2.0;

/// Adjustment note of an auto-accepted overproduction.
pub const NOTE_AUTO_ACCEPTED: &str = "Auto-accepted within tolerance";

/// Adjustment note of an overproduction waiting for a supervisor.
pub const NOTE_PENDING: &str = "Overproduction pending approval";

/// Suffix appended to the note of a rejected adjustment.
pub const NOTE_REJECTED_SUFFIX: &str = " | rejected";

/// Actor recorded as approver of auto-accepted adjustments.
pub const SYSTEM_ACTOR: &str = "system";

// =============================================================================
// Policy
// =============================================================================

/// How much overproduction is tolerated and whether it is accepted silently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverproductionPolicy {
    pub tolerance_percent: f64,
    pub auto_accept_within_tolerance: bool,
}

impl Default for OverproductionPolicy {
    fn default() -> Self {
        OverproductionPolicy {
            tolerance_percent: DEFAULT_TOLERANCE_PERCENT,
            auto_accept_within_tolerance: false,
        }
    }
}

impl OverproductionPolicy {
    /// Allowed overproduction for a beam of the given total length.
    pub fn allowance(&self, total: Measure) -> Measure {
        total.percent(self.tolerance_percent)
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Sums over the pieces of a receive batch.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReceiveTotals {
    pub piece_count: usize,
    pub total_meter: Measure,
    pub total_damaged_meter: Measure,
    pub net_meter: Measure,
    pub total_weight: Measure,
    pub total_damaged_weight: Measure,
    /// Absent when no piece reported a weight.
    pub net_weight: Option<Measure>,
}

impl ReceiveTotals {
    pub fn from_pieces(pieces: &[PieceRow]) -> Self {
        let mut totals = ReceiveTotals {
            piece_count: pieces.len(),
            ..ReceiveTotals::default()
        };

        for piece in pieces {
            totals.total_meter += piece.meter;
            totals.total_damaged_meter += piece.damaged_meter;
            if let Some(weight) = piece.weight {
                totals.total_weight += weight;
            }
            if let Some(damaged) = piece.damaged_weight {
                totals.total_damaged_weight += damaged;
            }
        }

        totals.net_meter = totals.total_meter - totals.total_damaged_meter;
        if !totals.total_weight.is_zero() {
            totals.net_weight = Some(totals.total_weight - totals.total_damaged_weight);
        }
        totals
    }
}

// =============================================================================
// Assessment
// =============================================================================

/// What confirmation should do with a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    /// Net fits in what is left on the beam.
    WithinCapacity { new_remaining: Measure },
    /// Small overproduction absorbed by growing the beam's total.
    AutoAccepted { over_by: Measure, new_total: Measure },
    /// Overproduction that needs a supervisor decision.
    NeedsApproval { over_by: Measure },
}

/// Decides how to confirm `net` against a beam.
///
/// ```rust
/// use loomtrack_core::measure::Measure;
/// use loomtrack_core::reconcile::{assess, Disposition, OverproductionPolicy};
///
/// let policy = OverproductionPolicy::default();
/// let d = assess(
///     Measure::from_whole(50),
///     Measure::zero(),
///     Measure::from_whole(1000),
///     &policy,
/// );
/// assert_eq!(d, Disposition::NeedsApproval { over_by: Measure::from_whole(50) });
/// ```
pub fn assess(
    net: Measure,
    remaining_before: Measure,
    total: Measure,
    policy: &OverproductionPolicy,
) -> Disposition {
    if net <= remaining_before {
        return Disposition::WithinCapacity {
            new_remaining: remaining_before - net,
        };
    }

    let over_by = net - remaining_before;
    if policy.auto_accept_within_tolerance && over_by <= policy.allowance(total) {
        Disposition::AutoAccepted {
            over_by,
            new_total: total + over_by,
        }
    } else {
        Disposition::NeedsApproval { over_by }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of confirming a receive batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConfirmOutcome {
    /// Rolls created; `adjustment` is set when overproduction was auto-accepted.
    Confirmed {
        batch: ReceiveBatch,
        beam: Beam,
        totals: ReceiveTotals,
        rolls: Vec<Roll>,
        adjustment: Option<BeamAdjustment>,
    },
    /// A pending adjustment was recorded; nothing else changed on the beam.
    NeedsApproval {
        batch: ReceiveBatch,
        totals: ReceiveTotals,
        adjustment: BeamAdjustment,
    },
}

impl ConfirmOutcome {
    pub fn batch(&self) -> &ReceiveBatch {
        match self {
            ConfirmOutcome::Confirmed { batch, .. } | ConfirmOutcome::NeedsApproval { batch, .. } => {
                batch
            }
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmOutcome::Confirmed { .. })
    }
}

/// Result of a supervisor decision on a pending adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Approved {
        adjustment: BeamAdjustment,
        batch: ReceiveBatch,
        beam: Beam,
        rolls: Vec<Roll>,
    },
    /// Batch returned to DRAFT for correction.
    Rejected {
        adjustment: BeamAdjustment,
        batch: ReceiveBatch,
    },
}

// =============================================================================
// Unit Tests
// =============================================================================
