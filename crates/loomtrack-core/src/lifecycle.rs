//! # Lifecycle Module
//!
//! Exhaustive status transition tables for every stateful entity.
//!
//! Each `apply` matches on `(status, event)` and lists the legal moves
//! explicitly; any other pair is an [`CoreError::InvalidTransition`].
//! Repositories call these before writing a new status, so the tables here
//! are the single source of truth for what may happen to an entity.
//!
//! ## Tables
//! ```text
//! ┌──────────────┬──────────────────┬────────────────────────────────────┐
//! │ Entity       │ Event            │ Move                               │
//! ├──────────────┼──────────────────┼────────────────────────────────────┤
//! │ InwardBatch  │ Cancel           │ OPEN → CANCELLED                   │
//! ├──────────────┼──────────────────┼────────────────────────────────────┤
//! │ Beam         │ Issue            │ IN_STOCK → ISSUED                  │
//! │              │ Release          │ ISSUED → IN_STOCK                  │
//! │              │ Close            │ ISSUED | IN_STOCK → CLOSED         │
//! │              │ Cancel           │ IN_STOCK → CANCELLED               │
//! ├──────────────┼──────────────────┼────────────────────────────────────┤
//! │ BeamIssue    │ Start            │ WAITING → RUNNING                  │
//! │              │ Interrupt        │ RUNNING → INTERRUPTED              │
//! │              │ Complete         │ any but COMPLETED → COMPLETED      │
//! ├──────────────┼──────────────────┼────────────────────────────────────┤
//! │ ReceiveBatch │ Finalize         │ DRAFT → CONFIRMED                  │
//! │              │ HoldForApproval  │ DRAFT → PENDING_APPROVAL           │
//! │              │ Approve          │ PENDING_APPROVAL → CONFIRMED       │
//! │              │ Reject           │ PENDING_APPROVAL → DRAFT           │
//! │              │ Cancel           │ DRAFT | PENDING_APPROVAL → CANCELLED│
//! ├──────────────┼──────────────────┼────────────────────────────────────┤
//! │ Adjustment   │ resolve(action)  │ pending → increase_total |         │
//! │              │                  │           allow_negative | rejected│
//! └──────────────┴──────────────────┴────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{
    AdjustmentAction, ApprovalAction, BeamStatus, InwardStatus, IssueStatus, ReceiveStatus,
};

fn invalid(entity: &'static str, from: &'static str, action: &'static str) -> CoreError {
    CoreError::InvalidTransition {
        entity,
        from: from.to_string(),
        action,
    }
}

// =============================================================================
// Inward Batch
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InwardEvent {
    Cancel,
}

impl InwardStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            InwardStatus::Open => "OPEN",
            InwardStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn apply(self, event: InwardEvent) -> CoreResult<InwardStatus> {
        match (self, event) {
            (InwardStatus::Open, InwardEvent::Cancel) => Ok(InwardStatus::Cancelled),
            (InwardStatus::Cancelled, InwardEvent::Cancel) => {
                Err(invalid("Inward", self.label(), "cancel"))
            }
        }
    }
}

// =============================================================================
// Beam
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamEvent {
    /// Assigned to a loom.
    Issue,
    /// Issue interrupted; back to stock.
    Release,
    /// Fully consumed.
    Close,
    /// Owning inward batch cancelled.
    Cancel,
}

impl BeamEvent {
    const fn action(&self) -> &'static str {
        match self {
            BeamEvent::Issue => "issue",
            BeamEvent::Release => "release",
            BeamEvent::Close => "close",
            BeamEvent::Cancel => "cancel",
        }
    }
}

impl BeamStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            BeamStatus::InStock => "IN_STOCK",
            BeamStatus::Issued => "ISSUED",
            BeamStatus::Closed => "CLOSED",
            BeamStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn apply(self, event: BeamEvent) -> CoreResult<BeamStatus> {
        match (self, event) {
            (BeamStatus::InStock, BeamEvent::Issue) => Ok(BeamStatus::Issued),
            (BeamStatus::Issued, BeamEvent::Release) => Ok(BeamStatus::InStock),
            (BeamStatus::Issued | BeamStatus::InStock, BeamEvent::Close) => Ok(BeamStatus::Closed),
            (BeamStatus::InStock, BeamEvent::Cancel) => Ok(BeamStatus::Cancelled),
            (from, event) => Err(invalid("Beam", from.label(), event.action())),
        }
    }
}

// =============================================================================
// Beam Issue
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueEvent {
    Start,
    Interrupt,
    Complete,
}

impl IssueEvent {
    const fn action(&self) -> &'static str {
        match self {
            IssueEvent::Start => "start",
            IssueEvent::Interrupt => "interrupt",
            IssueEvent::Complete => "complete",
        }
    }
}

impl IssueStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            IssueStatus::Waiting => "WAITING",
            IssueStatus::Running => "RUNNING",
            IssueStatus::Interrupted => "INTERRUPTED",
            IssueStatus::Completed => "COMPLETED",
        }
    }

    pub fn apply(self, event: IssueEvent) -> CoreResult<IssueStatus> {
        match (self, event) {
            (IssueStatus::Waiting, IssueEvent::Start) => Ok(IssueStatus::Running),
            (IssueStatus::Running, IssueEvent::Interrupt) => Ok(IssueStatus::Interrupted),
            (
                IssueStatus::Waiting | IssueStatus::Running | IssueStatus::Interrupted,
                IssueEvent::Complete,
            ) => Ok(IssueStatus::Completed),
            (from, event) => Err(invalid("Issue", from.label(), event.action())),
        }
    }
}

// =============================================================================
// Receive Batch
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveEvent {
    /// Confirmation within capacity (or auto-accepted).
    Finalize,
    /// Confirmation escalated to a supervisor.
    HoldForApproval,
    Approve,
    Reject,
    Cancel,
}

impl ReceiveEvent {
    const fn action(&self) -> &'static str {
        match self {
            ReceiveEvent::Finalize => "confirm",
            ReceiveEvent::HoldForApproval => "confirm",
            ReceiveEvent::Approve => "approve",
            ReceiveEvent::Reject => "reject",
            ReceiveEvent::Cancel => "cancel",
        }
    }
}

impl ReceiveStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            ReceiveStatus::Draft => "DRAFT",
            ReceiveStatus::PendingApproval => "PENDING_APPROVAL",
            ReceiveStatus::Confirmed => "CONFIRMED",
            ReceiveStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn apply(self, event: ReceiveEvent) -> CoreResult<ReceiveStatus> {
        match (self, event) {
            (ReceiveStatus::Draft, ReceiveEvent::Finalize) => Ok(ReceiveStatus::Confirmed),
            (ReceiveStatus::Draft, ReceiveEvent::HoldForApproval) => {
                Ok(ReceiveStatus::PendingApproval)
            }
            (ReceiveStatus::PendingApproval, ReceiveEvent::Approve) => Ok(ReceiveStatus::Confirmed),
            (ReceiveStatus::PendingApproval, ReceiveEvent::Reject) => Ok(ReceiveStatus::Draft),
            (ReceiveStatus::Draft | ReceiveStatus::PendingApproval, ReceiveEvent::Cancel) => {
                Ok(ReceiveStatus::Cancelled)
            }
            (from, event) => Err(invalid("Receive batch", from.label(), event.action())),
        }
    }
}

// =============================================================================
// Adjustment
// =============================================================================

impl AdjustmentAction {
    pub const fn label(&self) -> &'static str {
        match self {
            AdjustmentAction::Pending => "pending",
            AdjustmentAction::IncreaseTotal => "increase_total",
            AdjustmentAction::AllowNegative => "allow_negative",
            AdjustmentAction::Rejected => "rejected",
        }
    }

    /// Resolves a pending adjustment with a supervisor decision.
    pub fn resolve(self, decision: ApprovalAction) -> CoreResult<AdjustmentAction> {
        match (self, decision) {
            (AdjustmentAction::Pending, ApprovalAction::IncreaseTotal) => {
                Ok(AdjustmentAction::IncreaseTotal)
            }
            (AdjustmentAction::Pending, ApprovalAction::AllowNegative) => {
                Ok(AdjustmentAction::AllowNegative)
            }
            (AdjustmentAction::Pending, ApprovalAction::Reject) => Ok(AdjustmentAction::Rejected),
            (from, _) => Err(invalid("Adjustment", from.label(), "approve")),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_issue_table() {
        use IssueEvent::*;
        use IssueStatus::*;

        assert_eq!(Waiting.apply(Start).unwrap(), Running);
        assert_eq!(Running.apply(Interrupt).unwrap(), Interrupted);
        assert_eq!(Running.apply(Complete).unwrap(), Completed);
        assert_eq!(Waiting.apply(Complete).unwrap(), Completed);
        assert_eq!(Interrupted.apply(Complete).unwrap(), Completed);

        for (from, event) in [
            (Waiting, Interrupt),
            (Running, Start),
            (Interrupted, Start),
            (Interrupted, Interrupt),
            (Completed, Complete),
            (Completed, Interrupt),
            (Completed, Start),
        ] {
            let err = from.apply(event).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidState, "{:?} {:?}", from, event);
        }
    }

    #[test]
    fn test_complete_twice_message() {
        let done = IssueStatus::Running.apply(IssueEvent::Complete).unwrap();
        let err = done.apply(IssueEvent::Complete).unwrap_err();
        assert_eq!(err.to_string(), "Issue is COMPLETED, cannot complete");
    }

    #[test]
    fn test_beam_table() {
        use BeamEvent::*;
        use BeamStatus::*;

        assert_eq!(InStock.apply(Issue).unwrap(), Issued);
        assert_eq!(Issued.apply(Release).unwrap(), InStock);
        assert_eq!(Issued.apply(Close).unwrap(), Closed);
        assert_eq!(InStock.apply(Close).unwrap(), Closed);
        assert_eq!(InStock.apply(Cancel).unwrap(), Cancelled);

        assert!(Issued.apply(Issue).is_err());
        assert!(Issued.apply(Cancel).is_err());
        assert!(Cancelled.apply(Issue).is_err());
        assert!(Closed.apply(Release).is_err());
    }

    #[test]
    fn test_receive_table() {
        use ReceiveEvent::*;
        use ReceiveStatus::*;

        assert_eq!(Draft.apply(Finalize).unwrap(), Confirmed);
        assert_eq!(Draft.apply(HoldForApproval).unwrap(), PendingApproval);
        assert_eq!(PendingApproval.apply(Approve).unwrap(), Confirmed);
        assert_eq!(PendingApproval.apply(Reject).unwrap(), Draft);
        assert_eq!(Draft.apply(Cancel).unwrap(), Cancelled);
        assert_eq!(PendingApproval.apply(Cancel).unwrap(), Cancelled);

        assert!(Confirmed.apply(Cancel).is_err());
        assert!(PendingApproval.apply(Finalize).is_err());
        assert!(Draft.apply(Approve).is_err());
        assert!(Cancelled.apply(Finalize).is_err());
    }

    #[test]
    fn test_inward_cancel_once() {
        let cancelled = InwardStatus::Open.apply(InwardEvent::Cancel).unwrap();
        assert_eq!(cancelled, InwardStatus::Cancelled);
        assert!(cancelled.apply(InwardEvent::Cancel).is_err());
    }

    #[test]
    fn test_adjustment_resolution() {
        assert_eq!(
            AdjustmentAction::Pending
                .resolve(ApprovalAction::AllowNegative)
                .unwrap(),
            AdjustmentAction::AllowNegative
        );
        assert_eq!(
            AdjustmentAction::Pending.resolve(ApprovalAction::Reject).unwrap(),
            AdjustmentAction::Rejected
        );
        let err = AdjustmentAction::Rejected
            .resolve(ApprovalAction::IncreaseTotal)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}
