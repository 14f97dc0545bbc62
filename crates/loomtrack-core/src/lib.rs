//! # loomtrack-core: Pure Domain Logic for Loomtrack
//!
//! This crate is the **heart** of Loomtrack. It contains the beam-sizing
//! domain rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Loomtrack Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              HTTP layer (routing, auth, schema checks)          │   │
//! │  │   POST /inward ──► POST /issue ──► POST /receive ──► confirm    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ loomtrack-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  measure  │  │ lifecycle │  │ reconcile │  │   │
//! │  │   │   Beam    │  │  Measure  │  │  status   │  │  assess   │  │   │
//! │  │   │   Issue   │  │ 1/10000 m │  │  tables   │  │  totals   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │  fiscal   │  │yield_calc │  │   piece   │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                loomtrack-db (Database Layer)                    │   │
//! │  │       SQLite, sequences, beam locks, repositories               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (InwardBatch, Beam, BeamIssue, ReceiveBatch, ...)
//! - [`measure`] - Fixed-point lengths and weights
//! - [`fiscal`] - April-start fiscal years and business codes
//! - [`lifecycle`] - Status transition tables
//! - [`yield_calc`] - Expected fabric and roll counts of an issue
//! - [`piece`] - Piece metrics and roll labels
//! - [`reconcile`] - Overproduction policy and confirmation decisions
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use loomtrack_core::measure::Measure;
//! use loomtrack_core::reconcile::{assess, Disposition, OverproductionPolicy};
//!
//! // A 1000 m beam already fully consumed receives 50 m more
//! let d = assess(
//!     Measure::from_whole(50),
//!     Measure::zero(),
//!     Measure::from_whole(1000),
//!     &OverproductionPolicy::default(),
//! );
//!
//! // 2% of 1000 m is 20 m, and auto-accept is off: a supervisor decides
//! assert!(matches!(d, Disposition::NeedsApproval { .. }));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fiscal;
pub mod lifecycle;
pub mod measure;
pub mod piece;
pub mod reconcile;
pub mod types;
pub mod validation;
pub mod yield_calc;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use loomtrack_core::Measure` instead of
// `use loomtrack_core::measure::Measure`

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use fiscal::FiscalYear;
pub use measure::Measure;
pub use reconcile::{ApprovalOutcome, ConfirmOutcome, OverproductionPolicy, ReceiveTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Sequence purpose of beam numbers (fiscal-year scoped).
pub const SEQ_BEAM: &str = "beam";

/// Sequence purpose of inward numbers (fiscal-year scoped).
pub const SEQ_INWARD: &str = "inward";

/// Sequence purpose of main piece numbers (global).
pub const SEQ_MAIN_PIECE: &str = "main_piece";
