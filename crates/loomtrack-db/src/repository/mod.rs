//! # Repository Module
//!
//! Database repository implementations for Loomtrack.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.reconciliation().confirm(&batch_id, Some("clerk"))         │
//! │       ▼                                                                 │
//! │  ReconciliationRepository                                              │
//! │  ├── lock_beam / fetch_receive / load_pieces   (shared helpers)        │
//! │  ├── loomtrack_core::reconcile::assess         (pure decision)         │
//! │  └── finalize_receive                          (rolls + CONFIRMED)     │
//! │       │                                                                 │
//! │       │  SQL inside one transaction                                     │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Repositories own SQL and transactions; every rule they apply comes    │
//! │  from loomtrack-core.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SequenceRepository`](sequence::SequenceRepository) - Running numbers per fiscal year
//! - [`InwardRepository`](inward::InwardRepository) - Inward batches and beams
//! - [`IssueRepository`](issue::IssueRepository) - Beam-to-loom issues
//! - [`ReceiveRepository`](receive::ReceiveRepository) - Draft batches and pieces
//! - [`ReconciliationRepository`](reconciliation::ReconciliationRepository) - Confirm, approve, cancel

pub mod inward;
pub mod issue;
pub mod receive;
pub mod reconciliation;
pub mod sequence;

mod rows;
