//! # loomtrack-db: Database Layer for Loomtrack
//!
//! Every engine operation that touches the store lives here: sequence
//! counters, the beam inventory ledger, issues, receive batches and
//! reconciliation. SQLite via sqlx; the rules come from `loomtrack-core`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Loomtrack Data Flow                              │
//! │                                                                         │
//! │  HTTP layer (confirm receive batch)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   loomtrack-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ SequenceRepo   │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InwardRepo     │   │ 001_initial  │  │   │
//! │  │   │ Overproduction│    │ IssueRepo      │   │  _schema.sql │  │   │
//! │  │   │ policy        │    │ ReceiveRepo    │   │              │  │   │
//! │  │   │               │    │ Reconciliation │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Engine configuration (TOML file + environment)
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use loomtrack_db::{Database, EngineConfig};
//!
//! let config = EngineConfig::load(Some(Path::new("loomtrack.toml")))?;
//! let db = Database::open(&config).await?;
//!
//! let inward = db.inwards().create_inward(new_inward, Some("clerk")).await?;
//! let outcome = db.reconciliation().confirm(&batch_id, Some("clerk")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, EngineConfig};
pub use error::{DbError, DbResult, LOOM_BUSY_MESSAGE};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::inward::InwardRepository;
pub use repository::issue::IssueRepository;
pub use repository::receive::ReceiveRepository;
pub use repository::reconciliation::ReconciliationRepository;
pub use repository::sequence::SequenceRepository;
