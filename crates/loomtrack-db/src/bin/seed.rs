//! # Seed Data Generator
//!
//! Walks a demo beam through the whole workflow for development.
//!
//! ## Usage
//! ```bash
//! # Seed the database named in loomtrack.toml (or ./loomtrack.db)
//! cargo run -p loomtrack-db --bin seed
//!
//! # Explicit config file
//! cargo run -p loomtrack-db --bin seed -- --config ./loomtrack.toml
//!
//! # Specify database path
//! cargo run -p loomtrack-db --bin seed -- --db ./data/loomtrack.db
//! ```
//!
//! ## Generated Data
//! - One inward batch with three beams on set `SET-DEMO`
//! - The first beam issued to `LOOM-01` and started
//! - One receive batch with three pieces, confirmed into rolls
//!
//! Every run creates a fresh inward; codes continue from the stored counters.

use std::env;
use std::path::PathBuf;

use loomtrack_core::{
    ConfirmOutcome, Measure, NewBeamDetail, NewInward, NewIssue, NewPiece, NewReceive,
};
use loomtrack_db::{Database, EngineConfig};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Sizing meters of the demo beams.
const DEMO_BEAMS: &[i64] = &[1200, 950, 1100];

/// (meter, damaged meter, marks) per demo piece.
const DEMO_PIECES: &[(i64, i64, &[i64])] = &[
    (310, 0, &[0, 100, 205, 310]),
    (295, 5, &[0, 98, 197, 295]),
    (150, 0, &[]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Loomtrack Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Engine config file (TOML)");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();

    let mut config = EngineConfig::load(config_path.as_deref())?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🌱 Loomtrack Seed Data Generator");
    println!("================================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::open(&config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Inward
    let inward = db
        .inwards()
        .create_inward(
            NewInward {
                sizing_party_id: Some("PARTY-SIZING".into()),
                details: DEMO_BEAMS
                    .iter()
                    .map(|&meter| NewBeamDetail {
                        beam_name_id: None,
                        set_number: "SET-DEMO".into(),
                        sizing_meter: Measure::from_whole(meter),
                        ltol_meter: Some(Measure::from_whole(100)),
                    })
                    .collect(),
                ..NewInward::default()
            },
            Some("seed"),
        )
        .await?;

    println!();
    println!("✓ Inward {}", inward.inward.inward_number);
    for beam in &inward.beams {
        println!("  {} {} m", beam.beam_number, beam.total_meter);
    }

    // Issue and start
    let beam = &inward.beams[0];
    let issue = db
        .issues()
        .create(
            NewIssue {
                loom_id: Some("LOOM-01".into()),
                design_id: Some("DSN-100".into()),
                roll_length: Some(Measure::from_whole(100)),
                width_split_factor: 2,
                grey_ltol: Some(Measure::from_whole(98)),
                ..NewIssue::for_beam(beam.id.clone())
            },
            Some("seed"),
        )
        .await?;
    let issue = db.issues().start(&issue.id).await?;

    println!();
    println!(
        "✓ Issued {} to LOOM-01 (expected rolls: {})",
        beam.beam_number,
        issue
            .expected_roll_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".into())
    );

    // Receive
    let draft = db
        .receives()
        .create_draft(
            NewReceive {
                beam_id: beam.id.clone(),
                design_id: "DSN-100".into(),
                issue_id: Some(issue.id.clone()),
                loom_id: None,
                note: Some("seed".into()),
            },
            Some("seed"),
        )
        .await?;

    for &(meter, damaged, marks) in DEMO_PIECES {
        let main_piece_no = db.receives().next_piece_number().await?;
        let piece = db
            .receives()
            .add_piece(
                &draft.id,
                NewPiece {
                    main_piece_no,
                    meter: Measure::from_whole(meter),
                    damaged_meter: Measure::from_whole(damaged),
                    marks: marks.iter().map(|&m| Measure::from_whole(m)).collect(),
                    ..NewPiece::default()
                },
            )
            .await?;
        info!(piece = %piece.piece_label, net = %piece.net_meter, "Added demo piece");
    }

    let outcome = db.reconciliation().confirm(&draft.id, Some("seed")).await?;

    println!();
    println!("✓ Receive {}", outcome.batch().receive_number);
    match outcome {
        ConfirmOutcome::Confirmed {
            beam,
            totals,
            rolls,
            ..
        } => {
            println!("  Net received: {} m in {} rolls", totals.net_meter, rolls.len());
            println!("  Beam remaining: {} m", beam.remaining_meter);
        }
        ConfirmOutcome::NeedsApproval { adjustment, .. } => {
            println!("  Held for approval: over by {} m", adjustment.over_by);
        }
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Initializes the tracing subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,loomtrack=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}
