//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `keepnote_core` linkage and database bootstrap.
//! - Seed default owners/notes and print one summary line per owner.
//!
//! Configuration comes from environment variables:
//! - `KEEPNOTE_DB`: database path (default `keepnote.sqlite3`).
//! - `KEEPNOTE_LOG_LEVEL`: `trace|debug|info|warn|error`.
//! - `KEEPNOTE_LOG_DIR`: absolute log directory; file logging is off when unset.
//! - `KEEPNOTE_SEED_OWNERS`: comma-separated owner names (default `a,b`).

use keepnote_core::db::open_db;
use keepnote_core::{
    default_log_level, ensure_default_data, init_logging, logging_status, ListOutcome,
    NoteService, OwnerId, SqliteNoteStore, SqliteOwnerRepository, SystemClock,
};
use log::error;
use std::error::Error;
use std::process::ExitCode;

const DEFAULT_DB_PATH: &str = "keepnote.sqlite3";
const DEFAULT_SEED_OWNERS: &str = "a,b";
const SEED_NOTES_PER_OWNER: usize = 3;

struct CliConfig {
    db_path: String,
    log_level: String,
    log_dir: Option<String>,
    seed_owners: Vec<OwnerId>,
}

impl CliConfig {
    fn from_env() -> Result<Self, Box<dyn Error>> {
        let seed_owners = env_or("KEEPNOTE_SEED_OWNERS", DEFAULT_SEED_OWNERS)
            .split(',')
            .filter(|name| !name.trim().is_empty())
            .map(OwnerId::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            db_path: env_or("KEEPNOTE_DB", DEFAULT_DB_PATH),
            log_level: env_or("KEEPNOTE_LOG_LEVEL", default_log_level()),
            log_dir: std::env::var("KEEPNOTE_LOG_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty()),
            seed_owners,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn run(config: &CliConfig) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir)?;
    }

    println!("keepnote_core ping={}", keepnote_core::ping());
    println!("keepnote_core version={}", keepnote_core::core_version());
    match logging_status() {
        Some((level, dir)) => println!("logging level={level} dir={}", dir.display()),
        None => println!("logging disabled"),
    }

    let conn = open_db(&config.db_path)?;
    let owners = SqliteOwnerRepository::try_new(&conn)?;
    let service = NoteService::new(SqliteNoteStore::try_new(&conn)?);

    let reports = ensure_default_data(
        &owners,
        service.store(),
        &SystemClock,
        &config.seed_owners,
        SEED_NOTES_PER_OWNER,
    )?;

    for report in reports {
        if let ListOutcome::Fresh { notes, marker } = service.list(&report.owner, None)? {
            println!(
                "owner={} owner_created={} seeded={} notes={} marker={marker}",
                report.owner,
                report.owner_created,
                report.notes_seeded,
                notes.len()
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let result = CliConfig::from_env().and_then(|config| run(&config));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("keepnote_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}
