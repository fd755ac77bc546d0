//! Database migrations.
//!
//! Migrations are run in order and tracked in the `migrations` table.

use crate::DatabaseResult;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
///
/// The whole pass holds the write lock, so connections opening the same
/// fresh file at once apply each migration exactly once.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = tx.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version >= CURRENT_VERSION {
        tx.commit()?;
        debug!(current_version, "Schema up to date");
        return Ok(());
    }

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_codes(&tx)?;
    }
    if current_version < 2 {
        migrate_v2_used_index(&tx)?;
    }

    tx.commit()?;
    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: issued codes, one row per (kind, code).
fn migrate_v1_codes(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v1: codes");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS codes (
            kind TEXT NOT NULL CHECK (kind IN ('beta', 'verify')),
            code TEXT NOT NULL,
            used INTEGER NOT NULL DEFAULT 0 CHECK (used IN (0, 1)),
            created_at TEXT NOT NULL,
            used_at TEXT,
            PRIMARY KEY (kind, code)
        ) WITHOUT ROWID;
        ",
    )?;

    record_migration(conn, 1, "codes")
}

/// V2: index for per-kind usage counts.
fn migrate_v2_used_index(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v2: used index");

    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_codes_kind_used
            ON codes(kind, used);
        ",
    )?;

    record_migration(conn, 2, "codes_kind_used_index")
}
