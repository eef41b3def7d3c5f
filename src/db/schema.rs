//! Embedded SQL migrations, applied in order and recorded in `schema_migrations`.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

/// `(version, name, sql)`, in application order.
const MIGRATIONS: &[(&str, &str, &str)] = &[
    ("001", "initial", include_str!("migrations/001_initial.sql")),
    (
        "002",
        "meeting_version",
        include_str!("migrations/002_meeting_version.sql"),
    ),
];

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    let mut applied = applied_versions(conn)?;

    // A meetings table with no recorded versions predates tracking: it is the 001 schema
    if applied.is_empty() && table_exists(conn, "meetings")? {
        record(conn, "001", "initial")?;
        tracing::info!("Existing database without migration history, baselined at 001");
        applied.push("001".to_string());
    }

    for &(version, name, sql) in MIGRATIONS {
        if applied.iter().any(|v| v == version) {
            continue;
        }
        tracing::info!("Applying migration {} ({})", version, name);

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("Migration {} ({}) failed", version, name))?;
        record(&tx, version, name)?;
        tx.commit()?;
    }

    Ok(())
}

fn applied_versions(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(versions)
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn record(conn: &Connection, version: &str, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        (version, name, chrono::Utc::now().to_rfc3339()),
    )?;
    Ok(())
}
