use anyhow::Context;
use rusqlite::Connection;

/// Embedded, ordered by name. The binary runs standalone, so no migrations
/// directory on disk.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_call_log.sql",
    "CREATE TABLE IF NOT EXISTS call_log (
        call_sid TEXT PRIMARY KEY,
        caller TEXT,
        started_at TEXT NOT NULL,
        ended_at TEXT NOT NULL,
        transcript TEXT NOT NULL,
        appointment_id TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_call_log_started ON call_log(started_at);",
)];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}
