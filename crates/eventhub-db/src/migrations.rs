use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE IF NOT EXISTS users (
                username    TEXT PRIMARY KEY,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS events (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                fee         INTEGER NOT NULL CHECK (fee >= 0)
            );

            -- The primary key doubles as the covering index for
            -- lookups by username: no rowid, so no base-table visit.
            CREATE TABLE IF NOT EXISTS registrations (
                username    TEXT NOT NULL,
                event_id    INTEGER NOT NULL REFERENCES events(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (username, event_id)
            ) WITHOUT ROWID;

            CREATE INDEX IF NOT EXISTS idx_registrations_event
                ON registrations(event_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
