use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::util::now_utc_string;

pub(super) const DB_SCHEMA_VERSION: &str = "1.0.0";

/// Long enough for another ingest worker to finish its write transaction.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy_timeout")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub(super) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
              id TEXT PRIMARY KEY,
              document_hash TEXT NOT NULL UNIQUE,
              file_name TEXT NOT NULL,
              file_path TEXT NOT NULL,
              case_name TEXT NOT NULL,
              first_seen_at TEXT NOT NULL,
              last_duplicate_found TEXT,
              metadata_json TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE IF NOT EXISTS duplicate_locations (
              document_hash TEXT NOT NULL,
              file_path TEXT NOT NULL,
              case_name TEXT NOT NULL,
              found_at TEXT NOT NULL,
              UNIQUE (document_hash, file_path, case_name),
              FOREIGN KEY (document_hash) REFERENCES documents(document_hash) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_documents_case ON documents(case_name);
            CREATE INDEX IF NOT EXISTS idx_duplicate_locations_case ON duplicate_locations(case_name);
            ",
        )
        .context("failed to create registry schema")?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now_utc_string()],
    )?;

    Ok(())
}
