mod db_setup;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::{debug, info, warn};

use crate::model::{DocumentRecord, DuplicateLocation, Metadata, RegistryStats};
use crate::util::{ensure_directory, hash_prefix, now_utc_string, sha256_hex};

use db_setup::{configure_connection, ensure_schema};

/// Content-hash registry of every document seen, with where it was seen.
///
/// Lookups and writes are fail-open: backend failures are logged and
/// reported as "not found" / `false` / `None` / `0` so ingestion continues.
pub struct DeduplicationRegistry {
    connection: Mutex<Connection>,
}

pub fn calculate_document_hash(bytes: &[u8]) -> String {
    sha256_hex(bytes)
}

impl DeduplicationRegistry {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_directory(parent)?;
            }
        }

        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open registry db {}", db_path.display()))?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory registry db")?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        configure_connection(&connection)?;
        ensure_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| anyhow!("registry connection lock poisoned"))
    }

    pub fn check_document_exists(&self, document_hash: &str) -> (bool, Option<DocumentRecord>) {
        let lookup = self
            .lock()
            .and_then(|connection| load_record(&connection, document_hash));

        match lookup {
            Ok(Some(record)) => {
                debug!(hash = hash_prefix(document_hash), "document already registered");
                (true, Some(record))
            }
            Ok(None) => (false, None),
            Err(err) => {
                warn!(
                    hash = hash_prefix(document_hash),
                    error = %err,
                    "registry lookup failed; treating document as new"
                );
                (false, None)
            }
        }
    }

    /// Inserts a record, or, when the hash is already known, keeps its
    /// identity and first-seen fields, replaces its metadata and records the
    /// new sighting.
    pub fn register_new_document(
        &self,
        document_hash: &str,
        file_name: &str,
        file_path: &str,
        case_name: &str,
        metadata: &Metadata,
    ) -> Option<DocumentRecord> {
        let result = self.lock().and_then(|mut connection| {
            let tx = connection.transaction()?;
            upsert_document(&tx, document_hash, file_name, file_path, case_name, metadata)?;
            let record = load_record(&tx, document_hash)?;
            tx.commit()?;
            Ok(record)
        });

        match result {
            Ok(record) => {
                info!(
                    hash = hash_prefix(document_hash),
                    case = case_name,
                    "registered document"
                );
                record
            }
            Err(err) => {
                warn!(
                    hash = hash_prefix(document_hash),
                    case = case_name,
                    error = %err,
                    "failed to register document"
                );
                None
            }
        }
    }

    /// Records another place the document was found. Never creates a record.
    pub fn add_duplicate_location(&self, document_hash: &str, file_path: &str, case_name: &str) -> bool {
        let result = self.lock().and_then(|mut connection| {
            let tx = connection.transaction()?;
            let known = record_exists(&tx, document_hash)?;
            if known {
                let now = now_utc_string();
                insert_location(&tx, document_hash, file_path, case_name, &now)?;
                tx.execute(
                    "UPDATE documents SET last_duplicate_found = ?2 WHERE document_hash = ?1",
                    params![document_hash, now],
                )?;
            }
            tx.commit()?;
            Ok(known)
        });

        match result {
            Ok(true) => {
                info!(
                    hash = hash_prefix(document_hash),
                    case = case_name,
                    "recorded duplicate location"
                );
                true
            }
            Ok(false) => {
                warn!(
                    hash = hash_prefix(document_hash),
                    case = case_name,
                    "duplicate location for unknown document ignored"
                );
                false
            }
            Err(err) => {
                warn!(
                    hash = hash_prefix(document_hash),
                    case = case_name,
                    error = %err,
                    "failed to record duplicate location"
                );
                false
            }
        }
    }

    /// Deletes every document first registered under `case_name`, plus that
    /// case's sightings of other documents. Returns the documents removed.
    pub fn cleanup_case(&self, case_name: &str) -> usize {
        let result = self.lock().and_then(|mut connection| {
            let tx = connection.transaction()?;
            let removed = tx
                .execute("DELETE FROM documents WHERE case_name = ?1", [case_name])
                .context("failed to delete case documents")?;
            tx.execute("DELETE FROM duplicate_locations WHERE case_name = ?1", [case_name])
                .context("failed to delete case sightings")?;
            tx.commit()?;
            Ok(removed)
        });

        match result {
            Ok(removed) => {
                info!(case = case_name, removed, "cleaned up case");
                removed
            }
            Err(err) => {
                warn!(case = case_name, error = %err, "case cleanup failed");
                0
            }
        }
    }

    pub fn case_documents(&self, case_name: &str) -> Vec<DocumentRecord> {
        let result = self.lock().and_then(|connection| {
            let hashes = {
                let mut statement = connection.prepare(
                    "SELECT document_hash FROM documents WHERE case_name = ?1 ORDER BY first_seen_at, id",
                )?;
                let hashes = statement
                    .query_map([case_name], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                hashes
            };

            let mut records = Vec::with_capacity(hashes.len());
            for hash in hashes {
                if let Some(record) = load_record(&connection, &hash)? {
                    records.push(record);
                }
            }
            Ok(records)
        });

        result.unwrap_or_else(|err| {
            warn!(case = case_name, error = %err, "failed to list case documents");
            Vec::new()
        })
    }

    pub fn stats(&self) -> RegistryStats {
        let result = self.lock().and_then(|connection| {
            let stats = connection.query_row(
                "SELECT
                   (SELECT COUNT(*) FROM documents),
                   (SELECT COUNT(*) FROM duplicate_locations),
                   (SELECT COUNT(DISTINCT case_name) FROM documents)",
                [],
                |row| {
                    Ok(RegistryStats {
                        documents: row.get(0)?,
                        sightings: row.get(1)?,
                        cases: row.get(2)?,
                    })
                },
            )?;
            Ok(stats)
        });

        result.unwrap_or_else(|err| {
            warn!(error = %err, "failed to read registry stats");
            RegistryStats::default()
        })
    }
}

fn record_id(document_hash: &str) -> String {
    let end = document_hash
        .char_indices()
        .nth(16)
        .map(|(index, _)| index)
        .unwrap_or(document_hash.len());
    format!("doc:{}", &document_hash[..end])
}

fn record_exists(connection: &Connection, document_hash: &str) -> Result<bool> {
    let found = connection
        .query_row(
            "SELECT 1 FROM documents WHERE document_hash = ?1",
            [document_hash],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn upsert_document(
    tx: &Transaction<'_>,
    document_hash: &str,
    file_name: &str,
    file_path: &str,
    case_name: &str,
    metadata: &Metadata,
) -> Result<()> {
    let known = record_exists(tx, document_hash)?;
    let now = now_utc_string();
    let metadata_json =
        serde_json::to_string(metadata).context("failed to serialize document metadata")?;

    tx.execute(
        "
        INSERT INTO documents(id, document_hash, file_name, file_path, case_name, first_seen_at, metadata_json)
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(document_hash) DO UPDATE SET
          metadata_json=excluded.metadata_json
        ",
        params![
            record_id(document_hash),
            document_hash,
            file_name,
            file_path,
            case_name,
            now,
            metadata_json
        ],
    )
    .context("failed to upsert document")?;

    let new_sighting = insert_location(tx, document_hash, file_path, case_name, &now)?;
    if known && new_sighting {
        tx.execute(
            "UPDATE documents SET last_duplicate_found = ?2 WHERE document_hash = ?1",
            params![document_hash, now],
        )?;
    }

    Ok(())
}

/// Returns whether the sighting was new.
fn insert_location(
    connection: &Connection,
    document_hash: &str,
    file_path: &str,
    case_name: &str,
    found_at: &str,
) -> Result<bool> {
    let inserted = connection
        .execute(
            "
            INSERT INTO duplicate_locations(document_hash, file_path, case_name, found_at)
            VALUES(?1, ?2, ?3, ?4)
            ON CONFLICT(document_hash, file_path, case_name) DO NOTHING
            ",
            params![document_hash, file_path, case_name, found_at],
        )
        .context("failed to insert duplicate location")?;
    Ok(inserted > 0)
}

fn load_record(connection: &Connection, document_hash: &str) -> Result<Option<DocumentRecord>> {
    let row = connection
        .query_row(
            "
            SELECT id, document_hash, file_name, file_path, case_name, first_seen_at,
                   last_duplicate_found, metadata_json
            FROM documents
            WHERE document_hash = ?1
            ",
            [document_hash],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, String>(7)?,
                ))
            },
        )
        .optional()
        .context("failed to query document")?;

    let Some((
        id,
        document_hash,
        file_name,
        file_path,
        case_name,
        first_seen_at,
        last_duplicate_found,
        metadata_json,
    )) = row
    else {
        return Ok(None);
    };

    let metadata = serde_json::from_str::<Metadata>(&metadata_json).with_context(|| {
        format!("invalid metadata for document {}", hash_prefix(&document_hash))
    })?;

    let mut statement = connection.prepare(
        "
        SELECT file_path, case_name, found_at
        FROM duplicate_locations
        WHERE document_hash = ?1
        ORDER BY rowid
        ",
    )?;
    let duplicate_locations = statement
        .query_map([&document_hash], |row| {
            Ok(DuplicateLocation {
                file_path: row.get(0)?,
                case_name: row.get(1)?,
                found_at: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<DuplicateLocation>>>()?;

    Ok(Some(DocumentRecord {
        id,
        document_hash,
        file_name,
        file_path,
        case_name,
        first_seen_at,
        last_duplicate_found,
        duplicate_locations,
        metadata,
    }))
}
