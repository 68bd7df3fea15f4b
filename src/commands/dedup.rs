use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::cli::{CleanupCaseArgs, DedupArgs};
use crate::config::PipelineConfig;
use crate::model::{DocumentRecord, Metadata};
use crate::registry::{DeduplicationRegistry, calculate_document_hash};
use crate::util::{hash_prefix, now_utc_string};

use super::write_json_output;

#[derive(Debug, Serialize)]
pub(super) struct DedupOutcome {
    pub document_hash: String,
    pub duplicate: bool,
    pub record: Option<DocumentRecord>,
}

#[derive(Debug, Serialize)]
struct CleanupReport {
    case_name: String,
    removed_documents: usize,
}

pub fn run(args: DedupArgs, config: &PipelineConfig) -> Result<()> {
    let registry = open_registry(args.db_path.as_deref(), config)?;
    let bytes = fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let outcome = check_and_record(&registry, &bytes, &args.file, &args.case_name, Metadata::new());
    write_json_output(&outcome, None)
}

pub fn cleanup(args: CleanupCaseArgs, config: &PipelineConfig) -> Result<()> {
    let registry = open_registry(args.db_path.as_deref(), config)?;
    let removed_documents = registry.cleanup_case(&args.case_name);

    write_json_output(
        &CleanupReport {
            case_name: args.case_name,
            removed_documents,
        },
        None,
    )
}

pub(super) fn open_registry(db_path: Option<&Path>, config: &PipelineConfig) -> Result<DeduplicationRegistry> {
    let path = db_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.registry.db_path.clone());
    DeduplicationRegistry::open(&path)
}

/// Looks the bytes up by hash; a known document gains a sighting, a new one
/// is registered with `extra` merged into its metadata.
pub(super) fn check_and_record(
    registry: &DeduplicationRegistry,
    bytes: &[u8],
    file_path: &Path,
    case_name: &str,
    extra: Metadata,
) -> DedupOutcome {
    let document_hash = calculate_document_hash(bytes);
    let path = display_path(file_path);

    let (exists, existing) = registry.check_document_exists(&document_hash);
    if exists {
        registry.add_duplicate_location(&document_hash, &path, case_name);
        let (_, refreshed) = registry.check_document_exists(&document_hash);
        info!(
            hash = hash_prefix(&document_hash),
            case = case_name,
            "duplicate document"
        );
        return DedupOutcome {
            document_hash,
            duplicate: true,
            record: refreshed.or(existing),
        };
    }

    let mut metadata = extra;
    metadata.insert("file_size".to_string(), Value::from(bytes.len()));
    metadata.insert("registered_at".to_string(), Value::from(now_utc_string()));
    let file_name = file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.clone());

    let record = registry.register_new_document(&document_hash, &file_name, &path, case_name, &metadata);
    DedupOutcome {
        document_hash,
        duplicate: false,
        record,
    }
}

pub(super) fn display_path(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_sighting_is_reported_as_duplicate() {
        let registry = DeduplicationRegistry::in_memory().expect("registry opens");
        let bytes = b"%PDF-1.7 minimal";

        let first = check_and_record(&registry, bytes, Path::new("/a/one.pdf"), "Case A", Metadata::new());
        assert!(!first.duplicate);
        let record = first.record.expect("first sighting registers");
        assert_eq!(record.file_name, "one.pdf");
        assert_eq!(record.metadata.get("file_size"), Some(&Value::from(bytes.len())));

        let second = check_and_record(&registry, bytes, Path::new("/b/two.pdf"), "Case B", Metadata::new());
        assert!(second.duplicate);
        assert_eq!(second.document_hash, first.document_hash);
        let record = second.record.expect("duplicate returns the record");
        assert_eq!(record.duplicate_locations.len(), 2);
        assert_eq!(record.case_name, "Case A");
    }
}
