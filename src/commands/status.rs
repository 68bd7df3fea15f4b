use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::config::PipelineConfig;
use crate::model::{DocumentRecord, RegistryStats};
use crate::util::read_json;

use super::dedup::open_registry;
use super::write_json_output;

#[derive(Debug, Serialize)]
struct StatusReport {
    registry: RegistryStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    case_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    case_documents: Option<Vec<DocumentRecord>>,
    latest_manifest_path: Option<String>,
    latest_manifest: Option<Value>,
}

pub fn run(args: StatusArgs, config: &PipelineConfig) -> Result<()> {
    let registry = open_registry(args.db_path.as_deref(), config)?;
    let stats = registry.stats();
    info!(
        documents = stats.documents,
        sightings = stats.sightings,
        cases = stats.cases,
        "registry status"
    );

    let case_documents = args
        .case_name
        .as_deref()
        .map(|case_name| registry.case_documents(case_name));

    let manifest_dir = args.cache_root.join("manifests");
    let latest = latest_manifest(&manifest_dir)?;
    let latest_manifest = match &latest {
        Some(path) => {
            let manifest = read_json::<Value>(path)?;
            let status = manifest_field(&manifest, "status");
            let run_id = manifest_field(&manifest, "run_id");
            info!(path = %path.display(), status, run_id, "loaded latest ingest manifest");
            Some(manifest)
        }
        None => {
            warn!(path = %manifest_dir.display(), "no ingest manifests found");
            None
        }
    };

    write_json_output(
        &StatusReport {
            registry: stats,
            case_name: args.case_name,
            case_documents,
            latest_manifest_path: latest.map(|path| path.display().to_string()),
            latest_manifest,
        },
        None,
    )
}

fn manifest_field<'a>(manifest: &'a Value, key: &str) -> &'a str {
    manifest.get(key).and_then(serde_json::Value::as_str).unwrap_or_default()
}

/// Newest `ingest_run_*.json`; run ids sort chronologically.
fn latest_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.is_dir() {
        return Ok(None);
    }

    let mut manifests = Vec::new();
    for entry in fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to list {}", manifest_dir.display()))?
    {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?
            .path();
        let is_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("ingest_run_") && name.ends_with(".json"));
        if is_manifest {
            manifests.push(path);
        }
    }

    manifests.sort();
    Ok(manifests.pop())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_manifest_picks_newest_run() {
        let dir = std::env::temp_dir().join(format!(
            "legal-ingest-status-{}",
            crate::util::utc_compact_string(chrono::Utc::now())
        ));
        fs::create_dir_all(&dir).expect("temp dir");
        for name in [
            "ingest_run_20240101T000000Z.json",
            "ingest_run_20240301T000000Z.json",
            "notes.json",
        ] {
            fs::write(dir.join(name), "{}").expect("write manifest");
        }

        let latest = latest_manifest(&dir).expect("listing succeeds");
        assert_eq!(latest, Some(dir.join("ingest_run_20240301T000000Z.json")));
        assert_eq!(latest_manifest(&dir.join("missing")).expect("missing is fine"), None);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn manifest_fields_fall_back_to_empty() {
        let manifest = serde_json::json!({"status": "completed", "run_id": 42});
        assert_eq!(manifest_field(&manifest, "status"), "completed");
        assert_eq!(manifest_field(&manifest, "run_id"), "");
        assert_eq!(manifest_field(&manifest, "missing"), "");
    }
}
