use super::*;

pub fn run(args: IngestArgs, config: &PipelineConfig) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let manifest_dir = args.cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("ingest_run_{}.json", utc_compact_string(started_ts)))
    });
    let pdf_path = display_path(&args.pdf);

    info!(pdf = %pdf_path, case = %args.case_name, run_id = %run_id, "starting ingest");

    let bytes = fs::read(&args.pdf).with_context(|| format!("failed to read {}", args.pdf.display()))?;
    let document_hash = calculate_document_hash(&bytes);
    let registry = open_registry(args.db_path.as_deref(), config)?;
    let tool_versions = collect_tool_versions();

    let (exists, existing) = registry.check_document_exists(&document_hash);
    let duplicate_of = existing.as_ref().map(|record| record.id.clone());

    let mut manifest = IngestRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id: run_id.clone(),
        status: "running".to_string(),
        started_at,
        updated_at: now_utc_string(),
        pdf_path: pdf_path.clone(),
        case_name: args.case_name.clone(),
        document_hash: document_hash.clone(),
        duplicate_of,
        artifact_dir: None,
        tool_versions,
        counts: IngestCounts::default(),
        segments: Vec::new(),
        warnings: Vec::new(),
    };

    if exists && !args.force {
        record_sighting(&registry, &document_hash, &pdf_path, &args.case_name, &mut manifest.warnings);
        manifest.status = "duplicate".to_string();
        manifest.updated_at = now_utc_string();
        write_json_pretty(&manifest_path, &manifest)?;
        info!(
            hash = hash_prefix(&document_hash),
            path = %manifest_path.display(),
            "document already ingested; recorded duplicate location"
        );
        return Ok(());
    }

    let mut layouts = pdf_layouts(&args.pdf)?;
    if let Some(max_pages) = args.max_pages {
        layouts.truncate(max_pages);
    }
    let pages = PageFeatureExtractor::new()?.extract_all(&layouts);
    let boundaries = detect(&pages, config.boundary.confidence_threshold)?;

    let parser = RtpParser::new(config.rtp.clone())?;
    let chunker = DocumentChunker::new(config.chunker.clone())?;
    let context = SegmentContext {
        parser: &parser,
        chunker: &chunker,
        case_name: &args.case_name,
        document_hash: &document_hash,
    };

    let mut warnings = Vec::new();
    if pages.is_empty() {
        warnings.push("no pages were extracted from the PDF".to_string());
    }
    let artifacts = boundaries
        .iter()
        .enumerate()
        .map(|(index, boundary)| process_segment(&context, index, boundary, &pages, &mut warnings))
        .collect::<Vec<SegmentArtifact>>();

    let artifact_dir = args.cache_root.join("runs").join(&run_id);
    write_artifacts(&artifact_dir, &boundaries, &artifacts)?;

    let counts = count_totals(pages.len(), &artifacts);
    if exists {
        record_sighting(&registry, &document_hash, &pdf_path, &args.case_name, &mut warnings);
    } else {
        let metadata = registration_metadata(&run_id, &counts, bytes.len());
        let file_name = args
            .pdf
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| pdf_path.clone());
        if registry
            .register_new_document(&document_hash, &file_name, &pdf_path, &args.case_name, &metadata)
            .is_none()
        {
            warnings.push("document could not be recorded in the deduplication registry".to_string());
        }
    }

    manifest.status = "completed".to_string();
    manifest.updated_at = now_utc_string();
    manifest.artifact_dir = Some(artifact_dir.display().to_string());
    manifest.segments = artifacts.iter().map(summarize).collect();
    manifest.counts = counts;
    manifest.warnings = warnings;
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote ingest run manifest");
    info!(
        pages = manifest.counts.page_count,
        boundaries = manifest.counts.boundary_count,
        requests = manifest.counts.request_count,
        chunks = manifest.counts.chunk_count,
        "ingest completed"
    );

    Ok(())
}

fn write_artifacts(
    artifact_dir: &Path,
    boundaries: &[DocumentBoundary],
    artifacts: &[SegmentArtifact],
) -> Result<()> {
    ensure_directory(artifact_dir)?;
    write_json_pretty(&artifact_dir.join("boundaries.json"), &boundaries)?;
    write_json_pretty(&artifact_dir.join("segments.json"), &artifacts)?;
    Ok(())
}

/// Records another location for an already registered document.
pub(super) fn record_sighting(
    registry: &DeduplicationRegistry,
    document_hash: &str,
    pdf_path: &str,
    case_name: &str,
    warnings: &mut Vec<String>,
) {
    if !registry.add_duplicate_location(document_hash, pdf_path, case_name) {
        warn!(hash = hash_prefix(document_hash), "failed to record duplicate location");
        warnings.push("duplicate location could not be recorded in the deduplication registry".to_string());
    }
}

pub(super) fn registration_metadata(run_id: &str, counts: &IngestCounts, byte_count: usize) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("run_id".to_string(), Value::from(run_id));
    metadata.insert("file_size".to_string(), Value::from(byte_count));
    metadata.insert("page_count".to_string(), Value::from(counts.page_count));
    metadata.insert("boundary_count".to_string(), Value::from(counts.boundary_count));
    metadata.insert("request_count".to_string(), Value::from(counts.request_count));
    metadata.insert("chunk_count".to_string(), Value::from(counts.chunk_count));
    metadata
}
