use super::*;

use crate::config::{ChunkerConfig, RtpConfig};
use crate::registry::DeduplicationRegistry;

fn page(index: usize, text: &str) -> PageFeatures {
    PageFeatures {
        page_index: index,
        text: text.to_string(),
        fonts: Vec::new(),
        font_sizes: Vec::new(),
        has_header: false,
        has_footer: false,
        has_page_number: false,
        has_letterhead: false,
        has_signature_block: false,
        text_density: 0.3,
        dominant_font: None,
        bates_number: None,
        structural_hash: "text".to_string(),
        printed_page_number: None,
    }
}

fn boundary(start_page: usize, end_page: usize, hint: Option<&str>, title: Option<&str>) -> DocumentBoundary {
    DocumentBoundary {
        start_page,
        end_page,
        confidence: 0.8,
        document_type_hint: hint.map(str::to_string),
        title: title.map(str::to_string),
        indicators: Vec::new(),
        bates_range: None,
    }
}

/// Sizes small enough that the one-page letter still yields a chunk.
fn small_chunker() -> DocumentChunker {
    DocumentChunker::new(ChunkerConfig {
        target_size: 100,
        min_size: 20,
        max_size: 150,
        overlap: 10,
        variance: 20,
    })
    .expect("chunker builds")
}

fn pages() -> Vec<PageFeatures> {
    vec![
        page(0, "Dear Counsel,\nPlease find the enclosed invoices for March."),
        page(1, "Sincerely,\nJane Roe"),
        page(
            2,
            "PLAINTIFF'S FIRST REQUESTS FOR PRODUCTION\n\nRFP No. 1: All documents concerning the Acme supply contract.",
        ),
        page(3, "RFP No. 2: All emails exchanged with Acme regarding pricing.\n\nDated: May 1, 2024"),
    ]
}

#[test]
fn segment_text_keeps_absolute_page_numbers() {
    let pages = pages();
    let tagged = segment_tagged_text(&pages, &boundary(2, 3, None, None));
    assert!(tagged.starts_with("[Page 3]\nPLAINTIFF'S"));
    assert!(tagged.contains("\n[Page 4]\nRFP No. 2"));
    assert!(!tagged.contains("Dear Counsel"));
}

#[test]
fn segments_are_parsed_chunked_and_summarized() {
    let parser = RtpParser::new(RtpConfig::default()).expect("parser builds");
    let chunker = small_chunker();
    let context = SegmentContext {
        parser: &parser,
        chunker: &chunker,
        case_name: "Doe v. Acme",
        document_hash: "abc123",
    };
    let pages = pages();
    let mut warnings = Vec::new();

    let letter = process_segment(&context, 0, &boundary(0, 1, None, Some("Dear Counsel,")), &pages, &mut warnings);
    assert_eq!(letter.rtp_status, RtpStatus::NotRtp);
    assert!(letter.requests.is_empty());
    assert_eq!(letter.chunks.len(), 1);
    assert_eq!(
        letter.chunks[0].metadata.get("case_name"),
        Some(&Value::from("Doe v. Acme"))
    );
    assert_eq!(letter.chunks[0].metadata.get("end_page"), Some(&Value::from(1)));

    let requests = process_segment(
        &context,
        1,
        &boundary(2, 3, Some("discovery_request"), None),
        &pages,
        &mut warnings,
    );
    assert_eq!(requests.rtp_status, RtpStatus::Parsed);
    let numbers = requests
        .requests
        .iter()
        .map(|request| request.request_number.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(numbers, vec!["1", "2"]);
    assert_eq!(requests.requests[0].page_range, (3, 3));
    assert_eq!(requests.requests[1].page_range, (4, 4));
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    let artifacts = vec![letter, requests];
    let counts = count_totals(pages.len(), &artifacts);
    assert_eq!(counts.page_count, 4);
    assert_eq!(counts.boundary_count, 2);
    assert_eq!(counts.fragment_count, 0);
    assert_eq!(counts.request_count, 2);

    let summary = summarize(&artifacts[1]);
    assert_eq!(summary.rtp_status, "parsed");
    assert_eq!(summary.request_count, 2);
}

#[test]
fn discovery_segment_without_requests_is_flagged() {
    let parser = RtpParser::new(RtpConfig::default()).expect("parser builds");
    let chunker = DocumentChunker::new(ChunkerConfig::default()).expect("chunker builds");
    let context = SegmentContext {
        parser: &parser,
        chunker: &chunker,
        case_name: "Doe v. Acme",
        document_hash: "abc123",
    };
    let pages = vec![page(
        0,
        "DEFENDANT'S REQUESTS FOR PRODUCTION\n\nDefendant asks that plaintiff produce everything relevant.",
    )];
    let mut warnings = Vec::new();

    let artifact = process_segment(
        &context,
        0,
        &boundary(0, 0, Some("discovery_request"), None),
        &pages,
        &mut warnings,
    );
    assert_eq!(artifact.rtp_status, RtpStatus::NoRequests);
    assert_eq!(warnings.len(), 1);
}

#[test]
fn registration_metadata_carries_run_counts() {
    let counts = IngestCounts {
        page_count: 4,
        boundary_count: 2,
        fragment_count: 0,
        request_count: 2,
        chunk_count: 3,
    };
    let metadata = run::registration_metadata("run-1", &counts, 2048);
    assert_eq!(metadata.get("run_id"), Some(&Value::from("run-1")));
    assert_eq!(metadata.get("request_count"), Some(&Value::from(2)));
    assert_eq!(metadata.get("file_size"), Some(&Value::from(2048)));
}

#[test]
fn unrecorded_sighting_becomes_a_manifest_warning() {
    let registry = DeduplicationRegistry::in_memory().expect("in-memory registry opens");
    let hash = calculate_document_hash(b"%PDF-1.7 production");
    let mut warnings = Vec::new();

    run::record_sighting(&registry, &hash, "/b/production.pdf", "Doe v. Acme", &mut warnings);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("duplicate location"));

    registry
        .register_new_document(&hash, "production.pdf", "/a/production.pdf", "Doe v. Acme", &Metadata::new())
        .expect("registration");
    warnings.clear();
    run::record_sighting(&registry, &hash, "/b/production.pdf", "Doe v. Acme", &mut warnings);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}
