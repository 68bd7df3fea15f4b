use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(super) enum RtpStatus {
    Parsed,
    NotRtp,
    NoText,
    NoRequests,
    Failed,
}

impl RtpStatus {
    pub(super) fn as_str(self) -> &'static str {
        match self {
            RtpStatus::Parsed => "parsed",
            RtpStatus::NotRtp => "not_rtp",
            RtpStatus::NoText => "no_text",
            RtpStatus::NoRequests => "no_requests",
            RtpStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SegmentArtifact {
    pub segment_index: usize,
    pub boundary: DocumentBoundary,
    pub rtp_status: RtpStatus,
    pub requests: Vec<RtpRequest>,
    pub chunks: Vec<DocumentChunk>,
}

pub(super) struct SegmentContext<'a> {
    pub parser: &'a RtpParser,
    pub chunker: &'a DocumentChunker,
    pub case_name: &'a str,
    pub document_hash: &'a str,
}

/// Page-tagged text of one segment; markers keep absolute 1-based page numbers.
pub(super) fn segment_tagged_text(pages: &[PageFeatures], boundary: &DocumentBoundary) -> String {
    let mut tagged = String::new();
    let end = boundary.end_page.min(pages.len().saturating_sub(1));
    for page in pages.iter().take(end + 1).skip(boundary.start_page) {
        tagged.push_str(&format!("[Page {}]\n", page.page_index + 1));
        tagged.push_str(page.text.trim_end());
        tagged.push('\n');
    }
    tagged
}

pub(super) fn process_segment(
    context: &SegmentContext<'_>,
    segment_index: usize,
    boundary: &DocumentBoundary,
    pages: &[PageFeatures],
    warnings: &mut Vec<String>,
) -> SegmentArtifact {
    let text = segment_tagged_text(pages, boundary);
    let last_page = u32::try_from(boundary.end_page + 1).unwrap_or(u32::MAX);

    let (rtp_status, requests) = match context.parser.parse_document(&text, last_page) {
        Ok(requests) => (RtpStatus::Parsed, requests),
        Err(RtpError::InvalidFormat(_)) => (RtpStatus::NotRtp, Vec::new()),
        Err(RtpError::PdfExtraction(_)) => (RtpStatus::NoText, Vec::new()),
        Err(RtpError::Parsing(reason)) => {
            if boundary.document_type_hint.as_deref() == Some("discovery_request") {
                warnings.push(format!(
                    "segment {segment_index} (pages {}-{}) looks like a discovery request but yielded no requests: {reason}",
                    boundary.start_page + 1,
                    boundary.end_page + 1
                ));
            }
            (RtpStatus::NoRequests, Vec::new())
        }
        Err(err) => {
            warn!(segment = segment_index, error = %err, "request parsing failed");
            warnings.push(format!("segment {segment_index}: {err}"));
            (RtpStatus::Failed, Vec::new())
        }
    };

    let metadata = segment_metadata(context, segment_index, boundary);
    let chunks = context.chunker.chunk_document(&text, &metadata);

    debug!(
        segment = segment_index,
        start_page = boundary.start_page,
        end_page = boundary.end_page,
        pages = boundary.page_count(),
        rtp_status = rtp_status.as_str(),
        requests = requests.len(),
        chunks = chunks.len(),
        "segment processed"
    );

    SegmentArtifact {
        segment_index,
        boundary: boundary.clone(),
        rtp_status,
        requests,
        chunks,
    }
}

fn segment_metadata(context: &SegmentContext<'_>, segment_index: usize, boundary: &DocumentBoundary) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("case_name".to_string(), Value::from(context.case_name));
    metadata.insert("document_hash".to_string(), Value::from(context.document_hash));
    metadata.insert("segment_index".to_string(), Value::from(segment_index));
    metadata.insert("start_page".to_string(), Value::from(boundary.start_page));
    metadata.insert("end_page".to_string(), Value::from(boundary.end_page));
    if let Some(hint) = &boundary.document_type_hint {
        metadata.insert("document_type_hint".to_string(), Value::from(hint.as_str()));
    }
    if let Some(title) = &boundary.title {
        metadata.insert("title".to_string(), Value::from(title.as_str()));
    }
    metadata
}

pub(super) fn summarize(artifact: &SegmentArtifact) -> SegmentSummary {
    SegmentSummary {
        start_page: artifact.boundary.start_page,
        end_page: artifact.boundary.end_page,
        confidence: artifact.boundary.confidence,
        document_type_hint: artifact.boundary.document_type_hint.clone(),
        title: artifact.boundary.title.clone(),
        request_count: artifact.requests.len(),
        chunk_count: artifact.chunks.len(),
        rtp_status: artifact.rtp_status.as_str().to_string(),
    }
}

pub(super) fn count_totals(page_count: usize, artifacts: &[SegmentArtifact]) -> IngestCounts {
    IngestCounts {
        page_count,
        boundary_count: artifacts.len(),
        fragment_count: artifacts
            .iter()
            .filter(|artifact| {
                artifact.boundary.title.as_deref() == Some(crate::boundary::FRAGMENT_TITLE)
            })
            .count(),
        request_count: artifacts.iter().map(|artifact| artifact.requests.len()).sum(),
        chunk_count: artifacts.iter().map(|artifact| artifact.chunks.len()).sum(),
    }
}
