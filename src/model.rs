use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFeatures {
    pub page_index: usize,
    pub text: String,
    pub fonts: Vec<String>,
    pub font_sizes: Vec<f64>,
    pub has_header: bool,
    pub has_footer: bool,
    pub has_page_number: bool,
    pub has_letterhead: bool,
    pub has_signature_block: bool,
    pub text_density: f64,
    pub dominant_font: Option<String>,
    pub bates_number: Option<String>,
    pub structural_hash: String,
    #[serde(default)]
    pub printed_page_number: Option<u32>,
}

impl PageFeatures {
    pub fn mean_font_size(&self) -> Option<f64> {
        if self.font_sizes.is_empty() {
            return None;
        }
        Some(self.font_sizes.iter().sum::<f64>() / self.font_sizes.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatesRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentBoundary {
    pub start_page: usize,
    pub end_page: usize,
    pub confidence: f64,
    pub document_type_hint: Option<String>,
    pub title: Option<String>,
    pub indicators: Vec<String>,
    pub bates_range: Option<BatesRange>,
}

impl DocumentBoundary {
    pub fn page_count(&self) -> usize {
        self.end_page.saturating_sub(self.start_page) + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestCategory {
    Documents,
    Communications,
    ElectronicallyStored,
    TangibleThings,
    Other,
}

impl RequestCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestCategory::Documents => "documents",
            RequestCategory::Communications => "communications",
            RequestCategory::ElectronicallyStored => "electronically_stored",
            RequestCategory::TangibleThings => "tangible_things",
            RequestCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpRequest {
    pub request_number: String,
    pub request_text: String,
    pub category: RequestCategory,
    pub page_range: (u32, u32),
    pub confidence_score: f64,
    pub parent_request: Option<String>,
    pub cross_references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    pub chunk_index: usize,
    pub start_char: usize,
    pub end_char: usize,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateLocation {
    pub file_path: String,
    pub case_name: String,
    pub found_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub document_hash: String,
    pub file_name: String,
    pub file_path: String,
    pub case_name: String,
    pub first_seen_at: String,
    pub last_duplicate_found: Option<String>,
    pub duplicate_locations: Vec<DuplicateLocation>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryStats {
    pub documents: i64,
    pub sightings: i64,
    pub cases: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub pdftotext: String,
    pub pdftohtml: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub start_page: usize,
    pub end_page: usize,
    pub confidence: f64,
    pub document_type_hint: Option<String>,
    pub title: Option<String>,
    pub request_count: usize,
    pub chunk_count: usize,
    pub rtp_status: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestCounts {
    pub page_count: usize,
    pub boundary_count: usize,
    pub fragment_count: usize,
    pub request_count: usize,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub pdf_path: String,
    pub case_name: String,
    pub document_hash: String,
    pub duplicate_of: Option<String>,
    pub artifact_dir: Option<String>,
    pub tool_versions: ToolVersions,
    pub counts: IngestCounts,
    pub segments: Vec<SegmentSummary>,
    pub warnings: Vec<String>,
}
