//! End-to-end ingestion of one PDF: deduplicate, split into documents, parse
//! production requests, chunk, register.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::chunker::DocumentChunker;
use crate::cli::IngestArgs;
use crate::config::PipelineConfig;
use crate::error::RtpError;
use crate::extract::collect_tool_versions;
use crate::features::PageFeatureExtractor;
use crate::model::{
    DocumentBoundary, DocumentChunk, IngestCounts, IngestRunManifest, Metadata, PageFeatures,
    RtpRequest, SegmentSummary,
};
use crate::registry::{DeduplicationRegistry, calculate_document_hash};
use crate::rtp::RtpParser;
use crate::util::{ensure_directory, hash_prefix, now_utc_string, utc_compact_string, write_json_pretty};

use super::boundaries::{detect, pdf_layouts};
use super::dedup::{display_path, open_registry};

const MANIFEST_VERSION: u32 = 1;

mod run;
mod segments;
#[cfg(test)]
mod tests;

pub use run::run;

use segments::*;
