use std::path::Path;

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::{info, warn};

use crate::boundary::BoundaryDetectionEngine;
use crate::cli::{BoundariesArgs, TextSourceArgs};
use crate::config::PipelineConfig;
use crate::extract::{command_available, extract_layouts_with_pdftohtml};
use crate::features::{PageFeatureExtractor, PageLayout};
use crate::model::{DocumentBoundary, PageFeatures};

use super::input::{load_layouts_json, load_pages, text_layouts};
use super::write_json_output;

#[derive(Debug, Serialize)]
struct BoundariesReport {
    page_count: usize,
    confidence_threshold: f64,
    boundaries: Vec<DocumentBoundary>,
}

pub fn run(args: BoundariesArgs, config: &PipelineConfig) -> Result<()> {
    let threshold = args
        .threshold
        .unwrap_or(config.boundary.confidence_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        bail!("--threshold must be within [0, 1], got {threshold}");
    }

    let layouts = match (&args.pdf, &args.layouts, &args.text) {
        (Some(pdf), None, None) => pdf_layouts(pdf)?,
        (None, Some(layouts), None) => load_layouts_json(layouts)?,
        (None, None, Some(text)) => {
            let source = TextSourceArgs {
                pdf: None,
                text: Some(text.clone()),
                max_pages: None,
            };
            text_layouts(&load_pages(&source)?.pages)
        }
        _ => bail!("exactly one of --pdf, --layouts or --text is required"),
    };

    let pages = PageFeatureExtractor::new()?.extract_all(&layouts);
    let boundaries = detect(&pages, threshold)?;

    write_json_output(
        &BoundariesReport {
            page_count: pages.len(),
            confidence_threshold: threshold,
            boundaries,
        },
        args.output.as_deref(),
    )
}

pub(super) fn detect(pages: &[PageFeatures], threshold: f64) -> Result<Vec<DocumentBoundary>> {
    let boundaries = BoundaryDetectionEngine::new()?.detect_boundaries(pages, threshold);
    info!(
        pages = pages.len(),
        boundaries = boundaries.len(),
        threshold,
        "document boundaries detected"
    );
    Ok(boundaries)
}

/// Layout-aware extraction when `pdftohtml` is installed, text-only otherwise.
pub(super) fn pdf_layouts(pdf: &Path) -> Result<Vec<PageLayout>> {
    if command_available("pdftohtml") {
        return extract_layouts_with_pdftohtml(pdf);
    }

    warn!(pdf = %pdf.display(), "pdftohtml unavailable; detecting boundaries from text only");
    let source = TextSourceArgs {
        pdf: Some(pdf.to_path_buf()),
        text: None,
        max_pages: None,
    };
    Ok(text_layouts(&load_pages(&source)?.pages))
}
