//! Splits a concatenated PDF into its source documents.
//!
//! Three independent detectors (opening markers, layout drift, page-number
//! resets) each propose scored page ranges. The proposals are reconciled into
//! a disjoint list, filtered by confidence, and padded with low-confidence
//! fragments so every page belongs to exactly one boundary.

use anyhow::Result;
use tracing::debug;

use crate::features::BatesParser;
use crate::model::{BatesRange, DocumentBoundary, PageFeatures};

mod hard;
mod reconcile;
mod soft;

pub use reconcile::{Span, reconcile};

pub const FRAGMENT_TITLE: &str = "Document Fragment";
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

const MERGE_CONFIDENCE_SPREAD: f64 = 0.2;

#[derive(Debug)]
pub struct BoundaryDetectionEngine {
    markers: Vec<hard::OpeningMarker>,
    bates: BatesParser,
}

impl BoundaryDetectionEngine {
    pub fn new() -> Result<Self> {
        Ok(Self {
            markers: hard::opening_markers()?,
            bates: BatesParser::new()?,
        })
    }

    /// Returns a disjoint, ordered partition of `0..pages.len()`.
    ///
    /// Detected boundaries below `confidence_threshold` are dropped; the pages
    /// they leave uncovered become `Document Fragment` boundaries at 0.5.
    pub fn detect_boundaries(
        &self,
        pages: &[PageFeatures],
        confidence_threshold: f64,
    ) -> Vec<DocumentBoundary> {
        if pages.is_empty() {
            return Vec::new();
        }

        let hard = self.hard_boundaries(pages);
        let soft = soft::soft_boundaries(pages);
        let resets = soft::numbering_reset_boundaries(pages);
        debug!(
            pages = pages.len(),
            hard = hard.len(),
            soft = soft.len(),
            resets = resets.len(),
            "boundary candidates collected"
        );

        let mut candidates = hard;
        candidates.extend(soft);
        candidates.extend(resets);

        let confident = reconcile(candidates)
            .into_iter()
            .filter(|boundary| boundary.confidence >= confidence_threshold)
            .collect::<Vec<DocumentBoundary>>();

        let mut boundaries = ensure_coverage(confident, pages.len());
        for boundary in &mut boundaries {
            boundary.confidence = boundary.confidence.clamp(0.0, 1.0);
            boundary.bates_range = bates_range(pages, boundary.start_page, boundary.end_page);
        }

        debug!(
            pages = pages.len(),
            boundaries = boundaries.len(),
            threshold = confidence_threshold,
            "boundaries reconciled"
        );
        boundaries
    }
}

impl Span for DocumentBoundary {
    fn start(&self) -> usize {
        self.start_page
    }

    fn end(&self) -> usize {
        self.end_page
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn should_merge(&self, other: &Self) -> bool {
        let same_type = match (&self.document_type_hint, &other.document_type_hint) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        };
        let shared_indicators = self
            .indicators
            .iter()
            .filter(|indicator| other.indicators.contains(indicator))
            .count();

        (same_type || shared_indicators >= 2)
            && (self.confidence - other.confidence).abs() <= MERGE_CONFIDENCE_SPREAD
    }

    fn merge(self, other: Self) -> Self {
        let mut indicators = self.indicators;
        for indicator in other.indicators {
            if !indicators.contains(&indicator) {
                indicators.push(indicator);
            }
        }

        DocumentBoundary {
            start_page: self.start_page.min(other.start_page),
            end_page: self.end_page.max(other.end_page),
            confidence: self.confidence.max(other.confidence),
            document_type_hint: self.document_type_hint.or(other.document_type_hint),
            title: self.title.or(other.title),
            indicators,
            bates_range: self.bates_range.or(other.bates_range),
        }
    }
}

fn fragment(start_page: usize, end_page: usize) -> DocumentBoundary {
    DocumentBoundary {
        start_page,
        end_page,
        confidence: FALLBACK_CONFIDENCE,
        document_type_hint: None,
        title: Some(FRAGMENT_TITLE.to_string()),
        indicators: vec!["coverage gap".to_string()],
        bates_range: None,
    }
}

/// Pads `boundaries` into a total partition of `0..page_count`.
fn ensure_coverage(mut boundaries: Vec<DocumentBoundary>, page_count: usize) -> Vec<DocumentBoundary> {
    if page_count == 0 {
        return Vec::new();
    }

    if boundaries.is_empty() {
        return vec![DocumentBoundary {
            start_page: 0,
            end_page: page_count - 1,
            confidence: FALLBACK_CONFIDENCE,
            document_type_hint: None,
            title: None,
            indicators: vec!["no confident boundaries".to_string()],
            bates_range: None,
        }];
    }

    boundaries.sort_by_key(|boundary| boundary.start_page);

    let mut covered = Vec::with_capacity(boundaries.len() * 2 + 1);
    let mut next_page = 0usize;
    for mut boundary in boundaries {
        boundary.start_page = boundary.start_page.max(next_page);
        boundary.end_page = boundary.end_page.min(page_count - 1);
        if boundary.start_page > boundary.end_page {
            continue;
        }

        if boundary.start_page > next_page {
            covered.push(fragment(next_page, boundary.start_page - 1));
        }
        next_page = boundary.end_page + 1;
        covered.push(boundary);
    }

    if next_page < page_count {
        covered.push(fragment(next_page, page_count - 1));
    }

    covered
}

fn bates_range(pages: &[PageFeatures], start: usize, end: usize) -> Option<BatesRange> {
    let window = pages.get(start..=end.min(pages.len().saturating_sub(1)))?;
    let mut stamps = window.iter().filter_map(|page| page.bates_number.as_ref());
    let first = stamps.next()?;
    let last = stamps.last().unwrap_or(first);

    Some(BatesRange {
        start: first.clone(),
        end: last.clone(),
    })
}

/// First non-empty line of a page, used as a document title.
fn page_title(page: &PageFeatures) -> Option<String> {
    let line = page.text.lines().map(str::trim).find(|line| !line.is_empty())?;
    Some(line.chars().take(120).collect())
}
