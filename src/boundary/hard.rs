use anyhow::{Context, Result};
use regex::Regex;

use super::{BoundaryDetectionEngine, page_title};
use crate::model::{DocumentBoundary, PageFeatures};

const MARKER_WEIGHT: f64 = 0.4;
const LETTERHEAD_WEIGHT: f64 = 0.3;
const FONT_CHANGE_WEIGHT: f64 = 0.2;
const BATES_BREAK_WEIGHT: f64 = 0.3;
const FIRST_PAGE_WEIGHT: f64 = 0.3;
const HARD_THRESHOLD: f64 = 0.5;

/// Lines from the top of a page that opening markers are matched against.
const MARKER_LINES: usize = 12;

#[derive(Debug)]
pub(super) struct OpeningMarker {
    pattern: Regex,
    companion: Option<Regex>,
    document_type: &'static str,
}

impl OpeningMarker {
    fn matches(&self, header: &str) -> bool {
        self.pattern.is_match(header)
            && self
                .companion
                .as_ref()
                .map(|companion| companion.is_match(header))
                .unwrap_or(true)
    }
}

pub(super) fn opening_markers() -> Result<Vec<OpeningMarker>> {
    let table: [(&str, Option<&str>, &'static str); 12] = [
        (r"(?im)^\s*(?:VIDEOTAPED\s+|ORAL\s+)?DEPOSITION\s+OF\b", None, "deposition"),
        (r"(?im)^\s*AFFIDAVIT\s+OF\b", None, "affidavit"),
        (r"(?im)^\s*DECLARATION\s+OF\b", None, "declaration"),
        (r"(?im)^\s*EXHIBIT\s+[A-Z0-9\-]{1,6}\s*$", None, "exhibit"),
        (
            r"(?im)^.*\b(?:REQUESTS?\s+FOR\s+PRODUCTION|REQUESTS?\s+TO\s+PRODUCE|INTERROGATORIES|REQUESTS?\s+FOR\s+ADMISSIONS?)\b",
            None,
            "discovery_request",
        ),
        (r"(?im)^\s*SUBPOENA\b", None, "subpoena"),
        (
            r"(?im)^\s*(?:IN\s+THE\s+)?(?:UNITED\s+STATES\s+)?(?:DISTRICT|SUPERIOR|CIRCUIT|BANKRUPTCY)\s+COURT\b",
            None,
            "pleading",
        ),
        (r"(?im)^\s*MEMORANDUM\b", None, "memorandum"),
        (
            r"(?im)^\s*(?:CERTIFICATE|PROOF)\s+OF\s+SERVICE\b",
            None,
            "certificate_of_service",
        ),
        (r"(?im)^\s*FORM\s+[A-Z0-9][A-Z0-9\-]*\b", None, "form"),
        (r"(?im)^\s*(?:INVOICE|STATEMENT\s+OF\s+ACCOUNT)\b", None, "invoice"),
        (
            r"(?im)^\s*From:\s*\S",
            Some(r"(?im)^\s*(?:To|Subject|Sent|Date):\s*\S"),
            "email",
        ),
    ];

    table
        .iter()
        .map(|&(pattern, companion, document_type)| -> Result<OpeningMarker> {
            Ok(OpeningMarker {
                pattern: Regex::new(pattern)
                    .with_context(|| format!("failed to compile {document_type} marker regex"))?,
                companion: companion
                    .map(Regex::new)
                    .transpose()
                    .with_context(|| format!("failed to compile {document_type} companion regex"))?,
                document_type,
            })
        })
        .collect()
}

#[derive(Debug, Default, Clone)]
pub(super) struct PageEvidence {
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub document_type_hint: Option<String>,
}

impl PageEvidence {
    fn add(&mut self, weight: f64, indicator: impl Into<String>) {
        self.confidence += weight;
        self.indicators.push(indicator.into());
    }
}

impl BoundaryDetectionEngine {
    pub(super) fn page_evidence(&self, pages: &[PageFeatures], index: usize) -> PageEvidence {
        let page = &pages[index];
        let mut evidence = PageEvidence::default();

        let header = page
            .text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(MARKER_LINES)
            .collect::<Vec<&str>>()
            .join("\n");
        if let Some(marker) = self.markers.iter().find(|marker| marker.matches(&header)) {
            evidence.add(
                MARKER_WEIGHT,
                format!("document marker: {}", marker.document_type),
            );
            evidence.document_type_hint = Some(marker.document_type.to_string());
        }

        let Some(previous) = index.checked_sub(1).map(|previous| &pages[previous]) else {
            evidence.add(FIRST_PAGE_WEIGHT, "first page");
            return evidence;
        };

        if page.has_letterhead {
            evidence.add(LETTERHEAD_WEIGHT, "letterhead");
        }

        if let (Some(current_font), Some(previous_font)) =
            (&page.dominant_font, &previous.dominant_font)
        {
            if current_font != previous_font {
                evidence.add(FONT_CHANGE_WEIGHT, "dominant font change");
            }
        }

        if self.bates_sequence_broken(previous, page) {
            evidence.add(BATES_BREAK_WEIGHT, "bates sequence break");
        }

        evidence.confidence = evidence.confidence.min(1.0);
        evidence
    }

    fn bates_sequence_broken(&self, previous: &PageFeatures, page: &PageFeatures) -> bool {
        let (Some(previous_raw), Some(current_raw)) = (&previous.bates_number, &page.bates_number)
        else {
            return false;
        };

        match (
            self.bates.parse(previous_raw),
            self.bates.parse(current_raw),
        ) {
            (Some(previous_stamp), Some(current_stamp)) => !current_stamp.follows(&previous_stamp),
            _ => false,
        }
    }

    pub(super) fn hard_boundaries(&self, pages: &[PageFeatures]) -> Vec<DocumentBoundary> {
        let evidence = (0..pages.len())
            .map(|index| self.page_evidence(pages, index))
            .collect::<Vec<PageEvidence>>();
        let starts = evidence
            .iter()
            .map(|page| page.confidence > HARD_THRESHOLD)
            .collect::<Vec<bool>>();

        evidence
            .iter()
            .enumerate()
            .filter(|(index, _)| starts[*index])
            .map(|(index, page_evidence)| DocumentBoundary {
                start_page: index,
                end_page: find_document_end(pages, &evidence, &starts, index),
                confidence: page_evidence.confidence,
                document_type_hint: page_evidence.document_type_hint.clone(),
                title: page_title(&pages[index]),
                indicators: page_evidence.indicators.clone(),
                bates_range: None,
            })
            .collect()
    }
}

/// Scans forward from `start` for the last page of its document: the page
/// before the next opened boundary, or a signature page directly followed by a
/// page with any opening evidence at all.
pub(super) fn find_document_end(
    pages: &[PageFeatures],
    evidence: &[PageEvidence],
    starts: &[bool],
    start: usize,
) -> usize {
    let last = pages.len() - 1;
    for page in start..last {
        if starts[page + 1] {
            return page;
        }
        if pages[page].has_signature_block && evidence[page + 1].confidence > 0.0 {
            return page;
        }
    }
    last
}
