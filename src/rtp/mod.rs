mod category;
mod format;
mod memory;
mod numbering;
mod references;
#[cfg(test)]
mod tests;

use anyhow::Context;
use regex::Regex;
use tracing::{debug, info};

use crate::config::RtpConfig;
use crate::error::{RtpError, RtpResult};
use crate::model::{RequestCategory, RtpRequest};

pub use category::{CategoryScores, CategoryTable};
pub use format::{DEFINITIONS_PLACEHOLDER, DocumentFormat, FormatRules};
pub use memory::MemoryMonitor;
pub use numbering::{NumberingRules, PageIndex, RequestStart, RuleKind};
pub use references::ReferenceRules;

/// Extracted text shorter than this (page markers excluded) is treated as a
/// failed extraction rather than a filing.
const MIN_CONTENT_CHARS: usize = 20;

/// Requests whose cleaned text is shorter than this lose some confidence.
const SHORT_REQUEST_CHARS: usize = 40;
const SHORT_REQUEST_PENALTY: f64 = 0.1;
const UNCATEGORIZED_PENALTY: f64 = 0.05;

/// Filing text after format normalization, definitions removal and numbering.
#[derive(Debug, Clone)]
pub struct PreparedText {
    pub format: DocumentFormat,
    pub text: String,
    pub pages: PageIndex,
    pub starts: Vec<RequestStart>,
}

#[derive(Debug)]
pub struct RtpParser {
    config: RtpConfig,
    format: FormatRules,
    numbering: NumberingRules,
    categories: CategoryTable,
    references: ReferenceRules,
    page_marker: Regex,
    trailing_page_marker: Regex,
    closing_block: Regex,
    non_request: Regex,
}

impl RtpParser {
    pub fn new(config: RtpConfig) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            format: FormatRules::new()?,
            numbering: NumberingRules::new()?,
            categories: CategoryTable::new()?,
            references: ReferenceRules::new()?,
            page_marker: Regex::new(r"\[Page\s+(\d+)\]")
                .context("failed to compile page marker regex")?,
            trailing_page_marker: Regex::new(r"\[Page\s+\d+\]$")
                .context("failed to compile trailing page marker regex")?,
            closing_block: Regex::new(
                r"(?im)^[ \t]*(?:dated\s*:|respectfully\s+submitted|/s/|(?:certificate|proof)\s+of\s+service)",
            )
            .context("failed to compile closing block regex")?,
            non_request: Regex::new(
                r"(?i)^(?:(?:responses?|objections?|answers?)(?:\s+to\b[^:]*)?\s*:|(?:intentionally\s+left\s+blank|reserved|omitted|none)\.?$)",
            )
            .context("failed to compile non-request regex")?,
        })
    }

    pub fn config(&self) -> &RtpConfig {
        &self.config
    }

    /// Parses every request of a page-tagged filing.
    pub fn parse(&self, text: &str, total_pages: u32) -> RtpResult<Vec<RtpRequest>> {
        self.parse_streaming(text, total_pages)?.collect()
    }

    /// Same output as [`RtpParser::parse`], produced one request at a time.
    pub fn parse_streaming<'a>(
        &'a self,
        text: &str,
        total_pages: u32,
    ) -> RtpResult<RequestStream<'a>> {
        let prepared = self.prepare(text, total_pages)?;
        Ok(RequestStream {
            parser: self,
            prepared,
            cursor: 0,
            yielded: 0,
            monitor: MemoryMonitor::new(self.config.memory_limit_mb),
            finished: false,
        })
    }

    /// Picks streaming for inputs above the configured size threshold.
    pub fn parse_document(&self, text: &str, total_pages: u32) -> RtpResult<Vec<RtpRequest>> {
        if text.len() > self.config.streaming_threshold_bytes {
            info!(
                bytes = text.len(),
                threshold = self.config.streaming_threshold_bytes,
                "parsing large filing in streaming mode"
            );
            let mut requests = Vec::new();
            for request in self.parse_streaming(text, total_pages)? {
                requests.push(request?);
            }
            return Ok(requests);
        }
        self.parse(text, total_pages)
    }

    pub fn prepare(&self, text: &str, total_pages: u32) -> RtpResult<PreparedText> {
        let content = self.page_marker.replace_all(text, "");
        let content_chars = content.chars().filter(|ch| !ch.is_whitespace()).count();
        if content_chars < MIN_CONTENT_CHARS {
            return Err(RtpError::PdfExtraction(format!(
                "only {content_chars} non-whitespace characters outside page markers"
            )));
        }

        let head = head_of(text, format::HEAD_CHARS);
        if !self.format.has_request_vocabulary(head) {
            return Err(RtpError::InvalidFormat(format!(
                "no request-for-production language in the first {} characters",
                format::HEAD_CHARS
            )));
        }

        let format = self.format.detect(head);
        let normalized = self.format.normalize(format, text);
        let stripped = self.format.strip_definitions(&normalized);
        let pages = PageIndex::build(&stripped, &self.page_marker, total_pages);
        let starts = self.numbering.find_starts(&stripped, &pages);

        debug!(
            format = format.as_str(),
            starts = starts.len(),
            total_pages,
            "prepared request text"
        );

        if starts.is_empty() {
            return Err(RtpError::Parsing(format!(
                "no numbered requests found in {} filing",
                format.as_str()
            )));
        }

        Ok(PreparedText {
            format,
            text: stripped,
            pages,
            starts,
        })
    }

    /// Builds the request that opens at `starts[index]`, or `None` when the
    /// segment is too short or is not a request at all.
    fn build_request(&self, prepared: &PreparedText, index: usize) -> RtpResult<Option<RtpRequest>> {
        let start = prepared.starts.get(index).ok_or_else(|| {
            RtpError::RequestExtraction(format!("no request start at index {index}"))
        })?;
        let text = prepared.text.as_str();

        let segment_end = match prepared.starts.get(index + 1) {
            Some(next) => next.position,
            None => self
                .closing_block
                .find_at(text, start.label_end)
                .map(|closing| closing.start())
                .unwrap_or(text.len()),
        };

        let raw = text.get(start.position..segment_end).ok_or_else(|| {
            RtpError::RequestExtraction(format!(
                "request {} spans an invalid range {}..{}",
                start.number, start.position, segment_end
            ))
        })?;
        let raw_chars = collapse_whitespace(&self.page_marker.replace_all(raw, ""))
            .chars()
            .count();
        if raw_chars < self.config.min_request_chars {
            debug!(request = %start.number, raw_chars, "skipping short request segment");
            return Ok(None);
        }

        let body = text.get(start.label_end..segment_end).ok_or_else(|| {
            RtpError::RequestExtraction(format!(
                "request {} has a label past its own end",
                start.number
            ))
        })?;
        let request_text = self.clean_request_text(body);
        if request_text.is_empty() || self.non_request.is_match(&request_text) {
            debug!(request = %start.number, "skipping non-request segment");
            return Ok(None);
        }

        let category = self.categories.categorize(&request_text);
        let content_end = self.content_end(text, start.label_end, segment_end);
        let end_page = prepared
            .pages
            .page_at(content_end.saturating_sub(1).max(start.position))
            .max(start.page);

        let mut confidence = start.kind.base_confidence();
        if request_text.chars().count() < SHORT_REQUEST_CHARS {
            confidence -= SHORT_REQUEST_PENALTY;
        }
        if category == RequestCategory::Other {
            confidence -= UNCATEGORIZED_PENALTY;
        }

        Ok(Some(RtpRequest {
            parent_request: self.references.parent_of(&start.number),
            cross_references: self.references.cross_references(&request_text, &start.number),
            request_number: start.number.clone(),
            request_text,
            category,
            page_range: (start.page, end_page),
            confidence_score: confidence.clamp(0.0, 1.0),
        }))
    }

    fn clean_request_text(&self, body: &str) -> String {
        let without_markers = self.page_marker.replace_all(body, " ");
        let without_placeholder = without_markers.replace(DEFINITIONS_PLACEHOLDER, " ");
        collapse_whitespace(&without_placeholder)
            .trim_start_matches(|ch: char| {
                matches!(ch, ':' | '.' | ')' | '-' | '–' | '—') || ch.is_whitespace()
            })
            .trim()
            .to_string()
    }

    /// End of the last real content in `text[from..to]`, ignoring trailing
    /// whitespace and page markers that belong to the following page.
    fn content_end(&self, text: &str, from: usize, to: usize) -> usize {
        let mut end = to;
        loop {
            let Some(window) = text.get(from..end) else {
                return end;
            };
            let trimmed = window.trim_end();
            end = from + trimmed.len();
            match self.trailing_page_marker.find(trimmed) {
                Some(marker) => end = from + marker.start(),
                None => return end,
            }
        }
    }
}

/// Lazily built requests of one prepared filing.
pub struct RequestStream<'a> {
    parser: &'a RtpParser,
    prepared: PreparedText,
    cursor: usize,
    yielded: usize,
    monitor: MemoryMonitor,
    finished: bool,
}

impl Iterator for RequestStream<'_> {
    type Item = RtpResult<RtpRequest>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while self.cursor < self.prepared.starts.len() {
            let index = self.cursor;
            self.cursor += 1;

            match self.parser.build_request(&self.prepared, index) {
                Ok(Some(request)) => {
                    self.yielded += 1;
                    if self.yielded % self.parser.config.memory_check_interval.max(1) == 0 {
                        self.monitor.check(self.yielded);
                    }
                    return Some(Ok(request));
                }
                Ok(None) => continue,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }

        self.finished = true;
        if self.yielded == 0 {
            return Some(Err(RtpError::Parsing(format!(
                "{} numbered candidates located but none formed a request",
                self.prepared.starts.len()
            ))));
        }
        None
    }
}

fn head_of(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}
