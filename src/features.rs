use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::PageFeatures;
use crate::util::non_whitespace_char_count;

const FULL_PAGE_CHARS: f64 = 3000.0;
const EDGE_BAND: f64 = 0.08;
const LETTERHEAD_LINES: usize = 8;
const SIGNATURE_LINES: usize = 15;
const BATES_EDGE_LINES: usize = 3;

/// One run of text with its position, as reported by the PDF extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub font: String,
    pub size: f64,
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub text: String,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub spans: Vec<TextSpan>,
}

impl PageLayout {
    pub fn from_text(page_index: usize, text: impl Into<String>) -> Self {
        Self {
            page_index,
            text: text.into(),
            ..Self::default()
        }
    }

    fn has_geometry(&self) -> bool {
        !self.spans.is_empty() && self.width > 0.0 && self.height > 0.0
    }
}

/// A Bates stamp split into the parts that must stay fixed across a production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatesStamp {
    pub prefix: String,
    pub number: u64,
    pub suffix: String,
}

impl BatesStamp {
    pub fn follows(&self, previous: &BatesStamp) -> bool {
        self.prefix == previous.prefix
            && self.suffix == previous.suffix
            && previous.number.checked_add(1) == Some(self.number)
    }
}

/// Finds and splits Bates stamps.
#[derive(Debug)]
pub struct BatesParser {
    pattern: Regex,
}

impl BatesParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"\b([A-Z]{2,10}[_\-]?)\s?(\d{5,10})((?:[_\-.][A-Z0-9]{1,4})?)\b")
                .context("failed to compile bates regex")?,
        })
    }

    pub fn parse(&self, value: &str) -> Option<BatesStamp> {
        let captures = self.pattern.captures(value)?;
        let prefix = captures.get(1)?.as_str().trim().to_string();
        let number = captures.get(2)?.as_str().parse::<u64>().ok()?;
        let suffix = captures
            .get(3)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        Some(BatesStamp {
            prefix,
            number,
            suffix,
        })
    }

    /// The first stamp on `line`, as printed.
    pub fn find<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.pattern.find(line).map(|found| found.as_str().trim())
    }
}

#[derive(Debug)]
pub struct PageFeatureExtractor {
    letterhead_cues: Vec<Regex>,
    signature_cues: Vec<Regex>,
    page_label: Regex,
    dashed_number: Regex,
    bare_number: Regex,
    roman_number: Regex,
    bates: BatesParser,
}

impl PageFeatureExtractor {
    pub fn new() -> Result<Self> {
        let letterhead_cues = [
            r"(?i)\blaw\s+(?:offices?|group|firm)\b",
            r"(?:^|[\s,])(?:LLP|L\.L\.P\.|LLC|PLLC|P\.C\.|P\.A\.)(?:$|[\s,.])",
            r"(?i)\b(?:attorneys|counselors)\s+at\s+law\b",
            r"(?i)\b(?:suite|ste\.|floor)\s+\d+",
            r"(?i)\b(?:tel(?:ephone)?|phone|fax|facsimile)\b\.?:?\s*\(?\d{3}",
            r"\(?\b\d{3}\)?[\s.\-]\d{3}[\s.\-]\d{4}\b",
            r"(?i)\bwww\.[a-z0-9\-]+\.[a-z]{2,}|[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+\.[A-Za-z.]{2,}",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).context("failed to compile letterhead regex"))
        .collect::<Result<Vec<Regex>>>()?;

        let signature_cues = [
            r"/s/\s*\S",
            r"(?i)^\s*respectfully\s+submitted",
            r"(?i)^\s*(?:very\s+truly\s+yours|sincerely|best\s+regards|regards)\s*,?\s*$",
            r"(?i)^\s*by:\s*_{3,}",
            r"^\s*_{8,}\s*$",
            r"(?i)\bnotary\s+public\b",
            r"(?i)^\s*(?:signature|signed)\s*:",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).context("failed to compile signature regex"))
        .collect::<Result<Vec<Regex>>>()?;

        Ok(Self {
            letterhead_cues,
            signature_cues,
            page_label: Regex::new(r"(?i)^page\s+(\d{1,4})(?:\s+of\s+\d{1,4})?$")
                .context("failed to compile page label regex")?,
            dashed_number: Regex::new(r"^[-–—]\s*(\d{1,4})\s*[-–—]$")
                .context("failed to compile dashed page number regex")?,
            bare_number: Regex::new(r"^(\d{1,4})$")
                .context("failed to compile bare page number regex")?,
            roman_number: Regex::new(r"(?i)^[ivxlc]{1,7}$")
                .context("failed to compile roman page number regex")?,
            bates: BatesParser::new()?,
        })
    }

    pub fn extract(&self, layout: &PageLayout) -> PageFeatures {
        let lines = layout
            .text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<&str>>();

        let (fonts, font_sizes) = distinct_fonts(layout);
        let (has_header, has_footer) = edge_bands(layout);
        let (has_page_number, printed_page_number) = self.detect_page_number(&lines);

        PageFeatures {
            page_index: layout.page_index,
            text: layout.text.clone(),
            fonts,
            font_sizes,
            has_header,
            has_footer,
            has_page_number,
            has_letterhead: self.detect_letterhead(layout, &lines),
            has_signature_block: self.detect_signature_block(&lines),
            text_density: text_density(layout),
            dominant_font: dominant_font(layout),
            bates_number: self.detect_bates(&lines),
            structural_hash: structural_hash(layout, &lines),
            printed_page_number,
        }
    }

    pub fn extract_all(&self, layouts: &[PageLayout]) -> Vec<PageFeatures> {
        layouts.iter().map(|layout| self.extract(layout)).collect()
    }

    pub fn parse_bates(&self, value: &str) -> Option<BatesStamp> {
        self.bates.parse(value)
    }

    fn detect_page_number(&self, lines: &[&str]) -> (bool, Option<u32>) {
        for line in lines.iter().rev().take(5).chain(lines.iter().take(2)) {
            let normalized = line.split_whitespace().collect::<Vec<&str>>().join(" ");

            let numeric = self
                .page_label
                .captures(&normalized)
                .or_else(|| self.dashed_number.captures(&normalized))
                .or_else(|| self.bare_number.captures(&normalized))
                .and_then(|captures| captures.get(1))
                .and_then(|value| value.as_str().parse::<u32>().ok());
            if numeric.is_some() {
                return (true, numeric);
            }

            if self.roman_number.is_match(&normalized) {
                return (true, None);
            }
        }

        (false, None)
    }

    fn detect_letterhead(&self, layout: &PageLayout, lines: &[&str]) -> bool {
        let top = lines
            .iter()
            .take(LETTERHEAD_LINES)
            .copied()
            .collect::<Vec<&str>>();
        let cue_count = self
            .letterhead_cues
            .iter()
            .filter(|cue| top.iter().any(|line| cue.is_match(line)))
            .count();

        cue_count >= 2 || (cue_count == 1 && has_oversized_top_font(layout))
    }

    fn detect_signature_block(&self, lines: &[&str]) -> bool {
        let start = lines.len().saturating_sub(SIGNATURE_LINES);
        lines[start..]
            .iter()
            .any(|line| self.signature_cues.iter().any(|cue| cue.is_match(line)))
    }

    fn detect_bates(&self, lines: &[&str]) -> Option<String> {
        lines
            .iter()
            .rev()
            .take(BATES_EDGE_LINES)
            .chain(lines.iter().take(BATES_EDGE_LINES))
            .find_map(|line| self.bates.find(line))
            .map(str::to_string)
    }
}

fn distinct_fonts(layout: &PageLayout) -> (Vec<String>, Vec<f64>) {
    let mut fonts = Vec::<String>::new();
    let mut sizes = Vec::<f64>::new();

    for span in &layout.spans {
        if !span.font.is_empty() && !fonts.contains(&span.font) {
            fonts.push(span.font.clone());
        }
        let size = (span.size * 2.0).round() / 2.0;
        if size > 0.0 && !sizes.iter().any(|known| (known - size).abs() < f64::EPSILON) {
            sizes.push(size);
        }
    }

    (fonts, sizes)
}

fn dominant_font(layout: &PageLayout) -> Option<String> {
    let mut weights = HashMap::<&str, usize>::new();
    for span in &layout.spans {
        if span.font.is_empty() {
            continue;
        }
        *weights.entry(span.font.as_str()).or_insert(0) += non_whitespace_char_count(&span.text);
    }

    weights
        .into_iter()
        .max_by(|(font_a, weight_a), (font_b, weight_b)| {
            weight_a.cmp(weight_b).then_with(|| font_b.cmp(font_a))
        })
        .map(|(font, _)| font.to_string())
}

fn edge_bands(layout: &PageLayout) -> (bool, bool) {
    if !layout.has_geometry() {
        return (false, false);
    }

    let header_limit = layout.height * EDGE_BAND;
    let footer_limit = layout.height * (1.0 - EDGE_BAND);
    let has_header = layout
        .spans
        .iter()
        .any(|span| !span.text.trim().is_empty() && span.top < header_limit);
    let has_footer = layout
        .spans
        .iter()
        .any(|span| !span.text.trim().is_empty() && span.top + span.height > footer_limit);

    (has_header, has_footer)
}

fn text_density(layout: &PageLayout) -> f64 {
    if layout.has_geometry() {
        let covered = layout
            .spans
            .iter()
            .map(|span| span.width.max(0.0) * span.height.max(0.0))
            .sum::<f64>();
        return (covered / (layout.width * layout.height)).clamp(0.0, 1.0);
    }

    (non_whitespace_char_count(&layout.text) as f64 / FULL_PAGE_CHARS).clamp(0.0, 1.0)
}

fn has_oversized_top_font(layout: &PageLayout) -> bool {
    if !layout.has_geometry() {
        return false;
    }

    let mut sizes = layout
        .spans
        .iter()
        .map(|span| span.size)
        .filter(|size| *size > 0.0)
        .collect::<Vec<f64>>();
    if sizes.is_empty() {
        return false;
    }
    sizes.sort_by(f64::total_cmp);
    let median = sizes[sizes.len() / 2];

    layout
        .spans
        .iter()
        .any(|span| span.top < layout.height * 0.15 && span.size >= median * 1.3)
}

fn structural_hash(layout: &PageLayout, lines: &[&str]) -> String {
    let mut hasher = Sha256::new();

    if layout.has_geometry() {
        let mut cells = layout
            .spans
            .iter()
            .map(|span| {
                (
                    (span.top / layout.height * 20.0).floor() as i64,
                    (span.left / layout.width * 20.0).floor() as i64,
                    (span.size * 2.0).round() as i64,
                )
            })
            .collect::<Vec<(i64, i64, i64)>>();
        cells.sort_unstable();
        cells.dedup();
        for (row, column, size) in cells {
            hasher.update(format!("{row}:{column}:{size};").as_bytes());
        }
    } else {
        for line in lines.iter().take(60) {
            let bucket = (line.chars().count() / 10).min(12);
            hasher.update(format!("{bucket};").as_bytes());
        }
        hasher.update(format!("n{}", (lines.len() / 5).min(20)).as_bytes());
    }

    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, font: &str, size: f64, top: f64) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            font: font.to_string(),
            size,
            top,
            left: 72.0,
            width: 400.0,
            height: size * 1.2,
        }
    }

    fn extractor() -> PageFeatureExtractor {
        PageFeatureExtractor::new().expect("extractor regexes should compile")
    }

    #[test]
    fn detects_letterhead_from_firm_cues() {
        let text = "SMITH & JONES LLP\nAttorneys at Law\n100 Main Street, Suite 400\nTel: (555) 123-4567\n\nDear Counsel:";
        let features = extractor().extract(&PageLayout::from_text(3, text));
        assert!(features.has_letterhead);
        assert!(!features.has_signature_block);
    }

    #[test]
    fn single_cue_is_not_letterhead_without_large_font() {
        let text = "Meeting notes\nCall (555) 123-4567 tomorrow\nagenda follows";
        let features = extractor().extract(&PageLayout::from_text(0, text));
        assert!(!features.has_letterhead);
    }

    #[test]
    fn detects_page_numbers_and_bates() {
        let text = "Body text of the page\nmore body\nPage 3 of 10\nACME0001234";
        let features = extractor().extract(&PageLayout::from_text(2, text));
        assert!(features.has_page_number);
        assert_eq!(features.printed_page_number, Some(3));
        assert_eq!(features.bates_number.as_deref(), Some("ACME0001234"));
    }

    #[test]
    fn detects_signature_block() {
        let text = "We look forward to your response.\n\nRespectfully submitted,\n\n/s/ Jane Doe\nJane Doe";
        let features = extractor().extract(&PageLayout::from_text(5, text));
        assert!(features.has_signature_block);
    }

    #[test]
    fn bates_stamps_follow_only_under_shared_prefix() {
        let extractor = extractor();
        let first = extractor.parse_bates("ACME-000100").expect("bates parses");
        let second = extractor.parse_bates("ACME-000101").expect("bates parses");
        let foreign = extractor.parse_bates("OTHER000101").expect("bates parses");
        assert!(second.follows(&first));
        assert!(!foreign.follows(&first));
        assert!(!first.follows(&second));
    }

    #[test]
    fn bates_parser_splits_suffixed_stamps() {
        let parser = BatesParser::new().expect("bates parser builds");
        let stamp = parser.parse("Produced as DEF_0004512.A1").expect("bates parses");
        assert_eq!(stamp.prefix, "DEF_");
        assert_eq!(stamp.number, 4512);
        assert_eq!(stamp.suffix, ".A1");
        assert_eq!(parser.find("footer DEF_0004512.A1 confidential"), Some("DEF_0004512.A1"));
        assert!(parser.parse("Page 3 of 12").is_none());
    }

    #[test]
    fn geometry_drives_fonts_density_and_edges() {
        let layout = PageLayout {
            page_index: 0,
            text: "HEADER\nbody\nbody".to_string(),
            width: 612.0,
            height: 792.0,
            spans: vec![
                span("HEADER", "Times-Bold", 14.0, 20.0),
                span("body text that is long", "Times", 11.0, 300.0),
                span("more body text", "Times", 11.0, 320.0),
                span("1", "Times", 10.0, 770.0),
            ],
        };
        let features = extractor().extract(&layout);
        assert_eq!(features.fonts, vec!["Times-Bold", "Times"]);
        assert_eq!(features.font_sizes, vec![14.0, 11.0, 10.0]);
        assert_eq!(features.dominant_font.as_deref(), Some("Times"));
        assert!(features.has_header);
        assert!(features.has_footer);
        assert!(features.text_density > 0.0 && features.text_density <= 1.0);
        assert_eq!(features.structural_hash.len(), 16);
    }

    #[test]
    fn structural_hash_is_stable_for_identical_layouts() {
        let extractor = extractor();
        let a = extractor.extract(&PageLayout::from_text(0, "line one\nline two is longer"));
        let b = extractor.extract(&PageLayout::from_text(1, "line ONE\nline two is LONGER"));
        assert_eq!(a.structural_hash, b.structural_hash);
    }
}
