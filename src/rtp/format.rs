use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

pub const DEFINITIONS_PLACEHOLDER: &str = "[DEFINITIONS REMOVED]";

/// How far into a filing the format and vocabulary scans look.
pub const HEAD_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Federal,
    State,
    DefinitionFirst,
    Subparts,
    Standard,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::Federal => "federal",
            DocumentFormat::State => "state",
            DocumentFormat::DefinitionFirst => "definition_first",
            DocumentFormat::Subparts => "subparts",
            DocumentFormat::Standard => "standard",
        }
    }
}

#[derive(Debug)]
pub struct FormatRules {
    vocabulary: Regex,
    federal: Regex,
    state: Regex,
    subpart_marker: Regex,
    federal_caption: Regex,
    rfp_heading: Regex,
    state_demand: Regex,
    spaced_subpart: Regex,
    definitions_header: Regex,
    section_header: Regex,
    labelled_marker: Regex,
    page_marker: Regex,
}

impl FormatRules {
    pub fn new() -> Result<Self> {
        Ok(Self {
            vocabulary: Regex::new(
                r"(?i)\brequests?\s+for\s+production\b|\brequests?\s+to\s+produce\b|\bproduction\s+of\s+documents\b|\bRFP\s*(?:No|#|\d)|\bdocument\s+requests?\b|\bdemands?\s+for\s+(?:production|inspection)\b|\binterrogator(?:y|ies)\b|\brequests?\s+for\s+admissions?\b",
            )
            .context("failed to compile request vocabulary regex")?,
            federal: Regex::new(
                r"(?i)\bUNITED\s+STATES\s+DISTRICT\s+COURT\b|\bFed(?:eral|\.)\s*R(?:ules?|\.)\s*(?:of\s+)?Civ(?:il|\.)\s*P(?:rocedure|\.)|\bRule\s+34\b",
            )
            .context("failed to compile federal format regex")?,
            state: Regex::new(
                r"(?i)\bSUPERIOR\s+COURT\b|\bCOUNTY\s+OF\b|\bCode\s+of\s+Civil\s+Procedure\b|\bDEMANDS?\s+(?:FOR\s+(?:PRODUCTION|INSPECTION)|NO\.?\s*\d)",
            )
            .context("failed to compile state format regex")?,
            subpart_marker: Regex::new(r"(?m)^[ \t]*\d{1,4}(?:\s?\([a-z]\)|\.[a-z]\b|-[a-z]\b|[a-z]\b)")
                .context("failed to compile subpart detection regex")?,
            federal_caption: Regex::new(
                r"(?im)^[ \t]*(?:UNITED\s+STATES\s+DISTRICT\s+COURT|(?:FOR\s+THE\s+)?(?:(?:NORTHERN|SOUTHERN|EASTERN|WESTERN|CENTRAL|MIDDLE)\s+)?DISTRICT\s+OF\s+[A-Z][A-Z .]*|(?:Civil\s+Action|Case)\s+No\.?.*)[ \t]*$",
            )
            .context("failed to compile federal caption regex")?,
            rfp_heading: Regex::new(
                r"(?im)^([ \t]*)REQUEST\s+FOR\s+PRODUCTION(?:\s+OF\s+DOCUMENTS)?\s+(?:NUMBER|NO\.?|#)\s*(\d{1,4}[a-z]?)\b[ \t]*:?",
            )
            .context("failed to compile request heading regex")?,
            state_demand: Regex::new(
                r"(?im)^([ \t]*)(?:SPECIAL\s+)?DEMAND(?:\s+FOR\s+(?:PRODUCTION|INSPECTION))?\s+(?:NUMBER|NO\.?|#)\s*(\d{1,4}[a-z]?)\b[ \t]*:?",
            )
            .context("failed to compile state demand regex")?,
            spaced_subpart: Regex::new(r"(?m)^([ \t]*\d{1,4})[ \t]+\(([a-z])\)")
                .context("failed to compile spaced subpart regex")?,
            definitions_header: Regex::new(
                r"(?im)^[ \t]*(?:(?:[IVX]+|\d+|[A-Z])\.[ \t]*)?(?:(?:GENERAL\s+)?(?:DEFINITIONS|INSTRUCTIONS)(?:\s+AND\s+(?:DEFINITIONS|INSTRUCTIONS))?|GENERAL\s+(?:OBJECTIONS|PROVISIONS|STATEMENTS?))[ \t]*:?[ \t]*$",
            )
            .context("failed to compile definitions header regex")?,
            section_header: Regex::new(
                r"(?im)^[ \t]*(?:(?:[IVX]+|\d+|[A-Z])\.[ \t]*)?(?:(?:DOCUMENTS?\s+)?REQUESTS?(?:\s+FOR\s+(?:PRODUCTION|ADMISSIONS?))?(?:\s+OF\s+DOCUMENTS)?|DOCUMENTS?\s+(?:REQUESTED|TO\s+BE\s+PRODUCED)|INTERROGATORIES|DEMANDS?(?:\s+FOR\s+PRODUCTION)?)[ \t]*:?[ \t]*$",
            )
            .context("failed to compile section header regex")?,
            labelled_marker: Regex::new(
                r"(?im)^[ \t]*(?:RFP|RFA|REQUEST(?:\s+FOR\s+(?:PRODUCTION|ADMISSION))?|INTERROGATORY|DEMAND)\s*(?:No\.?|Number|#)?\s*\d",
            )
            .context("failed to compile labelled request marker regex")?,
            page_marker: Regex::new(r"\[Page\s+\d+\]")
                .context("failed to compile page marker regex")?,
        })
    }

    pub fn has_request_vocabulary(&self, head: &str) -> bool {
        self.vocabulary.is_match(head)
    }

    pub fn detect(&self, head: &str) -> DocumentFormat {
        if self.federal.is_match(head) {
            return DocumentFormat::Federal;
        }
        if self.state.is_match(head) {
            return DocumentFormat::State;
        }

        if let Some(definitions) = self.definitions_header.find(head) {
            let first_request = self.labelled_marker.find(head).map(|m| m.start());
            if first_request.is_none_or(|position| definitions.start() < position) {
                return DocumentFormat::DefinitionFirst;
            }
        }

        if self.subpart_marker.find_iter(head).count() >= 3 {
            return DocumentFormat::Subparts;
        }

        DocumentFormat::Standard
    }

    /// Light, format-specific rewriting that makes numbering labels uniform.
    pub fn normalize(&self, format: DocumentFormat, text: &str) -> String {
        let normalized = match format {
            DocumentFormat::Federal => self.federal_caption.replace_all(text, "").into_owned(),
            DocumentFormat::State => self
                .state_demand
                .replace_all(text, "${1}RFP No. ${2}:")
                .into_owned(),
            DocumentFormat::Subparts => self
                .spaced_subpart
                .replace_all(text, "${1}(${2})")
                .into_owned(),
            DocumentFormat::DefinitionFirst | DocumentFormat::Standard => text.to_string(),
        };

        self.rfp_heading
            .replace_all(&normalized, "${1}RFP No. ${2}:")
            .into_owned()
    }

    /// Replaces every definitions/instructions section with a placeholder.
    ///
    /// A section runs from its header to the next section header, labelled
    /// request, or definitions header. Page markers inside the removed span are
    /// kept so later page lookups stay correct. A header with nothing after it
    /// to terminate the section is left alone.
    pub fn strip_definitions(&self, text: &str) -> String {
        let mut output = String::with_capacity(text.len());
        let mut cursor = 0usize;

        while let Some(header) = self.definitions_header.find_at(text, cursor) {
            let Some(section_end) = self.section_end(text, header.end()) else {
                break;
            };

            output.push_str(&text[cursor..header.start()]);
            output.push_str(DEFINITIONS_PLACEHOLDER);
            output.push('\n');
            for marker in self.page_marker.find_iter(&text[header.start()..section_end]) {
                output.push_str(marker.as_str());
                output.push('\n');
            }
            output.push('\n');
            cursor = section_end;
        }

        output.push_str(&text[cursor..]);
        output
    }

    fn section_end(&self, text: &str, from: usize) -> Option<usize> {
        [
            &self.section_header,
            &self.labelled_marker,
            &self.definitions_header,
        ]
        .iter()
        .filter_map(|pattern| pattern.find_at(text, from).map(|m| m.start()))
        .min()
    }
}
