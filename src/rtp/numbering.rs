use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use regex::Regex;

/// Largest merged range ("Requests 1 through 5") accepted as a single request.
const MAX_MERGED_SPAN: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    MergedRange,
    Production,
    Request,
    Admission,
    Interrogatory,
    Subpart,
    Roman,
    Bare,
}

impl RuleKind {
    /// Rules whose label says nothing but a number.
    fn is_unlabelled(self) -> bool {
        matches!(self, RuleKind::Roman | RuleKind::Bare)
    }

    /// Rules whose label names the request type outright.
    fn is_explicit(self) -> bool {
        matches!(
            self,
            RuleKind::MergedRange
                | RuleKind::Production
                | RuleKind::Request
                | RuleKind::Admission
                | RuleKind::Interrogatory
        )
    }

    pub fn base_confidence(self) -> f64 {
        match self {
            RuleKind::Production => 0.95,
            RuleKind::Request => 0.9,
            RuleKind::Admission | RuleKind::Interrogatory => 0.85,
            RuleKind::Subpart => 0.8,
            RuleKind::MergedRange => 0.7,
            RuleKind::Roman => 0.6,
            RuleKind::Bare => 0.5,
        }
    }
}

#[derive(Debug)]
struct NumberingRule {
    kind: RuleKind,
    pattern: Regex,
}

/// Where one request begins in the (normalized) filing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStart {
    /// Offset of the line holding the numbering label.
    pub position: usize,
    /// Offset just past the label; request text starts here.
    pub label_end: usize,
    pub number: String,
    pub page: u32,
    pub kind: RuleKind,
}

#[derive(Debug)]
pub struct NumberingRules {
    rules: Vec<NumberingRule>,
}

impl NumberingRules {
    /// Rules in priority order; earlier rules claim a line before later ones.
    pub fn new() -> Result<Self> {
        let table: [(RuleKind, &str); 8] = [
            (
                RuleKind::MergedRange,
                r"(?im)^[ \t]*(?:RFP|REQUESTS?(?:\s+FOR\s+PRODUCTION)?)\s+(?:Nos?\.?\s*)?(\d{1,4})\s*(?:through|thru|to|-|–)\s*(\d{1,4})\s*[:.]",
            ),
            (
                RuleKind::Production,
                r"(?im)^[ \t]*(?:RFP|REQUEST\s+FOR\s+PRODUCTION(?:\s+OF\s+DOCUMENTS)?)\s*(?:No\.?|Number|#)?\s*(\d{1,4}[a-z]?)\b[ \t]*[:.)\-–]?",
            ),
            (
                RuleKind::Request,
                r"(?im)^[ \t]*(?:DOCUMENT\s+)?REQUEST\s*(?:No\.?|Number|#)\s*(\d{1,4}[a-z]?)\b[ \t]*[:.)\-–]?",
            ),
            (
                RuleKind::Admission,
                r"(?im)^[ \t]*(?:RFA|REQUEST\s+FOR\s+ADMISSION)\s*(?:No\.?|Number|#)?\s*(\d{1,4}[a-z]?)\b[ \t]*[:.)\-–]?",
            ),
            (
                RuleKind::Interrogatory,
                r"(?im)^[ \t]*(?:SPECIAL\s+)?INTERROGATORY\s*(?:No\.?|Number|#)?\s*(\d{1,4}[a-z]?)\b[ \t]*[:.)\-–]?",
            ),
            (
                RuleKind::Subpart,
                r"(?m)^[ \t]*(\d{1,4}(?:\([a-z]\)|\.[a-z]\b|-[a-z]\b|[a-z]\b))[.):]?[ \t]",
            ),
            (RuleKind::Roman, r"(?m)^[ \t]*([IVXLC]{1,7})\.[ \t]+"),
            (RuleKind::Bare, r"(?m)^[ \t]*(\d{1,4})[.)][ \t]+"),
        ];

        let rules = table
            .iter()
            .map(|&(kind, pattern)| -> Result<NumberingRule> {
                Ok(NumberingRule {
                    kind,
                    pattern: Regex::new(pattern)
                        .with_context(|| format!("failed to compile {kind:?} numbering regex"))?,
                })
            })
            .collect::<Result<Vec<NumberingRule>>>()?;

        Ok(Self { rules })
    }

    /// Locates every request start, ordered by position.
    pub fn find_starts(&self, text: &str, pages: &PageIndex) -> Vec<RequestStart> {
        let claimed = self.apply(text, pages);
        drop_shadowed_ranges(drop_nested_list_items(claimed.into_values().collect()))
    }

    /// Every rule over the whole text, in priority order; an offset claimed
    /// by an earlier rule is never reassigned.
    fn apply(&self, text: &str, pages: &PageIndex) -> BTreeMap<usize, RequestStart> {
        let mut claimed = BTreeMap::<usize, RequestStart>::new();

        for rule in &self.rules {
            for captures in rule.pattern.captures_iter(text) {
                let Some(whole) = captures.get(0) else {
                    continue;
                };
                if claimed.contains_key(&whole.start()) {
                    continue;
                }
                if rule.kind.is_unlabelled() && is_heading(rest_of_line(text, whole.end())) {
                    continue;
                }

                let number = match rule.kind {
                    RuleKind::MergedRange => match (captures.get(1), captures.get(2)) {
                        (Some(first), Some(last)) => format!("{}-{}", first.as_str(), last.as_str()),
                        _ => continue,
                    },
                    _ => match captures.get(1) {
                        Some(value) => value.as_str().to_string(),
                        None => continue,
                    },
                };

                claimed.insert(
                    whole.start(),
                    RequestStart {
                        position: whole.start(),
                        label_end: whole.end(),
                        number,
                        page: pages.page_at(whole.start()),
                        kind: rule.kind,
                    },
                );
            }
        }

        claimed
    }
}

/// Bare and Roman numbers after the first explicitly labelled request are
/// list items inside that request, not requests of their own.
fn drop_nested_list_items(starts: Vec<RequestStart>) -> Vec<RequestStart> {
    let Some(first_explicit) = starts
        .iter()
        .find(|start| start.kind.is_explicit())
        .map(|start| start.position)
    else {
        return starts;
    };

    starts
        .into_iter()
        .filter(|start| !(start.kind.is_unlabelled() && start.position > first_explicit))
        .collect()
}

fn rest_of_line(text: &str, from: usize) -> &str {
    let tail = text.get(from..).unwrap_or_default();
    tail.split('\n').next().unwrap_or_default()
}

/// An all-caps line such as `II. REQUESTS FOR PRODUCTION` is a section heading.
fn is_heading(line: &str) -> bool {
    line.chars().any(char::is_alphabetic) && !line.chars().any(char::is_lowercase)
}

/// A merged range survives as one combined request only when none of its
/// numbers is located individually elsewhere.
fn drop_shadowed_ranges(starts: Vec<RequestStart>) -> Vec<RequestStart> {
    let individual = starts
        .iter()
        .filter(|start| start.kind != RuleKind::MergedRange)
        .filter_map(|start| leading_number(&start.number))
        .collect::<HashSet<u32>>();

    starts
        .into_iter()
        .filter(|start| {
            if start.kind != RuleKind::MergedRange {
                return true;
            }
            match merged_bounds(&start.number) {
                Some((first, last)) => {
                    first < last
                        && last - first <= MAX_MERGED_SPAN
                        && !(first..=last).any(|number| individual.contains(&number))
                }
                None => false,
            }
        })
        .collect()
}

pub fn leading_number(value: &str) -> Option<u32> {
    let digits = value
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect::<String>();
    digits.parse().ok()
}

fn merged_bounds(number: &str) -> Option<(u32, u32)> {
    let (first, last) = number.split_once('-')?;
    Some((first.parse().ok()?, last.parse().ok()?))
}

/// Offsets of the `[Page N]` markers in a text, for position → page lookups.
#[derive(Debug, Clone, Default)]
pub struct PageIndex {
    markers: Vec<(usize, u32)>,
    total_pages: u32,
}

impl PageIndex {
    pub fn build(text: &str, page_marker: &Regex, total_pages: u32) -> Self {
        let markers = page_marker
            .captures_iter(text)
            .filter_map(|captures| {
                let offset = captures.get(0)?.start();
                let page = captures.get(1)?.as_str().parse::<u32>().ok()?;
                Some((offset, page))
            })
            .collect();

        Self {
            markers,
            total_pages,
        }
    }

    /// Page of the last marker at or before `position`; page 1 before any marker.
    pub fn page_at(&self, position: usize) -> u32 {
        let index = self
            .markers
            .partition_point(|(offset, _)| *offset <= position);
        let page = index
            .checked_sub(1)
            .map(|index| self.markers[index].1)
            .unwrap_or(1);

        if self.total_pages > 0 {
            page.min(self.total_pages)
        } else {
            page
        }
    }
}
