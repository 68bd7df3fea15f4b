use std::collections::BTreeSet;

use anyhow::{Context, Result};
use regex::Regex;

use super::numbering::leading_number;

/// Range references wider than this are treated as noise and not expanded.
const MAX_RANGE_EXPANSION: u32 = 100;

#[derive(Debug)]
pub struct ReferenceRules {
    parent: Regex,
    single: Regex,
    range: Regex,
}

impl ReferenceRules {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parent: Regex::new(r"(?i)^(\d{1,4})\s*(?:\([a-z]\)|\.[a-z]|-[a-z]|[a-z])$")
                .context("failed to compile parent request regex")?,
            single: Regex::new(
                r"(?i)\b(?:see|refer(?:ring)?\s+to|pursuant\s+to|in\s+response\s+to|responsive\s+to)\s+(?:Request|RFP)s?\s*(?:No\.?\s*)?(\d{1,4}[a-z]?)\b",
            )
            .context("failed to compile cross reference regex")?,
            range: Regex::new(
                r"(?i)\b(?:Request|RFP)s\s*(?:Nos?\.?\s*)?(\d{1,4})\s*(?:through|thru|to|-|–)\s*(\d{1,4})\b",
            )
            .context("failed to compile cross reference range regex")?,
        })
    }

    /// `12a`, `12(a)`, `12.a` and `12-a` all belong to request `12`.
    pub fn parent_of(&self, request_number: &str) -> Option<String> {
        self.parent
            .captures(request_number.trim())
            .and_then(|captures| captures.get(1))
            .map(|parent| parent.as_str().to_string())
    }

    /// Other requests mentioned in `text`, in numeric order, never `own_number`.
    pub fn cross_references(&self, text: &str, own_number: &str) -> Vec<String> {
        let mut found = BTreeSet::<(u32, String)>::new();

        for captures in self.single.captures_iter(text) {
            if let Some(number) = captures.get(1) {
                let number = number.as_str().to_ascii_lowercase();
                if let Some(key) = leading_number(&number) {
                    found.insert((key, number));
                }
            }
        }

        for captures in self.range.captures_iter(text) {
            let bounds = captures
                .get(1)
                .zip(captures.get(2))
                .and_then(|(first, last)| {
                    Some((first.as_str().parse::<u32>().ok()?, last.as_str().parse::<u32>().ok()?))
                });
            let Some((first, last)) = bounds else {
                continue;
            };
            if first > last || last - first > MAX_RANGE_EXPANSION {
                continue;
            }
            for number in first..=last {
                found.insert((number, number.to_string()));
            }
        }

        let own = own_number.trim().to_ascii_lowercase();
        found
            .into_iter()
            .map(|(_, number)| number)
            .filter(|number| *number != own)
            .collect()
    }
}
