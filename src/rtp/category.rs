use anyhow::{Context, Result};
use regex::Regex;

use crate::model::RequestCategory;

/// Scored categories, in the order ties are resolved.
const SCORED: [RequestCategory; 4] = [
    RequestCategory::Documents,
    RequestCategory::Communications,
    RequestCategory::ElectronicallyStored,
    RequestCategory::TangibleThings,
];

#[derive(Debug)]
struct CategoryRule {
    category: RequestCategory,
    weight: f64,
    pattern: Regex,
}

/// Per-category keyword scores for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryScores([f64; 4]);

impl CategoryScores {
    pub fn get(&self, category: RequestCategory) -> f64 {
        slot(category).map(|index| self.0[index]).unwrap_or(0.0)
    }

    fn set(&mut self, category: RequestCategory, value: f64) {
        if let Some(index) = slot(category) {
            self.0[index] = value;
        }
    }

    fn add(&mut self, category: RequestCategory, value: f64) {
        if let Some(index) = slot(category) {
            self.0[index] += value;
        }
    }
}

fn slot(category: RequestCategory) -> Option<usize> {
    SCORED.iter().position(|candidate| *candidate == category)
}

#[derive(Debug)]
pub struct CategoryTable {
    rules: Vec<CategoryRule>,
    esi_specific: Regex,
    messaging: Regex,
    all_documents: Regex,
}

impl CategoryTable {
    pub fn new() -> Result<Self> {
        let table: [(RequestCategory, f64, &str); 6] = [
            (
                RequestCategory::Documents,
                1.0,
                r"(?i)\b(?:documents?|records?|files?|reports?|contracts?|agreements?|invoices?|statements?|minutes|policies|polic(?:y|ies)|manuals?|ledgers?|receipts?)\b",
            ),
            (
                RequestCategory::Documents,
                0.5,
                r"(?i)\b(?:produce|production|copies|copy)\b",
            ),
            (
                RequestCategory::Communications,
                1.0,
                r"(?i)\b(?:communications?|correspondence|e-?mails?|letters?|memos?|memoranda|text\s+messages?|messages?|instant\s+messages?|voicemails?|conversations?|chats?)\b",
            ),
            (
                RequestCategory::ElectronicallyStored,
                1.0,
                r"(?i)\b(?:electronically\s+stored|ESI|databases?|electronic\s+(?:data|files?|records?)|metadata|spreadsheets?|e-?mails?|computers?|digital|native\s+format|hard\s+drives?|servers?|cloud\s+storage)\b",
            ),
            (
                RequestCategory::TangibleThings,
                1.0,
                r"(?i)\b(?:tangible\s+things?|physical\s+(?:evidence|items?|objects?)|samples?|equipment|devices?|products?|photographs?|videos?|recordings?|prototypes?|vehicles?|models?)\b",
            ),
            (
                RequestCategory::TangibleThings,
                0.5,
                r"(?i)\b(?:inspect(?:ion)?|examine|examination)\b",
            ),
        ];

        let rules = table
            .iter()
            .map(|&(category, weight, pattern)| -> Result<CategoryRule> {
                Ok(CategoryRule {
                    category,
                    weight,
                    pattern: Regex::new(pattern).with_context(|| {
                        format!("failed to compile {} category regex", category.as_str())
                    })?,
                })
            })
            .collect::<Result<Vec<CategoryRule>>>()?;

        Ok(Self {
            rules,
            esi_specific: Regex::new(r"(?i)\b(?:e-?mails?|databases?|ESI|electronically\s+stored)\b")
                .context("failed to compile ESI-specific regex")?,
            messaging: Regex::new(
                r"(?i)\b(?:e-?mails?|text\s+messages?|texts|instant\s+messages?|IMs?|SMS|chats?)\b",
            )
            .context("failed to compile messaging regex")?,
            all_documents: Regex::new(r"(?i)\b(?:all|any(?:\s+and\s+all)?)\b.{0,80}?\bdocuments?\b")
                .context("failed to compile all-documents regex")?,
        })
    }

    /// Raw scores: every match adds `weight / (occurrence + 1)`, so a rule's
    /// earliest matches count most.
    pub fn score(&self, text: &str) -> CategoryScores {
        let mut scores = CategoryScores::default();
        for rule in &self.rules {
            let score = rule
                .pattern
                .find_iter(text)
                .enumerate()
                .map(|(occurrence, _)| rule.weight / (occurrence as f64 + 1.0))
                .sum::<f64>();
            scores.add(rule.category, score);
        }
        scores
    }

    /// Applies the overlap rules to raw scores.
    ///
    /// Documents vs electronically stored: ESI keeps its score only when
    /// email/database/ESI terms appear, and then documents yields. Messaging
    /// terms hand communications the win over documents.
    pub fn resolve(&self, text: &str, mut scores: CategoryScores) -> CategoryScores {
        let documents = scores.get(RequestCategory::Documents);
        let electronic = scores.get(RequestCategory::ElectronicallyStored);
        if documents > 0.0 && electronic > 0.0 {
            if self.esi_specific.is_match(text) {
                scores.set(RequestCategory::Documents, 0.0);
            } else {
                scores.set(RequestCategory::ElectronicallyStored, 0.0);
            }
        }

        if scores.get(RequestCategory::Communications) > 0.0 && self.messaging.is_match(text) {
            scores.set(RequestCategory::Documents, 0.0);
        }

        scores
    }

    pub fn categorize(&self, text: &str) -> RequestCategory {
        let scores = self.resolve(text, self.score(text));

        let mut best: Option<(RequestCategory, f64)> = None;
        for category in SCORED {
            let score = scores.get(category);
            if score <= 0.0 {
                continue;
            }
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((category, score));
            }
        }

        match best {
            Some((category, _)) => category,
            None if self.all_documents.is_match(text) => RequestCategory::Documents,
            None => RequestCategory::Other,
        }
    }
}
