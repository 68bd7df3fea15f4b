#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::config::ChunkerConfig;
use crate::model::{DocumentChunk, Metadata};

/// Break kinds in the order they are preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakKind {
    Paragraph,
    Sentence,
    Word,
}

const BREAK_PREFERENCE: [BreakKind; 3] = [BreakKind::Paragraph, BreakKind::Sentence, BreakKind::Word];

/// Overlapping, boundary-aware chunks for retrieval. Offsets are in characters.
#[derive(Debug)]
pub struct DocumentChunker {
    config: ChunkerConfig,
    page_marker: Regex,
    blank_lines: Regex,
    inline_space: Regex,
}

impl DocumentChunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            page_marker: Regex::new(r"\[Page\s+\d+\]").context("failed to compile page marker regex")?,
            blank_lines: Regex::new(r"\n{3,}").context("failed to compile blank line regex")?,
            inline_space: Regex::new(r"[ \t]+").context("failed to compile inline space regex")?,
        })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Drops page markers and collapses runs of blank lines and inline spacing.
    pub fn clean_text(&self, text: &str) -> String {
        let unix = text.replace("\r\n", "\n").replace('\r', "\n");
        let without_markers = self.page_marker.replace_all(&unix, "");
        let spaced = self.inline_space.replace_all(&without_markers, " ");
        let lines = spaced
            .lines()
            .map(str::trim)
            .collect::<Vec<&str>>()
            .join("\n");
        self.blank_lines
            .replace_all(&lines, "\n\n")
            .trim()
            .to_string()
    }

    pub fn chunk_document(&self, text: &str, metadata: &Metadata) -> Vec<DocumentChunk> {
        let cleaned = self.clean_text(text);
        let chars = cleaned.chars().collect::<Vec<char>>();
        if chars.len() < self.config.min_size {
            debug!(chars = chars.len(), min_size = self.config.min_size, "text too short to chunk");
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = self.find_chunk_end(&chars, start);
            let mut chunk_metadata = metadata.clone();
            chunk_metadata.insert("chunk_index".to_string(), Value::from(chunks.len()));
            chunk_metadata.insert("has_overlap".to_string(), Value::Bool(!chunks.is_empty()));

            chunks.push(DocumentChunk {
                content: chars[start..end].iter().collect(),
                chunk_index: chunks.len(),
                start_char: start,
                end_char: end,
                metadata: chunk_metadata,
            });

            if end >= chars.len() {
                break;
            }
            start = end - self.config.overlap;
        }

        let total = chunks.len();
        for chunk in &mut chunks {
            chunk
                .metadata
                .insert("total_chunks".to_string(), Value::from(total));
        }

        debug!(chars = chars.len(), chunks = total, "chunked document");
        chunks
    }

    /// End offset (exclusive) of the chunk that starts at `start`.
    ///
    /// Searches `target ± variance`, never shorter than `min_size` nor longer
    /// than `max_size`, and never leaves a tail shorter than `min_size`.
    pub fn find_chunk_end(&self, chars: &[char], start: usize) -> usize {
        let len = chars.len();
        let remaining = len.saturating_sub(start);
        let config = &self.config;
        if remaining <= config.target_size {
            return len;
        }

        let target = start + config.target_size;
        let low = start + config.min_size.max(config.target_size.saturating_sub(config.variance));
        let high = (start + config.target_size + config.variance)
            .min(start + config.max_size)
            .min(len.saturating_sub(config.min_size));

        if high < low {
            return if remaining <= config.max_size {
                len
            } else {
                target.min(len)
            };
        }

        for kind in BREAK_PREFERENCE {
            let best = (low..=high)
                .filter(|&position| is_break(chars, position, kind))
                .min_by_key(|&position| position.abs_diff(target));
            if let Some(position) = best {
                return position;
            }
        }

        target.clamp(low, high)
    }
}

/// Whether a chunk may end right before `chars[position]`.
fn is_break(chars: &[char], position: usize, kind: BreakKind) -> bool {
    if position == 0 || position >= chars.len() {
        return false;
    }
    let previous = chars[position - 1];
    let next = chars[position];

    match kind {
        BreakKind::Paragraph => position >= 2 && previous == '\n' && chars[position - 2] == '\n',
        BreakKind::Sentence => matches!(previous, '.' | '!' | '?') && next.is_whitespace(),
        BreakKind::Word => previous.is_whitespace() && !next.is_whitespace(),
    }
}
