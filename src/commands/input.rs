use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::TextSourceArgs;
use crate::extract::{extract_pages_with_pdftotext, page_tagged_text, split_page_tagged_text};
use crate::features::PageLayout;
use crate::util::read_json;

/// Page text plus its `[Page N]` tagged rendering.
pub(super) struct LoadedPages {
    pub pages: Vec<String>,
    pub tagged_text: String,
}

impl LoadedPages {
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }
}

pub(super) fn load_pages(source: &TextSourceArgs) -> Result<LoadedPages> {
    match (&source.pdf, &source.text) {
        (Some(pdf), None) => load_pdf_pages(pdf, source.max_pages),
        (None, Some(text)) => load_text_pages(text, source.max_pages),
        _ => bail!("exactly one of --pdf or --text is required"),
    }
}

pub(super) fn load_pdf_pages(pdf: &Path, max_pages: Option<usize>) -> Result<LoadedPages> {
    let pages = extract_pages_with_pdftotext(pdf, max_pages)?;
    info!(pdf = %pdf.display(), pages = pages.len(), "extracted page text");
    let tagged_text = page_tagged_text(&pages);
    Ok(LoadedPages { pages, tagged_text })
}

fn load_text_pages(path: &Path, max_pages: Option<usize>) -> Result<LoadedPages> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read text input {}", path.display()))?;
    let mut pages = split_page_tagged_text(&raw)?;
    if let Some(max_pages) = max_pages {
        pages.truncate(max_pages);
    }
    let tagged_text = page_tagged_text(&pages);
    Ok(LoadedPages { pages, tagged_text })
}

/// Text-only layouts; geometry-based features fall back to text heuristics.
pub(super) fn text_layouts(pages: &[String]) -> Vec<PageLayout> {
    pages
        .iter()
        .enumerate()
        .map(|(index, text)| PageLayout::from_text(index, text.clone()))
        .collect()
}

pub(super) fn load_layouts_json(path: &Path) -> Result<Vec<PageLayout>> {
    let layouts = read_json::<Vec<PageLayout>>(path)?;
    info!(path = %path.display(), pages = layouts.len(), "loaded page layouts");
    Ok(layouts)
}
