use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::features::{PageLayout, TextSpan};
use crate::model::ToolVersions;

/// Spans whose tops differ by less than this share a line.
const LINE_TOLERANCE: f64 = 3.0;

pub fn command_available(program: &str) -> bool {
    Command::new(program).arg("-v").output().is_ok()
}

/// Per-page text from `pdftotext`, split on form feeds, trailing blank pages dropped.
pub fn extract_pages_with_pdftotext(pdf_path: &Path, max_pages: Option<usize>) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command.arg("-layout").arg("-enc").arg("UTF-8").arg("-f").arg("1");
    if let Some(max_pages) = max_pages {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(split_form_feeds(&String::from_utf8_lossy(&output.stdout)))
}

fn split_form_feeds(raw: &str) -> Vec<String> {
    let mut pages = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect::<Vec<String>>();

    while pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Joins pages into the `[Page N]` tagged form the request parser reads.
pub fn page_tagged_text(pages: &[String]) -> String {
    let mut tagged = String::new();
    for (index, page) in pages.iter().enumerate() {
        tagged.push_str(&format!("[Page {}]\n", index + 1));
        tagged.push_str(page.trim_end());
        tagged.push('\n');
    }
    tagged
}

/// Splits page-tagged text back into pages. Non-blank text before the first
/// marker becomes a page of its own; text without markers is a single page.
pub fn split_page_tagged_text(text: &str) -> Result<Vec<String>> {
    let marker = Regex::new(r"(?m)^[ \t]*\[Page\s+\d+\][ \t]*\n?").context("failed to compile page marker regex")?;

    let mut pages = Vec::new();
    let mut cursor = 0usize;
    for found in marker.find_iter(text) {
        if found.start() > 0 && (cursor > 0 || !text[..found.start()].trim().is_empty()) {
            pages.push(text[cursor..found.start()].to_string());
        }
        cursor = found.end();
    }
    pages.push(text[cursor..].to_string());

    Ok(pages)
}

pub fn extract_layouts_with_pdftohtml(pdf_path: &Path) -> Result<Vec<PageLayout>> {
    let output = Command::new("pdftohtml")
        .arg("-xml")
        .arg("-i")
        .arg("-q")
        .arg("-stdout")
        .arg(pdf_path)
        .output()
        .with_context(|| format!("failed to execute pdftohtml for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftohtml returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    parse_pdftohtml_xml(&String::from_utf8_lossy(&output.stdout))
}

/// Reads `<page>`, `<fontspec>` and `<text>` elements of `pdftohtml -xml` output.
pub fn parse_pdftohtml_xml(xml: &str) -> Result<Vec<PageLayout>> {
    let page_pattern = Regex::new(r"(?s)<page\b([^>]*)>(.*?)</page>").context("failed to compile page element regex")?;
    let fontspec_pattern = Regex::new(r"<fontspec\b([^>]*)/?>").context("failed to compile fontspec regex")?;
    let text_pattern = Regex::new(r"(?s)<text\b([^>]*)>(.*?)</text>").context("failed to compile text element regex")?;
    let attribute_pattern = Regex::new(r#"([\w-]+)="([^"]*)""#).context("failed to compile attribute regex")?;
    let inline_tag = Regex::new(r"<[^>]+>").context("failed to compile inline tag regex")?;

    let attributes = |raw: &str| -> HashMap<String, String> {
        attribute_pattern
            .captures_iter(raw)
            .filter_map(|captures| {
                Some((captures.get(1)?.as_str().to_string(), captures.get(2)?.as_str().to_string()))
            })
            .collect()
    };
    let number = |attrs: &HashMap<String, String>, key: &str| -> f64 {
        attrs.get(key).and_then(|value| value.parse::<f64>().ok()).unwrap_or(0.0)
    };

    // Font specs are document-wide; later pages refer to ids declared earlier.
    let fonts = fontspec_pattern
        .captures_iter(xml)
        .filter_map(|captures| {
            let attrs = attributes(captures.get(1)?.as_str());
            let id = attrs.get("id")?.clone();
            let family = attrs.get("family").cloned().unwrap_or_default();
            Some((id, (family, number(&attrs, "size"))))
        })
        .collect::<HashMap<String, (String, f64)>>();

    let mut layouts = Vec::new();
    for (index, page) in page_pattern.captures_iter(xml).enumerate() {
        let page_attrs = page.get(1).map(|m| attributes(m.as_str())).unwrap_or_default();
        let body = page.get(2).map(|m| m.as_str()).unwrap_or_default();

        let spans = text_pattern
            .captures_iter(body)
            .filter_map(|captures| {
                let attrs = attributes(captures.get(1)?.as_str());
                let text = decode_entities(&inline_tag.replace_all(captures.get(2)?.as_str(), ""));
                if text.trim().is_empty() {
                    return None;
                }
                let (font, size) = attrs
                    .get("font")
                    .and_then(|id| fonts.get(id))
                    .cloned()
                    .unwrap_or_else(|| (String::new(), number(&attrs, "height")));
                Some(TextSpan {
                    text,
                    font,
                    size,
                    top: number(&attrs, "top"),
                    left: number(&attrs, "left"),
                    width: number(&attrs, "width"),
                    height: number(&attrs, "height"),
                })
            })
            .collect::<Vec<TextSpan>>();

        let page_index = page_attrs
            .get("number")
            .and_then(|value| value.parse::<usize>().ok())
            .map(|number| number.saturating_sub(1))
            .unwrap_or(index);

        layouts.push(PageLayout {
            page_index,
            text: spans_to_text(&spans),
            width: number(&page_attrs, "width"),
            height: number(&page_attrs, "height"),
            spans,
        });
    }

    Ok(layouts)
}

/// Reading-order text: spans grouped into lines by top, lines left to right.
fn spans_to_text(spans: &[TextSpan]) -> String {
    let mut ordered = spans.iter().collect::<Vec<&TextSpan>>();
    ordered.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));

    let mut lines: Vec<(f64, Vec<&TextSpan>)> = Vec::new();
    for span in ordered {
        match lines.last_mut() {
            Some((top, members)) if (span.top - *top).abs() < LINE_TOLERANCE => members.push(span),
            _ => lines.push((span.top, vec![span])),
        }
    }

    lines
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_by(|a, b| a.left.total_cmp(&b.left));
            members
                .iter()
                .map(|span| span.text.trim())
                .collect::<Vec<&str>>()
                .join(" ")
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

pub fn collect_tool_versions() -> ToolVersions {
    ToolVersions {
        pdftotext: command_version_optional("pdftotext", &["-v"]).unwrap_or_else(|| "unavailable".to_string()),
        pdftohtml: command_version_optional("pdftohtml", &["-v"]).unwrap_or_else(|| "unavailable".to_string()),
    }
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}
