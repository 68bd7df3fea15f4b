use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::RequestsArgs;
use crate::config::PipelineConfig;
use crate::model::{RequestCategory, RtpRequest};
use crate::rtp::RtpParser;

use super::input::load_pages;
use super::write_json_output;

#[derive(Debug, Serialize)]
struct RequestsReport {
    page_count: u32,
    request_count: usize,
    by_category: Vec<CategoryCount>,
    requests: Vec<RtpRequest>,
}

#[derive(Debug, Serialize)]
struct CategoryCount {
    category: RequestCategory,
    count: usize,
}

pub fn run(args: RequestsArgs, config: &PipelineConfig) -> Result<()> {
    let loaded = load_pages(&args.source)?;
    let parser = RtpParser::new(config.rtp.clone())?;
    let requests = parser
        .parse_document(&loaded.tagged_text, loaded.page_count())
        .context("failed to parse production requests")?;

    info!(
        pages = loaded.page_count(),
        requests = requests.len(),
        "production requests parsed"
    );

    write_json_output(
        &RequestsReport {
            page_count: loaded.page_count(),
            request_count: requests.len(),
            by_category: category_counts(&requests),
            requests,
        },
        args.output.as_deref(),
    )
}

fn category_counts(requests: &[RtpRequest]) -> Vec<CategoryCount> {
    [
        RequestCategory::Documents,
        RequestCategory::Communications,
        RequestCategory::ElectronicallyStored,
        RequestCategory::TangibleThings,
        RequestCategory::Other,
    ]
    .into_iter()
    .map(|category| CategoryCount {
        category,
        count: requests
            .iter()
            .filter(|request| request.category == category)
            .count(),
    })
    .filter(|entry| entry.count > 0)
    .collect()
}
