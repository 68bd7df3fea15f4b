use anyhow::{Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::chunker::DocumentChunker;
use crate::cli::ChunkArgs;
use crate::config::PipelineConfig;
use crate::model::{DocumentChunk, Metadata};

use super::input::load_pages;
use super::write_json_output;

#[derive(Debug, Serialize)]
struct ChunkReport {
    chunk_count: usize,
    chunks: Vec<DocumentChunk>,
}

pub fn run(args: ChunkArgs, config: &PipelineConfig) -> Result<()> {
    let metadata = parse_metadata_pairs(&args.metadata)?;
    let loaded = load_pages(&args.source)?;
    let chunker = DocumentChunker::new(config.chunker.clone())?;

    let chunks = chunker.chunk_document(&loaded.tagged_text, &metadata);
    info!(
        pages = loaded.pages.len(),
        chunks = chunks.len(),
        "document chunked"
    );

    write_json_output(
        &ChunkReport {
            chunk_count: chunks.len(),
            chunks,
        },
        args.output.as_deref(),
    )
}

/// `key=value` pairs; values are kept as strings.
fn parse_metadata_pairs(pairs: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid --meta entry '{pair}', expected key=value");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid --meta entry '{pair}', key is empty");
        }
        metadata.insert(key.to_string(), Value::from(value.trim()));
    }
    Ok(metadata)
}
