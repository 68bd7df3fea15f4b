use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CACHE_ROOT;

#[derive(Parser, Debug)]
#[command(
    name = "legal-ingest",
    version,
    about = "Legal PDF ingestion: document boundaries, production requests, chunks and deduplication"
)]
pub struct Cli {
    /// JSON pipeline configuration; absent keys keep their defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Boundaries(BoundariesArgs),
    Requests(RequestsArgs),
    Chunk(ChunkArgs),
    Dedup(DedupArgs),
    CleanupCase(CleanupCaseArgs),
    Ingest(IngestArgs),
    Status(StatusArgs),
}

/// Where page text comes from: a PDF (via poppler) or a page-tagged text file.
#[derive(Args, Debug, Clone)]
pub struct TextSourceArgs {
    #[arg(long, conflicts_with = "text")]
    pub pdf: Option<PathBuf>,

    #[arg(long)]
    pub text: Option<PathBuf>,

    #[arg(long)]
    pub max_pages: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct BoundariesArgs {
    #[arg(long, conflicts_with_all = ["layouts", "text"])]
    pub pdf: Option<PathBuf>,

    /// JSON array of page layouts.
    #[arg(long, conflicts_with = "text")]
    pub layouts: Option<PathBuf>,

    #[arg(long)]
    pub text: Option<PathBuf>,

    #[arg(long)]
    pub threshold: Option<f64>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RequestsArgs {
    #[command(flatten)]
    pub source: TextSourceArgs,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    #[command(flatten)]
    pub source: TextSourceArgs,

    /// Extra chunk metadata as key=value; repeatable.
    #[arg(long = "meta")]
    pub metadata: Vec<String>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct DedupArgs {
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long = "case")]
    pub case_name: String,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CleanupCaseArgs {
    #[arg(long = "case")]
    pub case_name: String,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long)]
    pub pdf: PathBuf,

    #[arg(long = "case")]
    pub case_name: String,

    #[arg(long, default_value = DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Process the PDF even when its hash is already registered.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// List the registered documents of one case.
    #[arg(long = "case")]
    pub case_name: Option<String>,
}
