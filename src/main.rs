use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use legal_ingest::cli::{Cli, Commands};
use legal_ingest::commands;
use legal_ingest::config::PipelineConfig;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Boundaries(args) => commands::boundaries::run(args, &config),
        Commands::Requests(args) => commands::requests::run(args, &config),
        Commands::Chunk(args) => commands::chunk::run(args, &config),
        Commands::Dedup(args) => commands::dedup::run(args, &config),
        Commands::CleanupCase(args) => commands::dedup::cleanup(args, &config),
        Commands::Ingest(args) => commands::ingest::run(args, &config),
        Commands::Status(args) => commands::status::run(args, &config),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
