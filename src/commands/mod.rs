use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::util::write_json_pretty;

pub mod boundaries;
pub mod chunk;
pub mod dedup;
pub mod ingest;
mod input;
pub mod requests;
pub mod status;

/// Writes `value` as pretty JSON to `output`, or to stdout when no path is given.
fn write_json_output<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        return write_json_pretty(path, value);
    }

    let mut stdout = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut stdout, value).context("failed to serialize json output")?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
