//! CLI runner shared by the `frametar` binary and the integration tests.
//!
//! Standard input and output are only touched here; the library proper always
//! receives explicit reader and writer handles.

use crate::archive::{create_archive, CreateOptions, EntryHeader};
use crate::cli::{self, Commands};
use crate::error::ArchiverError;
use crate::extract::{extract_archive, list_entries, ExtractOptions};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Public entry for running CLI logic.
pub fn run_cli_app() -> Result<(), Box<dyn Error>> {
    let args = cli::run()?;
    init_logging(args.verbose);

    match args.command {
        Commands::Create { inputs, archive } => {
            let options = CreateOptions::default();
            let report = match archive {
                Some(path) => {
                    let file = File::create(&path)
                        .map_err(|source| ArchiverError::DestinationWrite { path: path.clone(), source })?;
                    create_archive(&inputs, BufWriter::new(file), &options)?
                }
                None => create_archive(&inputs, BufWriter::new(io::stdout().lock()), &options)?,
            };
            tracing::info!("Archived {} of {} files", report.archived.len(), inputs.len());
        }
        Commands::Extract { archive, output, no_metadata, ignored } => {
            if !ignored.is_empty() {
                tracing::warn!("Warning: extra arguments ignored for extract mode");
            }
            let root = output.unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&root).map_err(ArchiverError::Io)?;
            let options = ExtractOptions { root, restore_metadata: !no_metadata, ..ExtractOptions::default() };

            let report = extract_archive(open_input(archive.as_deref())?, &options)?;
            tracing::info!(
                "Extracted {} files ({} overwritten, {} rejected)",
                report.extracted.len(),
                report.overwritten.len(),
                report.rejected.len()
            );
        }
        Commands::List { archive } => {
            let entries = list_entries(open_input(archive.as_deref())?)?;
            let mut out = io::stdout().lock();
            for entry in &entries {
                writeln!(out, "{}", format_entry(entry, args.verbose))?;
            }
            out.flush()?;
        }
    }

    Ok(())
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>, ArchiverError> {
    match path {
        Some(p) => {
            let file = File::open(p).map_err(|source| ArchiverError::SourceUnavailable { path: p.to_path_buf(), source })?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// One listing line: `name size`, or `mode size mtime name` when verbose.
fn format_entry(entry: &EntryHeader, verbose: bool) -> String {
    if !verbose {
        return format!("{} {}", entry.name, entry.size);
    }
    let when = i64::try_from(entry.mtime)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{:04o} {:>12} {} {}", entry.mode, entry.size, when, entry.name)
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
/// Standard output is left alone since it may carry archive bytes.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .without_time()
        .with_target(false)
        .with_level(false)
        .try_init();
}
