//! `sluiced`: the Sluice upload spooler daemon.
//!
//! Spools files into a content-addressed backend: each file is cut into
//! content-defined chunks, compressed, hashed, and uploaded, with one
//! completion record reported per file.
//!
//! # Usage
//!
//! ```text
//! sluiced ingest ./payload                  # spool a directory
//! sluiced ingest -c sluice.toml ./payload   # with a config file
//! sluiced ingest --store mem: ./payload     # dry run, in-memory backend
//! sluiced put ./manifest .publish_manifest  # direct upload, no chunking
//! ```

mod config;
mod telemetry;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sluice_engine::Spooler;
use tracing::{info, warn};

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "sluiced", version, about = "Sluice upload spooler daemon")]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend definition (`local:<dir>` or `mem:`).
    #[arg(short = 's', long, global = true)]
    store: Option<String>,

    /// Override the scratch directory.
    #[arg(long, global = true)]
    scratch: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Spool a file or directory tree into the backend.
    Ingest {
        /// File or directory to ingest.
        path: PathBuf,

        /// Disable chunking for this run; every file is stored whole.
        #[arg(long)]
        no_chunking: bool,
    },

    /// Upload a single file verbatim to an explicit destination name.
    Put {
        /// Local source file.
        local: PathBuf,

        /// Destination object name in the backend.
        remote: String,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    telemetry::init_console(&config.log.level);

    // CLI args override config file values.
    if let Some(store) = cli.store {
        config.spooler.definition = store;
    }
    if let Some(scratch) = cli.scratch {
        config.spooler.scratch_dir = scratch;
    }

    match cli.command {
        Commands::Ingest { path, no_chunking } => cmd_ingest(config, &path, no_chunking).await,
        Commands::Put { local, remote } => cmd_put(config, &local, &remote).await,
    }
}

// -----------------------------------------------------------------------
// sluiced ingest
// -----------------------------------------------------------------------

async fn cmd_ingest(config: CliConfig, path: &Path, no_chunking: bool) -> Result<()> {
    let definition = config.spooler_definition();
    info!(
        definition = %config.spooler.definition,
        scratch = %config.spooler.scratch_dir.display(),
        chunking = definition.use_chunking && !no_chunking,
        "starting ingest"
    );

    let spooler = Spooler::new(definition)
        .await
        .context("failed to create spooler")?;

    spooler.subscribe(|result| {
        if result.is_ok() {
            info!(
                path = %result.local_path.display(),
                digest = %result.content_hash,
                chunks = result.file_chunks.len(),
                "spooled"
            );
        } else {
            warn!(
                path = %result.local_path.display(),
                return_code = result.return_code,
                "failed"
            );
        }
    });

    let files = collect_files(path).context("failed to enumerate input")?;
    if files.is_empty() {
        bail!("no files found under {}", path.display());
    }

    let total = files.len();
    for file in &files {
        spooler.process_with(file, !no_chunking)?;
    }
    spooler.wait_for_termination().await?;

    let errors = spooler.num_errors();
    info!(files = total, errors, "ingest finished");
    if errors > 0 {
        bail!("{errors} of {total} files failed");
    }
    Ok(())
}

// -----------------------------------------------------------------------
// sluiced put
// -----------------------------------------------------------------------

async fn cmd_put(config: CliConfig, local: &Path, remote: &str) -> Result<()> {
    let spooler = Spooler::new(config.spooler_definition())
        .await
        .context("failed to create spooler")?;

    spooler.upload(local, remote)?;
    spooler.wait_for_termination().await?;

    if spooler.num_errors() > 0 {
        bail!("upload of {} failed", local.display());
    }
    info!(local = %local.display(), remote, "uploaded");
    Ok(())
}

/// Recursively collect regular files under a path, in sorted order.
fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("cannot access {}", path.display()))?;
    if meta.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut dirs = vec![path.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let entry_path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                dirs.push(entry_path);
            } else if file_type.is_file() {
                files.push(entry_path);
            }
            // Symlinks and special files are skipped.
        }
    }
    files.sort();
    Ok(files)
}
