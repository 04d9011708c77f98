//! tally - ingest text corpora and count their lines or characters
//!
//! `load` stages compressed sources into the local chunk store; `sort-lines`
//! and `sort-chars` run the sort-count jobs over it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tally_core::Verbosity;

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Ingest text corpora and count their lines or characters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./tally.toml or ~/.config/tally/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Read timeout in seconds for stall detection
    #[arg(long, global = true)]
    read_timeout: Option<u64>,

    /// Maximum retry attempts for transient download failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Download, decompress, partition and publish sources listed in a manifest
    Load(cmd::load::LoadArgs),
    /// Count distinct lines of a file, written as CSV
    SortLines(cmd::sort::SortLinesArgs),
    /// Count every character stored under a tag
    SortChars(cmd::sort::SortCharsArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = Arc::new(tally_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let verbosity = match (cli.debug, is_tty) {
        (true, _) => Verbosity::Debug,
        (false, true) => Verbosity::Quiet,
        (false, false) => Verbosity::Normal,
    };
    tally_core::init_logging(verbosity, is_tty.then(|| progress.multi()))?;

    let mut config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    // config file defaults, CLI overrides
    if let Some(secs) = cli.read_timeout {
        config.http.read_timeout = secs;
    }
    if let Some(retries) = cli.max_retries {
        config.http.max_retries = retries;
    }
    tally_core::set_http_config(config.http_config());

    match cli.command {
        Command::Load(args) => cmd::load::run(args, &config, &progress),
        Command::SortLines(args) => cmd::sort::run_lines(args, &config, &progress),
        Command::SortChars(args) => cmd::sort::run_chars(args, &config, &progress),
        Command::Config => {
            cmd::print_summary(
                "Setting",
                &[
                    ("Manifest", config.ingest.manifest.display().to_string()),
                    ("Working directory", config.ingest.tmp_dir.display().to_string()),
                    ("Tag", config.ingest.tag.clone()),
                    ("Compression", config.ingest.compression.extension().to_string()),
                    ("Partition size", format!("{} bytes", config.ingest.chunk_size)),
                    ("Store root", config.store.root.display().to_string()),
                    (
                        "Max record size",
                        format!("{} bytes", config.store.max_record_size),
                    ),
                    (
                        "Job",
                        format!(
                            "{} partitions, {} workers",
                            config.job.partitions, config.job.workers
                        ),
                    ),
                    ("Char repetition", config.job.repetition.to_string()),
                    ("Read timeout", format!("{}s", config.http.read_timeout)),
                    ("Connect timeout", format!("{}s", config.http.connect_timeout)),
                    ("Max retries", config.http.max_retries.to_string()),
                ],
            );
            Ok(())
        }
    }
}
