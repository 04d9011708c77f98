//! Load subcommand - download, partition and publish a manifest of sources

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tally_core::SharedProgress;
use tally_ingest::{Compression, SourceFetcher};
use tally_store::LocalStore;

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Manifest of source URLs, one per line ('#' starts a comment)
    #[arg(long = "file_in", visible_alias = "file-in")]
    pub file_in: Option<PathBuf>,

    /// Working directory for downloaded and partitioned files
    #[arg(long = "tmp_dir", visible_alias = "tmp-dir")]
    pub tmp_dir: Option<PathBuf>,

    /// Destination tag (existing data under it is deleted)
    #[arg(long)]
    pub tag: Option<String>,

    /// Delete downloaded and partitioned files once published
    #[arg(long)]
    pub delete: bool,

    /// Source compression: bz2 or gz
    #[arg(long, value_parser = parse_compression)]
    pub compression: Option<Compression>,
}

fn parse_compression(s: &str) -> Result<Compression, String> {
    Compression::from_name(s).ok_or_else(|| format!("unknown compression '{s}' (expected bz2 or gz)"))
}

pub fn run(args: LoadArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let ingest = tally_ingest::Config {
        manifest: args
            .file_in
            .unwrap_or_else(|| config.ingest.manifest.clone()),
        tmp_dir: args
            .tmp_dir
            .unwrap_or_else(|| config.ingest.tmp_dir.clone()),
        tag: args.tag.unwrap_or_else(|| config.ingest.tag.clone()),
        delete: args.delete,
        compression: args.compression.unwrap_or(config.ingest.compression),
        chunk_size: config.ingest.chunk_size,
    };
    let store = LocalStore::new(config.store_config())?;
    // Ctrl-C stops between sources
    tally_core::install_signal_handlers()?;

    log::info!("Loading {} into {}", ingest.manifest.display(), ingest.tag);
    log::info!("  Store: {}", store.root().display());

    let report = tally_ingest::run(&ingest, &store, &SourceFetcher, progress)?;

    print_summary(
        "Load",
        &[
            ("Tag", ingest.tag.clone()),
            (
                "Sources",
                format!(
                    "{}/{} published ({} failed)",
                    report.published,
                    report.sources,
                    report.failures.len()
                ),
            ),
            (
                "Downloads",
                format!("{} ({} skipped)", report.downloaded, report.download_skipped),
            ),
            (
                "Partitions",
                format!(
                    "{} ({} skipped)",
                    report.partitioned, report.partition_skipped
                ),
            ),
            ("Time", format!("{:.1}s", report.elapsed.as_secs_f64())),
        ],
    );

    if report.cancelled {
        anyhow::bail!("Interrupted before all sources were processed");
    }
    if !report.failures.is_empty() {
        anyhow::bail!("{} source(s) failed", report.failures.len());
    }
    Ok(())
}
