//! Resumable ingestion: download → decompress/partition → publish, per source.
//!
//! Sources are processed one at a time in manifest order. Each stage is
//! skipped when its output file already exists in the working directory, so
//! re-running over the same manifest picks up where a failed run stopped.
//! A failing source is logged and recorded; the run moves on to the next one.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use tally_core::{ProgressContext, is_shutdown_requested, remove_stale_tmp};
use tally_store::{ChunkStore, NamespaceGuard, Tag};

use crate::config::Config;
use crate::error::{ErrorKind, IngestError};
use crate::fetch::Fetcher;
use crate::manifest::{SourceDescriptor, read_manifest};
use crate::partition::partition_file;

/// A source that could not be ingested
#[derive(Debug)]
pub struct Failure {
    pub location: String,
    pub error: IngestError,
}

/// Outcome of one pipeline run
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub sources: usize,
    pub downloaded: usize,
    pub download_skipped: usize,
    pub partitioned: usize,
    pub partition_skipped: usize,
    pub published: usize,
    pub deleted: usize,
    pub failures: Vec<Failure>,
    /// Stopped early by a shutdown request
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Number of failures of one kind
    pub fn failed(&self, kind: ErrorKind) -> usize {
        self.failures
            .iter()
            .filter(|f| f.error.kind() == kind)
            .count()
    }

    pub fn log_summary(&self) {
        log::info!("=== Ingest Summary ===");
        log::info!(
            "Sources: {} ({} published, {} failed)",
            self.sources,
            self.published,
            self.failures.len()
        );
        log::info!(
            "Downloads: {} ({} skipped), partitions: {} ({} skipped)",
            self.downloaded,
            self.download_skipped,
            self.partitioned,
            self.partition_skipped
        );
        if self.deleted > 0 {
            log::info!("Deleted artifacts for {} sources", self.deleted);
        }
        for failure in &self.failures {
            log::warn!("Failed: {} ({})", failure.location, failure.error.kind());
        }
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Run the ingestion pipeline over `config.manifest`.
///
/// Data already under `config.tag` is deleted (with a warning) before the
/// first source is published. Only manifest, working-directory and store
/// failures are returned as errors; per-source failures end up in
/// [`PipelineReport::failures`].
pub fn run(
    config: &Config,
    store: &dyn ChunkStore,
    fetcher: &dyn Fetcher,
    progress: &ProgressContext,
) -> Result<PipelineReport> {
    let start = Instant::now();

    let sources = read_manifest(&config.manifest)?;
    let tag = Tag::new(config.tag.clone()).context("Invalid destination tag")?;
    fs::create_dir_all(&config.tmp_dir).with_context(|| {
        format!(
            "Failed to create working directory: {}",
            config.tmp_dir.display()
        )
    })?;

    let guard = NamespaceGuard::acquire(store, tag)
        .with_context(|| format!("Failed to prepare tag {}", config.tag))?;
    log::info!(
        "Ingesting {} sources into {} (working dir {})",
        sources.len(),
        guard.tag(),
        config.tmp_dir.display()
    );

    let mut report = PipelineReport {
        sources: sources.len(),
        ..Default::default()
    };

    for source in &sources {
        if is_shutdown_requested() {
            log::warn!("Shutdown requested, not starting remaining sources");
            report.cancelled = true;
            break;
        }

        let pb = progress.source_bar(source.basename().unwrap_or(&source.location));
        let outcome = process_source(source, config, store, guard.tag(), fetcher, &pb, &mut report);
        if let Err(error) = outcome {
            log::error!("{}: {error}", error.kind());
            report.failures.push(Failure {
                location: source.location.clone(),
                error,
            });
        }
        pb.finish_and_clear();
    }

    let tag = guard.persist();
    if report.cancelled {
        log::warn!("Tag {tag} holds partial data from a cancelled run");
    }

    report.elapsed = start.elapsed();
    report.log_summary();
    Ok(report)
}

/// Working-directory paths for one source: (raw download, partitioned output).
///
/// Fails with `InvalidInputFormat` when the source has no usable file name or
/// the wrong extension, before anything is fetched.
fn artifact_paths(
    source: &SourceDescriptor,
    config: &Config,
) -> Result<(PathBuf, PathBuf), IngestError> {
    let name = source
        .basename()
        .ok_or_else(|| IngestError::InvalidInputFormat {
            path: PathBuf::from(&source.location),
            expected: config.compression.extension().to_string(),
        })?;
    let raw = config.tmp_dir.join(name);
    let partitioned = config.compression.partitioned_path(&raw)?;
    Ok((raw, partitioned))
}

fn process_source(
    source: &SourceDescriptor,
    config: &Config,
    store: &dyn ChunkStore,
    tag: &Tag,
    fetcher: &dyn Fetcher,
    pb: &ProgressBar,
    report: &mut PipelineReport,
) -> Result<(), IngestError> {
    let (raw, partitioned) = artifact_paths(source, config)?;
    let io_err = |path: &PathBuf| {
        let path = path.clone();
        move |source: std::io::Error| IngestError::Io { path, source }
    };

    for path in [&raw, &partitioned] {
        remove_stale_tmp(path).map_err(io_err(path))?;
    }

    if raw.is_file() {
        log::info!("Skipping download, file already exists: {}", raw.display());
        report.download_skipped += 1;
    } else {
        log::info!("Downloading {} to {}", source.location, raw.display());
        let bytes = fetcher
            .fetch(source, &raw, pb)
            .map_err(|e| IngestError::Network {
                location: source.location.clone(),
                source: e,
            })?;
        log::debug!(
            "{}: {}",
            raw.display(),
            tally_core::progress::fmt_bytes(bytes)
        );
        report.downloaded += 1;
    }

    if partitioned.is_file() {
        log::info!(
            "Skipping decompress and partition, file already exists: {}",
            partitioned.display()
        );
        report.partition_skipped += 1;
    } else {
        log::info!(
            "Decompressing and partitioning {} to {}",
            raw.display(),
            partitioned.display()
        );
        pb.set_message("partitioning...");
        let stats = partition_file(&raw, &partitioned, config.compression, config.chunk_size)?;
        log::debug!(
            "{}: {} blocks, {}",
            partitioned.display(),
            stats.blocks,
            tally_core::progress::fmt_bytes(stats.bytes)
        );
        report.partitioned += 1;
    }

    log::info!("Publishing {} to {tag}", partitioned.display());
    pb.set_message("publishing...");
    store
        .chunk(tag, std::slice::from_ref(&partitioned))
        .map_err(|e| IngestError::from_store(partitioned.clone(), e))?;
    report.published += 1;

    if config.delete {
        log::info!("Deleting {} and {}", raw.display(), partitioned.display());
        for path in [&raw, &partitioned] {
            fs::remove_file(path).map_err(io_err(path))?;
        }
        report.deleted += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Compression;

    fn descriptor(location: &str) -> SourceDescriptor {
        SourceDescriptor {
            location: location.to_string(),
            comment: None,
            line: 1,
        }
    }

    #[test]
    fn artifact_paths_from_url() {
        let config = Config {
            tmp_dir: PathBuf::from("/work"),
            ..Default::default()
        };
        let (raw, partitioned) =
            artifact_paths(&descriptor("https://host/dumps/enwiki-1.xml.bz2"), &config).unwrap();
        assert_eq!(raw, PathBuf::from("/work/enwiki-1.xml.bz2"));
        assert_eq!(partitioned, PathBuf::from("/work/enwiki-1.xml"));
    }

    #[test]
    fn artifact_paths_reject_wrong_extension() {
        let config = Config {
            compression: Compression::Gz,
            ..Default::default()
        };
        let err = artifact_paths(&descriptor("https://host/a.bz2"), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInputFormat);
    }

    #[test]
    fn artifact_paths_reject_missing_name() {
        let err =
            artifact_paths(&descriptor("https://host/dir/"), &Config::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInputFormat);
    }

    #[test]
    fn report_counts_by_kind() {
        let mut report = PipelineReport::default();
        report.failures.push(Failure {
            location: "a".into(),
            error: IngestError::InvalidInputFormat {
                path: "a".into(),
                expected: "bz2".into(),
            },
        });
        assert_eq!(report.failed(ErrorKind::InvalidInputFormat), 1);
        assert_eq!(report.failed(ErrorKind::Network), 0);
    }
}
