//! Sort subcommands - count distinct lines of a file or characters under a tag

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tally_core::SharedProgress;
use tally_job::{CharSortJob, LocalExecutor, sort_chars_tag, sort_lines_file};
use tally_store::{ChunkStore, LocalStore, Tag};

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct SortLinesArgs {
    /// Input text file
    #[arg(long = "file_in", visible_alias = "file-in", default_value = "input.txt")]
    pub file_in: PathBuf,

    /// Output CSV file
    #[arg(long = "file_out", visible_alias = "file-out", default_value = "output.csv")]
    pub file_out: PathBuf,

    /// Staging tag, deleted again when the job ends
    #[arg(long, default_value = "data:sort")]
    pub tag: String,
}

#[derive(Args, Debug)]
pub struct SortCharsArgs {
    /// Tag holding the input data
    pub input_tag: String,

    /// Output file (key<TAB>count per line)
    pub output_file: PathBuf,

    /// Times each record is repeated before counting
    #[arg(long)]
    pub repetition: Option<usize>,
}

fn executor(config: &Config) -> Result<(Arc<dyn ChunkStore>, LocalExecutor)> {
    let store: Arc<dyn ChunkStore> = Arc::new(LocalStore::new(config.store_config())?);
    let executor = LocalExecutor::new(store.clone(), config.executor_config());
    Ok((store, executor))
}

pub fn run_lines(args: SortLinesArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let tag = Tag::new(args.tag).context("Invalid staging tag")?;
    let (store, executor) = executor(config)?;

    let start = Instant::now();
    let pb = progress.stage_line("sort-lines");
    pb.set_message(args.file_in.display().to_string());
    let result = sort_lines_file(
        store.as_ref(),
        &executor,
        &args.file_in,
        &args.file_out,
        tag,
    );
    pb.finish_and_clear();
    let rows = result.with_context(|| format!("Sorting {} failed", args.file_in.display()))?;

    print_summary(
        "Sort lines",
        &[
            ("Input", args.file_in.display().to_string()),
            ("Output", args.file_out.display().to_string()),
            ("Distinct lines", rows.to_string()),
            ("Time", format!("{:.1}s", start.elapsed().as_secs_f64())),
        ],
    );
    Ok(())
}

pub fn run_chars(args: SortCharsArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let tag = Tag::new(args.input_tag).context("Invalid input tag")?;
    let job = CharSortJob::new(args.repetition.unwrap_or(config.job.repetition));
    let (_store, executor) = executor(config)?;

    let start = Instant::now();
    let pb = progress.stage_line("sort-chars");
    pb.set_message(tag.to_string());
    let result = sort_chars_tag(&executor, &tag, job, &args.output_file);
    pb.finish_and_clear();
    let rows = result.with_context(|| format!("Counting characters under {tag} failed"))?;

    print_summary(
        "Sort chars",
        &[
            ("Input", tag.to_string()),
            ("Output", args.output_file.display().to_string()),
            ("Repetition", job.repetition.to_string()),
            ("Distinct chars", rows.to_string()),
            ("Time", format!("{:.1}s", start.elapsed().as_secs_f64())),
        ],
    );
    Ok(())
}
