//! End-to-end job runs: stage input, run, write sorted results.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tally_store::{ChunkStore, Tag, with_tag};

use crate::char_sort::CharSortJob;
use crate::error::JobError;
use crate::executor::{JobExecutor, MapReader};
use crate::job::{Reducer, ResultRecord};
use crate::line_sort::LineSortJob;
use crate::output::{write_csv, write_tsv};

/// Run `job` and collect its results sorted by key.
fn run_sorted<J, E>(executor: &E, input: &[Tag], job: J) -> Result<Vec<ResultRecord>, JobError>
where
    J: Reducer + Clone + 'static,
    J::Value: 'static,
    E: JobExecutor,
{
    let mut results: Vec<ResultRecord> = executor
        .run(input, job, MapReader::Chain)?
        .wait()?
        .collect();
    results.sort();
    Ok(results)
}

/// Write to `<out>.tmp` and rename into place once `write` succeeds.
fn write_atomic(
    out: &Path,
    write: impl FnOnce(BufWriter<File>) -> Result<usize, JobError>,
) -> Result<usize, JobError> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tally_core::tmp_path(out);
    let result = File::create(&tmp)
        .map_err(JobError::from)
        .and_then(|file| write(BufWriter::new(file)))
        .and_then(|rows| {
            tally_core::commit_tmp(&tmp, out)?;
            Ok(rows)
        });
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

/// Count distinct lines of a local file and write them as CSV.
///
/// `file_in` is published under `tag` for the duration of the job only: any
/// data already under `tag` is destroyed first, and the tag is deleted again
/// on every exit path. Returns the number of distinct lines.
pub fn sort_lines_file<E: JobExecutor>(
    store: &dyn ChunkStore,
    executor: &E,
    file_in: &Path,
    file_out: &Path,
    tag: Tag,
) -> Result<usize, JobError> {
    with_tag(store, tag, |tag| -> Result<usize, JobError> {
        let summary = store.chunk(tag, &[file_in.to_path_buf()])?;
        log::info!(
            "Staged {} under {tag}: {} records in {} chunks",
            file_in.display(),
            summary.records,
            summary.chunks
        );

        let results = run_sorted(executor, std::slice::from_ref(tag), LineSortJob)?;
        let rows = write_atomic(file_out, |w| write_csv(w, &results))?;
        log::info!("Wrote {rows} distinct lines to {}", file_out.display());
        Ok(rows)
    })
}

/// Count every character under `input_tag` and write `key<TAB>count` lines.
///
/// The tag is left untouched. Returns the number of distinct characters.
pub fn sort_chars_tag<E: JobExecutor>(
    executor: &E,
    input_tag: &Tag,
    job: CharSortJob,
    out: &Path,
) -> Result<usize, JobError> {
    log::info!(
        "Counting characters under {input_tag} (repetition {})",
        job.repetition
    );
    let results = run_sorted(executor, std::slice::from_ref(input_tag), job)?;
    let rows = write_atomic(out, |w| write_tsv(w, &results))?;
    log::info!("Wrote {rows} distinct characters to {}", out.display());
    Ok(rows)
}
