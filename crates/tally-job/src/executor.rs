//! Job execution: map over input chunks, shuffle by key, reduce per partition.
//!
//! [`LocalExecutor`] runs the whole job in-process on a rayon pool. It stands
//! in for a cluster scheduler: map tasks see disjoint chunks, and each reduce
//! task owns a complete key partition, sorted by key.

use std::any::Any;
use std::fs;
use std::hash::Hasher;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use rayon::prelude::*;
use rustc_hash::FxHasher;
use tally_store::{ChunkStore, Tag};

use crate::error::JobError;
use crate::job::{KeyValue, Reducer, ResultRecord};

/// How chunk contents are split into map records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapReader {
    /// One record per newline-terminated line, newline stripped
    #[default]
    Chain,
    /// Whole chunk as a single record
    Whole,
}

impl MapReader {
    fn records<'a>(self, content: &'a [u8]) -> Box<dyn Iterator<Item = &'a [u8]> + 'a> {
        match self {
            Self::Chain => Box::new(
                content
                    .split_inclusive(|b| *b == b'\n')
                    .map(|line| line.strip_suffix(b"\n").unwrap_or(line)),
            ),
            Self::Whole => Box::new(std::iter::once(content).filter(|c| !c.is_empty())),
        }
    }
}

/// Parallelism of a local job run
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Number of reduce partitions
    pub partitions: usize,
    /// Worker threads for map and reduce
    pub workers: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            partitions: cpus.min(8),
            workers: cpus,
        }
    }
}

/// Submits jobs over store tags.
pub trait JobExecutor {
    /// Start `job` over every chunk of `input`. Returns once the job is
    /// submitted; results are collected with [`JobHandle::wait`].
    fn run<J>(&self, input: &[Tag], job: J, reader: MapReader) -> Result<JobHandle, JobError>
    where
        J: Reducer + Clone + 'static,
        J::Value: 'static;
}

type PartitionResults = Vec<Vec<ResultRecord>>;

/// A submitted job.
pub struct JobHandle {
    handle: JoinHandle<Result<PartitionResults, JobError>>,
}

impl JobHandle {
    /// Block until every reduce partition is done.
    ///
    /// Any map or reduce failure fails the whole job; no partial results.
    pub fn wait(self) -> Result<Results, JobError> {
        let partitions = self
            .handle
            .join()
            .map_err(|panic| JobError::Worker(panic_message(panic.as_ref())))??;
        Ok(Results {
            inner: partitions.into_iter().flatten(),
        })
    }
}

/// Finite, one-shot iterator over a finished job's results, in partition order.
pub struct Results {
    inner: std::iter::Flatten<std::vec::IntoIter<Vec<ResultRecord>>>,
}

impl Iterator for Results {
    type Item = ResultRecord;

    fn next(&mut self) -> Option<ResultRecord> {
        self.inner.next()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "job thread panicked".to_string()
    }
}

/// Shuffle partition for `key`.
pub fn partition_for(key: &[u8], partitions: usize) -> usize {
    let mut hasher = FxHasher::default();
    hasher.write(key);
    (hasher.finish() % partitions as u64) as usize
}

/// In-process executor over a [`ChunkStore`].
pub struct LocalExecutor {
    store: Arc<dyn ChunkStore>,
    config: ExecutorConfig,
}

impl LocalExecutor {
    pub fn new(store: Arc<dyn ChunkStore>, config: ExecutorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &dyn ChunkStore {
        self.store.as_ref()
    }
}

impl JobExecutor for LocalExecutor {
    fn run<J>(&self, input: &[Tag], job: J, reader: MapReader) -> Result<JobHandle, JobError>
    where
        J: Reducer + Clone + 'static,
        J::Value: 'static,
    {
        let mut chunks = Vec::new();
        for tag in input {
            let paths = self.store.read_tag(tag)?;
            log::debug!("{tag}: {} chunks", paths.len());
            chunks.extend(paths);
        }

        let config = self.config.clone();
        let handle = std::thread::Builder::new()
            .name("tally-job".into())
            .spawn(move || execute(&job, &chunks, reader, &config))?;
        Ok(JobHandle { handle })
    }
}

fn execute<J: Reducer>(
    job: &J,
    chunks: &[PathBuf],
    reader: MapReader,
    config: &ExecutorConfig,
) -> Result<PartitionResults, JobError> {
    let partitions = config.partitions.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("tally-worker-{i}"))
        .build()
        .map_err(|e| JobError::Worker(e.to_string()))?;

    // one empty buffer per reduce partition
    let buckets = || -> Vec<Vec<KeyValue<J::Value>>> {
        (0..partitions).map(|_| Vec::new()).collect()
    };

    pool.install(|| {
        let start = Instant::now();
        log::info!("Map: {} chunks", chunks.len());
        // map output goes straight to its partition; chunk bytes are dropped
        // as soon as the chunk is mapped
        let shuffled = chunks
            .par_iter()
            .try_fold(
                buckets,
                |mut acc, path| -> Result<Vec<Vec<KeyValue<J::Value>>>, JobError> {
                    let content = fs::read(path)?;
                    for record in reader.records(&content) {
                        for kv in job.map(record)? {
                            acc[partition_for(&kv.key, partitions)].push(kv);
                        }
                    }
                    Ok(acc)
                },
            )
            .try_reduce(buckets, |mut acc, other| {
                for (into, from) in acc.iter_mut().zip(other) {
                    into.extend(from);
                }
                Ok(acc)
            })?;
        log::info!(
            "Shuffle: {} pairs into {partitions} partitions",
            shuffled.iter().map(Vec::len).sum::<usize>()
        );

        let results = shuffled
            .into_par_iter()
            .map(|mut partition| {
                partition.sort_by(|a, b| a.key.cmp(&b.key));
                job.reduce(partition)
            })
            .collect::<Result<PartitionResults, JobError>>()?;
        log::info!(
            "Reduce: {} keys in {:.1}s",
            results.iter().map(Vec::len).sum::<usize>(),
            start.elapsed().as_secs_f64()
        );
        Ok(results)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(reader: MapReader, content: &[u8]) -> Vec<&[u8]> {
        reader.records(content).collect()
    }

    #[test]
    fn chain_reader_splits_lines() {
        let expected = vec![&b"a"[..], b"b", b"", b"c"];
        assert_eq!(records(MapReader::Chain, b"a\nb\n\nc"), expected);
        assert_eq!(records(MapReader::Chain, b"a\nb\n\nc\n"), expected);
    }

    #[test]
    fn chain_reader_empty_and_blank() {
        assert!(records(MapReader::Chain, b"").is_empty());
        assert_eq!(records(MapReader::Chain, b"\n"), vec![b"".as_slice()]);
    }

    #[test]
    fn chain_reader_keeps_carriage_return() {
        assert_eq!(records(MapReader::Chain, b"a\r\n"), vec![b"a\r".as_slice()]);
    }

    #[test]
    fn chain_reader_passes_split_utf8_through() {
        let content = [b'x', 0xc3, b'\n', 0xa9, b'\n'];
        assert_eq!(
            records(MapReader::Chain, &content),
            vec![&[b'x', 0xc3][..], &[0xa9][..]]
        );
    }

    #[test]
    fn whole_reader_single_record() {
        assert_eq!(records(MapReader::Whole, b"a\nb\n"), vec![b"a\nb\n".as_slice()]);
        assert!(records(MapReader::Whole, b"").is_empty());
    }

    #[test]
    fn partition_is_stable_and_in_range() {
        for key in [b"a".as_slice(), b"YQ==", b"", b"longer key"] {
            let p = partition_for(key, 7);
            assert!(p < 7);
            assert_eq!(p, partition_for(key, 7));
        }
    }

    #[test]
    fn single_partition() {
        assert_eq!(partition_for(b"anything", 1), 0);
    }

    #[test]
    fn panic_message_extracts_text() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
