//! Sort-count jobs run end to end through the in-process executor.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tally_job::{
    ALPHANUMERIC, CharSortJob, ExecutorConfig, JobError, JobExecutor, KeyValue, LineSortJob,
    LocalExecutor, MapReader, Mapper, Reducer, ResultRecord, sort_chars_tag, sort_lines_file,
};
use tally_ingest::{CHUNK_SIZE, partition_stream};
use tally_store::{ChunkStore, LocalStore, LocalStoreConfig, StoreError, Tag, with_tag};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    executor: LocalExecutor,
}

impl Fixture {
    fn new() -> Self {
        Self::with_store(LocalStoreConfig::default())
    }

    fn with_store(config: LocalStoreConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(LocalStoreConfig {
            root: dir.path().join("ddfs"),
            ..config
        })
        .unwrap();
        let executor = LocalExecutor::new(
            Arc::new(store),
            ExecutorConfig {
                partitions: 4,
                workers: 2,
            },
        );
        Self { dir, executor }
    }

    fn store(&self) -> &dyn ChunkStore {
        self.executor.store()
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn publish(&self, tag: &str, content: &str) -> Tag {
        let tag = Tag::new(tag).unwrap();
        let file = self.file("input.txt", content);
        self.store().chunk(&tag, &[file]).unwrap();
        tag
    }
}

fn alphanumeric_line() -> String {
    ALPHANUMERIC.iter().collect()
}

#[test]
fn char_job_counts_every_character() {
    let fx = Fixture::new();
    let input = format!("{}\n", alphanumeric_line()).repeat(100);
    let tag = fx.publish("data:chars", &input);

    let handle = fx
        .executor
        .run(&[tag], CharSortJob::new(10), MapReader::Chain)
        .unwrap();
    let mut results: Vec<ResultRecord> = handle.wait().unwrap().collect();
    results.sort();

    let mut expected: Vec<ResultRecord> = ALPHANUMERIC
        .iter()
        .map(|c| ResultRecord::new(c.to_string(), 1000))
        .collect();
    expected.sort();
    assert_eq!(results.len(), 62);
    assert_eq!(results, expected);
}

#[test]
fn char_job_over_several_chunks() {
    let fx = Fixture::with_store(LocalStoreConfig {
        chunk_size: 256,
        ..Default::default()
    });
    let input = format!("{}\n", alphanumeric_line()).repeat(100);
    let tag = fx.publish("data:chars", &input);
    assert!(fx.store().read_tag(&tag).unwrap().len() > 1);

    let results: Vec<_> = fx
        .executor
        .run(&[tag], CharSortJob::new(1), MapReader::Chain)
        .unwrap()
        .wait()
        .unwrap()
        .collect();

    assert_eq!(results.len(), 62);
    assert!(results.iter().all(|r| r.count == 100));
}

#[test]
fn sort_chars_tag_writes_sorted_tsv() {
    let fx = Fixture::new();
    let tag = fx.publish("data:chars", "ba\nab\nb\n");
    let out = fx.dir.path().join("chars.tsv");

    let rows = sort_chars_tag(&fx.executor, &tag, CharSortJob::new(2), &out).unwrap();

    assert_eq!(rows, 2);
    assert_eq!(fs::read_to_string(&out).unwrap(), "a\t4\nb\t6\n");
    // input tag belongs to the caller
    assert!(fx.store().exists(&tag).unwrap());
}

#[test]
fn multibyte_character_split_by_partitioner() {
    let fx = Fixture::new();
    let mut raw = vec![b'a'; CHUNK_SIZE - 1];
    raw.extend_from_slice("ébc".as_bytes());
    let mut partitioned = Vec::new();
    partition_stream(raw.as_slice(), &mut partitioned, CHUNK_SIZE).unwrap();
    // the inserted newline lands between the two bytes of 'é'
    assert_eq!(partitioned[CHUNK_SIZE - 1..CHUNK_SIZE + 2], [0xc3, b'\n', 0xa9]);

    let path = fx.dir.path().join("partitioned.txt");
    fs::write(&path, &partitioned).unwrap();
    let tag = Tag::new("data:split").unwrap();
    fx.store().chunk(&tag, &[path]).unwrap();
    let out = fx.dir.path().join("chars.tsv");

    let rows = sort_chars_tag(&fx.executor, &tag, CharSortJob::new(1), &out).unwrap();

    assert_eq!(rows, 5);
    let mut expected = format!("a\t{}\nb\t1\nc\t1\n", CHUNK_SIZE - 1).into_bytes();
    expected.extend_from_slice(b"\xa9\t1\n\xc3\t1\n");
    assert_eq!(fs::read(&out).unwrap(), expected);
}

#[test]
fn line_job_counts_duplicates() {
    let fx = Fixture::new();
    let tag = fx.publish("data:lines", "b\na\na\n");

    let mut results: Vec<_> = fx
        .executor
        .run(&[tag], LineSortJob, MapReader::Chain)
        .unwrap()
        .wait()
        .unwrap()
        .collect();
    results.sort();

    assert_eq!(
        results,
        vec![ResultRecord::new("a", 2), ResultRecord::new("b", 1)]
    );
}

#[test]
fn sort_lines_file_writes_csv_and_releases_tag() {
    let fx = Fixture::new();
    let file_in = fx.file("lines.txt", "b\na\na");
    let file_out = fx.dir.path().join("out/sorted.csv");
    let tag = Tag::new("data:sort").unwrap();

    let rows = sort_lines_file(
        fx.store(),
        &fx.executor,
        &file_in,
        &file_out,
        tag.clone(),
    )
    .unwrap();

    assert_eq!(rows, 2);
    assert_eq!(fs::read_to_string(&file_out).unwrap(), "\"a\",2\n\"b\",1\n");
    assert!(!fx.store().exists(&tag).unwrap());
}

#[test]
fn sort_lines_file_keeps_non_utf8_lines() {
    let fx = Fixture::new();
    let file_in = fx.dir.path().join("latin1.txt");
    fs::write(&file_in, b"caf\xe9\nabc\ncaf\xe9\n").unwrap();
    let file_out = fx.dir.path().join("sorted.csv");
    let tag = Tag::new("data:sort").unwrap();

    let rows = sort_lines_file(fx.store(), &fx.executor, &file_in, &file_out, tag).unwrap();

    assert_eq!(rows, 2);
    assert_eq!(fs::read(&file_out).unwrap(), b"\"abc\",1\n\"caf\xe9\",2\n");
}

#[test]
fn sort_lines_file_replaces_stale_tag_data() {
    let fx = Fixture::new();
    let tag = fx.publish("data:sort", "stale\n");
    let file_in = fx.file("lines.txt", "fresh\n");
    let file_out = fx.dir.path().join("sorted.csv");

    sort_lines_file(fx.store(), &fx.executor, &file_in, &file_out, tag.clone()).unwrap();

    assert_eq!(fs::read_to_string(&file_out).unwrap(), "\"fresh\",1\n");
    assert!(!fx.store().exists(&tag).unwrap());
}

#[test]
fn rejected_input_releases_tag() {
    let fx = Fixture::with_store(LocalStoreConfig {
        max_record_size: 4,
        ..Default::default()
    });
    let file_in = fx.file("lines.txt", "ok\nmuch too long\n");
    let file_out = fx.dir.path().join("sorted.csv");
    let tag = Tag::new("data:sort").unwrap();

    let err = sort_lines_file(fx.store(), &fx.executor, &file_in, &file_out, tag.clone())
        .unwrap_err();

    assert!(matches!(
        err,
        JobError::Store(StoreError::RecordTooLarge { .. })
    ));
    assert!(!fx.store().exists(&tag).unwrap());
    assert!(!file_out.exists());
}

/// Fails on any record containing "poison".
#[derive(Clone)]
struct PoisonJob;

impl Mapper for PoisonJob {
    type Value = u64;

    fn map(&self, record: &[u8]) -> Result<Vec<KeyValue<u64>>, JobError> {
        if record.windows(6).any(|w| w == b"poison") {
            return Err(JobError::Map(format!(
                "bad record: {}",
                String::from_utf8_lossy(record)
            )));
        }
        LineSortJob.map(record)
    }
}

impl Reducer for PoisonJob {
    fn reduce(&self, partition: Vec<KeyValue<u64>>) -> Result<Vec<ResultRecord>, JobError> {
        LineSortJob.reduce(partition)
    }
}

#[test]
fn map_error_fails_whole_job() {
    let fx = Fixture::new();
    let tag = fx.publish("data:lines", "a\npoison\nb\n");

    let err = fx
        .executor
        .run(&[tag], PoisonJob, MapReader::Chain)
        .unwrap()
        .wait()
        .err()
        .unwrap();

    assert!(matches!(err, JobError::Map(msg) if msg.contains("poison")));
}

#[test]
fn job_failure_inside_guard_releases_tag() {
    let fx = Fixture::new();
    let file_in = fx.file("lines.txt", "a\npoison\n");
    let tag = Tag::new("data:guarded").unwrap();

    let result = with_tag(fx.store(), tag.clone(), |tag| -> Result<usize, JobError> {
        fx.store().chunk(tag, &[file_in.clone()])?;
        let handle = fx
            .executor
            .run(std::slice::from_ref(tag), PoisonJob, MapReader::Chain)?;
        Ok(handle.wait()?.count())
    });

    assert!(matches!(result, Err(JobError::Map(_))));
    assert!(!fx.store().exists(&tag).unwrap());
}

#[test]
fn missing_input_tag_is_reported() {
    let fx = Fixture::new();
    let tag = Tag::new("data:missing").unwrap();

    let err = fx
        .executor
        .run(&[tag], LineSortJob, MapReader::Chain)
        .err()
        .unwrap();

    assert!(matches!(err, JobError::Store(StoreError::NotFound(_))));
}

#[test]
fn whole_reader_maps_chunk_as_one_record() {
    let fx = Fixture::new();
    let tag = fx.publish("data:whole", "a\nb\n");

    let results: Vec<_> = fx
        .executor
        .run(&[tag], LineSortJob, MapReader::Whole)
        .unwrap()
        .wait()
        .unwrap()
        .collect();

    assert_eq!(results, vec![ResultRecord::new("a\nb\n", 1)]);
}
