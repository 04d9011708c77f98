//! Chunk store contract and a directory-backed implementation
//!
//! Directory layout:
//! ```text
//! {root}/
//! └── {tag}/
//!     ├── 000000.chunk   # newline-terminated records
//!     ├── 000001.chunk
//!     └── ...
//! ```

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::tag::Tag;

const CHUNK_EXTENSION: &str = "chunk";

/// What the storage layer must provide to ingestion and job execution.
pub trait ChunkStore: Send + Sync {
    /// Whether any data is attached to `tag`.
    fn exists(&self, tag: &Tag) -> Result<bool, StoreError>;

    /// Publish local files under `tag`, appending to existing data.
    ///
    /// Files are processed in order; a rejected file attaches nothing and
    /// stops the call, files before it stay attached.
    fn chunk(&self, tag: &Tag, paths: &[PathBuf]) -> Result<ChunkSummary, StoreError>;

    /// Remove `tag` and all its data. Deleting a missing tag is a no-op.
    fn delete(&self, tag: &Tag) -> Result<(), StoreError>;

    /// Resolve `tag` to the ordered list of its chunk locations.
    fn read_tag(&self, tag: &Tag) -> Result<Vec<PathBuf>, StoreError>;
}

/// Totals for one `chunk` call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSummary {
    pub chunks: usize,
    pub records: usize,
    pub bytes: u64,
}

/// Limits for [`LocalStore`]
#[derive(Debug, Clone)]
pub struct LocalStoreConfig {
    pub root: PathBuf,
    /// Largest record (excluding its newline) the store accepts
    pub max_record_size: usize,
    /// Target chunk file size; a chunk is closed before it would exceed this
    pub chunk_size: u64,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./ddfs"),
            max_record_size: 1024 * 1024,
            chunk_size: 64 * 1024 * 1024,
        }
    }
}

/// [`ChunkStore`] on a local directory, one sub-directory per tag.
pub struct LocalStore {
    config: LocalStoreConfig,
}

impl LocalStore {
    pub fn new(config: LocalStoreConfig) -> Result<Self, StoreError> {
        fs::create_dir_all(&config.root)?;
        Ok(Self { config })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn tag_dir(&self, tag: &Tag) -> PathBuf {
        self.config.root.join(tag.as_str())
    }

    fn chunk_paths(&self, tag: &Tag) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.tag_dir(tag);
        let pattern = format!(
            "{}/*.{CHUNK_EXTENSION}",
            glob::Pattern::escape(&dir.to_string_lossy())
        );
        let paths = glob::glob(&pattern)
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Io(e.into_error()))?;
        // glob yields alphabetical order; zero-padded names make that sequence order
        Ok(paths)
    }

    /// Split one file into chunk files starting at sequence `seq`.
    ///
    /// Chunks are written as `.tmp` and only renamed once the whole file has
    /// passed the record limit.
    fn chunk_file(
        &self,
        dir: &Path,
        path: &Path,
        mut seq: usize,
    ) -> Result<(Vec<(PathBuf, PathBuf)>, ChunkSummary), StoreError> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut pending: Vec<(PathBuf, PathBuf)> = Vec::new();
        let mut summary = ChunkSummary::default();
        let mut writer: Option<BufWriter<File>> = None;
        let mut current_len = 0u64;
        let mut record = Vec::new();

        let result = (|| -> Result<(), StoreError> {
            loop {
                record.clear();
                if reader.read_until(b'\n', &mut record)? == 0 {
                    break;
                }
                if record.last() != Some(&b'\n') {
                    record.push(b'\n');
                }
                let record_len = record.len() - 1;
                if record_len > self.config.max_record_size {
                    return Err(StoreError::RecordTooLarge {
                        path: path.to_path_buf(),
                        record_len,
                        limit: self.config.max_record_size,
                    });
                }

                let full = current_len > 0
                    && current_len + record.len() as u64 > self.config.chunk_size;
                if writer.is_none() || full {
                    if let Some(mut w) = writer.take() {
                        w.flush()?;
                    }
                    let final_path = dir.join(format!("{seq:06}.{CHUNK_EXTENSION}"));
                    let tmp = dir.join(format!("{seq:06}.{CHUNK_EXTENSION}.tmp"));
                    writer = Some(BufWriter::new(File::create(&tmp)?));
                    pending.push((tmp, final_path));
                    seq += 1;
                    current_len = 0;
                }
                if let Some(w) = writer.as_mut() {
                    w.write_all(&record)?;
                }
                current_len += record.len() as u64;
                summary.records += 1;
                summary.bytes += record.len() as u64;
            }
            if let Some(mut w) = writer.take() {
                w.flush()?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                summary.chunks = pending.len();
                Ok((pending, summary))
            }
            Err(e) => {
                for (tmp, _) in &pending {
                    let _ = fs::remove_file(tmp);
                }
                Err(e)
            }
        }
    }
}

impl ChunkStore for LocalStore {
    fn exists(&self, tag: &Tag) -> Result<bool, StoreError> {
        Ok(self.tag_dir(tag).is_dir())
    }

    fn chunk(&self, tag: &Tag, paths: &[PathBuf]) -> Result<ChunkSummary, StoreError> {
        let dir = self.tag_dir(tag);
        fs::create_dir_all(&dir)?;

        let mut total = ChunkSummary::default();
        for path in paths {
            let seq = self.chunk_paths(tag)?.len();
            let (pending, summary) = self.chunk_file(&dir, path, seq)?;
            for (tmp, final_path) in pending {
                fs::rename(&tmp, &final_path)?;
            }
            log::debug!(
                "{tag}: attached {} ({} chunks, {} records)",
                path.display(),
                summary.chunks,
                summary.records
            );
            total.chunks += summary.chunks;
            total.records += summary.records;
            total.bytes += summary.bytes;
        }
        Ok(total)
    }

    fn delete(&self, tag: &Tag) -> Result<(), StoreError> {
        let dir = self.tag_dir(tag);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            log::debug!("{tag}: deleted");
        }
        Ok(())
    }

    fn read_tag(&self, tag: &Tag) -> Result<Vec<PathBuf>, StoreError> {
        if !self.tag_dir(tag).is_dir() {
            return Err(StoreError::NotFound(tag.to_string()));
        }
        self.chunk_paths(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir, max_record_size: usize, chunk_size: u64) -> LocalStore {
        LocalStore::new(LocalStoreConfig {
            root: dir.path().join("ddfs"),
            max_record_size,
            chunk_size,
        })
        .unwrap()
    }

    fn input(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn chunk_then_read_back() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 1024, 1024);
        let tag = Tag::new("data:test").unwrap();
        let file = input(&dir, "in.txt", b"b\na\na\n");

        let summary = store.chunk(&tag, &[file]).unwrap();
        assert_eq!(summary.records, 3);
        assert_eq!(summary.chunks, 1);
        assert!(store.exists(&tag).unwrap());

        let chunks = store.read_tag(&tag).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(fs::read(&chunks[0]).unwrap(), b"b\na\na\n");
    }

    #[test]
    fn missing_trailing_newline_is_added() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 1024, 1024);
        let tag = Tag::new("t").unwrap();
        store.chunk(&tag, &[input(&dir, "in.txt", b"x\ny")]).unwrap();

        let chunks = store.read_tag(&tag).unwrap();
        assert_eq!(fs::read(&chunks[0]).unwrap(), b"x\ny\n");
    }

    #[test]
    fn chunks_split_on_record_boundaries() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 1024, 8);
        let tag = Tag::new("t").unwrap();
        store
            .chunk(&tag, &[input(&dir, "in.txt", b"aaa\nbbb\nccc\n")])
            .unwrap();

        let chunks = store.read_tag(&tag).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(fs::read(&chunks[0]).unwrap(), b"aaa\nbbb\n");
        assert_eq!(fs::read(&chunks[1]).unwrap(), b"ccc\n");
    }

    #[test]
    fn oversized_record_rejected_and_nothing_attached() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 4, 1024);
        let tag = Tag::new("t").unwrap();
        let err = store
            .chunk(&tag, &[input(&dir, "in.txt", b"ok\ntoolong\n")])
            .unwrap_err();

        assert!(err.is_rejection());
        assert!(store.read_tag(&tag).unwrap().is_empty());
        // no tmp leftovers either
        assert_eq!(fs::read_dir(dir.path().join("ddfs/t")).unwrap().count(), 0);
    }

    #[test]
    fn second_publish_appends() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 1024, 1024);
        let tag = Tag::new("t").unwrap();
        store.chunk(&tag, &[input(&dir, "a.txt", b"a\n")]).unwrap();
        store.chunk(&tag, &[input(&dir, "b.txt", b"b\n")]).unwrap();

        let chunks = store.read_tag(&tag).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(fs::read(&chunks[1]).unwrap(), b"b\n");
    }

    #[test]
    fn delete_missing_tag_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 1024, 1024);
        let tag = Tag::new("never").unwrap();
        store.delete(&tag).unwrap();
        assert!(!store.exists(&tag).unwrap());
        assert!(matches!(
            store.read_tag(&tag),
            Err(StoreError::NotFound(_))
        ));
    }
}
