//! Decompress and re-emit a source as bounded newline-terminated records.
//!
//! The store rejects (or corrupts on) very long records, so the decompressed
//! stream is cut into fixed-size blocks with a newline after each one. This is
//! purely mechanical: block boundaries follow read size, not text structure.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::IngestError;

/// Block size between inserted newlines (100 KiB)
pub const CHUNK_SIZE: usize = 100 * 1024;

/// Compression format of the source files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[serde(alias = "bzip2")]
    Bz2,
    #[serde(alias = "gzip")]
    Gz,
}

impl Compression {
    /// Parse from a config/CLI name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "bz2" | "bzip2" => Some(Self::Bz2),
            "gz" | "gzip" => Some(Self::Gz),
            _ => None,
        }
    }

    /// File extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::Bz2 => "bz2",
            Self::Gz => "gz",
        }
    }

    /// Wrap `reader` in the matching multi-stream decoder.
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Self::Bz2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            Self::Gz => Box::new(flate2::read::MultiGzDecoder::new(reader)),
        }
    }

    /// Path of the partitioned output: `raw` with the compressed extension
    /// stripped. Fails if `raw` doesn't carry that extension.
    pub fn partitioned_path(self, raw: &Path) -> Result<PathBuf, IngestError> {
        if raw.extension().is_some_and(|ext| ext == self.extension()) {
            Ok(raw.with_extension(""))
        } else {
            Err(IngestError::InvalidInputFormat {
                path: raw.to_path_buf(),
                expected: self.extension().to_string(),
            })
        }
    }
}

/// Totals from partitioning one stream
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PartitionStats {
    pub blocks: usize,
    /// Decompressed bytes, not counting inserted newlines
    pub bytes: u64,
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
fn read_block(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Copy `reader` to `writer`, writing a newline after every `chunk_size`
/// bytes and after a short final block. Empty input writes nothing.
///
/// A zero `chunk_size` is rejected with [`io::ErrorKind::InvalidInput`].
pub fn partition_stream(
    mut reader: impl Read,
    mut writer: impl Write,
    chunk_size: usize,
) -> io::Result<PartitionStats> {
    if chunk_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "chunk_size must be positive",
        ));
    }
    let mut buf = vec![0u8; chunk_size];
    let mut stats = PartitionStats::default();

    loop {
        let n = read_block(&mut reader, &mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        writer.write_all(b"\n")?;
        stats.blocks += 1;
        stats.bytes += n as u64;
        if n < chunk_size {
            break;
        }
    }
    writer.flush()?;
    Ok(stats)
}

/// Decompress `raw` into `out`, partitioned every `chunk_size` bytes.
///
/// The extension check happens before any file is touched. Output goes to
/// `<out>.tmp` first and is renamed into place on success.
pub fn partition_file(
    raw: &Path,
    out: &Path,
    compression: Compression,
    chunk_size: usize,
) -> Result<PartitionStats, IngestError> {
    compression.partitioned_path(raw)?;

    let io_err = |source| IngestError::Io {
        path: raw.to_path_buf(),
        source,
    };
    let tmp = tally_core::tmp_path(out);

    let result = (|| {
        let input = File::open(raw)?;
        let decoder = compression.decoder(BufReader::new(input));
        let output = BufWriter::new(File::create(&tmp)?);
        let stats = partition_stream(decoder, output, chunk_size)?;
        tally_core::commit_tmp(&tmp, out)?;
        Ok::<_, io::Error>(stats)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result.map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn partition(input: &[u8], chunk_size: usize) -> Vec<u8> {
        let mut out = Vec::new();
        partition_stream(Cursor::new(input), &mut out, chunk_size).unwrap();
        out
    }

    #[test]
    fn newline_after_every_block() {
        assert_eq!(partition(b"abcdefgh", 4), b"abcd\nefgh\n");
    }

    #[test]
    fn short_final_block_terminated() {
        assert_eq!(partition(b"abcdef", 4), b"abcd\nef\n");
    }

    #[test]
    fn empty_input_empty_output() {
        assert_eq!(partition(b"", 4), b"");
    }

    #[test]
    fn existing_newlines_preserved() {
        assert_eq!(partition(b"a\nbcd\ne", 4), b"a\nbc\nd\ne\n");
    }

    #[test]
    fn blocks_never_exceed_chunk_size() {
        let input: Vec<u8> = (0..10_000u32).map(|i| b'a' + (i % 26) as u8).collect();
        let out = partition(&input, 1000);
        let blocks: Vec<&[u8]> = out.split(|b| *b == b'\n').collect();
        // trailing newline leaves one empty tail
        assert_eq!(blocks.len(), 11);
        assert!(blocks.iter().all(|b| b.len() <= 1000));
        let stripped: Vec<u8> = out.into_iter().filter(|b| *b != b'\n').collect();
        assert_eq!(stripped, input);
    }

    #[test]
    fn zero_chunk_size_is_an_error() {
        let mut out = Vec::new();
        let err = partition_stream(Cursor::new(b"abc"), &mut out, 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(out.is_empty());
    }

    #[test]
    fn partitioned_path_strips_extension() {
        let p = Compression::Bz2
            .partitioned_path(Path::new("/tmp/enwiki.xml.bz2"))
            .unwrap();
        assert_eq!(p, PathBuf::from("/tmp/enwiki.xml"));
        let p = Compression::Gz
            .partitioned_path(Path::new("/tmp/a.gz"))
            .unwrap();
        assert_eq!(p, PathBuf::from("/tmp/a"));
    }

    #[test]
    fn wrong_extension_rejected_before_io() {
        // file doesn't exist: an I/O attempt would surface as Io, not InvalidInputFormat
        let err = partition_file(
            Path::new("/nonexistent/data.zip"),
            Path::new("/nonexistent/data"),
            Compression::Bz2,
            CHUNK_SIZE,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInputFormat);
        assert!(format!("{err}").contains("data.zip"));
    }

    #[test]
    fn bz2_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("corpus.txt.bz2");
        let mut enc = bzip2::write::BzEncoder::new(
            File::create(&raw).unwrap(),
            bzip2::Compression::default(),
        );
        enc.write_all(b"hello world").unwrap();
        enc.finish().unwrap();

        let out = dir.path().join("corpus.txt");
        let stats = partition_file(&raw, &out, Compression::Bz2, 4).unwrap();

        assert_eq!(stats.blocks, 3);
        assert_eq!(std::fs::read(&out).unwrap(), b"hell\no wo\nrld\n");
        assert!(!tally_core::tmp_path(&out).exists());
    }

    #[test]
    fn gz_file_partitioned() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("corpus.txt.gz");
        let mut enc = flate2::write::GzEncoder::new(
            File::create(&raw).unwrap(),
            flate2::Compression::default(),
        );
        enc.write_all(b"abcdefgh").unwrap();
        enc.finish().unwrap();

        let out = dir.path().join("corpus.txt");
        partition_file(&raw, &out, Compression::Gz, 4).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"abcd\nefgh\n");
    }

    #[test]
    fn corrupt_input_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("broken.txt.bz2");
        std::fs::write(&raw, b"not bzip2 data").unwrap();

        let out = dir.path().join("broken.txt");
        let err = partition_file(&raw, &out, Compression::Bz2, 4).unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::Io);
        assert!(!out.exists());
        assert!(!tally_core::tmp_path(&out).exists());
    }

    #[test]
    fn compression_from_name() {
        assert_eq!(Compression::from_name("BZ2"), Some(Compression::Bz2));
        assert_eq!(Compression::from_name("gzip"), Some(Compression::Gz));
        assert_eq!(Compression::from_name("zip"), None);
    }
}
