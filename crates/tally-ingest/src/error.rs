//! Per-source failures of the ingestion pipeline
//!
//! None of these abort a run: the failing source is logged and skipped.

use std::fmt;
use std::path::PathBuf;

use tally_core::StreamError;
use tally_store::StoreError;

/// Failure category, one per error variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    InvalidInputFormat,
    PublishRejected,
    Store,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Network => "NetworkError",
            Self::InvalidInputFormat => "InvalidInputFormat",
            Self::PublishRejected => "PublishRejected",
            Self::Store => "StoreError",
            Self::Io => "IoError",
        })
    }
}

#[derive(Debug)]
pub enum IngestError {
    /// Fetch failed (HTTP status, connection, or writing the download)
    Network {
        location: String,
        source: StreamError,
    },
    /// File name doesn't carry the expected compressed extension
    InvalidInputFormat { path: PathBuf, expected: String },
    /// Store refused the partitioned file (e.g. a record over the size limit)
    PublishRejected { path: PathBuf, source: StoreError },
    /// Store failed for reasons other than the content
    Store { path: PathBuf, source: StoreError },
    /// Local decompress/partition or cleanup failure
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::InvalidInputFormat { .. } => ErrorKind::InvalidInputFormat,
            Self::PublishRejected { .. } => ErrorKind::PublishRejected,
            Self::Store { .. } => ErrorKind::Store,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Map a store failure for `path` onto the rejected/failed split.
    pub fn from_store(path: PathBuf, source: StoreError) -> Self {
        if source.is_rejection() {
            Self::PublishRejected { path, source }
        } else {
            Self::Store { path, source }
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { location, source } => write!(f, "{source} ({location})"),
            Self::InvalidInputFormat { path, expected } => write!(
                f,
                "file extension not '.{expected}': {}",
                path.display()
            ),
            Self::PublishRejected { path, source } => {
                write!(f, "publish rejected: {source} (file: {})", path.display())
            }
            Self::Store { path, source } => {
                write!(f, "store: {source} (file: {})", path.display())
            }
            Self::Io { path, source } => write!(f, "IO: {source} (file: {})", path.display()),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Network { source, .. } => Some(source),
            Self::InvalidInputFormat { .. } => None,
            Self::PublishRejected { source, .. } | Self::Store { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}
