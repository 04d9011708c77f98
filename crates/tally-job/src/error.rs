//! Job failures
//!
//! Every variant is fatal to the job run: there is no per-record retry, and
//! no partial results are returned.

use tally_store::StoreError;

use crate::codec::CodecError;

#[derive(Debug)]
pub enum JobError {
    /// A map invocation failed
    Map(String),
    /// A reduce invocation failed
    Reduce(String),
    /// A shuffle key could not be decoded back into a domain key
    Codec(CodecError),
    /// Input tag could not be resolved or staged
    Store(StoreError),
    /// Reading input chunks or writing results
    Io(std::io::Error),
    /// A worker thread died without reporting a result
    Worker(String),
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Map(msg) => write!(f, "map failed: {msg}"),
            Self::Reduce(msg) => write!(f, "reduce failed: {msg}"),
            Self::Codec(e) => write!(f, "key decode failed: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Worker(msg) => write!(f, "worker failed: {msg}"),
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for JobError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<StoreError> for JobError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<std::io::Error> for JobError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for JobError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.into())
    }
}
