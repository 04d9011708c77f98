//! Tally Ingest - resumable corpus ingestion
//!
//! Downloads compressed text files listed in a manifest, decompresses them
//! into newline-partitioned files, and publishes those under a store tag.
//!
//! Every stage skips work whose output already exists in the working
//! directory, so a run interrupted part way can simply be repeated.
//!
//! # Example
//!
//! ```ignore
//! use tally_ingest::{Config, SourceFetcher, run};
//!
//! let config = Config {
//!     manifest: "bz2_url_list.txt".into(),
//!     tag: "data:big".into(),
//!     ..Default::default()
//! };
//! let report = run(&config, &store, &SourceFetcher, &progress)?;
//! println!("{} published", report.published);
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod partition;
pub mod pipeline;

// Re-exports
pub use config::Config;
pub use error::{ErrorKind, IngestError};
pub use fetch::{Fetcher, SourceFetcher};
pub use manifest::{SourceDescriptor, parse_manifest, read_manifest};
pub use partition::{CHUNK_SIZE, Compression, partition_file, partition_stream};
pub use pipeline::{Failure, PipelineReport, run};
