//! Tally Job - distributed sort-and-tally as map/reduce
//!
//! Two jobs share one shape and differ only in key granularity:
//!
//! - [`CharSortJob`] counts every character of the input
//! - [`LineSortJob`] counts every distinct line
//!
//! Jobs are small stateless values implementing [`Mapper`] and [`Reducer`];
//! they carry only serializable parameters, so an executor can ship them to
//! workers without sharing state with the submitting process.
//! [`LocalExecutor`] runs them in-process over tags of a
//! [`ChunkStore`](tally_store::ChunkStore).

pub mod char_sort;
pub mod codec;
pub mod driver;
pub mod error;
pub mod executor;
pub mod job;
pub mod line_sort;
pub mod output;

pub use char_sort::{ALPHANUMERIC, CharSortJob};
pub use codec::{CharCodec, KeyCodec, LineCodec};
pub use driver::{sort_chars_tag, sort_lines_file};
pub use error::JobError;
pub use executor::{ExecutorConfig, JobExecutor, JobHandle, LocalExecutor, MapReader, Results};
pub use job::{KeyValue, Mapper, Reducer, ResultRecord, ShuffleKey, group_by_key};
pub use line_sort::LineSortJob;
pub use output::{write_csv, write_tsv};
