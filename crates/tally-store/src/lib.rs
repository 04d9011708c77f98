//! tally-store: tag-addressed chunk storage for job inputs
//!
//! A tag is a logical name resolving to an ordered list of chunk files.
//! [`ChunkStore`] is the contract the ingestion pipeline and the job
//! executor need from the distributed storage layer; [`LocalStore`] is a
//! directory-backed implementation. [`NamespaceGuard`] keeps a tag scoped to
//! one job run.

pub mod error;
pub mod guard;
pub mod store;
pub mod tag;

pub use error::StoreError;
pub use guard::{NamespaceGuard, with_tag};
pub use store::{ChunkStore, ChunkSummary, LocalStore, LocalStoreConfig};
pub use tag::Tag;
