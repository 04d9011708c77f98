//! Tally Core - Common infrastructure for corpus ingestion and sort-count jobs
//!
//! This crate provides the pieces shared by the ingestion pipeline and the
//! job runner: HTTP downloads, atomic artifact files, logging, progress bars,
//! retry and graceful shutdown.

pub mod artifact;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod shutdown;
pub mod stream;

// Re-exports for convenience
pub use artifact::{commit_tmp, remove_stale_tmp, tmp_path};
pub use logging::{IndicatifLogger, Verbosity, init_logging};
pub use progress::{ProgressContext, SharedProgress};
pub use retry::retry_with_backoff;
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown};
pub use stream::{
    HttpConfig, SHARED_RUNTIME, StreamError, download_to_file, http_client, http_config,
    set_http_config,
};
