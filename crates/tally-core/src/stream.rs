//! HTTP downloads with stall detection.
//!
//! Uses async reqwest internally with tokio::time::timeout per body chunk,
//! but presents a sync interface so the pipeline stays a plain loop.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{LazyLock, OnceLock};
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::ProgressBar;

use crate::artifact;
use crate::progress::upgrade_to_bar;

/// Process-wide HTTP settings, installed once at startup.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// No body data for this long = stall
    pub read_timeout: Duration,
    pub connect_timeout: Duration,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

static HTTP_CONFIG: OnceLock<HttpConfig> = OnceLock::new();

/// Install HTTP settings. Only the first call wins.
pub fn set_http_config(config: HttpConfig) {
    if HTTP_CONFIG.set(config).is_err() {
        log::debug!("HTTP config already installed, ignoring override");
    }
}

/// Current HTTP settings (defaults if none were installed).
pub fn http_config() -> &'static HttpConfig {
    HTTP_CONFIG.get_or_init(HttpConfig::default)
}

/// Error types for stream operations
#[derive(Debug)]
pub enum StreamError {
    /// HTTP error with optional status code (`None` = connection-level failure)
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error (local disk or body read)
    Io(io::Error),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "connection error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Http { .. } => None,
        }
    }
}

impl StreamError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            Self::Io(_) => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            // Client errors won't change on retry; 408 and 429 are the exceptions
            Self::Http {
                status: Some(s), ..
            } => !(400..500).contains(s) || matches!(s, 408 | 429),
            Self::Http { status: None, .. } => true,
            Self::Io(e) => !matches!(
                e.kind(),
                io::ErrorKind::StorageFull | io::ErrorKind::PermissionDenied
            ),
        }
    }
}

impl From<io::Error> for StreamError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(http_config().connect_timeout)
        .pool_max_idle_per_host(4)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// HTTP GET `url` into `dest`.
///
/// The body is streamed to `<dest>.tmp` and renamed into place only after the
/// last byte arrives, so `dest` existing always means a complete download.
/// Returns the number of bytes written.
pub fn download_to_file(url: &str, dest: &Path, pb: &ProgressBar) -> Result<u64, StreamError> {
    let tmp = artifact::tmp_path(dest);
    let read_timeout = http_config().read_timeout;

    let result = SHARED_RUNTIME.handle().block_on(async {
        let response = http_client()
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StreamError::from_reqwest(&e))?;

        if let Some(total) = response.content_length() {
            upgrade_to_bar(pb, total);
        }
        pb.set_message("downloading...");

        let mut out = File::create(&tmp)?;
        let mut body = response.bytes_stream();
        let mut written = 0u64;
        loop {
            let next = tokio::time::timeout(read_timeout, body.next())
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("read timeout ({}s with no data)", read_timeout.as_secs()),
                    )
                })?;
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| StreamError::from_reqwest(&e))?;
            out.write_all(&chunk)?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }
        out.sync_all()?;
        Ok::<_, StreamError>(written)
    });

    match result {
        Ok(written) => {
            artifact::commit_tmp(&tmp, dest)?;
            Ok(written)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}
