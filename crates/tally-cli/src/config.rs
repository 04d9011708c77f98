//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::Error as _;
use tally_ingest::Compression;
use tally_job::{CharSortJob, ExecutorConfig};

/// Global configuration for tally
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub http: HttpSettings,
    pub ingest: IngestSettings,
    pub store: StoreSettings,
    pub job: JobSettings,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Seconds without a received chunk before a download is abandoned
    pub read_timeout: u64,
    pub connect_timeout: u64,
    pub max_retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            read_timeout: 30,
            connect_timeout: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    #[serde(deserialize_with = "deserialize_env_path")]
    pub manifest: PathBuf,
    #[serde(deserialize_with = "deserialize_env_path")]
    pub tmp_dir: PathBuf,
    #[serde(deserialize_with = "deserialize_env_string")]
    pub tag: String,
    pub compression: Compression,
    pub chunk_size: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        let defaults = tally_ingest::Config::default();
        Self {
            manifest: defaults.manifest,
            tmp_dir: defaults.tmp_dir,
            tag: defaults.tag,
            compression: defaults.compression,
            chunk_size: defaults.chunk_size,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    #[serde(deserialize_with = "deserialize_env_path")]
    pub root: PathBuf,
    pub max_record_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let defaults = tally_store::LocalStoreConfig::default();
        Self {
            root: defaults.root,
            max_record_size: defaults.max_record_size,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    pub partitions: usize,
    pub workers: usize,
    pub repetition: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        let executor = ExecutorConfig::default();
        Self {
            partitions: executor.partitions,
            workers: executor.workers,
            repetition: CharSortJob::DEFAULT_REPETITION,
        }
    }
}

fn deserialize_env_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    expand_env_var(&raw)
        .ok_or_else(|| D::Error::custom(format!("environment variable not set: {raw}")))
}

fn deserialize_env_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_env_string(deserializer).map(PathBuf::from)
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./tally.toml (current directory)
    /// 2. ~/.config/tally/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("tally.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "tally") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject settings that would only fail later, mid-pipeline
    fn validate(&self) -> Result<()> {
        if self.ingest.chunk_size == 0 {
            anyhow::bail!("[ingest] chunk_size must be positive");
        }
        Ok(())
    }

    pub fn http_config(&self) -> tally_core::HttpConfig {
        tally_core::HttpConfig {
            read_timeout: std::time::Duration::from_secs(self.http.read_timeout),
            connect_timeout: std::time::Duration::from_secs(self.http.connect_timeout),
            max_retries: self.http.max_retries,
        }
    }

    pub fn store_config(&self) -> tally_store::LocalStoreConfig {
        tally_store::LocalStoreConfig {
            root: self.store.root.clone(),
            max_record_size: self.store.max_record_size,
            ..Default::default()
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            partitions: self.job.partitions.max(1),
            workers: self.job.workers.max(1),
        }
    }
}
