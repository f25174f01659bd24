//! `archiver.ron`: application settings.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use archive_logging::{archive_info, parse_level, LevelFilter};
use archiver_engine::{system_clock, EngineConfig, FetchSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "archiver.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root for archives and, unless overridden, the bookmark file.
    pub data_dir: PathBuf,
    /// Relative paths are resolved against `data_dir`.
    pub bookmarks_file: PathBuf,
    pub log_level: String,
    pub log_destination: LogDestination,
    pub log_file: PathBuf,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub max_concurrent_jobs: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            data_dir: PathBuf::from("archiver-data"),
            bookmarks_file: PathBuf::from("bookmarks.ron"),
            log_level: "info".to_string(),
            log_destination: LogDestination::Terminal,
            log_file: PathBuf::from("archiver.log"),
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            redirect_limit: fetch.redirect_limit,
            max_bytes: fetch.max_bytes,
            max_concurrent_jobs: 4,
        }
    }
}

impl AppConfig {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }

    /// Falls back to `info` when the configured name is not a level.
    pub fn level_filter(&self) -> LevelFilter {
        parse_level(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    pub fn bookmarks_path(&self) -> PathBuf {
        if self.bookmarks_file.is_absolute() {
            self.bookmarks_file.clone()
        } else {
            self.data_dir.join(&self.bookmarks_file)
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig {
            data_dir: self.data_dir.clone(),
            fetch: FetchSettings {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                redirect_limit: self.redirect_limit,
                max_bytes: self.max_bytes,
            },
            max_concurrent_jobs: self.max_concurrent_jobs.max(1),
            clock: system_clock(),
        };
        archive_info!("engine configured: {:?}", config);
        config
    }
}
