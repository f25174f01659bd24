use std::path::PathBuf;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use crate::fetch::FetchSettings;

/// Yields the current time as an RFC 3339 UTC string.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[derive(Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub fetch: FetchSettings,
    pub max_concurrent_jobs: usize,
    pub clock: Clock,
}

impl EngineConfig {
    pub fn default_with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            fetch: FetchSettings::default(),
            max_concurrent_jobs: 4,
            clock: system_clock(),
        }
    }

    /// Root of the archive store.
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join("archive")
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("data_dir", &self.data_dir)
            .field("fetch", &self.fetch)
            .field("max_concurrent_jobs", &self.max_concurrent_jobs)
            .finish_non_exhaustive()
    }
}
