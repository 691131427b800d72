//! Configuration values threaded into the sources and the grid coordinator.
//!
//! Nothing in this crate reads configuration from global state; the process entry
//! point builds a [`CoverConfig`] and hands the pieces to the constructors.

use std::{fmt, ops::RangeInclusive, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{CoverError, CoverResult};

/// Grid dimensions offered to the user (rows = columns).
pub const SUPPORTED_GRID_SIZES: RangeInclusive<u32> = 2..=6;

pub const DEFAULT_GRID_DIMENSION: u32 = 3;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_DISPLAY_AREA: (u32, u32) = (1200, 1200);
pub const DEFAULT_LOG_CAPACITY: usize = 100;

pub const DEFAULT_CATALOG_ENDPOINT: &str = "https://api.discogs.com/database/search";
pub const DEFAULT_USER_AGENT: &str = "InteracTunesScreenSaver/1.0";

/// Number of locators kept from one catalog query.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// `per_page` is requested as `batch_size * oversampling` since many results lack a cover.
pub const DEFAULT_OVERSAMPLING: usize = 4;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Which backend currently supplies the grid
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Image files from a local directory
    #[default]
    Local,
    /// Cover images from the remote catalog search
    Remote,
}

impl SourceMode {
    /// The source used when this one comes up short
    pub fn other(self) -> SourceMode {
        match self {
            SourceMode::Local => SourceMode::Remote,
            SourceMode::Remote => SourceMode::Local,
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Local => write!(f, "local"),
            SourceMode::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for SourceMode {
    type Err = CoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(SourceMode::Local),
            "remote" | "discogs" => Ok(SourceMode::Remote),
            other => Err(CoverError::ConfigurationRejected(format!("unknown source mode '{other}'"))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory whose files are served as images
    pub directory: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("images/albums"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    pub endpoint: String,
    /// Initial search term
    pub search_query: String,
    /// Static catalog credentials, attached to every search request
    pub key: String,
    pub secret: String,
    pub user_agent: String,
    pub batch_size: usize,
    pub oversampling: usize,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CATALOG_ENDPOINT.to_string(),
            search_query: String::new(),
            key: String::new(),
            secret: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            oversampling: DEFAULT_OVERSAMPLING,
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl RemoteConfig {
    /// Set the catalog credentials.
    pub fn with_credentials(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.key = key.into();
        self.secret = secret.into();
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.key.trim().is_empty() && !self.secret.trim().is_empty()
    }

    /// Value sent as `per_page`
    pub fn per_page(&self) -> usize {
        self.batch_size.saturating_mul(self.oversampling).max(1)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub dimension: u32,
    pub refresh_interval_secs: u64,
    pub mode: SourceMode,
    /// Initial display area in pixels (width, height)
    pub display_area: (u32, u32),
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_GRID_DIMENSION,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            mode: SourceMode::default(),
            display_area: DEFAULT_DISPLAY_AREA,
        }
    }
}

impl GridConfig {
    /// Check every field against the supported ranges.
    pub fn validate(&self) -> CoverResult<()> {
        validate_dimension(self.dimension)?;
        validate_refresh_interval(self.refresh_interval_secs)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CoverConfig {
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub grid: GridConfig,
    /// Number of entries the in-memory event log keeps
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            local: LocalConfig::default(),
            remote: RemoteConfig::default(),
            grid: GridConfig::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

pub fn validate_dimension(dimension: u32) -> CoverResult<()> {
    if SUPPORTED_GRID_SIZES.contains(&dimension) {
        Ok(())
    } else {
        Err(CoverError::ConfigurationRejected(format!(
            "grid dimension {dimension} is outside {}..={}",
            SUPPORTED_GRID_SIZES.start(),
            SUPPORTED_GRID_SIZES.end()
        )))
    }
}

pub fn validate_refresh_interval(seconds: u64) -> CoverResult<()> {
    if seconds == 0 {
        Err(CoverError::ConfigurationRejected("refresh interval must be at least one second".to_string()))
    } else {
        Ok(())
    }
}
