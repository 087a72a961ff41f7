//! YAML configuration for lawgit runs.
//!
//! Every section is optional and falls back to the defaults shown here.
//!
//! ```yaml
//! version: "1.0"
//!
//! archive:
//!   root: "data"
//!   fetch_parallelism: 30
//!   force: false
//!
//! sources:
//!   gii_root: "http://www.gesetze-im-internet.de/"
//!   toc_path: "gii-toc.xml"
//!   wayback_cdx: "http://web.archive.org/cdx/search/cdx"
//!   wayback_replay: "https://web.archive.org/web"
//!   timeout_secs: 60
//!
//! lookup:
//!   parallelism: 30
//!   timeout_secs: 30
//!   retry:
//!     max_retries: 3
//!     base_delay: 250
//!     max_delay: 10000
//!     jitter: true
//!
//! history:
//!   repository: "laws"
//!   branch: "master"
//!   tracked_gazettes: ["BGBl I", "BGBl II"]
//!
//! logging:
//!   level: "info"
//!   json: false
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use citation::Gazette;
use history::HistoryOptions;
use lookup::RetryConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LawgitConfig {
    pub version: String,

    #[serde(default)]
    pub archive: ArchiveYamlConfig,

    #[serde(default)]
    pub sources: SourcesYamlConfig,

    #[serde(default)]
    pub lookup: LookupYamlConfig,

    #[serde(default)]
    pub history: HistoryYamlConfig,

    #[serde(default)]
    pub logging: LoggingYamlConfig,
}

impl LawgitConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: LawgitConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.archive.validate()?;
        self.sources.validate()?;
        self.lookup.validate()?;
        self.history.validate()?;
        Ok(())
    }
}

impl Default for LawgitConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            archive: ArchiveYamlConfig::default(),
            sources: SourcesYamlConfig::default(),
            lookup: LookupYamlConfig::default(),
            history: HistoryYamlConfig::default(),
            logging: LoggingYamlConfig::default(),
        }
    }
}

/// Snapshot tree settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveYamlConfig {
    #[serde(default = "default_archive_root")]
    pub root: PathBuf,

    #[serde(default = "default_parallelism")]
    pub fetch_parallelism: usize,

    /// Fetch without a freshness precondition.
    #[serde(default)]
    pub force: bool,
}

impl ArchiveYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.fetch_parallelism == 0 {
            return Err(ConfigLoadError::Validation(
                "archive.fetch_parallelism must be >= 1".to_string(),
            ));
        }
        if self.root.as_os_str().is_empty() {
            return Err(ConfigLoadError::Validation(
                "archive.root must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ArchiveYamlConfig {
    fn default() -> Self {
        Self {
            root: default_archive_root(),
            fetch_parallelism: default_parallelism(),
            force: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesYamlConfig {
    #[serde(default = "default_gii_root")]
    pub gii_root: String,

    #[serde(default = "default_toc_path")]
    pub toc_path: String,

    #[serde(default = "default_wayback_cdx")]
    pub wayback_cdx: String,

    #[serde(default = "default_wayback_replay")]
    pub wayback_replay: String,

    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
}

impl SourcesYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.timeout_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "sources.timeout_secs must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourcesYamlConfig {
    fn default() -> Self {
        Self {
            gii_root: default_gii_root(),
            toc_path: default_toc_path(),
            wayback_cdx: default_wayback_cdx(),
            wayback_replay: default_wayback_replay(),
            timeout_secs: default_source_timeout(),
        }
    }
}

/// Procedure and date lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupYamlConfig {
    #[serde(default = "default_dip_landing_url")]
    pub dip_landing_url: String,

    #[serde(default = "default_dip_search_url")]
    pub dip_search_url: String,

    #[serde(default = "default_date_api_url")]
    pub date_api_url: String,

    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl LookupYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.parallelism == 0 {
            return Err(ConfigLoadError::Validation(
                "lookup.parallelism must be >= 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "lookup.timeout_secs must be >= 1".to_string(),
            ));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(ConfigLoadError::Validation(
                "lookup.retry.base_delay must not exceed max_delay".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LookupYamlConfig {
    fn default() -> Self {
        Self {
            dip_landing_url: default_dip_landing_url(),
            dip_search_url: default_dip_search_url(),
            date_api_url: default_date_api_url(),
            parallelism: default_parallelism(),
            timeout_secs: default_lookup_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryYamlConfig {
    #[serde(default = "default_repository")]
    pub repository: PathBuf,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_tracked_gazettes")]
    pub tracked_gazettes: Vec<String>,
}

impl HistoryYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.branch.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "history.branch must not be empty".to_string(),
            ));
        }
        if self.tracked_gazettes.is_empty() {
            return Err(ConfigLoadError::Validation(
                "history.tracked_gazettes must name at least one gazette".to_string(),
            ));
        }
        if self.tracked_gazettes.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigLoadError::Validation(
                "history.tracked_gazettes must not contain empty names".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder options, with lookup parallelism taken from the lookup section.
    pub fn options(&self, parallelism: usize) -> HistoryOptions {
        HistoryOptions {
            branch: self.branch.clone(),
            tracked_gazettes: self.tracked_gazettes.iter().map(|name| Gazette::parse(name)).collect(),
            parallelism,
        }
    }
}

impl Default for HistoryYamlConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            branch: default_branch(),
            tracked_gazettes: default_tracked_gazettes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingYamlConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingYamlConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Helper functions for serde defaults
fn default_archive_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_parallelism() -> usize {
    30
}

fn default_gii_root() -> String {
    archive::DEFAULT_GII_ROOT.to_string()
}

fn default_toc_path() -> String {
    archive::DEFAULT_TOC_PATH.to_string()
}

fn default_wayback_cdx() -> String {
    archive::DEFAULT_CDX_URL.to_string()
}

fn default_wayback_replay() -> String {
    archive::REPLAY_ROOT.to_string()
}

fn default_source_timeout() -> u64 {
    60
}

fn default_dip_landing_url() -> String {
    lookup::DEFAULT_LANDING_URL.to_string()
}

fn default_dip_search_url() -> String {
    lookup::DEFAULT_SEARCH_URL.to_string()
}

fn default_date_api_url() -> String {
    lookup::DEFAULT_API_URL.to_string()
}

fn default_lookup_timeout() -> u64 {
    30
}

fn default_repository() -> PathBuf {
    PathBuf::from("laws")
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_tracked_gazettes() -> Vec<String> {
    vec!["BGBl I".to_string(), "BGBl II".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}
