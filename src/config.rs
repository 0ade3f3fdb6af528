use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{JIKAN_API, catalog, intervals, limits};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub jikan: JikanConfig,

    pub table: TableConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JikanConfig {
    pub base_url: String,

    /// Records per page, sent as `limit` (default: 20, Jikan caps it at 25)
    pub page_size: u32,

    /// Server-side ordering. Independent of the table's own column sort,
    /// which only reorders what has already been fetched.
    pub order_by: String,

    /// "asc" or "desc"
    pub sort: String,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,

    pub user_agent: String,
}

impl Default for JikanConfig {
    fn default() -> Self {
        Self {
            base_url: JIKAN_API.to_string(),
            page_size: catalog::PAGE_SIZE,
            order_by: catalog::DEFAULT_ORDER_BY.to_string(),
            sort: catalog::DEFAULT_SORT.to_string(),
            request_timeout_seconds: 30,
            user_agent: "Anitable/1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Quiescence window for the search box (default: 500)
    pub search_debounce_ms: u64,

    /// Quiescence window for the score slider (default: 300)
    pub score_debounce_ms: u64,

    /// Load the next page once a row this close to the end becomes visible
    pub prefetch_threshold: usize,

    /// Table event channel capacity (default: 64)
    pub event_buffer_size: usize,
}

impl Default for TableConfig {
    #[allow(clippy::cast_possible_truncation)]
    fn default() -> Self {
        Self {
            search_debounce_ms: intervals::SEARCH_DEBOUNCE.as_millis() as u64,
            score_debounce_ms: intervals::SCORE_DEBOUNCE.as_millis() as u64,
            prefetch_threshold: limits::PREFETCH_THRESHOLD,
            event_buffer_size: limits::EVENT_BUFFER_SIZE,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("anitable").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".anitable").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.jikan.base_url.trim().is_empty() {
            anyhow::bail!("Jikan base URL cannot be empty");
        }

        url::Url::parse(&self.jikan.base_url)
            .with_context(|| format!("Invalid Jikan base URL: {}", self.jikan.base_url))?;

        if self.jikan.page_size == 0 || self.jikan.page_size > catalog::MAX_PAGE_SIZE {
            anyhow::bail!(
                "Jikan page size must be between 1 and {}, got {}",
                catalog::MAX_PAGE_SIZE,
                self.jikan.page_size
            );
        }

        if !matches!(self.jikan.sort.as_str(), "asc" | "desc") {
            anyhow::bail!("Jikan sort must be \"asc\" or \"desc\", got {:?}", self.jikan.sort);
        }

        if !matches!(self.general.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!(
                "Log format must be \"pretty\" or \"json\", got {:?}",
                self.general.log_format
            );
        }

        Ok(())
    }
}
