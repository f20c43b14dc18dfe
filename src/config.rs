//! # Console Configuration
//!
//! Defaults for every entity screen, stored as TOML under the user's config
//! directory:
//!
//! ```text
//! <config_dir>/broker-console/config.toml
//! ├── [table]      - page size, page size multipliers, search debounce
//! ├── [time]       - default history window for time-scoped tables
//! ├── [messenger]  - in-memory message history bound
//! └── [log]        - default tracing level when RUST_LOG is unset
//! ```
//!
//! Loading never fails the application: a missing or unreadable file falls
//! back to defaults with a warning, the same fail-safe strategy the session
//! loader uses.

use crate::page::timewindow::{history_interval, Timewindow, DAY};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const APP_DIR: &str = "broker-console";
const CONFIG_FILE: &str = "config.toml";

/// Table engine defaults.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct TableDefaults {
    pub default_page_size: u32,
    /// Quiet period before a search input change reloads the table
    pub search_debounce_ms: u64,
    /// Page size options offered as multiples of the table's default size
    pub page_size_multipliers: Vec<u32>,
}

impl Default for TableDefaults {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            search_debounce_ms: 150,
            page_size_multipliers: vec![1, 2, 3],
        }
    }
}

impl TableDefaults {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// `[n, 2n, 3n]` for the default multipliers.
    pub fn page_size_options(&self, page_size: u32) -> Vec<u32> {
        self.page_size_multipliers
            .iter()
            .map(|m| page_size.saturating_mul(*m))
            .collect()
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct TimeDefaults {
    pub default_history_ms: i64,
}

impl Default for TimeDefaults {
    fn default() -> Self {
        Self {
            default_history_ms: DAY,
        }
    }
}

impl TimeDefaults {
    pub fn default_timewindow(&self) -> Timewindow {
        history_interval(self.default_history_ms)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct MessengerDefaults {
    /// Oldest messages are dropped beyond this count
    pub max_messages: usize,
}

impl Default for MessengerDefaults {
    fn default() -> Self {
        Self { max_messages: 1000 }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub table: TableDefaults,
    pub time: TimeDefaults,
    pub messenger: MessengerDefaults,
    pub log: LogConfig,
}

impl ConsoleConfig {
    pub fn config_path() -> PathBuf {
        config_dir().join(APP_DIR).join(CONFIG_FILE)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| eyre!("Failed to parse console config: {}", e))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| eyre!("Failed to serialize console config: {}", e))
    }

    /// Loads the config file, falling back to defaults.
    pub async fn load() -> Self {
        Self::load_from(&Self::config_path()).await
    }

    pub async fn load_from(path: &Path) -> Self {
        Self::or_default(path, Self::read_from(path).await)
    }

    /// Settles a read result, logging why defaults are used. Callers that
    /// read before logging is installed settle afterwards.
    pub fn or_default(path: &Path, loaded: Result<Option<Self>>) -> Self {
        match loaded {
            Ok(Some(config)) => {
                info!("Loaded console config from {}", path.display());
                config
            }
            Ok(None) => {
                debug!("No console config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Console config unusable, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Reads the file at `path`; `None` when it does not exist.
    pub async fn read_from(path: &Path) -> Result<Option<Self>> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file: {}", e))?;
        Self::from_toml_str(&content).map(Some)
    }

    /// Writes the default config when no file exists yet.
    pub async fn ensure_default_config() -> Result<PathBuf> {
        let path = Self::config_path();
        Self::ensure_default_config_at(&path).await?;
        Ok(path)
    }

    pub async fn ensure_default_config_at(path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = Self::default().to_toml_string()?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write default config file: {}", e))?;
        info!("Created default console config at {}", path.display());
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| {
        warn!("Could not determine config directory, using current directory");
        PathBuf::from(".")
    })
}
