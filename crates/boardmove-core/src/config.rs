use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::MigrationError;
use crate::result::MigrationResult;

/// Waits and settle delays, in milliseconds.
///
/// The defaults were tuned against one version of the destination. They are
/// plain configuration so a different destination can be tuned without a
/// rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval_ms: u64,
    pub column_appear_timeout_ms: u64,
    pub column_title_timeout_ms: u64,
    pub title_focus_delay_ms: u64,
    pub title_commit_delay_ms: u64,
    pub add_card_visible_timeout_ms: u64,
    pub ready_timeout_ms: u64,
    pub ready_interval_ms: u64,
    pub ready_settle_ms: u64,
    pub hover_settle_ms: u64,
    pub add_card_click_delay_ms: u64,
    pub card_appear_timeout_ms: u64,
    pub field_focus_delay_ms: u64,
    pub field_settle_ms: u64,
    pub content_region_timeout_ms: u64,
    pub content_region_interval_ms: u64,
    pub editor_activate_delay_ms: u64,
    pub keystroke_delay_ms: u64,
    pub post_injection_settle_ms: u64,
    pub close_delay_ms: u64,
    pub closed_timeout_ms: u64,
    pub inter_card_delay_ms: u64,
    pub inter_column_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 150,
            column_appear_timeout_ms: 3000,
            column_title_timeout_ms: 3000,
            title_focus_delay_ms: 80,
            title_commit_delay_ms: 200,
            add_card_visible_timeout_ms: 3000,
            ready_timeout_ms: 4000,
            ready_interval_ms: 200,
            ready_settle_ms: 250,
            hover_settle_ms: 150,
            add_card_click_delay_ms: 1200,
            card_appear_timeout_ms: 3000,
            field_focus_delay_ms: 150,
            field_settle_ms: 200,
            content_region_timeout_ms: 5000,
            content_region_interval_ms: 200,
            editor_activate_delay_ms: 200,
            keystroke_delay_ms: 10,
            post_injection_settle_ms: 1000,
            close_delay_ms: 400,
            closed_timeout_ms: 4000,
            inter_card_delay_ms: 800,
            inter_column_delay_ms: 500,
        }
    }
}

impl TimingConfig {
    /// No settle delays and a single probe per wait.
    ///
    /// Suitable for destinations that render synchronously, such as the
    /// in-memory simulated board.
    pub fn immediate() -> Self {
        Self {
            poll_interval_ms: 1,
            column_appear_timeout_ms: 0,
            column_title_timeout_ms: 0,
            title_focus_delay_ms: 0,
            title_commit_delay_ms: 0,
            add_card_visible_timeout_ms: 0,
            ready_timeout_ms: 0,
            ready_interval_ms: 1,
            ready_settle_ms: 0,
            hover_settle_ms: 0,
            add_card_click_delay_ms: 0,
            card_appear_timeout_ms: 0,
            field_focus_delay_ms: 0,
            field_settle_ms: 0,
            content_region_timeout_ms: 0,
            content_region_interval_ms: 1,
            editor_activate_delay_ms: 0,
            keystroke_delay_ms: 0,
            post_injection_settle_ms: 0,
            close_delay_ms: 0,
            closed_timeout_ms: 0,
            inter_card_delay_ms: 0,
            inter_column_delay_ms: 0,
        }
    }
}

/// Shorthand used by the engine to turn a configured value into a duration.
pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Bounded retry for control clicks that are not observed to take effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff_ms: 400,
        }
    }
}

/// How a column title node encodes its live position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub index_attribute: String,
    pub column_title_prefix: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            index_attribute: "data-testid".to_string(),
            column_title_prefix: "column-title-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
}

impl MigrationConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/boardmove/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("boardmove/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("boardmove\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Load the user config, falling back to defaults when it is absent or
    /// unreadable.
    pub fn load() -> Self {
        if let Some(config_path) = Self::config_path() {
            if config_path.exists() {
                match Self::load_from(&config_path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Ignoring config at {}: {}", config_path.display(), e)
                    }
                }
            }
        }
        Self::default()
    }

    /// Load an explicitly named config file. Errors are reported, not masked.
    pub fn load_from(path: &Path) -> MigrationResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> MigrationResult<Self> {
        toml::from_str(content).map_err(|e| MigrationError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> MigrationResult<String> {
        toml::to_string_pretty(self).map_err(|e| MigrationError::Config(e.to_string()))
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Clamp values that would make the engine misbehave.
    pub fn normalized(mut self) -> Self {
        if self.retry.max_attempts == 0 {
            self.retry.max_attempts = 1;
        }
        if self.timing.poll_interval_ms == 0 {
            self.timing.poll_interval_ms = 1;
        }
        if self.timing.ready_interval_ms == 0 {
            self.timing.ready_interval_ms = 1;
        }
        if self.timing.content_region_interval_ms == 0 {
            self.timing.content_region_interval_ms = 1;
        }
        self
    }
}
