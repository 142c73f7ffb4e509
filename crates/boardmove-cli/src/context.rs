use std::path::{Path, PathBuf};

use boardmove_chrome::{BrowserTarget, LaunchOptions, SelectorProfile};
use boardmove_core::MigrationConfig;

use crate::cli::BrowserArgs;

/// Settings shared by every command, resolved once from the config file.
pub struct CliContext {
    pub config: MigrationConfig,
    pub selectors: SelectorProfile,
    /// File the settings came from, if any.
    pub source: Option<PathBuf>,
}

impl CliContext {
    /// An explicit `--config` must exist and parse. The default location is
    /// optional and falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            let config = MigrationConfig::load_from(path)
                .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e))?;
            let selectors = SelectorProfile::load_from(path)?;
            return Ok(Self::new(config, selectors, Some(path.to_path_buf())));
        }

        let default_path = MigrationConfig::config_path().filter(|p| p.exists());
        let config = MigrationConfig::load();
        let selectors = match &default_path {
            Some(path) => SelectorProfile::load_from(path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring selectors in {}: {}", path.display(), e);
                SelectorProfile::default()
            }),
            None => SelectorProfile::default(),
        };
        Ok(Self::new(config, selectors, default_path))
    }

    fn new(config: MigrationConfig, selectors: SelectorProfile, source: Option<PathBuf>) -> Self {
        let selectors = selectors.with_locator(&config.locator);
        Self {
            config,
            selectors,
            source,
        }
    }
}

pub fn browser_target(args: &BrowserArgs) -> BrowserTarget {
    match &args.connect {
        Some(url) => BrowserTarget::Connect(url.clone()),
        None => BrowserTarget::Launch(LaunchOptions {
            headful: args.headful,
            executable: args.chrome.clone(),
            user_data_dir: args.profile_dir.clone(),
        }),
    }
}
