use std::path::Path;

use boardmove_chrome::SelectorProfile;
use boardmove_core::{MigrationConfig, MigrationError};
use serde::Serialize;

use crate::cli::ConfigAction;
use crate::context::CliContext;
use crate::output::output_success;

/// Everything a config file can hold, in file order.
#[derive(Serialize)]
struct ConfigFile<'a> {
    #[serde(flatten)]
    migration: &'a MigrationConfig,
    selectors: &'a SelectorProfile,
}

#[derive(Serialize)]
struct PathOutput {
    path: Option<String>,
    exists: bool,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    source: Option<String>,
    #[serde(flatten)]
    config: ConfigFile<'a>,
}

/// `explicit` is the `--config` path. `init` writes there when given, so the
/// file need not exist yet.
pub async fn handle(explicit: Option<&Path>, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let ctx = CliContext::load(explicit)?;
            output_success(ShowOutput {
                source: ctx.source.as_ref().map(|p| p.display().to_string()),
                config: ConfigFile {
                    migration: &ctx.config,
                    selectors: &ctx.selectors,
                },
            });
        }
        ConfigAction::Path => {
            let path = explicit
                .map(Path::to_path_buf)
                .or_else(MigrationConfig::config_path);
            output_success(PathOutput {
                exists: path.as_ref().is_some_and(|p| p.exists()),
                path: path.map(|p| p.display().to_string()),
            });
        }
        ConfigAction::Init { force } => {
            let path = explicit
                .map(Path::to_path_buf)
                .or_else(MigrationConfig::config_path)
                .ok_or_else(|| anyhow::anyhow!("no config directory on this platform"))?;
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }

            let defaults = MigrationConfig::default();
            let selectors = SelectorProfile::default();
            let content = toml::to_string_pretty(&ConfigFile {
                migration: &defaults,
                selectors: &selectors,
            })
            .map_err(|e| MigrationError::Config(e.to_string()))?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content)?;
            tracing::info!("Wrote default config to {}", path.display());

            output_success(PathOutput {
                path: Some(path.display().to_string()),
                exists: true,
            });
        }
    }
    Ok(())
}
