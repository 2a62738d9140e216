//! Global configuration loader for skillforge.
//!
//! Reads `config.toml` from the data directory (`~/.skillforge/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::{Path, PathBuf};

use skillforge_core::skill::SkillContext;
use skillforge_types::config::GlobalConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SKILLFORGE_DATA_DIR";

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `SKILLFORGE_DATA_DIR` environment variable
/// 2. `~/.skillforge`
/// 3. `./.skillforge`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".skillforge");
    }

    PathBuf::from(".skillforge")
}

/// Directory scanned for skill definitions: the configured one, or
/// `{data_dir}/skills`. Relative configured paths are taken relative to
/// `data_dir`.
pub fn resolve_skills_dir(config: &GlobalConfig, data_dir: &Path) -> PathBuf {
    match &config.skills_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => data_dir.join(dir),
        None => data_dir.join("skills"),
    }
}

/// Build the context handed to skills from the `[context]` table.
pub fn skill_context(config: &GlobalConfig) -> SkillContext {
    SkillContext::builder(config.session_id.clone())
        .configs(config.context.clone())
        .build()
}
