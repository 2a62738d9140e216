//! Global configuration types for skillforge.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls where
//! skills are discovered, how discovery summaries are sized, and the
//! configuration mapping handed to every skill through its context.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level configuration for skillforge.
///
/// Loaded from `~/.skillforge/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Directory scanned for skill definitions. Defaults to `{data_dir}/skills`.
    #[serde(default)]
    pub skills_dir: Option<PathBuf>,

    /// Maximum description length in discovery summaries.
    #[serde(default = "default_summary_description_limit")]
    pub summary_description_limit: usize,

    /// Session identifier used when the caller does not provide one.
    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// Immutable configuration mapping exposed to skills via their context.
    #[serde(default)]
    pub context: HashMap<String, Value>,

    #[serde(default)]
    pub watch: WatchConfig,
}

fn default_summary_description_limit() -> usize {
    200
}

fn default_session_id() -> String {
    "default".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            skills_dir: None,
            summary_description_limit: default_summary_description_limit(),
            session_id: default_session_id(),
            context: HashMap::new(),
            watch: WatchConfig::default(),
        }
    }
}

/// Hot-reload watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window for filesystem events in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.summary_description_limit, 200);
        assert_eq!(config.session_id, "default");
        assert!(config.skills_dir.is_none());
        assert!(config.context.is_empty());
        assert_eq!(config.watch.debounce_ms, 500);
    }

    #[test]
    fn test_global_config_deserialize_with_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.summary_description_limit, 200);
        assert_eq!(config.watch.debounce_ms, 500);
    }

    #[test]
    fn test_global_config_deserialize_with_values() {
        let toml_str = r#"
skills_dir = "/opt/skills"
summary_description_limit = 80
session_id = "nightly"

[context]
region = "eu-west-1"
retries = 3
dry_run = true

[watch]
debounce_ms = 250
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.skills_dir, Some(PathBuf::from("/opt/skills")));
        assert_eq!(config.summary_description_limit, 80);
        assert_eq!(config.session_id, "nightly");
        assert_eq!(config.context["region"], Value::from("eu-west-1"));
        assert_eq!(config.context["retries"], Value::from(3));
        assert_eq!(config.context["dry_run"], Value::from(true));
        assert_eq!(config.watch.debounce_ms, 250);
    }
}
