//! Application state wiring the registry and its collaborators together.
//!
//! AppState resolves the data directory and configuration, then holds one
//! registry for the lifetime of the process along with the loader, composer
//! and scanner built on top of it.

use std::collections::HashMap;
use std::path::PathBuf;

use skillforge_core::skill::{
    CapabilityComposer, CapabilityLoader, CapabilityRegistry, LoadOutcome, SkillContext,
};
use skillforge_infra::config::{load_global_config, resolve_data_dir, resolve_skills_dir, skill_context};
use skillforge_infra::skill::SkillScanner;
use skillforge_types::config::GlobalConfig;

/// Outcome of loading the skills directory into the registry.
#[derive(Debug, Default)]
pub struct LoadSummary {
    /// Per-skill load outcome for every valid definition found.
    pub outcomes: HashMap<String, LoadOutcome>,
    /// `(directory, reason)` for definitions that failed to parse.
    pub skipped: Vec<(String, String)>,
}

impl LoadSummary {
    pub fn loaded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.loaded() + self.skipped.len()
    }
}

pub struct AppState {
    pub data_dir: PathBuf,
    pub config: GlobalConfig,
    pub scanner: SkillScanner,
    pub registry: CapabilityRegistry,
    pub loader: CapabilityLoader,
    pub composer: CapabilityComposer,
    pub ctx: SkillContext,
}

impl AppState {
    /// Resolve the data dir, read `config.toml`, and build an empty registry.
    ///
    /// `skills_dir` overrides the configured skills directory. A missing or
    /// malformed `config.toml` falls back to defaults.
    pub async fn init(skills_dir: Option<PathBuf>) -> Self {
        let data_dir = resolve_data_dir();
        let config = load_global_config(&data_dir).await;
        Self::from_parts(data_dir, config, skills_dir)
    }

    pub fn from_parts(data_dir: PathBuf, config: GlobalConfig, skills_dir: Option<PathBuf>) -> Self {
        let skills_dir = skills_dir.unwrap_or_else(|| resolve_skills_dir(&config, &data_dir));
        let registry = CapabilityRegistry::new();
        let ctx = skill_context(&config);
        tracing::debug!(
            data_dir = %data_dir.display(),
            skills_dir = %skills_dir.display(),
            session = %ctx.session_id(),
            "application state initialized"
        );

        Self {
            data_dir,
            scanner: SkillScanner::new(skills_dir),
            loader: CapabilityLoader::new(registry.clone()),
            composer: CapabilityComposer::new(registry.clone()),
            registry,
            ctx,
            config,
        }
    }

    /// Scan the skills directory and load everything found, in dependency order.
    pub async fn load_skills(&self) -> anyhow::Result<LoadSummary> {
        let report = self.scanner.scan()?;
        let skipped = report.skipped.clone();
        let outcomes = self
            .loader
            .load_all_detailed(report.into_skills(), &self.ctx)
            .await;
        Ok(LoadSummary { outcomes, skipped })
    }
}
