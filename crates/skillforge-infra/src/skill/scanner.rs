//! Filesystem skill discovery.
//!
//! Scans a skills directory where each skill occupies a subdirectory named
//! after its identifier:
//!
//! ```text
//! {root}/{skill-id}/
//!   SKILL.md
//!   scripts/       (optional)
//!   references/    (optional)
//!   assets/        (optional)
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use skillforge_core::skill::BoxSkill;
use skillforge_core::skill::definition::{DefinitionSkill, parse_definition};
use skillforge_types::skill::{RESOURCE_DIR_NAMES, SkillDefinition};

/// Definition file expected in every skill directory.
pub const SKILL_FILE: &str = "SKILL.md";

/// Result of scanning a skills directory.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Valid definitions, sorted by directory name.
    pub definitions: Vec<SkillDefinition>,
    /// `(directory name, reason)` for every skill directory that was skipped.
    pub skipped: Vec<(String, String)>,
}

impl ScanReport {
    /// Wrap every definition as a registrable skill.
    pub fn into_skills(self) -> Vec<BoxSkill> {
        self.definitions
            .into_iter()
            .map(|def| DefinitionSkill::new(def).boxed())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SkillScanner {
    root: PathBuf,
}

impl SkillScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the directory of skill `id`.
    pub fn skill_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Scan every subdirectory containing a `SKILL.md`.
    ///
    /// Invalid definitions are skipped with a warning rather than failing the
    /// scan. A missing root yields an empty report.
    pub fn scan(&self) -> anyhow::Result<ScanReport> {
        let mut report = ScanReport::default();
        if !self.root.exists() {
            tracing::debug!(root = %self.root.display(), "skills directory does not exist");
            return Ok(report);
        }

        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read skills directory: {}", self.root.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_dir() || !path.join(SKILL_FILE).exists() {
                continue;
            }
            match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => names.push(name.to_string()),
                None => tracing::warn!(path = %path.display(), "Skipping skill with non UTF-8 name"),
            }
        }
        names.sort();

        for name in names {
            match self.load_definition(&name) {
                Ok(def) => report.definitions.push(def),
                Err(e) => {
                    let reason = format!("{e:#}");
                    tracing::warn!(skill = %name, error = %reason, "Skipping invalid skill");
                    report.skipped.push((name, reason));
                }
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            found = report.definitions.len(),
            skipped = report.skipped.len(),
            "skills directory scanned"
        );
        Ok(report)
    }

    /// Read and validate the definition in `{root}/{id}/SKILL.md`.
    pub fn load_definition(&self, id: &str) -> anyhow::Result<SkillDefinition> {
        let skill_dir = self.skill_dir(id);
        let skill_md_path = skill_dir.join(SKILL_FILE);

        if !skill_md_path.exists() {
            bail!("Skill '{}' not found at {}", id, skill_dir.display());
        }

        let content = std::fs::read_to_string(&skill_md_path)
            .with_context(|| format!("Failed to read {}", skill_md_path.display()))?;

        let mut def = parse_definition(id, &content, Some(skill_dir.clone()))
            .with_context(|| format!("Invalid {}", skill_md_path.display()))?;
        def.resource_dirs = RESOURCE_DIR_NAMES
            .iter()
            .map(|name| skill_dir.join(name))
            .filter(|path| path.is_dir())
            .collect();
        Ok(def)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
