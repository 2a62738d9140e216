//! Hot reload: watch the skills directory for changed skill definitions.
//!
//! Provides:
//! - `start_skill_watcher()` -- Starts a debounced watcher over the skills root
//! - `WatcherHandle` -- RAII handle that keeps the watcher alive
//! - `changed_skill_names()` -- Maps raw event paths to skill directory names

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

// notify types come through the debouncer's re-export so the versions match.
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::mpsc;

/// Errors that can occur while starting the skill watcher.
#[derive(Debug, thiserror::Error)]
pub enum SkillWatchError {
    #[error("watcher creation failed: {0}")]
    WatcherCreation(String),

    #[error("failed to watch path '{path}': {reason}")]
    WatchPath { path: String, reason: String },
}

/// RAII handle that keeps the skills watcher alive.
///
/// When dropped, the watcher is stopped and the receiver eventually closes.
pub struct WatcherHandle {
    _debouncer: Debouncer<RecommendedWatcher>,
    root: PathBuf,
}

impl WatcherHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        tracing::debug!(root = %self.root.display(), "skill watcher dropped");
    }
}

/// Skill directory names touched by `paths`, relative to `root`.
///
/// Only the first path component below `root` counts; events on the root
/// itself or outside it are ignored. Hidden entries (editor swap files,
/// `.git`) are skipped.
pub fn changed_skill_names<'a, I>(root: &Path, paths: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a Path>,
{
    paths
        .into_iter()
        .filter_map(|path| path.strip_prefix(root).ok())
        .filter_map(|relative| match relative.components().next() {
            Some(Component::Normal(name)) => name.to_str(),
            _ => None,
        })
        .filter(|name| !name.starts_with('.'))
        .map(str::to_string)
        .collect()
}

/// Start watching `root` recursively.
///
/// Each debounced batch of filesystem events is reduced to the set of skill
/// directory names it touched and sent on the returned channel. The caller
/// decides what to do with each name (re-parse and reload, or unload when
/// the directory is gone).
///
/// # Errors
///
/// Returns [`SkillWatchError`] if the watcher cannot be created or `root`
/// cannot be watched (for example, it does not exist).
pub fn start_skill_watcher(
    root: &Path,
    debounce: Duration,
) -> Result<(WatcherHandle, mpsc::Receiver<BTreeSet<String>>), SkillWatchError> {
    let (tx, rx) = mpsc::channel::<BTreeSet<String>>(64);

    // Some platforms report canonical paths; match against both forms.
    let root_buf = root.to_path_buf();
    let canonical = std::fs::canonicalize(root).unwrap_or_else(|_| root_buf.clone());
    let roots = [root_buf.clone(), canonical];

    let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| match result {
        Ok(events) => {
            let mut names = BTreeSet::new();
            for root in &roots {
                names.extend(changed_skill_names(root, events.iter().map(|e| e.path.as_path())));
            }
            if names.is_empty() {
                return;
            }

            tracing::debug!(count = names.len(), skills = ?names, "skill changes detected");
            // Non-blocking send; a full channel means a reload pass is
            // already pending.
            let _ = tx.try_send(names);
        }
        Err(err) => {
            tracing::warn!(error = %err, "skill watcher error");
        }
    })
    .map_err(|e| SkillWatchError::WatcherCreation(e.to_string()))?;

    debouncer
        .watcher()
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| SkillWatchError::WatchPath {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;

    tracing::info!(root = %root.display(), ?debounce, "skill watcher started");

    Ok((
        WatcherHandle {
            _debouncer: debouncer,
            root: root_buf,
        },
        rx,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_names_take_first_component() {
        let root = Path::new("/data/skills");
        let paths = [
            PathBuf::from("/data/skills/alpha/SKILL.md"),
            PathBuf::from("/data/skills/alpha/scripts/run.sh"),
            PathBuf::from("/data/skills/beta"),
            PathBuf::from("/data/skills/.alpha.swp"),
            PathBuf::from("/data/skills"),
            PathBuf::from("/elsewhere/gamma/SKILL.md"),
        ];

        let names = changed_skill_names(root, paths.iter().map(PathBuf::as_path));
        assert_eq!(names.into_iter().collect::<Vec<_>>(), ["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_start_skill_watcher_on_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, mut rx) =
            start_skill_watcher(dir.path(), Duration::from_millis(100)).unwrap();
        assert_eq!(handle.root(), dir.path());

        let skill_dir = dir.path().join("fresh");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), "---\nname: fresh\n---\n").unwrap();

        match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Some(names)) => assert!(names.contains("fresh")),
            Ok(None) => {}
            Err(_) => {
                // File events are unreliable in some sandboxed environments.
                tracing::warn!("skill watcher test timed out (platform-dependent)");
            }
        }

        drop(handle);
    }

    #[test]
    fn test_start_skill_watcher_nonexistent_path() {
        let result = start_skill_watcher(
            Path::new("/nonexistent/path/that/does/not/exist"),
            Duration::from_millis(100),
        );
        assert!(result.is_err());
    }
}
