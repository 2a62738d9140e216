//! Filesystem skill collaborators: directory scanning and hot reload.

pub mod scanner;
pub mod watcher;

pub use scanner::{ScanReport, SkillScanner};
pub use watcher::{WatcherHandle, start_skill_watcher};
