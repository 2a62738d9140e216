//! Infrastructure layer for skillforge.
//!
//! Filesystem-facing collaborators of `skillforge-core`: the `config.toml`
//! loader and data-dir resolution, the skill directory scanner that turns
//! `SKILL.md` files into registrable skills, and the debounced hot-reload
//! watcher.

pub mod config;
pub mod skill;
