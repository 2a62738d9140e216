//! The skill contract.
//!
//! Defines the [`Skill`] trait that every unit of behavior implements:
//! definition-backed skills, programmatic skills, protocol adapters, and the
//! composites built by the composer. The registry only ever sees a skill
//! through this trait (type-erased as a [`BoxSkill`](super::box_skill::BoxSkill)).
//!
//! Hooks return `anyhow::Result`; the registry decides which errors are
//! surfaced to the caller and which become failure results.

use std::future::Future;

use skillforge_types::skill::{SkillDefinition, SkillMetadata, SkillParams, SkillResult, ToolSpec};

use super::context::SkillContext;

/// A named, versioned unit of behavior with a single `execute` entry point.
///
/// Uses RPITIT for async methods. The lifecycle hooks default to no-ops; the
/// loaded/unloaded state machine is enforced by `BoxSkill`, not by
/// implementors.
pub trait Skill: Send + Sync {
    fn metadata(&self) -> &SkillMetadata;

    /// Tools this skill exposes to an agent's dispatcher.
    fn tools(&self) -> Vec<ToolSpec> {
        Vec::new()
    }

    /// The definition payload, for definition-backed skills.
    fn definition(&self) -> Option<&SkillDefinition> {
        None
    }

    /// Pre-registration check. Returning `false` rejects the registration.
    fn validate(&self, _ctx: &SkillContext) -> impl Future<Output = bool> + Send {
        async { true }
    }

    fn on_load(&self, _ctx: &SkillContext) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }

    fn on_unload(&self, _ctx: &SkillContext) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }

    /// Gate run before every execution. Returning `false` skips `execute`
    /// and `on_after_execute`.
    fn on_before_execute(
        &self,
        _ctx: &SkillContext,
        _params: &SkillParams,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send {
        async { Ok(true) }
    }

    fn execute(
        &self,
        ctx: &SkillContext,
        params: &SkillParams,
    ) -> impl Future<Output = anyhow::Result<SkillResult>> + Send;

    /// Observer run after every execution that passed the before-hook,
    /// with whatever result was produced.
    fn on_after_execute(
        &self,
        _ctx: &SkillContext,
        _params: &SkillParams,
        _result: &SkillResult,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }
}
