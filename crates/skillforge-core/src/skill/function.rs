//! Programmatic skills backed by an async closure.

use std::future::Future;

use skillforge_types::skill::{SkillMetadata, SkillParams, SkillResult, ToolSpec};

use super::box_skill::BoxSkill;
use super::context::SkillContext;
use super::contract::Skill;

/// A skill whose `execute` is an async closure.
///
/// The closure receives owned copies of the context (a cheap handle clone)
/// and the parameters, so its future can be `'static`.
pub struct FnSkill<F> {
    metadata: SkillMetadata,
    tools: Vec<ToolSpec>,
    handler: F,
}

impl<F, Fut> FnSkill<F>
where
    F: Fn(SkillContext, SkillParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<SkillResult>> + Send + 'static,
{
    pub fn new(metadata: SkillMetadata, handler: F) -> Self {
        Self {
            metadata,
            tools: Vec::new(),
            handler,
        }
    }

    /// Advertise a tool for this skill.
    pub fn with_tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn boxed(self) -> BoxSkill {
        BoxSkill::new(self)
    }
}

impl<F, Fut> Skill for FnSkill<F>
where
    F: Fn(SkillContext, SkillParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<SkillResult>> + Send + 'static,
{
    fn metadata(&self) -> &SkillMetadata {
        &self.metadata
    }

    fn tools(&self) -> Vec<ToolSpec> {
        self.tools.clone()
    }

    fn execute(
        &self,
        ctx: &SkillContext,
        params: &SkillParams,
    ) -> impl Future<Output = anyhow::Result<SkillResult>> + Send {
        (self.handler)(ctx.clone(), params.clone())
    }
}
