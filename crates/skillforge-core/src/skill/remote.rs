//! Protocol-adapter skills: remote tools that look like ordinary skills.
//!
//! The registry never learns that a [`RemoteToolSkill`] performs a network
//! call; the transport is supplied by whatever client layer the host uses.

use std::future::Future;

use serde_json::{Map, Value};
use skillforge_types::skill::{SkillMetadata, SkillParams, SkillResult, ToolSpec};

use super::box_skill::BoxSkill;
use super::context::SkillContext;
use super::contract::Skill;

/// Minimal client surface needed to invoke a remote tool.
pub trait ToolTransport: Send + Sync + 'static {
    /// Invoke tool `name` with a JSON object of arguments.
    fn call_tool(
        &self,
        name: &str,
        args: Value,
    ) -> impl Future<Output = anyhow::Result<Value>> + Send;

    /// Whether the remote side is currently usable. Checked at registration.
    fn is_available(&self) -> impl Future<Output = bool> + Send {
        async { true }
    }
}

/// A skill that forwards `execute` to one remote tool.
pub struct RemoteToolSkill<T> {
    metadata: SkillMetadata,
    tool: ToolSpec,
    transport: T,
}

impl<T: ToolTransport> RemoteToolSkill<T> {
    pub fn new(metadata: SkillMetadata, tool: ToolSpec, transport: T) -> Self {
        Self {
            metadata,
            tool,
            transport,
        }
    }

    pub fn boxed(self) -> BoxSkill {
        BoxSkill::new(self)
    }
}

impl<T: ToolTransport> Skill for RemoteToolSkill<T> {
    fn metadata(&self) -> &SkillMetadata {
        &self.metadata
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![self.tool.clone()]
    }

    async fn validate(&self, _ctx: &SkillContext) -> bool {
        self.transport.is_available().await
    }

    async fn execute(
        &self,
        _ctx: &SkillContext,
        params: &SkillParams,
    ) -> anyhow::Result<SkillResult> {
        let args: Map<String, Value> = params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        tracing::debug!(skill = %self.metadata.id(), tool = %self.tool.name, "calling remote tool");
        let output = self
            .transport
            .call_tool(&self.tool.name, Value::Object(args))
            .await?;
        Ok(SkillResult::success(output).with_metadata("tool", self.tool.name.clone()))
    }
}
