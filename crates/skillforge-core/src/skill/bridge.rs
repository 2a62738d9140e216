//! Projection of the registry into a generic tool-call dispatcher.
//!
//! Agent-facing layers see three `domain.method` tools and call them with a
//! JSON argument object; they never touch the registry directly.

use anyhow::Context as _;
use serde::Deserialize;
use serde_json::{Value, json};
use skillforge_types::skill::{SkillParams, ToolSpec};

use super::context::SkillContext;
use super::registry::{CapabilityRegistry, DEFAULT_SUMMARY_DESCRIPTION_LIMIT};

pub const RUN_SIGNATURE: &str = "skills.run";
pub const LIST_SIGNATURE: &str = "skills.list";
pub const ACTIVATE_SIGNATURE: &str = "skills.activate";

#[derive(Debug, Deserialize)]
struct RunArgs {
    id: String,
    #[serde(default)]
    params: SkillParams,
}

#[derive(Debug, Deserialize)]
struct ActivateArgs {
    id: String,
}

/// Exposes run/list/activate over a registry as callable tools.
#[derive(Debug, Clone)]
pub struct SkillToolBridge {
    registry: CapabilityRegistry,
    summary_limit: usize,
}

impl SkillToolBridge {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry,
            summary_limit: DEFAULT_SUMMARY_DESCRIPTION_LIMIT,
        }
    }

    /// Maximum description length in `skills.list` output.
    pub fn with_summary_limit(mut self, limit: usize) -> Self {
        self.summary_limit = limit;
        self
    }

    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: RUN_SIGNATURE.to_string(),
                description: "Run a registered skill by id with a parameter object".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "params": { "type": "object" }
                    },
                    "required": ["id"]
                }),
            },
            ToolSpec {
                name: LIST_SIGNATURE.to_string(),
                description: "List registered skills with short descriptions".to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
            ToolSpec {
                name: ACTIVATE_SIGNATURE.to_string(),
                description: "Load the full instructions of a skill by id".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": { "id": { "type": "string" } },
                    "required": ["id"]
                }),
            },
        ]
    }

    /// Handle one tool call.
    ///
    /// A failed skill run is not an error here: the serialized result with
    /// `success: false` is returned. Errors are reserved for unknown
    /// signatures, malformed arguments, and registry-level failures.
    pub async fn dispatch(
        &self,
        signature: &str,
        args: Value,
        ctx: &SkillContext,
    ) -> anyhow::Result<Value> {
        match signature {
            RUN_SIGNATURE => {
                let args: RunArgs = serde_json::from_value(args)
                    .with_context(|| format!("invalid arguments for {RUN_SIGNATURE}"))?;
                let result = self.registry.execute(&args.id, ctx, &args.params).await?;
                Ok(serde_json::to_value(result)?)
            }
            LIST_SIGNATURE => Ok(serde_json::to_value(
                self.registry.list_summaries(self.summary_limit),
            )?),
            ACTIVATE_SIGNATURE => {
                let args: ActivateArgs = serde_json::from_value(args)
                    .with_context(|| format!("invalid arguments for {ACTIVATE_SIGNATURE}"))?;
                let activation = self
                    .registry
                    .activate(&args.id)
                    .with_context(|| format!("skill '{}' is not registered", args.id))?;
                Ok(serde_json::to_value(activation)?)
            }
            other => anyhow::bail!("unknown tool signature '{other}'"),
        }
    }
}
