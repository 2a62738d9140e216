//! Skill composition: derived skills that orchestrate registered skills.
//!
//! A composite declares its components as dependencies, so the registry's
//! own dependency checks guarantee the components exist when the composite
//! is registered and keep them from being unregistered underneath it.
//!
//! - Sequential composites run components in order and stop at the first
//!   failure.
//! - Parallel composites spawn one task per component, wait for all of them,
//!   and accumulate failures instead of cancelling siblings. A panic in one
//!   component's task becomes that component's failure result.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use skillforge_types::error::ComposerError;
use skillforge_types::skill::{METADATA_FAILURES, SkillMetadata, SkillParams, SkillResult};
use tokio::task::{self, JoinSet};

use super::box_skill::BoxSkill;
use super::context::SkillContext;
use super::contract::Skill;
use super::registry::{CapabilityRegistry, WeakRegistry, exception_result, panic_message};

/// Metadata key naming the component that stopped a sequential composite.
pub const METADATA_FAILED_COMPONENT: &str = "failed_component";

/// Tag attached to every composite's metadata.
pub const COMPOSITE_TAG: &str = "composite";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionMode {
    Sequential,
    Parallel,
}

impl std::fmt::Display for CompositionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}

/// A skill whose `execute` delegates to other registered skills.
///
/// Holds a weak handle so that a registered composite does not keep its own
/// registry alive.
pub struct CompositeSkill {
    metadata: SkillMetadata,
    mode: CompositionMode,
    registry: WeakRegistry,
}

impl CompositeSkill {
    pub fn mode(&self) -> CompositionMode {
        self.mode
    }

    /// Component ids, in execution order.
    pub fn components(&self) -> &[String] {
        self.metadata.dependencies()
    }

    async fn run_sequential(
        &self,
        registry: &CapabilityRegistry,
        ctx: &SkillContext,
        params: &SkillParams,
    ) -> anyhow::Result<SkillResult> {
        let mut results: Vec<Value> = Vec::with_capacity(self.components().len());

        for component in self.components() {
            let result = run_component(registry, component, ctx, params).await;
            let succeeded = result.is_success();
            let reason = result.message().unwrap_or("no message").to_string();
            results.push(serde_json::to_value(&result)?);

            if !succeeded {
                tracing::debug!(
                    composite = %self.metadata.id(),
                    component = %component,
                    "sequential composite stopped at failing component"
                );
                return Ok(SkillResult::failure(format!(
                    "component '{component}' of '{}' failed: {reason}",
                    self.metadata.id()
                ))
                .with_data(Value::Array(results))
                .with_metadata(METADATA_FAILED_COMPONENT, component.clone()));
            }
        }

        Ok(SkillResult::success(Value::Array(results)))
    }

    async fn run_parallel(
        &self,
        registry: &CapabilityRegistry,
        ctx: &SkillContext,
        params: &SkillParams,
    ) -> anyhow::Result<SkillResult> {
        let components = self.components();
        let mut set: JoinSet<SkillResult> = JoinSet::new();
        let mut slot_of: HashMap<task::Id, usize> = HashMap::with_capacity(components.len());

        // One task per component so blocking or panicking components cannot
        // stall or take down their siblings.
        for (slot, component) in components.iter().enumerate() {
            let registry = registry.clone();
            let ctx = ctx.clone();
            let params = params.clone();
            let component = component.clone();
            let handle = set.spawn(async move {
                run_component(&registry, &component, &ctx, &params).await
            });
            slot_of.insert(handle.id(), slot);
        }

        let mut slots: Vec<Option<SkillResult>> = components.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next_with_id().await {
            let (task_id, result) = match joined {
                Ok(done) => done,
                Err(join_error) => {
                    let task_id = join_error.id();
                    let component = slot_of
                        .get(&task_id)
                        .map_or("unknown", |slot| components[*slot].as_str());
                    let detail = if join_error.is_panic() {
                        panic_message(join_error.into_panic().as_ref())
                    } else {
                        join_error.to_string()
                    };
                    tracing::warn!(
                        composite = %self.metadata.id(),
                        component = %component,
                        error = %detail,
                        "parallel component task failed"
                    );
                    (task_id, exception_result(component, detail))
                }
            };
            if let Some(&slot) = slot_of.get(&task_id) {
                slots[slot] = Some(result);
            }
        }

        let outcomes: Vec<SkillResult> = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| SkillResult::failure("component task produced no result"))
            })
            .collect();

        let total = outcomes.len();
        let mut data = Map::with_capacity(total);
        let mut failures = Vec::new();
        for (component, result) in self.components().iter().zip(outcomes) {
            if !result.is_success() {
                failures.push(Value::String(component.clone()));
            }
            data.insert(component.clone(), serde_json::to_value(&result)?);
        }

        if failures.is_empty() {
            return Ok(SkillResult::success(Value::Object(data)));
        }

        Ok(
            SkillResult::failure(format!("{} of {total} components failed", failures.len()))
                .with_data(Value::Object(data))
                .with_metadata(METADATA_FAILURES, Value::Array(failures)),
        )
    }
}

impl Skill for CompositeSkill {
    fn metadata(&self) -> &SkillMetadata {
        &self.metadata
    }

    async fn execute(
        &self,
        ctx: &SkillContext,
        params: &SkillParams,
    ) -> anyhow::Result<SkillResult> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("registry backing '{}' was dropped", self.metadata.id()))?;

        match self.mode {
            CompositionMode::Sequential => self.run_sequential(&registry, ctx, params).await,
            CompositionMode::Parallel => self.run_parallel(&registry, ctx, params).await,
        }
    }
}

/// Run one component through the registry. Registry errors (unknown id,
/// failing hooks) count as a failed component rather than aborting the
/// composite.
async fn run_component(
    registry: &CapabilityRegistry,
    component: &str,
    ctx: &SkillContext,
    params: &SkillParams,
) -> SkillResult {
    match registry.execute(component, ctx, params).await {
        Ok(result) => result,
        Err(e) => SkillResult::failure(e.to_string()),
    }
}

/// Builds composite skills over a registry.
#[derive(Debug, Clone)]
pub struct CapabilityComposer {
    registry: CapabilityRegistry,
}

impl CapabilityComposer {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self { registry }
    }

    /// Build (but do not register) a fail-fast sequential composite.
    ///
    /// # Errors
    ///
    /// [`ComposerError::EmptyComposite`] for an empty component list, or
    /// [`ComposerError::Metadata`] if an id is malformed.
    pub fn compose_sequential<I, S>(&self, id: &str, components: I) -> Result<BoxSkill, ComposerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compose(id, components, CompositionMode::Sequential)
    }

    /// Build (but do not register) a fail-accumulating parallel composite.
    ///
    /// # Errors
    ///
    /// As [`compose_sequential`](Self::compose_sequential), plus
    /// [`ComposerError::DuplicateComponent`]: results are keyed by component
    /// id, so each may appear only once.
    pub fn compose_parallel<I, S>(&self, id: &str, components: I) -> Result<BoxSkill, ComposerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compose(id, components, CompositionMode::Parallel)
    }

    /// Build a sequential composite and register it.
    pub async fn sequential<I, S>(
        &self,
        id: &str,
        components: I,
        ctx: &SkillContext,
    ) -> Result<(), ComposerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let skill = self.compose_sequential(id, components)?;
        self.registry.register(skill, ctx).await?;
        Ok(())
    }

    /// Build a parallel composite and register it.
    pub async fn parallel<I, S>(
        &self,
        id: &str,
        components: I,
        ctx: &SkillContext,
    ) -> Result<(), ComposerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let skill = self.compose_parallel(id, components)?;
        self.registry.register(skill, ctx).await?;
        Ok(())
    }

    fn compose<I, S>(
        &self,
        id: &str,
        components: I,
        mode: CompositionMode,
    ) -> Result<BoxSkill, ComposerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components: Vec<String> = components.into_iter().map(Into::into).collect();
        if components.is_empty() {
            return Err(ComposerError::EmptyComposite(id.to_string()));
        }
        if mode == CompositionMode::Parallel {
            let mut seen = HashSet::new();
            if let Some(dup) = components.iter().find(|c| !seen.insert(c.as_str())) {
                return Err(ComposerError::DuplicateComponent {
                    id: id.to_string(),
                    component: dup.clone(),
                });
            }
        }

        let metadata = SkillMetadata::builder(id)
            .description(format!("{mode} composite of {}", components.join(", ")))
            .tag(COMPOSITE_TAG)
            .tag(mode.to_string())
            .dependencies(components)
            .build()?;

        Ok(BoxSkill::new(CompositeSkill {
            metadata,
            mode,
            registry: self.registry.downgrade(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
