//! The capability registry: a concurrency-safe namespace of loaded skills.
//!
//! Reads (`get`, `contains`, `list*`) go straight to a `DashMap` and never
//! block on writers. Every check-then-mutate sequence (`register`,
//! `take`/`unregister`, `clear`) runs under one registry-wide async mutex, so
//! two concurrent registrations of the same identifier resolve
//! deterministically. `execute` is not serialized: skills may run
//! concurrently, and any locking they need around their own state is theirs.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use futures_util::FutureExt as _;
use serde_json::Value;
use skillforge_types::error::RegistryError;
use skillforge_types::skill::{
    METADATA_EXCEPTION, SkillActivation, SkillParams, SkillResult, SkillSummary,
};
use tokio::sync::Mutex;

use super::box_skill::BoxSkill;
use super::context::SkillContext;

/// Default description limit for [`CapabilityRegistry::list_summaries`].
pub const DEFAULT_SUMMARY_DESCRIPTION_LIMIT: usize = 200;

struct RegistryInner {
    skills: DashMap<String, Arc<BoxSkill>>,
    write_lock: Mutex<()>,
}

/// Shared handle to a registry instance.
///
/// Cloning produces another handle to the same namespace (backed by `Arc`).
/// Construct one at process start and hand clones to every collaborator.
#[derive(Clone)]
pub struct CapabilityRegistry {
    inner: Arc<RegistryInner>,
}

/// Non-owning handle, held by composites so the registry does not keep
/// itself alive through the skills it contains.
#[derive(Clone)]
pub struct WeakRegistry {
    inner: Weak<RegistryInner>,
}

impl WeakRegistry {
    pub fn upgrade(&self) -> Option<CapabilityRegistry> {
        self.inner.upgrade().map(|inner| CapabilityRegistry { inner })
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                skills: DashMap::new(),
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakRegistry {
        WeakRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Register `skill`, running its `on_load` hook.
    ///
    /// Existence, dependency, and validation checks plus the insertion happen
    /// inside one critical section; nothing is mutated if any check fails.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::AlreadyRegistered`] if the id is taken
    /// - [`RegistryError::MissingDependency`] listing every absent dependency
    /// - [`RegistryError::ValidationFailed`] if `validate` returns `false`
    /// - [`RegistryError::AlreadyLoaded`] / [`RegistryError::Hook`] from `on_load`
    pub async fn register(&self, skill: BoxSkill, ctx: &SkillContext) -> Result<(), RegistryError> {
        let id = skill.id().to_string();
        let _guard = self.inner.write_lock.lock().await;

        if self.inner.skills.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        let mut missing: Vec<String> = Vec::new();
        for dep in skill.metadata().dependencies() {
            if !self.inner.skills.contains_key(dep) && !missing.contains(dep) {
                missing.push(dep.clone());
            }
        }
        if !missing.is_empty() {
            return Err(RegistryError::MissingDependency { id, missing });
        }

        if !skill.validate(ctx).await {
            return Err(RegistryError::ValidationFailed(id));
        }

        skill.load(ctx).await?;
        tracing::info!(skill = %id, version = %skill.metadata().version(), "skill registered");
        self.inner.skills.insert(id, Arc::new(skill));
        Ok(())
    }

    /// Unregister `id`, returning `false` if it was not registered.
    ///
    /// # Errors
    ///
    /// [`RegistryError::HasDependents`] if other registered skills depend on
    /// it (the registry is left unchanged), or the errors of `on_unload`.
    pub async fn unregister(&self, id: &str, ctx: &SkillContext) -> Result<bool, RegistryError> {
        Ok(self.take(id, ctx).await?.is_some())
    }

    /// Unregister `id` and hand the unloaded skill back to the caller.
    ///
    /// The dependents check and the removal are one atomic conditional
    /// remove: when dependents exist the entry is never taken out, so readers
    /// never observe a transient absence.
    pub async fn take(
        &self,
        id: &str,
        ctx: &SkillContext,
    ) -> Result<Option<Arc<BoxSkill>>, RegistryError> {
        let _guard = self.inner.write_lock.lock().await;

        let Some(skill) = self.get(id) else {
            return Ok(None);
        };

        let dependents = self.dependents_of(id);
        if !dependents.is_empty() {
            return Err(RegistryError::HasDependents {
                id: id.to_string(),
                dependents,
            });
        }

        skill.unload(ctx).await?;
        self.inner.skills.remove(id);
        tracing::info!(skill = %id, "skill unregistered");
        Ok(Some(skill))
    }

    /// Unload and remove every skill, returning how many were removed.
    ///
    /// Bulk teardown: dependents are not re-checked, and a failing `on_unload`
    /// is logged without aborting the rest.
    pub async fn clear(&self, ctx: &SkillContext) -> usize {
        let _guard = self.inner.write_lock.lock().await;

        let ids = self.ids();
        let mut removed = 0;
        for id in ids {
            let Some((_, skill)) = self.inner.skills.remove(&id) else {
                continue;
            };
            removed += 1;
            if let Err(e) = skill.unload(ctx).await {
                tracing::warn!(skill = %id, error = %e, "failed to unload skill during clear");
            }
        }

        tracing::info!(count = removed, "registry cleared");
        removed
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Execute the skill registered under `id`.
    ///
    /// - `on_before_execute` returning `false` yields a failure result without
    ///   running `execute` or `on_after_execute`.
    /// - Errors and panics from `execute` become failure results carrying the
    ///   error text in `metadata["exception"]`.
    /// - `on_after_execute` always sees the produced result.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotRegistered`] for unknown ids, and
    /// [`RegistryError::Hook`] when the before/after hooks fail.
    pub async fn execute(
        &self,
        id: &str,
        ctx: &SkillContext,
        params: &SkillParams,
    ) -> Result<SkillResult, RegistryError> {
        // Clone the Arc out; never hold a DashMap guard across an await.
        let skill = self
            .get(id)
            .ok_or_else(|| RegistryError::NotRegistered(id.to_string()))?;

        tracing::debug!(skill = %id, session = %ctx.session_id(), "executing skill");

        if !skill.before_execute(ctx, params).await? {
            tracing::debug!(skill = %id, "execution vetoed by before-execute hook");
            return Ok(SkillResult::failure(format!(
                "execution of '{id}' was rejected by its before-execute hook"
            )));
        }

        let result = match AssertUnwindSafe(skill.execute(ctx, params))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                let detail = format!("{e:#}");
                tracing::warn!(skill = %id, error = %detail, "skill execution failed");
                exception_result(id, detail)
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                tracing::warn!(skill = %id, error = %detail, "skill execution panicked");
                exception_result(id, detail)
            }
        };

        skill.after_execute(ctx, params, &result).await?;
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<Arc<BoxSkill>> {
        self.inner.skills.get(id).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.skills.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.skills.is_empty()
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.skills.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Snapshot of all registered skills, sorted by id.
    pub fn list(&self) -> Vec<Arc<BoxSkill>> {
        let mut skills: Vec<_> = self
            .inner
            .skills
            .iter()
            .map(|r| Arc::clone(r.value()))
            .collect();
        skills.sort_by(|a, b| a.id().cmp(b.id()));
        skills
    }

    /// Registered skills whose dependency list includes `id`, sorted.
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        let mut dependents: Vec<String> = self
            .inner
            .skills
            .iter()
            .filter(|r| r.key() != id && r.value().metadata().depends_on(id))
            .map(|r| r.key().clone())
            .collect();
        dependents.sort();
        dependents
    }

    /// Prompt-sized projections of every skill, sorted by id.
    pub fn list_summaries(&self, max_description: usize) -> Vec<SkillSummary> {
        self.list()
            .iter()
            .map(|s| SkillSummary::from_metadata(s.metadata(), max_description))
            .collect()
    }

    /// Full activation payload for `id`, or `None` if it is not registered.
    ///
    /// Skills without a definition produce an empty body.
    pub fn activate(&self, id: &str) -> Option<SkillActivation> {
        let skill = self.get(id)?;
        let meta = skill.metadata();
        let (body, resource_dirs) = match skill.definition() {
            Some(def) => (def.body.clone(), def.resource_dirs.clone()),
            None => (String::new(), Vec::new()),
        };
        Some(SkillActivation {
            id: meta.id().to_string(),
            name: meta.name().to_string(),
            version: meta.version().to_string(),
            description: meta.description().to_string(),
            dependencies: meta.dependencies().to_vec(),
            body,
            resource_dirs,
        })
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("skills", &self.ids())
            .finish()
    }
}

pub(crate) fn exception_result(id: &str, detail: String) -> SkillResult {
    SkillResult::failure(format!("skill '{id}' raised an error: {detail}"))
        .with_metadata(METADATA_EXCEPTION, Value::String(detail))
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "skill panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
