//! BoxSkill -- object-safe dynamic dispatch wrapper for [`Skill`].
//!
//! Same blanket-impl pattern as the other boxed traits in this crate:
//! 1. Define an object-safe `SkillDyn` trait with boxed futures
//! 2. Blanket-impl `SkillDyn` for all `T: Skill`
//! 3. `BoxSkill` wraps `Box<dyn SkillDyn>` and delegates
//!
//! `BoxSkill` additionally owns the private loaded flag and enforces the
//! Unloaded -> Loaded -> Unloaded lifecycle.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use skillforge_types::error::{HookKind, RegistryError};
use skillforge_types::skill::{SkillDefinition, SkillMetadata, SkillParams, SkillResult, ToolSpec};
use tokio::sync::Mutex;

use super::context::SkillContext;
use super::contract::Skill;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`Skill`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch (`dyn SkillDyn`).
/// A blanket implementation is provided for all types implementing `Skill`.
pub trait SkillDyn: Send + Sync {
    fn metadata(&self) -> &SkillMetadata;

    fn tools(&self) -> Vec<ToolSpec>;

    fn definition(&self) -> Option<&SkillDefinition>;

    fn validate_boxed<'a>(&'a self, ctx: &'a SkillContext) -> BoxFuture<'a, bool>;

    fn on_load_boxed<'a>(&'a self, ctx: &'a SkillContext) -> BoxFuture<'a, anyhow::Result<()>>;

    fn on_unload_boxed<'a>(&'a self, ctx: &'a SkillContext)
    -> BoxFuture<'a, anyhow::Result<()>>;

    fn on_before_execute_boxed<'a>(
        &'a self,
        ctx: &'a SkillContext,
        params: &'a SkillParams,
    ) -> BoxFuture<'a, anyhow::Result<bool>>;

    fn execute_boxed<'a>(
        &'a self,
        ctx: &'a SkillContext,
        params: &'a SkillParams,
    ) -> BoxFuture<'a, anyhow::Result<SkillResult>>;

    fn on_after_execute_boxed<'a>(
        &'a self,
        ctx: &'a SkillContext,
        params: &'a SkillParams,
        result: &'a SkillResult,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Blanket implementation: any `Skill` automatically implements `SkillDyn`.
impl<T: Skill> SkillDyn for T {
    fn metadata(&self) -> &SkillMetadata {
        Skill::metadata(self)
    }

    fn tools(&self) -> Vec<ToolSpec> {
        Skill::tools(self)
    }

    fn definition(&self) -> Option<&SkillDefinition> {
        Skill::definition(self)
    }

    fn validate_boxed<'a>(&'a self, ctx: &'a SkillContext) -> BoxFuture<'a, bool> {
        Box::pin(self.validate(ctx))
    }

    fn on_load_boxed<'a>(&'a self, ctx: &'a SkillContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.on_load(ctx))
    }

    fn on_unload_boxed<'a>(
        &'a self,
        ctx: &'a SkillContext,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.on_unload(ctx))
    }

    fn on_before_execute_boxed<'a>(
        &'a self,
        ctx: &'a SkillContext,
        params: &'a SkillParams,
    ) -> BoxFuture<'a, anyhow::Result<bool>> {
        Box::pin(self.on_before_execute(ctx, params))
    }

    fn execute_boxed<'a>(
        &'a self,
        ctx: &'a SkillContext,
        params: &'a SkillParams,
    ) -> BoxFuture<'a, anyhow::Result<SkillResult>> {
        Box::pin(self.execute(ctx, params))
    }

    fn on_after_execute_boxed<'a>(
        &'a self,
        ctx: &'a SkillContext,
        params: &'a SkillParams,
        result: &'a SkillResult,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.on_after_execute(ctx, params, result))
    }
}

/// Type-erased skill as held by the registry.
///
/// Since `Skill` uses RPITIT, it cannot be used as a trait object directly.
/// `BoxSkill` provides equivalent methods that delegate to the inner
/// `SkillDyn` trait object, and tracks whether the skill is loaded.
pub struct BoxSkill {
    inner: Box<dyn SkillDyn>,
    loaded: AtomicBool,
    /// Serializes load/unload so a transition and its hook run as a unit.
    transition: Mutex<()>,
}

impl BoxSkill {
    /// Wrap a concrete `Skill` in a type-erased box, in the Unloaded state.
    pub fn new<T: Skill + 'static>(skill: T) -> Self {
        Self {
            inner: Box::new(skill),
            loaded: AtomicBool::new(false),
            transition: Mutex::new(()),
        }
    }

    pub fn metadata(&self) -> &SkillMetadata {
        self.inner.metadata()
    }

    pub fn id(&self) -> &str {
        self.inner.metadata().id()
    }

    pub fn tools(&self) -> Vec<ToolSpec> {
        self.inner.tools()
    }

    pub fn definition(&self) -> Option<&SkillDefinition> {
        self.inner.definition()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub async fn validate(&self, ctx: &SkillContext) -> bool {
        self.inner.validate_boxed(ctx).await
    }

    /// Unloaded -> Loaded. Runs the skill's `on_load` hook; the flag flips only
    /// if the hook succeeds.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyLoaded`] if already loaded, or
    /// [`RegistryError::Hook`] if the hook fails.
    pub async fn load(&self, ctx: &SkillContext) -> Result<(), RegistryError> {
        let _guard = self.transition.lock().await;
        if self.is_loaded() {
            return Err(RegistryError::AlreadyLoaded(self.id().to_string()));
        }
        self.inner
            .on_load_boxed(ctx)
            .await
            .map_err(|source| self.hook_error(HookKind::Load, source))?;
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    /// Loaded -> Unloaded. Runs the skill's `on_unload` hook; the flag flips
    /// only if the hook succeeds.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotLoaded`] if not loaded, or
    /// [`RegistryError::Hook`] if the hook fails.
    pub async fn unload(&self, ctx: &SkillContext) -> Result<(), RegistryError> {
        let _guard = self.transition.lock().await;
        if !self.is_loaded() {
            return Err(RegistryError::NotLoaded(self.id().to_string()));
        }
        self.inner
            .on_unload_boxed(ctx)
            .await
            .map_err(|source| self.hook_error(HookKind::Unload, source))?;
        self.loaded.store(false, Ordering::Release);
        Ok(())
    }

    pub async fn before_execute(
        &self,
        ctx: &SkillContext,
        params: &SkillParams,
    ) -> Result<bool, RegistryError> {
        self.inner
            .on_before_execute_boxed(ctx, params)
            .await
            .map_err(|source| self.hook_error(HookKind::BeforeExecute, source))
    }

    /// Run the skill body. Errors are returned as-is; converting them into
    /// failure results is the registry's job.
    pub async fn execute(
        &self,
        ctx: &SkillContext,
        params: &SkillParams,
    ) -> anyhow::Result<SkillResult> {
        self.inner.execute_boxed(ctx, params).await
    }

    pub async fn after_execute(
        &self,
        ctx: &SkillContext,
        params: &SkillParams,
        result: &SkillResult,
    ) -> Result<(), RegistryError> {
        self.inner
            .on_after_execute_boxed(ctx, params, result)
            .await
            .map_err(|source| self.hook_error(HookKind::AfterExecute, source))
    }

    fn hook_error(&self, hook: HookKind, source: anyhow::Error) -> RegistryError {
        RegistryError::Hook {
            id: self.id().to_string(),
            hook,
            source,
        }
    }
}

impl fmt::Debug for BoxSkill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxSkill")
            .field("id", &self.id())
            .field("version", &self.metadata().version().to_string())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
