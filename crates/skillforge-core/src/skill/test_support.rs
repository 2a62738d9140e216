//! Counting test double shared by the skill module tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use skillforge_types::skill::{SkillMetadata, SkillParams, SkillResult};

use super::box_skill::BoxSkill;
use super::context::SkillContext;
use super::contract::Skill;

#[derive(Debug, Default)]
pub struct Counters {
    pub loads: AtomicUsize,
    pub unloads: AtomicUsize,
    pub befores: AtomicUsize,
    pub executes: AtomicUsize,
    pub afters: AtomicUsize,
}

impl Counters {
    pub fn executes(&self) -> usize {
        self.executes.load(Ordering::SeqCst)
    }

    pub fn afters(&self) -> usize {
        self.afters.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeed,
    LogicalFailure,
    Error,
    Panic,
}

pub struct TestSkill {
    metadata: SkillMetadata,
    counters: Arc<Counters>,
    outcome: Outcome,
    valid: bool,
    veto: bool,
    fail_load: bool,
    fail_unload: bool,
    fail_after: bool,
    panic_after: bool,
    delay: Option<Duration>,
    block: Option<Duration>,
}

impl TestSkill {
    pub fn new(id: &str) -> Self {
        Self::with_deps(id, &[])
    }

    pub fn with_deps(id: &str, deps: &[&str]) -> Self {
        Self {
            metadata: SkillMetadata::builder(id)
                .description(format!("test skill {id}"))
                .dependencies(deps.iter().copied())
                .build()
                .unwrap(),
            counters: Arc::new(Counters::default()),
            outcome: Outcome::Succeed,
            valid: true,
            veto: false,
            fail_load: false,
            fail_unload: false,
            fail_after: false,
            panic_after: false,
            delay: None,
            block: None,
        }
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    pub fn vetoing(mut self) -> Self {
        self.veto = true;
        self
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn failing_unload(mut self) -> Self {
        self.fail_unload = true;
        self
    }

    pub fn failing_after(mut self) -> Self {
        self.fail_after = true;
        self
    }

    pub fn panicking_after(mut self) -> Self {
        self.panic_after = true;
        self
    }

    /// Hold the worker thread with `std::thread::sleep` inside `execute`.
    pub fn blocking(mut self, block: Duration) -> Self {
        self.block = Some(block);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }

    pub fn boxed(self) -> BoxSkill {
        BoxSkill::new(self)
    }
}

impl Skill for TestSkill {
    fn metadata(&self) -> &SkillMetadata {
        &self.metadata
    }

    async fn validate(&self, _ctx: &SkillContext) -> bool {
        self.valid
    }

    async fn on_load(&self, _ctx: &SkillContext) -> anyhow::Result<()> {
        if self.fail_load {
            anyhow::bail!("load refused");
        }
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_unload(&self, _ctx: &SkillContext) -> anyhow::Result<()> {
        if self.fail_unload {
            anyhow::bail!("unload refused");
        }
        self.counters.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_before_execute(
        &self,
        _ctx: &SkillContext,
        _params: &SkillParams,
    ) -> anyhow::Result<bool> {
        self.counters.befores.fetch_add(1, Ordering::SeqCst);
        Ok(!self.veto)
    }

    async fn execute(
        &self,
        _ctx: &SkillContext,
        params: &SkillParams,
    ) -> anyhow::Result<SkillResult> {
        self.counters.executes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(block) = self.block {
            std::thread::sleep(block);
        }
        match self.outcome {
            Outcome::Succeed => Ok(SkillResult::success(json!({
                "skill": self.metadata.id(),
                "params": params.len(),
            }))),
            Outcome::LogicalFailure => Ok(SkillResult::failure(format!(
                "{} could not finish",
                self.metadata.id()
            ))),
            Outcome::Error => anyhow::bail!("{} blew up", self.metadata.id()),
            Outcome::Panic => panic!("{} panicked", self.metadata.id()),
        }
    }

    async fn on_after_execute(
        &self,
        _ctx: &SkillContext,
        _params: &SkillParams,
        _result: &SkillResult,
    ) -> anyhow::Result<()> {
        self.counters.afters.fetch_add(1, Ordering::SeqCst);
        if self.fail_after {
            anyhow::bail!("after hook broke");
        }
        if self.panic_after {
            panic!("after hook panicked");
        }
        Ok(())
    }
}
