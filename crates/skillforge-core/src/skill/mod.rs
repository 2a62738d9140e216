//! Skill system business logic.
//!
//! The skill contract and its type-erased wrapper, the capability registry,
//! batch loading in dependency order, composition of derived skills, and the
//! skill variants the registry hosts (definition-backed, programmatic, and
//! remote-tool adapters). Domain types live in `skillforge-types::skill`.

pub mod box_skill;
pub mod bridge;
pub mod composer;
pub mod context;
pub mod contract;
pub mod definition;
pub mod function;
pub mod loader;
pub mod registry;
pub mod remote;

#[cfg(test)]
mod test_support;

pub use box_skill::BoxSkill;
pub use bridge::SkillToolBridge;
pub use composer::{CapabilityComposer, CompositionMode};
pub use context::SkillContext;
pub use contract::Skill;
pub use definition::DefinitionSkill;
pub use function::FnSkill;
pub use loader::{CapabilityLoader, LoadFailure, LoadOutcome};
pub use registry::CapabilityRegistry;
pub use remote::{RemoteToolSkill, ToolTransport};
