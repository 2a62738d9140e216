//! Batch loading and unloading with dependency-aware ordering.
//!
//! Uses petgraph to model dependencies within a batch and processes nodes in
//! Kahn order: a skill is registered only once every dependency is present in
//! the registry. Skills whose dependencies never become available (missing
//! externally, failed earlier in the batch, or caught in a cycle) are
//! reported as failed and never registered. Per-item failures never abort
//! the batch.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use skillforge_types::error::RegistryError;

use super::box_skill::BoxSkill;
use super::context::SkillContext;
use super::registry::CapabilityRegistry;

/// Why a skill in a batch was not loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadFailure {
    /// Dependencies that are neither registered nor part of the batch.
    #[error("missing dependencies: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),

    /// Dependencies from the same batch that failed to load.
    #[error("dependencies failed to load: {}", .0.join(", "))]
    FailedDependencies(Vec<String>),

    /// The skill is part of a dependency cycle with these members.
    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    /// The registry rejected the skill.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Per-skill outcome of a batch load.
pub type LoadOutcome = Result<(), LoadFailure>;

/// Batch register/unregister helper layered on a [`CapabilityRegistry`].
#[derive(Debug, Clone)]
pub struct CapabilityLoader {
    registry: CapabilityRegistry,
}

impl CapabilityLoader {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Register one skill, logging instead of returning the error.
    pub async fn load(&self, skill: BoxSkill, ctx: &SkillContext) -> bool {
        let id = skill.id().to_string();
        match self.registry.register(skill, ctx).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(skill = %id, error = %e, "failed to load skill");
                false
            }
        }
    }

    /// Register a batch in dependency order; one entry per distinct id.
    pub async fn load_all(&self, skills: Vec<BoxSkill>, ctx: &SkillContext) -> HashMap<String, bool> {
        self.load_all_detailed(skills, ctx)
            .await
            .into_iter()
            .map(|(id, outcome)| (id, outcome.is_ok()))
            .collect()
    }

    /// Like [`load_all`](Self::load_all), but reports why each failure happened.
    ///
    /// Independent skills are processed in input order; that order is not a
    /// guarantee, only the dependency partial order is.
    pub async fn load_all_detailed(
        &self,
        skills: Vec<BoxSkill>,
        ctx: &SkillContext,
    ) -> HashMap<String, LoadOutcome> {
        let mut outcomes: HashMap<String, LoadOutcome> = HashMap::new();

        // Node weight is the slot index into `slots`.
        let mut graph = DiGraph::<usize, ()>::new();
        let mut slots: Vec<Option<BoxSkill>> = Vec::with_capacity(skills.len());
        let mut ids: Vec<String> = Vec::with_capacity(skills.len());
        let mut node_of: HashMap<String, NodeIndex> = HashMap::new();

        for skill in skills {
            let id = skill.id().to_string();
            if node_of.contains_key(&id) {
                tracing::warn!(skill = %id, "duplicate skill in batch ignored");
                continue;
            }
            let node = graph.add_node(slots.len());
            node_of.insert(id.clone(), node);
            ids.push(id);
            slots.push(Some(skill));
        }

        // Edge from dependency -> dependent, only for dependencies inside the
        // batch that are not already satisfied by the registry.
        for (slot, skill) in slots.iter().enumerate() {
            let Some(skill) = skill else { continue };
            let node = node_of[&ids[slot]];
            let mut seen = HashSet::new();
            for dep in skill.metadata().dependencies() {
                if !seen.insert(dep.as_str()) || self.registry.contains(dep) {
                    continue;
                }
                if let Some(&dep_node) = node_of.get(dep) {
                    graph.add_edge(dep_node, node, ());
                }
            }
        }

        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();
        let mut queue: VecDeque<NodeIndex> = graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .collect();

        while let Some(node) = queue.pop_front() {
            let slot = graph[node];
            let id = &ids[slot];
            let Some(skill) = slots[slot].take() else {
                continue;
            };

            let (in_batch, external): (Vec<String>, Vec<String>) = skill
                .metadata()
                .dependencies()
                .iter()
                .filter(|dep| !self.registry.contains(dep))
                .cloned()
                .partition(|dep| node_of.contains_key(dep));

            let outcome = if !external.is_empty() {
                Err(LoadFailure::MissingDependencies(dedup(external)))
            } else if !in_batch.is_empty() {
                Err(LoadFailure::FailedDependencies(dedup(in_batch)))
            } else {
                self.registry
                    .register(skill, ctx)
                    .await
                    .map_err(LoadFailure::Registry)
            };

            if let Err(ref failure) = outcome {
                tracing::warn!(skill = %id, reason = %failure, "skill not loaded");
            }
            outcomes.insert(id.clone(), outcome);

            for next in graph.neighbors_directed(node, Direction::Outgoing) {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    queue.push_back(next);
                }
            }
        }

        // Whatever is left never reached in-degree zero: cycle members, or
        // skills stuck behind one.
        if outcomes.len() < ids.len() {
            let mut cycle_of: HashMap<NodeIndex, Vec<String>> = HashMap::new();
            for component in tarjan_scc(&graph) {
                let cyclic = component.len() > 1
                    || graph.contains_edge(component[0], component[0]);
                if !cyclic {
                    continue;
                }
                let mut members: Vec<String> =
                    component.iter().map(|n| ids[graph[*n]].clone()).collect();
                members.sort();
                tracing::warn!(members = ?members, "dependency cycle detected in batch");
                for n in component {
                    cycle_of.insert(n, members.clone());
                }
            }

            for node in graph.node_indices() {
                let id = &ids[graph[node]];
                if outcomes.contains_key(id) {
                    continue;
                }
                let failure = match cycle_of.remove(&node) {
                    Some(members) => LoadFailure::Cycle(members),
                    None => {
                        let blocked: Vec<String> = graph
                            .neighbors_directed(node, Direction::Incoming)
                            .map(|n| ids[graph[n]].clone())
                            .filter(|dep| !self.registry.contains(dep))
                            .collect();
                        LoadFailure::FailedDependencies(dedup(blocked))
                    }
                };
                tracing::warn!(skill = %id, reason = %failure, "skill not loaded");
                outcomes.insert(id.clone(), Err(failure));
            }
        }

        let loaded = outcomes.values().filter(|o| o.is_ok()).count();
        tracing::info!(
            loaded,
            failed = outcomes.len() - loaded,
            "batch load finished"
        );
        outcomes
    }

    /// Unload then load the skill's identifier.
    ///
    /// If the unload is rejected the registered version stays in place and
    /// `false` is returned. If the unload succeeds but the new version fails
    /// to load, the identifier is left unregistered; the previous version is
    /// not restored.
    pub async fn reload(&self, skill: BoxSkill, ctx: &SkillContext) -> bool {
        let id = skill.id().to_string();
        if let Err(e) = self.registry.unregister(&id, ctx).await {
            tracing::warn!(skill = %id, error = %e, "failed to unload skill for reload");
            return false;
        }
        let reloaded = self.load(skill, ctx).await;
        if reloaded {
            tracing::info!(skill = %id, "skill reloaded");
        }
        reloaded
    }

    /// Unregister one skill. `false` if absent or rejected.
    pub async fn unload(&self, id: &str, ctx: &SkillContext) -> bool {
        match self.registry.unregister(id, ctx).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(skill = %id, error = %e, "failed to unload skill");
                false
            }
        }
    }

    /// Unregister a batch, dependents before their dependencies.
    pub async fn unload_all<I, S>(&self, ids: I, ctx: &SkillContext) -> HashMap<String, bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = DiGraph::<String, ()>::new();
        let mut node_of: HashMap<String, NodeIndex> = HashMap::new();
        for id in ids {
            let id = id.into();
            if !node_of.contains_key(&id) {
                let node = graph.add_node(id.clone());
                node_of.insert(id, node);
            }
        }

        // Edge from dependent -> dependency: the dependent must go first.
        for (id, &node) in &node_of {
            let Some(skill) = self.registry.get(id) else {
                continue;
            };
            for dep in skill.metadata().dependencies() {
                if let Some(&dep_node) = node_of.get(dep) {
                    if dep_node != node && !graph.contains_edge(node, dep_node) {
                        graph.add_edge(node, dep_node, ());
                    }
                }
            }
        }

        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();
        let mut queue: VecDeque<NodeIndex> = graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .collect();
        let mut order: Vec<NodeIndex> = Vec::with_capacity(graph.node_count());

        while let Some(node) = queue.pop_front() {
            order.push(node);
            for next in graph.neighbors_directed(node, Direction::Outgoing) {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    queue.push_back(next);
                }
            }
        }
        // Registered skills cannot form cycles, but the graph is a snapshot;
        // anything left is attempted anyway and fails on its own merits.
        for node in graph.node_indices() {
            if !order.contains(&node) {
                order.push(node);
            }
        }

        let mut results = HashMap::with_capacity(order.len());
        for node in order {
            let id = &graph[node];
            let removed = self.unload(id, ctx).await;
            results.insert(id.clone(), removed);
        }

        let unloaded = results.values().filter(|r| **r).count();
        tracing::info!(unloaded, failed = results.len() - unloaded, "batch unload finished");
        results
    }
}

fn dedup(mut ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
    ids
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::test_support::TestSkill;
    use skillforge_types::skill::SkillParams;

    fn ctx() -> SkillContext {
        SkillContext::new("loader-test")
    }

    fn loader() -> CapabilityLoader {
        CapabilityLoader::new(CapabilityRegistry::new())
    }

    #[tokio::test]
    async fn load_reports_success_and_failure() {
        let loader = loader();
        assert!(loader.load(TestSkill::new("a").boxed(), &ctx()).await);
        assert!(!loader.load(TestSkill::new("a").boxed(), &ctx()).await);
        assert!(!loader.load(TestSkill::with_deps("b", &["zzz"]).boxed(), &ctx()).await);
        assert_eq!(loader.registry().len(), 1);
    }

    #[tokio::test]
    async fn load_all_orders_by_dependency() {
        let loader = loader();
        // Submitted dependents-first; must still succeed.
        let skills = vec![
            TestSkill::with_deps("app", &["lib", "util"]).boxed(),
            TestSkill::with_deps("lib", &["core"]).boxed(),
            TestSkill::with_deps("util", &["core"]).boxed(),
            TestSkill::new("core").boxed(),
        ];

        let result = loader.load_all(skills, &ctx()).await;
        assert_eq!(result.len(), 4);
        assert!(result.values().all(|ok| *ok));
        assert_eq!(loader.registry().ids(), vec!["app", "core", "lib", "util"]);
    }

    #[tokio::test]
    async fn load_all_partial_success_with_missing_dependency() {
        let loader = loader();
        let skills = vec![
            TestSkill::new("base").boxed(),
            TestSkill::with_deps("needs-missing", &["missing"]).boxed(),
        ];

        let result = loader.load_all(skills, &ctx()).await;
        assert_eq!(result.len(), 2);
        assert_eq!(result["base"], true);
        assert_eq!(result["needs-missing"], false);
        assert!(loader.registry().contains("base"));
        assert!(!loader.registry().contains("needs-missing"));
    }

    #[tokio::test]
    async fn load_all_mutual_dependency_fails_both() {
        let loader = loader();
        let a = TestSkill::with_deps("a", &["b"]);
        let a_counters = a.counters();
        let b = TestSkill::with_deps("b", &["a"]);
        let b_counters = b.counters();

        let result = loader
            .load_all_detailed(vec![a.boxed(), b.boxed()], &ctx())
            .await;

        assert_eq!(result.len(), 2);
        for id in ["a", "b"] {
            match &result[id] {
                Err(LoadFailure::Cycle(members)) => assert_eq!(members, &["a", "b"]),
                other => panic!("{id}: unexpected outcome {other:?}"),
            }
        }
        assert_eq!(loader.registry().len(), 0);
        assert_eq!(a_counters.loads(), 0);
        assert_eq!(b_counters.loads(), 0);
    }

    #[tokio::test]
    async fn load_all_cycle_does_not_block_independent_skills() {
        let loader = loader();
        let skills = vec![
            TestSkill::with_deps("a", &["b"]).boxed(),
            TestSkill::with_deps("b", &["a"]).boxed(),
            TestSkill::with_deps("c", &["a"]).boxed(),
            TestSkill::new("free").boxed(),
            TestSkill::with_deps("self-ref", &["self-ref"]).boxed(),
        ];

        let result = loader.load_all_detailed(skills, &ctx()).await;
        assert_eq!(result.len(), 5);
        assert!(result["free"].is_ok());
        assert!(matches!(result["c"], Err(LoadFailure::FailedDependencies(ref d)) if d == &["a"]));
        assert!(matches!(result["self-ref"], Err(LoadFailure::Cycle(_))));
        assert_eq!(loader.registry().ids(), vec!["free"]);
    }

    #[tokio::test]
    async fn load_all_failure_propagates_to_dependents() {
        let loader = loader();
        let skills = vec![
            TestSkill::with_deps("top", &["mid"]).boxed(),
            TestSkill::with_deps("mid", &["bad"]).boxed(),
            TestSkill::new("bad").invalid().boxed(),
            TestSkill::new("other").boxed(),
        ];

        let result = loader.load_all_detailed(skills, &ctx()).await;
        assert!(matches!(
            result["bad"],
            Err(LoadFailure::Registry(RegistryError::ValidationFailed(_)))
        ));
        assert!(matches!(result["mid"], Err(LoadFailure::FailedDependencies(_))));
        assert!(matches!(result["top"], Err(LoadFailure::FailedDependencies(_))));
        assert!(result["other"].is_ok());
        assert_eq!(loader.registry().ids(), vec!["other"]);
    }

    #[tokio::test]
    async fn load_all_uses_already_registered_dependencies() {
        let loader = loader();
        assert!(loader.load(TestSkill::new("core").boxed(), &ctx()).await);

        let skills = vec![
            TestSkill::with_deps("plugin", &["core"]).boxed(),
            // A second copy of an already-registered id fails on its own,
            // but does not take its dependents down with it.
            TestSkill::new("core").boxed(),
        ];
        let result = loader.load_all_detailed(skills, &ctx()).await;

        assert!(result["plugin"].is_ok());
        assert!(matches!(
            result["core"],
            Err(LoadFailure::Registry(RegistryError::AlreadyRegistered(_)))
        ));
    }

    #[tokio::test]
    async fn load_all_duplicate_ids_in_batch() {
        let loader = loader();
        let first = TestSkill::new("dup");
        let first_counters = first.counters();
        let second = TestSkill::new("dup");
        let second_counters = second.counters();

        let result = loader
            .load_all(vec![first.boxed(), second.boxed()], &ctx())
            .await;
        assert_eq!(result.len(), 1);
        assert!(result["dup"]);
        assert_eq!(first_counters.loads(), 1);
        assert_eq!(second_counters.loads(), 0);
    }

    #[tokio::test]
    async fn reload_replaces_registered_version() {
        let loader = loader();
        let old = TestSkill::new("svc");
        let old_counters = old.counters();
        assert!(loader.load(old.boxed(), &ctx()).await);

        let new = TestSkill::new("svc");
        let new_counters = new.counters();
        assert!(loader.reload(new.boxed(), &ctx()).await);

        assert_eq!(old_counters.unloads(), 1);
        assert_eq!(new_counters.loads(), 1);
        loader
            .registry()
            .execute("svc", &ctx(), &SkillParams::new())
            .await
            .unwrap();
        assert_eq!(new_counters.executes(), 1);
        assert_eq!(old_counters.executes(), 0);
    }

    #[tokio::test]
    async fn reload_rejected_when_dependents_exist() {
        let loader = loader();
        assert!(loader.load(TestSkill::new("base").boxed(), &ctx()).await);
        assert!(loader.load(TestSkill::with_deps("child", &["base"]).boxed(), &ctx()).await);

        let replacement = TestSkill::new("base");
        let counters = replacement.counters();
        assert!(!loader.reload(replacement.boxed(), &ctx()).await);
        assert_eq!(counters.loads(), 0);
        assert!(loader.registry().get("base").unwrap().is_loaded());
    }

    #[tokio::test]
    async fn reload_failure_leaves_id_unregistered() {
        let loader = loader();
        assert!(loader.load(TestSkill::new("svc").boxed(), &ctx()).await);
        assert!(!loader.reload(TestSkill::new("svc").invalid().boxed(), &ctx()).await);
        assert!(!loader.registry().contains("svc"));
    }

    #[tokio::test]
    async fn reload_of_unregistered_id_just_loads() {
        let loader = loader();
        assert!(loader.reload(TestSkill::new("fresh").boxed(), &ctx()).await);
        assert!(loader.registry().contains("fresh"));
    }

    #[tokio::test]
    async fn unload_reports_absent_and_rejected() {
        let loader = loader();
        assert!(!loader.unload("ghost", &ctx()).await);

        assert!(loader.load(TestSkill::new("base").boxed(), &ctx()).await);
        assert!(loader.load(TestSkill::with_deps("child", &["base"]).boxed(), &ctx()).await);
        assert!(!loader.unload("base", &ctx()).await);
        assert!(loader.unload("child", &ctx()).await);
        assert!(loader.unload("base", &ctx()).await);
    }

    #[tokio::test]
    async fn unload_all_processes_dependents_first() {
        let loader = loader();
        let skills = vec![
            TestSkill::new("core").boxed(),
            TestSkill::with_deps("lib", &["core"]).boxed(),
            TestSkill::with_deps("app", &["lib", "core"]).boxed(),
            TestSkill::new("keep").boxed(),
        ];
        loader.load_all(skills, &ctx()).await;

        // Dependencies listed before dependents on purpose.
        let result = loader.unload_all(["core", "lib", "app", "ghost"], &ctx()).await;

        assert_eq!(result.len(), 4);
        assert!(result["core"]);
        assert!(result["lib"]);
        assert!(result["app"]);
        assert!(!result["ghost"]);
        assert_eq!(loader.registry().ids(), vec!["keep"]);
    }

    #[tokio::test]
    async fn unload_all_respects_outside_dependents() {
        let loader = loader();
        assert!(loader.load(TestSkill::new("core").boxed(), &ctx()).await);
        assert!(loader.load(TestSkill::with_deps("outside", &["core"]).boxed(), &ctx()).await);
        assert!(loader.load(TestSkill::new("solo").boxed(), &ctx()).await);

        let result = loader.unload_all(vec!["core".to_string(), "solo".to_string()], &ctx()).await;
        assert!(!result["core"]);
        assert!(result["solo"]);
        assert!(loader.registry().contains("core"));
    }
}
