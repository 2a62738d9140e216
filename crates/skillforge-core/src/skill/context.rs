//! Per-invocation context handed to skills.
//!
//! `SkillContext` carries the session identity, an immutable configuration
//! mapping, and a mutable resource mapping backed by `DashMap`. Cloning
//! produces a shared view of the same resources, so the components of a
//! parallel composite all observe one resource namespace.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

type Resource = Arc<dyn Any + Send + Sync>;

/// Read/write bag threaded through every skill invocation.
#[derive(Clone)]
pub struct SkillContext {
    session_id: Arc<str>,
    config: Arc<HashMap<String, Value>>,
    resources: Arc<DashMap<String, Resource>>,
}

impl SkillContext {
    /// Create a context with an empty configuration.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::builder(session_id).build()
    }

    pub fn builder(session_id: impl Into<String>) -> SkillContextBuilder {
        SkillContextBuilder {
            session_id: session_id.into(),
            config: HashMap::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    // -- configuration ------------------------------------------------------

    /// Raw configuration value at `key`.
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Deserialize the configuration value at `key` into `T`.
    ///
    /// Returns `None` when the key is absent or the value has the wrong shape.
    pub fn config<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn config_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
    }

    pub fn config_bool(&self, key: &str, default: bool) -> bool {
        self.config
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    pub fn config_i64(&self, key: &str, default: i64) -> i64 {
        self.config
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    pub fn config_f64(&self, key: &str, default: f64) -> f64 {
        self.config
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    pub fn config_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.config.keys().cloned().collect();
        keys.sort();
        keys
    }

    // -- resources ----------------------------------------------------------

    /// Store a shared resource under `key`, replacing any previous value.
    pub fn set_resource<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.resources.insert(key.into(), Arc::new(value));
    }

    /// Fetch the resource at `key` if it exists and has type `T`.
    ///
    /// The `Arc` is cloned out immediately so no `DashMap` guard outlives the call.
    pub fn resource<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let entry = self.resources.get(key).map(|r| Arc::clone(r.value()))?;
        entry.downcast::<T>().ok()
    }

    pub fn has_resource(&self, key: &str) -> bool {
        self.resources.contains_key(key)
    }

    /// Remove the resource at `key`, returning whether it existed.
    pub fn remove_resource(&self, key: &str) -> bool {
        self.resources.remove(key).is_some()
    }
}

impl fmt::Debug for SkillContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkillContext")
            .field("session_id", &self.session_id)
            .field("config", &self.config)
            .field("resources", &self.resources.len())
            .finish()
    }
}

/// Builder for [`SkillContext`]; configuration is frozen by [`build`](Self::build).
#[derive(Debug)]
pub struct SkillContextBuilder {
    session_id: String,
    config: HashMap<String, Value>,
}

impl SkillContextBuilder {
    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn configs(mut self, entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.config.extend(entries);
        self
    }

    pub fn build(self) -> SkillContext {
        SkillContext {
            session_id: Arc::from(self.session_id),
            config: Arc::new(self.config),
            resources: Arc::new(DashMap::new()),
        }
    }
}
