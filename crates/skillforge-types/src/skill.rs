//! Skill system domain types.
//!
//! Defines the identity record of a skill ([`SkillMetadata`]), the uniform
//! execution outcome ([`SkillResult`]), the validated definition payload of
//! definition-backed skills, and the lightweight projections used for
//! discovery and activation.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MetadataError;

/// Maximum length of a skill identifier.
pub const MAX_ID_LEN: usize = 64;

/// Maximum length of a skill description.
pub const MAX_DESCRIPTION_LEN: usize = 1024;

/// Version assigned when none is declared.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// `SkillResult` metadata key carrying a captured execution error.
pub const METADATA_EXCEPTION: &str = "exception";

/// `SkillResult` metadata key listing failing component ids of a composite.
pub const METADATA_FAILURES: &str = "failures";

/// Parameter mapping handed to a skill on every invocation.
pub type SkillParams = HashMap<String, Value>;

// ---------------------------------------------------------------------------
// Identifier / version validation
// ---------------------------------------------------------------------------

/// Validate a skill identifier.
///
/// Identifiers are non-blank, at most 64 characters, consist of lowercase
/// ASCII letters, digits and single hyphens, and do not start or end with a
/// hyphen.
pub fn validate_identifier(id: &str) -> Result<(), MetadataError> {
    let invalid = |reason| Err(MetadataError::InvalidIdentifier(id.to_string(), reason));

    if id.trim().is_empty() {
        return invalid("must not be blank");
    }
    if id.len() > MAX_ID_LEN {
        return invalid("must be at most 64 characters");
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return invalid("must contain only lowercase letters, digits, and hyphens");
    }
    if id.starts_with('-') || id.ends_with('-') {
        return invalid("must not start or end with a hyphen");
    }
    if id.contains("--") {
        return invalid("must not contain consecutive hyphens");
    }
    Ok(())
}

/// Parse a strict `MAJOR.MINOR.PATCH` version.
pub fn parse_version(version: &str) -> Result<semver::Version, MetadataError> {
    let parsed = version
        .parse::<semver::Version>()
        .map_err(|_| MetadataError::InvalidVersion(version.to_string()))?;
    if !parsed.pre.is_empty() || !parsed.build.is_empty() {
        return Err(MetadataError::InvalidVersion(version.to_string()));
    }
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// SkillMetadata
// ---------------------------------------------------------------------------

/// Immutable identity and discovery record of a skill.
///
/// Only obtainable through [`SkillMetadata::builder`], which validates every
/// field in [`SkillMetadataBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillMetadata {
    id: String,
    name: String,
    version: semver::Version,
    description: String,
    author: Option<String>,
    tags: BTreeSet<String>,
    dependencies: Vec<String>,
}

impl SkillMetadata {
    /// Start building metadata for the skill `id`.
    pub fn builder(id: impl Into<String>) -> SkillMetadataBuilder {
        SkillMetadataBuilder {
            id: id.into(),
            name: None,
            version: None,
            description: String::new(),
            author: None,
            tags: BTreeSet::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &semver::Version {
        &self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Identifiers of the skills this one depends on, in declaration order.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Whether `id` appears in this skill's dependency list.
    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d == id)
    }
}

impl fmt::Display for SkillMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// Builder for [`SkillMetadata`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct SkillMetadataBuilder {
    id: String,
    name: Option<String>,
    version: Option<String>,
    description: String,
    author: Option<String>,
    tags: BTreeSet<String>,
    dependencies: Vec<String>,
}

impl SkillMetadataBuilder {
    /// Display name. Defaults to the identifier.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Semantic version. Defaults to `1.0.0`.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Validate all fields and produce the metadata.
    ///
    /// # Errors
    ///
    /// - [`MetadataError::InvalidIdentifier`] if the id or any dependency id is malformed
    /// - [`MetadataError::InvalidVersion`] if the version is not `MAJOR.MINOR.PATCH`
    /// - [`MetadataError::InvalidDescriptionLength`] if the description exceeds 1024 chars
    pub fn build(self) -> Result<SkillMetadata, MetadataError> {
        validate_identifier(&self.id)?;
        for dep in &self.dependencies {
            validate_identifier(dep)?;
        }

        let version = parse_version(self.version.as_deref().unwrap_or(DEFAULT_VERSION))?;

        let description_len = self.description.chars().count();
        if description_len > MAX_DESCRIPTION_LEN {
            return Err(MetadataError::InvalidDescriptionLength(
                description_len,
                0,
                MAX_DESCRIPTION_LEN,
            ));
        }

        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.id.clone(),
        };

        Ok(SkillMetadata {
            id: self.id,
            name,
            version,
            description: self.description,
            author: self.author,
            tags: self.tags,
            dependencies: self.dependencies,
        })
    }
}

// ---------------------------------------------------------------------------
// SkillResult
// ---------------------------------------------------------------------------

/// Outcome of one skill execution.
///
/// Built through [`SkillResult::success`] / [`SkillResult::failure`] and the
/// consuming `with_*` adapters; there is no way to mutate a result in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillResult {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    metadata: HashMap<String, Value>,
}

impl SkillResult {
    /// A successful result carrying `data`.
    pub fn success(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            message: None,
            metadata: HashMap::new(),
        }
    }

    /// A successful result with no payload.
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            metadata: HashMap::new(),
        }
    }

    /// A failed result explained by `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            metadata: HashMap::new(),
        }
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

// ---------------------------------------------------------------------------
// Tool specifications
// ---------------------------------------------------------------------------

/// A tool a skill exposes to an agent's tool-call dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// `domain.method` signature, e.g. `skills.run`.
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object.
    #[serde(default)]
    pub parameters: Value,
}

// ---------------------------------------------------------------------------
// Definition-backed skills
// ---------------------------------------------------------------------------

/// Auxiliary directories a definition may ship next to its `SKILL.md`.
pub const RESOURCE_DIR_NAMES: [&str; 3] = ["scripts", "references", "assets"];

/// A validated skill definition: metadata plus the instruction body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillDefinition {
    pub metadata: SkillMetadata,
    /// Markdown body below the front matter.
    pub body: String,
    pub license: Option<String>,
    /// Directory the definition was read from, if any.
    pub base_dir: Option<PathBuf>,
    /// Existing auxiliary resource directories under `base_dir`.
    pub resource_dirs: Vec<PathBuf>,
}

// ---------------------------------------------------------------------------
// Discovery / activation projections
// ---------------------------------------------------------------------------

/// Lightweight projection of a registered skill, sized for a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub tags: Vec<String>,
}

impl SkillSummary {
    /// Project `metadata`, truncating the description to `max_description` chars.
    pub fn from_metadata(metadata: &SkillMetadata, max_description: usize) -> Self {
        Self {
            id: metadata.id().to_string(),
            name: metadata.name().to_string(),
            description: truncate_chars(metadata.description(), max_description),
            version: metadata.version().to_string(),
            tags: metadata.tags().iter().cloned().collect(),
        }
    }
}

/// Full payload returned when an agent activates a skill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillActivation {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub dependencies: Vec<String>,
    /// Instruction body; empty for skills without a definition.
    pub body: String,
    pub resource_dirs: Vec<PathBuf>,
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifier_rules() {
        assert!(validate_identifier("web-search").is_ok());
        assert!(validate_identifier("a1").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("   ").is_err());
        assert!(validate_identifier("Web-Search").is_err());
        assert!(validate_identifier("web_search").is_err());
        assert!(validate_identifier("-web").is_err());
        assert!(validate_identifier("web-").is_err());
        assert!(validate_identifier("web--search").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_ok());
        assert!(validate_identifier(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let meta = SkillMetadata::builder("echo").build().unwrap();
        assert_eq!(meta.id(), "echo");
        assert_eq!(meta.name(), "echo");
        assert_eq!(meta.version().to_string(), DEFAULT_VERSION);
        assert!(meta.tags().is_empty());
        assert!(meta.dependencies().is_empty());
    }

    #[test]
    fn test_builder_rejects_bad_version() {
        for bad in ["1.0", "v1.0.0", "1.0.0-beta", "one"] {
            let err = SkillMetadata::builder("echo").version(bad).build().unwrap_err();
            assert_eq!(err, MetadataError::InvalidVersion(bad.to_string()));
        }
    }

    #[test]
    fn test_builder_rejects_bad_dependency_id() {
        let err = SkillMetadata::builder("echo")
            .dependency("Not_Valid")
            .build()
            .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidIdentifier(id, _) if id == "Not_Valid"));
    }

    #[test]
    fn test_builder_rejects_long_description() {
        let err = SkillMetadata::builder("echo")
            .description("x".repeat(1025))
            .build()
            .unwrap_err();
        assert_eq!(err, MetadataError::InvalidDescriptionLength(1025, 0, 1024));
    }

    #[test]
    fn test_tags_are_a_set() {
        let meta = SkillMetadata::builder("echo")
            .tags(["b", "a", "b"])
            .build()
            .unwrap();
        assert_eq!(meta.tags().len(), 2);
    }

    #[test]
    fn test_dependencies_keep_order() {
        let meta = SkillMetadata::builder("report")
            .dependencies(["parse", "fetch"])
            .build()
            .unwrap();
        assert_eq!(meta.dependencies(), ["parse", "fetch"]);
        assert!(meta.depends_on("fetch"));
        assert!(!meta.depends_on("report"));
    }

    #[test]
    fn test_result_factories() {
        let ok = SkillResult::success(json!({"n": 1})).with_message("done");
        assert!(ok.is_success());
        assert_eq!(ok.data(), Some(&json!({"n": 1})));
        assert_eq!(ok.message(), Some("done"));

        let failed = SkillResult::failure("boom").with_metadata(METADATA_EXCEPTION, "io error");
        assert!(!failed.is_success());
        assert_eq!(failed.data(), None);
        assert_eq!(
            failed.metadata_value(METADATA_EXCEPTION),
            Some(&json!("io error"))
        );
    }

    #[test]
    fn test_summary_truncates_description() {
        let meta = SkillMetadata::builder("echo")
            .description("abcdefghij")
            .tags(["util"])
            .build()
            .unwrap();
        let summary = SkillSummary::from_metadata(&meta, 5);
        assert_eq!(summary.description, "abcd…");
        assert_eq!(summary.description.chars().count(), 5);
        assert_eq!(summary.tags, vec!["util".to_string()]);

        let untouched = SkillSummary::from_metadata(&meta, 10);
        assert_eq!(untouched.description, "abcdefghij");
    }

    #[test]
    fn test_summary_zero_limit_drops_description() {
        let meta = SkillMetadata::builder("echo")
            .description("abcdefghij")
            .build()
            .unwrap();
        assert_eq!(SkillSummary::from_metadata(&meta, 0).description, "");
        assert_eq!(SkillSummary::from_metadata(&meta, 1).description, "…");
    }
}
