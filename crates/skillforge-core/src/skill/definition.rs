//! SKILL.md definition parsing and validation.
//!
//! A definition is YAML front matter delimited by `---` followed by a
//! markdown body holding the skill's instructions:
//!
//! ```text
//! ---
//! name: web-search
//! description: Search the web for information
//! version: 1.2.0
//! tags: [search, web]
//! dependencies: [url-parser]
//! ---
//!
//! # Web Search
//! ...
//! ```
//!
//! Parsing works on in-memory content; walking directories is left to the
//! infra scanner.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use skillforge_types::error::MetadataError;
use skillforge_types::skill::{
    MAX_DESCRIPTION_LEN, SkillDefinition, SkillMetadata, SkillParams, SkillResult,
};

use super::box_skill::BoxSkill;
use super::context::SkillContext;
use super::contract::Skill;

/// Raw front matter fields as written in SKILL.md.
#[derive(Debug, Deserialize)]
struct FrontMatter {
    name: String,
    description: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Split SKILL.md content into `(yaml, body)`.
///
/// Content must start with `---`; a closing `\n---` separates the YAML from
/// the body. The body has leading blank lines removed.
pub fn extract_frontmatter(content: &str) -> Result<(&str, &str), MetadataError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(after_open) = content.strip_prefix("---") else {
        return Err(MetadataError::InvalidDefinition(
            "SKILL.md must start with front matter delimiter '---'".to_string(),
        ));
    };
    let after_open = after_open
        .strip_prefix("\r\n")
        .or_else(|| after_open.strip_prefix('\n'))
        .unwrap_or(after_open);

    let Some(closing) = after_open.find("\n---") else {
        return Err(MetadataError::InvalidDefinition(
            "SKILL.md is missing the closing front matter delimiter '---'".to_string(),
        ));
    };

    let yaml = &after_open[..closing];
    let remainder = &after_open[closing + 4..];
    let body = remainder
        .strip_prefix("\r\n")
        .or_else(|| remainder.strip_prefix('\n'))
        .unwrap_or(remainder)
        .trim_start_matches(['\r', '\n']);

    Ok((yaml, body))
}

/// Parse and validate a definition read from directory `dir_name`.
///
/// Checks that the declared name is a valid identifier equal to `dir_name`,
/// the description is 1 to 1024 characters, the version (if any) is
/// `MAJOR.MINOR.PATCH`, and every dependency is a valid identifier.
///
/// `resource_dirs` is left empty; callers that know the on-disk layout fill
/// it in.
///
/// # Errors
///
/// [`MetadataError::InvalidDefinition`] for structural problems (front
/// matter, YAML, directory mismatch), or the metadata error for the field
/// that failed validation.
pub fn parse_definition(
    dir_name: &str,
    content: &str,
    base_dir: Option<PathBuf>,
) -> Result<SkillDefinition, MetadataError> {
    let (yaml, body) = extract_frontmatter(content)?;
    let front: FrontMatter = serde_yaml_ng::from_str(yaml).map_err(|e| {
        MetadataError::InvalidDefinition(format!("malformed front matter in '{dir_name}': {e}"))
    })?;

    if front.name != dir_name {
        return Err(MetadataError::InvalidDefinition(format!(
            "skill name '{}' does not match its directory '{dir_name}'",
            front.name
        )));
    }

    let description = front.description.trim();
    let description_len = description.chars().count();
    if description_len == 0 || description_len > MAX_DESCRIPTION_LEN {
        return Err(MetadataError::InvalidDescriptionLength(
            description_len,
            1,
            MAX_DESCRIPTION_LEN,
        ));
    }

    let mut builder = SkillMetadata::builder(front.name)
        .description(description)
        .tags(front.tags)
        .dependencies(front.dependencies);
    if let Some(version) = front.version {
        builder = builder.version(version);
    }
    if let Some(author) = front.author {
        builder = builder.author(author);
    }

    Ok(SkillDefinition {
        metadata: builder.build()?,
        body: body.to_string(),
        license: front.license,
        base_dir,
        resource_dirs: Vec::new(),
    })
}

/// A prompt-style skill backed by a parsed definition.
///
/// Executing it returns the instruction body as `data`; the agent follows the
/// instructions itself.
#[derive(Debug, Clone)]
pub struct DefinitionSkill {
    definition: SkillDefinition,
}

impl DefinitionSkill {
    pub fn new(definition: SkillDefinition) -> Self {
        Self { definition }
    }

    pub fn boxed(self) -> BoxSkill {
        BoxSkill::new(self)
    }
}

impl Skill for DefinitionSkill {
    fn metadata(&self) -> &SkillMetadata {
        &self.definition.metadata
    }

    fn definition(&self) -> Option<&SkillDefinition> {
        Some(&self.definition)
    }

    async fn execute(
        &self,
        _ctx: &SkillContext,
        _params: &SkillParams,
    ) -> anyhow::Result<SkillResult> {
        Ok(SkillResult::success(Value::String(self.definition.body.clone())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_SKILL_MD: &str = r#"---
name: web-search
description: Search the web for information
version: 1.2.0
author: skillforge
license: MIT
tags:
  - search
  - web
dependencies:
  - url-parser
---

# Web Search Skill

Search for anything the user asks about.
"#;

    const MINIMAL_SKILL_MD: &str = "---\nname: hello-world\ndescription: A simple greeting skill\n---\n\nSay hello to the user.";

    #[test]
    fn parse_full_definition() {
        let def = parse_definition("web-search", FULL_SKILL_MD, Some(PathBuf::from("/skills/web-search")))
            .unwrap();

        let meta = &def.metadata;
        assert_eq!(meta.id(), "web-search");
        assert_eq!(meta.version().to_string(), "1.2.0");
        assert_eq!(meta.author(), Some("skillforge"));
        assert_eq!(meta.dependencies(), ["url-parser"]);
        assert!(meta.tags().contains("search"));
        assert_eq!(def.license.as_deref(), Some("MIT"));
        assert!(def.body.starts_with("# Web Search Skill"));
        assert_eq!(def.base_dir, Some(PathBuf::from("/skills/web-search")));
        assert!(def.resource_dirs.is_empty());
    }

    #[test]
    fn parse_minimal_definition() {
        let def = parse_definition("hello-world", MINIMAL_SKILL_MD, None).unwrap();
        assert_eq!(def.metadata.version().to_string(), "1.0.0");
        assert_eq!(def.metadata.name(), "hello-world");
        assert!(def.metadata.dependencies().is_empty());
        assert_eq!(def.body, "Say hello to the user.");
    }

    #[test]
    fn crlf_content_is_accepted() {
        let content = MINIMAL_SKILL_MD.replace('\n', "\r\n");
        let def = parse_definition("hello-world", &content, None).unwrap();
        assert_eq!(def.metadata.description(), "A simple greeting skill");
        assert_eq!(def.body, "Say hello to the user.");
    }

    #[test]
    fn reject_missing_frontmatter() {
        let err = parse_definition("x", "# no front matter", None).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidDefinition(ref m) if m.contains("start with")));
    }

    #[test]
    fn reject_missing_closing_delimiter() {
        let err = parse_definition("x", "---\nname: x\ndescription: y\n", None).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidDefinition(ref m) if m.contains("closing")));
    }

    #[test]
    fn reject_directory_mismatch() {
        let err = parse_definition("other-dir", MINIMAL_SKILL_MD, None).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidDefinition(ref m) if m.contains("other-dir")));
    }

    #[test]
    fn reject_invalid_name() {
        let content = "---\nname: Bad_Name\ndescription: nope\n---\n";
        let err = parse_definition("Bad_Name", content, None).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidIdentifier(..)));
    }

    #[test]
    fn reject_empty_and_oversized_descriptions() {
        let empty = "---\nname: quiet\ndescription: \"  \"\n---\n";
        assert_eq!(
            parse_definition("quiet", empty, None).unwrap_err(),
            MetadataError::InvalidDescriptionLength(0, 1, MAX_DESCRIPTION_LEN)
        );

        let long = format!("---\nname: chatty\ndescription: {}\n---\n", "a".repeat(1025));
        assert_eq!(
            parse_definition("chatty", &long, None).unwrap_err(),
            MetadataError::InvalidDescriptionLength(1025, 1, MAX_DESCRIPTION_LEN)
        );
    }

    #[test]
    fn reject_invalid_version_and_dependency() {
        let bad_version = "---\nname: v\ndescription: d\nversion: 1.2.0-beta\n---\n";
        assert!(matches!(
            parse_definition("v", bad_version, None).unwrap_err(),
            MetadataError::InvalidVersion(_)
        ));

        let bad_dep = "---\nname: d\ndescription: d\ndependencies: [\"Not Valid\"]\n---\n";
        assert!(matches!(
            parse_definition("d", bad_dep, None).unwrap_err(),
            MetadataError::InvalidIdentifier(..)
        ));
    }

    #[test]
    fn reject_non_list_tags() {
        let content = "---\nname: t\ndescription: d\ntags: {a: 1}\n---\n";
        assert!(matches!(
            parse_definition("t", content, None).unwrap_err(),
            MetadataError::InvalidDefinition(_)
        ));
    }

    #[tokio::test]
    async fn definition_skill_returns_body() {
        let def = parse_definition("hello-world", MINIMAL_SKILL_MD, None).unwrap();
        let skill = DefinitionSkill::new(def).boxed();
        assert!(skill.definition().is_some());

        let result = skill
            .execute(&SkillContext::new("def-test"), &SkillParams::new())
            .await
            .unwrap();
        assert_eq!(result.data(), Some(&Value::String("Say hello to the user.".into())));
    }
}
