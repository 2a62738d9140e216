use thiserror::Error;

/// Errors raised while constructing skill metadata or definitions.
///
/// These are construction-time failures: a value that produces one of these
/// errors is never handed out half-built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("invalid skill identifier '{0}': {1}")]
    InvalidIdentifier(String, &'static str),

    #[error("invalid skill version '{0}': expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),

    #[error("invalid description length {0}: must be between {1} and {2} characters")]
    InvalidDescriptionLength(usize, usize, usize),

    #[error("invalid skill definition: {0}")]
    InvalidDefinition(String),
}

/// Which lifecycle hook raised a [`RegistryError::Hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Load,
    Unload,
    BeforeExecute,
    AfterExecute,
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "on_load"),
            Self::Unload => write!(f, "on_unload"),
            Self::BeforeExecute => write!(f, "on_before_execute"),
            Self::AfterExecute => write!(f, "on_after_execute"),
        }
    }
}

/// Errors surfaced by single-skill registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("skill '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("skill '{id}' has missing dependencies: {}", missing.join(", "))]
    MissingDependency { id: String, missing: Vec<String> },

    #[error("skill '{0}' failed validation")]
    ValidationFailed(String),

    #[error("skill '{0}' is not registered")]
    NotRegistered(String),

    #[error("skill '{id}' is required by: {}", dependents.join(", "))]
    HasDependents { id: String, dependents: Vec<String> },

    #[error("skill '{0}' is already loaded")]
    AlreadyLoaded(String),

    #[error("skill '{0}' is not loaded")]
    NotLoaded(String),

    #[error("{hook} hook of skill '{id}' failed: {source}")]
    Hook {
        id: String,
        hook: HookKind,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors from building composite skills.
#[derive(Debug, Error)]
pub enum ComposerError {
    #[error("composite '{0}' must have at least one component")]
    EmptyComposite(String),

    #[error("composite '{id}' lists component '{component}' more than once")]
    DuplicateComponent { id: String, component: String },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
