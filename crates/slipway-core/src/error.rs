use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlipwayError {
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("service already exists: {0}")]
    ServiceExists(String),

    #[error("invalid service name '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidServiceName(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid environment variable {name}: {reason}")]
    InvalidEnvVar { name: String, reason: String },

    #[error("catalog root is not a directory: {0}")]
    InvalidCatalogRoot(String),

    #[error("no semver tag found in history")]
    NoReleaseTag,

    #[error("no commits since release {0}")]
    NothingToRelease(String),

    #[error("commit {hash} is not a conventional commit: {summary}")]
    NotConventionalCommit { hash: String, summary: String },

    #[error("tag {tag} already exists and does not point at {target}")]
    TagTargetMismatch { tag: String, target: String },

    #[error("pull of {branch} cannot fast-forward")]
    NonFastForward { branch: String },

    #[error("version key not found in {0}")]
    VersionKeyNotFound(String),

    #[error("admission queue closed")]
    AdmissionClosed,

    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SlipwayError>;
