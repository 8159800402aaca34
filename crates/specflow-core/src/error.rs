use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why no active feature could be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoFeatureReason {
    /// The current branch does not follow the `NNN-slug` convention.
    NotOnFeatureBranch { branch: String },
    /// The override named a feature that has no directory under the specs root.
    OverrideNotFound { key: String },
    /// No override was given and the repository has no branch to infer from.
    NoBranch,
}

impl fmt::Display for NoFeatureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoFeatureReason::NotOnFeatureBranch { branch } => write!(
                f,
                "not on a feature branch (current branch: '{branch}'; expected e.g. 001-feature-name)"
            ),
            NoFeatureReason::OverrideNotFound { key } => {
                write!(f, "override '{key}' does not name an existing feature directory")
            }
            NoFeatureReason::NoBranch => {
                f.write_str("no feature override set and no version-control branch to infer from")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SpecflowError {
    #[error("not a repository: no .git or .specify found above {}", start.display())]
    NotARepository { start: PathBuf },

    #[error("no active feature in {}: {reason}", root.display())]
    NoActiveFeature { root: PathBuf, reason: NoFeatureReason },

    #[error("feature already exists: {name} (specs root {})", specs_root.display())]
    DuplicateFeature { name: String, specs_root: PathBuf },

    #[error("invalid phase '{0}': expected one of specify, plan, tasks, implement")]
    InvalidPhase(String),

    #[error("invalid artifact kind: {0}")]
    InvalidArtifactKind(String),

    #[error("{}: manual region markers not found; whole file preserved as manual content", path.display())]
    MissingManualMarkers { path: PathBuf },

    #[error("{}: file kept changing during write; gave up after {attempts} attempts", path.display())]
    WriteConflict { path: PathBuf, attempts: u32 },

    #[error("feature description cannot be empty")]
    EmptyDescription,

    #[error("description '{0}' yields an empty slug")]
    EmptySlug(String),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("git {command} failed in {}: {stderr}", root.display())]
    Git {
        command: String,
        root: PathBuf,
        stderr: String,
    },

    #[error("failed to lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SpecflowError>;
