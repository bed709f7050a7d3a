//! Error types for Convoy

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ConvoyError
pub type Result<T> = std::result::Result<T, ConvoyError>;

/// Main error type for Convoy operations
#[derive(Debug, Error)]
pub enum ConvoyError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Git-related errors
    #[error(transparent)]
    Git(#[from] GitError),

    /// Dependency-graph errors
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Version-related errors
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Changelog-related errors
    #[error(transparent)]
    Changelog(#[from] ChangelogError),

    /// Registry/publish errors
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// Release workflow errors
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// Two workspace packages share a name
    #[error("Duplicate package name '{0}' in workspace")]
    DuplicatePackage(String),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Git-related errors
#[derive(Debug, Error)]
pub enum GitError {
    /// Repository not found
    #[error("Git repository not found at {0}")]
    RepositoryNotFound(PathBuf),

    /// Not a git repository
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    /// Failed to open repository
    #[error("Failed to open repository: {0}")]
    OpenFailed(String),

    /// No commits found
    #[error("No commits found in repository")]
    NoCommits,

    /// Branch has no remote-tracking counterpart
    #[error("Branch '{0}' does not exist on the remote")]
    NoRemoteBranch(String),

    /// Local branch is behind its remote counterpart
    #[error("Branch '{branch}' is behind its remote by {behind} commit(s)")]
    BehindRemote { branch: String, behind: usize },

    /// Tag already exists
    #[error("Tag already exists: {0}")]
    TagExists(String),

    /// Failed to create tag
    #[error("Failed to create tag {name}: {reason}")]
    TagCreationFailed { name: String, reason: String },

    /// Working directory is not clean
    #[error("Working directory has uncommitted changes")]
    DirtyWorkingDirectory,

    /// Failed to push
    #[error("Failed to push to remote: {0}")]
    PushFailed(String),

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),
}

/// Dependency-graph errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// Package not present in the graph
    #[error("Package '{0}' is not part of the workspace graph")]
    UnknownPackage(String),

    /// Dependency cycles rejected by configuration
    #[error("Dependency cycles detected: {}", .0.join("; "))]
    CyclicDependency(Vec<String>),
}

/// Version-related errors
#[derive(Debug, Error)]
pub enum VersionError {
    /// Failed to parse version
    #[error("Failed to parse version '{0}': {1}")]
    ParseFailed(String, String),

    /// Invalid bump keyword
    #[error("Invalid bump keyword: {0}")]
    InvalidBumpKeyword(String),

    /// No version bump required
    #[error("No version bump required - no relevant commits found")]
    NoBumpRequired,

    /// Semver error
    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),
}

/// Changelog-related errors
#[derive(Debug, Error)]
pub enum ChangelogError {
    /// Failed to parse commit
    #[error("Failed to parse commit: {0}")]
    ParseFailed(String),

    /// Failed to write changelog
    #[error("Failed to write changelog: {0}")]
    WriteFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Registry/publish errors
#[derive(Debug, Error)]
pub enum PublishError {
    /// Registry client binary not available
    #[error("Registry client '{0}' not found on PATH")]
    ClientNotFound(String),

    /// Registry is unreachable
    #[error("Registry {0} is unreachable")]
    Unreachable(String),

    /// Missing publish permission
    #[error("No publish access to '{package}' on {registry}")]
    AccessDenied { package: String, registry: String },

    /// Registry requires a one-time password
    #[error("Registry requires a one-time password for '{0}'")]
    OtpRequired(String),

    /// Upload failed
    #[error("Failed to publish '{package}': {reason}")]
    UploadFailed { package: String, reason: String },

    /// Distribution-tag operation failed
    #[error("Failed to update dist-tag '{tag}' for '{package}': {reason}")]
    DistTagFailed {
        package: String,
        tag: String,
        reason: String,
    },

    /// Command execution failed
    #[error("Command failed: {command} - {reason}")]
    CommandFailed { command: String, reason: String },
}

impl PublishError {
    /// True when the failure is an OTP challenge that warrants one retry.
    pub fn is_otp_challenge(&self) -> bool {
        matches!(self, Self::OtpRequired(_))
    }
}

/// Release workflow errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Lifecycle hook failed
    #[error("Lifecycle script '{script}' in '{package}' failed: {reason}")]
    HookFailed {
        package: String,
        script: String,
        reason: String,
    },

    /// One or more packages failed to publish
    #[error("{failed} of {total} package(s) failed to publish")]
    PartialPublish { failed: usize, total: usize },

    /// User cancelled
    #[error("Operation cancelled by user")]
    Cancelled,
}

impl ConvoyError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// True for errors that are user/configuration mistakes rather than
    /// execution failures; these abort before any side effect.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Graph(GraphError::CyclicDependency(_))
                | Self::Workflow(WorkflowError::ValidationFailed(_))
        )
    }
}
