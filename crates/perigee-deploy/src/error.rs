//! Error types for the deploy pipeline.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors raised while resolving environment configuration.
///
/// These are fatal and user-visible: a deploy never proceeds past a
/// configuration failure, and there is no fallback environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested environment is not defined in the configuration.
    #[error("the environment '{0}' does not exist in the configuration")]
    UnknownEnvironment(String),

    /// The environment defines no FUNCTION block.
    #[error("the environment '{0}' has no FUNCTION block in the configuration")]
    MissingFunctionBlock(String),

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read the configuration file.
    #[error("failed to read configuration: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse the configuration document.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Errors raised while building a deploy descriptor.
///
/// Validation happens before any remote call, so a failure here leaves
/// no partial remote state behind.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required function field is empty after defaulting.
    #[error("{0} is required")]
    MissingRequiredField(&'static str),

    /// The configured runtime identifier is not in the supported set.
    #[error("unsupported runtime: {0}")]
    UnsupportedRuntime(String),
}

/// Errors raised by object storage or the function platform.
///
/// "Function not found" during the existence check is NOT represented
/// here; absence is a normal outcome that selects the create branch.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// An object storage call failed.
    #[error("object storage {operation} failed: {message}")]
    Storage {
        /// The storage operation that failed.
        operation: &'static str,
        /// Error detail from the service.
        message: String,
    },

    /// A function platform call failed.
    #[error("function platform {operation} failed: {message}")]
    Platform {
        /// The platform operation that failed.
        operation: &'static str,
        /// Error detail from the service.
        message: String,
    },
}

/// Errors raised while packaging the artifact.
#[derive(Debug, Error)]
pub enum PackageError {
    /// A packaging subprocess could not be started.
    #[error("failed to start '{command}': {source}")]
    Spawn {
        /// The command that could not be started.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A packaging subprocess exited with a non-zero status.
    #[error("'{command}' exited with {status}")]
    CommandFailed {
        /// The command that failed.
        command: String,
        /// The exit status it reported.
        status: ExitStatus,
    },

    /// A packaging step was requested but has no configured command.
    #[error("no {0} command is configured")]
    MissingCommand(&'static str),

    /// Filesystem preparation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Umbrella error for a full deploy invocation.
///
/// Core code propagates these to the CLI boundary, which alone decides
/// exit behaviour.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Package(#[from] PackageError),
}

/// Result type alias for deploy operations.
pub type DeployResult<T> = Result<T, DeployError>;
