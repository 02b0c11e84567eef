//! Deploy orchestration engine for perigee.
//!
//! This crate packages a function artifact and deploys it to a
//! serverless platform:
//! - Environment configuration resolution with typed accessors
//! - Artifact packaging via streamed subprocess steps
//! - A validated deploy descriptor built fresh per deploy
//! - The create-or-update orchestrator with sentinel-aware environment
//!   variable reconciliation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Environment  │───▶│  Descriptor  │───▶│   Deployer   │
//! │   Resolver   │    │   Builder    │    └──────────────┘
//! └──────────────┘    └──────────────┘           │
//!                                    ┌───────────┴───────────┐
//!                                    ▼                       ▼
//!                             ┌──────────────┐       ┌──────────────┐
//!                             │    Object    │       │   Function   │
//!                             │   Storage    │       │   Platform   │
//!                             └──────────────┘       └──────────────┘
//! ```
//!
//! The deployer is generic over the two platform seams; production uses
//! the AWS backends, tests use the in-memory ones.

pub mod artifact;
pub mod config;
pub mod deploy;
pub mod descriptor;
pub mod error;
pub mod platform;
pub mod reconcile;

// Re-export configuration types
pub use config::{ConfigValue, EnvironmentConfig, FUNCTION_KEY};

// Re-export error types
pub use error::{
    ConfigError, DeployError, DeployResult, PackageError, RemoteError, ValidationError,
};

// Re-export descriptor types
pub use descriptor::{DeployDescriptor, FunctionSpec, Runtime};

// Re-export orchestrator types
pub use deploy::{DeployAction, DeployOutcome, Deployer};

// Re-export reconciliation
pub use reconcile::{reconcile, SENTINEL};

// Re-export packaging types
pub use artifact::{ArtifactBuilder, PackageConfig};

// Re-export platform seams
pub use platform::{
    ensure_bucket, FunctionPlatform, InvocationType, InvokeOutcome, InvokeRequest, LogType,
    ObjectStorage, RemoteFunction,
};
