//! Trait seams for the external services a deploy talks to.
//!
//! The orchestrator is generic over these traits. The [`aws`] module
//! provides the real backends; the [`memory`] module provides in-memory
//! backends for tests and local development.

pub mod aws;
pub mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::descriptor::DeployDescriptor;
use crate::error::RemoteError;

/// A read view of an existing remote function.
///
/// Fetched lazily during the existence check and used only for
/// reconciliation. The remote resource is not locked; it may change
/// concurrently between the check and the update.
#[derive(Debug, Clone)]
pub struct RemoteFunction {
    /// The remote function's name.
    pub function_name: String,
    /// The remote function's current environment variables.
    pub variables: BTreeMap<String, String>,
}

/// How an invocation should be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationType {
    /// Synchronous request/response.
    RequestResponse,
    /// Asynchronous event.
    Event,
    /// Validation only, no execution.
    DryRun,
}

impl InvocationType {
    /// The platform identifier for this invocation type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestResponse => "RequestResponse",
            Self::Event => "Event",
            Self::DryRun => "DryRun",
        }
    }

    /// Parse a platform identifier.
    pub fn parse(identifier: &str) -> Option<Self> {
        match identifier {
            "RequestResponse" => Some(Self::RequestResponse),
            "Event" => Some(Self::Event),
            "DryRun" => Some(Self::DryRun),
            _ => None,
        }
    }
}

impl fmt::Display for InvocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the invocation should return a log tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    /// Return the last few kilobytes of execution log.
    Tail,
    /// No log capture.
    None,
}

impl LogType {
    /// The platform identifier for this log type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tail => "Tail",
            Self::None => "None",
        }
    }

    /// Parse a platform identifier.
    pub fn parse(identifier: &str) -> Option<Self> {
        match identifier {
            "Tail" => Some(Self::Tail),
            "None" => Some(Self::None),
            _ => None,
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to invoke a deployed function.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    /// The function to invoke.
    pub function_name: String,
    /// Synchronous, asynchronous, or dry-run.
    pub invocation_type: InvocationType,
    /// Whether to capture a log tail.
    pub log_type: LogType,
    /// The raw JSON payload.
    pub payload: Vec<u8>,
}

/// The outcome of a remote invocation.
#[derive(Debug, Clone)]
pub struct InvokeOutcome {
    /// HTTP status code of the invocation.
    pub status_code: i32,
    /// Set when the function itself raised an error.
    pub function_error: Option<String>,
    /// The raw response payload.
    pub payload: Vec<u8>,
    /// Base64-encoded log tail, when requested.
    pub log_result: Option<String>,
}

/// Object storage holding staged deploy artifacts.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store a local artifact at the given bucket and key.
    async fn put(&self, bucket: &str, key: &str, artifact: &Path) -> Result<(), RemoteError>;

    /// Delete the object at the given bucket and key.
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), RemoteError>;

    /// List the names of all buckets.
    async fn list_buckets(&self) -> Result<Vec<String>, RemoteError>;

    /// Create a bucket.
    async fn create_bucket(&self, bucket: &str) -> Result<(), RemoteError>;
}

/// The function execution platform.
#[async_trait]
pub trait FunctionPlatform: Send + Sync {
    /// Fetch an existing function, `Ok(None)` when it does not exist.
    ///
    /// Absence is a normal outcome selecting the create branch, never
    /// an error.
    async fn get_function(&self, name: &str) -> Result<Option<RemoteFunction>, RemoteError>;

    /// Create a new function from the descriptor.
    async fn create_function(&self, descriptor: &DeployDescriptor) -> Result<(), RemoteError>;

    /// Update an existing function's non-code configuration, including
    /// its environment variables.
    async fn update_function_configuration(
        &self,
        descriptor: &DeployDescriptor,
    ) -> Result<(), RemoteError>;

    /// Point an existing function at the staged artifact, publishing a
    /// new immutable version.
    async fn update_function_code(
        &self,
        function_name: &str,
        bucket: &str,
        key: &str,
    ) -> Result<(), RemoteError>;

    /// Invoke a deployed function.
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeOutcome, RemoteError>;
}

/// Create the staging bucket if it does not already exist.
///
/// Returns `true` when the bucket was created. This is a distinct
/// provisioning path; the main deploy flow assumes the bucket exists.
pub async fn ensure_bucket<S>(storage: &S, bucket: &str) -> Result<bool, RemoteError>
where
    S: ObjectStorage + ?Sized,
{
    let buckets = storage.list_buckets().await?;
    if buckets.iter().any(|name| name == bucket) {
        return Ok(false);
    }

    storage.create_bucket(bucket).await?;
    Ok(true)
}
