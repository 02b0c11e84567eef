//! In-memory backends for testing and local development.
//!
//! Both backends record enough bookkeeping (object counts, call
//! counters, injected failures) for orchestrator tests to assert on the
//! exact sequence of remote effects without a network.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::descriptor::DeployDescriptor;
use crate::error::RemoteError;
use crate::platform::{
    FunctionPlatform, InvokeOutcome, InvokeRequest, ObjectStorage, RemoteFunction,
};

#[derive(Debug, Default)]
struct StorageState {
    buckets: Vec<String>,
    objects: BTreeMap<(String, String), PathBuf>,
    puts: usize,
    deletes: usize,
}

/// In-memory object storage.
///
/// Objects are recorded by bucket and key; the artifact bytes are not
/// retained. Deleting a missing key succeeds, matching the remote
/// service's idempotent delete.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStorage {
    state: Arc<RwLock<StorageState>>,
}

impl MemoryObjectStorage {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently stored.
    pub async fn object_count(&self) -> usize {
        self.state.read().await.objects.len()
    }

    /// Whether an object exists at the given bucket and key.
    pub async fn has_object(&self, bucket: &str, key: &str) -> bool {
        self.state
            .read()
            .await
            .objects
            .contains_key(&(bucket.to_owned(), key.to_owned()))
    }

    /// Total number of put calls observed.
    pub async fn puts(&self) -> usize {
        self.state.read().await.puts
    }

    /// Total number of delete calls observed.
    pub async fn deletes(&self) -> usize {
        self.state.read().await.deletes
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put(&self, bucket: &str, key: &str, artifact: &Path) -> Result<(), RemoteError> {
        let mut state = self.state.write().await;
        state.puts += 1;
        state
            .objects
            .insert((bucket.to_owned(), key.to_owned()), artifact.to_owned());
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), RemoteError> {
        let mut state = self.state.write().await;
        state.deletes += 1;
        state.objects.remove(&(bucket.to_owned(), key.to_owned()));
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self.state.read().await.buckets.clone())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), RemoteError> {
        self.state.write().await.buckets.push(bucket.to_owned());
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StoredFunction {
    variables: BTreeMap<String, String>,
    code: Option<(String, String)>,
    published_versions: usize,
}

#[derive(Debug, Default)]
struct PlatformState {
    functions: BTreeMap<String, StoredFunction>,
    creates: usize,
    configuration_updates: usize,
    code_updates: usize,
    get_function_failure: Option<String>,
    create_failure: Option<String>,
    code_update_failure: Option<String>,
}

/// In-memory function platform.
#[derive(Debug, Clone, Default)]
pub struct MemoryFunctionPlatform {
    state: Arc<RwLock<PlatformState>>,
}

impl MemoryFunctionPlatform {
    /// Creates a platform with no functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing function with the given environment variables.
    pub async fn insert_function(&self, name: &str, variables: BTreeMap<String, String>) {
        self.state.write().await.functions.insert(
            name.to_owned(),
            StoredFunction {
                variables,
                code: None,
                published_versions: 0,
            },
        );
    }

    /// Make every subsequent `get_function` call fail with the given
    /// message (a permissions or network failure, not "not found").
    pub async fn fail_get_function(&self, message: &str) {
        self.state.write().await.get_function_failure = Some(message.to_owned());
    }

    /// Make every subsequent `create_function` call fail.
    pub async fn fail_create_function(&self, message: &str) {
        self.state.write().await.create_failure = Some(message.to_owned());
    }

    /// Make every subsequent `update_function_code` call fail, leaving
    /// configuration updates in place.
    pub async fn fail_update_function_code(&self, message: &str) {
        self.state.write().await.code_update_failure = Some(message.to_owned());
    }

    /// The stored variables of a function, if it exists.
    pub async fn variables_of(&self, name: &str) -> Option<BTreeMap<String, String>> {
        self.state
            .read()
            .await
            .functions
            .get(name)
            .map(|f| f.variables.clone())
    }

    /// The code location the function currently points at.
    pub async fn code_of(&self, name: &str) -> Option<(String, String)> {
        self.state
            .read()
            .await
            .functions
            .get(name)
            .and_then(|f| f.code.clone())
    }

    /// How many immutable versions the function has published.
    pub async fn published_versions_of(&self, name: &str) -> usize {
        self.state
            .read()
            .await
            .functions
            .get(name)
            .map_or(0, |f| f.published_versions)
    }

    /// Total number of create calls observed.
    pub async fn creates(&self) -> usize {
        self.state.read().await.creates
    }

    /// Total number of configuration update calls observed.
    pub async fn configuration_updates(&self) -> usize {
        self.state.read().await.configuration_updates
    }

    /// Total number of code update calls observed.
    pub async fn code_updates(&self) -> usize {
        self.state.read().await.code_updates
    }
}

#[async_trait]
impl FunctionPlatform for MemoryFunctionPlatform {
    async fn get_function(&self, name: &str) -> Result<Option<RemoteFunction>, RemoteError> {
        let state = self.state.read().await;

        if let Some(message) = &state.get_function_failure {
            return Err(RemoteError::Platform {
                operation: "get_function",
                message: message.clone(),
            });
        }

        Ok(state.functions.get(name).map(|stored| RemoteFunction {
            function_name: name.to_owned(),
            variables: stored.variables.clone(),
        }))
    }

    async fn create_function(&self, descriptor: &DeployDescriptor) -> Result<(), RemoteError> {
        let mut state = self.state.write().await;
        state.creates += 1;

        if let Some(message) = &state.create_failure {
            return Err(RemoteError::Platform {
                operation: "create_function",
                message: message.clone(),
            });
        }

        if state.functions.contains_key(&descriptor.function_name) {
            return Err(RemoteError::Platform {
                operation: "create_function",
                message: format!("function '{}' already exists", descriptor.function_name),
            });
        }

        state.functions.insert(
            descriptor.function_name.clone(),
            StoredFunction {
                variables: descriptor.variables.clone(),
                code: Some((descriptor.bucket.clone(), descriptor.key.clone())),
                published_versions: 1,
            },
        );
        Ok(())
    }

    async fn update_function_configuration(
        &self,
        descriptor: &DeployDescriptor,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.write().await;
        state.configuration_updates += 1;

        match state.functions.get_mut(&descriptor.function_name) {
            Some(stored) => {
                stored.variables = descriptor.variables.clone();
                Ok(())
            }
            None => Err(RemoteError::Platform {
                operation: "update_function_configuration",
                message: format!("function '{}' does not exist", descriptor.function_name),
            }),
        }
    }

    async fn update_function_code(
        &self,
        function_name: &str,
        bucket: &str,
        key: &str,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.write().await;
        state.code_updates += 1;

        if let Some(message) = &state.code_update_failure {
            return Err(RemoteError::Platform {
                operation: "update_function_code",
                message: message.clone(),
            });
        }

        match state.functions.get_mut(function_name) {
            Some(stored) => {
                stored.code = Some((bucket.to_owned(), key.to_owned()));
                stored.published_versions += 1;
                Ok(())
            }
            None => Err(RemoteError::Platform {
                operation: "update_function_code",
                message: format!("function '{function_name}' does not exist"),
            }),
        }
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeOutcome, RemoteError> {
        let state = self.state.read().await;

        if !state.functions.contains_key(&request.function_name) {
            return Err(RemoteError::Platform {
                operation: "invoke",
                message: format!("function '{}' does not exist", request.function_name),
            });
        }

        Ok(InvokeOutcome {
            status_code: 200,
            function_error: None,
            payload: request.payload,
            log_result: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[tokio::test]
    async fn put_then_delete_leaves_no_objects() {
        let storage = MemoryObjectStorage::new();
        let artifact = PathBuf::from("/tmp/deploy.zip");

        storage.put("bucket", "key", &artifact).await.unwrap();
        assert!(storage.has_object("bucket", "key").await);

        storage.delete("bucket", "key").await.unwrap();
        assert_eq!(storage.object_count().await, 0);
        assert_eq!(storage.puts().await, 1);
        assert_eq!(storage.deletes().await, 1);
    }

    #[tokio::test]
    async fn delete_of_missing_key_succeeds() {
        let storage = MemoryObjectStorage::new();
        storage.delete("bucket", "missing").await.unwrap();
        assert_eq!(storage.deletes().await, 1);
    }

    #[tokio::test]
    async fn get_function_absence_is_none() {
        let platform = MemoryFunctionPlatform::new();
        assert!(platform.get_function("orders").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_failure_is_an_error_not_absence() {
        let platform = MemoryFunctionPlatform::new();
        platform.fail_get_function("access denied").await;

        let err = platform.get_function("orders").await.unwrap_err();
        match err {
            RemoteError::Platform { operation, message } => {
                assert_eq!(operation, "get_function");
                assert_eq!(message, "access denied");
            }
            other => panic!("expected Platform error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn code_update_publishes_a_new_version() {
        let platform = MemoryFunctionPlatform::new();
        platform.insert_function("orders", BTreeMap::new()).await;

        platform
            .update_function_code("orders", "bucket", "key-1")
            .await
            .unwrap();
        platform
            .update_function_code("orders", "bucket", "key-2")
            .await
            .unwrap();

        assert_eq!(
            platform.code_of("orders").await,
            Some(("bucket".to_owned(), "key-2".to_owned()))
        );
        assert_eq!(platform.code_updates().await, 2);
        assert_eq!(platform.published_versions_of("orders").await, 2);
    }
}
