//! The deploy orchestrator.
//!
//! Drives one deploy through a linear protocol with a single branch:
//!
//! ```text
//! UPLOAD -> CHECK_EXISTS -> {CREATE | UPDATE} -> CLEANUP -> DONE
//! ```
//!
//! Every remote failure abandons the whole deploy at the point it
//! occurred; there are no retries and no compensation of steps already
//! completed. The operator inspects the failure and re-runs explicitly.

use std::path::Path;

use tracing::info;

use crate::descriptor::DeployDescriptor;
use crate::error::DeployResult;
use crate::platform::{FunctionPlatform, ObjectStorage, RemoteFunction};
use crate::reconcile::reconcile;

/// Which branch a deploy took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    /// No function existed; a new one was created.
    Created,
    /// An existing function was reconciled and updated.
    Updated,
}

/// The result of a completed deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOutcome {
    /// Which branch ran.
    pub action: DeployAction,
}

/// Executes the deploy protocol against the two platform seams.
pub struct Deployer<'a, S, P> {
    storage: &'a S,
    platform: &'a P,
}

impl<'a, S, P> Deployer<'a, S, P>
where
    S: ObjectStorage,
    P: FunctionPlatform,
{
    /// Create an orchestrator over the given backends.
    pub fn new(storage: &'a S, platform: &'a P) -> Self {
        Self { storage, platform }
    }

    /// Run one deploy of the packaged artifact described by the
    /// descriptor.
    ///
    /// The artifact is staged in object storage first and deleted again
    /// after a successful create or update, whichever branch ran. When
    /// the existence check or the chosen branch fails, the staged
    /// artifact is deliberately left in place for diagnosis.
    pub async fn deploy(
        &self,
        descriptor: &DeployDescriptor,
        artifact: &Path,
    ) -> DeployResult<DeployOutcome> {
        info!(
            bucket = %descriptor.bucket,
            key = %descriptor.key,
            artifact = %artifact.display(),
            "uploading artifact"
        );
        self.storage
            .put(&descriptor.bucket, &descriptor.key, artifact)
            .await?;

        info!(function = %descriptor.function_name, "checking whether the function exists");
        let existing = self.platform.get_function(&descriptor.function_name).await?;

        let action = match existing {
            Some(remote) => {
                info!(function = %descriptor.function_name, "function exists, updating");
                self.update(descriptor, &remote).await?;
                DeployAction::Updated
            }
            None => {
                info!(function = %descriptor.function_name, "function does not exist, creating");
                self.platform.create_function(descriptor).await?;
                DeployAction::Created
            }
        };

        info!(
            bucket = %descriptor.bucket,
            key = %descriptor.key,
            "deleting staged artifact"
        );
        self.storage
            .delete(&descriptor.bucket, &descriptor.key)
            .await?;

        Ok(DeployOutcome { action })
    }

    /// Update branch: reconcile variables against the remote state,
    /// push the configuration, then point the code at the staged
    /// artifact with publish semantics.
    ///
    /// The two calls are not transactional. A failure between them
    /// leaves updated configuration with stale code; this is surfaced
    /// as a fatal error and never rolled back.
    async fn update(
        &self,
        descriptor: &DeployDescriptor,
        remote: &RemoteFunction,
    ) -> DeployResult<()> {
        let variables = reconcile(&descriptor.variables, &remote.variables);
        let reconciled = DeployDescriptor {
            variables,
            ..descriptor.clone()
        };

        self.platform
            .update_function_configuration(&reconciled)
            .await?;
        self.platform
            .update_function_code(&descriptor.function_name, &descriptor.bucket, &descriptor.key)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::descriptor::FunctionSpec;
    use crate::error::DeployError;
    use crate::platform::memory::{MemoryFunctionPlatform, MemoryObjectStorage};
    use crate::reconcile::SENTINEL;

    fn descriptor(variables: &[(&str, &str)]) -> DeployDescriptor {
        let spec = FunctionSpec {
            function_name: "f1".to_owned(),
            handler: "h".to_owned(),
            role: "r".to_owned(),
            runtime: Some("python3.6".to_owned()),
            memory_size: None,
            timeout: None,
            description: None,
        };
        let variables = variables
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap();
        DeployDescriptor::build(&spec, variables, now).unwrap()
    }

    fn artifact() -> PathBuf {
        PathBuf::from(".deploy/deploy.zip")
    }

    #[tokio::test]
    async fn fresh_function_takes_the_create_branch() {
        let storage = MemoryObjectStorage::new();
        let platform = MemoryFunctionPlatform::new();
        let descriptor = descriptor(&[("REGION", "us-east-1")]);

        let outcome = Deployer::new(&storage, &platform)
            .deploy(&descriptor, &artifact())
            .await
            .unwrap();

        assert_eq!(outcome.action, DeployAction::Created);
        assert_eq!(platform.creates().await, 1);
        assert_eq!(platform.configuration_updates().await, 0);

        // One upload, then cleanup: nothing left under the key.
        assert_eq!(storage.puts().await, 1);
        assert_eq!(storage.object_count().await, 0);
    }

    #[tokio::test]
    async fn existing_function_takes_the_update_branch() {
        let storage = MemoryObjectStorage::new();
        let platform = MemoryFunctionPlatform::new();
        platform.insert_function("f1", BTreeMap::new()).await;

        let descriptor = descriptor(&[]);
        let outcome = Deployer::new(&storage, &platform)
            .deploy(&descriptor, &artifact())
            .await
            .unwrap();

        assert_eq!(outcome.action, DeployAction::Updated);
        assert_eq!(platform.creates().await, 0);
        assert_eq!(platform.configuration_updates().await, 1);
        assert_eq!(platform.code_updates().await, 1);
        assert_eq!(
            platform.code_of("f1").await,
            Some((descriptor.bucket.clone(), descriptor.key.clone()))
        );
    }

    #[tokio::test]
    async fn update_preserves_sentinel_variables() {
        let storage = MemoryObjectStorage::new();
        let platform = MemoryFunctionPlatform::new();
        platform
            .insert_function(
                "f1",
                [("DB_PASS".to_owned(), "rotated".to_owned())].into(),
            )
            .await;

        let descriptor = descriptor(&[("DB_PASS", SENTINEL), ("REGION", "us-east-1")]);
        Deployer::new(&storage, &platform)
            .deploy(&descriptor, &artifact())
            .await
            .unwrap();

        let variables = platform.variables_of("f1").await.unwrap();
        assert_eq!(variables.get("DB_PASS").map(String::as_str), Some("rotated"));
        assert_eq!(
            variables.get("REGION").map(String::as_str),
            Some("us-east-1")
        );
    }

    #[tokio::test]
    async fn repeated_deploys_do_not_accumulate_artifacts() {
        let storage = MemoryObjectStorage::new();
        let platform = MemoryFunctionPlatform::new();
        platform.insert_function("f1", BTreeMap::new()).await;

        let deployer = Deployer::new(&storage, &platform);
        for _ in 0..2 {
            let outcome = deployer.deploy(&descriptor(&[]), &artifact()).await.unwrap();
            assert_eq!(outcome.action, DeployAction::Updated);
        }

        assert_eq!(storage.puts().await, 2);
        assert_eq!(storage.deletes().await, 2);
        assert_eq!(storage.object_count().await, 0);
        assert_eq!(platform.code_updates().await, 2);
    }

    #[tokio::test]
    async fn existence_check_failure_aborts_before_cleanup() {
        let storage = MemoryObjectStorage::new();
        let platform = MemoryFunctionPlatform::new();
        platform.fail_get_function("access denied").await;

        let descriptor = descriptor(&[]);
        let err = Deployer::new(&storage, &platform)
            .deploy(&descriptor, &artifact())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Remote(_)));

        // The uploaded artifact stays behind for diagnosis.
        assert!(storage.has_object(&descriptor.bucket, &descriptor.key).await);
        assert_eq!(storage.deletes().await, 0);
        assert_eq!(platform.creates().await, 0);
    }

    #[tokio::test]
    async fn create_failure_leaves_the_artifact_in_place() {
        let storage = MemoryObjectStorage::new();
        let platform = MemoryFunctionPlatform::new();
        platform.fail_create_function("quota exceeded").await;

        let descriptor = descriptor(&[]);
        let err = Deployer::new(&storage, &platform)
            .deploy(&descriptor, &artifact())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Remote(_)));

        assert!(storage.has_object(&descriptor.bucket, &descriptor.key).await);
        assert_eq!(storage.deletes().await, 0);
    }

    #[tokio::test]
    async fn code_update_failure_leaves_mixed_state_uncompensated() {
        let storage = MemoryObjectStorage::new();
        let platform = MemoryFunctionPlatform::new();
        platform
            .insert_function("f1", [("A".to_owned(), "old".to_owned())].into())
            .await;
        platform.fail_update_function_code("throttled").await;

        let descriptor = descriptor(&[("A", "new")]);
        let err = Deployer::new(&storage, &platform)
            .deploy(&descriptor, &artifact())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Remote(_)));

        // The configuration update already landed and is not rolled
        // back; the staged artifact stays behind.
        let variables = platform.variables_of("f1").await.unwrap();
        assert_eq!(variables.get("A").map(String::as_str), Some("new"));
        assert!(platform.code_of("f1").await.is_none());
        assert!(storage.has_object(&descriptor.bucket, &descriptor.key).await);
    }

    #[tokio::test]
    async fn update_keys_absent_from_desired_are_dropped() {
        let storage = MemoryObjectStorage::new();
        let platform = MemoryFunctionPlatform::new();
        platform
            .insert_function("f1", [("ORPHAN".to_owned(), "old".to_owned())].into())
            .await;

        Deployer::new(&storage, &platform)
            .deploy(&descriptor(&[("KEEP", "1")]), &artifact())
            .await
            .unwrap();

        let variables = platform.variables_of("f1").await.unwrap();
        assert!(!variables.contains_key("ORPHAN"));
        assert_eq!(variables.get("KEEP").map(String::as_str), Some("1"));
    }
}
