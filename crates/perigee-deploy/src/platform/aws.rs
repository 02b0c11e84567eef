//! AWS-backed implementations of the platform seams.
//!
//! Artifacts are staged in S3 and the function lives in Lambda. Both
//! clients are built from one shared [`SdkConfig`], with the region
//! taken from the environment configuration when it names one.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{Environment, FunctionCode};
use tracing::debug;

use crate::descriptor::DeployDescriptor;
use crate::error::RemoteError;
use crate::platform::{
    FunctionPlatform, InvokeOutcome, InvokeRequest, ObjectStorage, RemoteFunction,
};

/// Load the shared AWS configuration, overriding the region when the
/// environment names one.
pub async fn sdk_config(region: Option<String>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    loader.load().await
}

fn storage_error(operation: &'static str, message: impl ToString) -> RemoteError {
    RemoteError::Storage {
        operation,
        message: message.to_string(),
    }
}

fn platform_error(operation: &'static str, message: impl ToString) -> RemoteError {
    RemoteError::Platform {
        operation,
        message: message.to_string(),
    }
}

/// S3-backed artifact storage.
#[derive(Debug, Clone)]
pub struct AwsObjectStorage {
    client: aws_sdk_s3::Client,
}

impl AwsObjectStorage {
    /// Create a store from the shared AWS configuration.
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
        }
    }
}

#[async_trait]
impl ObjectStorage for AwsObjectStorage {
    async fn put(&self, bucket: &str, key: &str, artifact: &Path) -> Result<(), RemoteError> {
        let body = aws_sdk_s3::primitives::ByteStream::from_path(artifact)
            .await
            .map_err(|e| storage_error("put_object", e))?;

        debug!(bucket, key, artifact = %artifact.display(), "uploading object");
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| storage_error("put_object", aws_sdk_s3::error::DisplayErrorContext(e)))?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), RemoteError> {
        debug!(bucket, key, "deleting object");
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                storage_error("delete_object", aws_sdk_s3::error::DisplayErrorContext(e))
            })?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>, RemoteError> {
        let output = self.client.list_buckets().send().await.map_err(|e| {
            storage_error("list_buckets", aws_sdk_s3::error::DisplayErrorContext(e))
        })?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_owned))
            .collect())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), RemoteError> {
        debug!(bucket, "creating bucket");
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                storage_error("create_bucket", aws_sdk_s3::error::DisplayErrorContext(e))
            })?;
        Ok(())
    }
}

/// Lambda-backed function platform.
#[derive(Debug, Clone)]
pub struct AwsFunctionPlatform {
    client: aws_sdk_lambda::Client,
}

impl AwsFunctionPlatform {
    /// Create a platform client from the shared AWS configuration.
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_lambda::Client::new(config),
        }
    }
}

#[async_trait]
impl FunctionPlatform for AwsFunctionPlatform {
    async fn get_function(&self, name: &str) -> Result<Option<RemoteFunction>, RemoteError> {
        match self.client.get_function().function_name(name).send().await {
            Ok(output) => {
                let variables: BTreeMap<String, String> = output
                    .configuration()
                    .and_then(|configuration| configuration.environment())
                    .and_then(|environment| environment.variables())
                    .map(|variables| {
                        variables
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect()
                    })
                    .unwrap_or_default();

                Ok(Some(RemoteFunction {
                    function_name: name.to_owned(),
                    variables,
                }))
            }
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_resource_not_found_exception() {
                    // Absence selects the create branch; it is not an error.
                    return Ok(None);
                }
                Err(platform_error(
                    "get_function",
                    aws_sdk_lambda::error::DisplayErrorContext(service_error),
                ))
            }
        }
    }

    async fn create_function(&self, descriptor: &DeployDescriptor) -> Result<(), RemoteError> {
        let code = FunctionCode::builder()
            .s3_bucket(&descriptor.bucket)
            .s3_key(&descriptor.key)
            .build();

        let environment = Environment::builder()
            .set_variables(Some(descriptor.variables.clone().into_iter().collect()))
            .build();

        self.client
            .create_function()
            .function_name(&descriptor.function_name)
            .handler(&descriptor.handler)
            .role(&descriptor.role)
            .runtime(aws_sdk_lambda::types::Runtime::from(
                descriptor.runtime.as_str(),
            ))
            .memory_size(descriptor.memory_size)
            .timeout(descriptor.timeout)
            .description(&descriptor.description)
            .code(code)
            .environment(environment)
            .send()
            .await
            .map_err(|e| {
                platform_error(
                    "create_function",
                    aws_sdk_lambda::error::DisplayErrorContext(e),
                )
            })?;
        Ok(())
    }

    async fn update_function_configuration(
        &self,
        descriptor: &DeployDescriptor,
    ) -> Result<(), RemoteError> {
        let environment = Environment::builder()
            .set_variables(Some(descriptor.variables.clone().into_iter().collect()))
            .build();

        self.client
            .update_function_configuration()
            .function_name(&descriptor.function_name)
            .handler(&descriptor.handler)
            .role(&descriptor.role)
            .runtime(aws_sdk_lambda::types::Runtime::from(
                descriptor.runtime.as_str(),
            ))
            .memory_size(descriptor.memory_size)
            .timeout(descriptor.timeout)
            .description(&descriptor.description)
            .environment(environment)
            .send()
            .await
            .map_err(|e| {
                platform_error(
                    "update_function_configuration",
                    aws_sdk_lambda::error::DisplayErrorContext(e),
                )
            })?;
        Ok(())
    }

    async fn update_function_code(
        &self,
        function_name: &str,
        bucket: &str,
        key: &str,
    ) -> Result<(), RemoteError> {
        self.client
            .update_function_code()
            .function_name(function_name)
            .s3_bucket(bucket)
            .s3_key(key)
            .publish(true)
            .send()
            .await
            .map_err(|e| {
                platform_error(
                    "update_function_code",
                    aws_sdk_lambda::error::DisplayErrorContext(e),
                )
            })?;
        Ok(())
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeOutcome, RemoteError> {
        let output = self
            .client
            .invoke()
            .function_name(&request.function_name)
            .invocation_type(aws_sdk_lambda::types::InvocationType::from(
                request.invocation_type.as_str(),
            ))
            .log_type(aws_sdk_lambda::types::LogType::from(
                request.log_type.as_str(),
            ))
            .payload(Blob::new(request.payload))
            .send()
            .await
            .map_err(|e| platform_error("invoke", aws_sdk_lambda::error::DisplayErrorContext(e)))?;

        Ok(InvokeOutcome {
            status_code: output.status_code(),
            function_error: output.function_error().map(str::to_owned),
            payload: output
                .payload()
                .map(|blob| blob.as_ref().to_vec())
                .unwrap_or_default(),
            log_result: output.log_result().map(str::to_owned),
        })
    }
}
