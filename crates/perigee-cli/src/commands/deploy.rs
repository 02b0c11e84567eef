//! Implementation of the `perigee deploy` command.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use perigee_deploy::platform::aws::{sdk_config, AwsFunctionPlatform, AwsObjectStorage};
use perigee_deploy::{
    ArtifactBuilder, DeployAction, DeployDescriptor, Deployer, EnvironmentConfig, PackageConfig,
};

use crate::console;

pub async fn run(config_path: &Path, environment: &str) -> Result<()> {
    console::spacer();
    console::header("Loading configuration");
    let config = EnvironmentConfig::load(config_path, environment)?;
    let spec = config.require_function()?.clone();

    console::header("Packaging artifact");
    let builder = ArtifactBuilder::new(PackageConfig::from_environment(&config));
    let artifact = builder.package().await?;
    console::line(&format!("packaged {}", artifact.display()));

    console::header("Restore development state");
    builder.reset().await?;

    // Validation happens before any remote call is made.
    let descriptor = DeployDescriptor::build(&spec, config.deploy_variables(), Utc::now())?;

    console::header("Lambda function");
    let sdk = sdk_config(config.string("REGION")).await;
    let storage = AwsObjectStorage::new(&sdk);
    let platform = AwsFunctionPlatform::new(&sdk);

    let outcome = Deployer::new(&storage, &platform)
        .deploy(&descriptor, &artifact)
        .await?;

    match outcome.action {
        DeployAction::Created => {
            console::line("Lambda function DOES NOT exist");
            console::line(&format!("created function '{}'", descriptor.function_name));
        }
        DeployAction::Updated => {
            console::line("Lambda function exists");
            console::line(&format!("updated function '{}'", descriptor.function_name));
        }
    }

    console::spacer();
    console::divider();
    console::header("Deploy complete");
    console::divider();
    console::spacer();
    Ok(())
}
