//! Implementation of the `perigee build` command.

use std::path::Path;

use anyhow::Result;
use perigee_deploy::{ArtifactBuilder, EnvironmentConfig, PackageConfig};

use crate::console;

pub async fn run(config_path: &Path, environment: Option<&str>) -> Result<()> {
    let package = match environment {
        Some(environment) => {
            let config = EnvironmentConfig::load(config_path, environment)?;
            PackageConfig::from_environment(&config)
        }
        None => PackageConfig::default(),
    };

    console::spacer();
    console::divider();
    console::header("Start build");
    console::divider();

    ArtifactBuilder::new(package).compile().await?;

    console::divider();
    console::header("Build complete");
    console::divider();
    Ok(())
}
