//! Implementation of the `perigee invoke` command.

use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use perigee_deploy::platform::aws::{sdk_config, AwsFunctionPlatform};
use perigee_deploy::{
    EnvironmentConfig, FunctionPlatform, InvocationType, InvokeRequest, LogType,
};

use crate::commands::read_event_fixture;
use crate::console;

pub async fn run(
    config_path: &Path,
    environment: &str,
    payload: &str,
    invocation_type: &str,
    log_type: &str,
) -> Result<()> {
    let config = EnvironmentConfig::load(config_path, environment)?;
    let spec = config.require_function()?;

    let invocation_type = InvocationType::parse(invocation_type)
        .with_context(|| format!("invalid invocation type: {invocation_type}"))?;
    let log_type =
        LogType::parse(log_type).with_context(|| format!("invalid log type: {log_type}"))?;
    let payload = read_event_fixture(payload)?;

    let sdk = sdk_config(config.string("REGION")).await;
    let platform = AwsFunctionPlatform::new(&sdk);

    let outcome = platform
        .invoke(InvokeRequest {
            function_name: spec.function_name.clone(),
            invocation_type,
            log_type,
            payload,
        })
        .await?;

    console::spacer();
    console::divider();
    console::header("Invocation results");
    console::line(&format!("status code    : {}", outcome.status_code));
    console::line(&format!(
        "function error : {}",
        outcome.function_error.as_deref().unwrap_or("none")
    ));

    console::divider();
    console::header("Payload");
    match serde_json::from_slice::<serde_json::Value>(&outcome.payload) {
        Ok(value) => {
            let pretty = serde_json::to_string_pretty(&value)?;
            for line in pretty.lines() {
                console::line(line);
            }
        }
        Err(_) => console::line(&String::from_utf8_lossy(&outcome.payload)),
    }

    if let Some(encoded) = &outcome.log_result {
        console::divider();
        console::header("Log results");
        let decoded = STANDARD
            .decode(encoded)
            .context("the invocation log was not valid base64")?;
        for line in String::from_utf8_lossy(&decoded).lines() {
            console::line(line);
        }
    }
    console::spacer();
    Ok(())
}
