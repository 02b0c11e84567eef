//! Implementation of the `perigee local` command.
//!
//! Runs the packaged handler as a subprocess with the resolved
//! environment variables exported, passing the event JSON, a context
//! JSON, and the environment name as positional arguments. The
//! handler's single JSON response is forwarded to stdout verbatim.

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use perigee_deploy::EnvironmentConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::commands::read_event_fixture;

/// The handler binary run when the environment does not configure one.
const DEFAULT_HANDLER: &str = "target/release/perigee-runtime";

pub async fn run(config_path: &Path, environment: &str, payload: &str) -> Result<()> {
    let config = EnvironmentConfig::load(config_path, environment)?;

    let event = String::from_utf8(read_event_fixture(payload)?)
        .context("the event fixture is not valid UTF-8")?;
    let context = "{}";

    let handler = config
        .string("LOCAL_HANDLER")
        .unwrap_or_else(|| DEFAULT_HANDLER.to_owned());

    let mut child = Command::new(&handler)
        .arg(&event)
        .arg(context)
        .arg(environment)
        .envs(config.deploy_variables())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start local handler '{handler}'"))?;

    let stdout_task = child.stdout.take().map(|stdout| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                println!("{line}");
            }
        })
    });
    let stderr_task = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{line}");
            }
        })
    });

    let status = child.wait().await?;
    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    if let Some(task) = stderr_task {
        let _ = task.await;
    }

    if !status.success() {
        bail!("local handler exited with {status}");
    }
    Ok(())
}
