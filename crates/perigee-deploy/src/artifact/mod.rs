//! Artifact packaging.
//!
//! Builds the deployable archive the orchestrator uploads. The build,
//! install, and zip steps are external commands run as blocking
//! subprocesses with stdout and stderr streamed line-by-line as they
//! arrive; the rest of the pipeline only depends on the resulting
//! archive path.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::EnvironmentConfig;
use crate::error::PackageError;

/// Settings for the packaging pipeline.
///
/// Commands are argv vectors; `None` disables the step.
#[derive(Debug, Clone)]
pub struct PackageConfig {
    /// Directory the archive is staged in.
    pub staging_dir: PathBuf,

    /// File name of the archive inside the staging directory.
    pub archive_name: String,

    /// Paths included in the archive, relative to the working directory.
    pub include: Vec<String>,

    /// Dependency install command run before zipping.
    pub install: Option<Vec<String>>,

    /// Command run after zipping to restore the development state.
    pub reset: Option<Vec<String>>,

    /// Build script for the `build` subcommand.
    pub compile: Option<Vec<String>>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from(".deploy"),
            archive_name: "deploy.zip".to_owned(),
            include: vec![
                "config.yml".to_owned(),
                "events".to_owned(),
                "handler".to_owned(),
            ],
            install: None,
            reset: None,
            compile: Some(vec!["sh".to_owned(), "./build.sh".to_owned()]),
        }
    }
}

impl PackageConfig {
    /// Derive packaging settings from the environment configuration.
    ///
    /// Recognised keys: `PACKAGE_INCLUDE` (comma-separated paths),
    /// `PACKAGE_INSTALL`, `PACKAGE_RESET`, and `COMPILE_COMMAND`
    /// (whitespace-separated argv). Unset keys keep the defaults.
    pub fn from_environment(config: &EnvironmentConfig) -> Self {
        let mut package = Self::default();

        if let Some(include) = config.string("PACKAGE_INCLUDE") {
            package.include = include
                .split(',')
                .map(|path| path.trim().to_owned())
                .filter(|path| !path.is_empty())
                .collect();
        }
        if let Some(install) = config.string("PACKAGE_INSTALL") {
            package.install = parse_argv(&install);
        }
        if let Some(reset) = config.string("PACKAGE_RESET") {
            package.reset = parse_argv(&reset);
        }
        if let Some(compile) = config.string("COMPILE_COMMAND") {
            package.compile = parse_argv(&compile);
        }

        package
    }
}

fn parse_argv(command: &str) -> Option<Vec<String>> {
    let argv: Vec<String> = command.split_whitespace().map(str::to_owned).collect();
    if argv.is_empty() {
        None
    } else {
        Some(argv)
    }
}

/// Produces the deployable archive.
pub struct ArtifactBuilder {
    config: PackageConfig,
}

impl ArtifactBuilder {
    /// Create a builder with the given packaging settings.
    pub fn new(config: PackageConfig) -> Self {
        Self { config }
    }

    /// The path the packaged archive lands at.
    pub fn archive_path(&self) -> PathBuf {
        self.config.staging_dir.join(&self.config.archive_name)
    }

    /// Run the full packaging pipeline and return the archive path.
    ///
    /// Prepares the staging directory, runs the install command if one
    /// is configured, then zips the include list.
    pub async fn package(&self) -> Result<PathBuf, PackageError> {
        self.prepare()?;

        if let Some(install) = &self.config.install {
            run_streamed(install).await?;
        }

        self.zip().await?;
        Ok(self.archive_path())
    }

    /// Run the configured build script, streaming its output.
    pub async fn compile(&self) -> Result<(), PackageError> {
        match &self.config.compile {
            Some(compile) => run_streamed(compile).await,
            None => Err(PackageError::MissingCommand("compile")),
        }
    }

    /// Restore the development state after packaging, when configured.
    pub async fn reset(&self) -> Result<(), PackageError> {
        if let Some(reset) = &self.config.reset {
            run_streamed(reset).await?;
        }
        Ok(())
    }

    /// Ensure the staging directory exists and remove a stale archive.
    fn prepare(&self) -> Result<(), PackageError> {
        std::fs::create_dir_all(&self.config.staging_dir)?;

        let archive = self.archive_path();
        if archive.exists() {
            std::fs::remove_file(&archive)?;
        }
        Ok(())
    }

    async fn zip(&self) -> Result<(), PackageError> {
        let archive = self.archive_path();
        let mut argv = vec![
            "zip".to_owned(),
            "-9r".to_owned(),
            archive.to_string_lossy().into_owned(),
        ];
        argv.extend(self.config.include.iter().cloned());

        run_streamed(&argv).await
    }
}

/// Run a command, streaming stdout and stderr line-by-line as they
/// arrive. Fails on a non-zero exit status.
async fn run_streamed(argv: &[String]) -> Result<(), PackageError> {
    let (program, args) = match argv.split_first() {
        Some(parts) => parts,
        None => return Err(PackageError::MissingCommand("package")),
    };
    let command_line = argv.join(" ");

    info!(command = %command_line, "running");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| PackageError::Spawn {
            command: command_line.clone(),
            source,
        })?;

    let stdout_task = child
        .stdout
        .take()
        .map(|stdout| tokio::spawn(stream_lines(stdout, false)));
    let stderr_task = child
        .stderr
        .take()
        .map(|stderr| tokio::spawn(stream_lines(stderr, true)));

    let status = child.wait().await?;

    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    if let Some(task) = stderr_task {
        let _ = task.await;
    }

    if !status.success() {
        return Err(PackageError::CommandFailed {
            command: command_line,
            status,
        });
    }
    Ok(())
}

async fn stream_lines<R>(reader: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if is_stderr {
            warn!("{line}");
        } else {
            info!("{line}");
        }
    }
}
