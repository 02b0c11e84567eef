//! Perigee CLI - package and deploy a function artifact.

mod commands;
mod console;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "perigee")]
#[command(about = "Package and deploy a function artifact")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured build script
    Build {
        /// Environment whose settings configure the build
        #[arg(short, long)]
        env: Option<String>,
    },

    /// Package the artifact and deploy it to the named environment
    Deploy {
        /// The environment to deploy, as configured in the config file
        #[arg(short, long)]
        env: String,
    },

    /// Invoke the deployed function
    Invoke {
        /// The environment the function was deployed to
        #[arg(short, long)]
        env: String,

        /// Payload fixture in the events folder, without extension
        #[arg(short, long, default_value = "empty")]
        payload: String,

        /// Invocation type: RequestResponse, Event, or DryRun
        #[arg(short = 't', long, default_value = "RequestResponse")]
        invocation_type: String,

        /// Log type: Tail or None
        #[arg(short, long, default_value = "Tail")]
        log_type: String,
    },

    /// Invoke the packaged handler locally
    Local {
        /// The environment whose variables are exported to the handler
        #[arg(short, long)]
        env: String,

        /// Payload fixture in the events folder, without extension
        #[arg(short, long, default_value = "empty")]
        payload: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), anyhow::Error> = match cli.command {
        Commands::Build { env } => commands::build::run(&cli.config, env.as_deref()).await,
        Commands::Deploy { env } => commands::deploy::run(&cli.config, &env).await,
        Commands::Invoke {
            env,
            payload,
            invocation_type,
            log_type,
        } => commands::invoke::run(&cli.config, &env, &payload, &invocation_type, &log_type).await,
        Commands::Local { env, payload } => {
            commands::local::run(&cli.config, &env, &payload).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
