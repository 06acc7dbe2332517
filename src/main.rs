// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use git_mdsync::utils::logging::{format_error, format_info, format_success, format_warning};
use git_mdsync::{AppState, Config, HealthStatus, IdentityResolver, SyncOrchestrator};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "git_mdsync")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "Git-backed markdown workspace server", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Use this storage namespace instead of the global git user.name
        #[arg(long, value_name = "NAME")]
        identity: Option<String>,
    },

    /// Print the storage namespace working copies are kept under
    Identity,

    /// Check storage and identity
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    git_mdsync::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Git Markdown Sync");
    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    match cli.command {
        Commands::Serve { port, identity } => {
            cmd_serve(config, port, identity).await?;
        }
        Commands::Identity => {
            cmd_identity(&config)?;
        }
        Commands::Health => {
            cmd_health(&config).await?;
        }
    }

    Ok(())
}

fn identity_resolver(config: &Config, identity: Option<String>) -> IdentityResolver {
    match identity {
        Some(name) => IdentityResolver::fixed(name),
        None => IdentityResolver::git_config(config.git.fallback_identity.clone()),
    }
}

async fn cmd_serve(mut config: Config, port: Option<u16>, identity: Option<String>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    let resolver = identity_resolver(&config, identity);
    let orchestrator = SyncOrchestrator::from_config(&config, resolver)
        .context("Failed to resolve storage directory")?;

    std::fs::create_dir_all(orchestrator.storage_root()).with_context(|| {
        format!(
            "Failed to create storage directory {}",
            orchestrator.storage_root().display()
        )
    })?;

    info!("Serving identity: {}", orchestrator.identity());
    info!("Allowed origin: {}", config.server.allowed_origin);

    git_mdsync::server::serve(AppState::new(config, orchestrator))
        .await
        .context("Server failed")?;

    Ok(())
}

fn cmd_identity(config: &Config) -> Result<()> {
    let resolver = identity_resolver(config, None);
    let identity = resolver.resolve();
    let root = config
        .storage_root()
        .context("Failed to resolve storage directory")?;

    if identity == resolver.fallback() {
        println!(
            "{}",
            format_warning(&format!(
                "git user.name is not set, using fallback identity '{}'",
                identity
            ))
        );
    } else {
        println!("{}", format_success(&format!("Identity: {}", identity)));
    }
    println!(
        "{}",
        format_info(&format!("Working copies: {}", root.join(&identity).display()))
    );

    Ok(())
}

async fn cmd_health(config: &Config) -> Result<()> {
    let resolver = identity_resolver(config, None);
    let orchestrator = SyncOrchestrator::from_config(config, resolver)
        .context("Failed to resolve storage directory")?;

    let report = orchestrator
        .health()
        .await
        .context("Health check failed")?;

    println!("\n{}", report.format());

    match report.status {
        HealthStatus::Healthy => println!("{}", format_success("All checks passed")),
        HealthStatus::Degraded => println!("{}", format_warning("Running with degraded checks")),
        HealthStatus::Unhealthy => {
            println!("{}", format_error("One or more checks failed"));
            return Err(anyhow::anyhow!("System is unhealthy"));
        }
    }

    Ok(())
}
