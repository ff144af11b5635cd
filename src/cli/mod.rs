mod config;

pub use config::RunnerConfig;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::agents::AgentRegistry;
use crate::api::AppState;
use crate::engine::RunCoordinator;
use crate::engine::coordinator::{DEFAULT_LOCK_TIMEOUT, timeout_from_secs};
use crate::engine::types::{LockScope, RunStatus};
use crate::storage::memory_store::MemoryStatusStore;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(
    name = "agent-runner",
    version,
    about = "Run background agents per user and poll their status"
)]
pub struct Cli {
    /// Path to a .env file to load (default: auto-detect .env in cwd)
    #[arg(long, global = true)]
    dotenv: Option<PathBuf>,

    /// Path to a YAML config file (default: auto-detect agent-runner.yaml in cwd)
    #[arg(long, global = true, env = "AGENT_RUNNER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server
    Serve {
        /// Host to bind to [default: 0.0.0.0]
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to listen on [default: 3000]
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Maximum request body size in bytes [default: 1048576]
        #[arg(long, env = "MAX_BODY")]
        max_body: Option<usize>,

        /// Default lock wait and run time bound in seconds [default: 10]
        #[arg(long, env = "LOCK_TIMEOUT")]
        lock_timeout: Option<f64>,

        /// Exclusion domain of a run [default: user-agent]
        #[arg(long, value_enum, env = "LOCK_SCOPE")]
        lock_scope: Option<LockScope>,

        /// Require this key in the x-api-key header
        #[arg(long, env = "SECRET_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// List available agent types
    Agents,

    /// Run a single agent in-process and wait for its outcome
    Run {
        /// Agent type (e.g. document-extractor)
        agent_type: String,

        /// User the agent runs for
        user_id: String,

        /// Lock wait and run time bound in seconds [default: 10]
        #[arg(long)]
        lock_timeout: Option<f64>,
    },
}

pub async fn run_cli() -> Result<()> {
    let mut cli = Cli::parse();

    // Load .env file, then re-parse so env-backed flags pick up its values
    if load_dotenv(cli.dotenv.as_deref()) {
        cli = Cli::parse();
    }

    let config = RunnerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            max_body,
            lock_timeout,
            lock_scope,
            api_key,
        } => {
            let coordinator = build_coordinator(&config, lock_timeout, lock_scope)?;
            let host = host
                .or(config.host.clone())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            let port = port.or(config.port).unwrap_or(3000);
            let max_body = max_body.or(config.max_body).unwrap_or(1024 * 1024);

            let state = AppState {
                coordinator: Arc::new(coordinator),
                api_key: api_key.or(config.api_key.clone()),
            };
            crate::api::serve(&host, port, max_body, state).await
        }
        Commands::Agents => cmd_agents(&config),
        Commands::Run {
            agent_type,
            user_id,
            lock_timeout,
        } => cmd_run(&config, agent_type, user_id, lock_timeout).await,
    }
}

/// Load environment variables from a .env file. Returns whether a file was loaded.
/// If an explicit path is given, load from that path (warn if missing).
/// Otherwise, auto-detect .env in the current working directory (silently skip if absent).
fn load_dotenv(explicit_path: Option<&std::path::Path>) -> bool {
    match explicit_path {
        Some(path) => match dotenvy::from_path(path) {
            Ok(()) => {
                info!("Loaded env from {}", path.display());
                true
            }
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load dotenv file '{}': {}",
                    path.display(),
                    e
                );
                false
            }
        },
        None => match dotenvy::dotenv() {
            Ok(path) => {
                info!("Loaded env from {}", path.display());
                true
            }
            // No .env file found, silently skip
            Err(dotenvy::Error::Io(_)) => false,
            Err(e) => {
                eprintln!("Warning: Failed to parse .env file: {}", e);
                false
            }
        },
    }
}

/// Assemble a coordinator from config, with explicit CLI values taking precedence.
pub fn build_coordinator(
    config: &RunnerConfig,
    lock_timeout_s: Option<f64>,
    lock_scope: Option<LockScope>,
) -> Result<RunCoordinator> {
    let registry = builtin_registry(config);

    let lock_timeout = match lock_timeout_s.or(config.lock_timeout_s) {
        Some(seconds) => timeout_from_secs(seconds).context("Invalid lock timeout")?,
        None => DEFAULT_LOCK_TIMEOUT,
    };
    let lock_scope = lock_scope.or(config.lock_scope).unwrap_or_default();

    info!(
        lock_timeout_s = lock_timeout.as_secs_f64(),
        lock_scope = %lock_scope,
        "Run coordinator configured"
    );

    Ok(
        RunCoordinator::new(Arc::new(registry), Arc::new(MemoryStatusStore::new()))
            .with_lock_timeout(lock_timeout)
            .with_lock_scope(lock_scope),
    )
}

fn builtin_registry(config: &RunnerConfig) -> AgentRegistry {
    match &config.run_times {
        Some(run_times) => AgentRegistry::with_builtin_run_times(run_times),
        None => AgentRegistry::with_builtins(),
    }
}

fn cmd_agents(config: &RunnerConfig) -> Result<()> {
    let registry = builtin_registry(config);
    let agents = registry.list();

    println!("{:<24} DESCRIPTION", "AGENT TYPE");
    println!("{}", "-".repeat(72));

    for (name, desc) in &agents {
        println!("{:<24} {}", name, desc);
    }

    println!("\nTotal: {} agent type(s)", agents.len());
    Ok(())
}

async fn cmd_run(
    config: &RunnerConfig,
    agent_type: String,
    user_id: String,
    lock_timeout_s: Option<f64>,
) -> Result<()> {
    let coordinator = build_coordinator(config, lock_timeout_s, None)?;

    let submission = coordinator
        .submit(&agent_type, &user_id, None)
        .await
        .with_context(|| format!("Failed to start '{}' for user {}", agent_type, user_id))?;

    println!("Run ID: {}", submission.run_id);
    println!("Status: {}", submission.status);

    let record = loop {
        let record = coordinator.status(submission.run_id).await?;
        if record.status.is_terminal() {
            break record;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    };

    println!("\n{}", serde_json::to_string_pretty(&record)?);

    if record.status == RunStatus::Failed {
        anyhow::bail!(
            "Run failed: {}",
            record.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    Ok(())
}
