//! swarmscaled — the swarmscale daemon.
//!
//! Receives Alertmanager webhooks and scales the Docker Swarm services
//! named in the alerts' `service` annotation:
//! - `firing` adds one replica and refreshes the image
//! - `resolved` removes one replica
//!
//! # Usage
//!
//! ```text
//! swarmscaled serve --config /etc/swarmscale.toml
//! DRYRUN=1 swarmscaled serve --listen 127.0.0.1:8083
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use swarmscale_autoscale::{AlertBatchProcessor, ProcessorSettings};
use swarmscale_core::{Notifier, ScalerConfig};
use swarmscale_notify::{NoopNotifier, SlackNotifier};
use swarmscale_orchestrator::{DockerSwarm, ShellRunner, SwarmSettings};

#[derive(Parser)]
#[command(name = "swarmscaled", about = "Alert-driven Docker Swarm autoscaler", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the alert webhook.
    Serve {
        /// Path to a swarmscale.toml config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address to listen on (overrides server.listen).
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Log mutating orchestrator commands instead of running them.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,swarmscaled=debug,swarmscale=debug")
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            listen,
            dry_run,
        } => run_serve(config, listen, dry_run).await,
    }
}

async fn run_serve(
    config_path: Option<PathBuf>,
    listen: Option<SocketAddr>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mut config = ScalerConfig::load(config_path.as_deref())?;
    if let Some(addr) = listen {
        config.server.listen = addr;
    }
    if dry_run {
        config.dry_run = true;
    }
    info!(?config, "configuration loaded");

    // ── Collaborators ──────────────────────────────────────────

    let swarm = Arc::new(DockerSwarm::new(ShellRunner, swarm_settings(&config)?));

    let notifier: Arc<dyn Notifier> = match &config.notify.slack_hook {
        Some(hook) => {
            info!("slack notifications enabled");
            Arc::new(SlackNotifier::new(hook.clone(), config.notify.username.clone()))
        }
        None => {
            info!("slack notifications disabled (SLACK_HOOK not set)");
            Arc::new(NoopNotifier)
        }
    };

    let processor = Arc::new(AlertBatchProcessor::new(
        swarm.clone(),
        swarm,
        notifier,
        processor_settings(&config)?,
    ));

    // ── API server ─────────────────────────────────────────────

    let router = swarmscale_api::build_router(processor);
    let addr = config.server.listen;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(%addr, dry_run = config.dry_run, "webhook server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("swarmscaled stopped");
    Ok(())
}

fn swarm_settings(config: &ScalerConfig) -> anyhow::Result<SwarmSettings> {
    Ok(SwarmSettings {
        dry_run: config.dry_run,
        registry_region: config.registry.region.clone(),
        registry_credentials: config
            .registry
            .credentials()
            .map(|(id, secret)| (id.to_string(), secret.to_string())),
        update_parallelism: config.update.parallelism,
        update_delay: config.update_delay()?,
        command_timeout: config.step_timeout()?,
    })
}

fn processor_settings(config: &ScalerConfig) -> anyhow::Result<ProcessorSettings> {
    Ok(ProcessorSettings {
        bounds: config.bounds()?,
        step_timeout: config.step_timeout()?,
        apply_timeout: config.apply_timeout()?,
    })
}
