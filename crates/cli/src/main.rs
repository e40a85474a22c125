use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use events::EventEnvelope;
use orchestrator::{HostConfig, Orchestrator, DEFAULT_CONFIG_FILE};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "servicehost")]
#[command(about = "Run and inspect the service lifecycle", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Host configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full start and stop cycle and report what happened
    Testinit {
        /// Print every lifecycle event as JSON
        #[arg(long)]
        events: bool,
    },
    /// Print the effective configuration
    Config,
    /// Write a default configuration file
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = HostConfig::read(&cli.config);
    init_tracing(&config.logging.filter);

    match cli.command {
        Some(Commands::Testinit { events }) => testinit(config, events).await,
        Some(Commands::Config) => print_config(&config),
        Some(Commands::Init { force }) => init_config(&cli.config, force),
        None => testinit(config, false).await,
    }
}

async fn testinit(config: HostConfig, print_events: bool) -> Result<()> {
    let orchestrator = Arc::new(Orchestrator::new(config));
    let mut rx = orchestrator.event_bus().subscribe();
    tracing::debug!(
        settings = orchestrator.config().settings.len(),
        event_capacity = orchestrator.config().events.capacity,
        "Created service host"
    );

    let printer = tokio::spawn(async move {
        let mut seen = 0usize;
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    seen += 1;
                    if print_events {
                        print_event(&envelope);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        seen
    });

    let report = tokio::task::spawn_blocking(move || -> Result<CycleReport> {
        orchestrator.start().context("Failed to start service host")?;
        let report = CycleReport {
            started: orchestrator.service_names(),
            unbuilt: orchestrator.pending_services(),
        };
        orchestrator.stop().context("Failed to stop service host")?;
        Ok(report)
    })
    .await
    .context("Lifecycle task panicked")??;

    let seen = printer.await.context("Event printer panicked")?;

    println!("Started {} service(s): {}", report.started.len(), report.started.join(", "));
    if !report.unbuilt.is_empty() {
        println!("Unbuilt: {}", report.unbuilt.join(", "));
    }
    println!("Observed {} lifecycle event(s)", seen);
    Ok(())
}

struct CycleReport {
    started: Vec<String>,
    unbuilt: Vec<String>,
}

fn print_event(envelope: &EventEnvelope) {
    match serde_json::to_string(&envelope.event) {
        Ok(json) => println!("{} {}", envelope.timestamp.to_rfc3339(), json),
        Err(e) => tracing::warn!(error = %e, kind = envelope.event.kind(), "Failed to encode event"),
    }
}

fn print_config(config: &HostConfig) -> Result<()> {
    let rendered = config.to_toml().context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }

    HostConfig::default()
        .write(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
