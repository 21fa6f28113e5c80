//! Cluster health CLI - one health check per scheduler tick.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cluster_health::pipeline::{build_notifier, recipients};
use cluster_health::{
    classify, EventPayload, Monitor, OutcomeKind, RestConnector, RunReport, SnapshotStore,
};
use health_config::{MonitorConfig, DEFAULT_CONFIG_FILE};
use notify::{AlertKind, MailMessage};

/// Cluster health monitor - alerts once per unhealthy node or drive change.
#[derive(Parser)]
#[command(name = "cluster-health")]
#[command(about = "Storage cluster node and drive health monitor")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the JSON configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single health check (for cron use)
    Run {
        /// Snapshot directory (overrides state_settings.directory)
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Log notifications instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Load and validate the configuration without contacting anything
    ValidateConfig,

    /// Classify the persisted snapshot and print findings
    Status {
        /// Snapshot directory (overrides state_settings.directory)
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },

    /// Send a test message through the configured mail path
    TestEmail {
        /// Log the message instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("cluster_health=debug,notify=debug,info")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Run { state_dir, dry_run } => {
            let dir = state_dir.unwrap_or_else(|| config.state.directory.clone());
            tracing::info!(state = %dir.display(), dry_run, "Starting run");
            run_check(&config, &dir, dry_run).await
        }
        Commands::ValidateConfig => {
            print_config(&config);
            Ok(())
        }
        Commands::Status { state_dir } => {
            let dir = state_dir.unwrap_or_else(|| config.state.directory.clone());
            run_status(&dir)
        }
        Commands::TestEmail { dry_run } => run_test_email(&config, dry_run).await,
    }
}

fn load_config(path: &Path) -> Result<MonitorConfig> {
    MonitorConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

async fn run_check(config: &MonitorConfig, state_dir: &Path, dry_run: bool) -> Result<()> {
    let connector =
        RestConnector::from_settings(&config.cluster).context("Failed to build cluster client")?;
    let monitor = Monitor::new(
        config,
        SnapshotStore::new(state_dir),
        Box::new(connector),
        build_notifier(config, dry_run),
    )?;

    let report = monitor.run().await.context("Health check run failed")?;
    print_report(&config.cluster.name, &report);
    Ok(())
}

fn print_report(cluster: &str, report: &RunReport) {
    println!("\n{} {}", "Health check for".bold(), cluster.cyan());
    println!("   Started: {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(state) = report.state {
        println!("   State: {state:?}");
    }

    match report.outcome {
        OutcomeKind::Silent => println!("   {}", "No new unhealthy objects".green()),
        OutcomeKind::UnhealthyAlert => println!(
            "   {} ({} event(s), alert sent)",
            "Unhealthy objects found".red().bold(),
            report.events.len()
        ),
        OutcomeKind::ConnectivityFailure => {
            println!("   {}", "Cluster unreachable, failure alert sent".yellow().bold());
            if let Some(cause) = &report.cause {
                println!("   Cause: {cause}");
            }
        }
    }
}

fn print_config(config: &MonitorConfig) {
    println!("{}", "Configuration is valid".green().bold());
    println!(
        "   Cluster: {} ({}:{})",
        config.cluster.name, config.cluster.address, config.cluster.rest_port
    );
    println!("   User: {}", config.cluster.username);
    println!("   Timeout: {}s", config.cluster.timeout_secs);
    println!(
        "   Mail: {} via {}:{}{}",
        config.email.sender,
        config.email.server,
        config.email.port,
        if config.email.starttls { " (STARTTLS)" } else { "" }
    );
    println!("   Recipients: {}", config.email.recipients.join(", "));
    println!("   State dir: {}", config.state.directory.display());
}

fn run_status(state_dir: &Path) -> Result<()> {
    let store = SnapshotStore::new(state_dir);
    let snapshot = store.load_current().with_context(|| {
        format!("No readable snapshot in {}", state_dir.display())
    })?;

    println!(
        "Snapshot {}: {} node(s), {} drive(s)\n",
        store.current_path().display(),
        snapshot.nodes.len(),
        snapshot.drives.len()
    );

    let result = classify(&snapshot);
    if result.healthy {
        println!("{}", "All nodes online and all drives healthy".green());
        return Ok(());
    }

    for event in &result.events {
        match &event.payload {
            EventPayload::Node(node) => println!(
                "{:>3}. {} node {} ({}) status={}",
                event.ordinal,
                event.kind().as_str().red(),
                node.id,
                node.name,
                node.status
            ),
            EventPayload::Drive(drive) => println!(
                "{:>3}. {} drive {} on node {} state={}",
                event.ordinal,
                event.kind().as_str().red(),
                drive.id,
                drive.node_id,
                drive.state
            ),
        }
    }
    Ok(())
}

async fn run_test_email(config: &MonitorConfig, dry_run: bool) -> Result<()> {
    let notifier = build_notifier(config, dry_run);
    let to = recipients(config)?;

    let mut message = MailMessage::new(
        AlertKind::HealthAlert,
        &config.cluster.name,
        format!(
            "Test message from the cluster health monitor for <b>{}</b>.",
            config.cluster.name
        ),
        config.email.sender.clone(),
        to,
        config.email.server.clone(),
    );
    message.subject = format!("Test message for cluster: {}", config.cluster.name);

    notifier
        .deliver(&message)
        .await
        .with_context(|| format!("Failed to send test message via {}", config.email.server))?;

    println!(
        "{} to {} via {}",
        "Test message sent".green().bold(),
        message.recipients.joined(),
        notifier.channel_name()
    );
    Ok(())
}
