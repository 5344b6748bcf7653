//! doc-migrate CLI
//!
//! CLI tool for copying Supabase tables into Appwrite collections.
//! Pedantic lints relaxed for CLI ergonomics.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use doc_migrate::{
    CancellationToken, CollectionMapping, Credentials, EventLog, LogEntry, LogKind,
    MigrationConfig, MigrationEvent, Pipeline, RunReport, RunStatus,
};

#[derive(Parser)]
#[command(name = "doc-migrate")]
#[command(version)]
#[command(about = "Migrate Supabase tables into Appwrite collections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Secrets that may be kept out of the configuration file.
#[derive(Args)]
struct SecretArgs {
    /// Source API key (overrides the configuration file)
    #[arg(long, env = "SOURCE_API_KEY", hide_env_values = true)]
    source_api_key: Option<String>,

    /// Destination API key (overrides the configuration file)
    #[arg(long, env = "DEST_API_KEY", hide_env_values = true)]
    dest_api_key: Option<String>,

    /// Destination project ID (overrides the configuration file)
    #[arg(long, env = "DEST_PROJECT_ID")]
    dest_project_id: Option<String>,
}

impl SecretArgs {
    fn apply(self, credentials: &mut Credentials) {
        if let Some(key) = self.source_api_key {
            credentials.source_api_key = key;
        }
        if let Some(key) = self.dest_api_key {
            credentials.dest_api_key = key;
        }
        if let Some(project) = self.dest_project_id {
            credentials.dest_project_id = project;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run migration from config file
    Run {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Infer and create destination attributes before copying each table
        #[arg(long)]
        create_schema: bool,

        #[command(flatten)]
        secrets: SecretArgs,
    },

    /// Infer the schema of source tables and create the destination attributes
    Analyze {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Only analyze this mapping (0-based index)
        #[arg(short, long)]
        mapping: Option<usize>,

        #[command(flatten)]
        secrets: SecretArgs,
    },

    /// Validate configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        #[command(flatten)]
        secrets: SecretArgs,
    },

    /// Generate example configuration
    Init {
        /// Output file path
        #[arg(short, long, default_value = "migration.yaml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Console output is driven by the event stream; tracing is for diagnostics
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            config,
            create_schema,
            secrets,
        } => {
            let status = run_migration(&config, create_schema, secrets).await?;
            if status == RunStatus::Error {
                std::process::exit(1);
            }
        }
        Commands::Analyze {
            config,
            mapping,
            secrets,
        } => {
            analyze_schema(&config, mapping, secrets).await?;
        }
        Commands::Validate { config, secrets } => {
            validate_config(&config, secrets)?;
        }
        Commands::Init { output } => {
            generate_config(&output)?;
        }
    }

    Ok(())
}

fn load_config(config_path: &Path, secrets: SecretArgs) -> anyhow::Result<MigrationConfig> {
    info!("Loading configuration from {:?}", config_path);

    let mut config = MigrationConfig::from_file(config_path)?;
    secrets.apply(&mut config.credentials);
    Ok(config)
}

async fn run_migration(
    config_path: &Path,
    create_schema: bool,
    secrets: SecretArgs,
) -> anyhow::Result<RunStatus> {
    let mut config = load_config(config_path, secrets)?;
    if create_schema {
        config.options.create_schema = true;
    }

    let mut pipeline = Pipeline::new(config);
    let renderer = tokio::spawn(render_events(pipeline.subscribe()));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, on_interrupt).await == Interrupt::Forced {
            eprintln!("Interrupted again, exiting without waiting for the current record.");
            std::process::exit(130);
        }
    });

    let result = pipeline.run(cancel).await;

    // Dropping the pipeline closes the event channel and ends the renderer
    drop(pipeline);
    renderer.await?;

    let report = result?;
    print_summary(&report);

    Ok(report.status)
}

/// How the interrupt watcher ended.
#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// A second interrupt arrived after cancellation was requested.
    Forced,
    /// Interrupts could not be listened for.
    Unavailable,
}

/// The first interrupt requests cooperative cancellation; the second one is
/// returned as [`Interrupt::Forced`] so the caller can stop a hung run.
async fn watch_interrupts<F, Fut>(mut next_interrupt: F, cancel: CancellationToken) -> Interrupt
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        return Interrupt::Unavailable;
    }
    cancel.cancel();

    match next_interrupt().await {
        Ok(()) => Interrupt::Forced,
        Err(_) => Interrupt::Unavailable,
    }
}

async fn render_events(mut events: broadcast::Receiver<MigrationEvent>) {
    let bar = create_progress_bar();

    loop {
        match events.recv().await {
            Ok(MigrationEvent::Progress(progress)) => {
                bar.set_length(progress.total as u64);
                bar.set_position(progress.current as u64);
                bar.set_message(progress.collection);
            }
            Ok(MigrationEvent::Log(entry)) => bar.println(format_entry(&entry)),
            Ok(MigrationEvent::Status(status)) => debug!("Run status: {:?}", status),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Progress display fell behind, {} events skipped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }

    bar.finish_and_clear();
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

fn format_entry(entry: &LogEntry) -> String {
    let time = entry.timestamp.format("%H:%M:%S");
    match entry.kind {
        LogKind::Error => format!("{} ERROR {}", time, entry.message),
        LogKind::Info | LogKind::Success => format!("{} {}", time, entry.message),
    }
}

fn print_summary(report: &RunReport) {
    let stats = &report.stats;
    match report.status {
        RunStatus::Completed => println!("\n✅ Migration Complete!"),
        RunStatus::Idle => println!("\n⏹  Migration Canceled"),
        RunStatus::Error | RunStatus::Migrating => println!("\n❌ Migration Failed"),
    }
    println!(
        "   Collections: {} ({} failed to fetch)",
        stats.total_collections, stats.failed_collections
    );
    for collection in &stats.collections {
        println!(
            "     - {}: {}/{} migrated, {} failed",
            collection.collection, collection.migrated, collection.total, collection.failed
        );
    }
    println!("   Migrated:   {}", stats.migrated());
    println!("   Failed:     {}", stats.failed());
    println!("   Duration:   {:.2}s", stats.duration_secs);
    println!("   Throughput: {:.0} records/sec", stats.throughput());
}

async fn analyze_schema(
    config_path: &Path,
    mapping: Option<usize>,
    secrets: SecretArgs,
) -> anyhow::Result<()> {
    let config = load_config(config_path, secrets)?;
    config.validate()?;

    let selected: Vec<CollectionMapping> = match mapping {
        Some(index) => {
            let chosen = config.mappings.get(index).cloned().ok_or_else(|| {
                anyhow::anyhow!(
                    "Mapping {} does not exist ({} configured)",
                    index,
                    config.mappings.len()
                )
            })?;
            vec![chosen]
        }
        None => config.mappings.clone(),
    };

    let pipeline = Pipeline::new(config);

    for mapping in &selected {
        let mut log = EventLog::new();
        let fields = pipeline.analyze_schema(mapping, &mut log).await?;

        println!(
            "\n📊 {} → {}/{}",
            mapping.source_table, mapping.dest_database_id, mapping.dest_collection_id
        );
        if fields.is_empty() {
            println!("   (no records to sample)");
        }
        for field in &fields {
            let presence = if field.nullable { "optional" } else { "required" };
            println!("   {:<24} {:<8} ({})", field.name, field.field_type, presence);
        }
        for entry in log.entries().iter().filter(|e| e.kind == LogKind::Error) {
            println!("   ⚠ {}", entry.message);
        }
    }

    Ok(())
}

fn validate_config(config_path: &Path, secrets: SecretArgs) -> anyhow::Result<()> {
    let config = load_config(config_path, secrets)?;
    config.validate()?;

    println!("✅ Configuration is valid!");
    println!("   Source:      {}", config.credentials.source_base_url);
    println!(
        "   Destination: {} (project {})",
        config.credentials.dest_endpoint, config.credentials.dest_project_id
    );
    println!("   Mappings:    {}", config.mappings.len());
    for mapping in &config.mappings {
        println!(
            "     - {} → {}/{}",
            mapping.source_table, mapping.dest_database_id, mapping.dest_collection_id
        );
    }
    println!("   Create schema: {}", config.options.create_schema);

    Ok(())
}

fn generate_config(output: &Path) -> anyhow::Result<()> {
    std::fs::write(output, CONFIG_TEMPLATE)?;
    println!("✅ Generated configuration: {:?}", output);
    println!(
        "   Edit the file and run: doc-migrate run --config {:?}",
        output
    );

    Ok(())
}

const CONFIG_TEMPLATE: &str = r#"# doc-migrate configuration
credentials:
  source_base_url: https://your-project.supabase.co
  source_api_key: your-service-role-key     # or set SOURCE_API_KEY
  dest_endpoint: https://cloud.appwrite.io/v1
  dest_project_id: your-project-id          # or set DEST_PROJECT_ID
  dest_api_key: your-api-key                # or set DEST_API_KEY

# Processed in order, one record at a time
mappings:
  - source_table: users
    dest_database_id: main
    dest_collection_id: users

options:
  create_schema: false       # infer and create attributes before copying
  request_timeout_secs: 30
"#;
