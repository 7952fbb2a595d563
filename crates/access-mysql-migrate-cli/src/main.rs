//! access-mysql-migrate CLI - migrate Access database files to MySQL.

use std::path::PathBuf;
use std::process::ExitCode;

use access_mysql_migrate::{
    Config, ErrorCategory, MigrateError, MigrationResult, OnExisting, Orchestrator, ProgressEvent,
    RunStatus,
};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

#[derive(Parser)]
#[command(name = "access-mysql-migrate")]
#[command(about = "Migrate Microsoft Access database files to MySQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a migration
    Run {
        /// Override the existing-table policy: truncate, skip or fail
        #[arg(long)]
        on_existing: Option<String>,

        /// Override rows per read batch and insert statement
        #[arg(long)]
        batch_size: Option<usize>,

        /// Dry run: discover and list user tables without transferring data
        #[arg(long)]
        dry_run: bool,
    },

    /// Test the Access file and the MySQL connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::HealthCheck => {
            if !config.source.path.exists() {
                return Err(MigrateError::Config(format!(
                    "source file not found: {}",
                    config.source.path.display()
                )));
            }

            let orchestrator = Orchestrator::new(&config).await?;
            let tables = orchestrator.discover().await?;

            println!("Source OK: {}", config.source.path.display());
            println!(
                "Target OK: {}:{}/{}",
                config.target.host, config.target.port, config.target.database
            );
            println!("{} user tables found:", tables.len());
            for table in &tables {
                println!("  - {}", table.name);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Run {
            on_existing,
            batch_size,
            dry_run,
        } => {
            if let Some(policy) = on_existing {
                config.migration.on_existing = parse_on_existing(&policy)?;
            }
            if let Some(size) = batch_size {
                config.migration.batch_size = size;
            }
            config.validate()?;

            let mut orchestrator = Orchestrator::new(&config).await?;

            if dry_run {
                let tables = orchestrator.discover().await?;
                println!("Dry run: {} user tables would be migrated", tables.len());
                for table in &tables {
                    println!("  {} ({} columns)", table.name, table.columns.len());
                }
                return Ok(ExitCode::SUCCESS);
            }

            if cli.progress {
                orchestrator =
                    orchestrator.with_progress_sink(Box::new(|event: ProgressEvent| {
                        if let Ok(line) = serde_json::to_string(&event) {
                            eprintln!("{}", line);
                        }
                    }));
            }

            let cancel = spawn_signal_handler();
            let result = orchestrator.run(Some(cancel)).await;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_report(&result);
            }

            Ok(result_exit_code(&result))
        }
    }
}

fn parse_on_existing(value: &str) -> Result<OnExisting, MigrateError> {
    match value {
        "truncate" => Ok(OnExisting::Truncate),
        "skip" => Ok(OnExisting::Skip),
        "fail" => Ok(OnExisting::Fail),
        _ => Err(MigrateError::Config(format!(
            "invalid on_existing policy '{}', expected truncate, skip or fail",
            value
        ))),
    }
}

fn print_report(result: &MigrationResult) {
    let headline = match result.status {
        RunStatus::Completed => "Migration completed!",
        RunStatus::Cancelled => "Migration cancelled",
        RunStatus::Failed => "Migration failed",
    };
    println!("\n{}", headline);
    println!("  Run ID: {}", result.run_id);
    println!("  Duration: {:.2}s", result.duration_seconds);
    println!(
        "  Tables: {}/{}",
        result.tables_processed, result.table_count
    );
    println!("  Rows migrated: {}", result.rows_migrated);
    println!("  Rows failed: {}", result.rows_failed);
    for table in &result.table_results {
        println!(
            "    {}: {} rows ({} failed)",
            table.name, table.rows_migrated, table.rows_failed
        );
    }
    if let Some(ref failure) = result.failure {
        println!("  Cause ({}): {}", failure.category, failure.message);
        if let Some(ref table) = failure.table {
            println!("  While processing: {}", table);
        }
    }
}

fn result_exit_code(result: &MigrationResult) -> ExitCode {
    if result.success {
        return ExitCode::SUCCESS;
    }
    match result.status {
        RunStatus::Cancelled => ExitCode::from(130),
        _ => match result.failure.as_ref().map(|f| f.category) {
            Some(ErrorCategory::Source) => ExitCode::from(3),
            Some(ErrorCategory::Target) => ExitCode::from(4),
            _ => ExitCode::from(5),
        },
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), MigrateError> {
    let filter = tracing_subscriber::EnvFilter::try_new(verbosity)
        .map_err(|e| MigrateError::Config(format!("invalid verbosity '{}': {}", verbosity, e)))?;

    match format {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init(),
        "text" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        other => {
            return Err(MigrateError::Config(format!(
                "invalid log format '{}', expected text or json",
                other
            )))
        }
    }
    Ok(())
}

/// Install a Ctrl-C handler feeding the cancellation channel.
///
/// The orchestrator checks the flag between tables and between batches, so
/// the current statement finishes before the run unwinds.
fn spawn_signal_handler() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping after the current batch");
            let _ = tx.send(true);
        }
    });
    rx
}
