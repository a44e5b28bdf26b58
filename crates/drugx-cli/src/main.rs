//! DrugX command-line interface

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drugx_core::db::Database;
use drugx_core::ingest::load_interactions_csv;
use drugx_core::{DrugChecker, DrugxConfig, FailureRecorder};
use drugx_llm::NarrativeSynthesizer;

/// Drug interaction checker
#[derive(Parser)]
#[command(name = "drugx")]
#[command(author, version, about = "Multi-source drug interaction checks", long_about = None)]
struct Cli {
    /// Interaction store database (overrides DRUGX_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check 2 to 5 drugs and print the consolidated report as JSON
    Check {
        /// Drug names
        #[arg(required = true, num_args = 2..=5)]
        names: Vec<String>,
        /// Follow the report with a generated narrative
        #[arg(long)]
        narrate: bool,
        /// Whole-request timeout in seconds (overrides DRUGX_REQUEST_TIMEOUT_SECS)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Replace the interaction store with the rows of a processed CSV
    Load {
        /// CSV with ddinter_id_a, drug_a, ddinter_id_b, drug_b, severity, categories
        csv: PathBuf,
    },
    /// List recorded failed lookups
    Failures,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("drugx v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = load_config(cli.database)?;

    match cli.command {
        Commands::Check {
            names,
            narrate,
            timeout,
        } => check(config, &names, narrate, timeout).await,
        Commands::Load { csv } => {
            let mut db = Database::open(&config.database_path)
                .with_context(|| format!("opening {}", config.database_path.display()))?;
            let loaded = load_interactions_csv(&csv, &mut db).with_context(|| format!("loading {}", csv.display()))?;
            println!("Loaded {} interactions into {}", loaded, config.database_path.display());
            Ok(())
        }
        Commands::Failures => {
            let failures = FailureRecorder::new(&config.database_path).list_failures().await?;
            println!("{}", serde_json::to_string_pretty(&failures)?);
            Ok(())
        }
    }
}

/// Environment configuration with the command-line database path applied.
fn load_config(database: Option<PathBuf>) -> anyhow::Result<DrugxConfig> {
    let config = DrugxConfig::from_lookup(|key| match (key, &database) {
        ("DRUGX_DATABASE_PATH", Some(path)) => Some(path.display().to_string()),
        _ => std::env::var(key).ok(),
    })?;
    Ok(config)
}

async fn check(mut config: DrugxConfig, names: &[String], narrate: bool, timeout: Option<u64>) -> anyhow::Result<()> {
    if let Some(secs) = timeout {
        config.request_timeout = std::time::Duration::from_secs(secs);
    }

    // Fail on missing narrative keys before spending a request
    let synthesizer = if narrate {
        Some(NarrativeSynthesizer::from_env()?)
    } else {
        None
    };

    let checker = DrugChecker::from_config(&config)?;
    let report = checker.check_with_timeout(names).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(synthesizer) = synthesizer {
        let narrative = synthesizer
            .narrate(&report.normalization, &report.interactions, &report.adverse_events)
            .await?;
        println!();
        println!("--- narrative ({}) ---", narrative.provider);
        println!("{}", narrative.text);
    }

    Ok(())
}
