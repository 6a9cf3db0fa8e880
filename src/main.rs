use checkguard::application::config::OrchestratorConfig;
use checkguard::application::orchestrator::Orchestrator;
use checkguard::domain::ports::{
    HistoryStore, HistoryStoreRef, Mode, PolicyStoreRef, RunArchiveBox,
};
use checkguard::infrastructure::in_memory::{
    InMemoryHistoryStore, InMemoryPolicyStore, InMemoryRunArchive,
};
#[cfg(feature = "storage-rocksdb")]
use checkguard::infrastructure::rocksdb::RocksDbRunArchive;
use checkguard::infrastructure::scoring::simulated_roster;
use checkguard::interfaces::csv::case_reader::CaseReader;
use checkguard::interfaces::csv::decision_writer::{DecisionWriter, OutputFormat};
use checkguard::interfaces::csv::history_reader::{ClientReader, TransactionHistoryReader};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input cases CSV file
    cases: PathBuf,

    /// Client profiles CSV (client_id,name,account_opened,typical_payees)
    #[arg(long)]
    clients: Option<PathBuf>,

    /// Past transactions CSV (client_id,date,amount,payee)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Scoring mode; overrides the config file.
    #[arg(long)]
    mode: Option<Mode>,

    /// JSON orchestrator configuration. Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, decisions are
    /// archived in RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => OrchestratorConfig::from_path(path).into_diagnostic()?,
        None => OrchestratorConfig::default(),
    };
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    let history = InMemoryHistoryStore::new();
    if let Some(path) = &cli.clients {
        load_clients(&history, path).await?;
    }
    if let Some(path) = &cli.history {
        load_history(&history, path).await?;
    }
    let history: HistoryStoreRef = Arc::new(history);
    let policies: PolicyStoreRef = Arc::new(InMemoryPolicyStore::with_defaults());

    let orchestrator = Orchestrator::new(simulated_roster(history, policies), config)
        .into_diagnostic()?
        .with_archive(open_archive(cli.db_path.as_deref())?);

    // Process cases
    let file = File::open(&cli.cases).into_diagnostic()?;
    let mut decisions = Vec::new();
    for case_result in CaseReader::new(file).cases() {
        match case_result {
            Ok(case) => {
                let case_id = case.case_id.clone();
                match orchestrator.submit(case).await {
                    Ok(decision) => decisions.push(decision),
                    Err(e) => error!(case_id = %case_id, "Error processing case: {}", e),
                }
            }
            Err(e) => {
                error!("Error reading case: {}", e);
            }
        }
    }
    info!(count = decisions.len(), "All cases processed");

    // Output report
    let stdout = io::stdout();
    let mut writer = DecisionWriter::new(stdout.lock(), cli.format);
    writer.write_decisions(&decisions).into_diagnostic()?;

    Ok(())
}

async fn load_clients(store: &InMemoryHistoryStore, path: &Path) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    for client in ClientReader::new(file).clients() {
        match client {
            Ok(client) => store.store_client(client).await.into_diagnostic()?,
            Err(e) => warn!(path = %path.display(), "Error reading client: {}", e),
        }
    }
    Ok(())
}

async fn load_history(store: &InMemoryHistoryStore, path: &Path) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    for tx in TransactionHistoryReader::new(file).transactions() {
        match tx {
            Ok(tx) => store.store_transaction(tx).await.into_diagnostic()?,
            Err(e) => warn!(path = %path.display(), "Error reading transaction: {}", e),
        }
    }
    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_archive(db_path: Option<&Path>) -> Result<RunArchiveBox> {
    match db_path {
        Some(path) => Ok(Box::new(RocksDbRunArchive::open(path).into_diagnostic()?)),
        None => Ok(Box::new(InMemoryRunArchive::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_archive(db_path: Option<&Path>) -> Result<RunArchiveBox> {
    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory archive."
        );
    }
    Ok(Box::new(InMemoryRunArchive::new()))
}
