use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing
    #[arg(long, global = true, default_value = "INFO")]
    pub trace: TraceLevel,

    /// Where predictions are persisted
    #[arg(long, global = true, default_value = "json")]
    pub store: StoreKind,

    /// Root directory of the json store
    #[arg(long, global = true, default_value = "./predictions")]
    pub out_dir: PathBuf,

    /// Engine entry script; overrides RISQ_ENGINE_SCRIPT
    #[arg(long, global = true)]
    pub script: Option<PathBuf>,

    /// Program the script is run with; overrides RISQ_ENGINE_PROGRAM
    #[arg(long, global = true)]
    pub program: Option<PathBuf>,

    /// Engine timeout in seconds; overrides RISQ_ENGINE_TIMEOUT_SECS
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Look a company up by name and predict its risk tier.
    Predict { company: String },

    /// Predict from a company financial record stored as JSON.
    Record { file: PathBuf },

    /// Run the engine on an existing engine input file. The file is left in place.
    Run { file: PathBuf },

    /// Create the PostgreSQL schema for stored predictions.
    Migrate,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum StoreKind {
    /// One `<SYMBOL>/<id>.json` file per prediction under --out-dir.
    Json,
    /// The `prediction.outputs` table at POSTGRES_URL.
    Postgres,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[value(rename_all = "UPPER")]
pub enum TraceLevel {
    DEBUG,
    INFO,
    WARN,
    ERROR,
}
