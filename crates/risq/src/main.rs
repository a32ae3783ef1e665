use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands::*, StoreKind, TraceLevel};
use dotenv::{dotenv, var};
use risq_engine::api::{CompanySource, CompanyStore, PredictionStore};
use risq_engine::config::EngineConfig;
use risq_engine::engine::ProcessEngine;
use risq_engine::schema::{CompanyFinancialRecord, PredictionRecord};
use risq_engine::source::Fmp;
use risq_engine::store::{JsonDirStore, PgStore};
use risq_engine::{Pipeline, PipelineFailure, SourceError};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, subscriber, trace, Level};
use tracing_subscriber::FmtSubscriber;

mod cli;

/// Exit status for failures the caller can fix: bad input or an unknown company.
const CALLER_FAULT: u8 = 2;

fn preprocess(trace_level: Level) {
    dotenv().ok();
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(trace_level)
        .with_writer(std::io::stderr)
        .finish();
    subscriber::set_global_default(my_subscriber).expect("Set subscriber");
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.trace {
        TraceLevel::DEBUG => Level::DEBUG,
        TraceLevel::INFO => Level::INFO,
        TraceLevel::WARN => Level::WARN,
        TraceLevel::ERROR => Level::ERROR,
    };

    preprocess(log_level);
    trace!("Command line input recorded: {cli:#?}");

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_caller_fault(&e) => {
            error!("rejected: {e:#}");
            ExitCode::from(CALLER_FAULT)
        }
        Err(e) => {
            error!("failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    // cli framework:
    // "> risq <COMMAND>"
    match &cli.command {
        // "> risq predict <COMPANY>"
        // resolve the company upstream, then predict from its financials
        Predict { company } => {
            info!("Looking up \"{company}\"");
            let record = Fmp::from_env()?.company_by_name(company).await?;
            let (predictions, companies) = stores(cli).await?;
            companies.save_company(&record).await?;
            let pipeline = pipeline(cli, predictions)?;
            print(&pipeline.predict(&record).await?)?;
        }

        // ---------------------------------------------------------------------------
        // "> risq record <FILE>"
        // predict from a company financial record on disk
        Record { file } => {
            let record: CompanyFinancialRecord =
                risq_util::read_json(file).await.map_err(|e| {
                    PipelineFailure::InvalidInput(format!(
                        "failed to read company record {}: {e}",
                        file.display()
                    ))
                })?;
            let (predictions, _) = stores(cli).await?;
            let pipeline = pipeline(cli, predictions)?;
            print(&pipeline.predict(&record).await?)?;
        }

        // ---------------------------------------------------------------------------
        // "> risq run <FILE>"
        // hand an existing engine input straight to the engine
        Run { file } => {
            let (predictions, _) = stores(cli).await?;
            let pipeline = pipeline(cli, predictions)?;
            print(&pipeline.predict_from_file(file).await?)?;
        }

        ////////////////////////////////////////////////////////////////////////////////////////////////////

        // "> risq migrate"
        // bootstrap prediction.outputs & prediction.inputs in PostgreSQL
        Migrate => {
            let store = PgStore::connect(&var("POSTGRES_URL")?).await?;
            store.migrate().await?;
            info!("PostgreSQL schema is ready");
        }
    }

    Ok(())
}

/// The prediction store and the company snapshot store, both backed by `--store`.
async fn stores(cli: &Cli) -> Result<(Arc<dyn PredictionStore>, Arc<dyn CompanyStore>)> {
    match cli.store {
        StoreKind::Json => {
            let store = Arc::new(JsonDirStore::new(&cli.out_dir));
            Ok((store.clone() as Arc<dyn PredictionStore>, store as Arc<dyn CompanyStore>))
        }
        StoreKind::Postgres => {
            let store = Arc::new(PgStore::connect(&var("POSTGRES_URL")?).await?);
            Ok((store.clone() as Arc<dyn PredictionStore>, store as Arc<dyn CompanyStore>))
        }
    }
}

fn pipeline(cli: &Cli, store: Arc<dyn PredictionStore>) -> Result<Pipeline> {
    let mut config = EngineConfig::from_env_with_script(cli.script.clone())?;
    if let Some(program) = &cli.program {
        config.program = program.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    debug!(
        "engine: {} {:?} (cwd: {}, timeout: {} s)",
        config.program.display(),
        config.args,
        config.working_dir.display(),
        config.timeout.as_secs()
    );
    let scratch_dir = config.scratch_dir.clone();

    Ok(Pipeline::new(Arc::new(ProcessEngine::new(config)), store).with_scratch_dir(scratch_dir))
}

fn print(record: &PredictionRecord) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

fn is_caller_fault(e: &anyhow::Error) -> bool {
    if let Some(failure) = e.downcast_ref::<PipelineFailure>() {
        return failure.is_caller_fault();
    }
    matches!(
        e.downcast_ref::<SourceError>(),
        Some(SourceError::CompanyNotFound(_))
    )
}
