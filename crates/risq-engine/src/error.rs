//! Failure taxonomy of the prediction pipeline.
//!
//! Every failed `predict` call resolves to exactly one [`PipelineFailure`] variant, chosen at
//! the point of origin; callers match on the variant, never on the message text.

use thiserror::Error;

/// Synthetic exit code for an engine that could not be started (or its input staged).
pub const SPAWN_FAILED_CODE: i32 = 127;

/// Synthetic exit code for an engine killed by the wall-clock timeout.
pub const TIMED_OUT_CODE: i32 = 124;

/// Synthetic exit code for an engine terminated by a signal.
pub const SIGNALLED_CODE: i32 = -1;

#[derive(Error, Debug)]
pub enum PipelineFailure {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("prediction engine failed with code {exit_code}: {diagnostic}")]
    EngineNonZeroExit { exit_code: i32, diagnostic: String },

    #[error("no prediction payload found in engine output")]
    PayloadNotFound { raw_output_sample: String },

    #[error("prediction payload is malformed: {0}")]
    PayloadMalformed(String),

    #[error("failed to persist prediction: {0}")]
    PersistenceFailure(#[from] StoreError),
}

impl PipelineFailure {
    /// `true` when the request itself must change; every other variant points at the
    /// engine or the environment.
    pub fn is_caller_fault(&self) -> bool {
        matches!(self, PipelineFailure::InvalidInput(_))
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors of the upstream financial-data collaborator; these never reach the pipeline.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    #[error("missing {dataset} data for {symbol}")]
    MissingData { dataset: &'static str, symbol: String },

    #[error("http error: {0}")]
    Http(#[from] anyhow::Error),
}
