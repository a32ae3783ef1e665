//! Seams between the pipeline and its collaborators.
//!
//! The engine, the persistence stores and the upstream data provider are all capabilities
//! behind a trait, so the pipeline can be driven by fakes in tests.

use crate::engine::InvocationOutcome;
use crate::error::{SourceError, StoreError};
use crate::schema::{CompanyFinancialRecord, PredictionRecord};
use async_trait::async_trait;
use std::path::Path;

pub type PgClient = tokio_postgres::Client;
pub type HttpClient = reqwest::Client;

/// The opaque prediction engine: given the path of a serialized feature vector, run to
/// completion and report what happened.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn invoke(&self, input: &Path) -> InvocationOutcome;
}

/// Durable storage of finished predictions.
#[async_trait]
pub trait PredictionStore: Send + Sync {
    async fn save(&self, record: &PredictionRecord) -> Result<(), StoreError>;
}

/// Upstream financial-data provider.
#[async_trait]
pub trait CompanySource: Send + Sync {
    async fn company_by_name(&self, name: &str) -> Result<CompanyFinancialRecord, SourceError>;
}

/// Durable storage of the upstream company records that predictions are made from.
#[async_trait]
pub trait CompanyStore: Send + Sync {
    async fn save_company(&self, record: &CompanyFinancialRecord) -> Result<(), StoreError>;
}
