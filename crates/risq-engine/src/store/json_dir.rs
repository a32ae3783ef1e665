use crate::api::{CompanyStore, PredictionStore};
use crate::error::StoreError;
use crate::schema::{CompanyFinancialRecord, PredictionRecord};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{error, trace};
use uuid::Uuid;

/// Stores each prediction as `<root>/<SYMBOL>/<id>.json`.
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, record: &PredictionRecord) -> PathBuf {
        self.symbol_dir(&record.prediction.symbol)
            .join(format!("{}.json", record.id))
    }

    /// Company snapshots sit next to the predictions as `input-<id>.json`.
    pub fn company_path_for(&self, symbol: &str, id: Uuid) -> PathBuf {
        self.symbol_dir(symbol).join(format!("input-{id}.json"))
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        // symbols come from the engine and upstream; keep them to one path component
        let mut component: String = symbol
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') { c } else { '_' })
            .collect();
        if component.chars().all(|c| c == '.') {
            component = "_".repeat(component.len().max(1));
        }
        self.root.join(component)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl PredictionStore for JsonDirStore {
    async fn save(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        let path = self.path_for(record);
        risq_util::write_json(record, &path).await.map_err(|e| {
            error!("[{}] failed to write {}: {e}", record.prediction.symbol, path.display());
            into_store_error(e)
        })?;
        trace!("[{}] prediction written to {}", record.prediction.symbol, path.display());
        Ok(())
    }
}

#[async_trait]
impl CompanyStore for JsonDirStore {
    async fn save_company(&self, record: &CompanyFinancialRecord) -> Result<(), StoreError> {
        let symbol = record.symbol.as_deref().unwrap_or_default();
        let path = self.company_path_for(symbol, Uuid::new_v4());
        risq_util::write_json(record, &path).await.map_err(|e| {
            error!("[{symbol}] failed to write {}: {e}", path.display());
            into_store_error(e)
        })?;
        trace!("[{symbol}] company snapshot written to {}", path.display());
        Ok(())
    }
}

fn into_store_error(e: anyhow::Error) -> StoreError {
    match e.downcast::<std::io::Error>() {
        Ok(io) => StoreError::Io(io),
        Err(e) => StoreError::Other(e.to_string()),
    }
}
