use crate::api::{Engine, PredictionStore};
use crate::engine::{extract, InputArtifact, InputSource};
use crate::error::PipelineFailure;
use crate::normalize::normalize;
use crate::schema::{CompanyFinancialRecord, FeatureVector, PredictionRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Prediction pipeline
//
//      build -> stage -> invoke -> extract -> normalize -> store
//
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Composes the engine and the store into one request-scoped run.
///
/// Every stage fails fast with a classified [`PipelineFailure`]; nothing is retried and
/// nothing is stored unless the whole result was built.
pub struct Pipeline {
    engine: Arc<dyn Engine>,
    store: Arc<dyn PredictionStore>,
    scratch_dir: PathBuf,
}

impl Pipeline {
    pub fn new(engine: Arc<dyn Engine>, store: Arc<dyn PredictionStore>) -> Self {
        Self {
            engine,
            store,
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Directory for the scoped input artifacts.
    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    /// Predict from a company record; its feature vector is written to a scoped artifact.
    pub async fn predict(
        &self,
        record: &CompanyFinancialRecord,
    ) -> Result<PredictionRecord, PipelineFailure> {
        let features = FeatureVector::try_from(record).map_err(|e| {
            error!("rejected company record: {e}");
            e
        })?;
        let symbol = features.symbol.clone();
        let sector = features.sector.clone();

        self.run(InputSource::Features(features), &symbol, sector.as_deref())
            .await
    }

    /// Predict from an engine input file that already exists. The file is read only to
    /// validate it and to learn the fallback symbol and sector; it is never removed.
    pub async fn predict_from_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<PredictionRecord, PipelineFailure> {
        let path = path.as_ref();
        let record: CompanyFinancialRecord = risq_util::read_json(path).await.map_err(|e| {
            PipelineFailure::InvalidInput(format!(
                "failed to read engine input {}: {e}",
                path.display()
            ))
        })?;
        let features = FeatureVector::try_from(&record)?;

        self.run(
            InputSource::ExistingFile(path.to_path_buf()),
            &features.symbol,
            features.sector.as_deref(),
        )
        .await
    }

    async fn run(
        &self,
        source: InputSource,
        symbol: &str,
        sector: Option<&str>,
    ) -> Result<PredictionRecord, PipelineFailure> {
        let time = std::time::Instant::now();
        let request_id = Uuid::new_v4();
        info!("[{symbol}] running prediction {request_id}");

        // removed when dropped, whichever stage returns first
        let artifact = InputArtifact::stage(source, &self.scratch_dir, request_id)?;

        let stdout = self
            .engine
            .invoke(artifact.path())
            .await
            .into_stdout()
            .map_err(|e| {
                error!("[{symbol}] {e}");
                e
            })?;
        trace!("[{symbol}] engine finished, extracting payload");

        let payload = extract(&stdout)?;
        let prediction = normalize(&payload, symbol, sector)?;
        drop(artifact);

        let record = PredictionRecord::new(request_id, prediction);
        self.store.save(&record).await.map_err(|e| {
            error!("[{symbol}] failed to persist prediction {request_id}: {e}");
            PipelineFailure::PersistenceFailure(e)
        })?;

        debug!(
            "[{symbol}] prediction {request_id} stored, elapsed time: {} ms",
            time.elapsed().as_millis()
        );
        Ok(record)
    }
}
