use async_trait::async_trait;
use risq_engine::api::{Engine, PredictionStore};
use risq_engine::engine::{InvocationOutcome, END_MARKER, START_MARKER};
use risq_engine::schema::{CompanyFinancialRecord, PredictionRecord, RiskTier};
use risq_engine::{Pipeline, PipelineFailure, StoreError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// -------------------------------------------------------------------------------------------------
// Fakes

/// Replays a fixed outcome and remembers what it was handed.
struct FakeEngine {
    outcome: InvocationOutcome,
    calls: Mutex<Vec<(PathBuf, Option<String>)>>,
}

impl FakeEngine {
    fn new(outcome: InvocationOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn exits_with(stdout: &str) -> Arc<Self> {
        Self::new(InvocationOutcome::Completed {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        })
    }

    fn calls(&self) -> Vec<(PathBuf, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    fn input_path(&self) -> PathBuf {
        self.calls()[0].0.clone()
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn invoke(&self, input: &Path) -> InvocationOutcome {
        let contents = std::fs::read_to_string(input).ok();
        self.calls.lock().unwrap().push((input.to_path_buf(), contents));
        self.outcome.clone()
    }
}

#[derive(Default)]
struct MemoryStore {
    records: Mutex<Vec<PredictionRecord>>,
}

impl MemoryStore {
    fn saved(&self) -> Vec<PredictionRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl PredictionStore for MemoryStore {
    async fn save(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct BrokenStore;

#[async_trait]
impl PredictionStore for BrokenStore {
    async fn save(&self, _record: &PredictionRecord) -> Result<(), StoreError> {
        Err(StoreError::Other("database is read-only".to_string()))
    }
}

// -------------------------------------------------------------------------------------------------
// Fixtures

fn acme() -> CompanyFinancialRecord {
    serde_json::from_value(serde_json::json!({
        "CompanyName": "Acme Corp",
        "Symbol": "ACM",
        "Sector": "Industrials",
        "Year": 2024,
        "netProfitMargin": 0.12,
        "returnOnAssets": 0.08,
        "debtRatio": 0.45,
        "freeCashFlowOperatingCashFlowRatio": 0.7,
        "freeCashFlowPerShare": 3.1,
        "operatingCashFlowSalesRatio": 0.15
    }))
    .unwrap()
}

fn acme_stdout() -> String {
    format!(
        "loading model...\n{START_MARKER}\n{}\n{END_MARKER}\ndone\n",
        r#"{
            "symbol": "ACM",
            "sector": "Industrials",
            "base": {
                "predicted_rating": "Low Risk",
                "probabilities": {
                    "proba_High_Risk": 0.1,
                    "proba_Highest_Risk": 0.05,
                    "proba_Low_Risk": 0.7,
                    "proba_Medium_Risk": 0.15
                },
                "top_features": [ { "Feature": "debtRatio", "Contribution": -0.21 } ]
            },
            "news": { "sentiment_7d": 0.0, "n_articles_7d": 0, "neg_event_spike": false, "top_headlines": [] },
            "after_news": {
                "predicted_rating": "Low Risk",
                "probabilities": {
                    "proba_High_Risk": 0.1,
                    "proba_Highest_Risk": 0.05,
                    "proba_Low_Risk": 0.7,
                    "proba_Medium_Risk": 0.15
                },
                "debug": { "news_adj": 0.0, "alpha": 0.5, "gamma": 1.0, "neg_event_spike": false, "n_articles_7d": 0 }
            }
        }"#
    )
}

fn pipeline(engine: Arc<FakeEngine>, store: Arc<dyn PredictionStore>, scratch: &Path) -> Pipeline {
    Pipeline::new(engine, store).with_scratch_dir(scratch)
}

// -------------------------------------------------------------------------------------------------

#[tokio::test]
async fn acme_prediction_is_normalized_and_stored() {
    let scratch = tempfile::tempdir().unwrap();
    let engine = FakeEngine::exits_with(&acme_stdout());
    let store = Arc::new(MemoryStore::default());

    let record = pipeline(engine.clone(), store.clone(), scratch.path())
        .predict(&acme())
        .await
        .unwrap();

    assert_eq!(record.prediction.symbol, "ACM");
    assert_eq!(record.prediction.sector.as_deref(), Some("Industrials"));
    assert_eq!(record.prediction.base.predicted_rating, Some(RiskTier::Low));
    assert_eq!(record.prediction.base.probabilities.low_risk, Some(0.7));
    assert_eq!(record.prediction.base.top_features.len(), 1);
    assert!(record.prediction.news.top_headlines.is_empty());
    assert_eq!(record.prediction.after_news.debug.alpha, Some(0.5));
    assert_eq!(record.metadata.backend_version, "1.0.0");
    assert!(record.metadata.processing_time_included);

    assert_eq!(store.saved(), vec![record]);
}

#[tokio::test]
async fn engine_receives_the_ordered_feature_vector() {
    let scratch = tempfile::tempdir().unwrap();
    let engine = FakeEngine::exits_with(&acme_stdout());

    pipeline(engine.clone(), Arc::new(MemoryStore::default()), scratch.path())
        .predict(&acme())
        .await
        .unwrap();

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    let raw = calls[0].1.as_deref().expect("input was readable during the run");
    let positions: Vec<usize> = [
        "CompanyName",
        "Symbol",
        "Sector",
        "Year",
        "netProfitMargin",
        "returnOnAssets",
        "debtRatio",
        "freeCashFlowOperatingCashFlowRatio",
        "freeCashFlowPerShare",
        "operatingCashFlowSalesRatio",
    ]
    .iter()
    .map(|key| raw.find(&format!("\"{key}\"")).unwrap())
    .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

    let input: Value = serde_json::from_str(raw).unwrap();
    assert_eq!(input["Symbol"], "ACM");
    assert_eq!(input["debtRatio"], 0.45);
}

#[tokio::test]
async fn artifact_is_removed_after_success() {
    let scratch = tempfile::tempdir().unwrap();
    let engine = FakeEngine::exits_with(&acme_stdout());

    pipeline(engine.clone(), Arc::new(MemoryStore::default()), scratch.path())
        .predict(&acme())
        .await
        .unwrap();

    let input = engine.input_path();
    assert!(input.starts_with(scratch.path()));
    assert!(!input.exists());
}

#[tokio::test]
async fn non_zero_exit_reports_stderr_and_stores_nothing() {
    let scratch = tempfile::tempdir().unwrap();
    let engine = FakeEngine::new(InvocationOutcome::Completed {
        stdout: acme_stdout(),
        stderr: "Traceback (most recent call last):\nValueError: bad input".to_string(),
        exit_code: Some(1),
    });
    let store = Arc::new(MemoryStore::default());

    let err = pipeline(engine.clone(), store.clone(), scratch.path())
        .predict(&acme())
        .await
        .unwrap_err();

    match err {
        PipelineFailure::EngineNonZeroExit {
            exit_code,
            diagnostic,
        } => {
            assert_eq!(exit_code, 1);
            assert!(diagnostic.starts_with("Traceback"));
        }
        other => panic!("unexpected failure: {other:?}"),
    }
    assert!(store.saved().is_empty());
    assert!(!engine.input_path().exists());
}

#[tokio::test]
async fn timed_out_engine_reports_124() {
    let scratch = tempfile::tempdir().unwrap();
    let engine = FakeEngine::new(InvocationOutcome::TimedOut {
        after: std::time::Duration::from_secs(120),
    });

    let err = pipeline(engine, Arc::new(MemoryStore::default()), scratch.path())
        .predict(&acme())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineFailure::EngineNonZeroExit { exit_code: 124, .. }
    ));
}

#[tokio::test]
async fn output_without_payload_is_not_found() {
    let scratch = tempfile::tempdir().unwrap();
    let engine = FakeEngine::exits_with("model loaded\nnothing to report\n");
    let store = Arc::new(MemoryStore::default());

    let err = pipeline(engine.clone(), store.clone(), scratch.path())
        .predict(&acme())
        .await
        .unwrap_err();

    match err {
        PipelineFailure::PayloadNotFound { raw_output_sample } => {
            assert!(raw_output_sample.contains("model loaded"));
        }
        other => panic!("unexpected failure: {other:?}"),
    }
    assert!(store.saved().is_empty());
    assert!(!engine.input_path().exists());
}

#[tokio::test]
async fn broken_payload_is_malformed() {
    let scratch = tempfile::tempdir().unwrap();
    let stdout = format!("{START_MARKER}\n{{\"base\": }}\n{END_MARKER}\n");
    let engine = FakeEngine::exits_with(&stdout);
    let store = Arc::new(MemoryStore::default());

    let err = pipeline(engine.clone(), store.clone(), scratch.path())
        .predict(&acme())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineFailure::PayloadMalformed(_)));
    assert!(store.saved().is_empty());
    assert!(!engine.input_path().exists());
}

#[tokio::test]
async fn fallback_block_without_markers_is_accepted() {
    let scratch = tempfile::tempdir().unwrap();
    let engine = FakeEngine::exits_with(
        "warming up\n{\n  \"base\": { \"predicted_rating\": \"High Risk\" }\n}\n",
    );

    let record = pipeline(engine, Arc::new(MemoryStore::default()), scratch.path())
        .predict(&acme())
        .await
        .unwrap();

    assert_eq!(record.prediction.symbol, "ACM");
    assert_eq!(record.prediction.sector.as_deref(), Some("Industrials"));
    assert_eq!(record.prediction.base.predicted_rating, Some(RiskTier::High));
    assert_eq!(record.prediction.after_news.predicted_rating, None);
}

#[tokio::test]
async fn invalid_input_never_reaches_the_engine() {
    let scratch = tempfile::tempdir().unwrap();
    let engine = FakeEngine::exits_with(&acme_stdout());
    let mut company = acme();
    company.symbol = Some("   ".to_string());

    let err = pipeline(engine.clone(), Arc::new(MemoryStore::default()), scratch.path())
        .predict(&company)
        .await
        .unwrap_err();

    assert!(err.is_caller_fault());
    assert!(engine.calls().is_empty());
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn store_failure_surfaces_as_persistence_failure() {
    let scratch = tempfile::tempdir().unwrap();
    let engine = FakeEngine::exits_with(&acme_stdout());

    let err = pipeline(engine.clone(), Arc::new(BrokenStore), scratch.path())
        .predict(&acme())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineFailure::PersistenceFailure(_)));
    assert!(!err.is_caller_fault());
    assert!(!engine.input_path().exists());
}

#[tokio::test]
async fn existing_input_file_is_left_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("acme.json");
    std::fs::write(&input, serde_json::to_vec(&acme()).unwrap()).unwrap();
    let engine = FakeEngine::exits_with(&acme_stdout());
    let store = Arc::new(MemoryStore::default());

    let record = pipeline(engine.clone(), store.clone(), dir.path())
        .predict_from_file(&input)
        .await
        .unwrap();

    assert_eq!(engine.input_path(), input);
    assert!(input.exists());
    assert_eq!(record.prediction.symbol, "ACM");
    assert_eq!(store.saved().len(), 1);
}

#[tokio::test]
async fn unreadable_input_file_is_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::exits_with(&acme_stdout());

    let err = pipeline(engine.clone(), Arc::new(MemoryStore::default()), dir.path())
        .predict_from_file(dir.path().join("missing.json"))
        .await
        .unwrap_err();

    assert!(err.is_caller_fault());
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn every_run_gets_its_own_id_and_artifact() {
    let scratch = tempfile::tempdir().unwrap();
    let engine = FakeEngine::exits_with(&acme_stdout());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline(engine.clone(), store.clone(), scratch.path());

    let (company_a, company_b) = (acme(), acme());
    let (a, b) = tokio::join!(pipeline.predict(&company_a), pipeline.predict(&company_b));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.id, b.id);
    let calls = engine.calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].0, calls[1].0);
    assert_eq!(store.saved().len(), 2);
}
