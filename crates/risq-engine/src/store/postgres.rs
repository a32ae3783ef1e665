use crate::api::{CompanyStore, PgClient, PredictionStore};
use crate::error::StoreError;
use crate::schema::{CompanyFinancialRecord, PredictionRecord};
use async_trait::async_trait;
use tokio_postgres::types::Json;
use tokio_postgres::NoTls;
use tracing::{debug, error, trace};
use uuid::Uuid;

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// PostgreSQL prediction store
//
////////////////////////////////////////////////////////////////////////////////////////////////////

pub static SCHEMA_QUERY: &str = "
    CREATE SCHEMA IF NOT EXISTS prediction;
    CREATE TABLE IF NOT EXISTS prediction.outputs (
        output_id           UUID PRIMARY KEY,
        created_at          TIMESTAMPTZ NOT NULL,
        symbol              TEXT NOT NULL,
        sector              TEXT,
        base_rating         TEXT,
        after_news_rating   TEXT,
        prediction          JSONB NOT NULL,
        metadata            JSONB NOT NULL
    );
    CREATE INDEX IF NOT EXISTS outputs_symbol_idx ON prediction.outputs (symbol, created_at);
    CREATE TABLE IF NOT EXISTS prediction.inputs (
        input_id            UUID PRIMARY KEY,
        created_at          TIMESTAMPTZ NOT NULL,
        symbol              TEXT,
        company             JSONB NOT NULL
    );
";

pub static OUTPUT_QUERY: &str = "
    INSERT INTO prediction.outputs (
        output_id,
        created_at,
        symbol,
        sector,
        base_rating,
        after_news_rating,
        prediction,
        metadata
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (output_id) DO NOTHING
";

pub static INPUT_QUERY: &str = "
    INSERT INTO prediction.inputs (
        input_id,
        created_at,
        symbol,
        company
    )
    VALUES ($1, $2, $3, $4)
";

pub struct PgStore {
    pg_client: PgClient,
}

impl PgStore {
    /// Open a connection to `url`; the connection task is driven in the background.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        debug!("Establishing PostgreSQL connection");
        let (pg_client, pg_conn) = tokio_postgres::connect(url, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = pg_conn.await {
                error!("connection error: {}", e);
            }
        });
        debug!("PostgreSQL connection established");
        Ok(Self { pg_client })
    }

    pub fn from_client(pg_client: PgClient) -> Self {
        Self { pg_client }
    }

    /// Create the `prediction` schema and its tables, if missing.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        self.pg_client.batch_execute(SCHEMA_QUERY).await.map_err(|e| {
            error!("failed to create the prediction schema: {e}");
            e
        })?;
        debug!("prediction.outputs & prediction.inputs are ready");
        Ok(())
    }
}

#[async_trait]
impl PredictionStore for PgStore {
    async fn save(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        let time = std::time::Instant::now();
        let prediction = &record.prediction;
        let base_rating = prediction.base.predicted_rating.map(|tier| tier.label());
        let after_news_rating = prediction.after_news.predicted_rating.map(|tier| tier.label());

        self.pg_client
            .execute(
                OUTPUT_QUERY,
                &[
                    &record.id,
                    &record.timestamp,
                    &prediction.symbol,
                    &prediction.sector,
                    &base_rating,
                    &after_news_rating,
                    &Json(prediction),
                    &Json(&record.metadata),
                ],
            )
            .await
            .map_err(|e| {
                error!("[{}] prediction insert failed: {e}", prediction.symbol);
                e
            })?;

        trace!(
            "[{}] prediction {} inserted, elapsed time: {} ms",
            prediction.symbol,
            record.id,
            time.elapsed().as_millis()
        );
        Ok(())
    }
}

#[async_trait]
impl CompanyStore for PgStore {
    async fn save_company(&self, record: &CompanyFinancialRecord) -> Result<(), StoreError> {
        let symbol = record.symbol.as_deref().unwrap_or_default();
        self.pg_client
            .execute(
                INPUT_QUERY,
                &[
                    &Uuid::new_v4(),
                    &chrono::Utc::now(),
                    &record.symbol,
                    &Json(record),
                ],
            )
            .await
            .map_err(|e| {
                error!("[{symbol}] company snapshot insert failed: {e}");
                e
            })?;
        trace!("[{symbol}] company snapshot inserted");
        Ok(())
    }
}
