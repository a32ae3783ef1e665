use crate::api::{CompanySource, HttpClient};
use crate::error::SourceError;
use crate::schema::{CompanyFinancialRecord, Ratios};
use async_trait::async_trait;
use chrono::Datelike;
use dotenv::var;
use reqwest::Url;
use risq_util::Util;
use serde::Deserialize;
use tracing::{debug, error, trace};

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// API Documentation: https://site.financialmodelingprep.com/developer/docs
//
////////////////////////////////////////////////////////////////////////////////////////////////////

pub static BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

pub struct Fmp {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
}

impl Fmp {
    pub fn new(http_client: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Build from `FMP_API_KEY` (required) and `USER_AGENT` (optional).
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = var("FMP_API_KEY")
            .map_err(|_| anyhow::anyhow!("FMP_API_KEY must be set to query company data"))?;
        let mut builder = reqwest::ClientBuilder::new();
        if let Ok(user_agent) = var("USER_AGENT") {
            builder = builder.user_agent(user_agent);
        }
        Ok(Self::new(builder.build()?, api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, endpoint: &str, params: &[(&str, &str)]) -> anyhow::Result<String> {
        let mut url = Url::parse(&format!("{}/{endpoint}", self.base_url))?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("apikey", &self.api_key);
        Ok(url.into())
    }

    /// Resolve a free-text company name to its ticker symbol.
    pub async fn symbol_for(&self, company_name: &str) -> Result<String, SourceError> {
        let url = self.url("search", &[("query", company_name), ("limit", "1")])?;
        let hits: Vec<SearchHit> = self.http_client.fetch_json(&url).await?;
        hits.into_iter()
            .next()
            .map(|hit| hit.symbol)
            .ok_or_else(|| SourceError::CompanyNotFound(company_name.to_string()))
    }

    async fn first<T>(&self, endpoint: String, params: &[(&str, &str)]) -> Result<Option<T>, SourceError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let url = self.url(&endpoint, params)?;
        let rows: Vec<T> = self.http_client.fetch_json(&url).await.map_err(|e| {
            error!("failed to fetch {endpoint}: {e}");
            e
        })?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl CompanySource for Fmp {
    async fn company_by_name(&self, name: &str) -> Result<CompanyFinancialRecord, SourceError> {
        let time = std::time::Instant::now();
        let symbol = self.symbol_for(name).await?;
        trace!("[{symbol}] resolved from \"{name}\"");

        let latest = [("limit", "1")];
        let (profile, ratios, balance, cash_flow, key_metrics) = tokio::try_join!(
            self.first::<Profile>(format!("profile/{symbol}"), &[]),
            self.first::<RatioRow>(format!("ratios/{symbol}"), &latest),
            self.first::<BalanceSheet>(format!("balance-sheet-statement/{symbol}"), &latest),
            self.first::<CashFlow>(format!("cash-flow-statement/{symbol}"), &latest),
            self.first::<KeyMetrics>(format!("key-metrics/{symbol}"), &latest),
        )?;

        let profile = profile.ok_or_else(|| SourceError::MissingData {
            dataset: "profile",
            symbol: symbol.clone(),
        })?;

        let record = assemble(
            profile,
            ratios.unwrap_or_default(),
            balance.unwrap_or_default(),
            cash_flow.unwrap_or_default(),
            key_metrics.unwrap_or_default(),
            chrono::Utc::now().year(),
        );
        debug!(
            "[{symbol}] financials collected, elapsed time: {} ms",
            time.elapsed().as_millis()
        );
        Ok(record)
    }
}

// -------------------------------------------------------------------------------------------------
// Ratio derivation; anything that cannot be computed stays `None` instead of being guessed.

pub(crate) fn assemble(
    profile: Profile,
    ratios: RatioRow,
    balance: BalanceSheet,
    cash_flow: CashFlow,
    key_metrics: KeyMetrics,
    year: i32,
) -> CompanyFinancialRecord {
    let free_cash_flow_per_share = key_metrics
        .free_cash_flow_per_share
        .filter(|v| *v != 0.0)
        .or_else(|| ratio(cash_flow.free_cash_flow, key_metrics.shares_outstanding));

    CompanyFinancialRecord {
        company_name: profile.company_name,
        symbol: profile.symbol,
        sector: profile.sector.filter(|s| !s.is_empty()),
        year: Some(year),
        ratios: Ratios {
            net_profit_margin: ratios.net_profit_margin,
            return_on_assets: ratios.return_on_assets,
            debt_ratio: ratio(balance.total_liabilities, balance.total_assets).map(round2),
            free_cash_flow_operating_cash_flow_ratio: ratio(
                cash_flow.free_cash_flow,
                cash_flow.operating_cash_flow,
            )
            .map(round2),
            free_cash_flow_per_share: free_cash_flow_per_share.map(round2),
            operating_cash_flow_sales_ratio: ratio(cash_flow.operating_cash_flow, profile.mkt_cap)
                .map(round2),
        },
    }
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d).filter(|v| v.is_finite()),
        _ => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Deserialization
//
////////////////////////////////////////////////////////////////////////////////////////////////////

// [ { "symbol": "AAPL", "name": "Apple Inc.", ... } ]
#[derive(Debug, Deserialize)]
struct SearchHit {
    symbol: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Profile {
    pub company_name: Option<String>,
    pub symbol: Option<String>,
    pub sector: Option<String>,
    pub mkt_cap: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RatioRow {
    pub net_profit_margin: Option<f64>,
    pub return_on_assets: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BalanceSheet {
    pub total_liabilities: Option<f64>,
    pub total_assets: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CashFlow {
    pub free_cash_flow: Option<f64>,
    pub operating_cash_flow: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct KeyMetrics {
    pub free_cash_flow_per_share: Option<f64>,
    pub shares_outstanding: Option<f64>,
}
