use crate::error::PipelineFailure;
use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Company financials, as supplied by the upstream data provider
//
////////////////////////////////////////////////////////////////////////////////////////////////////

// {
//     "CompanyName": "Apple Inc.",
//     "Symbol": "AAPL",
//     "Sector": "Technology",
//     "Year": 2024,
//     "netProfitMargin": 0.24,
//     "returnOnAssets": 0.27,
//     "debtRatio": 0.84,
//     "freeCashFlowOperatingCashFlowRatio": 0.91,
//     "freeCashFlowPerShare": 7.09,
//     "operatingCashFlowSalesRatio": 0.03      <-- any ratio may be null
// }
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CompanyFinancialRecord {
    #[serde(rename = "CompanyName", default)]
    pub company_name: Option<String>,
    #[serde(rename = "Symbol", default)]
    pub symbol: Option<String>,
    #[serde(rename = "Sector", default)]
    pub sector: Option<String>,
    #[serde(rename = "Year", default)]
    pub year: Option<i32>,
    #[serde(flatten)]
    pub ratios: Ratios,
}

/// The six financial ratios the engine scores on.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ratios {
    #[serde(default)]
    pub net_profit_margin: Option<f64>,
    #[serde(default)]
    pub return_on_assets: Option<f64>,
    #[serde(default)]
    pub debt_ratio: Option<f64>,
    #[serde(default)]
    pub free_cash_flow_operating_cash_flow_ratio: Option<f64>,
    #[serde(default)]
    pub free_cash_flow_per_share: Option<f64>,
    #[serde(default)]
    pub operating_cash_flow_sales_ratio: Option<f64>,
}

// -------------------------------------------------------------------------------------------------
// Feature vector; the exact, ordered payload the engine reads from its input file.
//
// No `skip_serializing_if` anywhere: an absent value is written as `null`, never omitted.

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureVector {
    #[serde(rename = "CompanyName")]
    pub company_name: String,
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Sector")]
    pub sector: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<i32>,
    #[serde(rename = "netProfitMargin")]
    pub net_profit_margin: Option<f64>,
    #[serde(rename = "returnOnAssets")]
    pub return_on_assets: Option<f64>,
    #[serde(rename = "debtRatio")]
    pub debt_ratio: Option<f64>,
    #[serde(rename = "freeCashFlowOperatingCashFlowRatio")]
    pub free_cash_flow_operating_cash_flow_ratio: Option<f64>,
    #[serde(rename = "freeCashFlowPerShare")]
    pub free_cash_flow_per_share: Option<f64>,
    #[serde(rename = "operatingCashFlowSalesRatio")]
    pub operating_cash_flow_sales_ratio: Option<f64>,
}

impl FeatureVector {
    /// Field names in the order they are serialized.
    pub const FIELDS: [&'static str; 10] = [
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
    ];
}

impl TryFrom<&CompanyFinancialRecord> for FeatureVector {
    type Error = PipelineFailure;

    fn try_from(record: &CompanyFinancialRecord) -> Result<Self, Self::Error> {
        let company_name = required(&record.company_name, "CompanyName")?;
        let symbol = required(&record.symbol, "Symbol")?;
        let ratios = &record.ratios;

        Ok(Self {
            company_name,
            symbol,
            sector: record.sector.clone(),
            year: record.year,
            net_profit_margin: ratios.net_profit_margin,
            return_on_assets: ratios.return_on_assets,
            debt_ratio: ratios.debt_ratio,
            free_cash_flow_operating_cash_flow_ratio: ratios
                .free_cash_flow_operating_cash_flow_ratio,
            free_cash_flow_per_share: ratios.free_cash_flow_per_share,
            operating_cash_flow_sales_ratio: ratios.operating_cash_flow_sales_ratio,
        })
    }
}

fn required(field: &Option<String>, name: &str) -> Result<String, PipelineFailure> {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(PipelineFailure::InvalidInput(format!(
            "{name} is required and must be a non-empty string"
        ))),
    }
}
