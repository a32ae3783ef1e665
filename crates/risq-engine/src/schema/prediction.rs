use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Structured prediction result
//
////////////////////////////////////////////////////////////////////////////////////////////////////

// Every leaf is always serialized; absent engine values are `null` and absent lists are `[]`,
// so downstream consumers never branch on key presence.
//
// {
//     "symbol": "AAPL",
//     "sector": "Technology",
//     "base": {
//         "predicted_rating": "Low Risk",
//         "probabilities": { "proba_High_Risk": 0.01, "proba_Highest_Risk": 0.001, ... },
//         "top_features": [ { "Feature": "debtRatio", "Contribution": 0.8 }, ... ]
//     },
//     "news": {
//         "sentiment_7d": 0.65,
//         "n_articles_7d": 6,
//         "neg_event_spike": false,
//         "top_headlines": [ { "publishedAt": "2025-08-20T10:00:00.000Z", "title": "...", "compound": 0.5 } ]
//     },
//     "after_news": {
//         "predicted_rating": "Low Risk",
//         "probabilities": { ... },
//         "debug": { "news_adj": 0.65, "alpha": 0.2, "gamma": 1.2, "neg_event_spike": false, "n_articles_7d": 6, "skipped": null }
//     }
// }
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StructuredPredictionResult {
    pub symbol: String,
    pub sector: Option<String>,
    pub base: BaseAssessment,
    pub news: NewsSummary,
    pub after_news: AdjustedAssessment,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct BaseAssessment {
    pub predicted_rating: Option<RiskTier>,
    pub probabilities: TierProbabilities,
    pub top_features: Vec<FeatureContribution>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TierProbabilities {
    #[serde(rename = "proba_High_Risk")]
    pub high_risk: Option<f64>,
    #[serde(rename = "proba_Highest_Risk")]
    pub highest_risk: Option<f64>,
    #[serde(rename = "proba_Low_Risk")]
    pub low_risk: Option<f64>,
    #[serde(rename = "proba_Medium_Risk")]
    pub medium_risk: Option<f64>,
}

/// A single (feature, signed contribution) pair, in the engine's ranking order.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct FeatureContribution {
    #[serde(rename = "Feature")]
    pub feature: Option<String>,
    #[serde(rename = "Contribution")]
    pub contribution: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct NewsSummary {
    pub sentiment_7d: Option<f64>,
    pub n_articles_7d: Option<u64>,
    pub neg_event_spike: Option<bool>,
    pub top_headlines: Vec<Headline>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Headline {
    /// Passed through exactly as the engine printed it.
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    pub title: Option<String>,
    pub compound: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AdjustedAssessment {
    pub predicted_rating: Option<RiskTier>,
    pub probabilities: TierProbabilities,
    pub debug: AdjustmentDebug,
}

/// How the after-news scoring was derived from the base scoring.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AdjustmentDebug {
    pub news_adj: Option<f64>,
    pub alpha: Option<f64>,
    pub gamma: Option<f64>,
    pub neg_event_spike: Option<bool>,
    pub n_articles_7d: Option<u64>,
    /// Set when the engine skipped the adjustment, e.g. `too_few_articles`.
    pub skipped: Option<String>,
}

// -------------------------------------------------------------------------------------------------
// Risk tiers

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum RiskTier {
    #[serde(rename = "Highest Risk", alias = "Highest_Risk")]
    Highest,
    #[serde(rename = "High Risk", alias = "High_Risk")]
    High,
    #[serde(rename = "Medium Risk", alias = "Medium_Risk")]
    Medium,
    #[serde(rename = "Low Risk", alias = "Low_Risk")]
    Low,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [
        RiskTier::Highest,
        RiskTier::High,
        RiskTier::Medium,
        RiskTier::Low,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Highest => "Highest Risk",
            RiskTier::High => "High Risk",
            RiskTier::Medium => "Medium Risk",
            RiskTier::Low => "Low Risk",
        }
    }

    /// Parse an engine label; both "Low Risk" and "Low_Risk" spellings are accepted.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().replace('_', " ");
        Self::ALL
            .into_iter()
            .find(|tier| tier.label().eq_ignore_ascii_case(&label))
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Persisted document
//
////////////////////////////////////////////////////////////////////////////////////////////////////

pub const BACKEND_VERSION: &str = "1.0.0";

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub prediction: StructuredPredictionResult,
    pub metadata: Metadata,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Metadata {
    pub backend_version: String,
    pub processing_time_included: bool,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            backend_version: BACKEND_VERSION.to_string(),
            processing_time_included: true,
        }
    }
}

impl PredictionRecord {
    pub fn new(id: Uuid, prediction: StructuredPredictionResult) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            prediction,
            metadata: Metadata::default(),
        }
    }
}
