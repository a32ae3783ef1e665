use crate::engine::ExtractedPayload;
use crate::error::PipelineFailure;
use crate::schema::*;
use serde_json::Value;
use tracing::{error, trace};

/// Parse the extracted payload and project it onto [`StructuredPredictionResult`].
///
/// Parsing is the only step that can fail. The projection is total: the engine's
/// `symbol`/`sector` fall back to the caller's values, every other absent (or mistyped)
/// scalar becomes `None`, and absent lists become empty.
pub fn normalize(
    payload: &ExtractedPayload,
    fallback_symbol: &str,
    fallback_sector: Option<&str>,
) -> Result<StructuredPredictionResult, PipelineFailure> {
    let raw: Value = serde_json::from_str(payload.as_str()).map_err(|e| {
        error!("[{fallback_symbol}] failed to parse engine payload: {e}");
        PipelineFailure::PayloadMalformed(e.to_string())
    })?;

    if !raw.is_object() {
        error!("[{fallback_symbol}] engine payload is not a JSON object");
        return Err(PipelineFailure::PayloadMalformed(format!(
            "expected a JSON object, found {}",
            kind(&raw)
        )));
    }

    trace!("[{fallback_symbol}] projecting engine payload");
    Ok(project(&raw, fallback_symbol, fallback_sector))
}

fn project(
    raw: &Value,
    fallback_symbol: &str,
    fallback_sector: Option<&str>,
) -> StructuredPredictionResult {
    let base = &raw["base"];
    let news = &raw["news"];
    let after_news = &raw["after_news"];
    let debug = &after_news["debug"];

    StructuredPredictionResult {
        symbol: text(&raw["symbol"]).unwrap_or_else(|| fallback_symbol.to_string()),
        sector: text(&raw["sector"]).or_else(|| fallback_sector.map(str::to_string)),

        base: BaseAssessment {
            predicted_rating: rating(&base["predicted_rating"]),
            probabilities: probabilities(&base["probabilities"]),
            top_features: objects(&base["top_features"])
                .map(|item| FeatureContribution {
                    feature: text(&item["Feature"]),
                    contribution: item["Contribution"].as_f64(),
                })
                .collect(),
        },

        news: NewsSummary {
            sentiment_7d: news["sentiment_7d"].as_f64(),
            n_articles_7d: count(&news["n_articles_7d"]),
            neg_event_spike: news["neg_event_spike"].as_bool(),
            top_headlines: objects(&news["top_headlines"])
                .map(|item| Headline {
                    published_at: text(&item["publishedAt"]),
                    title: text(&item["title"]),
                    compound: item["compound"].as_f64(),
                })
                .collect(),
        },

        after_news: AdjustedAssessment {
            predicted_rating: rating(&after_news["predicted_rating"]),
            probabilities: probabilities(&after_news["probabilities"]),
            debug: AdjustmentDebug {
                news_adj: debug["news_adj"].as_f64(),
                alpha: debug["alpha"].as_f64(),
                gamma: debug["gamma"].as_f64(),
                neg_event_spike: debug["neg_event_spike"].as_bool(),
                n_articles_7d: count(&debug["n_articles_7d"]),
                skipped: text(&debug["skipped"]),
            },
        },
    }
}

// -------------------------------------------------------------------------------------------------
// Leaf readers; indexing a `Value` with a missing key yields `Value::Null`, so all of these
// are total.

fn probabilities(value: &Value) -> TierProbabilities {
    TierProbabilities {
        high_risk: value["proba_High_Risk"].as_f64(),
        highest_risk: value["proba_Highest_Risk"].as_f64(),
        low_risk: value["proba_Low_Risk"].as_f64(),
        medium_risk: value["proba_Medium_Risk"].as_f64(),
    }
}

fn rating(value: &Value) -> Option<RiskTier> {
    value.as_str().and_then(RiskTier::from_label)
}

/// A non-empty string.
fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A non-negative whole number; `3.0` is accepted as `3`.
fn count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64)
            .map(|n| n as u64)
    })
}

/// Object items of a list; anything that is not an object is skipped.
fn objects(value: &Value) -> impl Iterator<Item = &Value> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter(|item| item.is_object())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
