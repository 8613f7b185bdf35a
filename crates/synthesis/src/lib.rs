//! Insight Synthesis — turns the computed analytics sections into a
//! narrative `AiInsights` block, via an LLM when one is configured and a
//! deterministic rule set otherwise.
//!
//! The synthesizer never fails: any error on the LLM path (missing key,
//! network, bad status, unparseable reply) falls through to the fallback
//! generator, so report generation is never blocked on the model.

pub mod client;
pub mod fallback;
pub mod json;
pub mod prompt;

use std::sync::Arc;

use insight_core::types::{
    AdsMetrics, AiInsights, Anomaly, BaselineMetrics, ConversionEventCount, DailyMetrics,
    FunnelAnalysis, RisksAndOpportunities, SessionQualityDistribution, TopPage, TrafficSource,
};
use insight_core::{InsightError, InsightResult};
use serde::Deserialize;
use tracing::{debug, warn};

pub use client::{AnthropicClient, LlmClient};
pub use fallback::generate_fallback_insights;

// ─── Report Inputs ───────────────────────────────────────────────────

/// Borrowed view of every computed report section the synthesizer reads.
pub struct ReportInputs<'a> {
    pub daily: &'a DailyMetrics,
    pub baseline: &'a BaselineMetrics,
    pub funnel: &'a FunnelAnalysis,
    pub quality: &'a SessionQualityDistribution,
    pub anomalies: &'a [Anomaly],
    pub top_pages: &'a [TopPage],
    pub traffic_sources: &'a [TrafficSource],
    pub conversions: &'a [ConversionEventCount],
    pub ads: Option<&'a AdsMetrics>,
}

// ─── Response Parsing ────────────────────────────────────────────────

// The prompt demands camelCase keys; the wire shape is decoupled from the
// snake_case report types on purpose.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsightsReply {
    executive_summary: String,
    key_insights: Vec<String>,
    recommendations: Vec<String>,
    #[serde(default)]
    risks_and_opportunities: RisksReply,
}

#[derive(Deserialize, Default)]
struct RisksReply {
    #[serde(default)]
    risks: Vec<String>,
    #[serde(default)]
    opportunities: Vec<String>,
}

/// Parse the raw LLM reply into `AiInsights`, tolerating prose or code
/// fences around the JSON object. Empty summaries are rejected so a
/// degenerate reply falls back instead of producing a hollow report.
pub fn parse_insights(raw: &str) -> InsightResult<AiInsights> {
    let object = json::extract_json_object(raw)
        .ok_or_else(|| InsightError::Synthesis("no JSON object in LLM reply".to_string()))?;

    let reply: InsightsReply = serde_json::from_str(&object)
        .map_err(|e| InsightError::Synthesis(format!("LLM reply did not match schema: {e}")))?;

    if reply.executive_summary.trim().is_empty() {
        return Err(InsightError::Synthesis(
            "LLM reply has an empty executive summary".to_string(),
        ));
    }

    Ok(AiInsights {
        executive_summary: reply.executive_summary,
        key_insights: reply.key_insights,
        recommendations: reply.recommendations,
        risks_and_opportunities: RisksAndOpportunities {
            risks: reply.risks_and_opportunities.risks,
            opportunities: reply.risks_and_opportunities.opportunities,
        },
    }
    .truncated())
}

// ─── Synthesizer ─────────────────────────────────────────────────────

/// Orchestrates the two synthesis paths. Holds no per-report state.
pub struct InsightSynthesizer {
    client: Option<Arc<dyn LlmClient>>,
}

impl InsightSynthesizer {
    pub fn new(client: Option<Arc<dyn LlmClient>>) -> Self {
        Self { client }
    }

    /// Build from config, degrading to fallback-only when no API key is set.
    pub fn from_config(config: insight_core::config::LlmConfig) -> Self {
        match AnthropicClient::new(config) {
            Ok(client) => Self::new(Some(Arc::new(client))),
            Err(e) => {
                debug!(reason = %e, "LLM client unavailable, using fallback insights");
                Self::new(None)
            }
        }
    }

    /// Produce insights for the report. One LLM attempt, no retries; any
    /// failure logs a warning and yields the deterministic fallback.
    pub async fn synthesize(&self, inputs: &ReportInputs<'_>) -> AiInsights {
        let Some(client) = &self.client else {
            return generate_fallback_insights(inputs);
        };

        let prompt = prompt::build_prompt(inputs);
        match client.complete(&prompt).await {
            Ok(raw) => match parse_insights(&raw) {
                Ok(insights) => insights,
                Err(e) => {
                    warn!(error = %e, "discarding unusable LLM reply");
                    generate_fallback_insights(inputs)
                }
            },
            Err(e) => {
                warn!(error = %e, "LLM completion failed");
                generate_fallback_insights(inputs)
            }
        }
    }
}

// ─── Test Support ────────────────────────────────────────────────────
