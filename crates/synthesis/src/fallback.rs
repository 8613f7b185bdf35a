//! Deterministic, rule-based insight generation used whenever the LLM path
//! is unavailable or returns something unusable. Must never fail.

use crate::ReportInputs;
use insight_core::types::{AiInsights, AnomalySeverity, RisksAndOpportunities};

/// Derive a best-effort summary purely from arithmetic thresholds already
/// computed upstream. Always returns a well-formed, capped `AiInsights` with
/// at least one insight and one recommendation.
pub fn generate_fallback_insights(inputs: &ReportInputs<'_>) -> AiInsights {
    let daily = inputs.daily;
    let baseline = inputs.baseline;
    let funnel = inputs.funnel;

    let mut insights = Vec::new();
    let mut recommendations = Vec::new();
    let mut risks = Vec::new();
    let mut opportunities = Vec::new();

    let pageview_change = if baseline.pageviews > 0.0 {
        (daily.pageviews as f64 - baseline.pageviews) / baseline.pageviews * 100.0
    } else {
        0.0
    };

    if pageview_change > 20.0 {
        insights.push(format!(
            "Traffic increased {:.0}% compared to the {}-day average",
            pageview_change, baseline.window_days
        ));
        opportunities.push("Capitalize on increased traffic with targeted promotions".to_string());
    } else if pageview_change < -20.0 {
        insights.push(format!(
            "Traffic decreased {:.0}% compared to the {}-day average",
            pageview_change.abs(),
            baseline.window_days
        ));
        risks.push("Traffic decline may require attention".to_string());
    }

    if let Some(drop) = &funnel.biggest_drop_off {
        insights.push(format!(
            "Biggest funnel drop-off is {} to {} ({} sessions lost)",
            drop.from, drop.to, drop.dropped
        ));
        recommendations.push(format!(
            "Optimize the {} to {} transition",
            drop.from, drop.to
        ));
    }

    if daily.bounce_rate > 70.0 {
        insights.push(format!(
            "High bounce rate of {}% needs attention",
            daily.bounce_rate
        ));
        recommendations.push("Review landing pages for relevance and load speed".to_string());
    }

    for anomaly in inputs
        .anomalies
        .iter()
        .filter(|a| a.severity == AnomalySeverity::Critical)
        .take(2)
    {
        risks.push(anomaly.description.clone());
    }

    if insights.is_empty() {
        insights.push("Site metrics are within normal ranges".to_string());
    }
    if recommendations.is_empty() {
        recommendations.push("Continue monitoring key metrics".to_string());
    }

    let conversion_note = if funnel.overall_conversion_rate > 0.0 {
        format!(
            "Conversion rate was {}%.",
            funnel.overall_conversion_rate
        )
    } else {
        "Focus on improving the conversion funnel.".to_string()
    };

    AiInsights {
        executive_summary: format!(
            "The day saw {} pageviews and {} unique visitors with a {}% bounce rate. {}",
            daily.pageviews, daily.unique_visitors, daily.bounce_rate, conversion_note
        ),
        key_insights: insights,
        recommendations,
        risks_and_opportunities: RisksAndOpportunities {
            risks,
            opportunities,
        },
    }
    .truncated()
}
