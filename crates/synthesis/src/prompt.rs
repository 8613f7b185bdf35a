//! Prompt construction for the LLM synthesis path.
//!
//! The prompt embeds every upstream metric and demands a JSON-only reply in
//! the exact shape `parse_insights` expects.

use crate::ReportInputs;
use std::fmt::Write;

pub fn build_prompt(inputs: &ReportInputs<'_>) -> String {
    let daily = inputs.daily;
    let baseline = inputs.baseline;

    let pageview_change = percent_change(daily.pageviews as f64, baseline.pageviews);
    let visitor_change = percent_change(daily.unique_visitors as f64, baseline.unique_visitors);

    let mut prompt = format!(
        "You are an expert e-commerce analytics analyst for a specialty food storefront. \
Analyze the following daily analytics data and provide actionable insights.

IMPORTANT GUIDELINES:
- This is a small but growing e-commerce business selling a niche product
- Low numbers are NORMAL for a niche product; do NOT assume features are broken because counts are low
- Focus on trends and relative changes, not absolute numbers
- Be specific and actionable in recommendations
- Consider seasonality and day-of-week effects
- If conversion numbers are zero or very low, suggest ways to IMPROVE conversions

---

## DAILY METRICS ({date})

- Pageviews: {pageviews} ({pv_change}% vs {window}-day avg)
- Unique Visitors: {visitors} ({visitor_change}% vs {window}-day avg)
- Sessions: {sessions}
- Bounce Rate: {bounce}%
- Avg Session Duration: {duration}s
- New vs Returning: {new} new, {returning} returning

## {window}-DAY BASELINE
- Avg Pageviews: {base_pv}
- Avg Visitors: {base_visitors}
- Avg Bounce Rate: {base_bounce}%
",
        date = daily.date,
        pageviews = daily.pageviews,
        pv_change = pageview_change,
        window = baseline.window_days,
        visitors = daily.unique_visitors,
        visitor_change = visitor_change,
        sessions = daily.sessions,
        bounce = daily.bounce_rate,
        duration = daily.avg_session_duration,
        new = daily.new_visitors,
        returning = daily.returning_visitors,
        base_pv = baseline.pageviews,
        base_visitors = baseline.unique_visitors,
        base_bounce = baseline.bounce_rate,
    );

    prompt.push_str("\n## CONVERSION FUNNEL\n");
    for stage in &inputs.funnel.stages {
        match stage.conversion_from_previous {
            Some(rate) => {
                let _ = writeln!(
                    prompt,
                    "- {}: {} sessions ({rate}% from previous)",
                    stage.label, stage.count
                );
            }
            None => {
                let _ = writeln!(prompt, "- {}: {} sessions", stage.label, stage.count);
            }
        }
    }
    let _ = writeln!(
        prompt,
        "- Overall Conversion Rate: {}%",
        inputs.funnel.overall_conversion_rate
    );
    if let Some(drop) = &inputs.funnel.biggest_drop_off {
        let _ = writeln!(
            prompt,
            "- Biggest Drop-off: {} to {} ({}% lost)",
            drop.from, drop.to, drop.drop_off_percent
        );
    }

    let quality = inputs.quality;
    let _ = write!(
        prompt,
        "\n## SESSION QUALITY DISTRIBUTION
- Low (0-25): {} sessions
- Medium (26-50): {} sessions
- High (51-75): {} sessions
- Excellent (76-100): {} sessions
- Average Score: {}/100
",
        quality.low, quality.medium, quality.high, quality.excellent, quality.average_score
    );

    prompt.push_str("\n## TOP PAGES\n");
    for page in inputs.top_pages.iter().take(5) {
        let _ = writeln!(
            prompt,
            "- {}: {} views, {}% bounce",
            page.path, page.views, page.bounce_rate
        );
    }

    prompt.push_str("\n## TRAFFIC SOURCES\n");
    for source in inputs.traffic_sources.iter().take(5) {
        let _ = writeln!(
            prompt,
            "- {}/{}: {} sessions, {}% conv rate",
            source.source, source.medium, source.sessions, source.conversion_rate
        );
    }

    prompt.push_str("\n## CONVERSION EVENTS\n");
    if inputs.conversions.is_empty() {
        prompt.push_str("- No conversion events recorded today\n");
    } else {
        for conversion in inputs.conversions {
            let _ = writeln!(
                prompt,
                "- {}: {} ({} unique visitors)",
                conversion.event_name, conversion.count, conversion.unique_visitors
            );
        }
    }

    prompt.push_str("\n## ANOMALIES DETECTED\n");
    if inputs.anomalies.is_empty() {
        prompt.push_str("- No significant anomalies detected\n");
    } else {
        for anomaly in inputs.anomalies {
            let _ = writeln!(prompt, "- [{:?}] {}", anomaly.severity, anomaly.description);
        }
    }

    if let Some(ads) = inputs.ads {
        let _ = write!(
            prompt,
            "\n## GOOGLE ADS PERFORMANCE
- Spend: ${}
- Clicks: {}
- Impressions: {}
- CTR: {}%
- CPC: ${}
- Conversions: {}
- ROAS: {}x

### Top Campaigns
",
            ads.spend, ads.clicks, ads.impressions, ads.ctr, ads.cpc, ads.conversions, ads.roas
        );
        for campaign in ads.campaigns.iter().take(5) {
            let _ = writeln!(
                prompt,
                "- {}: ${} spend, {} conversions, {}x ROAS",
                campaign.name, campaign.spend, campaign.conversions, campaign.roas
            );
        }
    }

    prompt.push_str(
        "\n---\n
Based on this data, provide your analysis in the following JSON format:

{
  \"executiveSummary\": \"2-3 sentence high-level summary of site performance\",
  \"keyInsights\": [\"insight 1\", \"insight 2\", \"insight 3\"],
  \"recommendations\": [\"actionable recommendation 1\", \"actionable recommendation 2\"],
  \"risksAndOpportunities\": {
    \"risks\": [\"risk 1\", \"risk 2\"],
    \"opportunities\": [\"opportunity 1\", \"opportunity 2\"]
  }
}

Respond with ONLY the JSON object, no additional text.",
    );

    prompt
}

fn percent_change(current: f64, baseline: f64) -> String {
    if baseline > 0.0 {
        format!("{:+.1}", (current - baseline) / baseline * 100.0)
    } else {
        "0".to_string()
    }
}
