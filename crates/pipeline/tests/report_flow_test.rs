//! Integration test for the full daily report flow.
//! Runs entirely in-memory: no LLM key and no ads credentials, so both
//! optional collaborators exercise their degraded paths.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use insight_core::types::{RawEvent, TimeRange};
use insight_core::{AppConfig, InsightResult};
use insight_pipeline::ReportGenerator;
use insight_store::{EventStore, MemoryEventStore};
use insight_synthesis::{InsightSynthesizer, LlmClient};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn ms_on(date: NaiveDate, offset_secs: i64) -> i64 {
    TimeRange::for_day(date).start.timestamp_millis() + offset_secs * 1000
}

/// Three visitors on the report day: one full purchase journey, one browser
/// who bails after the product page, one bounce. Plus one visitor the day
/// before, to seed the baseline and the returning-visitor split.
fn seeded_store() -> MemoryEventStore {
    let store = MemoryEventStore::new();
    let date = day();
    let prior = date - chrono::Duration::days(1);

    // Buyer: pageview -> product -> cart -> checkout -> purchase.
    store.append(RawEvent::pageview("buyer", ms_on(date, 0), "/"));
    store.append(RawEvent::pageview("buyer", ms_on(date, 30), "/products/original"));
    store.append(RawEvent::named_event("buyer", ms_on(date, 31), "product_view"));
    store.append(RawEvent::named_event("buyer", ms_on(date, 90), "add_to_cart"));
    store.append(RawEvent::named_event("buyer", ms_on(date, 150), "begin_checkout"));
    store.append(RawEvent::named_event("buyer", ms_on(date, 240), "purchase"));

    // Browser: looks at a product, never carts. Also visited yesterday.
    store.append(RawEvent::pageview("browser", ms_on(prior, 100), "/"));
    store.append(RawEvent::pageview("browser", ms_on(date, 10), "/"));
    store.append(RawEvent::pageview("browser", ms_on(date, 60), "/products/original"));
    store.append(RawEvent::named_event("browser", ms_on(date, 61), "product_view"));

    // Bouncer: one pageview, nothing else.
    store.append(RawEvent::pageview("bouncer", ms_on(date, 500), "/about"));

    // Malformed row: no client timestamp, must be skipped and counted.
    let mut broken = RawEvent::pageview("buyer", ms_on(date, 600), "/");
    broken.timestamp_ms = None;
    store.append(broken);

    store
}

fn generator(store: MemoryEventStore) -> ReportGenerator {
    let store: Arc<dyn EventStore> = Arc::new(store);
    ReportGenerator::new(store, AppConfig::default()).unwrap()
}

#[tokio::test]
async fn test_full_report_generation() {
    let report = generator(seeded_store()).generate(day()).await.unwrap();

    assert_eq!(report.report_date, day());
    assert_eq!(report.sessions_analyzed, 3);
    assert_eq!(report.skipped_events, 1);

    // Daily metrics over the three sessions.
    assert_eq!(report.daily_metrics.unique_visitors, 3);
    assert_eq!(report.daily_metrics.sessions, 3);
    assert_eq!(report.daily_metrics.pageviews, 5);
    // Only the bouncer bounced.
    assert_eq!(report.daily_metrics.bounce_rate, 33.3);
    // The browser was seen the day before.
    assert_eq!(report.daily_metrics.returning_visitors, 1);
    assert_eq!(report.daily_metrics.new_visitors, 2);
}

#[tokio::test]
async fn test_funnel_is_strictly_gated() {
    let report = generator(seeded_store()).generate(day()).await.unwrap();
    let counts: Vec<u64> = report
        .funnel_analysis
        .stages
        .iter()
        .map(|s| s.count)
        .collect();

    // All three sessions have a pageview; buyer and browser reach
    // product_view; only the buyer goes further.
    assert_eq!(counts, vec![3, 2, 1, 1, 1]);
    assert!(report.funnel_analysis.overall_conversion_rate > 0.0);
}

#[tokio::test]
async fn test_degraded_collaborators_still_produce_insights() {
    let report = generator(seeded_store()).generate(day()).await.unwrap();

    // No credentials configured, so no ads section.
    assert!(report.ads.is_none());

    // No LLM key, so the fallback narrative must still be present and capped.
    assert!(!report.insights.executive_summary.is_empty());
    assert!(!report.insights.key_insights.is_empty());
    assert!(!report.insights.recommendations.is_empty());
    assert!(report.insights.key_insights.len() <= 5);
}

#[tokio::test]
async fn test_conversion_intelligence_sections() {
    let report = generator(seeded_store()).generate(day()).await.unwrap();

    // One purchase session yields one conversion path.
    assert_eq!(report.top_conversion_paths.len(), 1);
    assert_eq!(report.top_conversion_paths[0].conversions, 1);

    // Purchasers and bounces are excluded from high intent.
    assert!(report
        .high_intent_sessions
        .iter()
        .all(|s| s.visitor_id != "buyer" && s.visitor_id != "bouncer"));

    // Recognized conversion events recorded on the day.
    let names: Vec<&str> = report
        .conversions
        .iter()
        .map(|c| c.event_name.as_str())
        .collect();
    assert!(names.contains(&"purchase"));
    assert!(names.contains(&"add_to_cart"));
}

#[tokio::test]
async fn test_empty_day_produces_quiet_report() {
    let report = generator(MemoryEventStore::new())
        .generate(day())
        .await
        .unwrap();

    assert_eq!(report.sessions_analyzed, 0);
    assert_eq!(report.daily_metrics.pageviews, 0);
    assert_eq!(report.daily_metrics.bounce_rate, 0.0);
    assert!(report.anomalies.is_empty());
    assert!(report.top_pages.is_empty());
    // The fallback still writes a summary for a dead day.
    assert!(!report.insights.executive_summary.is_empty());
}

struct ScriptedClient {
    reply: String,
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, _prompt: &str) -> InsightResult<String> {
        Ok(self.reply.clone())
    }
}

#[tokio::test]
async fn test_llm_reply_is_carried_into_the_report() {
    let reply = r#"{
        "executiveSummary": "A quiet but healthy day.",
        "keyInsights": ["One purchase completed"],
        "recommendations": ["Keep the current campaign running"],
        "risksAndOpportunities": { "risks": [], "opportunities": [] }
    }"#;
    let synthesizer = InsightSynthesizer::new(Some(Arc::new(ScriptedClient {
        reply: reply.to_string(),
    })));
    let store: Arc<dyn EventStore> = Arc::new(seeded_store());
    let generator =
        ReportGenerator::with_synthesizer(store, AppConfig::default(), synthesizer).unwrap();

    let report = generator.generate(day()).await.unwrap();
    assert_eq!(report.insights.executive_summary, "A quiet but healthy day.");
    assert_eq!(report.insights.key_insights, vec!["One purchase completed"]);
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let report = generator(seeded_store()).generate(day()).await.unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"report_date\""));
    assert!(json.contains("\"funnel_analysis\""));
}
