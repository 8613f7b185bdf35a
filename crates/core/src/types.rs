//! Shared value objects for the analytics intelligence pipeline.
//!
//! Everything here is a plain serde type: raw events come out of the event
//! store, every derived structure is recomputed per report and never
//! persisted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Event names treated as conversions. Funnel stage predicates and the
/// conversion breakdown both key off this set.
pub const CONVERSION_EVENTS: &[&str] = &[
    "purchase",
    "begin_checkout",
    "add_to_cart",
    "form_submit",
    "phone_click",
    "contact_submit",
    "wholesale_form_submit",
    "waitlist_signup",
];

/// Returns true if the event name is one of the recognized conversion events.
pub fn is_conversion_event(name: &str) -> bool {
    CONVERSION_EVENTS.contains(&name)
}

/// Half-open time range `[start, end)` used for all store queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Full calendar day `[00:00, 24:00)` in UTC.
    pub fn for_day(date: NaiveDate) -> Self {
        let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
        Self {
            start,
            end: start + chrono::Duration::days(1),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

// ─── Raw Events ──────────────────────────────────────────────────────

/// A single immutable interaction event as written by instrumentation.
///
/// `visitor_id` and `timestamp_ms` are optional because the log contains the
/// occasional malformed row; downstream consumers skip (and count) those
/// rather than failing the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: Uuid,
    /// Server-side ingestion time; always present, used for range queries.
    pub received_at: DateTime<Utc>,
    /// Coarse kind: `pageview` for navigation, `event` for everything else.
    pub event_type: String,
    pub event_name: Option<String>,
    pub visitor_id: Option<String>,
    /// Client clock, milliseconds since the Unix epoch. Nullable: a handful
    /// of rows arrive without it and are skipped during reconstruction.
    pub timestamp_ms: Option<i64>,
    pub path: Option<String>,
    /// Raw query string of the landing URL, if captured (UTM parsing source).
    pub query_params: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RawEvent {
    pub fn pageview(visitor_id: &str, timestamp_ms: i64, path: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_else(Utc::now),
            event_type: "pageview".to_string(),
            event_name: None,
            visitor_id: Some(visitor_id.to_string()),
            timestamp_ms: Some(timestamp_ms),
            path: Some(path.to_string()),
            query_params: None,
            metadata: HashMap::new(),
        }
    }

    pub fn named_event(visitor_id: &str, timestamp_ms: i64, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_else(Utc::now),
            event_type: "event".to_string(),
            event_name: Some(name.to_string()),
            visitor_id: Some(visitor_id.to_string()),
            timestamp_ms: Some(timestamp_ms),
            path: None,
            query_params: None,
            metadata: HashMap::new(),
        }
    }

    pub fn is_pageview(&self) -> bool {
        self.event_type == "pageview"
    }

    /// Malformed rows are skipped by the session reconstructor.
    pub fn is_well_formed(&self) -> bool {
        self.visitor_id.is_some() && self.timestamp_ms.is_some()
    }
}

// ─── Sessions ────────────────────────────────────────────────────────

/// One event inside a reconstructed session, trimmed to what analysis needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub event_type: String,
    pub event_name: Option<String>,
    pub path: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn is_pageview(&self) -> bool {
        self.event_type == "pageview"
    }
}

/// A bounded browsing session derived from one visitor's event stream.
///
/// In-memory only: recomputed on every report, never written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructedSession {
    /// Synthesized as `{visitor_id}-{start_ms}`.
    pub id: String,
    pub visitor_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub page_views: u32,
    pub events: Vec<SessionEvent>,
    pub entry_page: String,
    pub exit_page: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub had_conversion: bool,
    pub conversion_type: Option<String>,
    /// Exactly one pageview and no other engagement event.
    pub is_bounce: bool,
    /// No session for this visitor within the lookback window before the
    /// report day. Depends on how much history the store retains.
    pub is_new_visitor: bool,
}

impl ReconstructedSession {
    pub fn has_event(&self, name: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.event_name.as_deref() == Some(name))
    }

    pub fn unique_pages(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for event in &self.events {
            if let Some(path) = event.path.as_deref() {
                if !seen.contains(&path) {
                    seen.push(path);
                }
            }
        }
        seen
    }
}

// ─── Daily & Baseline Metrics ────────────────────────────────────────

/// Aggregated traffic metrics for one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub pageviews: u64,
    pub unique_visitors: u64,
    pub sessions: u64,
    /// Percent in [0, 100], one decimal.
    pub bounce_rate: f64,
    pub avg_session_duration: f64,
    pub new_visitors: u64,
    pub returning_visitors: u64,
}

/// Trailing-window averages of the daily metrics, used only as the anomaly
/// comparison point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineMetrics {
    pub window_days: u32,
    pub pageviews: f64,
    pub unique_visitors: f64,
    pub sessions: f64,
    pub bounce_rate: f64,
    pub avg_session_duration: f64,
}

// ─── Page / Source / Conversion Breakdowns ───────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopPage {
    pub path: String,
    pub views: u64,
    pub unique_visitors: u64,
    pub avg_time_on_page: f64,
    pub bounce_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficSource {
    pub source: String,
    pub medium: String,
    pub sessions: u64,
    pub visitors: u64,
    pub bounce_rate: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionEventCount {
    pub event_name: String,
    pub count: u64,
    pub unique_visitors: u64,
}

// ─── Funnel ──────────────────────────────────────────────────────────

/// One stage's result in the conversion funnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelStageData {
    pub stage: String,
    pub label: String,
    pub count: u64,
    /// None for the first stage, or when the previous stage count is zero.
    pub conversion_from_previous: Option<f64>,
    pub conversion_from_top: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelDropOff {
    pub from: String,
    pub to: String,
    /// Absolute session count lost across this transition.
    pub dropped: u64,
    pub drop_off_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelAnalysis {
    pub stages: Vec<FunnelStageData>,
    pub overall_conversion_rate: f64,
    pub biggest_drop_off: Option<FunnelDropOff>,
}

// ─── Session Quality ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Medium,
    High,
    Excellent,
}

impl QualityTier {
    /// Bucketing is a pure function of the score: `[0,25] → low`,
    /// `(25,50] → medium`, `(50,75] → high`, `(75,100] → excellent`.
    pub fn from_score(score: f64) -> Self {
        if score > 75.0 {
            Self::Excellent
        } else if score > 50.0 {
            Self::High
        } else if score > 25.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionQualityScore {
    pub session_id: String,
    pub score: f64,
    pub tier: QualityTier,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionQualityDistribution {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub excellent: u64,
    pub average_score: f64,
}

impl SessionQualityDistribution {
    pub fn total(&self) -> u64 {
        self.low + self.medium + self.high + self.excellent
    }
}

// ─── Anomalies ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyDirection {
    Increase,
    Decrease,
}

/// A flagged deviation from baseline. Ephemeral: generated per report and
/// never deduplicated across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub metric: String,
    pub current_value: f64,
    pub baseline_value: f64,
    pub percent_change: f64,
    pub direction: AnomalyDirection,
    pub severity: AnomalySeverity,
    pub description: String,
}

// ─── Conversion Intelligence ─────────────────────────────────────────

/// A recurring page sequence that ended in a purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionPath {
    pub path: Vec<String>,
    pub conversions: u64,
    pub avg_time_to_convert: f64,
}

/// An engaged session that showed buying signals but never purchased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighIntentSession {
    pub session_id: String,
    pub visitor_id: String,
    pub entry_page: String,
    pub pages_visited: Vec<String>,
    pub engagement_score: f64,
    pub last_seen: DateTime<Utc>,
    /// The funnel stage this session stalled before.
    pub missed_conversion_stage: String,
}

// ─── Ads Metrics ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsCampaign {
    pub id: String,
    pub name: String,
    pub spend: f64,
    pub clicks: u64,
    pub impressions: u64,
    pub conversions: f64,
    pub roas: f64,
}

/// Paid-advertising performance merged in from the optional connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsMetrics {
    pub spend: f64,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub cpc: f64,
    pub conversions: f64,
    pub conversion_value: f64,
    pub roas: f64,
    pub campaigns: Vec<AdsCampaign>,
}

// ─── AI Insights ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RisksAndOpportunities {
    pub risks: Vec<String>,
    pub opportunities: Vec<String>,
}

/// The synthesized narrative report. List lengths are capped at construction:
/// at most 5 insights, 5 recommendations, 3 risks, 3 opportunities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiInsights {
    pub executive_summary: String,
    pub key_insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub risks_and_opportunities: RisksAndOpportunities,
}

pub const MAX_INSIGHTS: usize = 5;
pub const MAX_RECOMMENDATIONS: usize = 5;
pub const MAX_RISKS: usize = 3;
pub const MAX_OPPORTUNITIES: usize = 3;

impl AiInsights {
    /// Enforce the list-length caps regardless of which path produced them.
    pub fn truncated(mut self) -> Self {
        self.key_insights.truncate(MAX_INSIGHTS);
        self.recommendations.truncate(MAX_RECOMMENDATIONS);
        self.risks_and_opportunities.risks.truncate(MAX_RISKS);
        self.risks_and_opportunities
            .opportunities
            .truncate(MAX_OPPORTUNITIES);
        self
    }
}

// ─── Final Report ────────────────────────────────────────────────────

/// The single aggregate object handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelligenceReport {
    pub generated_at: DateTime<Utc>,
    pub report_date: NaiveDate,
    pub daily_metrics: DailyMetrics,
    pub baseline_metrics: BaselineMetrics,
    pub top_pages: Vec<TopPage>,
    pub traffic_sources: Vec<TrafficSource>,
    pub conversions: Vec<ConversionEventCount>,
    pub funnel_analysis: FunnelAnalysis,
    pub session_quality: SessionQualityDistribution,
    pub anomalies: Vec<Anomaly>,
    pub top_conversion_paths: Vec<ConversionPath>,
    pub high_intent_sessions: Vec<HighIntentSession>,
    pub ads: Option<AdsMetrics>,
    pub insights: AiInsights,
    /// Diagnostics: sessions analyzed and malformed rows skipped.
    pub sessions_analyzed: u64,
    pub skipped_events: u64,
}

// ─── Rounding Helpers ────────────────────────────────────────────────

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_tier_boundaries() {
        assert_eq!(QualityTier::from_score(0.0), QualityTier::Low);
        assert_eq!(QualityTier::from_score(25.0), QualityTier::Low);
        assert_eq!(QualityTier::from_score(25.1), QualityTier::Medium);
        assert_eq!(QualityTier::from_score(50.0), QualityTier::Medium);
        assert_eq!(QualityTier::from_score(50.1), QualityTier::High);
        assert_eq!(QualityTier::from_score(75.0), QualityTier::High);
        assert_eq!(QualityTier::from_score(75.1), QualityTier::Excellent);
        assert_eq!(QualityTier::from_score(100.0), QualityTier::Excellent);
    }

    #[test]
    fn test_insights_truncation_caps() {
        let insights = AiInsights {
            executive_summary: "summary".to_string(),
            key_insights: (0..10).map(|i| format!("insight {i}")).collect(),
            recommendations: (0..10).map(|i| format!("rec {i}")).collect(),
            risks_and_opportunities: RisksAndOpportunities {
                risks: (0..6).map(|i| format!("risk {i}")).collect(),
                opportunities: (0..6).map(|i| format!("opp {i}")).collect(),
            },
        }
        .truncated();

        assert_eq!(insights.key_insights.len(), MAX_INSIGHTS);
        assert_eq!(insights.recommendations.len(), MAX_RECOMMENDATIONS);
        assert_eq!(insights.risks_and_opportunities.risks.len(), MAX_RISKS);
        assert_eq!(
            insights.risks_and_opportunities.opportunities.len(),
            MAX_OPPORTUNITIES
        );
    }

    #[test]
    fn test_time_range_for_day_is_half_open() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let range = TimeRange::for_day(date);
        assert!(range.contains(range.start));
        assert!(!range.contains(range.end));
        assert_eq!((range.end - range.start).num_hours(), 24);
    }

    #[test]
    fn test_conversion_event_recognition() {
        assert!(is_conversion_event("purchase"));
        assert!(is_conversion_event("wholesale_form_submit"));
        assert!(!is_conversion_event("pageview"));
        assert!(!is_conversion_event("scroll"));
    }
}
