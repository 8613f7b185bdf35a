//! Report pipeline — orchestrates the full daily intelligence run.
//!
//! One `generate` call fetches the day's events, reconstructs sessions, runs
//! every analysis stage, merges the optional ads section, and synthesizes the
//! narrative block. A store failure aborts the run; every optional
//! collaborator (ads, LLM) degrades instead.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use insight_ads::AdsConnector;
use insight_analytics::{
    analyze_funnel, baseline_metrics, conversion_counts, conversion_paths, daily_metrics,
    default_funnel_stages, detect_anomalies, high_intent_sessions, mark_new_visitors,
    quality_distribution, reconstruct_sessions, top_pages, traffic_sources,
};
use insight_core::types::{DailyMetrics, IntelligenceReport, TimeRange};
use insight_core::{AppConfig, InsightResult};
use insight_store::EventStore;
use insight_synthesis::{InsightSynthesizer, ReportInputs};
use tracing::{info, instrument};

/// Builds one `IntelligenceReport` per invocation. Stateless between runs.
pub struct ReportGenerator {
    store: Arc<dyn EventStore>,
    config: AppConfig,
    ads: AdsConnector,
    synthesizer: InsightSynthesizer,
}

impl ReportGenerator {
    pub fn new(store: Arc<dyn EventStore>, config: AppConfig) -> InsightResult<Self> {
        let ads = AdsConnector::new(config.ads.clone())?;
        let synthesizer = InsightSynthesizer::from_config(config.llm.clone());
        Ok(Self {
            store,
            config,
            ads,
            synthesizer,
        })
    }

    /// Inject a pre-built synthesizer, used by tests to avoid the network.
    pub fn with_synthesizer(
        store: Arc<dyn EventStore>,
        config: AppConfig,
        synthesizer: InsightSynthesizer,
    ) -> InsightResult<Self> {
        let ads = AdsConnector::new(config.ads.clone())?;
        Ok(Self {
            store,
            config,
            ads,
            synthesizer,
        })
    }

    #[instrument(skip(self), fields(date = %report_date))]
    pub async fn generate(&self, report_date: NaiveDate) -> InsightResult<IntelligenceReport> {
        let day_range = TimeRange::for_day(report_date);
        let events = self.store.events_in_range(&day_range).await?;
        info!(events = events.len(), "Fetched events for report day");

        let mut outcome = reconstruct_sessions(&events, self.config.report.session_gap_ms);

        let prior_visitors = self.prior_visitors(report_date).await?;
        mark_new_visitors(&mut outcome.sessions, &prior_visitors);
        let sessions = outcome.sessions;

        // The baseline needs its own store queries and the ads fetch needs
        // the network, so the two run concurrently.
        let (baseline_days, ads) = tokio::join!(
            self.trailing_daily_metrics(report_date),
            self.ads.fetch_metrics(&day_range)
        );
        let baseline = baseline_metrics(&baseline_days?, self.config.report.baseline_days);

        let daily = daily_metrics(&sessions, report_date, &prior_visitors);
        let funnel = analyze_funnel(&sessions, &default_funnel_stages());
        let quality = quality_distribution(&sessions, &self.config.quality);
        let anomalies = detect_anomalies(&daily, &baseline, &self.config.anomaly);
        let top_pages = top_pages(&sessions, self.config.report.top_pages_limit);
        let traffic_sources = traffic_sources(&sessions);
        let conversion_events = self.store.conversion_events_in_range(&day_range).await?;
        let conversions = conversion_counts(&conversion_events);
        let top_conversion_paths =
            conversion_paths(&sessions, self.config.report.conversion_paths_limit);
        let high_intent = high_intent_sessions(
            &sessions,
            self.config.report.high_intent_limit,
            &self.config.quality,
        );

        let insights = self
            .synthesizer
            .synthesize(&ReportInputs {
                daily: &daily,
                baseline: &baseline,
                funnel: &funnel,
                quality: &quality,
                anomalies: &anomalies,
                top_pages: &top_pages,
                traffic_sources: &traffic_sources,
                conversions: &conversions,
                ads: ads.as_ref(),
            })
            .await;

        info!(
            sessions = sessions.len(),
            skipped = outcome.skipped_events,
            anomalies = anomalies.len(),
            "Report assembled"
        );

        Ok(IntelligenceReport {
            generated_at: Utc::now(),
            report_date,
            daily_metrics: daily,
            baseline_metrics: baseline,
            top_pages,
            traffic_sources,
            conversions,
            funnel_analysis: funnel,
            session_quality: quality,
            anomalies,
            top_conversion_paths,
            high_intent_sessions: high_intent,
            ads,
            insights,
            sessions_analyzed: sessions.len() as u64,
            skipped_events: outcome.skipped_events,
        })
    }

    /// Visitor ids seen in the lookback window before the report day. Used to
    /// split new from returning visitors.
    async fn prior_visitors(&self, report_date: NaiveDate) -> InsightResult<HashSet<String>> {
        let day_start = TimeRange::for_day(report_date).start;
        let lookback_start =
            day_start - Duration::days(i64::from(self.config.report.visitor_lookback_days));
        let range = TimeRange::new(lookback_start, day_start);

        let events = self.store.events_in_range(&range).await?;
        Ok(events.into_iter().filter_map(|e| e.visitor_id).collect())
    }

    /// `DailyMetrics` for each of the `baseline_days` days preceding the
    /// report day. New/returning splits are irrelevant to the baseline
    /// averages, so each day is computed with an empty prior set.
    async fn trailing_daily_metrics(
        &self,
        report_date: NaiveDate,
    ) -> InsightResult<Vec<DailyMetrics>> {
        let empty = HashSet::new();
        let mut days = Vec::with_capacity(self.config.report.baseline_days as usize);

        for offset in (1..=i64::from(self.config.report.baseline_days)).rev() {
            let date = report_date - Duration::days(offset);
            let events = self.store.events_in_range(&TimeRange::for_day(date)).await?;
            let outcome = reconstruct_sessions(&events, self.config.report.session_gap_ms);
            days.push(daily_metrics(&outcome.sessions, date, &empty));
        }

        Ok(days)
    }
}
