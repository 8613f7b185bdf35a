//! Daily metrics aggregation and the trailing baseline used for anomaly
//! comparison.

use chrono::NaiveDate;
use insight_core::types::{round1, round2, BaselineMetrics, DailyMetrics, ReconstructedSession};
use std::collections::HashSet;

/// Reduce one day's sessions into `DailyMetrics`.
///
/// `prior_visitors` is the set of visitor ids seen in the lookback window
/// before this day; visitors outside it are classified as new. A visitor
/// whose true first visit predates the lookback window will be misclassified,
/// which is a known limitation of the available history.
pub fn daily_metrics(
    sessions: &[ReconstructedSession],
    date: NaiveDate,
    prior_visitors: &HashSet<String>,
) -> DailyMetrics {
    let pageviews: u64 = sessions.iter().map(|s| s.page_views as u64).sum();

    let unique: HashSet<&str> = sessions.iter().map(|s| s.visitor_id.as_str()).collect();
    let unique_visitors = unique.len() as u64;

    let bounced = sessions.iter().filter(|s| s.is_bounce).count();
    let bounce_rate = if sessions.is_empty() {
        0.0
    } else {
        round1(bounced as f64 / sessions.len() as f64 * 100.0)
    };

    // Zero-duration sessions are included on purpose: they pull the average
    // down in proportion to bounce behavior.
    let total_duration: f64 = sessions.iter().map(|s| s.duration_seconds).sum();
    let avg_session_duration = if sessions.is_empty() {
        0.0
    } else {
        round1(total_duration / sessions.len() as f64)
    };

    let returning_visitors = unique
        .iter()
        .filter(|v| prior_visitors.contains(**v))
        .count() as u64;
    let new_visitors = unique_visitors - returning_visitors;

    DailyMetrics {
        date,
        pageviews,
        unique_visitors,
        sessions: sessions.len() as u64,
        bounce_rate,
        avg_session_duration,
        new_visitors,
        returning_visitors,
    }
}

/// Average a trailing window of daily metrics into a comparison baseline.
/// Recomputed per report, never persisted.
pub fn baseline_metrics(days: &[DailyMetrics], window_days: u32) -> BaselineMetrics {
    if days.is_empty() {
        return BaselineMetrics {
            window_days,
            pageviews: 0.0,
            unique_visitors: 0.0,
            sessions: 0.0,
            bounce_rate: 0.0,
            avg_session_duration: 0.0,
        };
    }

    let n = days.len() as f64;
    BaselineMetrics {
        window_days,
        pageviews: round2(days.iter().map(|d| d.pageviews as f64).sum::<f64>() / n),
        unique_visitors: round2(days.iter().map(|d| d.unique_visitors as f64).sum::<f64>() / n),
        sessions: round2(days.iter().map(|d| d.sessions as f64).sum::<f64>() / n),
        bounce_rate: round2(days.iter().map(|d| d.bounce_rate).sum::<f64>() / n),
        avg_session_duration: round2(
            days.iter().map(|d| d.avg_session_duration).sum::<f64>() / n,
        ),
    }
}
