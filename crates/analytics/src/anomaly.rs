//! Anomaly detection — flags notable deviations of the current day's metrics
//! from the trailing baseline.
//!
//! Thresholds are deliberately coarse to avoid alert fatigue: deviations of
//! at least 50% are critical, at least 25% are warnings, and anything smaller
//! is not reported. `info` is reserved for qualitative observations such as
//! activity appearing where the baseline was zero.

use insight_core::config::AnomalyConfig;
use insight_core::types::{
    round2, Anomaly, AnomalyDirection, AnomalySeverity, BaselineMetrics, DailyMetrics,
};
use tracing::debug;

struct MetricComparison {
    name: &'static str,
    current: f64,
    baseline: f64,
}

/// Compare each daily metric against its baseline and emit anomalies above
/// the configured thresholds, sorted critical-first.
pub fn detect_anomalies(
    daily: &DailyMetrics,
    baseline: &BaselineMetrics,
    config: &AnomalyConfig,
) -> Vec<Anomaly> {
    let comparisons = [
        MetricComparison {
            name: "Pageviews",
            current: daily.pageviews as f64,
            baseline: baseline.pageviews,
        },
        MetricComparison {
            name: "Unique Visitors",
            current: daily.unique_visitors as f64,
            baseline: baseline.unique_visitors,
        },
        MetricComparison {
            name: "Sessions",
            current: daily.sessions as f64,
            baseline: baseline.sessions,
        },
        MetricComparison {
            name: "Bounce Rate",
            current: daily.bounce_rate,
            baseline: baseline.bounce_rate,
        },
        MetricComparison {
            name: "Avg Session Duration",
            current: daily.avg_session_duration,
            baseline: baseline.avg_session_duration,
        },
    ];

    let mut anomalies = Vec::new();

    for cmp in &comparisons {
        if cmp.baseline == 0.0 {
            // No division by zero: zero baseline with activity today is a
            // qualitative observation, both-zero is nothing at all.
            if cmp.current > 0.0 {
                anomalies.push(Anomaly {
                    metric: cmp.name.to_string(),
                    current_value: round2(cmp.current),
                    baseline_value: 0.0,
                    percent_change: 0.0,
                    direction: AnomalyDirection::Increase,
                    severity: AnomalySeverity::Info,
                    description: format!(
                        "{}: {} today with no historical baseline ({}-day average was 0)",
                        cmp.name,
                        round2(cmp.current),
                        baseline.window_days
                    ),
                });
            }
            continue;
        }

        let percent_change = (cmp.current - cmp.baseline) / cmp.baseline * 100.0;
        let magnitude = percent_change.abs();

        let severity = if magnitude >= config.critical_threshold_pct {
            AnomalySeverity::Critical
        } else if magnitude >= config.warning_threshold_pct {
            AnomalySeverity::Warning
        } else {
            continue;
        };

        let direction = if percent_change > 0.0 {
            AnomalyDirection::Increase
        } else {
            AnomalyDirection::Decrease
        };
        let verb = match direction {
            AnomalyDirection::Increase => "increased",
            AnomalyDirection::Decrease => "decreased",
        };

        anomalies.push(Anomaly {
            metric: cmp.name.to_string(),
            current_value: round2(cmp.current),
            baseline_value: round2(cmp.baseline),
            percent_change: round2(percent_change),
            direction,
            severity,
            description: format!(
                "{} {} by {:.1}%: {} today vs {} baseline average",
                cmp.name,
                verb,
                magnitude,
                round2(cmp.current),
                round2(cmp.baseline)
            ),
        });
    }

    anomalies.sort_by(|a, b| b.severity.cmp(&a.severity));

    debug!(count = anomalies.len(), "Anomaly detection complete");
    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn daily(pageviews: u64) -> DailyMetrics {
        DailyMetrics {
            date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            pageviews,
            unique_visitors: 100,
            sessions: 100,
            bounce_rate: 50.0,
            avg_session_duration: 60.0,
            new_visitors: 60,
            returning_visitors: 40,
        }
    }

    fn baseline() -> BaselineMetrics {
        BaselineMetrics {
            window_days: 7,
            pageviews: 100.0,
            unique_visitors: 100.0,
            sessions: 100.0,
            bounce_rate: 50.0,
            avg_session_duration: 60.0,
        }
    }

    fn detect(current_pageviews: u64) -> Vec<Anomaly> {
        detect_anomalies(
            &daily(current_pageviews),
            &baseline(),
            &AnomalyConfig::default(),
        )
    }

    #[test]
    fn test_critical_at_51_percent_deviation() {
        let anomalies = detect(151);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, AnomalySeverity::Critical);
        assert_eq!(anomalies[0].percent_change, 51.0);
        assert_eq!(anomalies[0].direction, AnomalyDirection::Increase);
    }

    #[test]
    fn test_warning_at_26_percent_deviation() {
        let anomalies = detect(126);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, AnomalySeverity::Warning);
    }

    #[test]
    fn test_no_anomaly_at_10_percent_deviation() {
        assert!(detect(110).is_empty());
    }

    #[test]
    fn test_decrease_flagged_with_direction() {
        let anomalies = detect(40);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].direction, AnomalyDirection::Decrease);
        assert_eq!(anomalies[0].severity, AnomalySeverity::Critical);
        assert!(anomalies[0].description.contains("decreased"));
    }

    #[test]
    fn test_zero_baseline_with_activity_is_info() {
        let mut base = baseline();
        base.pageviews = 0.0;
        let anomalies = detect_anomalies(&daily(5), &base, &AnomalyConfig::default());

        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, AnomalySeverity::Info);
        assert!(anomalies[0].description.contains("no historical baseline"));
    }

    #[test]
    fn test_both_zero_is_silent() {
        let mut day = daily(0);
        day.unique_visitors = 0;
        day.sessions = 0;
        day.bounce_rate = 0.0;
        day.avg_session_duration = 0.0;
        let base = BaselineMetrics {
            window_days: 7,
            pageviews: 0.0,
            unique_visitors: 0.0,
            sessions: 0.0,
            bounce_rate: 0.0,
            avg_session_duration: 0.0,
        };
        assert!(detect_anomalies(&day, &base, &AnomalyConfig::default()).is_empty());
    }

    #[test]
    fn test_sorted_critical_first() {
        let mut day = daily(151); // critical on pageviews
        day.unique_visitors = 130; // warning on visitors
        let anomalies = detect_anomalies(&day, &baseline(), &AnomalyConfig::default());

        assert_eq!(anomalies.len(), 2);
        assert_eq!(anomalies[0].severity, AnomalySeverity::Critical);
        assert_eq!(anomalies[1].severity, AnomalySeverity::Warning);
    }

    #[test]
    fn test_description_carries_numbers() {
        let anomalies = detect(151);
        let description = &anomalies[0].description;
        assert!(description.contains("Pageviews"));
        assert!(description.contains("151"));
        assert!(description.contains("100"));
        assert!(description.contains("51.0%"));
    }
}
