//! Session quality scoring — a weighted 0-100 engagement score per session
//! and the bucketed distribution across a report window.

use insight_core::config::QualityConfig;
use insight_core::types::{
    round1, QualityTier, ReconstructedSession, SessionQualityDistribution, SessionQualityScore,
};

/// Score one session as a weighted linear combination of normalized signals:
/// duration against a ceiling, pageview depth against a ceiling, and a binary
/// conversion bonus. The weights sum to 100, so the score is bounded by
/// construction; it is clamped anyway.
pub fn score_session(session: &ReconstructedSession, config: &QualityConfig) -> SessionQualityScore {
    let duration_ratio = if config.duration_ceiling_secs > 0.0 {
        (session.duration_seconds / config.duration_ceiling_secs).min(1.0)
    } else {
        0.0
    };
    let depth_ratio = if config.depth_ceiling_pages > 0.0 {
        (session.page_views as f64 / config.depth_ceiling_pages).min(1.0)
    } else {
        0.0
    };
    let conversion_bonus = if session.had_conversion { 1.0 } else { 0.0 };

    let raw = config.duration_weight * duration_ratio
        + config.depth_weight * depth_ratio
        + config.conversion_weight * conversion_bonus;
    let score = round1(raw.clamp(0.0, 100.0));

    SessionQualityScore {
        session_id: session.id.clone(),
        score,
        tier: QualityTier::from_score(score),
    }
}

/// Bucket every session's score into the four fixed tiers. Zero sessions
/// produce an average of 0, never NaN.
pub fn quality_distribution(
    sessions: &[ReconstructedSession],
    config: &QualityConfig,
) -> SessionQualityDistribution {
    let mut distribution = SessionQualityDistribution::default();
    if sessions.is_empty() {
        return distribution;
    }

    let mut total_score = 0.0;
    for session in sessions {
        let quality = score_session(session, config);
        total_score += quality.score;
        match quality.tier {
            QualityTier::Low => distribution.low += 1,
            QualityTier::Medium => distribution.medium += 1,
            QualityTier::High => distribution.high += 1,
            QualityTier::Excellent => distribution.excellent += 1,
        }
    }

    distribution.average_score = round1(total_score / sessions.len() as f64);
    distribution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::reconstruct_sessions;
    use insight_core::types::RawEvent;

    const BASE_MS: i64 = 1_750_000_000_000;

    fn config() -> QualityConfig {
        QualityConfig::default()
    }

    fn make_session(
        duration_secs: i64,
        pages: u32,
        conversion: bool,
    ) -> ReconstructedSession {
        let mut events = Vec::new();
        for i in 0..pages.max(1) {
            let spacing = if pages > 1 {
                duration_secs * 1000 / (pages as i64 - 1).max(1)
            } else {
                0
            };
            events.push(RawEvent::pageview(
                "v1",
                BASE_MS + i as i64 * spacing,
                &format!("/page/{i}"),
            ));
        }
        if conversion {
            events.push(RawEvent::named_event(
                "v1",
                BASE_MS + duration_secs * 1000,
                "purchase",
            ));
        }
        reconstruct_sessions(&events, i64::MAX).sessions.remove(0)
    }

    #[test]
    fn test_score_bounded_for_extreme_inputs() {
        // Very long, very deep, converting session saturates at 100.
        let maxed = make_session(100_000, 500, true);
        let score = score_session(&maxed, &config());
        assert!(score.score <= 100.0);
        assert_eq!(score.score, 100.0);

        // Minimal session floors at a small nonnegative score.
        let minimal = make_session(0, 1, false);
        let score = score_session(&minimal, &config());
        assert!(score.score >= 0.0);
        assert!(score.score < 26.0);
    }

    #[test]
    fn test_duration_normalized_against_ceiling() {
        // Half the 300s ceiling earns half the duration weight.
        let session = make_session(150, 2, false);
        let score = score_session(&session, &config());
        // 40 * 0.5 + 40 * 0.2 = 28
        assert_eq!(score.score, 28.0);
    }

    #[test]
    fn test_conversion_bonus_is_binary() {
        let without = make_session(60, 3, false);
        let with = make_session(60, 3, true);
        let delta =
            score_session(&with, &config()).score - score_session(&without, &config()).score;
        assert_eq!(delta, config().conversion_weight);
    }

    #[test]
    fn test_distribution_counts_sum_to_total() {
        let sessions: Vec<ReconstructedSession> = vec![
            make_session(0, 1, false),
            make_session(30, 2, false),
            make_session(200, 5, false),
            make_session(300, 10, true),
            make_session(120, 8, true),
        ];

        let distribution = quality_distribution(&sessions, &config());
        assert_eq!(distribution.total(), sessions.len() as u64);
    }

    #[test]
    fn test_empty_distribution_has_zero_average() {
        let distribution = quality_distribution(&[], &config());
        assert_eq!(distribution.average_score, 0.0);
        assert_eq!(distribution.total(), 0);
    }

    #[test]
    fn test_excellent_tier_requires_near_saturation() {
        let session = make_session(300, 10, true);
        let score = score_session(&session, &config());
        assert_eq!(score.score, 100.0);
        assert_eq!(score.tier, QualityTier::Excellent);
    }
}
