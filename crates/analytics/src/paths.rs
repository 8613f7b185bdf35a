//! Conversion intelligence — recurring purchase paths and engaged sessions
//! that stalled short of buying.

use crate::quality::score_session;
use insight_core::config::QualityConfig;
use insight_core::types::{ConversionPath, HighIntentSession, ReconstructedSession};
use std::collections::HashMap;

/// Page sequences shared by purchasing sessions, ranked by how often they
/// converted. Sequences are capped at the first five pages.
pub fn conversion_paths(sessions: &[ReconstructedSession], limit: usize) -> Vec<ConversionPath> {
    let mut stats: HashMap<Vec<String>, (u64, f64)> = HashMap::new();

    for session in sessions {
        if !session.has_event("purchase") {
            continue;
        }
        let pages: Vec<String> = session
            .events
            .iter()
            .filter(|e| e.is_pageview())
            .filter_map(|e| e.path.clone())
            .take(5)
            .collect();
        if pages.is_empty() {
            continue;
        }
        let entry = stats.entry(pages).or_default();
        entry.0 += 1;
        entry.1 += session.duration_seconds;
    }

    let mut paths: Vec<ConversionPath> = stats
        .into_iter()
        .map(|(path, (conversions, total_time))| ConversionPath {
            path,
            conversions,
            avg_time_to_convert: (total_time / conversions as f64).round(),
        })
        .collect();

    paths.sort_by(|a, b| b.conversions.cmp(&a.conversions).then(a.path.cmp(&b.path)));
    paths.truncate(limit);
    paths
}

/// Non-purchasing, non-bouncing sessions whose engagement score clears the
/// configured floor, ranked by score. `missed_conversion_stage` is the funnel
/// stage the session never reached.
pub fn high_intent_sessions(
    sessions: &[ReconstructedSession],
    limit: usize,
    config: &QualityConfig,
) -> Vec<HighIntentSession> {
    let mut candidates = Vec::new();

    for session in sessions {
        if session.has_event("purchase") || session.is_bounce {
            continue;
        }
        let quality = score_session(session, config);
        if quality.score < config.high_intent_min_score {
            continue;
        }

        let missed_stage = if session.has_event("begin_checkout") {
            "purchase"
        } else if session.has_event("add_to_cart") {
            "begin_checkout"
        } else if session.has_event("product_view") {
            "add_to_cart"
        } else {
            "product_view"
        };

        candidates.push(HighIntentSession {
            session_id: session.id.clone(),
            visitor_id: session.visitor_id.clone(),
            entry_page: session.entry_page.clone(),
            pages_visited: session
                .unique_pages()
                .into_iter()
                .map(|p| p.to_string())
                .collect(),
            engagement_score: quality.score,
            last_seen: session.end_time,
            missed_conversion_stage: missed_stage.to_string(),
        });
    }

    candidates.sort_by(|a, b| {
        b.engagement_score
            .partial_cmp(&a.engagement_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
    candidates.truncate(limit);
    candidates
}
