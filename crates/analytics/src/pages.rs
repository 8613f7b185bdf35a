//! Page, traffic-source, and conversion-event breakdowns for the report's
//! detail sections.

use insight_core::types::{
    round1, round2, ConversionEventCount, RawEvent, ReconstructedSession, TopPage, TrafficSource,
};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct PageStats {
    views: u64,
    visitors: HashSet<String>,
    total_time_secs: f64,
    bounces: u64,
    entry_sessions: u64,
}

/// Top pages by view count. Time on page is the gap to the next pageview in
/// the same session; the final page of a session contributes no time. Bounce
/// rate is attributed to the session's entry page.
pub fn top_pages(sessions: &[ReconstructedSession], limit: usize) -> Vec<TopPage> {
    let mut stats: HashMap<String, PageStats> = HashMap::new();

    for session in sessions {
        let pageviews: Vec<_> = session
            .events
            .iter()
            .filter(|e| e.is_pageview() && e.path.is_some())
            .collect();

        if let Some(entry) = pageviews.first().and_then(|e| e.path.clone()) {
            let entry_stats = stats.entry(entry).or_default();
            entry_stats.entry_sessions += 1;
            if session.is_bounce {
                entry_stats.bounces += 1;
            }
        }

        for (i, event) in pageviews.iter().enumerate() {
            let path = event.path.clone().unwrap_or_default();
            let page = stats.entry(path).or_default();
            page.views += 1;
            page.visitors.insert(session.visitor_id.clone());
            if let Some(next) = pageviews.get(i + 1) {
                let gap = (next.timestamp - event.timestamp).num_milliseconds();
                page.total_time_secs += gap.max(0) as f64 / 1000.0;
            }
        }
    }

    let mut pages: Vec<TopPage> = stats
        .into_iter()
        .map(|(path, s)| TopPage {
            path,
            views: s.views,
            unique_visitors: s.visitors.len() as u64,
            avg_time_on_page: if s.views > 0 {
                round1(s.total_time_secs / s.views as f64)
            } else {
                0.0
            },
            bounce_rate: if s.entry_sessions > 0 {
                round2(s.bounces as f64 / s.entry_sessions as f64 * 100.0)
            } else {
                0.0
            },
        })
        .collect();

    pages.sort_by(|a, b| b.views.cmp(&a.views).then(a.path.cmp(&b.path)));
    pages.truncate(limit);
    pages
}

#[derive(Default)]
struct SourceStats {
    sessions: u64,
    visitors: HashSet<String>,
    bounces: u64,
    conversions: u64,
}

/// Sessions broken down by UTM source and medium. Sessions without UTM tags
/// are grouped under `direct / (none)`.
pub fn traffic_sources(sessions: &[ReconstructedSession]) -> Vec<TrafficSource> {
    let mut stats: HashMap<(String, String), SourceStats> = HashMap::new();

    for session in sessions {
        let source = session
            .utm_source
            .clone()
            .unwrap_or_else(|| "direct".to_string());
        let medium = session
            .utm_medium
            .clone()
            .unwrap_or_else(|| "(none)".to_string());

        let entry = stats.entry((source, medium)).or_default();
        entry.sessions += 1;
        entry.visitors.insert(session.visitor_id.clone());
        if session.is_bounce {
            entry.bounces += 1;
        }
        if session.had_conversion {
            entry.conversions += 1;
        }
    }

    let mut sources: Vec<TrafficSource> = stats
        .into_iter()
        .map(|((source, medium), s)| TrafficSource {
            source,
            medium,
            sessions: s.sessions,
            visitors: s.visitors.len() as u64,
            bounce_rate: round2(s.bounces as f64 / s.sessions as f64 * 100.0),
            conversion_rate: round2(s.conversions as f64 / s.sessions as f64 * 100.0),
        })
        .collect();

    sources.sort_by(|a, b| b.sessions.cmp(&a.sessions).then(a.source.cmp(&b.source)));
    sources
}

/// Conversion events grouped by name with total and unique-visitor counts.
/// Expects the store's pre-filtered conversion event query as input.
pub fn conversion_counts(events: &[RawEvent]) -> Vec<ConversionEventCount> {
    let mut stats: HashMap<String, (u64, HashSet<String>)> = HashMap::new();

    for event in events {
        let Some(name) = event.event_name.clone() else {
            continue;
        };
        let visitor = event
            .visitor_id
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        let entry = stats.entry(name).or_default();
        entry.0 += 1;
        entry.1.insert(visitor);
    }

    let mut conversions: Vec<ConversionEventCount> = stats
        .into_iter()
        .map(|(event_name, (count, visitors))| ConversionEventCount {
            event_name,
            count,
            unique_visitors: visitors.len() as u64,
        })
        .collect();

    conversions.sort_by(|a, b| b.count.cmp(&a.count).then(a.event_name.cmp(&b.event_name)));
    conversions
}
