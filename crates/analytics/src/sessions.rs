//! Session reconstruction — partitions the raw event log into bounded
//! per-visitor sessions using an inactivity-gap rule.
//!
//! The upstream tracker never assigns stable session ids, so sessions are
//! rebuilt from `visitor_id` + timestamp gaps on every report. Recomputing is
//! cheap at this volume and avoids caching stale session boundaries.

use chrono::{DateTime, Utc};
use insight_core::types::{is_conversion_event, RawEvent, ReconstructedSession, SessionEvent};
use std::collections::HashMap;
use tracing::debug;

/// Result of one reconstruction pass. `skipped_events` counts malformed rows
/// (missing visitor id or timestamp) that were dropped rather than failing
/// the report.
#[derive(Debug, Clone, Default)]
pub struct ReconstructionOutcome {
    pub sessions: Vec<ReconstructedSession>,
    pub skipped_events: u64,
}

/// Partition `events` into sessions, splitting whenever the gap between two
/// consecutive events for the same visitor exceeds `gap_ms`.
///
/// Events need not arrive sorted; each visitor's stream is stable-sorted by
/// timestamp first, so equal timestamps keep their input order and always
/// land in the same session. Every well-formed event appears in exactly one
/// session.
pub fn reconstruct_sessions(events: &[RawEvent], gap_ms: i64) -> ReconstructionOutcome {
    let mut skipped = 0u64;
    let mut by_visitor: HashMap<&str, Vec<&RawEvent>> = HashMap::new();

    for event in events {
        if !event.is_well_formed() {
            skipped += 1;
            continue;
        }
        // is_well_formed guarantees the visitor id is present
        if let Some(visitor) = event.visitor_id.as_deref() {
            by_visitor.entry(visitor).or_default().push(event);
        }
    }

    if skipped > 0 {
        debug!(skipped, "Skipped malformed events during reconstruction");
    }

    let mut sessions = Vec::new();

    for (visitor, mut visitor_events) in by_visitor {
        // Stable sort: input order is the tiebreak for identical timestamps.
        visitor_events.sort_by_key(|e| e.timestamp_ms.unwrap_or_default());

        let mut current: Vec<&RawEvent> = Vec::new();
        for event in visitor_events {
            if let Some(last) = current.last() {
                let gap = event.timestamp_ms.unwrap_or_default()
                    - last.timestamp_ms.unwrap_or_default();
                if gap > gap_ms {
                    sessions.push(finalize_session(visitor, &current));
                    current.clear();
                }
            }
            current.push(event);
        }
        if !current.is_empty() {
            sessions.push(finalize_session(visitor, &current));
        }
    }

    // Cross-visitor ordering carries no meaning; sort for stable output.
    sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));

    ReconstructionOutcome {
        sessions,
        skipped_events: skipped,
    }
}

/// Mark sessions whose visitor has no recorded session before the report
/// window. Accuracy is bounded by the lookback window used to build
/// `prior_visitors`.
pub fn mark_new_visitors(
    sessions: &mut [ReconstructedSession],
    prior_visitors: &std::collections::HashSet<String>,
) {
    for session in sessions {
        session.is_new_visitor = !prior_visitors.contains(&session.visitor_id);
    }
}

fn finalize_session(visitor: &str, events: &[&RawEvent]) -> ReconstructedSession {
    let first = events[0];
    let last = events[events.len() - 1];

    let start_ms = first.timestamp_ms.unwrap_or_default();
    let end_ms = last.timestamp_ms.unwrap_or_default();
    let start_time = timestamp_from_ms(start_ms);
    let end_time = timestamp_from_ms(end_ms);
    let duration_seconds = ((end_ms - start_ms).max(0) as f64) / 1000.0;

    let page_views = events.iter().filter(|e| e.is_pageview()).count() as u32;
    let entry_page = first.path.clone().unwrap_or_else(|| "/".to_string());
    let exit_page = last.path.clone().unwrap_or_else(|| entry_page.clone());

    let (utm_source, utm_medium, utm_campaign) = parse_utm_params(first.query_params.as_deref());

    let conversion_type = events
        .iter()
        .filter_map(|e| e.event_name.as_deref())
        .find(|name| is_conversion_event(name))
        .map(|name| name.to_string());

    // A bounce is exactly one pageview and no other engagement event.
    let engagement_events = events
        .iter()
        .filter(|e| !e.is_pageview() && e.event_name.is_some())
        .count();
    let is_bounce = page_views == 1 && engagement_events == 0;

    let session_events = events
        .iter()
        .map(|e| SessionEvent {
            event_type: e.event_type.clone(),
            event_name: e.event_name.clone(),
            path: e.path.clone(),
            timestamp: timestamp_from_ms(e.timestamp_ms.unwrap_or_default()),
        })
        .collect();

    ReconstructedSession {
        id: format!("{visitor}-{start_ms}"),
        visitor_id: visitor.to_string(),
        start_time,
        end_time,
        duration_seconds,
        page_views,
        events: session_events,
        entry_page,
        exit_page,
        utm_source,
        utm_medium,
        utm_campaign,
        had_conversion: conversion_type.is_some(),
        conversion_type,
        is_bounce,
        is_new_visitor: false,
    }
}

fn timestamp_from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn parse_utm_params(
    query_params: Option<&str>,
) -> (Option<String>, Option<String>, Option<String>) {
    let Some(query) = query_params else {
        return (None, None, None);
    };

    let mut source = None;
    let mut medium = None;
    let mut campaign = None;
    for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        match key.as_ref() {
            "utm_source" => source = Some(value.into_owned()),
            "utm_medium" => medium = Some(value.into_owned()),
            "utm_campaign" => campaign = Some(value.into_owned()),
            _ => {}
        }
    }
    (source, medium, campaign)
}
