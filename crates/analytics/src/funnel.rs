//! Conversion funnel analysis over reconstructed sessions.
//!
//! Stage progression is strictly gated: a session only reaches stage `k` if
//! it reached stage `k-1` and satisfies `k`'s predicate. A purchase event
//! without a preceding checkout-begin event therefore does not count past the
//! checkout stage. This undercounts conversions where instrumentation skipped
//! an intermediate event, surfacing the data-quality gap instead of hiding it.

use insight_core::types::{round2, FunnelAnalysis, FunnelDropOff, FunnelStageData, ReconstructedSession};

/// How a session qualifies for a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagePredicate {
    /// Any pageview at all (the funnel entry stage).
    AnyPageview,
    /// The session contains an event with this name.
    Event(String),
}

/// One named checkpoint in the ordered conversion sequence.
#[derive(Debug, Clone)]
pub struct FunnelStage {
    pub key: String,
    pub label: String,
    pub predicate: StagePredicate,
}

impl FunnelStage {
    fn matches(&self, session: &ReconstructedSession) -> bool {
        match &self.predicate {
            StagePredicate::AnyPageview => session.page_views > 0,
            StagePredicate::Event(name) => session.has_event(name),
        }
    }
}

/// The storefront's standard five-stage purchase funnel.
pub fn default_funnel_stages() -> Vec<FunnelStage> {
    fn event_stage(key: &str, label: &str) -> FunnelStage {
        FunnelStage {
            key: key.to_string(),
            label: label.to_string(),
            predicate: StagePredicate::Event(key.to_string()),
        }
    }

    vec![
        FunnelStage {
            key: "page_view".to_string(),
            label: "Page Views".to_string(),
            predicate: StagePredicate::AnyPageview,
        },
        event_stage("product_view", "Product Views"),
        event_stage("add_to_cart", "Add to Cart"),
        event_stage("begin_checkout", "Begin Checkout"),
        event_stage("purchase", "Purchase"),
    ]
}

/// Count how many sessions reach each stage and derive conversion rates and
/// the single largest drop-off transition.
pub fn analyze_funnel(sessions: &[ReconstructedSession], stages: &[FunnelStage]) -> FunnelAnalysis {
    let mut counts = vec![0u64; stages.len()];

    for session in sessions {
        for (i, stage) in stages.iter().enumerate() {
            if stage.matches(session) {
                counts[i] += 1;
            } else {
                // Gated: failing one stage stops progression entirely.
                break;
            }
        }
    }

    let top = counts.first().copied().unwrap_or(0);

    let stage_data: Vec<FunnelStageData> = stages
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let conversion_from_previous = if i == 0 {
                None
            } else if counts[i - 1] == 0 {
                None
            } else {
                Some(round2(counts[i] as f64 / counts[i - 1] as f64 * 100.0))
            };
            let conversion_from_top = if top > 0 {
                round2(counts[i] as f64 / top as f64 * 100.0)
            } else {
                0.0
            };
            FunnelStageData {
                stage: stage.key.clone(),
                label: stage.label.clone(),
                count: counts[i],
                conversion_from_previous,
                conversion_from_top,
            }
        })
        .collect();

    let overall_conversion_rate = if top > 0 {
        round2(counts[counts.len() - 1] as f64 / top as f64 * 100.0)
    } else {
        0.0
    };

    // Largest absolute count decrease; the earliest transition wins ties.
    let mut biggest_drop_off: Option<FunnelDropOff> = None;
    let mut max_dropped = 0u64;
    for i in 1..counts.len() {
        let dropped = counts[i - 1] - counts[i];
        if dropped > max_dropped {
            max_dropped = dropped;
            biggest_drop_off = Some(FunnelDropOff {
                from: stages[i - 1].key.clone(),
                to: stages[i].key.clone(),
                dropped,
                drop_off_percent: round2(dropped as f64 / counts[i - 1] as f64 * 100.0),
            });
        }
    }

    FunnelAnalysis {
        stages: stage_data,
        overall_conversion_rate,
        biggest_drop_off,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::reconstruct_sessions;
    use insight_core::types::RawEvent;

    const BASE_MS: i64 = 1_750_000_000_000;

    /// A session for one visitor containing a pageview plus the named events.
    fn session_with(visitor: &str, event_names: &[&str]) -> Vec<RawEvent> {
        let mut events = vec![RawEvent::pageview(visitor, BASE_MS, "/")];
        for (i, name) in event_names.iter().enumerate() {
            events.push(RawEvent::named_event(
                visitor,
                BASE_MS + (i as i64 + 1) * 1_000,
                name,
            ));
        }
        events
    }

    fn build_sessions(per_visitor: Vec<Vec<RawEvent>>) -> Vec<insight_core::types::ReconstructedSession> {
        let events: Vec<RawEvent> = per_visitor.into_iter().flatten().collect();
        reconstruct_sessions(&events, 1_800_000).sessions
    }

    #[test]
    fn test_stage_counts_are_monotonically_non_increasing() {
        let sessions = build_sessions(vec![
            session_with("a", &["product_view", "add_to_cart", "begin_checkout", "purchase"]),
            session_with("b", &["product_view", "add_to_cart"]),
            session_with("c", &["product_view"]),
            session_with("d", &[]),
        ]);

        let analysis = analyze_funnel(&sessions, &default_funnel_stages());
        for pair in analysis.stages.windows(2) {
            assert!(
                pair[0].count >= pair[1].count,
                "funnel counts must never increase: {} -> {}",
                pair[0].count,
                pair[1].count
            );
        }
    }

    #[test]
    fn test_gating_ignores_purchase_without_checkout() {
        // Purchase fired without begin_checkout: the session stops counting
        // at add_to_cart.
        let sessions = build_sessions(vec![session_with(
            "a",
            &["product_view", "add_to_cart", "purchase"],
        )]);

        let analysis = analyze_funnel(&sessions, &default_funnel_stages());
        let counts: Vec<u64> = analysis.stages.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_end_to_end_three_stage_scenario() {
        // Sessions A and B view a product, only A adds to cart, none purchase.
        let stages = vec![
            FunnelStage {
                key: "product_view".to_string(),
                label: "Viewed Product".to_string(),
                predicate: StagePredicate::Event("product_view".to_string()),
            },
            FunnelStage {
                key: "add_to_cart".to_string(),
                label: "Added to Cart".to_string(),
                predicate: StagePredicate::Event("add_to_cart".to_string()),
            },
            FunnelStage {
                key: "purchase".to_string(),
                label: "Purchased".to_string(),
                predicate: StagePredicate::Event("purchase".to_string()),
            },
        ];

        let sessions = build_sessions(vec![
            session_with("a", &["product_view", "add_to_cart"]),
            session_with("b", &["product_view"]),
            session_with("c", &[]),
            session_with("d", &[]),
        ]);

        let analysis = analyze_funnel(&sessions, &stages);
        let counts: Vec<u64> = analysis.stages.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![2, 1, 0]);
        assert_eq!(analysis.stages[1].conversion_from_previous, Some(50.0));
        assert_eq!(analysis.overall_conversion_rate, 0.0);

        // Both transitions drop exactly one session; the earliest wins.
        let drop = analysis.biggest_drop_off.unwrap();
        assert_eq!(drop.from, "product_view");
        assert_eq!(drop.to, "add_to_cart");
        assert_eq!(drop.dropped, 1);
    }

    #[test]
    fn test_zero_predecessor_yields_none_not_division_by_zero() {
        let sessions = build_sessions(vec![session_with("a", &[])]);
        let analysis = analyze_funnel(&sessions, &default_funnel_stages());

        // product_view count is 0, so later stages have no defined rate.
        assert_eq!(analysis.stages[1].count, 0);
        assert_eq!(analysis.stages[2].conversion_from_previous, None);
    }

    #[test]
    fn test_empty_sessions_produce_empty_funnel() {
        let analysis = analyze_funnel(&[], &default_funnel_stages());
        assert!(analysis.stages.iter().all(|s| s.count == 0));
        assert_eq!(analysis.overall_conversion_rate, 0.0);
        assert!(analysis.biggest_drop_off.is_none());
    }

    #[test]
    fn test_first_stage_has_no_previous_conversion() {
        let sessions = build_sessions(vec![session_with("a", &[])]);
        let analysis = analyze_funnel(&sessions, &default_funnel_stages());
        assert_eq!(analysis.stages[0].conversion_from_previous, None);
        assert_eq!(analysis.stages[0].conversion_from_top, 100.0);
    }
}
