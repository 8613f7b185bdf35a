//! Analytical core — session reconstruction, metrics aggregation, funnel
//! analysis, session quality scoring, and anomaly detection.

pub mod anomaly;
pub mod funnel;
pub mod metrics;
pub mod pages;
pub mod paths;
pub mod quality;
pub mod sessions;

pub use anomaly::detect_anomalies;
pub use funnel::{analyze_funnel, default_funnel_stages, FunnelStage};
pub use metrics::{baseline_metrics, daily_metrics};
pub use pages::{conversion_counts, top_pages, traffic_sources};
pub use paths::{conversion_paths, high_intent_sessions};
pub use quality::{quality_distribution, score_session};
pub use sessions::{mark_new_visitors, reconstruct_sessions, ReconstructionOutcome};
