//! Storefront Intelligence — daily analytics intelligence report generator.
//!
//! Main entry point: loads an event export, runs the full report pipeline,
//! and prints the report as JSON on stdout.

use chrono::{Duration, NaiveDate, Utc};
use clap::Parser;
use insight_core::config::AppConfig;
use insight_pipeline::ReportGenerator;
use insight_store::MemoryEventStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "insight-report")]
#[command(about = "Daily e-commerce analytics intelligence report generator")]
#[command(version)]
struct Cli {
    /// Report date (YYYY-MM-DD); defaults to yesterday UTC
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Path to a JSON event export to analyze
    #[arg(long)]
    events: PathBuf,

    /// Trailing baseline window in days (overrides config)
    #[arg(long, env = "STOREFRONT_INTEL__REPORT__BASELINE_DAYS")]
    baseline_days: Option<u32>,

    /// Pretty-print the report JSON
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "insight_report=info,insight_pipeline=info".into()),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("Storefront Intelligence starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(days) = cli.baseline_days {
        config.report.baseline_days = days;
    }

    let report_date = cli
        .date
        .unwrap_or_else(|| (Utc::now() - Duration::days(1)).date_naive());

    info!(
        date = %report_date,
        baseline_days = config.report.baseline_days,
        session_gap_ms = config.report.session_gap_ms,
        llm_configured = config.llm.api_key.is_some(),
        "Configuration loaded"
    );

    // Load the event export into the in-memory store
    let raw = std::fs::read_to_string(&cli.events)?;
    let store = Arc::new(MemoryEventStore::from_json(&raw)?);

    let generator = ReportGenerator::new(store, config)?;
    let report = generator.generate(report_date).await?;

    info!(
        sessions = report.sessions_analyzed,
        anomalies = report.anomalies.len(),
        ads = report.ads.is_some(),
        "Report generated"
    );

    let output = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");

    Ok(())
}
