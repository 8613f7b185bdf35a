use serde::Deserialize;
use std::time::Duration;

/// Root application configuration. Loaded from environment variables with the
/// prefix `STOREFRONT_INTEL__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub ads: AdsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Inactivity gap that closes a session.
    #[serde(default = "default_session_gap_ms")]
    pub session_gap_ms: i64,
    /// Trailing window for the baseline averages.
    #[serde(default = "default_baseline_days")]
    pub baseline_days: u32,
    /// How far back to look when classifying new vs returning visitors.
    #[serde(default = "default_visitor_lookback_days")]
    pub visitor_lookback_days: u32,
    #[serde(default = "default_top_pages_limit")]
    pub top_pages_limit: usize,
    #[serde(default = "default_conversion_paths_limit")]
    pub conversion_paths_limit: usize,
    #[serde(default = "default_high_intent_limit")]
    pub high_intent_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            session_gap_ms: default_session_gap_ms(),
            baseline_days: default_baseline_days(),
            visitor_lookback_days: default_visitor_lookback_days(),
            top_pages_limit: default_top_pages_limit(),
            conversion_paths_limit: default_conversion_paths_limit(),
            high_intent_limit: default_high_intent_limit(),
        }
    }
}

/// Weights and normalization ceilings for the session quality score.
/// The three weights sum to 100 so the score is naturally bounded.
#[derive(Debug, Clone, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_duration_weight")]
    pub duration_weight: f64,
    #[serde(default = "default_depth_weight")]
    pub depth_weight: f64,
    #[serde(default = "default_conversion_weight")]
    pub conversion_weight: f64,
    /// Session duration that earns the full duration weight.
    #[serde(default = "default_duration_ceiling_secs")]
    pub duration_ceiling_secs: f64,
    /// Pageview depth that earns the full depth weight.
    #[serde(default = "default_depth_ceiling_pages")]
    pub depth_ceiling_pages: f64,
    /// Minimum score for a session to count as high intent.
    #[serde(default = "default_high_intent_min_score")]
    pub high_intent_min_score: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            duration_weight: default_duration_weight(),
            depth_weight: default_depth_weight(),
            conversion_weight: default_conversion_weight(),
            duration_ceiling_secs: default_duration_ceiling_secs(),
            depth_ceiling_pages: default_depth_ceiling_pages(),
            high_intent_min_score: default_high_intent_min_score(),
        }
    }
}

/// Deviation thresholds (percent) for the anomaly detector.
#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyConfig {
    #[serde(default = "default_warning_threshold_pct")]
    pub warning_threshold_pct: f64,
    #[serde(default = "default_critical_threshold_pct")]
    pub critical_threshold_pct: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            warning_threshold_pct: default_warning_threshold_pct(),
            critical_threshold_pct: default_critical_threshold_pct(),
        }
    }
}

/// LLM synthesis endpoint. Absent `api_key` means the deterministic fallback
/// path is used for every report.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_llm_api_base(),
            model: default_llm_model(),
            max_tokens: default_llm_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Google Ads connector credentials. All five credential fields must be
/// present for the connector to attempt a fetch; absence of any one is the
/// expected "not configured" state, not an error.
#[derive(Debug, Clone, Deserialize)]
pub struct AdsConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub developer_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub login_customer_id: Option<String>,
    #[serde(default = "default_ads_api_base")]
    pub api_base: String,
    #[serde(default = "default_ads_token_url")]
    pub token_url: String,
    #[serde(default = "default_ads_timeout_secs")]
    pub timeout_secs: u64,
}

impl AdsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            developer_token: None,
            refresh_token: None,
            customer_id: None,
            login_customer_id: None,
            api_base: default_ads_api_base(),
            token_url: default_ads_token_url(),
            timeout_secs: default_ads_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("STOREFRONT_INTEL")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

fn default_session_gap_ms() -> i64 {
    30 * 60 * 1000
}

fn default_baseline_days() -> u32 {
    7
}

fn default_visitor_lookback_days() -> u32 {
    30
}

fn default_top_pages_limit() -> usize {
    10
}

fn default_conversion_paths_limit() -> usize {
    5
}

fn default_high_intent_limit() -> usize {
    10
}

fn default_duration_weight() -> f64 {
    40.0
}

fn default_depth_weight() -> f64 {
    40.0
}

fn default_conversion_weight() -> f64 {
    20.0
}

fn default_duration_ceiling_secs() -> f64 {
    300.0
}

fn default_depth_ceiling_pages() -> f64 {
    10.0
}

fn default_high_intent_min_score() -> f64 {
    26.0
}

fn default_warning_threshold_pct() -> f64 {
    25.0
}

fn default_critical_threshold_pct() -> f64 {
    50.0
}

fn default_llm_api_base() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_llm_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_llm_max_tokens() -> u32 {
    2000
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_ads_api_base() -> String {
    "https://googleads.googleapis.com/v17".to_string()
}

fn default_ads_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_ads_timeout_secs() -> u64 {
    15
}
