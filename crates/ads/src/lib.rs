//! Optional Google Ads metrics connector.
//!
//! Absence of credentials is a first-class, expected state: the connector
//! reports `NotConfigured` without touching the network, and any runtime
//! failure (OAuth, HTTP, parse) degrades to "no ads section" rather than
//! blocking the report.

use chrono::NaiveDate;
use insight_core::config::AdsConfig;
use insight_core::types::{round1, round2, AdsCampaign, AdsMetrics, TimeRange};
use insight_core::{InsightError, InsightResult};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Credential state of the connector. A configured connector can still fail
/// at runtime; that failure is a log line plus a `None` result, never an
/// error that propagates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdsCapability {
    NotConfigured { missing: Vec<&'static str> },
    Configured,
}

pub struct AdsConnector {
    config: AdsConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl AdsConnector {
    pub fn new(config: AdsConfig) -> InsightResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| InsightError::Ads(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Check which credentials are present. All five are required before any
    /// network call is attempted.
    pub fn capability(&self) -> AdsCapability {
        let required: [(&'static str, &Option<String>); 5] = [
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("developer_token", &self.config.developer_token),
            ("refresh_token", &self.config.refresh_token),
            ("customer_id", &self.config.customer_id),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map(str::is_empty).unwrap_or(true))
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            AdsCapability::Configured
        } else {
            AdsCapability::NotConfigured { missing }
        }
    }

    /// Fetch spend/click/conversion metrics for the range. Fails soft: any
    /// problem is logged and surfaces only as `None`.
    pub async fn fetch_metrics(&self, range: &TimeRange) -> Option<AdsMetrics> {
        match self.capability() {
            AdsCapability::NotConfigured { missing } => {
                debug!(?missing, "Google Ads not configured, skipping fetch");
                None
            }
            AdsCapability::Configured => match self.try_fetch(range).await {
                Ok(metrics) => Some(metrics),
                Err(e) => {
                    warn!(error = %e, "Google Ads fetch failed, omitting ads section");
                    None
                }
            },
        }
    }

    async fn try_fetch(&self, range: &TimeRange) -> InsightResult<AdsMetrics> {
        let token = self.access_token().await?;

        let start = range.start.date_naive();
        // The range end is exclusive; GAQL BETWEEN is inclusive.
        let end = (range.end - chrono::Duration::milliseconds(1)).date_naive();

        let account_rows = self.search(&token, &account_query(start, end)).await?;
        let campaign_rows = self.search(&token, &campaign_query(start, end)).await?;

        Ok(build_metrics(&account_rows, &campaign_rows))
    }

    async fn access_token(&self) -> InsightResult<String> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_deref().unwrap_or("")),
            (
                "client_secret",
                self.config.client_secret.as_deref().unwrap_or(""),
            ),
            (
                "refresh_token",
                self.config.refresh_token.as_deref().unwrap_or(""),
            ),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| InsightError::Ads(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(InsightError::Ads(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| InsightError::Ads(format!("token response invalid: {e}")))?;
        Ok(token.access_token)
    }

    async fn search(&self, token: &str, query: &str) -> InsightResult<Vec<Value>> {
        let customer_id = self
            .config
            .customer_id
            .as_deref()
            .unwrap_or("")
            .replace('-', "");
        let url = format!(
            "{}/customers/{}/googleAds:search",
            self.config.api_base.trim_end_matches('/'),
            customer_id
        );

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(
                "developer-token",
                self.config.developer_token.as_deref().unwrap_or(""),
            )
            .json(&serde_json::json!({ "query": query }));
        if let Some(login_id) = self.config.login_customer_id.as_deref() {
            request = request.header("login-customer-id", login_id.replace('-', ""));
        }

        let response = request
            .send()
            .await
            .map_err(|e| InsightError::Ads(format!("search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(InsightError::Ads(format!(
                "search returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| InsightError::Ads(format!("search response invalid: {e}")))?;
        Ok(body
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

fn account_query(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "SELECT metrics.cost_micros, metrics.clicks, metrics.impressions, \
         metrics.conversions, metrics.conversions_value \
         FROM customer WHERE segments.date BETWEEN '{start}' AND '{end}'"
    )
}

fn campaign_query(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "SELECT campaign.id, campaign.name, metrics.cost_micros, metrics.clicks, \
         metrics.impressions, metrics.conversions, metrics.conversions_value \
         FROM campaign WHERE segments.date BETWEEN '{start}' AND '{end}' \
         AND campaign.status = 'ENABLED' ORDER BY metrics.cost_micros DESC LIMIT 10"
    )
}

/// The REST API serializes int64 metrics as JSON strings; accept both.
fn metric_f64(row: &Value, field: &str) -> f64 {
    match row.get("metrics").and_then(|m| m.get(field)) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn build_metrics(account_rows: &[Value], campaign_rows: &[Value]) -> AdsMetrics {
    let mut spend_micros = 0.0;
    let mut clicks = 0.0;
    let mut impressions = 0.0;
    let mut conversions = 0.0;
    let mut conversion_value = 0.0;

    for row in account_rows {
        spend_micros += metric_f64(row, "costMicros");
        clicks += metric_f64(row, "clicks");
        impressions += metric_f64(row, "impressions");
        conversions += metric_f64(row, "conversions");
        conversion_value += metric_f64(row, "conversionsValue");
    }

    let spend = spend_micros / 1_000_000.0;
    let ctr = if impressions > 0.0 {
        clicks / impressions * 100.0
    } else {
        0.0
    };
    let cpc = if clicks > 0.0 { spend / clicks } else { 0.0 };
    let roas = if spend > 0.0 {
        conversion_value / spend
    } else {
        0.0
    };

    let campaigns = campaign_rows
        .iter()
        .map(|row| {
            let campaign_spend = metric_f64(row, "costMicros") / 1_000_000.0;
            let campaign_value = metric_f64(row, "conversionsValue");
            let campaign = row.get("campaign");
            AdsCampaign {
                id: campaign
                    .and_then(|c| c.get("id"))
                    .map(json_to_string)
                    .unwrap_or_else(|| "unknown".to_string()),
                name: campaign
                    .and_then(|c| c.get("name"))
                    .map(json_to_string)
                    .unwrap_or_else(|| "Unknown Campaign".to_string()),
                spend: round2(campaign_spend),
                clicks: metric_f64(row, "clicks") as u64,
                impressions: metric_f64(row, "impressions") as u64,
                conversions: round1(metric_f64(row, "conversions")),
                roas: if campaign_spend > 0.0 {
                    round2(campaign_value / campaign_spend)
                } else {
                    0.0
                },
            }
        })
        .collect();

    AdsMetrics {
        spend: round2(spend),
        clicks: clicks as u64,
        impressions: impressions as u64,
        ctr: round2(ctr),
        cpc: round2(cpc),
        conversions: round1(conversions),
        conversion_value: round2(conversion_value),
        roas: round2(roas),
        campaigns,
    }
}

fn json_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
