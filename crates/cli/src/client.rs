//! API client for communicating with the scheduler service

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the Carbon Aware Scheduler
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API request/response types

#[derive(Debug, Clone, Serialize)]
pub struct RankRequest {
    pub regions: Vec<String>,
    pub schedule_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub cfp: f64,
    pub forecasted_cfp: f64,
    pub efficiency_ratio: f64,
    pub schedule_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionScore {
    pub region: String,
    pub rank_value: f64,
    pub components: ScoreComponents,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRequest {
    pub candidates: Vec<String>,
    pub duration_minutes: u32,
    pub deadline: i64,
    pub current_region: String,
    pub portable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDecision {
    pub decision: String,
    pub chosen_region: String,
    pub chosen_start_time: i64,
    pub expected_intensity: f64,
    pub expected_savings_percent: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotspot {
    pub phase: String,
    pub energy_j: f64,
    pub percent_of_total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equivalents {
    pub phone_charges: f64,
    pub miles_driven: f64,
    pub streaming_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementOutcome {
    pub workload: String,
    pub branch: String,
    pub commit_sha: String,
    pub total_energy_j: f64,
    pub baseline_energy_j: f64,
    pub baseline_samples: u64,
    pub delta_percent: f64,
    pub severity: String,
    pub hotspots: Vec<Hotspot>,
    pub co2_grams: f64,
    pub equivalents: Equivalents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub branch: String,
    pub workload: String,
    pub baseline_energy_j: f64,
    pub sample_count: u64,
    pub window: Vec<f64>,
    pub last_updated: i64,
}
