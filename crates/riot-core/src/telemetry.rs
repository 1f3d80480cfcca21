use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::Snapshot;

/// Demo clips served by the backend. Animals get one by id, not by recording.
pub const DEMO_CLIPS: &[&str] = &[
    "rebanho_pastando.mp4",
    "vaca_caminhando.mp4",
    "bezerro_mamando.mp4",
    "touro_descansando.mp4",
];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the poller gets its snapshots from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Snapshot>;
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Health {
    pub status: String,
    pub animals_count: usize,
    pub herds_count: usize,
}

/// Client for the telemetry backend's REST API
#[derive(Clone)]
pub struct TelemetryClient {
    client: Client,
    base_url: String,
}

impl TelemetryClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<Health> {
        self.get_json("/health").await
    }

    /// Stream URL of the demo clip assigned to an animal
    pub fn video_url(&self, animal_id: u32) -> String {
        format!("{}/api/videos/{}", self.base_url, demo_clip_for(animal_id))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Error::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl SnapshotSource for TelemetryClient {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        self.get_json("/api/data").await
    }
}

pub fn demo_clip_for(animal_id: u32) -> &'static str {
    DEMO_CLIPS[animal_id as usize % DEMO_CLIPS.len()]
}
