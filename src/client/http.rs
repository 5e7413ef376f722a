//! HTTP client for the monitor endpoints.
//!
//! Snapshot fetching prefers the event-level endpoint and falls back to
//! the legacy aggregated one when the primary is down or answers with an
//! older payload shape. Both failing is the only hard error.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::engine::model::OsDetails;

use super::models::{EventSnapshot, LegacySnapshot, Snapshot};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid payload from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("event endpoint failed ({primary}); aggregated fallback failed ({fallback})")]
    AllEndpointsFailed { primary: String, fallback: String },
}

/// Source of queue snapshots. The pump only ever talks to this trait, so
/// tests drive the pipeline with canned payloads.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Snapshot, ClientError>;
}

/// Source of per-order metadata for enrichment.
#[async_trait]
pub trait DetailsSource: Send + Sync {
    /// `Ok(None)` means the order is unknown upstream; transport errors
    /// are `Err` and the cache treats them as absent too.
    async fn fetch_details(&self, nr_os: &str, ano: &str) -> Result<Option<OsDetails>, ClientError>;
}

pub struct SnapshotClient {
    http: reqwest::Client,
    base_url: String,
}

impl SnapshotClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value, ClientError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| ClientError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetch the event-level snapshot. An answer without both record
    /// arrays counts as a failure so the caller falls back.
    pub async fn fetch_events(&self) -> Result<EventSnapshot, ClientError> {
        let url = format!("{}/gravacao/xpose/status", self.base_url);
        let value = self.get_json(&url).await?;
        EventSnapshot::from_value(&value).ok_or_else(|| ClientError::Decode {
            url,
            message: "response lacks tickets/paths arrays".to_string(),
        })
    }

    pub async fn fetch_aggregated(&self) -> Result<LegacySnapshot, ClientError> {
        let url = format!("{}/gravacao/status", self.base_url);
        let value = self.get_json(&url).await?;
        serde_json::from_value(value).map_err(|e| ClientError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SnapshotSource for SnapshotClient {
    async fn fetch_snapshot(&self) -> Result<Snapshot, ClientError> {
        let primary_err = match self.fetch_events().await {
            Ok(snapshot) => return Ok(Snapshot::Events(snapshot)),
            Err(e) => e,
        };
        warn!(error = %primary_err, "event endpoint unavailable, trying aggregated fallback");

        match self.fetch_aggregated().await {
            Ok(snapshot) => Ok(Snapshot::Aggregated(snapshot)),
            Err(fallback_err) => Err(ClientError::AllEndpointsFailed {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            }),
        }
    }
}

#[async_trait]
impl DetailsSource for SnapshotClient {
    async fn fetch_details(&self, nr_os: &str, ano: &str) -> Result<Option<OsDetails>, ClientError> {
        let url = format!("{}/os/{}/{}/details", self.base_url, ano, nr_os);
        debug!(%nr_os, %ano, "fetching order details");

        let value = match self.get_json(&url).await {
            Ok(value) => value,
            // Unknown order numbers come back as errors; that is an
            // answer, not a failure.
            Err(ClientError::Status { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        if value.is_null() {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ClientError::Decode {
                url,
                message: e.to_string(),
            })
    }
}
