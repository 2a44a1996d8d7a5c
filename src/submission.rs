// SPDX-License-Identifier: GPL-3.0-only

//! JSON submission of decoded codes
//!
//! One POST per detection, no retry and no idempotency key.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Body posted to the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    /// Decoded symbol text
    pub info: String,
    pub latitude: f64,
    pub longitude: f64,
    /// RFC 3339 UTC time of the detection (barcode scanner only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl SubmissionPayload {
    pub fn new(info: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            info: info.into(),
            latitude,
            longitude,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        self.timestamp = Some(timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
        self
    }
}

/// Why a submission failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Non-2xx response
    Status(u16),
    /// The request never completed
    Network(String),
    /// 2xx response whose body is not JSON
    InvalidBody(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::Status(code) => write!(f, "HTTP error: {}", code),
            RemoteError::Network(msg) => write!(f, "network error: {}", msg),
            RemoteError::InvalidBody(msg) => write!(f, "invalid response body: {}", msg),
        }
    }
}

impl std::error::Error for RemoteError {}

/// POSTs payloads to one endpoint
#[derive(Debug, Clone)]
pub struct SubmissionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SubmissionClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one payload and return the parsed JSON response
    pub async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<serde_json::Value, RemoteError> {
        debug!(endpoint = %self.endpoint, info = %payload.info, "Submitting scan");

        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %self.endpoint, error = %e, "Submission request failed");
                RemoteError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, status = status.as_u16(), "Endpoint rejected submission");
            return Err(RemoteError::Status(status.as_u16()));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| RemoteError::InvalidBody(e.to_string()))?;
        info!(endpoint = %self.endpoint, status = status.as_u16(), "Submission accepted");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_payload_without_timestamp() {
        let payload = SubmissionPayload::new("ABC123", 1.5, -2.25);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"info": "ABC123", "latitude": 1.5, "longitude": -2.25})
        );
    }

    #[test]
    fn test_payload_timestamp_is_utc_rfc3339() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let payload = SubmissionPayload::new("LIC-0042", 0.0, 0.0).with_timestamp(at);
        assert_eq!(payload.timestamp.as_deref(), Some("2024-05-01T12:30:00.000Z"));
    }

    #[test]
    fn test_status_error_mentions_code() {
        assert_eq!(RemoteError::Status(500).to_string(), "HTTP error: 500");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let client = SubmissionClient::new("http://127.0.0.1:9/api/post", Duration::from_secs(2))
            .unwrap();
        let result = client.submit(&SubmissionPayload::new("x", 0.0, 0.0)).await;
        assert!(matches!(result, Err(RemoteError::Network(_))));
    }
}
