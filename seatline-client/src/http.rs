use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EndpointConfig;

/// Wire envelope every REST collaborator responds with.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub code: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn reason(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "no reason given".to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    retry_backoff: Duration,
}

impl RestClient {
    pub fn new(endpoints: &EndpointConfig, retry_backoff_ms: u64) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(endpoints.request_timeout_secs))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            http,
            base_url: endpoints.base_url.trim_end_matches('/').to_string(),
            retry_backoff: Duration::from_millis(retry_backoff_ms),
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiEnvelope<T>, TransportError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Self::decode(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiEnvelope<T>, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Self::decode(response).await
    }

    /// Read-only POST with one bounded retry. Mutating requests must not
    /// come through here: a timed-out mutation may have been applied
    /// server-side.
    pub async fn post_with_retry<B, T>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match self.post(path, body).await {
            Err(TransportError::Request(first)) => {
                tracing::warn!("POST {} failed ({}), retrying once", path, first);
                tokio::time::sleep(self.retry_backoff).await;
                self.post(path, body).await
            }
            other => other,
        }
    }

    /// Read-only GET with one bounded retry.
    pub async fn get_with_retry<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiEnvelope<T>, TransportError> {
        match self.get(path).await {
            Err(TransportError::Request(first)) => {
                tracing::warn!("GET {} failed ({}), retrying once", path, first);
                tokio::time::sleep(self.retry_backoff).await;
                self.get(path).await
            }
            other => other,
        }
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiEnvelope<T>, TransportError> {
        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Request(format!("status {}: {}", status, body)));
        }

        // 4xx bodies still carry the envelope with a machine-readable code
        response
            .json::<ApiEnvelope<T>>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_error_payload() {
        let json = r#"{"success": false, "message": "seats taken", "code": "SEATS_UNAVAILABLE"}"#;
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.code.as_deref(), Some("SEATS_UNAVAILABLE"));
        assert_eq!(envelope.reason(), "seats taken");
    }

    #[test]
    fn test_envelope_success_payload() {
        let json = r#"{"success": true, "data": [1, 2, 3]}"#;
        let envelope: ApiEnvelope<Vec<i32>> = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap(), vec![1, 2, 3]);
    }
}
