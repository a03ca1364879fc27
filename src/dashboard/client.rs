use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::api::PredictionResponse;
use crate::predictor::MatchFeatures;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The service could not be reached at all (refused, DNS, timeout).
    #[error("cannot reach prediction service at {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("prediction service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response from prediction service: {0}")]
    Decode(String),
}

/// Anything the dashboard can ask for a prediction.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    async fn predict(&self, features: &MatchFeatures) -> Result<PredictionResponse, ClientError>;

    /// Base URL, for logging and error messages.
    fn base_url(&self) -> &str;
}

/// HTTP client for the prediction API.
#[derive(Clone)]
pub struct PredictorClient {
    http: Client,
    base_url: Url,
}

impl PredictorClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid prediction API URL '{}'", base_url))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(PredictorClient { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url.join(path).map_err(|e| ClientError::Connection {
            url: self.base_url.to_string(),
            reason: e.to_string(),
        })
    }

    fn classify(&self, url: &Url, e: reqwest::Error) -> ClientError {
        if e.is_connect() || e.is_timeout() || e.is_request() {
            ClientError::Connection {
                url: url.to_string(),
                reason: e.to_string(),
            }
        } else {
            ClientError::Decode(e.to_string())
        }
    }

    /// GET /: returns the service's informational message.
    pub async fn health(&self) -> Result<String, ClientError> {
        let url = self.endpoint("/")?;
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(&url, e))?;
        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        let raw: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(raw["message"].as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl PredictionBackend for PredictorClient {
    async fn predict(&self, features: &MatchFeatures) -> Result<PredictionResponse, ClientError> {
        let url = self.endpoint("/predict")?;
        debug!("POST {} {:?}", url, features);

        let resp = self
            .http
            .post(url.clone())
            .json(features)
            .send()
            .await
            .map_err(|e| self.classify(&url, e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        resp.json::<PredictionResponse>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn base_url(&self) -> &str {
        self.base_url.as_str()
    }
}
