//! Client for the remote scoring service.
//!
//! Scored tables with explanations come from a deployment endpoint: the
//! client uploads a CSV, the service scores it and returns a CSV with the
//! predictions, the explanation slot columns, and every input column passed
//! through.
//!
//! The client is deliberately thin — one request per call, the caller
//! decides what to do with a failure. Connection details come from the
//! environment so credentials stay out of the pipeline code.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use predexplain::scoring::ScoringClient;
//!
//! let client = ScoringClient::from_env()?;
//! client.ping().await?;
//! let scored = client.score_csv("deployment-id", csv_bytes, 10).await?;
//! ```

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the scoring API base URL.
pub const ENDPOINT_ENV: &str = "SCORING_API_ENDPOINT";

/// Environment variable holding the scoring API token.
pub const TOKEN_ENV: &str = "SCORING_API_TOKEN";

/// Default time to wait for a scoring response.
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);

/// Scoring-service client errors
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Missing {0} environment variable")]
    MissingConfig(&'static str),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Scoring API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Scoring service returned an empty response")]
    EmptyResponse,
}

/// Error body shape returned by the scoring service.
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Client for a deployment scoring endpoint.
#[derive(Clone)]
pub struct ScoringClient {
    endpoint: String,
    api_token: String,
    max_wait: Duration,
}

impl ScoringClient {
    /// Create a client with explicit endpoint and token.
    pub fn new(endpoint: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    /// Create a client from `SCORING_API_ENDPOINT` / `SCORING_API_TOKEN`.
    pub fn from_env() -> Result<Self, ScoringError> {
        // Pick up a .env file if present
        let _ = dotenvy::dotenv();

        let endpoint =
            std::env::var(ENDPOINT_ENV).map_err(|_| ScoringError::MissingConfig(ENDPOINT_ENV))?;
        let api_token =
            std::env::var(TOKEN_ENV).map_err(|_| ScoringError::MissingConfig(TOKEN_ENV))?;

        Ok(Self::new(endpoint, api_token))
    }

    /// Cap how long a scoring request may take. The queue on a busy
    /// prediction server can push a response past the default.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    fn http(&self) -> Result<reqwest::Client, ScoringError> {
        reqwest::Client::builder()
            .timeout(self.max_wait)
            .build()
            .map_err(|e| ScoringError::RequestFailed(e.to_string()))
    }

    /// Check that the service is reachable and the token is accepted.
    pub async fn ping(&self) -> Result<(), ScoringError> {
        let response = self
            .http()?
            .get(format!("{}/ping", self.endpoint))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| ScoringError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(api_error(status.as_u16(), response.text().await.ok()))
        }
    }

    /// Score a CSV against a deployment, requesting explanation columns.
    ///
    /// Returns the scored CSV bytes: predictions, `max_explanations` slot
    /// column pairs, and all input columns passed through.
    pub async fn score_csv(
        &self,
        deployment_id: &str,
        csv: &[u8],
        max_explanations: u32,
    ) -> Result<Vec<u8>, ScoringError> {
        let url = format!(
            "{}/deployments/{}/predictions",
            self.endpoint, deployment_id
        );

        let response = self
            .http()?
            .post(url)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "text/csv; charset=utf-8")
            .query(&[
                ("maxExplanations", max_explanations.to_string()),
                ("passthroughColumnsSet", "all".to_string()),
            ])
            .body(csv.to_vec())
            .send()
            .await
            .map_err(|e| ScoringError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ScoringError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body).to_string();
            return Err(api_error(status.as_u16(), Some(text)));
        }

        if body.is_empty() {
            return Err(ScoringError::EmptyResponse);
        }

        Ok(body.to_vec())
    }
}

/// Build an [`ScoringError::Api`], preferring the service's own message.
fn api_error(status: u16, body: Option<String>) -> ScoringError {
    let message = body
        .as_deref()
        .and_then(|b| serde_json::from_str::<ApiError>(b).ok())
        .map(|e| e.message)
        .or(body)
        .unwrap_or_else(|| "no response body".to_string());

    ScoringError::Api { status, message }
}
