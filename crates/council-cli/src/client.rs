//! HTTP client for the council orchestration service.

use coordination::stream::SummonRequest;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::CouncilConfig;

/// Errors talking to the orchestration service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },
}

/// Outcome of a validation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub ok: bool,
    pub detail: String,
}

#[derive(Serialize)]
struct CredentialsCheck<'a> {
    api_key: &'a str,
}

#[derive(Serialize)]
struct ModelCheck<'a> {
    model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

/// Thin wrapper over the service endpoints.
#[derive(Debug, Clone)]
pub struct CouncilClient {
    http: reqwest::Client,
    config: CouncilConfig,
}

impl CouncilClient {
    pub fn new(config: CouncilConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// Open the event stream for a session. The response body is the stream;
    /// no timeout applies to it.
    pub async fn summon(&self, request: &SummonRequest) -> Result<reqwest::Response, ClientError> {
        let url = self.config.endpoint("/api/summon");
        info!(url = %url, agents = request.selected_agents.len(), "Summoning council");
        let response = self.http.post(&url).json(request).send().await?;
        ensure_success(response).await
    }

    /// Liveness check.
    pub async fn health(&self) -> bool {
        let url = self.config.endpoint("/health");
        match self.http.get(&url).timeout(self.timeout()).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(url = %url, error = %e, "Health check failed");
                false
            }
        }
    }

    /// Ask the service whether an API key is usable.
    pub async fn check_credentials(&self, api_key: &str) -> Result<CheckResult, ClientError> {
        let url = self.config.endpoint("/api/check-credentials");
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout())
            .json(&CredentialsCheck { api_key })
            .send()
            .await?;
        Ok(check_result(response, "Credentials verified").await)
    }

    /// Ask the service whether a model id is reachable, optionally with a key.
    pub async fn check_model(
        &self,
        model_id: &str,
        api_key: Option<&str>,
    ) -> Result<CheckResult, ClientError> {
        let url = self.config.endpoint("/api/check-model");
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout())
            .json(&ModelCheck {
                model_id,
                api_key: api_key.filter(|k| !k.is_empty()),
            })
            .send()
            .await?;
        Ok(check_result(response, "Model verified").await)
    }

    /// Default models and roles as configured on the service.
    pub async fn config_defaults(&self) -> Result<serde_json::Value, ClientError> {
        let url = self.config.endpoint("/api/config-defaults");
        let response = self.http.get(&url).timeout(self.timeout()).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    fn timeout(&self) -> Duration {
        self.config.request_timeout
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status,
        detail: error_detail(status, &body),
    })
}

async fn check_result(response: reqwest::Response, ok_detail: &str) -> CheckResult {
    let status = response.status();
    if status.is_success() {
        return CheckResult {
            ok: true,
            detail: ok_detail.to_string(),
        };
    }
    let body = response.text().await.unwrap_or_default();
    CheckResult {
        ok: false,
        detail: error_detail(status, &body),
    }
}

/// The `detail` field of an error body, or a generic status message.
pub fn error_detail(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) if !other.is_null() => Some(other.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| format!("Error {}", status.as_u16()))
}
