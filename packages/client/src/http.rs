use std::time::Duration;

use common::config::HttpConfig;
use common::normalize::first_message;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// How to turn a failed response into a user-facing message: the first
/// non-empty field among `keys` in the error body, else `fallback`.
#[derive(Debug, Clone, Copy)]
pub struct ErrorMessages {
    pub keys: &'static [&'static str],
    pub fallback: &'static str,
}

impl ErrorMessages {
    pub const fn new(keys: &'static [&'static str], fallback: &'static str) -> Self {
        Self { keys, fallback }
    }

    fn resolve(&self, body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|body| first_message(&body, self.keys))
            .unwrap_or_else(|| self.fallback.to_string())
    }
}

/// JSON-over-HTTP plumbing shared by every service client.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Validation(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, timeout })
    }

    pub async fn get_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        query: &[(&str, &str)],
        messages: ErrorMessages,
    ) -> Result<Value> {
        let mut request = self.http.get(url).header("Content-Type", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send(request, bearer, messages).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &B,
        messages: ErrorMessages,
    ) -> Result<Value> {
        let request = self.http.post(url).json(body);
        self.send(request, bearer, messages).await
    }

    async fn send(
        &self,
        mut request: RequestBuilder,
        bearer: Option<&str>,
        messages: ErrorMessages,
    ) -> Result<Value> {
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(error = %e, "Request timed out");
                return Err(ClientError::Timeout(self.timeout));
            }
            Err(e) if e.is_builder() => return Err(ClientError::InvalidUrl(e.to_string())),
            Err(e) => {
                warn!(error = %e, "Request failed");
                return Err(ClientError::fetch_failed(None, messages.fallback));
            }
        };

        let status = response.status();
        let url = response.url().to_string();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Err(ClientError::Timeout(self.timeout)),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to read response body");
                return Err(ClientError::fetch_failed(Some(status.as_u16()), messages.fallback));
            }
        };

        if status == StatusCode::UNAUTHORIZED {
            debug!(url = %url, "Server rejected credentials");
            return Err(ClientError::AuthRequired);
        }

        if !status.is_success() {
            let message = messages.resolve(&body);
            warn!(url = %url, status = status.as_u16(), message = %message, "Request rejected");
            return Err(ClientError::fetch_failed(Some(status.as_u16()), message));
        }

        if body.trim().is_empty() {
            return Err(ClientError::EmptyResponse);
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Null) => Err(ClientError::EmptyResponse),
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(url = %url, error = %e, "Response is not valid JSON");
                Err(ClientError::fetch_failed(
                    Some(status.as_u16()),
                    format!("Invalid JSON response: {e}"),
                ))
            }
        }
    }
}
