//! Shared outbound HTTP plumbing.
//!
//! All REST clients (Fulcrum Core, management, identity, issuer) go through
//! one shared [`reqwest::Client`] constructed at startup and injected into
//! every component that needs it. Transient failures (transport errors and
//! 5xx responses) are retried a bounded number of times with exponential
//! backoff before being surfaced to the caller.

use std::time::Duration;

use crate::error::ApiError;

/// Maximum attempts per outbound request (1 initial + 2 retries).
const MAX_ATTEMPTS: u32 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Build the process-wide outbound HTTP client.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()
}

/// Execute a request, retrying on transport errors and 5xx responses.
///
/// `build` is invoked once per attempt because a [`reqwest::RequestBuilder`]
/// is consumed on send. Non-5xx responses (including 4xx) are returned to
/// the caller as-is; status interpretation is client-specific.
pub async fn execute_with_retry<F>(url: &str, build: F) -> Result<reqwest::Response, ApiError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = build().send().await;

        match result {
            Ok(resp) if resp.status().is_server_error() && attempt < MAX_ATTEMPTS => {
                tracing::debug!(
                    url,
                    status = resp.status().as_u16(),
                    attempt,
                    "retrying after server error"
                );
            }
            Ok(resp) => return Ok(resp),
            Err(e) if attempt < MAX_ATTEMPTS => {
                tracing::debug!(url, attempt, error = %e, "retrying after transport error");
            }
            Err(e) => {
                return Err(ApiError::Transport {
                    url: url.to_string(),
                    source: e,
                });
            }
        }

        let backoff_ms = 200_u64.saturating_mul(1 << (attempt - 1));
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
    }
}

/// Outcome of a seeding-API call: the status code plus raw body, for
/// endpoints where a 409 must be distinguished from success.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }
}

/// Connection details for one downstream seeding API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: String,
}

impl ApiConfig {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// POST a JSON body authenticated with the `x-api-key` header.
    ///
    /// Responses outside 2xx are errors with one exception: a 409 is
    /// returned to the caller as a regular [`ApiResponse`] so the
    /// already-exists case can be handled where it matters.
    pub async fn post_json(&self, path: &str, body: String) -> Result<ApiResponse, ApiError> {
        let url = self.url(path);
        let resp = execute_with_retry(&url, || {
            self.client
                .post(&url)
                .header("Content-Type", "application/json")
                .header("x-api-key", &self.api_key)
                .body(body.clone())
        })
        .await?;

        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| ApiError::Transport {
            url: url.clone(),
            source: e,
        })?;

        if status != 409 && !(200..300).contains(&status) {
            tracing::warn!(url, status, body = %text, "seeding request rejected");
            return Err(ApiError::Status {
                url,
                status,
                body: text,
            });
        }
        Ok(ApiResponse { status, body: text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_duplicate_slashes() {
        let cfg = ApiConfig::new(
            reqwest::Client::new(),
            "http://localhost/acme/cp/api/management/v3/",
            "password",
        );
        assert_eq!(
            cfg.url("/assets"),
            "http://localhost/acme/cp/api/management/v3/assets"
        );
    }
}
