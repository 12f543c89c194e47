//! Fulcrum Core API client: job queue plus agent identity management.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::execute_with_retry;
use crate::model::{AgentData, PendingJob, TokenData, TokenInformation};

/// Operations against Fulcrum Core.
///
/// The identity-management half is invoked once at startup by the bootstrap
/// registrar; the job half is invoked by the dispatch loop using the agent
/// token issued during bootstrap.
#[async_trait]
pub trait FulcrumApi: Send + Sync {
    async fn create_service_type(&self, id: &str, name: &str) -> Result<String, ApiError>;
    async fn create_agent_type(&self, service_type_id: &str, name: &str)
        -> Result<String, ApiError>;
    async fn create_participant(&self, name: &str) -> Result<String, ApiError>;
    async fn create_service_group(&self, provider_id: &str, name: &str)
        -> Result<String, ApiError>;
    async fn create_agent(&self, agent: &AgentData) -> Result<String, ApiError>;
    async fn create_agent_token(&self, agent_id: &str, token_name: &str)
        -> Result<TokenData, ApiError>;
    async fn list_tokens(&self) -> Result<Vec<TokenInformation>, ApiError>;
    async fn regenerate_token(&self, token_id: &str) -> Result<TokenData, ApiError>;

    async fn get_pending_jobs(&self, agent_token: &str) -> Result<Vec<PendingJob>, ApiError>;
    async fn claim_job(&self, agent_token: &str, job_id: &str) -> Result<(), ApiError>;
    async fn finalize_job(&self, agent_token: &str, job_id: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListTokenResponse {
    items: Vec<TokenInformation>,
}

pub struct FulcrumClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FulcrumClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            // Bootstrap endpoints are protected by a deployment-level key.
            api_key: "change-me".to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        bearer: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, ApiError> {
        let url = self.url(path);
        let resp = execute_with_retry(&url, || {
            let mut rq = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(bearer);
            if let Some(ref body) = body {
                rq = rq.json(body);
            }
            rq
        })
        .await?;

        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| ApiError::Transport {
            url: url.clone(),
            source: e,
        })?;
        if !(200..300).contains(&status) {
            return Err(ApiError::Status {
                url,
                status,
                body: text,
            });
        }
        Ok(text)
    }

    async fn post_for_id(&self, path: &str, body: serde_json::Value) -> Result<String, ApiError> {
        let text = self
            .send(reqwest::Method::POST, path, &self.api_key, Some(body))
            .await?;
        let r: IdResponse = decode(path, &text)?;
        Ok(r.id)
    }
}

fn decode<T: for<'de> Deserialize<'de>>(url: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        source: e,
    })
}

#[async_trait]
impl FulcrumApi for FulcrumClient {
    async fn create_service_type(&self, id: &str, name: &str) -> Result<String, ApiError> {
        self.post_for_id("/api/v1/service-types", json!({"id": id, "name": name}))
            .await
    }

    async fn create_agent_type(
        &self,
        service_type_id: &str,
        name: &str,
    ) -> Result<String, ApiError> {
        self.post_for_id(
            "/api/v1/agent-types",
            json!({"serviceTypeIds": [service_type_id], "name": name}),
        )
        .await
    }

    async fn create_participant(&self, name: &str) -> Result<String, ApiError> {
        self.post_for_id(
            "/api/v1/participants",
            json!({"status": "Enabled", "name": name}),
        )
        .await
    }

    async fn create_service_group(
        &self,
        provider_id: &str,
        name: &str,
    ) -> Result<String, ApiError> {
        self.post_for_id(
            "/api/v1/service-groups",
            json!({"consumerId": provider_id, "name": name}),
        )
        .await
    }

    async fn create_agent(&self, agent: &AgentData) -> Result<String, ApiError> {
        let body = serde_json::to_value(agent).map_err(|e| ApiError::Decode {
            url: "/api/v1/agents".to_string(),
            source: e,
        })?;
        self.post_for_id("/api/v1/agents", body).await
    }

    async fn create_agent_token(
        &self,
        agent_id: &str,
        token_name: &str,
    ) -> Result<TokenData, ApiError> {
        let expire_at = (Utc::now() + ChronoDuration::days(365))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let text = self
            .send(
                reqwest::Method::POST,
                "/api/v1/tokens",
                &self.api_key,
                Some(json!({
                    "scopeId": agent_id,
                    "name": token_name,
                    "role": "agent",
                    "expireAt": expire_at,
                })),
            )
            .await?;
        decode("/api/v1/tokens", &text)
    }

    async fn list_tokens(&self) -> Result<Vec<TokenInformation>, ApiError> {
        let text = self
            .send(reqwest::Method::GET, "/api/v1/tokens", &self.api_key, None)
            .await?;
        let r: ListTokenResponse = decode("/api/v1/tokens", &text)?;
        Ok(r.items)
    }

    async fn regenerate_token(&self, token_id: &str) -> Result<TokenData, ApiError> {
        let path = format!("/api/v1/tokens/{token_id}/regenerate");
        let text = self
            .send(reqwest::Method::POST, &path, &self.api_key, None)
            .await?;
        decode(&path, &text)
    }

    async fn get_pending_jobs(&self, agent_token: &str) -> Result<Vec<PendingJob>, ApiError> {
        let text = self
            .send(
                reqwest::Method::GET,
                "/api/v1/jobs/pending",
                agent_token,
                None,
            )
            .await?;
        decode("/api/v1/jobs/pending", &text)
    }

    async fn claim_job(&self, agent_token: &str, job_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/v1/jobs/{job_id}/claim");
        self.send(reqwest::Method::POST, &path, agent_token, None)
            .await?;
        Ok(())
    }

    async fn finalize_job(&self, agent_token: &str, job_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/v1/jobs/{job_id}/complete");
        let body = json!({
            "externalId": format!("k8s-provisioner-{}", Uuid::new_v4()),
            "resources": {},
        });
        self.send(reqwest::Method::POST, &path, agent_token, Some(body))
            .await?;
        Ok(())
    }
}
