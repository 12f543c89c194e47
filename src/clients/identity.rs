//! IdentityHub API client (participant registration).

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ApiError;
use crate::http::ApiConfig;

/// Client credential issued for a freshly registered participant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub api_key: String,
}

#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Register a participant with the identity hub.
    ///
    /// Returns `Ok(None)` when the participant already exists (the hub
    /// answers 409); that is not an error, but no credential is issued.
    async fn create_participant(
        &self,
        body: String,
    ) -> Result<Option<ParticipantResponse>, ApiError>;
}

pub struct IdentityClient {
    config: ApiConfig,
}

impl IdentityClient {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl IdentityApi for IdentityClient {
    async fn create_participant(
        &self,
        body: String,
    ) -> Result<Option<ParticipantResponse>, ApiError> {
        let resp = self.config.post_json("/participants", body).await?;
        if resp.is_conflict() {
            return Ok(None);
        }
        let p = serde_json::from_str(&resp.body).map_err(|e| ApiError::Decode {
            url: format!("{}/participants", self.config.base_url),
            source: e,
        })?;
        Ok(Some(p))
    }
}
