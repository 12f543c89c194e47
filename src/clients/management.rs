//! EDC management API client (assets, policies, contract definitions,
//! secrets).

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::ApiConfig;

#[async_trait]
pub trait ManagementApi: Send + Sync {
    async fn create_asset(&self, body: String) -> Result<String, ApiError>;
    async fn create_policy(&self, body: String) -> Result<String, ApiError>;
    async fn create_contract_definition(&self, body: String) -> Result<String, ApiError>;
    async fn create_secret(&self, body: String) -> Result<String, ApiError>;
}

pub struct ManagementClient {
    config: ApiConfig,
}

impl ManagementClient {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ManagementApi for ManagementClient {
    async fn create_asset(&self, body: String) -> Result<String, ApiError> {
        Ok(self.config.post_json("/assets", body).await?.body)
    }

    async fn create_policy(&self, body: String) -> Result<String, ApiError> {
        Ok(self.config.post_json("/policydefinitions", body).await?.body)
    }

    async fn create_contract_definition(&self, body: String) -> Result<String, ApiError> {
        Ok(self
            .config
            .post_json("/contractdefinitions", body)
            .await?
            .body)
    }

    async fn create_secret(&self, body: String) -> Result<String, ApiError> {
        Ok(self.config.post_json("/secrets", body).await?.body)
    }
}
