//! Dataspace issuer service client (holder registration).

use async_trait::async_trait;
use serde_json::json;

use crate::error::ApiError;
use crate::http::ApiConfig;

#[async_trait]
pub trait IssuerApi: Send + Sync {
    async fn create_holder(&self, did: &str, holder_id: &str, name: &str) -> Result<(), ApiError>;
}

pub struct IssuerClient {
    config: ApiConfig,
}

impl IssuerClient {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl IssuerApi for IssuerClient {
    async fn create_holder(&self, did: &str, holder_id: &str, name: &str) -> Result<(), ApiError> {
        let body = json!({"did": did, "holderId": holder_id, "name": name});
        self.config.post_json("/holders", body.to_string()).await?;
        Ok(())
    }
}
