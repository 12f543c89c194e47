//! Persisted agent identity.
//!
//! One record per deployment, keyed by display name, created once by the
//! bootstrap registrar and upserted on every process start when the access
//! token is rotated.

mod postgres;

use async_trait::async_trait;

pub use postgres::{ensure_schema, PostgresAgentStore};

use crate::error::StoreError;

/// The agent's registered identity with Fulcrum Core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentIdentity {
    pub agent_id: String,
    pub provider_id: String,
    pub agent_type_id: String,
    pub name: String,
    pub service_type_id: String,
    pub service_group_id: String,
    /// Id of the currently valid access token; rotated on every start.
    pub token_id: String,
}

#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Insert or update by agent id.
    async fn upsert(&self, identity: &AgentIdentity) -> Result<(), StoreError>;

    /// Fetch by display name. [`StoreError::NotFound`] if absent.
    async fn get_by_name(&self, name: &str) -> Result<AgentIdentity, StoreError>;
}
