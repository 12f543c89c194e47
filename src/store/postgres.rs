//! Postgres-backed agent identity store.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use super::{AgentIdentity, AgentStore};
use crate::error::StoreError;

/// Idempotent schema setup, safe to run on every startup.
const SCHEMA_DDL: &str = "
CREATE TABLE IF NOT EXISTS agent_identity (
  agent_id         TEXT PRIMARY KEY,
  provider_id      TEXT NOT NULL,
  agent_type_id    TEXT NOT NULL,
  name             TEXT NOT NULL,
  service_type_id  TEXT NOT NULL,
  service_group_id TEXT NOT NULL,
  token_id         TEXT NOT NULL DEFAULT ''
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_agent_identity_name ON agent_identity (name);
CREATE INDEX IF NOT EXISTS idx_agent_identity_provider_id ON agent_identity (provider_id);
CREATE INDEX IF NOT EXISTS idx_agent_identity_agent_type_id ON agent_identity (agent_type_id);
";

/// Create the required tables and indexes if they do not exist.
pub async fn ensure_schema(pool: &Pool) -> Result<(), StoreError> {
    let client = pool.get().await.map_err(db_err)?;
    client.batch_execute(SCHEMA_DDL).await.map_err(db_err)?;
    Ok(())
}

pub struct PostgresAgentStore {
    pool: Pool,
}

impl PostgresAgentStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

fn row_to_identity(row: &Row) -> AgentIdentity {
    AgentIdentity {
        agent_id: row.get("agent_id"),
        provider_id: row.get("provider_id"),
        agent_type_id: row.get("agent_type_id"),
        name: row.get("name"),
        service_type_id: row.get("service_type_id"),
        service_group_id: row.get("service_group_id"),
        token_id: row.get("token_id"),
    }
}

#[async_trait]
impl AgentStore for PostgresAgentStore {
    async fn upsert(&self, identity: &AgentIdentity) -> Result<(), StoreError> {
        const QUERY: &str = "
INSERT INTO agent_identity
  (agent_id, provider_id, agent_type_id, name, service_type_id, service_group_id, token_id)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (agent_id) DO UPDATE
SET provider_id = EXCLUDED.provider_id,
    agent_type_id = EXCLUDED.agent_type_id,
    name = EXCLUDED.name,
    service_type_id = EXCLUDED.service_type_id,
    service_group_id = EXCLUDED.service_group_id,
    token_id = EXCLUDED.token_id";

        let client = self.pool.get().await.map_err(db_err)?;
        client
            .execute(
                QUERY,
                &[
                    &identity.agent_id,
                    &identity.provider_id,
                    &identity.agent_type_id,
                    &identity.name,
                    &identity.service_type_id,
                    &identity.service_group_id,
                    &identity.token_id,
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_by_name(&self, name: &str) -> Result<AgentIdentity, StoreError> {
        const QUERY: &str = "
SELECT agent_id, provider_id, agent_type_id, name, service_type_id, service_group_id, token_id
FROM agent_identity
WHERE name = $1";

        let client = self.pool.get().await.map_err(db_err)?;
        let row = client.query_opt(QUERY, &[&name]).await.map_err(db_err)?;
        match row {
            Some(row) => Ok(row_to_identity(&row)),
            None => Err(StoreError::NotFound),
        }
    }
}
