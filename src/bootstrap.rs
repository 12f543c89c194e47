//! One-time self-registration of this agent with Fulcrum Core.
//!
//! Runs at startup before any queue polling. The registration chain is
//! executed only on first run; token issuance happens on every start,
//! rotating the persisted token id and implicitly invalidating the token
//! from the previous run.

use crate::clients::FulcrumApi;
use crate::error::{BootstrapError, StoreError};
use crate::model::AgentData;
use crate::store::{AgentIdentity, AgentStore};

/// Display name identifying this agent's persisted record.
pub const AGENT_NAME: &str = "EDC Provisioner Agent";

const TOKEN_NAME: &str = "Provisioner Access Token";

/// Ensure the agent identity exists and issue a fresh access token.
///
/// Returns the token value for exclusive use by the dispatch loop. Any
/// failure here is fatal to startup: no partial identity is persisted.
pub async fn bootstrap(
    api: &dyn FulcrumApi,
    store: &dyn AgentStore,
) -> Result<String, BootstrapError> {
    let mut identity = match store.get_by_name(AGENT_NAME).await {
        Ok(identity) => identity,
        Err(StoreError::NotFound) => register_agent(api).await?,
        Err(e) => return Err(e.into()),
    };

    tracing::info!(agent_id = %identity.agent_id, "issuing agent token");
    let token = api
        .create_agent_token(&identity.agent_id, TOKEN_NAME)
        .await
        .map_err(BootstrapError::Token)?;

    identity.token_id = token.id;
    store.upsert(&identity).await?;

    Ok(token.value)
}

/// First-run registration chain, in strict order. Each step references ids
/// from the previous ones; a failure anywhere aborts without persisting.
async fn register_agent(api: &dyn FulcrumApi) -> Result<AgentIdentity, BootstrapError> {
    tracing::info!("no persisted agent identity, registering with Fulcrum Core");

    let reg = |entity| move |source| BootstrapError::Registration { entity, source };

    tracing::info!("  > creating service type");
    let service_type_id = api
        .create_service_type("edc-aio", "EDC All-in-one deployment")
        .await
        .map_err(reg("service type"))?;

    tracing::info!("  > creating agent type");
    let agent_type_id = api
        .create_agent_type(&service_type_id, "k8s-provisioner-agent")
        .await
        .map_err(reg("agent type"))?;

    tracing::info!("  > creating participant");
    let provider_id = api
        .create_participant("K8S Provisioner Participant")
        .await
        .map_err(reg("participant"))?;

    tracing::info!("  > creating service group");
    let service_group_id = api
        .create_service_group(&provider_id, "EDC Services Group")
        .await
        .map_err(reg("service group"))?;

    tracing::info!("  > creating agent");
    let agent_id = api
        .create_agent(&AgentData {
            name: AGENT_NAME.to_string(),
            provider_id: provider_id.clone(),
            agent_type_id: agent_type_id.clone(),
            tags: vec!["cfm".to_string(), "edc".to_string()],
            configuration: serde_json::Map::new(),
        })
        .await
        .map_err(reg("agent"))?;

    Ok(AgentIdentity {
        agent_id,
        provider_id,
        agent_type_id,
        name: AGENT_NAME.to_string(),
        service_type_id,
        service_group_id,
        token_id: String::new(),
    })
}
