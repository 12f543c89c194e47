//! Domain types exchanged with Fulcrum Core and the direct HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_ingress_host() -> String {
    "localhost".to_string()
}

/// Identifies one participant stack.
///
/// The participant name doubles as the Kubernetes namespace and as a URL
/// path segment on the seeding APIs, so it must be a valid namespace
/// identifier. Immutable once derived for a given job or request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDefinition {
    #[serde(rename = "participantName")]
    pub participant_name: String,

    /// Decentralized identifier (DID) of the participant.
    pub did: String,

    /// Ingress host under which the participant stack is reachable from
    /// outside the cluster. Defaults to `localhost` when omitted.
    #[serde(rename = "kubeHost", default = "default_ingress_host")]
    pub kubernetes_ingress_host: String,
}

/// Action requested by a queue job. Anything the agent does not understand
/// is deserialized as [`JobAction::Other`] and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum JobAction {
    Create,
    Delete,
    #[serde(other)]
    Other,
}

/// Properties of the service a job refers to.
///
/// Fulcrum Core delivers these as a free-form property map; the agent only
/// cares about the three fields below, and absent properties become empty
/// strings rather than errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceProperties {
    pub participant_name: String,
    pub participant_did: String,
    pub kube_host: String,
}

/// Nested service record carried by a pending job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobService {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub status: String,
    pub properties: ServiceProperties,
}

/// One job returned by the Fulcrum Core pending-jobs endpoint.
///
/// Consumed read-only and never persisted; only jobs with status `Pending`
/// are actionable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingJob {
    pub id: String,
    pub action: JobAction,
    pub status: String,
    #[serde(default)]
    pub service: JobService,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PendingJob {
    /// Derive the participant definition for this job from the nested
    /// service properties.
    pub fn participant_definition(&self) -> ParticipantDefinition {
        ParticipantDefinition {
            participant_name: self.service.properties.participant_name.clone(),
            did: self.service.properties.participant_did.clone(),
            kubernetes_ingress_host: self.service.properties.kube_host.clone(),
        }
    }
}

/// Payload for registering this agent with Fulcrum Core.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentData {
    pub name: String,
    pub provider_id: String,
    pub agent_type_id: String,
    pub tags: Vec<String>,
    pub configuration: serde_json::Map<String, serde_json::Value>,
}

/// A freshly issued (or regenerated) access token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenData {
    pub id: String,
    pub value: String,
}

/// Token metadata returned by the token listing endpoint (no secret value).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInformation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scope_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_ingress_host_defaults_to_localhost() {
        let def: ParticipantDefinition =
            serde_json::from_str(r#"{"participantName": "acme", "did": "did:web:acme"}"#).unwrap();
        assert_eq!(def.kubernetes_ingress_host, "localhost");
    }

    #[test]
    fn unknown_job_action_deserializes_as_other() {
        let job: PendingJob = serde_json::from_str(
            r#"{"id": "j1", "action": "Reboot", "status": "Pending"}"#,
        )
        .unwrap();
        assert_eq!(job.action, JobAction::Other);
    }

    #[test]
    fn missing_service_properties_become_empty_strings() {
        let job: PendingJob = serde_json::from_str(
            r#"{
                "id": "j1",
                "action": "Create",
                "status": "Pending",
                "service": {"name": "acme-stack", "properties": {"participantName": "acme"}}
            }"#,
        )
        .unwrap();

        let def = job.participant_definition();
        assert_eq!(def.participant_name, "acme");
        assert_eq!(def.did, "");
        assert_eq!(def.kubernetes_ingress_host, "");
    }
}
