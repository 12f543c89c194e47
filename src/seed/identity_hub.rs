//! Identity-hub seeding stage: participant registration and connector
//! secret provisioning.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::clients::{IdentityApi, ManagementApi};
use crate::model::ParticipantDefinition;

use super::StageOutcome;

const PARTICIPANT_TEMPLATE: &str = include_str!("../../templates/participant.json");

/// Register the participant with its identity hub and push the issued
/// client secret into the connector's management API.
///
/// A 409 from the registration call means the participant is already
/// registered; the stage returns early and no secret is provisioned.
pub async fn seed_identity_hub(
    identity: &dyn IdentityApi,
    management: &dyn ManagementApi,
    definition: &ParticipantDefinition,
) -> StageOutcome {
    let body = render_registration(definition);

    let participant = match identity.create_participant(body).await {
        Ok(Some(p)) => p,
        Ok(None) => return StageOutcome::AlreadyExists,
        Err(e) => return StageOutcome::Failed(format!("participant registration: {e}")),
    };

    let secret_body = serde_json::json!({
        "@context": ["https://w3id.org/edc/connector/management/v0.0.1"],
        "@id": format!("{}-sts-client-secret", participant.client_id),
        "value": participant.client_secret,
    });
    if let Err(e) = management.create_secret(secret_body.to_string()).await {
        return StageOutcome::Failed(format!("connector secret: {e}"));
    }

    StageOutcome::Succeeded
}

/// Substitute the participant's name, DID, DID base64, and internal service
/// URLs into the registration document.
fn render_registration(definition: &ParticipantDefinition) -> String {
    let namespace = &definition.participant_name;
    let ih_base_url = format!("http://identityhub.{namespace}.svc.cluster.local:7082");
    let edc_base_url = format!("http://controlplane.{namespace}.svc.cluster.local:8082");

    PARTICIPANT_TEMPLATE
        .replace("${PARTICIPANT_NAME}", namespace)
        .replace("${PARTICIPANT_DID_BASE64}", &BASE64.encode(&definition.did))
        .replace("${PARTICIPANT_DID}", &definition.did)
        .replace("${IH_BASE_URL}", &ih_base_url)
        .replace("${EDC_BASE_URL}", &edc_base_url)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{FakeIdentity, FakeManagement};
    use super::*;
    use crate::clients::ParticipantResponse;

    fn definition() -> ParticipantDefinition {
        ParticipantDefinition {
            participant_name: "acme".to_string(),
            did: "did:web:acme".to_string(),
            kubernetes_ingress_host: "localhost".to_string(),
        }
    }

    #[test]
    fn registration_document_substitutes_all_placeholders() {
        let body = render_registration(&definition());
        assert!(!body.contains("${"), "unreplaced placeholder in {body}");

        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["did"], "did:web:acme");
        assert!(body.contains("http://identityhub.acme.svc.cluster.local:7082"));
        assert!(body.contains("http://controlplane.acme.svc.cluster.local:8082"));
        assert!(body.contains(&BASE64.encode("did:web:acme")));
    }

    #[tokio::test]
    async fn conflict_returns_early_and_skips_secret_creation() {
        let identity = FakeIdentity { response: None };
        let management = FakeManagement::default();

        let outcome = seed_identity_hub(&identity, &management, &definition()).await;

        assert_eq!(outcome, StageOutcome::AlreadyExists);
        assert_eq!(management.secret_calls(), 0);
    }

    #[tokio::test]
    async fn fresh_registration_pushes_client_secret() {
        let identity = FakeIdentity {
            response: Some(ParticipantResponse {
                client_id: "acme-client".to_string(),
                client_secret: "s3cret".to_string(),
                api_key: String::new(),
            }),
        };
        let management = FakeManagement::default();

        let outcome = seed_identity_hub(&identity, &management, &definition()).await;

        assert_eq!(outcome, StageOutcome::Succeeded);
        let calls = management.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("acme-client-sts-client-secret"));
        assert!(calls[0].contains("s3cret"));
    }
}
