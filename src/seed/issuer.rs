//! Issuer seeding stage: register the participant as a credential holder.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::clients::IssuerApi;
use crate::model::ParticipantDefinition;

use super::StageOutcome;

/// Fixed identifier of the dataspace issuer service.
pub const ISSUER_ID: &str =
    "did:web:dataspace-issuer-service.poc-issuer.svc.cluster.local%3A10016:issuer";

/// Issuer admin API base path for the fixed issuer, addressed by the
/// base64-encoded issuer id.
pub(crate) fn admin_base_url(ingress_host: &str) -> String {
    format!(
        "http://{}/issuer/ad/api/admin/v1alpha/participants/{}",
        ingress_host,
        BASE64.encode(ISSUER_ID)
    )
}

pub async fn seed_issuer(issuer: &dyn IssuerApi, definition: &ParticipantDefinition) -> StageOutcome {
    match issuer
        .create_holder(&definition.did, &definition.did, &definition.participant_name)
        .await
    {
        Ok(()) => StageOutcome::Succeeded,
        Err(e) => StageOutcome::Failed(format!("holder registration: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_base_url_encodes_the_issuer_id() {
        let url = admin_base_url("localhost");
        assert!(url.starts_with("http://localhost/issuer/ad/api/admin/v1alpha/participants/"));
        assert!(url.ends_with(&BASE64.encode(ISSUER_ID)));
        // The raw DID never appears in the path.
        assert!(!url.contains("did:web"));
    }
}
