//! Resource template rendering.
//!
//! The participant stack is described by two static multi-document YAML
//! bundles compiled into the binary. Rendering substitutes the participant
//! name and DID into the bundle text and splits it into discrete structured
//! objects.

use kube::core::DynamicObject;

use crate::error::ProvisionError;
use crate::model::ParticipantDefinition;

/// Primary connector stack: namespace, config, controlplane, dataplane,
/// services, ingress.
pub const CONNECTOR_BUNDLE: &str = include_str!("../../templates/connector.yaml");

/// Identity hub component for the participant.
pub const IDENTITY_HUB_BUNDLE: &str = include_str!("../../templates/identityhub.yaml");

/// Substitute participant placeholders into a template.
///
/// Both the `${VAR}` and bare `$VAR` spellings are supported for
/// `PARTICIPANT_NAME` and `PARTICIPANT_ID`. Rendering is purely textual and
/// deterministic for a given definition.
pub fn render(template: &str, definition: &ParticipantDefinition) -> String {
    template
        .replace("${PARTICIPANT_NAME}", &definition.participant_name)
        .replace("$PARTICIPANT_NAME", &definition.participant_name)
        .replace("${PARTICIPANT_ID}", &definition.did)
        .replace("$PARTICIPANT_ID", &definition.did)
}

/// Split a rendered bundle on the document separator and parse each
/// non-empty fragment into a [`DynamicObject`].
pub fn parse_documents(rendered: &str) -> Result<Vec<DynamicObject>, ProvisionError> {
    let mut objects = Vec::new();
    for doc in rendered.split("\n---") {
        let doc = doc.trim();
        if doc.is_empty() {
            continue;
        }
        let obj: DynamicObject = serde_yaml::from_str(doc)?;
        objects.push(obj);
    }
    Ok(objects)
}

/// The `(name, kind)` pair reported for one rendered resource.
pub fn name_and_kind(obj: &DynamicObject) -> Result<(String, String), ProvisionError> {
    let name = obj
        .metadata
        .name
        .clone()
        .ok_or(ProvisionError::MissingName)?;
    let kind = obj
        .types
        .as_ref()
        .map(|t| t.kind.clone())
        .ok_or(ProvisionError::MissingTypeMeta)?;
    Ok((name, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> ParticipantDefinition {
        ParticipantDefinition {
            participant_name: "acme".to_string(),
            did: "did:web:acme".to_string(),
            kubernetes_ingress_host: "localhost".to_string(),
        }
    }

    #[test]
    fn render_is_deterministic() {
        let def = definition();
        assert_eq!(render(CONNECTOR_BUNDLE, &def), render(CONNECTOR_BUNDLE, &def));
        assert_eq!(
            render(IDENTITY_HUB_BUNDLE, &def),
            render(IDENTITY_HUB_BUNDLE, &def)
        );
    }

    #[test]
    fn render_replaces_both_placeholder_spellings() {
        let rendered = render(
            "a: $PARTICIPANT_NAME-svc\nb: ${PARTICIPANT_NAME}-svc\nc: $PARTICIPANT_ID\nd: ${PARTICIPANT_ID}",
            &definition(),
        );
        assert_eq!(
            rendered,
            "a: acme-svc\nb: acme-svc\nc: did:web:acme\nd: did:web:acme"
        );
        assert!(!rendered.contains("PARTICIPANT"));
    }

    #[test]
    fn bundles_render_without_leftover_placeholders() {
        let def = definition();
        for bundle in [CONNECTOR_BUNDLE, IDENTITY_HUB_BUNDLE] {
            let rendered = render(bundle, &def);
            assert!(!rendered.contains("$PARTICIPANT"), "unreplaced placeholder");
            assert!(!rendered.contains("${"), "unreplaced placeholder");
        }
    }

    #[test]
    fn parse_splits_and_skips_empty_documents() {
        let rendered = render(CONNECTOR_BUNDLE, &definition());
        let objects = parse_documents(&rendered).unwrap();
        assert_eq!(objects.len(), 7);

        let (name, kind) = name_and_kind(&objects[0]).unwrap();
        assert_eq!(name, "acme");
        assert_eq!(kind, "Namespace");
    }

    #[test]
    fn parse_rejects_malformed_document() {
        let result = parse_documents("apiVersion: v1\nkind: [not\nvalid");
        assert!(result.is_err());
    }
}
