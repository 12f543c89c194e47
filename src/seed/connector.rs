//! Connector-data seeding stage: assets, policy definitions, contract
//! definitions.

use crate::clients::ManagementApi;
use crate::error::ApiError;

use super::StageOutcome;

const ASSETS: [&str; 2] = [
    include_str!("../../templates/seed/asset1.json"),
    include_str!("../../templates/seed/asset2.json"),
];

const POLICIES: [&str; 3] = [
    include_str!("../../templates/seed/policy_dataprocessor.json"),
    include_str!("../../templates/seed/policy_membership.json"),
    include_str!("../../templates/seed/policy_sensitive_data.json"),
];

const CONTRACT_DEFINITIONS: [&str; 2] = [
    include_str!("../../templates/seed/contractdef_require_membership.json"),
    include_str!("../../templates/seed/contractdef_require_sensitive.json"),
];

/// Create the fixed asset, policy, and contract-definition sets.
///
/// Sub-groups run sequentially; the first failure in any sub-group stops
/// the stage (later stages still run, the pipeline decides that).
pub async fn seed_connector(management: &dyn ManagementApi) -> StageOutcome {
    if let Err(e) = create_all(ASSETS.iter(), |body| management.create_asset(body)).await {
        return StageOutcome::Failed(format!("assets: {e}"));
    }
    tracing::debug!("assets created");

    if let Err(e) = create_all(POLICIES.iter(), |body| management.create_policy(body)).await {
        return StageOutcome::Failed(format!("policy definitions: {e}"));
    }
    tracing::debug!("policy definitions created");

    if let Err(e) = create_all(CONTRACT_DEFINITIONS.iter(), |body| {
        management.create_contract_definition(body)
    })
    .await
    {
        return StageOutcome::Failed(format!("contract definitions: {e}"));
    }
    tracing::debug!("contract definitions created");

    StageOutcome::Succeeded
}

async fn create_all<'a, F, Fut>(
    bodies: impl Iterator<Item = &'a &'a str>,
    create: F,
) -> Result<(), ApiError>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<String, ApiError>>,
{
    for body in bodies {
        create(body.to_string()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::FakeManagement;
    use super::*;

    #[tokio::test]
    async fn seeds_assets_then_policies_then_contract_definitions() {
        let management = FakeManagement::default();
        let outcome = seed_connector(&management).await;
        assert_eq!(outcome, StageOutcome::Succeeded);

        let calls = management.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "asset",
                "asset",
                "policy",
                "policy",
                "policy",
                "contractdef",
                "contractdef"
            ]
        );
    }

    #[tokio::test]
    async fn first_asset_failure_stops_the_stage() {
        let management = FakeManagement {
            fail_assets: true,
            ..Default::default()
        };
        let outcome = seed_connector(&management).await;
        assert!(outcome.is_failure());

        // Policies and contract definitions were never attempted.
        let calls = management.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["asset"]);
    }

    #[test]
    fn embedded_documents_are_valid_json() {
        for doc in ASSETS.iter().chain(POLICIES.iter()).chain(CONTRACT_DEFINITIONS.iter()) {
            serde_json::from_str::<serde_json::Value>(doc).unwrap();
        }
    }
}
