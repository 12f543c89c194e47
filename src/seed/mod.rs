//! Best-effort seeding of a freshly provisioned participant stack.
//!
//! Runs three stages strictly in sequence once the stack's deployments are
//! ready: connector data, identity hub registration, issuer registration.
//! No stage failure blocks a later stage and no stage failure propagates to
//! the caller; the pipeline returns a per-stage report instead.

mod connector;
mod identity_hub;
mod issuer;

use async_trait::async_trait;

pub use connector::seed_connector;
pub use identity_hub::seed_identity_hub;
pub use issuer::{seed_issuer, ISSUER_ID};

use crate::clients::{IdentityApi, IdentityClient, IssuerApi, IssuerClient, ManagementApi, ManagementClient};
use crate::http::ApiConfig;
use crate::model::ParticipantDefinition;

/// Pre-shared credential for the identity hub and issuer admin APIs.
const IDENTITY_API_KEY: &str = "c3VwZXItdXNlcg==.c3VwZXItc2VjcmV0LWtleQo=";

/// Pre-shared credential for the connector management API.
const MANAGEMENT_API_KEY: &str = "password";

/// Result of one seeding stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Succeeded,
    /// The downstream subsystem was already seeded (409). Not a failure.
    AlreadyExists,
    Failed(String),
}

impl StageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }
}

/// Per-stage outcomes of one pipeline run.
#[derive(Debug, Clone)]
pub struct SeedReport {
    pub connector: StageOutcome,
    pub identity_hub: StageOutcome,
    pub issuer: StageOutcome,
}

/// Runs the seeding pipeline for one participant.
#[async_trait]
pub trait SeedRunner: Send + Sync {
    async fn run_all(&self, definition: &ParticipantDefinition) -> SeedReport;
}

/// Production pipeline: builds short-lived API clients per stage from the
/// participant's ingress host and namespace.
pub struct SeedPipeline {
    http: reqwest::Client,
}

impl SeedPipeline {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn management_client(&self, definition: &ParticipantDefinition) -> ManagementClient {
        let base_url = format!(
            "http://{}/{}/cp/api/management/v3",
            definition.kubernetes_ingress_host, definition.participant_name
        );
        ManagementClient::new(ApiConfig::new(self.http.clone(), base_url, MANAGEMENT_API_KEY))
    }

    fn identity_client(&self, definition: &ParticipantDefinition) -> IdentityClient {
        let base_url = format!(
            "http://{}/{}/cs/api/identity/v1alpha",
            definition.kubernetes_ingress_host, definition.participant_name
        );
        IdentityClient::new(ApiConfig::new(self.http.clone(), base_url, IDENTITY_API_KEY))
    }

    fn issuer_client(&self, definition: &ParticipantDefinition) -> IssuerClient {
        IssuerClient::new(ApiConfig::new(
            self.http.clone(),
            issuer::admin_base_url(&definition.kubernetes_ingress_host),
            IDENTITY_API_KEY,
        ))
    }
}

#[async_trait]
impl SeedRunner for SeedPipeline {
    async fn run_all(&self, definition: &ParticipantDefinition) -> SeedReport {
        let management = self.management_client(definition);
        let identity = self.identity_client(definition);
        let issuer = self.issuer_client(definition);
        run_stages(&management, &identity, &issuer, definition).await
    }
}

/// Run the three stages in order. Extracted from [`SeedPipeline`] so tests
/// can drive the sequencing with fake clients.
pub(crate) async fn run_stages(
    management: &dyn ManagementApi,
    identity: &dyn IdentityApi,
    issuer: &dyn IssuerApi,
    definition: &ParticipantDefinition,
) -> SeedReport {
    let connector = seed_connector(management).await;
    log_stage("connector", definition, &connector);

    let identity_hub = seed_identity_hub(identity, management, definition).await;
    log_stage("identity-hub", definition, &identity_hub);

    let issuer = seed_issuer(issuer, definition).await;
    log_stage("issuer", definition, &issuer);

    SeedReport {
        connector,
        identity_hub,
        issuer,
    }
}

fn log_stage(stage: &str, definition: &ParticipantDefinition, outcome: &StageOutcome) {
    match outcome {
        StageOutcome::Succeeded => {
            tracing::info!(stage, participant = %definition.participant_name, "seeding stage complete");
        }
        StageOutcome::AlreadyExists => {
            tracing::info!(stage, participant = %definition.participant_name, "already exists");
        }
        StageOutcome::Failed(reason) => {
            tracing::warn!(
                stage,
                participant = %definition.participant_name,
                reason = %reason,
                "seeding stage failed"
            );
        }
    }
}
