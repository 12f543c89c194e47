//! Participant stack provisioning against the Kubernetes cluster.

mod kube_client;
pub mod readiness;
pub mod templates;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use kube::core::DynamicObject;
use tokio_util::sync::CancellationToken;

pub use kube_client::{init_kube_client, KubeClusterClient, KubeDeploymentStatus};
pub use readiness::{DeploymentStatusSource, ReplicaStatus, DEFAULT_POLL_INTERVAL};

use crate::error::ProvisionError;
use crate::model::ParticipantDefinition;

/// Deployments every participant stack must bring up before seeding.
/// Shared across all participants; not derived per job.
pub const PARTICIPANT_DEPLOYMENTS: [&str; 3] = ["controlplane", "identityhub", "dataplane"];

/// Completion callback for a create operation.
///
/// Fires exactly once, and only if the readiness barrier succeeds. A failed
/// barrier is logged and the callback is withheld; callers infer failure
/// from its permanent absence.
pub type ReadyCallback =
    Box<dyn FnOnce(ParticipantDefinition) -> BoxFuture<'static, ()> + Send + 'static>;

/// Resource name → kind map returned from create and delete calls.
pub type ResourceMap = BTreeMap<String, String>;

/// Applies or deletes rendered participant resources on the cluster.
#[async_trait]
pub trait Provisioning: Send + Sync {
    /// Render and apply both resource bundles, then start the readiness
    /// barrier in the background. Returns the merged name → kind map
    /// immediately, independent of the barrier outcome.
    async fn create_resources(
        &self,
        definition: ParticipantDefinition,
        on_ready: ReadyCallback,
    ) -> Result<ResourceMap, ProvisionError>;

    /// Render both bundles and delete every resource. No readiness wait.
    async fn delete_resources(
        &self,
        definition: ParticipantDefinition,
    ) -> Result<ResourceMap, ProvisionError>;
}

/// Cluster-side unit of work for one rendered resource.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Conflict-tolerant, ownership-forcing upsert (server-side apply).
    async fn apply(&self, obj: &DynamicObject) -> Result<(), ProvisionError>;

    /// Idempotent delete; absence of the object is not an error.
    async fn delete(&self, obj: &DynamicObject) -> Result<(), ProvisionError>;
}

enum ResourceOp {
    Apply,
    Delete,
}

/// Production provisioner backed by the cluster.
pub struct KubeProvisioner {
    cluster: Arc<dyn ClusterClient>,
    status: Arc<dyn DeploymentStatusSource>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl KubeProvisioner {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        status: Arc<dyn DeploymentStatusSource>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            cluster,
            status,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel,
        }
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Render one bundle and run `op` for each document in order.
    ///
    /// The first parse or cluster error aborts the remaining resources in
    /// this call; already-processed resources are not rolled back.
    async fn process_bundle(
        &self,
        definition: &ParticipantDefinition,
        template: &str,
        op: &ResourceOp,
    ) -> Result<ResourceMap, ProvisionError> {
        let rendered = templates::render(template, definition);
        let objects = templates::parse_documents(&rendered)?;

        let mut resources = ResourceMap::new();
        for obj in &objects {
            let (name, kind) = templates::name_and_kind(obj)?;
            match op {
                ResourceOp::Apply => self.cluster.apply(obj).await?,
                ResourceOp::Delete => self.cluster.delete(obj).await?,
            }
            resources.insert(name, kind);
        }
        Ok(resources)
    }

    async fn process_all(
        &self,
        definition: &ParticipantDefinition,
        op: ResourceOp,
    ) -> Result<ResourceMap, ProvisionError> {
        let mut merged = self
            .process_bundle(definition, templates::CONNECTOR_BUNDLE, &op)
            .await?;
        merged.extend(
            self.process_bundle(definition, templates::IDENTITY_HUB_BUNDLE, &op)
                .await?,
        );
        Ok(merged)
    }
}

#[async_trait]
impl Provisioning for KubeProvisioner {
    async fn create_resources(
        &self,
        definition: ParticipantDefinition,
        on_ready: ReadyCallback,
    ) -> Result<ResourceMap, ProvisionError> {
        let merged = self.process_all(&definition, ResourceOp::Apply).await?;

        let namespace = definition.participant_name.clone();
        let deployments: Vec<String> = PARTICIPANT_DEPLOYMENTS
            .iter()
            .map(|d| d.to_string())
            .collect();
        let status = Arc::clone(&self.status);
        let poll_interval = self.poll_interval;
        let cancel = self.cancel.clone();

        tracing::info!(namespace = %namespace, ?deployments, "waiting for deployments");
        tokio::spawn(async move {
            match readiness::wait_for_deployments(
                status,
                &namespace,
                &deployments,
                poll_interval,
                cancel,
            )
            .await
            {
                Ok(()) => on_ready(definition).await,
                Err(e) => {
                    tracing::error!(
                        namespace = %namespace,
                        error = %e,
                        "deployment readiness check failed"
                    );
                }
            }
        });

        Ok(merged)
    }

    async fn delete_resources(
        &self,
        definition: ParticipantDefinition,
    ) -> Result<ResourceMap, ProvisionError> {
        self.process_all(&definition, ResourceOp::Delete).await
    }
}
