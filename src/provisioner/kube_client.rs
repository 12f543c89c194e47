//! Kubernetes-backed implementations of the cluster traits.

use std::path::Path;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{DynamicObject, GroupVersionKind};
use kube::discovery::{Discovery, Scope};
use kube::{Client, Config};

use super::readiness::{DeploymentStatusSource, ReplicaStatus};
use super::ClusterClient;
use crate::error::ProvisionError;

/// Field manager name used for server-side apply ownership.
const FIELD_MANAGER: &str = "k8s-provisioner";

/// Build a cluster client from a kubeconfig path, falling back to the
/// in-cluster service account when the file does not exist.
pub async fn init_kube_client(kubeconfig_path: &str) -> anyhow::Result<Client> {
    let path = expand_home(kubeconfig_path);
    let config = if !path.is_empty() && Path::new(&path).exists() {
        tracing::info!(path = %path, "loading kubeconfig");
        let kubeconfig = Kubeconfig::read_from(&path)?;
        Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
    } else {
        tracing::info!("no kubeconfig found, using in-cluster config");
        Config::incluster()?
    };
    Ok(Client::try_from(config)?)
}

fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).display().to_string();
        }
    }
    path.to_string()
}

/// Applies and deletes arbitrary namespaced objects via API discovery.
pub struct KubeClusterClient {
    client: Client,
    discovery: Discovery,
}

impl KubeClusterClient {
    /// Runs API discovery once; the template kinds are fixed, so a single
    /// snapshot at startup suffices.
    pub async fn new(client: Client) -> Result<Self, ProvisionError> {
        let discovery = Discovery::new(client.clone()).run().await?;
        Ok(Self { client, discovery })
    }

    fn api_for(&self, obj: &DynamicObject) -> Result<Api<DynamicObject>, ProvisionError> {
        let types = obj.types.as_ref().ok_or(ProvisionError::MissingTypeMeta)?;
        let gvk = GroupVersionKind::try_from(types)
            .map_err(|e| ProvisionError::Cluster(e.to_string()))?;
        let (resource, capabilities) =
            self.discovery
                .resolve_gvk(&gvk)
                .ok_or_else(|| ProvisionError::UnknownKind {
                    kind: gvk.kind.clone(),
                    api_version: types.api_version.clone(),
                })?;

        let api = if capabilities.scope == Scope::Namespaced {
            let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");
            Api::namespaced_with(self.client.clone(), namespace, &resource)
        } else {
            Api::all_with(self.client.clone(), &resource)
        };
        Ok(api)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn apply(&self, obj: &DynamicObject) -> Result<(), ProvisionError> {
        let name = obj
            .metadata
            .name
            .as_deref()
            .ok_or(ProvisionError::MissingName)?;
        let api = self.api_for(obj)?;
        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(name, &params, &Patch::Apply(obj)).await?;
        Ok(())
    }

    async fn delete(&self, obj: &DynamicObject) -> Result<(), ProvisionError> {
        let name = obj
            .metadata
            .name
            .as_deref()
            .ok_or(ProvisionError::MissingName)?;
        let api = self.api_for(obj)?;
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            // Deleting an already-absent object is a no-op.
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reads deployment replica status for the readiness barrier.
pub struct KubeDeploymentStatus {
    client: Client,
}

impl KubeDeploymentStatus {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeploymentStatusSource for KubeDeploymentStatus {
    async fn replica_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ReplicaStatus, ProvisionError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let deployment = api.get(name).await?;
        // Desired replicas default to 1 when the spec leaves them unset.
        let desired = deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(1);
        let ready = deployment
            .status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);
        Ok(ReplicaStatus { desired, ready })
    }
}
