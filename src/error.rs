//! Error types shared across the provisioner.

use thiserror::Error;

/// Errors from outbound REST calls (Fulcrum Core, management, identity,
/// issuer APIs).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from rendering, applying, or deleting cluster resources and from
/// the deployment readiness wait.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to parse resource document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("resource document is missing apiVersion/kind")]
    MissingTypeMeta,

    #[error("resource document is missing metadata.name")]
    MissingName,

    #[error("no server resource for kind {kind} ({api_version})")]
    UnknownKind { kind: String, api_version: String },

    #[error("cluster request failed: {0}")]
    Kube(#[from] kube::Error),

    #[error("readiness wait cancelled")]
    Cancelled,

    /// Generic cluster-side failure, used by non-kube [`ClusterClient`]
    /// implementations.
    ///
    /// [`ClusterClient`]: crate::provisioner::ClusterClient
    #[error("{0}")]
    Cluster(String),
}

/// Errors from the persisted agent identity store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("agent identity not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(String),
}

/// Errors from the one-time startup registration against Fulcrum Core.
///
/// Any of these is fatal: the agent must not start polling without a
/// registered identity and a fresh token.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to create {entity}: {source}")]
    Registration {
        entity: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("failed to issue agent token: {0}")]
    Token(#[source] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
