//! Deployment readiness barrier.
//!
//! After a participant stack is applied, one worker per monitored
//! deployment polls the cluster until every deployment reports its desired
//! replica count ready. The barrier waits for all workers, retaining the
//! first error in arrival order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::ProvisionError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Replica counts observed for one deployment.
#[derive(Debug, Clone, Copy)]
pub struct ReplicaStatus {
    pub desired: i32,
    pub ready: i32,
}

impl ReplicaStatus {
    pub fn is_ready(&self) -> bool {
        self.ready == self.desired
    }
}

/// Source of deployment replica status. Backed by the cluster in
/// production; fakes stand in for it in tests.
#[async_trait]
pub trait DeploymentStatusSource: Send + Sync {
    async fn replica_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ReplicaStatus, ProvisionError>;
}

/// Wait until all named deployments in `namespace` are ready.
///
/// One worker per deployment polls at `poll_interval` until the deployment
/// is ready, a read error occurs (no retry), or `cancel` fires. The barrier
/// never short-circuits: every worker is drained, successes are logged as
/// they arrive, and the first error by arrival order is returned.
pub async fn wait_for_deployments(
    source: Arc<dyn DeploymentStatusSource>,
    namespace: &str,
    deployments: &[String],
    poll_interval: Duration,
    cancel: CancellationToken,
) -> Result<(), ProvisionError> {
    let mut workers = JoinSet::new();
    for name in deployments {
        let source = Arc::clone(&source);
        let namespace = namespace.to_string();
        let name = name.clone();
        let cancel = cancel.clone();
        workers.spawn(async move {
            let result = wait_for_deployment(&*source, &namespace, &name, poll_interval, cancel)
                .await;
            (name, result)
        });
    }

    let mut first_error = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((name, Ok(()))) => {
                tracing::info!(deployment = %name, namespace, "deployment ready");
            }
            Ok((name, Err(e))) => {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    tracing::debug!(deployment = %name, error = %e, "additional readiness failure");
                }
            }
            Err(join_error) => {
                if first_error.is_none() {
                    first_error = Some(ProvisionError::Cluster(join_error.to_string()));
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Poll a single deployment until it is ready, errors, or is cancelled.
async fn wait_for_deployment(
    source: &dyn DeploymentStatusSource,
    namespace: &str,
    name: &str,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> Result<(), ProvisionError> {
    loop {
        let status = source.replica_status(namespace, name).await?;
        if status.is_ready() {
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(ProvisionError::Cancelled),
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Fake source with a fixed ready/not-ready answer per deployment.
    struct FakeStatusSource {
        ready: HashMap<String, bool>,
        reads: AtomicUsize,
    }

    impl FakeStatusSource {
        fn new(entries: &[(&str, bool)]) -> Self {
            Self {
                ready: entries
                    .iter()
                    .map(|(n, r)| (n.to_string(), *r))
                    .collect(),
                reads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DeploymentStatusSource for FakeStatusSource {
        async fn replica_status(
            &self,
            _namespace: &str,
            name: &str,
        ) -> Result<ReplicaStatus, ProvisionError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            match self.ready.get(name) {
                Some(true) => Ok(ReplicaStatus {
                    desired: 1,
                    ready: 1,
                }),
                Some(false) => Ok(ReplicaStatus {
                    desired: 1,
                    ready: 0,
                }),
                None => Err(ProvisionError::Cluster(format!(
                    "deployment {name} not found"
                ))),
            }
        }
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn all_ready_returns_success() {
        let source = Arc::new(FakeStatusSource::new(&[
            ("controlplane", true),
            ("identityhub", true),
            ("dataplane", true),
        ]));
        let result = wait_for_deployments(
            source,
            "acme",
            &names(&["controlplane", "identityhub", "dataplane"]),
            Duration::from_millis(5),
            CancellationToken::new(),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn cancellation_fails_the_barrier_within_one_poll_interval() {
        let source = Arc::new(FakeStatusSource::new(&[
            ("controlplane", true),
            ("identityhub", true),
            ("dataplane", false),
        ]));
        let cancel = CancellationToken::new();
        let poll_interval = Duration::from_millis(20);

        let deployments = names(&["controlplane", "identityhub", "dataplane"]);
        let barrier_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            wait_for_deployments(source, "acme", &deployments, poll_interval, barrier_cancel).await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = tokio::time::timeout(poll_interval * 2, handle)
            .await
            .expect("barrier did not return within one poll interval of cancellation")
            .unwrap();
        assert!(matches!(result, Err(ProvisionError::Cancelled)));
    }

    #[tokio::test]
    async fn read_error_fails_immediately_without_retry() {
        let source = Arc::new(FakeStatusSource::new(&[
            ("controlplane", true),
            ("identityhub", true),
            // dataplane missing: read error on first poll
        ]));
        let reads_handle = Arc::clone(&source);
        let result = wait_for_deployments(
            source,
            "acme",
            &names(&["controlplane", "identityhub", "dataplane"]),
            Duration::from_millis(5),
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(ProvisionError::Cluster(_))));
        // One read per worker: the failing worker did not retry.
        assert_eq!(reads_handle.reads.load(Ordering::SeqCst), 3);
    }
}
