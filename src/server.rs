//! Direct HTTP API for provisioning without the Fulcrum Core queue.
//!
//! Exposes the same create and delete operations the dispatch loop drives,
//! minus job bookkeeping: there is no claim and no finalization, only the
//! cluster work and the post-readiness seeding.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;

use crate::model::ParticipantDefinition;
use crate::provisioner::{Provisioning, ReadyCallback, ResourceMap};
use crate::seed::SeedRunner;

#[derive(Clone)]
pub struct AppState {
    pub provisioner: Arc<dyn Provisioning>,
    pub seeder: Arc<dyn SeedRunner>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/resources",
            post(create_resources).delete(delete_resources),
        )
        .with_state(state)
}

/// Bind and serve until the token is cancelled.
pub async fn serve(
    state: AppState,
    port: u16,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "http server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

async fn create_resources(
    State(state): State<AppState>,
    Json(definition): Json<ParticipantDefinition>,
) -> Result<Json<ResourceMap>, (StatusCode, String)> {
    tracing::info!(participant = %definition.participant_name, "create requested over http");
    let on_ready = seeding_callback(Arc::clone(&state.seeder));
    state
        .provisioner
        .create_resources(definition, on_ready)
        .await
        .map(Json)
        .map_err(internal_error)
}

async fn delete_resources(
    State(state): State<AppState>,
    Json(definition): Json<ParticipantDefinition>,
) -> Result<Json<ResourceMap>, (StatusCode, String)> {
    tracing::info!(participant = %definition.participant_name, "delete requested over http");
    state
        .provisioner
        .delete_resources(definition)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// Seed once the deployments are ready. There is no queue job to finalize
/// for direct requests; the report only gets logged.
fn seeding_callback(seeder: Arc<dyn SeedRunner>) -> ReadyCallback {
    Box::new(move |definition| {
        Box::pin(async move {
            let report = seeder.run_all(&definition).await;
            tracing::info!(
                participant = %definition.participant_name,
                connector = ?report.connector,
                identity_hub = ?report.identity_hub,
                issuer = ?report.issuer,
                "data seeding complete"
            );
        })
    })
}

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::ProvisionError;
    use crate::seed::{SeedReport, StageOutcome};

    struct FakeProvisioning {
        fail: bool,
        deletes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Provisioning for FakeProvisioning {
        async fn create_resources(
            &self,
            definition: ParticipantDefinition,
            on_ready: ReadyCallback,
        ) -> Result<ResourceMap, ProvisionError> {
            if self.fail {
                return Err(ProvisionError::Cluster("apply refused".to_string()));
            }
            let mut map = ResourceMap::new();
            map.insert(definition.participant_name.clone(), "Namespace".to_string());
            on_ready(definition).await;
            Ok(map)
        }

        async fn delete_resources(
            &self,
            definition: ParticipantDefinition,
        ) -> Result<ResourceMap, ProvisionError> {
            self.deletes
                .lock()
                .unwrap()
                .push(definition.participant_name);
            Ok(ResourceMap::new())
        }
    }

    #[derive(Default)]
    struct FakeSeeder {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl SeedRunner for FakeSeeder {
        async fn run_all(&self, _definition: &ParticipantDefinition) -> SeedReport {
            self.runs.fetch_add(1, Ordering::SeqCst);
            SeedReport {
                connector: StageOutcome::Succeeded,
                identity_hub: StageOutcome::Succeeded,
                issuer: StageOutcome::Succeeded,
            }
        }
    }

    fn state(fail: bool) -> (AppState, Arc<FakeSeeder>) {
        let seeder = Arc::new(FakeSeeder::default());
        let state = AppState {
            provisioner: Arc::new(FakeProvisioning {
                fail,
                deletes: Mutex::new(vec![]),
            }),
            seeder: Arc::clone(&seeder) as Arc<dyn SeedRunner>,
        };
        (state, seeder)
    }

    fn definition() -> ParticipantDefinition {
        ParticipantDefinition {
            participant_name: "acme".to_string(),
            did: "did:web:acme".to_string(),
            kubernetes_ingress_host: "localhost".to_string(),
        }
    }

    #[tokio::test]
    async fn create_returns_resource_map_and_seeds() {
        let (state, seeder) = state(false);

        let Json(map) = create_resources(State(state), Json(definition()))
            .await
            .unwrap();

        assert_eq!(map.get("acme").map(String::as_str), Some("Namespace"));
        assert_eq!(seeder.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn create_failure_maps_to_internal_server_error() {
        let (state, seeder) = state(true);

        let err = create_resources(State(state), Json(definition()))
            .await
            .unwrap_err();

        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(seeder.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delete_never_seeds() {
        let (state, seeder) = state(false);

        let Json(map) = delete_resources(State(state), Json(definition()))
            .await
            .unwrap();

        assert!(map.is_empty());
        assert_eq!(seeder.runs.load(Ordering::SeqCst), 0);
    }
}
