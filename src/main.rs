//! K8S provisioner agent entry point.

use std::sync::Arc;

use clap::Parser;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use k8s_provisioner::bootstrap::bootstrap;
use k8s_provisioner::clients::{FulcrumApi, FulcrumClient};
use k8s_provisioner::config::Config;
use k8s_provisioner::dispatch::DispatchLoop;
use k8s_provisioner::http::build_http_client;
use k8s_provisioner::provisioner::{
    init_kube_client, KubeClusterClient, KubeDeploymentStatus, KubeProvisioner, Provisioning,
};
use k8s_provisioner::seed::{SeedPipeline, SeedRunner};
use k8s_provisioner::server::{self, AppState};
use k8s_provisioner::store::{ensure_schema, PostgresAgentStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("k8s_provisioner=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::parse();
    tracing::info!("starting k8s-provisioner");

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    let kube = init_kube_client(&config.kube_config).await?;
    let cluster = Arc::new(KubeClusterClient::new(kube.clone()).await?);
    let status = Arc::new(KubeDeploymentStatus::new(kube));
    let provisioner: Arc<dyn Provisioning> =
        Arc::new(KubeProvisioner::new(cluster, status, cancel.clone()));

    let http = build_http_client()?;
    let seeder: Arc<dyn SeedRunner> = Arc::new(SeedPipeline::new(http.clone()));

    if let Some(ref fulcrum_url) = config.fulcrum_core {
        let pool = connect_postgres(&config.postgres)?;
        ensure_schema(&pool).await?;
        let store = PostgresAgentStore::new(pool);

        let queue: Arc<dyn FulcrumApi> =
            Arc::new(FulcrumClient::new(http.clone(), fulcrum_url.clone()));
        // A failed bootstrap is fatal: without an agent token the queue is
        // unreachable.
        let agent_token = bootstrap(queue.as_ref(), &store).await?;
        tracing::info!(fulcrum = %fulcrum_url, "agent registered, starting dispatch loop");

        let dispatch = DispatchLoop::new(
            queue,
            Arc::clone(&provisioner),
            Arc::clone(&seeder),
            agent_token,
            config.job_poll_interval(),
            cancel.clone(),
        );
        tokio::spawn(async move { dispatch.run().await });
    } else {
        tracing::info!("no Fulcrum Core configured, running in direct mode only");
    }

    let state = AppState {
        provisioner,
        seeder,
    };
    server::serve(state, config.listen_port, cancel).await?;

    tracing::info!("shutdown complete");
    Ok(())
}

fn connect_postgres(connection_string: &str) -> anyhow::Result<Pool> {
    let pg_config: tokio_postgres::Config = connection_string.parse()?;
    let manager = Manager::from_config(
        pg_config,
        tokio_postgres::NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Ok(Pool::builder(manager).max_size(10).build()?)
}
