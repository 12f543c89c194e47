//! Process configuration from CLI flags and environment variables.

use std::time::Duration;

use clap::Parser;

/// Kubernetes provisioning agent for EDC dataspace participant stacks.
#[derive(Parser, Debug, Clone)]
#[command(name = "k8s-provisioner")]
#[command(about = "Provisions per-participant EDC stacks on a Kubernetes cluster")]
#[command(version)]
pub struct Config {
    /// Path to the kubeconfig file; falls back to in-cluster configuration
    /// when the file does not exist.
    #[arg(long, env = "KUBECONFIG", default_value = "~/.kube/config")]
    pub kube_config: String,

    /// Base URL of the Fulcrum Core orchestrator. When unset the agent runs
    /// without the job queue and serves only the direct HTTP API.
    #[arg(long, env = "FULCRUM_CORE")]
    pub fulcrum_core: Option<String>,

    /// Postgres connection string for the agent identity store.
    #[arg(
        long,
        env = "PG_CONNECTION_STRING",
        default_value = "host=localhost user=postgres password=postgres dbname=k8s_provisioner"
    )]
    pub postgres: String,

    /// Listen port for the direct HTTP API.
    #[arg(long, env = "LISTEN_PORT", default_value_t = 9999)]
    pub listen_port: u16,

    /// Seconds between pending-job polls against Fulcrum Core.
    #[arg(long, env = "JOB_POLL_INTERVAL_SECS", default_value_t = 10)]
    pub job_poll_interval_secs: u64,
}

impl Config {
    pub fn job_poll_interval(&self) -> Duration {
        Duration::from_secs(self.job_poll_interval_secs)
    }
}
