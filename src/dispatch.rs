//! Periodic job dispatch against the Fulcrum Core queue.
//!
//! Every tick fetches the pending jobs in one call and processes them in
//! queue order. Claiming is advisory in this single-consumer design: a
//! failed claim is logged and the job's action proceeds anyway.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::clients::FulcrumApi;
use crate::model::{JobAction, PendingJob};
use crate::provisioner::{Provisioning, ReadyCallback};
use crate::seed::SeedRunner;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10);

pub struct DispatchLoop {
    queue: Arc<dyn FulcrumApi>,
    provisioner: Arc<dyn Provisioning>,
    seeder: Arc<dyn SeedRunner>,
    agent_token: String,
    tick_interval: Duration,
    cancel: CancellationToken,
}

impl DispatchLoop {
    pub fn new(
        queue: Arc<dyn FulcrumApi>,
        provisioner: Arc<dyn Provisioning>,
        seeder: Arc<dyn SeedRunner>,
        agent_token: String,
        tick_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            provisioner,
            seeder,
            agent_token,
            tick_interval,
            cancel,
        }
    }

    /// Run ticks at the configured interval until cancelled.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("dispatch loop stopping");
                    return;
                }
                _ = ticker.tick() => {}
            }
            self.tick().await;
        }
    }

    /// One poll tick: fetch pending jobs and process them in order.
    ///
    /// A create failure aborts the remaining jobs of this tick; they stay
    /// Pending upstream and are picked up again on the next tick.
    pub async fn tick(&self) {
        let jobs = match self.queue.get_pending_jobs(&self.agent_token).await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch pending jobs");
                return;
            }
        };
        if !jobs.is_empty() {
            tracing::info!(count = jobs.len(), "got pending jobs");
        }

        for job in jobs {
            if job.status != "Pending" {
                tracing::info!(job_id = %job.id, status = %job.status, "skipping job");
                continue;
            }
            if self.process_job(&job).await.is_break() {
                return;
            }
        }
    }

    /// Process one actionable job. Breaks to abort the current tick.
    async fn process_job(&self, job: &PendingJob) -> ControlFlow<()> {
        let definition = job.participant_definition();

        // Advisory claim: failure is logged but does not gate the action.
        match self.queue.claim_job(&self.agent_token, &job.id).await {
            Ok(()) => {
                tracing::info!(
                    job_id = %job.id,
                    service = %job.service.name,
                    action = ?job.action,
                    "claimed job"
                );
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "failed to claim job, proceeding");
            }
        }

        match job.action {
            JobAction::Create => {
                let on_ready = self.finalizing_callback(job.id.clone());
                if let Err(e) = self
                    .provisioner
                    .create_resources(definition, on_ready)
                    .await
                {
                    // A half-applied stack means the cluster is unhealthy;
                    // leave the rest of the batch for the next tick.
                    tracing::error!(job_id = %job.id, error = %e, "failed to create resources");
                    return ControlFlow::Break(());
                }
            }
            JobAction::Delete => {
                match self.provisioner.delete_resources(definition).await {
                    Ok(_) => {
                        tracing::info!(job_id = %job.id, "resource deletion complete");
                        self.finalize(&job.id).await;
                    }
                    Err(e) => {
                        tracing::error!(job_id = %job.id, error = %e, "failed to delete resources");
                    }
                }
            }
            JobAction::Other => {}
        }
        ControlFlow::Continue(())
    }

    /// Callback fired when the stack becomes ready: seed, then finalize.
    /// Seeding is best-effort and never prevents finalization.
    fn finalizing_callback(&self, job_id: String) -> ReadyCallback {
        let queue = Arc::clone(&self.queue);
        let seeder = Arc::clone(&self.seeder);
        let token = self.agent_token.clone();
        Box::new(move |definition| {
            Box::pin(async move {
                tracing::info!(
                    namespace = %definition.participant_name,
                    "deployments ready, seeding data"
                );
                let report = seeder.run_all(&definition).await;
                tracing::info!(
                    namespace = %definition.participant_name,
                    connector = ?report.connector,
                    identity_hub = ?report.identity_hub,
                    issuer = ?report.issuer,
                    "data seeding complete"
                );

                match queue.finalize_job(&token, &job_id).await {
                    Ok(()) => tracing::info!(job_id = %job_id, "finalized job"),
                    // No retry: the job stays un-finalized upstream.
                    Err(e) => tracing::error!(job_id = %job_id, error = %e, "failed to finalize job"),
                }
            })
        })
    }

    async fn finalize(&self, job_id: &str) {
        match self.queue.finalize_job(&self.agent_token, job_id).await {
            Ok(()) => tracing::info!(job_id = %job_id, "finalized job"),
            Err(e) => tracing::error!(job_id = %job_id, error = %e, "failed to finalize job"),
        }
    }
}
