//! The supervisor owns every long-lived reconciliation task.
//!
//! At startup it enumerates the catalog and enqueues one admission token
//! per existing service; at runtime intake enqueues tokens for new ones.
//! Each token starts exactly one task that re-runs the pipeline on a fixed
//! period until process shutdown. Tasks are never restarted or deduplicated
//! here; uniqueness is the catalog's job.

use crate::pipeline::{self, ReleaseContext};
use slipway_core::catalog::Catalog;
use slipway_core::intake::{AdmissionReceiver, AdmissionSender};
use slipway_core::service::ServiceRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Process-wide shutdown signal. Flip the sender to `true` to stop the
/// supervisor, every reconciliation task, and the HTTP server.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

pub struct Supervisor {
    ctx: Arc<ReleaseContext>,
    period: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Supervisor {
    pub fn new(ctx: Arc<ReleaseContext>, period: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            ctx,
            period,
            shutdown,
        }
    }

    /// Startup scan: enqueue an admission token for every catalogued
    /// service.
    pub async fn enqueue_existing(
        catalog: Arc<Catalog>,
        admission: &AdmissionSender,
    ) -> anyhow::Result<()> {
        let services =
            tokio::task::spawn_blocking(move || catalog.list(100, "")).await??;
        info!(count = services.len(), "admitting existing services");
        for service in services {
            admission.send(Arc::new(service)).await?;
        }
        Ok(())
    }

    /// Admission loop: one reconciliation task per token, until shutdown.
    pub async fn run(mut self, mut admission: AdmissionReceiver) {
        info!("supervisor waiting for admission tokens");
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    info!("supervisor stopping");
                    return;
                }
                token = admission.recv() => {
                    match token {
                        Some(service) => {
                            tokio::spawn(reconcile_loop(
                                Arc::clone(&self.ctx),
                                service,
                                self.period,
                                self.shutdown.clone(),
                            ));
                        }
                        None => {
                            info!("admission channel closed, supervisor stopping");
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// One service's reconciliation task: run the pipeline once per period.
/// Pipeline errors are logged and do not terminate the task.
async fn reconcile_loop(
    ctx: Arc<ReleaseContext>,
    service: Arc<ServiceRecord>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(service = %service.name, period = ?period, "starting reconciliation task");

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval fires immediately; the first pass belongs one period out.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!(service = %service.name, "stopping reconciliation task");
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = pipeline::reconcile(&ctx, &service).await {
                    error!(service = %service.name, error = %format!("{e:#}"), "reconciliation pass failed");
                }
            }
        }
    }
}
