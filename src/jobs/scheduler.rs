use super::{Job, run_job};
use crate::core::config::ScheduleConfig;
use crate::core::provider::PaymentProvider;
use crate::ledger::Ledger;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

/// Runs every [`Job`] on its own fixed interval until shutdown.
#[derive(Clone)]
pub struct Scheduler {
    ledger: Arc<Ledger>,
    provider: Arc<dyn PaymentProvider>,
    schedule: ScheduleConfig,
}

impl Scheduler {
    pub fn new(
        ledger: Arc<Ledger>,
        provider: Arc<dyn PaymentProvider>,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            ledger,
            provider,
            schedule,
        }
    }

    /// Returns once `shutdown` flips to true or its sender is dropped.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        join_all(
            Job::ALL
                .into_iter()
                .map(|job| self.run_loop(job, shutdown.clone())),
        )
        .await;
        info!("Scheduler stopped");
    }

    async fn run_loop(&self, job: Job, mut shutdown: watch::Receiver<bool>) {
        let period = job.period(&self.schedule);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(%job, ?period, "Scheduled job");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    match run_job(job, &self.ledger, self.provider.as_ref()).await {
                        Ok(outcome) => info!(%job, "{outcome}"),
                        Err(e) => error!(%job, "Job failed: {e}"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}
