//! Periodic jobs run against the ledger.

pub mod reconcile;
pub mod scheduler;

pub use reconcile::{ReconcileReport, reconcile_pending};
pub use scheduler::Scheduler;

use crate::core::config::ScheduleConfig;
use crate::core::error::Result;
use crate::core::provider::PaymentProvider;
use crate::ledger::Ledger;
use chrono::Utc;
use std::fmt::Display;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Reconcile,
    Expire,
    BillCredits,
    RepayInvestments,
}

impl Job {
    pub const ALL: [Job; 4] = [
        Job::Reconcile,
        Job::Expire,
        Job::BillCredits,
        Job::RepayInvestments,
    ];

    pub fn period(&self, schedule: &ScheduleConfig) -> Duration {
        let secs = match self {
            Job::Reconcile => schedule.reconcile_secs,
            Job::Expire => schedule.expire_secs,
            Job::BillCredits => schedule.bill_credits_secs,
            Job::RepayInvestments => schedule.repay_investments_secs,
        };
        Duration::from_secs(secs.max(1))
    }
}

impl Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Job::Reconcile => write!(f, "reconcile"),
            Job::Expire => write!(f, "expire"),
            Job::BillCredits => write!(f, "bill-credits"),
            Job::RepayInvestments => write!(f, "repay-investments"),
        }
    }
}

/// What a single job run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Reconciled(ReconcileReport),
    Expired(usize),
    Billed(usize),
    Repaid(usize),
}

impl Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Reconciled(report) => write!(f, "{report}"),
            JobOutcome::Expired(n) => write!(f, "{n} transactions expired"),
            JobOutcome::Billed(n) => write!(f, "{n} installments issued"),
            JobOutcome::Repaid(n) => write!(f, "{n} payouts issued"),
        }
    }
}

pub async fn run_job(
    job: Job,
    ledger: &Ledger,
    provider: &dyn PaymentProvider,
) -> Result<JobOutcome> {
    let now = Utc::now();
    Ok(match job {
        Job::Reconcile => JobOutcome::Reconciled(reconcile_pending(ledger, provider).await?),
        Job::Expire => JobOutcome::Expired(ledger.expire_overdue(now).await?),
        Job::BillCredits => JobOutcome::Billed(ledger.bill_credits(now).await?),
        Job::RepayInvestments => JobOutcome::Repaid(ledger.repay_investments(now).await?),
    })
}
