use crate::core::error::Result;
use crate::core::provider::PaymentProvider;
use crate::core::transaction::TransactionStatus;
use crate::ledger::Ledger;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
    pub confirmed: usize,
    pub cancelled: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "checked {}, confirmed {}, cancelled {}, unchanged {}, failed {}",
            self.checked, self.confirmed, self.cancelled, self.unchanged, self.failed
        )
    }
}

/// Asks the provider about every pending transaction and settles the ones
/// that reached a final status.
///
/// Transactions are processed one at a time. A failure on one row is logged
/// and the row is left for the next pass.
pub async fn reconcile_pending(
    ledger: &Ledger,
    provider: &dyn PaymentProvider,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for tx in ledger.pending_transactions().await? {
        let Some(reference) = tx.provider_ref.as_deref() else {
            continue;
        };
        report.checked += 1;

        let status = match provider.fetch_status(reference).await {
            Ok(status) => status,
            Err(e) => {
                warn!(transaction = %tx.id, reference, "Status check failed: {e:#}");
                report.failed += 1;
                continue;
            }
        };

        let Some(target) = status.settlement() else {
            debug!(transaction = %tx.id, %status, "No final status yet");
            report.unchanged += 1;
            continue;
        };

        match ledger.apply_status(tx.id, target).await {
            Ok(settlement) if !settlement.changed => report.unchanged += 1,
            Ok(_) if target == TransactionStatus::Confirmed => report.confirmed += 1,
            Ok(_) => report.cancelled += 1,
            Err(e) => {
                warn!(transaction = %tx.id, reference, "Failed to apply {target}: {e}");
                report.failed += 1;
            }
        }
    }

    info!(%report, "Reconciliation pass finished");
    Ok(report)
}
