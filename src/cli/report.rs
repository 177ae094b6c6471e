use super::ui;
use crate::core::account::Account;
use crate::core::transaction::Transaction;
use crate::jobs::{Job, JobOutcome, ReconcileReport};
use crate::ledger::BootstrapReport;
use comfy_table::Cell;

impl ReconcileReport {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Checked"),
            ui::header_cell("Confirmed"),
            ui::header_cell("Cancelled"),
            ui::header_cell("Unchanged"),
            ui::header_cell("Failed"),
        ]);
        table.add_row(vec![
            ui::count_cell(self.checked),
            ui::count_cell(self.confirmed),
            ui::count_cell(self.cancelled),
            ui::count_cell(self.unchanged),
            ui::count_cell(self.failed),
        ]);
        table.to_string()
    }
}

impl JobOutcome {
    pub fn display(&self, job: Job) -> String {
        let title = ui::style_text(&job.to_string(), ui::StyleType::Title);
        let body = match self {
            JobOutcome::Reconciled(report) => report.display_as_table(),
            JobOutcome::Expired(n) | JobOutcome::Billed(n) | JobOutcome::Repaid(n) => {
                let style = if *n == 0 {
                    ui::StyleType::Subtle
                } else {
                    ui::StyleType::TotalValue
                };
                ui::style_text(&self.to_string(), style)
            }
        };
        format!("Job: {title}\n\n{body}")
    }
}

impl BootstrapReport {
    pub fn display(&self, bank_accounts: &[Account]) -> String {
        let mut output = format!(
            "{}\n\n",
            ui::style_text("Bootstrap", ui::StyleType::Title)
        );
        output.push_str(&format!(
            "Tariffs created: {}\nBank client created: {}\n\n",
            ui::style_text(&self.tariffs_created.to_string(), ui::StyleType::TotalLabel),
            ui::style_text(if self.bank_created { "yes" } else { "no" }, ui::StyleType::TotalLabel),
        ));

        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Bank account"), ui::header_cell("Funds")]);
        for account in bank_accounts {
            table.add_row(vec![Cell::new(account.id), ui::money_cell(account.funds)]);
        }
        output.push_str(&table.to_string());
        output
    }
}

/// Lists transactions still waiting for a final status.
pub fn pending_table(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return ui::style_text("No pending transactions", ui::StyleType::Subtle);
    }
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Transaction"),
        ui::header_cell("Reference"),
        ui::header_cell("Amount"),
        ui::header_cell("Status"),
        ui::header_cell("Pay date"),
    ]);
    for tx in transactions {
        table.add_row(vec![
            Cell::new(tx.id),
            Cell::new(tx.provider_ref.as_deref().unwrap_or("-")),
            ui::money_cell(tx.amount.value()),
            ui::status_cell(tx.status),
            Cell::new(tx.pay_date.format("%Y-%m-%d")),
        ]);
    }
    table.to_string()
}
